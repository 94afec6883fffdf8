// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `setTimeout`-backed [`Timer`].

use async_trait::async_trait;
use hilal_core::content::Timer;
use hilal_core::time::Duration;
use js_sys::{Function, Promise};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use crate::describe;

/// Waits on the window's `setTimeout`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowTimer;

/// Whole milliseconds for `setTimeout`, saturating at its `i32` limit.
fn timeout_millis(delay: Duration) -> i32 {
    i32::try_from(delay.micros() / 1000).unwrap_or(i32::MAX)
}

#[async_trait(?Send)]
impl Timer for WindowTimer {
    async fn sleep(&self, delay: Duration) {
        let ms = timeout_millis(delay);
        let promise = Promise::new(&mut |resolve: Function, _reject: Function| {
            let scheduled = web_sys::window().map(|window| {
                window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            });
            if !matches!(scheduled, Some(Ok(_))) {
                // Without setTimeout the deadline expires at once.
                log::warn!("setTimeout unavailable; deadline of {ms} ms expires now");
                if let Err(err) = resolve.call0(&JsValue::UNDEFINED) {
                    log::debug!("resolving deadline failed: {}", describe(&err));
                }
            }
        });
        if let Err(err) = JsFuture::from(promise).await {
            log::debug!("deadline promise rejected: {}", describe(&err));
        }
    }
}
