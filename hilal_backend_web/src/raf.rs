// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` tick source.
//!
//! Each callback receives a [`DOMHighResTimeStamp`][mdn] in milliseconds,
//! converted to microsecond [`HostTime`]. The same clock drives compositor
//! ticks and mesh retry deadlines.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use hilal_core::time::HostTime;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

// Direct global bindings, so no Window lookup happens per frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

/// A `requestAnimationFrame` loop calling back with the frame's [`HostTime`].
///
/// The loop re-registers itself each frame until [`stop`](Self::stop) is
/// called or the `RafLoop` is dropped.
pub struct RafLoop {
    inner: Rc<RafInner>,
}

type RafClosure = Closure<dyn FnMut(f64)>;

struct RafInner {
    /// Registered with `requestAnimationFrame`; kept apart from `callback`
    /// so it can re-register itself while the callback runs.
    closure: RefCell<Option<RafClosure>>,
    callback: RefCell<Box<dyn FnMut(HostTime)>>,
    frames: Cell<u64>,
    running: Cell<bool>,
    raf_id: Cell<i32>,
}

impl RafLoop {
    /// Creates a loop that is **not yet running**.
    pub fn new(callback: impl FnMut(HostTime) + 'static) -> Self {
        Self {
            inner: Rc::new(RafInner {
                closure: RefCell::new(None),
                callback: RefCell::new(Box::new(callback)),
                frames: Cell::new(0),
                running: Cell::new(false),
                raf_id: Cell::new(0),
            }),
        }
    }

    /// Starts the loop. No-op if already running.
    pub fn start(&self) {
        if self.inner.running.get() {
            return;
        }
        self.inner.running.set(true);

        if self.inner.closure.borrow().is_none() {
            let inner = Rc::clone(&self.inner);
            let closure = Closure::wrap(Box::new(move |timestamp_ms: f64| {
                if !inner.running.get() {
                    return;
                }
                inner.frames.set(inner.frames.get() + 1);
                inner.callback.borrow_mut()(HostTime::from_millis_f64(timestamp_ms));

                if inner.running.get()
                    && let Some(ref closure) = *inner.closure.borrow()
                {
                    let id = request_animation_frame(closure.as_ref().unchecked_ref());
                    inner.raf_id.set(id);
                }
            }) as Box<dyn FnMut(f64)>);
            *self.inner.closure.borrow_mut() = Some(closure);
        }

        if let Some(ref closure) = *self.inner.closure.borrow() {
            let id = request_animation_frame(closure.as_ref().unchecked_ref());
            self.inner.raf_id.set(id);
        }
    }

    /// Stops the loop and cancels the pending callback. Can be restarted.
    pub fn stop(&self) {
        if !self.inner.running.get() {
            return;
        }
        self.inner.running.set(false);
        cancel_animation_frame(self.inner.raf_id.get());
    }

    /// Returns `true` if the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Number of frames delivered so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.inner.frames.get()
    }
}

impl Drop for RafLoop {
    fn drop(&mut self) {
        self.stop();
        // The closure holds an Rc to `inner`; dropping it breaks the cycle.
        self.inner.closure.borrow_mut().take();
    }
}

impl core::fmt::Debug for RafLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RafLoop")
            .field("running", &self.inner.running.get())
            .field("frames", &self.inner.frames.get())
            .finish_non_exhaustive()
    }
}
