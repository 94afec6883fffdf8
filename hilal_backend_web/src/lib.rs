// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser backend for hilal.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`RafLoop`]: `requestAnimationFrame` tick source emitting [`HostTime`]
//! - [`AframeScene`]: A-Frame entities for the per-marker panels and the
//!   shared overlay
//! - [`CanvasBackend`]: canvas-2D surfaces republished as `THREE.CanvasTexture`
//! - [`FetchHadithSource`], [`FetchCalendarSource`]: `fetch`-based content
//! - [`WindowTimer`]: `setTimeout` deadlines for content fetches
//! - [`device_signals`]: navigator fields for strategy detection

mod compositor;
mod content;
mod device;
mod raf;
mod scene;
mod timer;

pub use compositor::{CanvasBackend, CanvasSurface, LiveTexture};
pub use content::{FetchCalendarSource, FetchHadithSource, fetch_text};
pub use device::device_signals;
pub use raf::RafLoop;
pub use scene::AframeScene;
pub use timer::WindowTimer;

use chrono::NaiveDate;
use hilal_core::time::HostTime;
use wasm_bindgen::JsValue;

/// Returns the current host time from `performance.now()`.
#[must_use]
pub fn now() -> HostTime {
    HostTime::from_millis_f64(raf::performance_now())
}

/// Returns today's date in the browser's local time zone.
#[must_use]
pub fn today() -> Option<NaiveDate> {
    let date = js_sys::Date::new_0();
    local_date(date.get_full_year(), date.get_month(), date.get_date())
}

/// Builds a date from `Date` getters, whose month is zero-based.
fn local_date(full_year: u32, month0: u32, day: u32) -> Option<NaiveDate> {
    let year = i32::try_from(full_year).ok()?;
    NaiveDate::from_ymd_opt(year, month0 + 1, day)
}

/// Routes `log` records to the browser console and panics to
/// `console.error`.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logging(level: log::Level) {
    console_error_panic_hook::set_once();
    if log::max_level() == log::LevelFilter::Off {
        wasm_logger::init(wasm_logger::Config::new(level));
    }
}

/// Best-effort text for a thrown JS value.
pub(crate) fn describe(err: &JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    js_sys::Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{err:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_months_are_zero_based() {
        assert_eq!(local_date(2026, 9, 14), NaiveDate::from_ymd_opt(2026, 10, 14));
        assert_eq!(local_date(2026, 1, 30), None);
    }
}
