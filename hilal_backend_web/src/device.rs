// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Navigator fields used for strategy detection.

use hilal_core::device::DeviceSignals;

/// Reads [`DeviceSignals`] from `navigator`. Missing fields read as empty.
#[must_use]
pub fn device_signals() -> DeviceSignals {
    let Some(navigator) = web_sys::window().map(|w| w.navigator()) else {
        return DeviceSignals::default();
    };
    DeviceSignals {
        user_agent: navigator.user_agent().unwrap_or_default(),
        platform: navigator.platform().unwrap_or_default(),
        max_touch_points: u32::try_from(navigator.max_touch_points()).unwrap_or(0),
    }
}
