// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time in microseconds.
//!
//! [`HostTime`] is a point on the render loop's monotonic clock. The web
//! backend produces it from `performance.now()` and `requestAnimationFrame`
//! timestamps, so one tick is one microsecond.
//!
//! [`Duration`] is a span in the same units. Deadlines (for example the mesh
//! retry in [`FrameCompositor`](crate::compositor::FrameCompositor)) are
//! expressed as a `HostTime` compared against the current tick, so a single
//! clock drives every wait in the crate.

use core::fmt;
use core::ops::Add;

/// A point in time, in microseconds on the host's monotonic clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw microsecond value.
    #[inline]
    #[must_use]
    pub const fn micros(self) -> u64 {
        self.0
    }

    /// Creates a host time from a `DOMHighResTimeStamp` in milliseconds.
    ///
    /// Negative and non-finite inputs clamp to zero.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "timestamps are clamped to non-negative; µs fits in u64"
    )]
    pub fn from_millis_f64(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Self((ms * 1000.0) as u64)
        } else {
            Self(0)
        }
    }

    /// Saturating addition of a duration.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.0))
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        self.saturating_add(rhs)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({}µs)", self.0)
    }
}

/// A span of time in microseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// Creates a duration from whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms.saturating_mul(1000))
    }

    /// Returns the raw microsecond value.
    #[inline]
    #[must_use]
    pub const fn micros(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}µs)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_millis_f64_clamps() {
        assert_eq!(HostTime::from_millis_f64(16.5), HostTime(16_500));
        assert_eq!(HostTime::from_millis_f64(-3.0), HostTime(0));
        assert_eq!(HostTime::from_millis_f64(f64::NAN), HostTime(0));
    }

    #[test]
    fn host_time_duration_ops() {
        let t = HostTime(1000);
        let d = Duration::from_millis(2);
        assert_eq!((t + d).micros(), 3000);
        assert_eq!(t + Duration(u64::MAX), HostTime(u64::MAX), "saturates");
    }

    #[test]
    fn duration_millis() {
        assert_eq!(Duration::from_millis(250).micros(), 250_000);
        assert_eq!(Duration::from_millis(u64::MAX), Duration(u64::MAX));
    }
}
