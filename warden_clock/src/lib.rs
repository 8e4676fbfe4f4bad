//! Clocks and second-granularity time values
//!
//! Token lifetimes and key cache ages are all measured in whole seconds
//! since the Unix epoch. The [`Clock`] trait lets that measurement be
//! swapped out, so validation and caching logic can be driven by a
//! [`TestClock`] instead of the wall clock.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_must_use
)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{
    fmt, ops,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime},
};

/// Unix time
///
/// The number of whole seconds elapsed since 1970-01-01T00:00:00Z.
/// Serialized as a bare integer, the JWT `NumericDate` form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[repr(transparent)]
pub struct UnixTime(pub u64);

impl UnixTime {
    /// Adds `secs`, saturating at the maximum representable time
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, secs: DurationSecs) -> Self {
        Self(self.0.saturating_add(secs.0))
    }

    /// Subtracts `secs`, saturating at the epoch
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, secs: DurationSecs) -> Self {
        Self(self.0.saturating_sub(secs.0))
    }
}

impl From<SystemTime> for UnixTime {
    /// Instants before the epoch are clamped to the epoch itself
    #[inline]
    fn from(t: SystemTime) -> Self {
        let secs = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        UnixTime(secs)
    }
}

impl fmt::Display for UnixTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ops::Add<DurationSecs> for UnixTime {
    type Output = UnixTime;

    #[inline]
    fn add(self, rhs: DurationSecs) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl ops::Sub<DurationSecs> for UnixTime {
    type Output = UnixTime;

    #[inline]
    fn sub(self, rhs: DurationSecs) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl ops::Sub for UnixTime {
    type Output = DurationSecs;

    /// The elapsed time between two instants, or zero if `rhs` is later
    #[inline]
    fn sub(self, rhs: UnixTime) -> Self::Output {
        DurationSecs(self.0.saturating_sub(rhs.0))
    }
}

/// A span of time measured in whole seconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct DurationSecs(pub u64);

impl From<Duration> for DurationSecs {
    /// Sub-second precision is truncated
    #[inline]
    fn from(d: Duration) -> Self {
        Self(d.as_secs())
    }
}

impl From<DurationSecs> for Duration {
    #[inline]
    fn from(d: DurationSecs) -> Self {
        Duration::from_secs(d.0)
    }
}

impl fmt::Display for DurationSecs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// A source of the current time
pub trait Clock {
    /// The current time
    fn now(&self) -> UnixTime;
}

impl<C: Clock + ?Sized> Clock for &'_ C {
    #[inline]
    fn now(&self) -> UnixTime {
        C::now(*self)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> UnixTime {
        C::now(self)
    }
}

/// The wall clock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime::from(SystemTime::now())
    }
}

/// A manually driven clock
///
/// Clones share the same instant: advancing one clone advances all of
/// them. This allows a test to hold one handle while the code under test
/// holds another.
#[derive(Clone, Debug, Default)]
pub struct TestClock(Arc<AtomicU64>);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime(self.0.load(Ordering::Acquire))
    }
}

impl TestClock {
    /// Creates a new test clock frozen at `time`
    #[inline]
    pub fn new(time: UnixTime) -> Self {
        Self(Arc::new(AtomicU64::new(time.0)))
    }

    /// Moves the clock to `time`
    pub fn set(&self, time: UnixTime) {
        self.0.store(time.0, Ordering::Release);
    }

    /// Moves the clock forward by `secs`
    pub fn advance(&self, secs: DurationSecs) {
        self.0.fetch_add(secs.0, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_epoch_clamps_to_zero() {
        let before = SystemTime::UNIX_EPOCH - Duration::from_secs(30);
        assert_eq!(UnixTime::from(before), UnixTime(0));
    }

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(UnixTime(5) - DurationSecs(10), UnixTime(0));
        assert_eq!(UnixTime(u64::MAX) + DurationSecs(1), UnixTime(u64::MAX));
        assert_eq!(UnixTime(3) - UnixTime(10), DurationSecs(0));
        assert_eq!(UnixTime(10) - UnixTime(3), DurationSecs(7));
    }

    #[test]
    fn test_clock_clones_share_time() {
        let clock = TestClock::new(UnixTime(100));
        let handle = clock.clone();

        handle.advance(DurationSecs(25));
        assert_eq!(clock.now(), UnixTime(125));

        clock.set(UnixTime(7));
        assert_eq!(handle.now(), UnixTime(7));
    }

    #[test]
    fn clock_through_references() {
        fn read(c: impl Clock) -> UnixTime {
            c.now()
        }

        let clock = TestClock::new(UnixTime(42));
        assert_eq!(read(&clock), UnixTime(42));
        assert_eq!(read(Arc::new(clock)), UnixTime(42));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&UnixTime(1_700_000_000)).unwrap();
        assert_eq!(json, "1700000000");

        let back: UnixTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UnixTime(1_700_000_000));
    }
}
