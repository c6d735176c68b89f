// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Roll cycles and the anchor instant cycle boundaries are measured from.
//!
//! A queue starts a new store every time the clock crosses a cycle boundary.
//! Boundaries are `length` apart and aligned to a [`RollAnchor`]:
//!
//! ```text
//!   anchor         anchor + len     anchor + 2·len
//!     │   cycle 0      │    cycle 1     │    cycle 2 ...
//! ────┼────────────────┼────────────────┼──────────────►  time
//! ```
//!
//! The anchor is either a legacy millisecond `epoch` offset or a
//! [`RollTime`] (time of day in a time zone). Both land in the single
//! [`RollAnchor`] field, so whichever was set last is the one in effect.

use std::fmt;

use jiff::{
    Timestamp,
    civil::Time,
    tz::TimeZone,
};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::{
    Result,
    error::{InvalidRollTimeSnafu, UnknownTimeZoneSnafu},
    wire::parse_variant,
};

const SECOND_MILLIS: i64 = 1_000;
const MINUTE_MILLIS: i64 = 60 * SECOND_MILLIS;
const HOUR_MILLIS: i64 = 60 * MINUTE_MILLIS;
const DAY_MILLIS: i64 = 24 * HOUR_MILLIS;

/// Granularity at which the queue rolls over to a new store file.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
    strum_macros::EnumIter,
)]
#[serde(try_from = "String", into = "&'static str")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RollCycle {
    TestSecondly,
    Minutely,
    Hourly,
    #[default]
    Daily,
    TestHourly,
    TestDaily,
    LargeHourly,
    LargeDaily,
    XLargeDaily,
    HugeDaily,
}

impl RollCycle {
    /// Parses a roll cycle name.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::UnknownVariant`](crate::QueueError) for an
    /// unrecognized name.
    pub fn from_name(name: &str) -> Result<Self> { parse_variant("roll cycle", name) }

    /// `strftime` pattern used to name the store file of a cycle.
    #[must_use]
    pub const fn format(self) -> &'static str {
        match self {
            Self::TestSecondly => "%Y%m%d-%H%M%S",
            Self::Minutely => "%Y%m%d-%H%M",
            Self::Hourly | Self::TestHourly | Self::LargeHourly => "%Y%m%d-%H",
            Self::Daily | Self::TestDaily | Self::LargeDaily | Self::XLargeDaily | Self::HugeDaily => {
                "%Y%m%d"
            }
        }
    }

    /// Length of one cycle in milliseconds.
    #[must_use]
    pub const fn length_millis(self) -> i64 {
        match self {
            Self::TestSecondly => SECOND_MILLIS,
            Self::Minutely => MINUTE_MILLIS,
            Self::Hourly | Self::TestHourly | Self::LargeHourly => HOUR_MILLIS,
            Self::Daily | Self::TestDaily | Self::LargeDaily | Self::XLargeDaily | Self::HugeDaily => {
                DAY_MILLIS
            }
        }
    }

    /// Index entries per index level when `index_count` is not configured.
    #[must_use]
    pub const fn default_index_count(self) -> u32 {
        match self {
            Self::TestSecondly | Self::Hourly => 4 << 10,
            Self::Minutely => 2 << 10,
            Self::Daily | Self::LargeHourly => 8 << 10,
            Self::TestHourly => 16,
            Self::TestDaily => 8,
            Self::LargeDaily => 32 << 10,
            Self::XLargeDaily => 128 << 10,
            Self::HugeDaily => 512 << 10,
        }
    }

    /// Spacing between indexed entries when `index_spacing` is not
    /// configured.
    #[must_use]
    pub const fn default_index_spacing(self) -> u32 {
        match self {
            Self::TestSecondly | Self::TestHourly => 4,
            Self::Minutely | Self::Hourly => 16,
            Self::Daily | Self::LargeHourly => 64,
            Self::TestDaily => 1,
            Self::LargeDaily => 128,
            Self::XLargeDaily => 256,
            Self::HugeDaily => 1024,
        }
    }

    /// Renders the name of `cycle` using this roll cycle's format.
    ///
    /// The cycle start is taken as `cycle * length` milliseconds after the
    /// UNIX epoch and formatted in UTC. Returns `None` when that instant is
    /// outside the representable range.
    #[must_use]
    pub fn format_cycle(self, cycle: i64) -> Option<String> {
        let millis = cycle.checked_mul(self.length_millis())?;
        let start = Timestamp::from_millisecond(millis).ok()?;
        Some(start.strftime(self.format()).to_string())
    }
}

impl TryFrom<String> for RollCycle {
    type Error = crate::QueueError;

    fn try_from(value: String) -> Result<Self> { Self::from_name(&value) }
}

/// Time of day, in a given time zone, at which cycles roll.
#[derive(Debug, Clone)]
pub struct RollTime {
    time: Time,
    zone: TimeZone,
}

impl RollTime {
    pub const fn new(time: Time, zone: TimeZone) -> Self { Self { time, zone } }

    /// Roll at `time` UTC.
    #[must_use]
    pub const fn utc(time: Time) -> Self { Self::new(time, TimeZone::UTC) }

    /// Parses a time of day (`HH:MM:SS`) and an IANA time zone name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when either part cannot be parsed.
    pub fn parse(time: &str, zone: &str) -> Result<Self> {
        let parsed = time
            .trim()
            .parse::<Time>()
            .context(InvalidRollTimeSnafu { value: time })?;
        Ok(Self::new(parsed, zone_named(zone)?))
    }

    #[must_use]
    pub const fn time(&self) -> Time { self.time }

    #[must_use]
    pub const fn zone(&self) -> &TimeZone { &self.zone }

    /// Milliseconds from local midnight to the roll time.
    #[must_use]
    pub fn millis_of_day(&self) -> i64 {
        i64::from(self.time.hour()) * HOUR_MILLIS
            + i64::from(self.time.minute()) * MINUTE_MILLIS
            + i64::from(self.time.second()) * SECOND_MILLIS
            + i64::from(self.time.subsec_nanosecond()) / 1_000_000
    }

    fn offset_millis(&self, at: Timestamp) -> i64 {
        i64::from(self.zone.to_offset(at).seconds()) * SECOND_MILLIS
    }
}

/// Looks up a time zone by IANA name. `UTC` and `Z` always resolve, even
/// without a time zone database.
///
/// # Errors
///
/// Returns [`QueueError::UnknownTimeZone`](crate::QueueError) if the name is
/// not known.
pub fn zone_named(name: &str) -> Result<TimeZone> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("UTC") || name.eq_ignore_ascii_case("Z") {
        return Ok(TimeZone::UTC);
    }
    TimeZone::get(name).context(UnknownTimeZoneSnafu { name })
}

/// Reference instant from which cycle boundaries are computed.
#[derive(Debug, Clone)]
pub enum RollAnchor {
    /// Fixed offset in milliseconds from `1970-01-01T00:00:00Z`.
    Epoch { millis: i64 },
    /// A time of day in a time zone, projected once to a fixed UTC offset.
    /// Boundaries do not move with daylight saving changes.
    RollTime(RollTime),
}

impl Default for RollAnchor {
    fn default() -> Self { Self::Epoch { millis: 0 } }
}

impl RollAnchor {
    /// Combines the legacy `epoch` and the `roll_time` options into one
    /// anchor.
    ///
    /// When both are supplied together `roll_time` wins. When neither is,
    /// cycles roll at midnight UTC.
    #[must_use]
    pub fn resolve(epoch: Option<i64>, roll_time: Option<RollTime>) -> Self {
        match (roll_time, epoch) {
            (Some(roll_time), _) => Self::RollTime(roll_time),
            (None, Some(millis)) => Self::Epoch { millis },
            (None, None) => Self::default(),
        }
    }

    /// Projects the anchor onto a millisecond offset from the UNIX epoch in
    /// UTC.
    ///
    /// A [`RollTime`] is projected with its zone's offset at the UNIX epoch
    /// and normalized into a single day.
    #[must_use]
    pub fn epoch_millis(&self) -> i64 {
        match self {
            Self::Epoch { millis } => *millis,
            Self::RollTime(roll_time) => (roll_time.millis_of_day()
                - roll_time.offset_millis(Timestamp::UNIX_EPOCH))
            .rem_euclid(DAY_MILLIS),
        }
    }

    #[must_use]
    pub const fn roll_time(&self) -> Option<&RollTime> {
        match self {
            Self::RollTime(roll_time) => Some(roll_time),
            Self::Epoch { .. } => None,
        }
    }

    /// Milliseconds elapsed between the anchor and `at`.
    ///
    /// Measured from [`epoch_millis`](Self::epoch_millis), so the result is
    /// monotonic in `at` for every anchor. Saturates for epochs outside the
    /// timestamp range, which [`QueueBuilder::build`](crate::QueueBuilder::build)
    /// rejects.
    #[must_use]
    pub fn millis_since_anchor(&self, at: Timestamp) -> i64 {
        at.as_millisecond().saturating_sub(self.epoch_millis())
    }
}

/// Maps a timestamp to the cycle number it falls into.
pub trait CycleCalculator: fmt::Debug + Send + Sync {
    fn cycle_at(&self, roll_cycle: RollCycle, anchor: &RollAnchor, at: Timestamp) -> i64;
}

/// Floors the time since the anchor to whole cycle lengths.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCycleCalculator;

impl CycleCalculator for DefaultCycleCalculator {
    fn cycle_at(&self, roll_cycle: RollCycle, anchor: &RollAnchor, at: Timestamp) -> i64 {
        anchor
            .millis_since_anchor(at)
            .div_euclid(roll_cycle.length_millis())
    }
}

#[cfg(test)]
mod tests {
    use jiff::{civil::time, tz};
    use strum::IntoEnumIterator;
    use test_case::test_case;

    use super::*;

    fn at(millis: i64) -> Timestamp { Timestamp::from_millisecond(millis).unwrap() }

    #[test_case(RollCycle::Daily, 20467, "20260114" ; "daily")]
    #[test_case(RollCycle::Hourly, 491_220, "20260114-12" ; "hourly")]
    #[test_case(RollCycle::Minutely, 29_473_200, "20260114-1200" ; "minutely")]
    #[test_case(RollCycle::TestSecondly, 1_768_392_000, "20260114-120000" ; "secondly")]
    fn test_format_cycle(roll_cycle: RollCycle, cycle: i64, expected: &str) {
        assert_eq!(roll_cycle.format_cycle(cycle).unwrap(), expected);
    }

    #[test]
    fn test_format_cycle_out_of_range() {
        assert!(RollCycle::Daily.format_cycle(i64::MAX).is_none());
    }

    #[test]
    fn test_index_defaults_are_valid() {
        for roll_cycle in RollCycle::iter() {
            assert!(roll_cycle.default_index_count() > 0);
            assert!(roll_cycle.default_index_spacing().is_power_of_two());
        }
    }

    #[test]
    fn test_default_anchor_rolls_at_midnight_utc() {
        let anchor = RollAnchor::resolve(None, None);
        let calc = DefaultCycleCalculator;

        assert_eq!(anchor.epoch_millis(), 0);
        assert_eq!(calc.cycle_at(RollCycle::Daily, &anchor, at(DAY_MILLIS - 1)), 0);
        assert_eq!(calc.cycle_at(RollCycle::Daily, &anchor, at(DAY_MILLIS)), 1);
        assert_eq!(calc.cycle_at(RollCycle::Daily, &anchor, at(-1)), -1);
    }

    #[test]
    fn test_epoch_anchor_shifts_boundaries() {
        let anchor = RollAnchor::Epoch {
            millis: HOUR_MILLIS,
        };
        let calc = DefaultCycleCalculator;

        assert_eq!(
            calc.cycle_at(RollCycle::Daily, &anchor, at(DAY_MILLIS + HOUR_MILLIS - 1)),
            0
        );
        assert_eq!(
            calc.cycle_at(RollCycle::Daily, &anchor, at(DAY_MILLIS + HOUR_MILLIS)),
            1
        );
    }

    #[test]
    fn test_roll_time_utc_projection() {
        let anchor = RollAnchor::RollTime(RollTime::utc(time(21, 0, 0, 0)));
        assert_eq!(anchor.epoch_millis(), 21 * HOUR_MILLIS);
    }

    #[test]
    fn test_roll_time_in_fixed_offset_zone() {
        let zone = TimeZone::fixed(tz::offset(2));
        let anchor = RollAnchor::RollTime(RollTime::new(time(21, 0, 0, 0), zone));
        let calc = DefaultCycleCalculator;

        // 21:00 at +02:00 is 19:00 UTC.
        assert_eq!(anchor.epoch_millis(), 19 * HOUR_MILLIS);
        let boundary = DAY_MILLIS + 19 * HOUR_MILLIS;
        assert_eq!(calc.cycle_at(RollCycle::Daily, &anchor, at(boundary - 1)), 0);
        assert_eq!(calc.cycle_at(RollCycle::Daily, &anchor, at(boundary)), 1);
    }

    #[test]
    fn test_projection_wraps_into_one_day() {
        let zone = TimeZone::fixed(tz::offset(5));
        let anchor = RollAnchor::RollTime(RollTime::new(time(1, 0, 0, 0), zone));
        // 01:00 at +05:00 is 20:00 UTC on the previous day.
        assert_eq!(anchor.epoch_millis(), 20 * HOUR_MILLIS);
    }

    #[test]
    fn test_resolve_prefers_roll_time() {
        let anchor = RollAnchor::resolve(Some(42), Some(RollTime::utc(time(6, 30, 0, 0))));
        assert!(anchor.roll_time().is_some());
        assert_eq!(anchor.epoch_millis(), 6 * HOUR_MILLIS + 30 * MINUTE_MILLIS);

        let anchor = RollAnchor::resolve(Some(42), None);
        assert!(anchor.roll_time().is_none());
        assert_eq!(anchor.epoch_millis(), 42);
    }

    #[test]
    fn test_millis_of_day() {
        let roll_time = RollTime::utc(time(1, 2, 3, 4_000_000));
        assert_eq!(
            roll_time.millis_of_day(),
            HOUR_MILLIS + 2 * MINUTE_MILLIS + 3 * SECOND_MILLIS + 4
        );
    }

    #[test]
    fn test_parse_roll_time() {
        let roll_time = RollTime::parse("21:00:00", "UTC").unwrap();
        assert_eq!(roll_time.millis_of_day(), 21 * HOUR_MILLIS);

        assert!(RollTime::parse("25:00:00", "UTC").unwrap_err().is_configuration());
        assert!(
            RollTime::parse("21:00:00", "Mars/Olympus_Mons")
                .unwrap_err()
                .is_configuration()
        );
    }

    #[test]
    fn test_roll_time_cycles_are_monotonic_across_dst_fall_back() {
        let zone = zone_named("America/New_York").unwrap();
        let anchor = RollAnchor::RollTime(RollTime::new(time(1, 30, 0, 0), zone));
        let calc = DefaultCycleCalculator;

        // 01:30 EST is 06:30 UTC.
        assert_eq!(anchor.epoch_millis(), 6 * HOUR_MILLIS + 30 * MINUTE_MILLIS);

        // Clocks fall back at 2025-11-02T06:00:00Z, so 01:30 local happens twice.
        let start: Timestamp = "2025-11-02T04:00:00Z".parse().unwrap();
        let mut previous = calc.cycle_at(RollCycle::Daily, &anchor, start);
        for minute in 1..=4 * 60 {
            let instant = at(start.as_millisecond() + minute * MINUTE_MILLIS);
            let cycle = calc.cycle_at(RollCycle::Daily, &anchor, instant);
            assert!(cycle >= previous, "cycle went from {previous} to {cycle} at {instant}");
            previous = cycle;
        }

        let boundary: Timestamp = "2025-11-02T06:30:00Z".parse().unwrap();
        let before = at(boundary.as_millisecond() - 1);
        assert_eq!(
            calc.cycle_at(RollCycle::Daily, &anchor, boundary),
            calc.cycle_at(RollCycle::Daily, &anchor, before) + 1
        );
    }

    #[test]
    fn test_cycle_follows_reported_epoch() {
        let zone = zone_named("Europe/Berlin").unwrap();
        let anchor = RollAnchor::RollTime(RollTime::new(time(21, 0, 0, 0), zone));
        let calc = DefaultCycleCalculator;

        // Summer and winter instants both roll at the projected offset.
        for day in ["2025-07-01", "2025-12-01"] {
            let midnight: Timestamp = format!("{day}T00:00:00Z").parse().unwrap();
            let boundary = at(midnight.as_millisecond() + anchor.epoch_millis());
            let before = at(boundary.as_millisecond() - 1);
            assert_eq!(
                calc.cycle_at(RollCycle::Daily, &anchor, boundary),
                calc.cycle_at(RollCycle::Daily, &anchor, before) + 1
            );
        }
    }

    #[test]
    fn test_extreme_epoch_does_not_overflow() {
        let calc = DefaultCycleCalculator;
        let anchor = RollAnchor::Epoch { millis: i64::MIN };
        assert!(calc.cycle_at(RollCycle::Daily, &anchor, at(DAY_MILLIS)) > 0);
    }
}
