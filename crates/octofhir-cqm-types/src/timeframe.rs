//! Reporting timeframes and lookback durations

use chrono::{DateTime, Duration, Months, Utc};
use octofhir_cqm_diagnostics::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed interval of instants, `start <= end`.
///
/// Used both for the measurement period and for the windows derived from it
/// when searching for evidence. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeframe", into = "RawTimeframe")]
pub struct Timeframe {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct RawTimeframe {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawTimeframe> for Timeframe {
    type Error = ConfigurationError;

    fn try_from(raw: RawTimeframe) -> Result<Self, Self::Error> {
        Timeframe::new(raw.start, raw.end)
    }
}

impl From<Timeframe> for RawTimeframe {
    fn from(timeframe: Timeframe) -> Self {
        Self {
            start: timeframe.start,
            end: timeframe.end,
        }
    }
}

impl Timeframe {
    /// Create a timeframe, failing fast when `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ConfigurationError> {
        if start > end {
            return Err(ConfigurationError::invalid_timeframe(start, end));
        }
        Ok(Self { start, end })
    }

    /// Create the timeframe `[end - lookback, end]`
    pub fn ending_at(end: DateTime<Utc>, lookback: Lookback) -> Self {
        Self {
            start: lookback.before(end),
            end,
        }
    }

    /// Inclusive lower bound
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Inclusive upper bound
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `instant` lies within `[start, end]`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Whether an interval that began at `from` and ended at `until`
    /// (`None` = still ongoing) overlaps this timeframe
    pub fn intersects(&self, from: DateTime<Utc>, until: Option<DateTime<Utc>>) -> bool {
        from <= self.end && until.is_none_or(|until| until >= self.start)
    }

    /// Length of the timeframe
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Length of the timeframe in whole days
    pub fn duration_days(&self) -> i64 {
        self.duration().num_days()
    }

    /// Widen the timeframe so it starts no later than `end - lookback`.
    ///
    /// The end is kept; a lookback shorter than the timeframe leaves it unchanged.
    pub fn extended_back(&self, lookback: Lookback) -> Self {
        Self {
            start: self.start.min(lookback.before(self.end)),
            end: self.end,
        }
    }

    /// Narrow the timeframe so it starts no earlier than `instant`.
    ///
    /// Returns `None` when `instant` lies after the end.
    pub fn starting_no_earlier_than(&self, instant: DateTime<Utc>) -> Option<Self> {
        Self::new(self.start.max(instant), self.end).ok()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// A calendar duration used to reach back from the end of a reporting period.
///
/// Years and months are applied as calendar shifts (so ten years before
/// 2024-02-29 is 2014-02-28), days as exact 24 hour steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Lookback {
    #[serde(default)]
    pub years: u32,
    #[serde(default)]
    pub months: u32,
    #[serde(default)]
    pub days: u32,
}

impl Lookback {
    /// No lookback at all
    pub const ZERO: Lookback = Lookback {
        years: 0,
        months: 0,
        days: 0,
    };

    pub const fn years(years: u32) -> Self {
        Self {
            years,
            months: 0,
            days: 0,
        }
    }

    pub const fn months(months: u32) -> Self {
        Self {
            years: 0,
            months,
            days: 0,
        }
    }

    pub const fn days(days: u32) -> Self {
        Self {
            years: 0,
            months: 0,
            days,
        }
    }

    pub const fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }

    fn total_months(&self) -> u32 {
        self.years.saturating_mul(12).saturating_add(self.months)
    }

    /// The instant `self` before `instant`, saturating at the earliest representable instant
    pub fn before(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        instant
            .checked_sub_months(Months::new(self.total_months()))
            .and_then(|shifted| shifted.checked_sub_signed(Duration::days(i64::from(self.days))))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// The instant `self` after `instant`, saturating at the latest representable instant
    pub fn after(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        instant
            .checked_add_months(Months::new(self.total_months()))
            .and_then(|shifted| shifted.checked_add_signed(Duration::days(i64::from(self.days))))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0 days");
        }
        let parts = [(self.years, "year"), (self.months, "month"), (self.days, "day")];
        let mut first = true;
        for (amount, unit) in parts {
            if amount == 0 {
                continue;
            }
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{} {}{}", amount, unit, if amount == 1 { "" } else { "s" })?;
        }
        Ok(())
    }
}
