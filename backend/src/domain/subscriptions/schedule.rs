//! Billing interval arithmetic.
//!
//! Period boundaries are always computed from the anchor rather than from the
//! previous boundary, so a month-end anchor does not drift: Jan 31 yields
//! Feb 28 (or 29) and then Mar 31 again.

use std::fmt;

use chrono::{DateTime, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Calendar unit of a billing interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    /// Calendar days.
    Day,
    /// Seven-day weeks.
    Week,
    /// Calendar months, clamped to the last day of short months.
    Month,
    /// Calendar years (twelve months).
    Year,
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        })
    }
}

/// How often a subscription bills, e.g. every 3 months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingInterval {
    unit: IntervalUnit,
    count: u32,
}

impl BillingInterval {
    /// Build an interval; `count` must be at least one.
    pub const fn new(unit: IntervalUnit, count: u32) -> Option<Self> {
        if count == 0 {
            None
        } else {
            Some(Self { unit, count })
        }
    }

    /// A single month.
    pub const fn monthly() -> Self {
        Self {
            unit: IntervalUnit::Month,
            count: 1,
        }
    }

    /// Calendar unit.
    pub const fn unit(&self) -> IntervalUnit {
        self.unit
    }

    /// Units per period.
    pub const fn count(&self) -> u32 {
        self.count
    }
}

impl fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every {} {}", self.count, self.unit)
    }
}

/// The `n`th period boundary after `anchor`. `None` when out of range.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use storefront::domain::{BillingInterval, boundary};
///
/// let anchor = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
/// let monthly = BillingInterval::monthly();
/// let feb = boundary(anchor, monthly, 1).expect("in range");
/// let mar = boundary(anchor, monthly, 2).expect("in range");
/// assert_eq!(feb, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
/// assert_eq!(mar, Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap());
/// ```
pub fn boundary(
    anchor: DateTime<Utc>,
    interval: BillingInterval,
    n: u32,
) -> Option<DateTime<Utc>> {
    let steps = interval.count.checked_mul(n)?;
    match interval.unit {
        IntervalUnit::Day => anchor.checked_add_signed(TimeDelta::try_days(i64::from(steps))?),
        IntervalUnit::Week => anchor.checked_add_signed(TimeDelta::try_weeks(i64::from(steps))?),
        IntervalUnit::Month => anchor.checked_add_months(Months::new(steps)),
        IntervalUnit::Year => anchor.checked_add_months(Months::new(steps.checked_mul(12)?)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 9, 30, 0)
            .single()
            .expect("valid date")
    }

    #[rstest]
    #[case(IntervalUnit::Day, 10, 1, day(2025, 1, 11))]
    #[case(IntervalUnit::Week, 2, 3, day(2025, 2, 12))]
    #[case(IntervalUnit::Month, 1, 13, day(2026, 2, 1))]
    #[case(IntervalUnit::Year, 1, 2, day(2027, 1, 1))]
    fn boundaries_follow_unit(
        #[case] unit: IntervalUnit,
        #[case] count: u32,
        #[case] n: u32,
        #[case] expected: DateTime<Utc>,
    ) {
        let interval = BillingInterval::new(unit, count).expect("positive count");
        assert_eq!(boundary(day(2025, 1, 1), interval, n), Some(expected));
    }

    #[test]
    fn month_end_anchor_does_not_drift() {
        let anchor = day(2025, 1, 31);
        let monthly = BillingInterval::monthly();
        let dates: Vec<_> = (1..=3)
            .filter_map(|n| boundary(anchor, monthly, n))
            .collect();
        assert_eq!(dates, vec![day(2025, 2, 28), day(2025, 3, 31), day(2025, 4, 30)]);
    }

    #[test]
    fn leap_day_anchor_clamps_in_common_years() {
        let yearly = BillingInterval::new(IntervalUnit::Year, 1).expect("positive count");
        assert_eq!(boundary(day(2024, 2, 29), yearly, 1), Some(day(2025, 2, 28)));
        assert_eq!(boundary(day(2024, 2, 29), yearly, 4), Some(day(2028, 2, 29)));
    }

    #[test]
    fn zero_count_is_rejected() {
        assert!(BillingInterval::new(IntervalUnit::Week, 0).is_none());
    }

    #[test]
    fn overflow_yields_none() {
        let interval = BillingInterval::new(IntervalUnit::Year, u32::MAX).expect("positive");
        assert!(boundary(day(2025, 1, 1), interval, 2).is_none());
    }
}
