use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};

use crate::error::TaskrankError;
use crate::models::{RecurrencePattern, RecurrenceRule};

pub const MIN_INTERVAL: i32 = 1;
pub const MAX_INTERVAL: i32 = 365;

pub fn validate_interval(interval: i32) -> Result<(), TaskrankError> {
    if !(MIN_INTERVAL..=MAX_INTERVAL).contains(&interval) {
        return Err(TaskrankError::validation(format!(
            "interval must be between {MIN_INTERVAL} and {MAX_INTERVAL}, got {interval}"
        )));
    }
    Ok(())
}

/// Checks a rule before a series is created from it.
pub fn validate_rule(rule: &RecurrenceRule) -> Result<(), TaskrankError> {
    if rule.pattern == RecurrencePattern::None {
        return Err(TaskrankError::validation(
            "a recurring series needs a daily, weekly or monthly pattern",
        ));
    }
    validate_interval(rule.interval_value)
}

/// Advance `basis` by `interval` pattern units.
///
/// Months keep the day of month, clamped to the last day of shorter months.
/// Returns `None` for `RecurrencePattern::None` or on calendar overflow.
pub fn next_due_date(
    basis: DateTime<Utc>,
    pattern: RecurrencePattern,
    interval: i32,
) -> Option<DateTime<Utc>> {
    let n = i64::from(interval.max(MIN_INTERVAL));
    match pattern {
        RecurrencePattern::None => None,
        RecurrencePattern::Daily => basis.checked_add_signed(Duration::days(n)),
        RecurrencePattern::Weekly => basis.checked_add_signed(Duration::weeks(n)),
        RecurrencePattern::Monthly => {
            let months = u32::try_from(n).ok()?;
            basis.checked_add_months(Months::new(months))
        }
    }
}

/// Like [`next_due_date`], but a monthly step lands on `anchor_day` (clamped
/// to the target month) instead of the basis' possibly clamped day. A series
/// first due on the 31st stays on the last day of short months and returns
/// to the 31st when the month has one.
pub fn next_due_date_anchored(
    basis: DateTime<Utc>,
    pattern: RecurrencePattern,
    interval: i32,
    anchor_day: u32,
) -> Option<DateTime<Utc>> {
    let next = next_due_date(basis, pattern, interval)?;
    if pattern != RecurrencePattern::Monthly {
        return Some(next);
    }
    let day = anchor_day.clamp(1, days_in_month(next.year(), next.month())?);
    next.with_day(day)
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    (28..=31)
        .rev()
        .find(|&d| NaiveDate::from_ymd_opt(year, month, d).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 17, 30, 0).unwrap()
    }

    #[test]
    fn daily_and_weekly_steps() {
        assert_eq!(
            next_due_date(at(2025, 1, 10), RecurrencePattern::Daily, 1),
            Some(at(2025, 1, 11))
        );
        assert_eq!(
            next_due_date(at(2025, 1, 10), RecurrencePattern::Daily, 3),
            Some(at(2025, 1, 13))
        );
        assert_eq!(
            next_due_date(at(2025, 1, 10), RecurrencePattern::Weekly, 2),
            Some(at(2025, 1, 24))
        );
    }

    #[test]
    fn monthly_keeps_day_of_month() {
        assert_eq!(
            next_due_date(at(2025, 1, 15), RecurrencePattern::Monthly, 1),
            Some(at(2025, 2, 15))
        );
        assert_eq!(
            next_due_date(at(2025, 11, 15), RecurrencePattern::Monthly, 3),
            Some(at(2026, 2, 15))
        );
    }

    #[test]
    fn monthly_clamps_to_short_months() {
        assert_eq!(
            next_due_date(at(2025, 1, 31), RecurrencePattern::Monthly, 1),
            Some(at(2025, 2, 28))
        );
        assert_eq!(
            next_due_date(at(2024, 1, 31), RecurrencePattern::Monthly, 1),
            Some(at(2024, 2, 29))
        );
    }

    #[test]
    fn none_pattern_never_advances() {
        assert_eq!(next_due_date(at(2025, 1, 1), RecurrencePattern::None, 1), None);
    }

    #[test]
    fn interval_bounds() {
        assert!(validate_interval(0).is_err());
        assert!(validate_interval(1).is_ok());
        assert!(validate_interval(365).is_ok());
        assert!(validate_interval(366).is_err());
    }

    #[test]
    fn rule_with_none_pattern_is_invalid() {
        let rule = RecurrenceRule {
            pattern: RecurrencePattern::None,
            interval_value: 1,
            end_date: None,
            due_date_calculation: None,
        };
        assert!(validate_rule(&rule).is_err());
    }

    #[test]
    fn anchored_monthly_returns_to_the_original_day() {
        let feb = next_due_date_anchored(at(2025, 1, 31), RecurrencePattern::Monthly, 1, 31);
        assert_eq!(feb, Some(at(2025, 2, 28)));
        let mar = next_due_date_anchored(at(2025, 2, 28), RecurrencePattern::Monthly, 1, 31);
        assert_eq!(mar, Some(at(2025, 3, 31)));
        let apr = next_due_date_anchored(at(2025, 3, 31), RecurrencePattern::Monthly, 1, 31);
        assert_eq!(apr, Some(at(2025, 4, 30)));
        // Only monthly steps are re-anchored.
        assert_eq!(
            next_due_date_anchored(at(2025, 2, 28), RecurrencePattern::Daily, 1, 31),
            Some(at(2025, 3, 1))
        );
    }
}
