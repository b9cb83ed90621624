//! Cron-style schedule evaluation.
//!
//! The run supervisor polls [`should_run`] once per minute rather than
//! computing the next fire time, so the evaluator stays a pure predicate
//! with no scheduling state of its own.

use chrono::{Datelike, Timelike};
use tracing::warn;

use crate::error::{BackupError, Result};

/// A parsed five-field schedule expression.
///
/// Fields are minute, hour, day-of-month, month and day-of-week, each one
/// of `*`, a single value, a comma list, an inclusive range `a-b`, or a
/// step `*/n`. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct ScheduleExpression {
    minute: String,
    hour: String,
    day_of_month: String,
    month: String,
    day_of_week: String,
}

impl ScheduleExpression {
    /// Parse an expression, validating only the field count.
    ///
    /// Field contents are not validated here: an unparsable token simply
    /// never matches at evaluation time.
    pub fn parse(expression: &str) -> Result<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(BackupError::Schedule(format!(
                "expected 5 fields, got {} in '{}'",
                fields.len(),
                expression
            )));
        }

        Ok(Self {
            minute: fields[0].to_string(),
            hour: fields[1].to_string(),
            day_of_month: fields[2].to_string(),
            month: fields[3].to_string(),
            day_of_week: fields[4].to_string(),
        })
    }

    /// Check whether the expression matches the given instant.
    ///
    /// All five fields must match (logical AND). Day-of-week uses 0-6 with
    /// Sunday as 0.
    pub fn matches<T: Datelike + Timelike>(&self, now: &T) -> bool {
        field_matches(&self.minute, now.minute())
            && field_matches(&self.hour, now.hour())
            && field_matches(&self.day_of_month, now.day())
            && field_matches(&self.month, now.month())
            && field_matches(&self.day_of_week, now.weekday().num_days_from_sunday())
    }
}

/// Decide whether a run should fire at `now` for the given expression.
///
/// A malformed expression is a configuration problem, not a crash: it is
/// logged and the tick is treated as "do not run".
pub fn should_run<T: Datelike + Timelike>(expression: &str, now: &T) -> bool {
    match ScheduleExpression::parse(expression) {
        Ok(schedule) => schedule.matches(now),
        Err(e) => {
            warn!("Skipping schedule tick: {}", e);
            false
        }
    }
}

/// Match a single field against a calendar component value.
///
/// Checks apply in priority order: wildcard, step, range, list, single
/// value. The step check only fires for a `*` numerator; a step with a
/// concrete numerator (e.g. `5/10`) is accepted syntactically but falls
/// through to the remaining checks, none of which can parse it, so it
/// never matches. Known quirk, kept deliberately and pinned by a test.
fn field_matches(field: &str, value: u32) -> bool {
    if field == "*" {
        return true;
    }

    if let Some((numerator, step)) = field.split_once('/') {
        if numerator == "*" {
            return match step.parse::<u32>() {
                Ok(step) if step > 0 => value % step == 0,
                _ => false,
            };
        }
    }

    if let Some((low, high)) = field.split_once('-') {
        return match (low.parse::<u32>(), high.parse::<u32>()) {
            (Ok(low), Ok(high)) => low <= value && value <= high,
            _ => false,
        };
    }

    if field.contains(',') {
        return field
            .split(',')
            .any(|part| part.trim().parse::<u32>() == Ok(value));
    }

    field.parse::<u32>() == Ok(value)
}
