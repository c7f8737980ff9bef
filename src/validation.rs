use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::{ClassFields, NewGymClass};

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):([0-5]\d)(?::([0-5]\d))?$").expect("regex compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBounds {
    pub min: Duration,
    pub max: Duration,
}

impl Default for DurationBounds {
    fn default() -> Self {
        Self {
            min: Duration::minutes(1),
            max: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("The duration must be greater than zero.")]
    NonPositive,
    #[error("The duration must be at least {}.", describe_span(.0))]
    BelowMinimum(Duration),
    #[error("Duration must be less than or equal to {}.", describe_span(.0))]
    AboveMaximum(Duration),
}

/// Checks a class duration against the configured bounds. Zero and negative
/// spans are always rejected, even if `bounds.min` would allow them.
pub fn validate_duration(duration: Duration, bounds: &DurationBounds) -> Result<(), DurationError> {
    if duration <= Duration::zero() {
        return Err(DurationError::NonPositive);
    }
    if duration < bounds.min {
        return Err(DurationError::BelowMinimum(bounds.min));
    }
    if duration > bounds.max {
        return Err(DurationError::AboveMaximum(bounds.max));
    }
    Ok(())
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let caps = DURATION_RE.captures(value.trim())?;
    let hours: i64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: i64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: i64 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };
    Some(Duration::hours(hours) + Duration::minutes(minutes) + Duration::seconds(seconds))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub fn validate_class_fields(
    fields: ClassFields,
    bounds: &DurationBounds,
) -> Result<NewGymClass, Vec<FieldError>> {
    let mut errors = Vec::new();

    let name = fields.name.trim().to_string();
    if name.is_empty() {
        errors.push(FieldError::new("name", "Name is required."));
    }

    let duration = match parse_duration(&fields.duration) {
        Some(duration) => {
            if let Err(err) = validate_duration(duration, bounds) {
                errors.push(FieldError::new("duration", err.to_string()));
            }
            Some(duration)
        }
        None => {
            errors.push(FieldError::new("duration", "Invalid duration format."));
            None
        }
    };

    if let Some(capacity) = fields.capacity
        && capacity <= 0
    {
        errors.push(FieldError::new("capacity", "Capacity must be a positive number."));
    }

    match duration {
        Some(duration) if errors.is_empty() => Ok(NewGymClass {
            name,
            start_time: fields.start_time,
            duration,
            description: fields.description.unwrap_or_default(),
            capacity: fields.capacity,
        }),
        _ => Err(errors),
    }
}

fn describe_span(span: &Duration) -> String {
    let hours = span.num_hours();
    let minutes = span.num_minutes() % 60;
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("{n} {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };
    match (hours, minutes) {
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} and {}", plural(h, "hour"), plural(m, "minute")),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn fields(duration: &str) -> ClassFields {
        ClassFields {
            name: "WOD".to_string(),
            start_time: Utc.with_ymd_and_hms(2025, 11, 24, 6, 0, 0).unwrap(),
            duration: duration.to_string(),
            description: None,
            capacity: None,
        }
    }

    #[test]
    fn test_validate_duration_bounds() {
        let bounds = DurationBounds::default();
        assert_eq!(
            validate_duration(Duration::zero(), &bounds),
            Err(DurationError::NonPositive)
        );
        assert!(validate_duration(Duration::minutes(1), &bounds).is_ok());
        assert!(validate_duration(Duration::hours(24), &bounds).is_ok());
        assert_eq!(
            validate_duration(Duration::hours(24) + Duration::seconds(1), &bounds),
            Err(DurationError::AboveMaximum(Duration::hours(24)))
        );
        assert_eq!(
            validate_duration(Duration::seconds(59), &bounds),
            Err(DurationError::BelowMinimum(Duration::minutes(1)))
        );
    }

    #[test]
    fn test_non_positive_rejected_with_zero_minimum() {
        let bounds = DurationBounds {
            min: Duration::zero(),
            max: Duration::hours(24),
        };
        assert_eq!(
            validate_duration(Duration::zero(), &bounds),
            Err(DurationError::NonPositive)
        );
        assert_eq!(
            validate_duration(Duration::seconds(-5), &bounds),
            Err(DurationError::NonPositive)
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DurationError::BelowMinimum(Duration::minutes(1)).to_string(),
            "The duration must be at least 1 minute."
        );
        assert_eq!(
            DurationError::BelowMinimum(Duration::minutes(90)).to_string(),
            "The duration must be at least 1 hour and 30 minutes."
        );
        assert_eq!(
            DurationError::AboveMaximum(Duration::hours(24)).to_string(),
            "Duration must be less than or equal to 24 hours."
        );
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("01:00"), Some(Duration::hours(1)));
        assert_eq!(parse_duration("00:45:30"), Some(Duration::seconds(45 * 60 + 30)));
        assert_eq!(parse_duration("24:00:01"), Some(Duration::seconds(86_401)));
        assert_eq!(parse_duration("1h"), None);
        assert_eq!(parse_duration("00:60"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_validate_class_fields_ok() {
        let class = validate_class_fields(fields("01:30"), &DurationBounds::default()).unwrap();
        assert_eq!(class.duration, Duration::minutes(90));
        assert_eq!(class.description, "");
    }

    #[test]
    fn test_validate_class_fields_collects_errors() {
        let mut input = fields("nope");
        input.name = "   ".to_string();
        input.capacity = Some(0);
        let errors = validate_class_fields(input, &DurationBounds::default()).unwrap_err();
        let names: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(names, vec!["name", "duration", "capacity"]);
    }

    #[test]
    fn test_validate_class_fields_over_a_day() {
        let errors =
            validate_class_fields(fields("24:00:01"), &DurationBounds::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "Duration must be less than or equal to 24 hours."
        );
    }
}
