//! ISO-8601 calendar dates (`YYYY-MM-DD`) for DTOs and cached snapshots.

use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};

use crate::error::{AppError, AppResult};

pub const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Parses a path segment such as `2024-05-01`.
pub fn parse_date(s: &str) -> AppResult<Date> {
    Date::parse(s, ISO_DATE)
        .map_err(|_| AppError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", s)))
}

pub fn format_date(d: Date) -> String {
    d.format(ISO_DATE).unwrap_or_else(|_| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use time::macros::date;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        #[serde(with = "iso_date")]
        recorded_at: Date,
    }

    #[test]
    fn parse_and_format() {
        let d = parse_date("2024-02-29").unwrap();
        assert_eq!(d, date!(2024 - 02 - 29));
        assert_eq!(format_date(d), "2024-02-29");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_date("29.02.2024"), Err(AppError::Validation(_))));
        assert!(parse_date("2023-02-29").is_err());
    }

    #[test]
    fn serde_roundtrip_is_iso() {
        let snap = Snapshot {
            recorded_at: date!(2025 - 01 - 07),
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(json, r#"{"recorded_at":"2025-01-07"}"#);
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
