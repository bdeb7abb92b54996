use crate::error::{ReportError, Result};
use chrono::{Days, NaiveDate};

/// Three-letter Portuguese month abbreviations, indexed by `month - 1`.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Divisor applied to raw currency units to express millions.
pub const MILLIONS: f64 = 1_000_000.0;

pub fn month_from_abbreviation(token: &str) -> Option<u32> {
    MONTH_LABELS
        .iter()
        .position(|label| *label == token)
        .map(|idx| idx as u32 + 1)
}

pub fn month_label(month: u32) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTH_LABELS[month as usize - 1])
    } else {
        None
    }
}

pub fn validate_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(ReportError::InvalidMonth(month));
    }
    Ok(())
}

/// Builds the `"Mmm/YY"` label used to key the aggregated series.
pub fn date_label(year: i32, month: u32) -> Result<String> {
    let label = month_label(month).ok_or(ReportError::InvalidMonth(month))?;
    Ok(format!("{}/{:02}", label, year.rem_euclid(100)))
}

/// Parses a `"Mmm/YY"` label back into `(year, month)`, assuming the 2000s.
pub fn parse_date_label(label: &str) -> Result<(i32, u32)> {
    let invalid = || ReportError::InvalidDateLabel(label.to_string());

    let (month_part, year_part) = label.split_once('/').ok_or_else(invalid)?;
    let month = month_from_abbreviation(month_part.trim()).ok_or_else(invalid)?;

    let year_part = year_part.trim();
    if year_part.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year_part.parse().map_err(|_| invalid())?;

    Ok((2000 + year, month))
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_lookup() {
        assert_eq!(month_from_abbreviation("Jan"), Some(1));
        assert_eq!(month_from_abbreviation("Abr"), Some(4));
        assert_eq!(month_from_abbreviation("Dez"), Some(12));
        assert_eq!(month_from_abbreviation("Total"), None);
        assert_eq!(month_from_abbreviation("jan"), None);

        assert_eq!(month_label(3), Some("Mar"));
        assert_eq!(month_label(0), None);
        assert_eq!(month_label(13), None);
    }

    #[test]
    fn test_date_label_roundtrip() {
        assert_eq!(date_label(2021, 3).unwrap(), "Mar/21");
        assert_eq!(date_label(2025, 12).unwrap(), "Dez/25");
        assert_eq!(date_label(2005, 1).unwrap(), "Jan/05");
        assert!(date_label(2021, 13).is_err());

        assert_eq!(parse_date_label("Mar/21").unwrap(), (2021, 3));
        assert_eq!(parse_date_label("Jan/05").unwrap(), (2005, 1));
    }

    #[test]
    fn test_parse_date_label_rejects_garbage() {
        assert!(parse_date_label("Mar-21").is_err());
        assert!(parse_date_label("Foo/21").is_err());
        assert!(parse_date_label("Mar/2021").is_err());
        assert!(parse_date_label("Mar/xx").is_err());
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2),
            NaiveDate::from_ymd_opt(2023, 2, 28)
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            last_day_of_month(2023, 12),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
    }
}
