use chrono::NaiveDate;

const DEFAULT_YEAR: i32 = 2000;

/// Parse a PGN "YYYY.MM.DD" date. Each missing or malformed component
/// falls back on its own (year 2000, January, day 1); never fails.
pub fn parse_date(raw: &str) -> NaiveDate {
    let mut parts = raw.trim().split('.');
    let year = parts
        .next()
        .and_then(|y| y.trim().parse::<i32>().ok())
        .unwrap_or(DEFAULT_YEAR);
    let month = parts
        .next()
        .and_then(|m| m.trim().parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m))
        .unwrap_or(1);
    let day = parts
        .next()
        .and_then(|d| d.trim().parse::<u32>().ok())
        .unwrap_or(1);

    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))
        .unwrap_or_else(fallback_date)
}

/// True when the raw header carries at least one digit, i.e. something
/// `parse_date` can work with beyond pure defaults ("????.??.??" does not).
pub fn has_date_content(raw: &str) -> bool {
    raw.chars().any(|c| c.is_ascii_digit())
}

fn fallback_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(DEFAULT_YEAR, 1, 1).unwrap_or_default()
}
