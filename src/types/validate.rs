//! Format validators for the semantic string types

/// Validate a calendar date in `YYYY-MM-DD` form, including month lengths
/// and Gregorian leap years.
pub fn validate_date(s: &str) -> Result<(), String> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(format!("'{}' is not in YYYY-MM-DD form", s));
    }

    let year = parse_digits(&s[0..4]).ok_or_else(|| format!("invalid year in '{}'", s))?;
    let month = parse_digits(&s[5..7]).ok_or_else(|| format!("invalid month in '{}'", s))?;
    let day = parse_digits(&s[8..10]).ok_or_else(|| format!("invalid day in '{}'", s))?;

    if !(1..=12).contains(&month) {
        return Err(format!("month {} out of range in '{}'", month, s));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(format!("day {} out of range in '{}'", day, s));
    }
    Ok(())
}

/// Validate a 24-hour time in `HH:MM` or `HH:MM:SS` form.
pub fn validate_time(s: &str) -> Result<(), String> {
    let bytes = s.as_bytes();
    let has_seconds = match bytes.len() {
        5 => false,
        8 => true,
        _ => return Err(format!("'{}' is not in HH:MM or HH:MM:SS form", s)),
    };
    if bytes[2] != b':' || (has_seconds && bytes[5] != b':') {
        return Err(format!("'{}' is not in HH:MM or HH:MM:SS form", s));
    }

    let hour = parse_digits(&s[0..2]).ok_or_else(|| format!("invalid hour in '{}'", s))?;
    let minute = parse_digits(&s[3..5]).ok_or_else(|| format!("invalid minute in '{}'", s))?;
    if hour > 23 {
        return Err(format!("hour {} out of range in '{}'", hour, s));
    }
    if minute > 59 {
        return Err(format!("minute {} out of range in '{}'", minute, s));
    }
    if has_seconds {
        let second = parse_digits(&s[6..8]).ok_or_else(|| format!("invalid second in '{}'", s))?;
        if second > 59 {
            return Err(format!("second {} out of range in '{}'", second, s));
        }
    }
    Ok(())
}

/// Validate an email address: exactly one `@`, a non-empty local part,
/// and a domain containing a dot.
pub fn validate_email(s: &str) -> Result<(), String> {
    let mut parts = s.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = match parts.next() {
        Some(d) => d,
        None => return Err(format!("'{}' is missing '@'", s)),
    };
    if domain.contains('@') {
        return Err(format!("'{}' contains more than one '@'", s));
    }
    if local.is_empty() {
        return Err(format!("'{}' has an empty local part", s));
    }
    if !domain.contains('.') {
        return Err(format!("'{}' has a domain without '.'", s));
    }
    Ok(())
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_dates() {
        assert!(validate_date("2024-01-13").is_ok());
        assert!(validate_date("2024-02-29").is_ok()); // leap year
        assert!(validate_date("2000-02-29").is_ok()); // divisible by 400
    }

    #[test]
    fn test_invalid_dates() {
        assert!(validate_date("2023-02-29").is_err()); // not a leap year
        assert!(validate_date("1900-02-29").is_err()); // divisible by 100, not 400
        assert!(validate_date("2024-13-01").is_err());
        assert!(validate_date("2024-04-31").is_err());
        assert!(validate_date("2024-00-10").is_err());
        assert!(validate_date("2024-1-13").is_err());
        assert!(validate_date("24-01-13").is_err());
        assert!(validate_date("2024/01/13").is_err());
    }

    #[test]
    fn test_valid_times() {
        assert!(validate_time("00:00").is_ok());
        assert!(validate_time("23:59").is_ok());
        assert!(validate_time("14:30:59").is_ok());
    }

    #[test]
    fn test_invalid_times() {
        assert!(validate_time("24:00").is_err());
        assert!(validate_time("12:60").is_err());
        assert!(validate_time("12:30:60").is_err());
        assert!(validate_time("9:30").is_err());
        assert!(validate_time("12.30").is_err());
        assert!(validate_time("12:30:5").is_err());
    }

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.org").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        assert!(validate_email("userexample.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@localhost").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }
}
