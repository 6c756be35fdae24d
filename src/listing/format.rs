use chrono::NaiveDate;

/// Group digits the Nepalese way: last three, then pairs (`12,34,56,789`).
pub fn format_number_nepal(n: i64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let digits = n.unsigned_abs().to_string();
    let sign = if n < 0 { "-" } else { "" };
    if digits.len() <= 3 {
        return format!("{sign}{digits}");
    }

    let (rest, last_three) = digits.split_at(digits.len() - 3);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 2);
    for (i, ch) in rest.chars().enumerate() {
        if i > 0 && (rest.len() - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped},{last_three}")
}

/// US-style short date, `M/D/YYYY`, as the lock-in column shows it.
pub fn format_locale_date(d: NaiveDate) -> String {
    d.format("%-m/%-d/%Y").to_string()
}

/// ISO `YYYY-MM-DD`, as the listed-date column shows it.
pub fn format_iso_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nepal_grouping() {
        assert_eq!(format_number_nepal(0), "0");
        assert_eq!(format_number_nepal(999), "999");
        assert_eq!(format_number_nepal(1000), "1,000");
        assert_eq!(format_number_nepal(123456), "1,23,456");
        assert_eq!(format_number_nepal(1234567), "12,34,567");
        assert_eq!(format_number_nepal(123456789), "12,34,56,789");
    }

    #[test]
    fn nepal_grouping_negative() {
        assert_eq!(format_number_nepal(-50), "-50");
        assert_eq!(format_number_nepal(-1234567), "-12,34,567");
    }

    #[test]
    fn dates() {
        let d = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap();
        assert_eq!(format_locale_date(d), "1/5/2023");
        assert_eq!(format_iso_date(d), "2023-01-05");
    }
}
