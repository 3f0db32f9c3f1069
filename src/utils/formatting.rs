/// Render an amount of minor currency units (cents) as a major-unit string.
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

pub fn format_hours(hours: u32) -> String {
    if hours < 24 {
        format!("{}h", hours)
    } else if hours % 24 == 0 {
        format!("{}d", hours / 24)
    } else {
        format!("{}d {}h", hours / 24, hours % 24)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_minor_units() {
        assert_eq!(format_minor_units(5000), "$50.00");
        assert_eq!(format_minor_units(5), "$0.05");
        assert_eq!(format_minor_units(0), "$0.00");
        assert_eq!(format_minor_units(-1999), "-$19.99");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(4), "4h");
        assert_eq!(format_hours(48), "2d");
        assert_eq!(format_hours(30), "1d 6h");
    }
}
