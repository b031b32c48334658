// Display formatting shared by the CLI, dashboard and email bodies

use chrono::{Local, TimeZone};

/// Escape text for inclusion in HTML or SVG markup
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// "$12,345.60"
pub fn format_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return "-".to_string();
    }
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, group_digits(&(cents / 100).to_string()), cents % 100)
}

/// "¥1,851,500" (yen has no minor unit)
pub fn format_jpy(amount: f64) -> String {
    if !amount.is_finite() {
        return "-".to_string();
    }
    let yen = amount.abs().round() as u64;
    let sign = if amount < 0.0 && yen > 0 { "-" } else { "" };
    format!("{}¥{}", sign, group_digits(&yen.to_string()))
}

/// Format timestamp for display
pub fn format_timestamp(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

/// Format date for display (date only, no time)
pub fn format_date(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => "-".to_string(),
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(format_usd(12345.6), "$12,345.60");
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(-5.5), "-$5.50");
        assert_eq!(format_usd(f64::NAN), "-");
        assert_eq!(format_jpy(1851500.4), "¥1,851,500");
        assert_eq!(format_jpy(999.0), "¥999");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Folding cartons", 20), "Folding cartons");
        assert_eq!(truncate("Folding cartons", 8), "Folding…");
        assert_eq!(truncate("段ボール箱です", 4), "段ボー…");
    }
}
