//! Value formatters used when rendering report cells (pt-BR conventions).

use db::value::parse_datetime;

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped
}

fn split_fixed(value: f64, decimals: usize) -> (bool, String, String) {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    (negative, group_thousands(int_part), frac_part.to_string())
}

/// `1234.5` → `R$ 1.234,50`
pub fn currency(value: f64) -> String {
    let (negative, int_part, frac_part) = split_fixed(value, 2);
    format!(
        "{}R$ {},{}",
        if negative { "-" } else { "" },
        int_part,
        frac_part
    )
}

/// Grouped with `.`, decimal comma, at most two decimals
pub fn number(value: f64) -> String {
    let (negative, int_part, frac_part) = split_fixed(value, 2);
    let frac_part = frac_part.trim_end_matches('0');
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{int_part}")
    } else {
        format!("{sign}{int_part},{frac_part}")
    }
}

/// `0.125` with 2 decimals → `12.50%`
pub fn percentage(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value * 100.0)
}

/// `DD/MM/YYYY`; unparseable input is returned unchanged
pub fn date(value: &str) -> String {
    parse_datetime(value)
        .map(|dt| dt.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| value.to_string())
}

/// `DD/MM/YYYY HH:mm`; unparseable input is returned unchanged
pub fn datetime(value: &str) -> String {
    parse_datetime(value)
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| value.to_string())
}

pub fn uppercase(value: &str) -> String {
    value.to_uppercase()
}

pub fn lowercase(value: &str) -> String {
    value.to_lowercase()
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

pub fn truncate(value: &str, limit: usize) -> String {
    if value.chars().count() > limit {
        let head: String = value.chars().take(limit).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}
