//! Display formatting for queried values.

use sheetplan_common::CellValue;

fn trim_decimals(n: f64) -> String {
    let text = format!("{:.2}", n);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

fn group_thousands(n: f64) -> String {
    let fixed = trim_decimals(n);
    let (sign, body) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int, frac) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `1234567.891` -> `1,234,567.89`, `12.50` -> `12.5`, `0` -> `0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1000.0 {
        group_thousands(n)
    } else {
        trim_decimals(n)
    }
}

pub fn format_value(value: &CellValue) -> String {
    match value {
        CellValue::Int(_) | CellValue::Number(_) => {
            format_number(value.as_number().unwrap_or_default())
        }
        other => other.to_string(),
    }
}
