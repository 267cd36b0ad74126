//! Column letter helpers.
//!
//! Columns are addressed 1-based throughout the workspace (`A` = 1,
//! `Z` = 26, `AA` = 27). The conversion follows the bijective base-26
//! scheme spreadsheets use, so there is no letter for column 0.

use once_cell::sync::Lazy;
use regex::Regex;

/// Largest column the store layer accepts (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

static COLUMN_SHAPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,2}$").expect("column-shape regex must compile"));

/// Render a 1-based column index as letters. Returns an empty string for 0.
pub fn column_letters(col: u32) -> String {
    if col == 0 {
        return String::new();
    }
    let mut col = col - 1;
    let mut buf = Vec::new();
    loop {
        let rem = (col % 26) as u8;
        buf.push(b'A' + rem);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Parse upper-case column letters into a 1-based column index.
///
/// Lower-case input is rejected; callers that accept user text should
/// go through [`parse_column`].
pub fn column_index(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in s.bytes() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?;
        col = col.checked_add((ch - b'A') as u32 + 1)?;
    }
    if col > MAX_COLUMN { None } else { Some(col) }
}

/// Case-insensitive variant of [`column_index`] that also trims whitespace.
pub fn parse_column(s: &str) -> Option<u32> {
    column_index(&s.trim().to_ascii_uppercase())
}

/// True when `s` looks like a column address of one or two letters.
///
/// Anything matching this shape is treated as a letter, never as a
/// header name.
pub fn is_column_shaped(s: &str) -> bool {
    COLUMN_SHAPED.is_match(s)
}
