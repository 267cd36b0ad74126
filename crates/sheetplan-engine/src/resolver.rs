//! Column identifiers to canonical letters.

use sheetplan_common::is_column_shaped;

use crate::schema::Header;

/// Map a letter or header name to a column letter.
///
/// Empty identifiers and names that match no header come back unchanged;
/// the failure surfaces when a step tries to use the column. Anything shaped
/// like one or two letters is taken as a letter even if a header carries
/// that exact name.
pub fn resolve_column(identifier: &str, headers: &[Header]) -> String {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return identifier.to_string();
    }
    if is_column_shaped(trimmed) {
        return trimmed.to_ascii_uppercase();
    }
    let wanted = trimmed.to_lowercase();
    headers
        .iter()
        .find(|h| h.name.trim().to_lowercase() == wanted)
        .map(|h| h.column_letter.to_ascii_uppercase())
        .unwrap_or_else(|| identifier.to_string())
}

/// Header label for a resolved letter, or the letter itself.
pub fn header_name<'a>(letter: &'a str, headers: &'a [Header]) -> &'a str {
    headers
        .iter()
        .find(|h| h.column_letter.eq_ignore_ascii_case(letter))
        .map(|h| h.name.as_str())
        .unwrap_or(letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<Header> {
        vec![
            Header::new("Region", 1),
            Header::new("Total Sales", 2),
            Header::new("AB", 3),
        ]
    }

    #[test]
    fn letters_take_precedence_over_names() {
        assert_eq!(resolve_column("ab", &headers()), "AB");
        assert_eq!(resolve_column("c", &headers()), "C");
    }

    #[test]
    fn names_match_case_insensitively() {
        assert_eq!(resolve_column("total sales", &headers()), "B");
        assert_eq!(resolve_column(" REGION ", &headers()), "A");
    }

    #[test]
    fn misses_pass_through() {
        assert_eq!(resolve_column("Profit", &headers()), "Profit");
        assert_eq!(resolve_column("", &headers()), "");
        assert_eq!(header_name("B", &headers()), "Total Sales");
        assert_eq!(header_name("Q", &headers()), "Q");
    }
}
