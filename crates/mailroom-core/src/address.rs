//! Codec for the semicolon-joined address lists stored on a message.
//!
//! Entries are either bare addresses (`a@example.com`) or display forms
//! (`"Jane Doe" <jane@example.com>`). None of these functions fail; malformed
//! input degrades to "whole string is the address".

/// List separator used by stored address fields.
pub const SEPARATOR: char = ';';

/// Splits a stored list into trimmed, non-empty entries.
#[must_use]
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Joins entries back into the stored form.
#[must_use]
pub fn join_list<S: AsRef<str>>(entries: &[S]) -> String {
    entries
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string())
}

/// Extracts the display name from `Name <addr>`; empty for bare addresses.
#[must_use]
pub fn parse_display_name(raw: &str) -> String {
    split_display(raw).map_or_else(String::new, |(name, _)| unquote(name).to_string())
}

/// Extracts the bare address from `Name <addr>` or a bare address.
#[must_use]
pub fn parse_address(raw: &str) -> String {
    split_display(raw).map_or_else(|| raw.trim().to_string(), |(_, addr)| addr.to_string())
}

/// Formats `Name <addr>`, or `<addr>` without a name.
#[must_use]
pub fn format_display(name: Option<&str>, address: &str) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{name} <{address}>"),
        None => format!("<{address}>"),
    }
}

/// Splits `Name <addr>` at the last angle-bracket pair.
fn split_display(raw: &str) -> Option<(&str, &str)> {
    let raw = raw.trim();
    let open = raw.rfind('<')?;
    let close = raw[open..].find('>')? + open;
    Some((raw[..open].trim(), raw[open + 1..close].trim()))
}

fn unquote(name: &str) -> &str {
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_list_trims_and_drops_empty() {
        assert_eq!(
            parse_list(" a@example.com ;; b@example.com; "),
            vec!["a@example.com", "b@example.com"]
        );
        assert!(parse_list("").is_empty());
        assert!(parse_list(" ; ").is_empty());
    }

    #[test]
    fn test_join_list() {
        assert_eq!(join_list(&["a@x.io", "b@x.io"]), "a@x.io;b@x.io");
        assert_eq!(join_list::<&str>(&[]), "");
    }

    #[test]
    fn test_display_form() {
        let raw = "\"Jane Doe\" <jane@example.com>";
        assert_eq!(parse_display_name(raw), "Jane Doe");
        assert_eq!(parse_address(raw), "jane@example.com");

        assert_eq!(parse_display_name("Sales <sales@example.com>"), "Sales");
        assert_eq!(parse_address("<sales@example.com>"), "sales@example.com");
        assert_eq!(parse_display_name("<sales@example.com>"), "");
    }

    #[test]
    fn test_bare_address() {
        assert_eq!(parse_display_name("  jane@example.com "), "");
        assert_eq!(parse_address("  jane@example.com "), "jane@example.com");
    }

    #[test]
    fn test_unterminated_bracket_is_bare() {
        assert_eq!(parse_address("Jane <jane@example.com"), "Jane <jane@example.com");
        assert_eq!(parse_display_name("Jane <jane@example.com"), "");
    }

    #[test]
    fn test_format_display() {
        assert_eq!(
            format_display(Some("Jane"), "jane@example.com"),
            "Jane <jane@example.com>"
        );
        assert_eq!(format_display(Some("  "), "jane@example.com"), "<jane@example.com>");
        assert_eq!(format_display(None, "jane@example.com"), "<jane@example.com>");
    }

    proptest! {
        #[test]
        fn join_then_parse_keeps_entries(entries in prop::collection::vec("[a-z]{1,8}@[a-z]{1,8}\\.com", 0..6)) {
            prop_assert_eq!(parse_list(&join_list(&entries)), entries);
        }

        #[test]
        fn formatted_display_round_trips(name in "[A-Za-z][A-Za-z ]{0,12}[A-Za-z]", addr in "[a-z]{1,8}@[a-z]{1,8}\\.org") {
            let display = format_display(Some(&name), &addr);
            prop_assert_eq!(parse_address(&display), addr);
            prop_assert_eq!(parse_display_name(&display), name);
        }
    }
}
