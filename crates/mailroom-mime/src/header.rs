//! MIME header handling.

use std::fmt;

/// Header names whose repeated values are folded into a single
/// comma-separated line when rendered.
const ADDRESS_HEADERS: &[&str] = &["from", "to", "cc", "reply-to"];

/// Header names that are kept on the structured message but never rendered
/// to the wire.
const HIDDEN_HEADERS: &[&str] = &["bcc"];

/// Rendered lines longer than this are folded at whitespace.
const FOLD_WIDTH: usize = 78;

/// Ordered collection of email headers.
///
/// Names keep the casing they were added with; lookups are case-insensitive.
/// Insertion order is preserved, which keeps recipient lists in the order the
/// caller supplied them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value, keeping any existing values.
    ///
    /// CR and LF in the value are replaced with spaces.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), single_line(value.into())));
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// The new value takes the position of the first replaced entry, or is
    /// appended when the header was absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = single_line(value.into());

        match self.position(&name) {
            Some(index) => {
                self.entries[index] = (name.clone(), value);
                let mut seen = 0;
                self.entries.retain(|(n, _)| {
                    if n.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header, in insertion order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns true if at least one value exists for the header.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of header values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Headers {
    /// Renders headers as CRLF-terminated lines.
    ///
    /// Address headers with several values are folded into one line at the
    /// position of their first occurrence; hidden headers (`Bcc`) are skipped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rendered: Vec<&str> = Vec::new();

        for (name, value) in &self.entries {
            let lower = name.to_ascii_lowercase();
            if HIDDEN_HEADERS.contains(&lower.as_str()) {
                continue;
            }

            if ADDRESS_HEADERS.contains(&lower.as_str()) {
                if rendered.iter().any(|r| r.eq_ignore_ascii_case(name)) {
                    continue;
                }
                rendered.push(name);
                let joined = self.get_all(name).join(", ");
                write!(f, "{}\r\n", fold(name, &joined))?;
            } else {
                write!(f, "{}\r\n", fold(name, value))?;
            }
        }

        Ok(())
    }
}

fn single_line(value: String) -> String {
    if value.contains(['\r', '\n']) {
        value.replace(['\r', '\n'], " ")
    } else {
        value
    }
}

/// Renders `name: value`, breaking before a space whenever the line would
/// pass [`FOLD_WIDTH`]. Words longer than the width are kept whole.
fn fold(name: &str, value: &str) -> String {
    let mut out = format!("{name}:");
    let mut line_len = out.len();

    for (i, word) in value.split(' ').enumerate() {
        if i > 0 && line_len + 1 + word.len() > FOLD_WIDTH {
            out.push_str("\r\n");
            line_len = 0;
        }
        out.push(' ');
        out.push_str(word);
        line_len += 1 + word.len();
    }

    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_headers_keep_order_and_duplicates() {
        let mut headers = Headers::new();
        headers.add("To", "bob@example.com");
        headers.add("To", "alice@example.com");
        headers.add("To", "bob@example.com");

        assert_eq!(
            headers.get_all("to"),
            vec!["bob@example.com", "alice@example.com", "bob@example.com"]
        );
    }

    #[test]
    fn test_headers_set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.add("Subject", "first");
        headers.add("To", "alice@example.com");
        headers.add("subject", "second");

        headers.set("Subject", "final");

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Subject", "To"]);
        assert_eq!(headers.get_all("subject"), vec!["final"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        assert!(headers.contains("subject"));

        headers.remove("SUBJECT");
        assert!(!headers.contains("Subject"));
    }

    #[test]
    fn test_display_folds_address_headers() {
        let mut headers = Headers::new();
        headers.add("To", "a@example.com");
        headers.add("Subject", "Hi");
        headers.add("To", "b@example.com");

        assert_eq!(
            headers.to_string(),
            "To: a@example.com, b@example.com\r\nSubject: Hi\r\n"
        );
    }

    #[test]
    fn test_line_breaks_never_reach_the_wire() {
        let mut headers = Headers::new();
        headers.add("Subject", "Hi\r\nX-Injected: yes");
        headers.set("Comments", "a\nb");

        assert_eq!(headers.get("subject"), Some("Hi  X-Injected: yes"));
        assert_eq!(
            headers.to_string(),
            "Subject: Hi  X-Injected: yes\r\nComments: a b\r\n"
        );
    }

    #[test]
    fn test_long_values_are_folded() {
        let mut headers = Headers::new();
        for i in 0..20 {
            headers.add("To", format!("recipient{i}@example.com"));
        }
        let rendered = headers.to_string();

        let lines: Vec<&str> = rendered.trim_end_matches("\r\n").split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= FOLD_WIDTH));
        assert!(lines[1..].iter().all(|l| l.starts_with(' ')));
        assert_eq!(
            rendered.replace("\r\n ", " "),
            format!("To: {}\r\n", headers.get_all("to").join(", "))
        );
    }

    #[test]
    fn test_display_hides_bcc() {
        let mut headers = Headers::new();
        headers.add("To", "a@example.com");
        headers.add("Bcc", "secret@example.com");

        let rendered = headers.to_string();
        assert!(!rendered.contains("secret@example.com"));
        assert_eq!(headers.get("bcc"), Some("secret@example.com"));
    }
}
