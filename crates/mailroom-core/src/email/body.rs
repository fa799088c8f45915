//! Body transformations used when sending.

/// Line-break spellings turned into CRLF before tags are stripped.
const BREAKS: &[&str] = &[
    "<br />",
    "<br>",
    "<br/>",
    "&lt;br /&gt;",
    "&lt;br/&gt;",
    "&lt;br&gt;",
];

/// Entities decoded after tag stripping: name, code point, replacement.
const ENTITIES: &[(&str, u32, &str)] = &[
    ("quot", 34, "\""),
    ("amp", 38, "&"),
    ("lt", 60, "<"),
    ("gt", 62, ">"),
    ("nbsp", 160, " "),
    ("iexcl", 161, "\u{a1}"),
    ("cent", 162, "\u{a2}"),
    ("pound", 163, "\u{a3}"),
    ("copy", 169, "\u{a9}"),
    ("reg", 174, "\u{ae}"),
];

/// Query fragment that links an attachment from an HTML body.
const INLINE_MARKERS: &[&str] = &["?entryPoint=attachment&amp;id=", "?entryPoint=attachment&id="];

const TABLE_TAG: &str = "<table class=\"table table-bordered\">";
const WIDE_TABLE_TAG: &str = "<table class=\"table table-bordered\" width=\"100%\">";

/// Reduces an HTML body to plain text.
///
/// Breaks become CRLF, tags are dropped and a small set of entities (named
/// or numeric, any case) is decoded. Other entities are left as written.
#[must_use]
pub fn html_to_plain(html: &str) -> String {
    let mut text = html.to_string();
    for needle in BREAKS {
        text = replace_ignore_ascii_case(&text, needle, "\r\n");
    }
    decode_entities(&strip_tags(&text))
}

/// Scans an HTML body for attachment links and returns the referenced ids,
/// de-duplicated in first-occurrence order.
#[must_use]
pub fn inline_attachment_ids(html: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();

    for marker in INLINE_MARKERS {
        for (start, _) in html.match_indices(marker) {
            let rest = &html[start + marker.len()..];
            let end = rest
                .find(['&', '=', '"', '\''])
                .unwrap_or(rest.len());
            if end > 0 {
                found.push((start, rest[..end].to_string()));
            }
        }
    }

    found.sort_by_key(|(position, _)| *position);

    let mut ids: Vec<String> = Vec::new();
    for (_, id) in found {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Rewrites inline attachment links to `cid:` references and widens
/// bordered tables.
pub(crate) fn html_for_sending<S: AsRef<str>>(html: &str, inline_ids: &[S]) -> String {
    let mut body = html.to_string();
    if !body.is_empty() {
        for id in inline_ids {
            let id = id.as_ref();
            for marker in INLINE_MARKERS {
                body = body.replace(&format!("\"{marker}{id}\""), &format!("\"cid:{id}\""));
            }
        }
    }
    body.replace(TABLE_TAG, WIDE_TABLE_TAG)
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();

    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for (start, _) in lower.match_indices(&needle) {
        out.push_str(&haystack[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
    }
    out.push_str(&haystack[last..]);
    out
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 7)
            .and_then(|semi| lookup_entity(&rest[1..semi]).map(|r| (r, semi)));

        match decoded {
            Some((replacement, semi)) => {
                out.push_str(replacement);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn lookup_entity(name: &str) -> Option<&'static str> {
    let code = name
        .strip_prefix('#')
        .and_then(|digits| digits.parse::<u32>().ok());

    ENTITIES
        .iter()
        .find(|(entity, point, _)| match code {
            Some(code) => code == *point,
            None => entity.eq_ignore_ascii_case(name),
        })
        .map(|(_, _, replacement)| *replacement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaks_become_crlf_any_case() {
        assert_eq!(html_to_plain("a<BR>b<br/>c<Br />d"), "a\r\nb\r\nc\r\nd");
        assert_eq!(html_to_plain("a&lt;br /&gt;b&LT;BR&GT;c"), "a\r\nb\r\nc");
    }

    #[test]
    fn test_tags_stripped() {
        assert_eq!(
            html_to_plain("<div><p>Hello <b>world</b></p></div>"),
            "Hello world"
        );
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(html_to_plain("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(html_to_plain("&QUOT;hi&#34;"), "\"hi\"");
        assert_eq!(html_to_plain("1&nbsp;2 &copy;&#174;"), "1 2 \u{a9}\u{ae}");
        assert_eq!(html_to_plain("&lt;tag&gt;"), "<tag>");
    }

    #[test]
    fn test_unknown_entities_and_stray_ampersands_kept() {
        assert_eq!(html_to_plain("&euro; & more;"), "&euro; & more;");
    }

    #[test]
    fn test_inline_ids_in_order_without_duplicates() {
        let html = concat!(
            "<img src=\"?entryPoint=attachment&amp;id=b2\">",
            "<img src=\"?entryPoint=attachment&amp;id=a1\">",
            "<img src='?entryPoint=attachment&id=c3'>",
            "<img src=\"?entryPoint=attachment&amp;id=b2\">",
        );
        assert_eq!(inline_attachment_ids(html), vec!["b2", "a1", "c3"]);
    }

    #[test]
    fn test_inline_id_terminators() {
        let html = "?entryPoint=attachment&amp;id=x9&amp;size=small ?entryPoint=attachment&amp;id=y8=";
        assert_eq!(inline_attachment_ids(html), vec!["x9", "y8"]);
        assert!(inline_attachment_ids("<p>no images</p>").is_empty());
    }

    #[test]
    fn test_html_for_sending() {
        let html = "<img src=\"?entryPoint=attachment&amp;id=a1\"><img src=\"?entryPoint=attachment&amp;id=zz\"><table class=\"table table-bordered\">";
        let sent = html_for_sending(html, &["a1"]);
        assert_eq!(
            sent,
            "<img src=\"cid:a1\"><img src=\"?entryPoint=attachment&amp;id=zz\"><table class=\"table table-bordered\" width=\"100%\">"
        );
    }
}
