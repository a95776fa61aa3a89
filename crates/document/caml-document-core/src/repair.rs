//! Heuristic repair of unquoted attribute values.
//!
//! Only one malformation is targeted: `name=value` where the value lacks
//! quotes. The repair first tries the single site the parser complained
//! about, then falls back to quoting every bare value inside a tag. Text that
//! is already well formed comes back unchanged, so repairing twice is stable.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::xml::{parse_document, TextLocation, XmlElement, XmlSyntaxError};

static DIAGNOSTIC_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"line (\d+), column (\d+)|\bat (\d+):(\d+)").expect("static regex")
});

/// Bare value ending right at the error column.
static BARE_VALUE_AT_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"=\s*([^"'>\s]+)\s*$"#).expect("static regex"));

/// Start tags (and empty-element tags); declarations and comments excluded.
static START_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>!?/][^<>]*>").expect("static regex"));

/// Quoted strings are matched first so `=` inside a value is left alone.
static QUOTED_OR_BARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""[^"]*"|'[^']*'|=([^"'\s>][^\s>]*)"#).expect("static regex")
});

/// Which strategy produced a repaired text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairKind {
    /// Quotes added around the value at the reported location.
    Targeted { line: usize, column: usize },
    /// Every bare value in the document was quoted.
    Global { sites: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairedText {
    pub text: String,
    pub kind: RepairKind,
}

/// Successful repair-and-reparse.
#[derive(Clone, Debug)]
pub struct Repaired {
    pub text: String,
    pub root: XmlElement,
    pub passes: Vec<RepairKind>,
}

/// Extract a location from a parser diagnostic.
///
/// Understands both `line N, column M` and the `at N:M` suffix used by
/// `roxmltree`.
pub fn locate_error(diagnostic: &str) -> Option<TextLocation> {
    let caps = DIAGNOSTIC_LOCATION.captures(diagnostic)?;
    let (line, column) = match (caps.get(1), caps.get(2)) {
        (Some(l), Some(c)) => (l, c),
        _ => (caps.get(3)?, caps.get(4)?),
    };
    Some(TextLocation {
        line: line.as_str().parse().ok()?,
        column: column.as_str().parse().ok()?,
    })
}

/// Produce a best-effort corrected text.
///
/// With a location, a bare value ending at that column on that line is
/// quoted. Without one, or when nothing matches there, all bare values
/// inside start tags are quoted.
pub fn repair_text(xml: &str, location: Option<TextLocation>) -> RepairedText {
    if let Some(loc) = location {
        if let Some(text) = repair_at(xml, loc) {
            info!(line = loc.line, column = loc.column, "quoted attribute value at error site");
            return RepairedText {
                text,
                kind: RepairKind::Targeted {
                    line: loc.line,
                    column: loc.column,
                },
            };
        }
    }
    debug!("applying general attribute quoting");
    let (text, sites) = quote_all_bare_values(xml);
    RepairedText {
        text,
        kind: RepairKind::Global { sites },
    }
}

fn repair_at(xml: &str, loc: TextLocation) -> Option<String> {
    let mut lines: Vec<String> = xml.split('\n').map(str::to_string).collect();
    let line_index = loc.line.checked_sub(1)?;
    let chars: Vec<char> = lines.get(line_index)?.chars().collect();
    // Columns are 1-based; the segment includes the offending character.
    let col_index = loc.column.checked_sub(1)?;
    if col_index >= chars.len() {
        return None;
    }

    let segment: String = chars[..=col_index].iter().collect();
    let value = BARE_VALUE_AT_END.captures(&segment)?.get(1)?;
    let start = segment[..value.start()].chars().count();

    let mut end = start;
    while end < chars.len() && !ends_bare_value(&chars, end) {
        end += 1;
    }

    let mut fixed = String::with_capacity(chars.len() + 2);
    fixed.extend(&chars[..start]);
    fixed.push('"');
    fixed.extend(&chars[start..end]);
    fixed.push('"');
    fixed.extend(&chars[end..]);
    lines[line_index] = fixed;
    Some(lines.join("\n"))
}

/// A bare value runs until a quote, whitespace, `>` or the `/>` of an empty tag.
fn ends_bare_value(chars: &[char], i: usize) -> bool {
    match chars[i] {
        '"' | '\'' | '>' => true,
        '/' => chars.get(i + 1) == Some(&'>'),
        c => c.is_whitespace(),
    }
}

fn quote_all_bare_values(xml: &str) -> (String, usize) {
    let mut sites = 0usize;
    let text = START_TAG.replace_all(xml, |tag: &Captures| {
        let tag = &tag[0];
        let close = tag.len() - 1;
        QUOTED_OR_BARE
            .replace_all(tag, |m: &Captures| match m.get(1) {
                None => m[0].to_string(),
                Some(value) => {
                    sites += 1;
                    let mut bare = value.as_str();
                    // `<a b=c/>` keeps its empty-tag slash outside the quotes.
                    if m.get(0).map(|whole| whole.end()) == Some(close) {
                        bare = bare.strip_suffix('/').unwrap_or(bare);
                        let rest = &value.as_str()[bare.len()..];
                        return format!("=\"{bare}\"{rest}");
                    }
                    format!("=\"{bare}\"")
                }
            })
            .into_owned()
    });
    (text.into_owned(), sites)
}

/// Repair `xml` after the strict parse failed with `first_error`, reparsing
/// after each pass.
///
/// Each pass re-locates the latest error, so `max_passes > 1` can fix several
/// bare values one at a time. Returns the last parser error on failure.
pub fn repair_and_parse(
    xml: &str,
    first_error: &XmlSyntaxError,
    max_passes: usize,
) -> Result<Repaired, XmlSyntaxError> {
    let mut current = xml.to_string();
    let mut error = first_error.clone();
    let mut passes = Vec::new();

    for _ in 0..max_passes.max(1) {
        let location = error.location.or_else(|| locate_error(&error.message));
        let repaired = repair_text(&current, location);
        passes.push(repaired.kind);
        let unchanged = repaired.text == current;
        current = repaired.text;

        match parse_document(&current) {
            Ok(root) => {
                return Ok(Repaired {
                    text: current,
                    root,
                    passes,
                })
            }
            Err(e) => error = e,
        }
        if unchanged {
            break;
        }
    }
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_both_diagnostic_styles() {
        assert_eq!(
            locate_error("not well-formed (invalid token): line 3, column 14"),
            Some(TextLocation { line: 3, column: 14 })
        );
        assert_eq!(
            locate_error("expected a quote not 'a' at 1:13"),
            Some(TextLocation { line: 1, column: 13 })
        );
        assert_eq!(locate_error("unknown failure"), None);
    }

    #[test]
    fn targeted_repair_quotes_single_site() {
        let xml = r#"<CALayer id=abc position="0 0">"#;
        let fixed = repair_text(xml, Some(TextLocation { line: 1, column: 13 }));
        assert_eq!(fixed.text, r#"<CALayer id="abc" position="0 0">"#);
        assert_eq!(fixed.kind, RepairKind::Targeted { line: 1, column: 13 });
    }

    #[test]
    fn targeted_repair_keeps_path_slashes_and_empty_tag() {
        let xml = "<caml>\n<contents type=\"CGImage\" src=assets/a.png/>\n</caml>";
        let fixed = repair_text(xml, Some(TextLocation { line: 2, column: 30 }));
        assert_eq!(
            fixed.text,
            "<caml>\n<contents type=\"CGImage\" src=\"assets/a.png\"/>\n</caml>"
        );
    }

    #[test]
    fn falls_back_to_global_without_location() {
        let xml = "<a x=1 y=\"2\"><b z=three/></a>";
        let fixed = repair_text(xml, None);
        assert_eq!(fixed.text, "<a x=\"1\" y=\"2\"><b z=\"three\"/></a>");
        assert_eq!(fixed.kind, RepairKind::Global { sites: 2 });
    }

    #[test]
    fn falls_back_to_global_when_location_has_no_pattern() {
        let xml = "<a x=1>\n<b/>\n</a>";
        let fixed = repair_text(xml, Some(TextLocation { line: 2, column: 2 }));
        assert_eq!(fixed.text, "<a x=\"1\">\n<b/>\n</a>");
        assert!(matches!(fixed.kind, RepairKind::Global { sites: 1 }));
    }

    #[test]
    fn global_pass_leaves_quoted_values_and_text_alone() {
        let xml = "<?xml version=\"1.0\"?>\n<a t='x=y' u=\"p=q\">k=v</a>";
        let fixed = repair_text(xml, None);
        assert_eq!(fixed.text, xml);
        assert_eq!(fixed.kind, RepairKind::Global { sites: 0 });
    }

    #[test]
    fn repair_is_idempotent() {
        let xml = "<caml><CALayer id=root name=main bounds=\"0 0 1 1\"/></caml>";
        let once = repair_text(xml, None).text;
        let twice = repair_text(&once, None).text;
        assert_eq!(once, twice);
        assert!(parse_document(&once).is_ok());
    }

    #[test]
    fn repair_and_parse_recovers_unquoted_attribute() {
        let xml = r#"<caml><CALayer id=abc position="0 0"/></caml>"#;
        let err = parse_document(xml).unwrap_err();
        let repaired = repair_and_parse(xml, &err, 1).unwrap();
        assert_eq!(
            repaired.text,
            r#"<caml><CALayer id="abc" position="0 0"/></caml>"#
        );
        let layer = repaired.root.elements().next().unwrap();
        assert_eq!(layer.attr("id"), Some("abc"));
    }

    #[test]
    fn repair_and_parse_reports_unrecoverable_error() {
        let xml = "<caml><CALayer id=\"a\"></caml>";
        let err = parse_document(xml).unwrap_err();
        assert!(repair_and_parse(xml, &err, 1).is_err());
    }
}
