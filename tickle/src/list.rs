//! List Parsing and Formatting
//!
//! A list's string form is a sequence of elements separated by whitespace.  Elements that
//! contain whitespace or any of the characters that are significant to the scanner are
//! wrapped in braces when the braces would balance, and backslash-escaped otherwise, so that
//! [`parse_list`] of [`list_to_string`] always yields the original elements.

use crate::scanner::{unescape, Scanner, WordKind};
use crate::types::*;
use alloc::borrow::Cow;
use alloc::string::String;

/// Splits a string into list elements, using the scanner's list mode.
///
/// Braced elements are taken verbatim, quoted elements have their backslash escapes
/// processed, and bare elements keep bracketed text and dollar signs as written.
pub fn parse_list(text: &str) -> Result<TickleList, Exception> {
    let mut scanner = Scanner::new(text);
    let mut list = TickleList::new();
    let mut element: Option<String> = None;

    loop {
        let word = scanner.split_list();
        match word.kind {
            WordKind::Eof => break,
            WordKind::Blank => {
                if let Some(done) = element.take() {
                    list.push(done.into());
                }
            }
            WordKind::Illegal => {
                return Err(Exception::error(
                    ErrorKind::Syntax,
                    alloc::format!("invalid list \"{}\": {}", text, word.text),
                ));
            }
            kind => {
                let piece: Cow<'_, str> = match kind {
                    WordKind::Block => Cow::Owned(word.text),
                    WordKind::Quote => Cow::Owned(unescape(&word.text)),
                    WordKind::Literal => Cow::Owned(word.text),
                    _ => Cow::Borrowed(&text[word.span.clone()]),
                };
                element.get_or_insert_with(String::new).push_str(&piece);
            }
        }
    }

    if let Some(done) = element {
        list.push(done.into());
    }

    Ok(list)
}

/// Renders a list of values as a string, quoting elements as needed.
pub fn list_to_string(list: &[Value]) -> String {
    let mut out = String::new();
    for (i, value) in list.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        quote_element(&value.as_str(), &mut out);
    }
    out
}

/// Appends one element to a list string in its quoted form.
pub fn quote_element(element: &str, out: &mut String) {
    if element.is_empty() {
        out.push_str("{}");
        return;
    }

    if !needs_quoting(element) {
        out.push_str(element);
    } else if can_brace(element) {
        out.push('{');
        out.push_str(element);
        out.push('}');
    } else {
        for c in element.chars() {
            match c {
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                ' ' | '{' | '}' | '[' | ']' | '$' | '"' | ';' | '\\' => {
                    out.push('\\');
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
    }
}

fn needs_quoting(element: &str) -> bool {
    element.starts_with('#')
        || element.chars().any(|c| {
            c.is_whitespace() || matches!(c, '{' | '}' | '[' | ']' | '$' | '"' | ';' | '\\')
        })
}

/// True if the element can be wrapped in braces and read back verbatim: its braces must
/// balance, and it mustn't end with a backslash that would escape the closing brace.
fn can_brace(element: &str) -> bool {
    let mut depth = 0usize;
    let mut chars = element.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            '{' => depth += 1,
            '}' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ => (),
        }
    }

    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use pretty_assertions::assert_eq;

    fn strings(list: &[Value]) -> Vec<String> {
        list.iter().map(|v| v.as_str().into_owned()).collect()
    }

    #[test]
    fn test_parse_simple() {
        let list = parse_list("  a b\n\tc  ").unwrap();
        assert_eq!(strings(&list), ["a", "b", "c"]);
        assert!(parse_list("").unwrap().is_empty());
        assert!(parse_list("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_grouping() {
        let list = parse_list("{a b} \"c d\" {} {x {y z}}").unwrap();
        assert_eq!(strings(&list), ["a b", "c d", "", "x {y z}"]);
    }

    #[test]
    fn test_parse_escapes() {
        let list = parse_list(r#"a\ b "x\ty" {raw\n}"#).unwrap();
        assert_eq!(strings(&list), ["a b", "x\ty", "raw\\n"]);
    }

    #[test]
    fn test_parse_keeps_brackets_and_dollars() {
        let list = parse_list("[a b] $x a;b").unwrap();
        assert_eq!(strings(&list), ["[a b]", "$x", "a;b"]);
    }

    #[test]
    fn test_parse_unbalanced() {
        let err = parse_list("a {b").unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::Syntax));
    }

    #[test]
    fn test_to_string_quoting() {
        let list = vec![
            Value::from("plain"),
            Value::from("two words"),
            Value::from(""),
            Value::from("a}b"),
            Value::from("#hash"),
        ];
        assert_eq!(list_to_string(&list), "plain {two words} {} a\\}b {#hash}");
    }

    #[test]
    fn test_round_trip_awkward_elements() {
        let elements = ["a b", "{", "x\\", "$y [z]", "tab\there", "\"q\"", "}{"];
        let list: TickleList = elements.iter().map(|s| Value::from(*s)).collect();
        let text = list_to_string(&list);
        assert_eq!(strings(&parse_list(&text).unwrap()), elements);
    }
}
