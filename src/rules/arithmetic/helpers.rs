use crate::CompileError;
use crate::value::parse_hex;

/// Parse a numeric literal: `0x..` hex integers or decimals with an exponent.
pub(crate) fn parse_number(text: &str, offset: usize) -> Result<f64, CompileError> {
    let invalid = || CompileError::InvalidLiteral { text: text.to_string(), offset };

    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => parse_hex(digits).ok_or_else(invalid),
        None => text.parse::<f64>().map_err(|_| invalid()),
    }
}

/// Strip the quotes from a string literal and resolve its escapes.
pub(crate) fn parse_string(text: &str, offset: usize) -> Result<String, CompileError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('"' | '\'')), Some(close)) if open == close => Ok(unescape(chars.as_str())),
        _ => Err(CompileError::InvalidLiteral { text: text.to_string(), offset }),
    }
}

/// Resolve `\" \' \\ \n \t \r \b \f`; any other escaped character stands for
/// itself.
pub(crate) fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        let cases: Vec<(f64, &str)> =
            vec![(255.0, "0xff"), (255.0, "0XFF"), (1.5, "1.5"), (5.0, "5."), (0.25, ".25"), (1200.0, "1.2e3")];
        for (expected, text) in cases {
            assert_eq!(parse_number(text, 0).unwrap(), expected, "parse_number({text:?})");
        }
        assert!(matches!(parse_number("0xg", 3), Err(CompileError::InvalidLiteral { offset: 3, .. })));
    }

    #[test]
    fn strings() {
        let cases: Vec<(&str, &str)> = vec![
            ("plain", "'plain'"),
            ("a\"b", r#""a\"b""#),
            ("it's", r"'it\'s'"),
            ("tab\there", r"'tab\there'"),
            ("back\\slash", r"'back\\slash'"),
            ("q", r"'\q'"),
            ("", "\"\""),
        ];
        for (expected, text) in cases {
            assert_eq!(parse_string(text, 0).unwrap(), expected, "parse_string({text:?})");
        }
        assert!(parse_string("'mismatched\"", 0).is_err());
    }
}
