pub fn escape_field(col: &str) -> String {
    // Escape single quote, double quote, period, and brackets with a backslash
    col.replace('\'', "\\'")
        .replace('\"', "\\\"")
        .replace('.', "\\.")
        .replace('[', "\\[")
        .replace(']', "\\]")
}

pub fn unescape_field(col: &str) -> String {
    // Unescape single quote, double quote, period, and brackets
    col.replace("\\'", "'")
        .replace("\\\"", "\"")
        .replace("\\.", ".")
        .replace("\\[", "[")
        .replace("\\]", "]")
}

/// Quote a string as a double-quoted expression literal
pub fn string_value(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Build an expression accessing `field` on `datum`, e.g. `datum["a b"]`
pub fn datum_access(field: &str) -> String {
    format!("datum[{}]", string_value(&unescape_field(field)))
}

#[cfg(test)]
mod tests {
    use crate::escape::{datum_access, escape_field, string_value, unescape_field};

    #[test]
    fn test_escape() {
        let col = "'foo'_._\"bar\"";
        let escaped = escape_field(col);
        assert_eq!(escaped, r#"\'foo\'_\._\"bar\""#)
    }

    #[test]
    fn test_unescape() {
        let col = r#"\'foo\'_\._\"bar\""#;
        let unescaped = unescape_field(col);
        assert_eq!(unescaped, "'foo'_._\"bar\"")
    }

    #[test]
    fn test_datum_access() {
        assert_eq!(datum_access("a"), r#"datum["a"]"#);
        assert_eq!(datum_access(r"a\.b"), r#"datum["a.b"]"#);
        assert_eq!(string_value("x\"y"), r#""x\"y""#);
    }
}
