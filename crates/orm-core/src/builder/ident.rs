//! Identifier mangling and literal escaping for the PostgreSQL emitter,
//! grounded on the original implementation's `FieldToString`/
//! `TableToString`/string-literal-escaping helpers.

use crate::organizer::KeyKind;
use crate::path::Path;

fn joined_numbers(path: &Path) -> String {
    path.numbers()
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("_")
}

/// Mangles a resolved column path into its SQL identifier: `f_`/`p_`/`i_`
/// followed by the underscore-joined numeric path, depending on whether
/// the column plays a simple, primary-key, or secondary-index role.
pub fn field_to_string(field: &Path, key_kind: KeyKind) -> String {
    let prefix = match key_kind {
        KeyKind::Simple => "f_",
        KeyKind::Primary => "p_",
        KeyKind::Index => "i_",
    };
    format!("{prefix}{}", joined_numbers(field))
}

/// Mangles a table path into its SQL identifier: `t_` followed by the
/// underscore-joined numeric path.
pub fn table_to_string(table: &Path) -> String {
    format!("t_{}", joined_numbers(table))
}

/// Escapes a string for use inside a single-quoted SQL literal: doubles
/// embedded quotes, and backslash-escapes backslash and the three
/// whitespace control characters the original cares about.
pub fn escape_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Escapes a double-quoted SQL identifier. Unused by any path the emitter
/// currently exercises (every identifier it builds is already a safe
/// mangled name), kept as infrastructure the way the original carries it.
pub fn escape_identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_prefixes_follow_key_kind() {
        let field = Path::from_numbers(vec![2, 3]);
        assert_eq!(field_to_string(&field, KeyKind::Simple), "f_2_3");
        assert_eq!(field_to_string(&field, KeyKind::Primary), "p_2_3");
        assert_eq!(field_to_string(&field, KeyKind::Index), "i_2_3");
    }

    #[test]
    fn table_uses_t_prefix() {
        assert_eq!(table_to_string(&Path::single(7)), "t_7");
    }

    #[test]
    fn string_literal_escapes_quotes_and_backslash() {
        assert_eq!(escape_string_literal("o'brien"), "'o''brien'");
        assert_eq!(escape_string_literal("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn string_literal_escapes_named_control_chars() {
        assert_eq!(escape_string_literal("a\nb\rc\td"), "'a\\nb\\rc\\td'");
    }

    #[test]
    fn identifier_doubles_embedded_quotes() {
        assert_eq!(escape_identifier("weird\"name"), "\"weird\"\"name\"");
    }
}
