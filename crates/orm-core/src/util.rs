//! Small shared helpers that don't belong to any single layer.

/// Normalizes a user-supplied table or field name into the `snake_case`
/// form the registry stores under its name namespace.
pub fn snake_case(name: &str) -> String {
    use heck::ToSnakeCase;
    name.to_snake_case()
}

/// The `camelCase` counterpart, used when a caller renders a schema name
/// back out for a client-facing surface (e.g. a generated struct field).
pub fn camel_case(name: &str) -> String {
    use heck::ToLowerCamelCase;
    name.to_lower_camel_case()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_splits_words() {
        assert_eq!(snake_case("UserAccount"), "user_account");
    }

    #[test]
    fn camel_case_lowercases_first_word() {
        assert_eq!(camel_case("user_account"), "userAccount");
    }
}
