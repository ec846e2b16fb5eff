/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using a custom lookup function.
///
/// The separate signature keeps the substitution testable without mutating
/// the process environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            // Empty name: keep the literal and move on.
            Some(0) => {
                out.push_str("${}");
                rest = &after[1..];
            },
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            // Unclosed placeholder: emit the remainder literally.
            None => {
                out.push_str(&rest[start..]);
                return out;
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_var() {
        let lookup = |name: &str| match name {
            "BRIDGE_TEST_KEY" => Some("sk-123".to_string()),
            _ => None,
        };
        assert_eq!(
            substitute_env_with("api_key = \"${BRIDGE_TEST_KEY}\"", lookup),
            "api_key = \"sk-123\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        let lookup = |_: &str| None;
        assert_eq!(
            substitute_env_with("${BRIDGE_NONEXISTENT_XYZ}", lookup),
            "${BRIDGE_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn substitutes_multiple_vars_in_one_line() {
        let lookup = |name: &str| match name {
            "A" => Some("1".to_string()),
            "B" => Some("2".to_string()),
            _ => None,
        };
        assert_eq!(substitute_env_with("${A}:${B}:${C}", lookup), "1:2:${C}");
    }

    #[test]
    fn unclosed_placeholder_is_literal() {
        let lookup = |_: &str| Some("x".to_string());
        assert_eq!(substitute_env_with("tail ${OPEN", lookup), "tail ${OPEN");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
