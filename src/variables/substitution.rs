//! Variable substitution engine.
//!
//! Replaces `{{variable}}` tokens in request text with values from a flat
//! resolution map. Substitution is strictly single-pass: the output is built
//! left to right and substituted values are never re-scanned, so a value that
//! itself contains `{{otherKey}}` passes through as literal text. Unknown
//! tokens are left untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Cached pattern for `{{variableName}}` tokens. Compiled once and reused.
static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("variable pattern must compile"));

/// Substitutes every `{{key}}` token in `text` with its value from `vars`.
///
/// Keys are matched exactly, including any whitespace inside the braces.
/// Empty input returns empty output.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use restflow::variables::substitute;
///
/// let mut vars = HashMap::new();
/// vars.insert("host".to_string(), "api.example.com".to_string());
///
/// assert_eq!(substitute("https://{{host}}/v1", &vars), "https://api.example.com/v1");
/// assert_eq!(substitute("{{missing}}", &vars), "{{missing}}");
/// ```
pub fn substitute(text: &str, vars: &HashMap<String, String>) -> String {
    // Fast path: no token markers at all.
    if !text.contains("{{") {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut last_match_end = 0;

    for cap in VARIABLE_REGEX.captures_iter(text) {
        let full_match = cap.get(0).expect("capture 0 always present");
        let key = &cap[1];

        result.push_str(&text[last_match_end..full_match.start()]);
        match vars.get(key) {
            Some(value) => result.push_str(value),
            // Unknown key: the token passes through verbatim.
            None => result.push_str(full_match.as_str()),
        }
        last_match_end = full_match.end();
    }

    result.push_str(&text[last_match_end..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vars() -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("baseUrl".to_string(), "https://api.example.com".to_string());
        vars.insert("apiKey".to_string(), "secret-key-123".to_string());
        vars.insert("port".to_string(), "8080".to_string());
        vars
    }

    #[test]
    fn test_simple_substitution() {
        let result = substitute("GET {{baseUrl}}/users", &test_vars());
        assert_eq!(result, "GET https://api.example.com/users");
    }

    #[test]
    fn test_multiple_variables() {
        let result = substitute("{{baseUrl}}:{{port}}/api?key={{apiKey}}", &test_vars());
        assert_eq!(result, "https://api.example.com:8080/api?key=secret-key-123");
    }

    #[test]
    fn test_repeated_variable() {
        let result = substitute("{{port}}-{{port}}", &test_vars());
        assert_eq!(result, "8080-8080");
    }

    #[test]
    fn test_unknown_key_passes_through() {
        let result = substitute("GET {{nope}}/users", &test_vars());
        assert_eq!(result, "GET {{nope}}/users");
    }

    #[test]
    fn test_single_pass_only() {
        // A resolved value containing another token is left as literal text.
        let mut vars = test_vars();
        vars.insert("a".to_string(), "{{port}}".to_string());

        let result = substitute("value={{a}}", &vars);
        assert_eq!(result, "value={{port}}");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(substitute("", &test_vars()), "");
    }

    #[test]
    fn test_no_tokens() {
        assert_eq!(
            substitute("GET https://example.com", &test_vars()),
            "GET https://example.com"
        );
    }

    #[test]
    fn test_key_match_is_exact() {
        // Whitespace inside the braces is part of the key, not trimmed away.
        let result = substitute("{{ port }}", &test_vars());
        assert_eq!(result, "{{ port }}");
    }

    #[test]
    fn test_substitution_in_json_body() {
        let result = substitute(r#"{"key": "{{apiKey}}"}"#, &test_vars());
        assert_eq!(result, r#"{"key": "secret-key-123"}"#);
    }
}
