//! Variable Macro Expansion
//!
//! Substitutes `$name` and `${name}` placeholders in raw document text.
//! Bare names consist of ASCII letters, digits and `_`; the braced form
//! also accepts any other character except `}` (e.g. `${app.version}`).
//! Placeholders without a matching variable are left untouched.

use std::collections::HashMap;

/// Expands variable placeholders in `text`.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use tabflow::resource::macros::expand;
///
/// let mut variables = HashMap::new();
/// variables.insert("app".to_string(), "web".to_string());
/// assert_eq!(expand("deploy $app to ${env}", &variables), "deploy web to ${env}");
/// ```
pub fn expand(text: &str, variables: &HashMap<String, String>) -> String {
    if variables.is_empty() || !text.contains('$') {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(position) = rest.find('$') {
        result.push_str(&rest[..position]);
        let after = &rest[position + 1..];
        let (name, placeholder_len) = placeholder(after);

        match variables.get(name).filter(|_| !name.is_empty()) {
            Some(value) => result.push_str(value),
            None => result.push_str(&rest[position..position + 1 + placeholder_len]),
        }
        rest = &after[placeholder_len..];
    }

    result.push_str(rest);
    result
}

/// Reads the placeholder name following a `$`.
///
/// Returns the name and the number of bytes the placeholder occupies after
/// the `$`; an empty name means there is no placeholder.
fn placeholder(after: &str) -> (&str, usize) {
    match after.strip_prefix('{') {
        Some(braced) => match braced.find('}') {
            Some(end) => (&braced[..end], end + 2),
            None => ("", 0),
        },
        None => {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_expand_bare_and_braced() {
        let vars = variables(&[("app", "web"), ("app.version", "1.2")]);
        assert_eq!(expand("$app:${app.version}", &vars), "web:1.2");
    }

    #[test]
    fn test_expand_stops_at_punctuation() {
        let vars = variables(&[("name", "abc")]);
        assert_eq!(expand("r1,$name,x", &vars), "r1,abc,x");
        assert_eq!(expand("$name.", &vars), "abc.");
    }

    #[test]
    fn test_expand_leaves_unknown() {
        let vars = variables(&[("known", "1")]);
        assert_eq!(expand("$unknown ${other} $known", &vars), "$unknown ${other} 1");
    }

    #[test]
    fn test_expand_lone_dollar_and_unterminated_brace() {
        let vars = variables(&[("a", "1")]);
        assert_eq!(expand("cost $ 5, ${a", &vars), "cost $ 5, ${a");
        assert_eq!(expand("end$", &vars), "end$");
    }

    #[test]
    fn test_expand_without_variables() {
        assert_eq!(expand("$a", &HashMap::new()), "$a");
    }
}
