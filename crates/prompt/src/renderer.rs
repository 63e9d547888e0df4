//! Placeholder extraction and substitution.
//!
//! Placeholders are `${name}` tokens where `name` matches `[a-zA-Z0-9_]+`.
//! Rendering is a single left-to-right pass: names missing from the value
//! map stay in the output verbatim, and substituted values are never
//! scanned again.

use crate::types::Variables;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Regex pattern matching `${name}` placeholders.
pub const PLACEHOLDER_PATTERN: &str = r"\$\{([a-zA-Z0-9_]+)\}";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

/// Rendered text plus the placeholder names found in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub rendered_prompt: String,
    pub variables: Vec<String>,
}

/// Distinct placeholder names in first-seen order.
pub fn extract_variables(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(content) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Substitute every `${name}` that has a value in `variables`.
pub fn render(content: &str, variables: &Variables) -> String {
    PLACEHOLDER_RE
        .replace_all(content, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Render `content` and report its placeholders. Touches no storage.
pub fn preview(content: &str, variables: &Variables) -> Preview {
    Preview {
        rendered_prompt: render(content, variables),
        variables: extract_variables(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_all_supplied() {
        let content = "Write about ${topic} in ${tone} tone";
        let rendered = render(content, &vars(&[("topic", "cats"), ("tone", "fun")]));

        assert_eq!(rendered, "Write about cats in fun tone");
        assert_eq!(extract_variables(content), vec!["topic", "tone"]);
    }

    #[test]
    fn test_render_missing_passes_through() {
        assert_eq!(render("Hello ${name}", &Variables::new()), "Hello ${name}");
    }

    #[test]
    fn test_extract_collapses_duplicates_in_first_seen_order() {
        let content = "${b} then ${a} then ${b} and ${c_1}";
        assert_eq!(extract_variables(content), vec!["b", "a", "c_1"]);
        assert_eq!(extract_variables(content), extract_variables(content));
    }

    #[test]
    fn test_extract_ignores_malformed_tokens() {
        let content = "$name {name} ${} ${two words} ${ok}";
        assert_eq!(extract_variables(content), vec!["ok"]);
    }

    #[test]
    fn test_partial_render_leaves_only_missing_names() {
        let content = "Dear ${name}, your ${item} ships ${day}.";
        let rendered = render(content, &vars(&[("name", "Ada"), ("day", "Monday")]));

        assert_eq!(rendered, "Dear Ada, your ${item} ships Monday.");
        assert_eq!(extract_variables(&rendered), vec!["item"]);
    }

    #[test]
    fn test_full_render_leaves_no_placeholders() {
        let content = "${greeting}, ${name}! ${greeting} again.";
        let supplied = vars(&[("greeting", "Hi"), ("name", "Sam")]);
        let rendered = render(content, &supplied);

        assert_eq!(rendered, "Hi, Sam! Hi again.");
        assert!(extract_variables(&rendered).is_empty());
    }

    #[test]
    fn test_substituted_values_are_not_expanded() {
        let rendered = render(
            "${a}",
            &vars(&[("a", "${b}"), ("b", "should not appear")]),
        );
        assert_eq!(rendered, "${b}");
    }

    #[test]
    fn test_unused_values_are_ignored() {
        assert_eq!(render("static", &vars(&[("x", "1")])), "static");
    }

    #[test]
    fn test_preview() {
        let preview = preview("Hi ${name} from ${place}", &vars(&[("name", "Lee")]));
        assert_eq!(preview.rendered_prompt, "Hi Lee from ${place}");
        assert_eq!(preview.variables, vec!["name", "place"]);
    }
}
