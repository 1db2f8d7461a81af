//! String template rendering utilities.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::shell::quote_arg;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_.-]+)\}\}").expect("placeholder pattern"));

/// Placeholders every command capability can use.
pub struct TemplateVars;

impl TemplateVars {
    pub const PIPELINE: &'static str = "pipeline";
    pub const STEP: &'static str = "step";
    pub const STEP_INDEX: &'static str = "stepIndex";
    pub const CAPABILITY: &'static str = "capability";
    pub const WORKING_DIR: &'static str = "workingDir";
}

/// Single pass over `template`; substituted values are never rescanned, and
/// unknown placeholders are left as written.
pub fn render_map(template: &str, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Like [`render_map`], but every substituted value is shell-quoted.
pub fn render_shell(template: &str, variables: &HashMap<String, String>) -> String {
    let quoted: HashMap<String, String> = variables
        .iter()
        .map(|(key, value)| (key.clone(), quote_arg(value)))
        .collect();
    render_map(template, &quoted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn render_map_replaces_known_placeholders() {
        let out = render_map(
            "npx create-next-app {{name}} --{{missing}}",
            &vars(&[("name", "web")]),
        );
        assert_eq!(out, "npx create-next-app web --{{missing}}");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let variables = vars(&[("name", "{{workingDir}}"), ("workingDir", "/srv/app")]);
        for _ in 0..50 {
            assert_eq!(render_map("init {{name}}", &variables), "init {{workingDir}}");
        }
        assert_eq!(
            render_shell("init {{name}} in {{workingDir}}", &variables),
            "init '{{workingDir}}' in /srv/app"
        );
    }

    #[test]
    fn render_shell_quotes_values() {
        let out = render_shell("echo {{msg}}", &vars(&[("msg", "hello world")]));
        assert_eq!(out, "echo 'hello world'");
    }
}
