//! Registration of helpers with the template engine.
//!
//! Helper names are checked when they are registered, not when a template
//! first calls them, so a bad vocabulary fails the build before any page is
//! rendered.

use std::collections::HashSet;

use minijinja::value::Value;
use minijinja::Environment;

use crate::helpers::{config, if_equals, limit, log, web_root};
use crate::rewrite::PLACEHOLDER;

/// Words that cannot be used as helper names in templates.
const RESERVED: &[&str] = &[
    "true", "false", "none", "True", "False", "None", "and", "or", "not", "in", "is", "if",
    "else",
];

/// The helpers a vocabulary can hold. Each variant fixes one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Helper {
    /// `() -> placeholder`
    WebRoot { placeholder: String },
    /// `(data) -> data`
    Config,
    /// `(a, b, then, else?) -> then | else`
    IfEquals,
    /// `(data...) -> ""`
    Log,
    /// `(seq, n?) -> seq`
    Limit,
}

/// Errors raised while building a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HelperError {
    #[error("Invalid helper name '{0}': expected an identifier")]
    InvalidName(String),

    #[error("Helper name '{0}' is reserved")]
    ReservedName(String),

    #[error("Helper '{0}' is already registered")]
    Duplicate(String),
}

/// A named set of helpers available to every template.
#[derive(Debug, Clone, Default)]
pub struct HelperVocabulary {
    helpers: Vec<(String, Helper)>,
    names: HashSet<String>,
}

impl HelperVocabulary {
    /// Create an empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard vocabulary: `webRoot`, `config`, `ifEquals`, `log`, `limit`.
    pub fn standard() -> Self {
        Self::with_placeholder(PLACEHOLDER)
    }

    /// The standard vocabulary with a custom web-root token.
    pub fn with_placeholder(placeholder: &str) -> Self {
        let mut vocab = Self::new();

        let standard = [
            (
                "webRoot",
                Helper::WebRoot {
                    placeholder: placeholder.to_string(),
                },
            ),
            ("config", Helper::Config),
            ("ifEquals", Helper::IfEquals),
            ("log", Helper::Log),
            ("limit", Helper::Limit),
        ];

        for (name, helper) in standard {
            vocab
                .register(name, helper)
                .expect("standard helper names are valid");
        }

        vocab
    }

    /// Add a helper under `name`.
    pub fn register(&mut self, name: &str, helper: Helper) -> Result<(), HelperError> {
        if !is_identifier(name) {
            return Err(HelperError::InvalidName(name.to_string()));
        }
        if RESERVED.contains(&name) {
            return Err(HelperError::ReservedName(name.to_string()));
        }
        if !self.names.insert(name.to_string()) {
            return Err(HelperError::Duplicate(name.to_string()));
        }

        self.helpers.push((name.to_string(), helper));
        Ok(())
    }

    /// Look up a helper by name.
    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.helpers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, helper)| helper)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }

    /// Install every helper as a global function. `limit` is also
    /// available as a filter under the same name.
    pub fn install(&self, env: &mut Environment<'_>) {
        for (name, helper) in &self.helpers {
            match helper {
                Helper::WebRoot { placeholder } if placeholder == PLACEHOLDER => {
                    env.add_function(name.clone(), web_root);
                }
                Helper::WebRoot { placeholder } => {
                    let token = placeholder.clone();
                    env.add_function(name.clone(), move || {
                        Value::from_safe_string(token.clone())
                    });
                }
                Helper::Config => env.add_function(name.clone(), config),
                Helper::IfEquals => env.add_function(name.clone(), if_equals),
                Helper::Log => env.add_function(name.clone(), log),
                Helper::Limit => {
                    env.add_function(name.clone(), limit);
                    env.add_filter(name.clone(), limit);
                }
            }
        }

        tracing::debug!("Installed {} template helpers", self.helpers.len());
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use pretty_assertions::assert_eq;

    fn env() -> Environment<'static> {
        let mut env = Environment::new();
        HelperVocabulary::standard().install(&mut env);
        env
    }

    fn render(source: &str, ctx: Value) -> String {
        env().render_str(source, ctx).unwrap()
    }

    #[test]
    fn standard_vocabulary_has_five_helpers() {
        let vocab = HelperVocabulary::standard();

        assert_eq!(
            vocab.names().collect::<Vec<_>>(),
            vec!["webRoot", "config", "ifEquals", "log", "limit"]
        );
        assert_eq!(vocab.get("ifEquals"), Some(&Helper::IfEquals));
    }

    #[test]
    fn rejects_duplicates() {
        let mut vocab = HelperVocabulary::standard();

        assert_eq!(
            vocab.register("limit", Helper::Limit),
            Err(HelperError::Duplicate("limit".to_string()))
        );
    }

    #[test]
    fn rejects_bad_names() {
        let mut vocab = HelperVocabulary::new();

        assert!(matches!(
            vocab.register("web-root", Helper::Config),
            Err(HelperError::InvalidName(_))
        ));
        assert!(matches!(
            vocab.register("9lives", Helper::Config),
            Err(HelperError::InvalidName(_))
        ));
        assert!(matches!(
            vocab.register("none", Helper::Config),
            Err(HelperError::ReservedName(_))
        ));
        assert!(vocab.is_empty());
    }

    #[test]
    fn renders_web_root_unescaped() {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::Html);
        HelperVocabulary::standard().install(&mut env);

        let out = env
            .render_str("<link href=\"{{ webRoot() }}/css/a.css\">", context! {})
            .unwrap();

        assert_eq!(out, "<link href=\"{{webRoot}}/css/a.css\">");
    }

    #[test]
    fn renders_if_equals() {
        let out = render(
            "{{ ifEquals(page, 'home', 'active', 'idle') }}|{{ ifEquals(n, '5', 'y', 'n') }}",
            context! { page => "home", n => 5 },
        );

        assert_eq!(out, "active|n");
    }

    #[test]
    fn renders_limit_as_function_and_filter() {
        let out = render(
            "{% for i in limit(items, 2) %}{{ i }}{% endfor %}-{{ items | limit(1) | length }}",
            context! { items => vec![1, 2, 3] },
        );

        assert_eq!(out, "12-1");
    }

    #[test]
    fn limit_accepts_counts_from_data() {
        let out = render(
            "{{ limit(items, n) | join(',') }}|{{ limit(items) | join(',') }}|{{ limit(items, missing) | length }}",
            context! { items => vec![1, 2, 3], n => "2" },
        );

        assert_eq!(out, "1,2|1,2,3|3");
    }

    #[test]
    fn config_passes_nested_data_through() {
        let out = render(
            "{{ config(site).title }}",
            context! { site => context! { title => "Plinth" } },
        );

        assert_eq!(out, "Plinth");
    }

    #[test]
    fn log_does_not_alter_output() {
        let out = render("a{{ log(x, 'y') }}b", context! { x => 1 });

        assert_eq!(out, "ab");
    }

    #[test]
    fn custom_placeholder_is_installed() {
        let mut env = Environment::new();
        HelperVocabulary::with_placeholder("@@root@@").install(&mut env);

        let out = env.render_str("{{ webRoot() }}/x", context! {}).unwrap();

        assert_eq!(out, "@@root@@/x");
    }
}
