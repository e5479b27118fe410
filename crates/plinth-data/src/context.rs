//! The merged, read-only build context.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::fragment::DataFragment;

/// How colliding keys from different fragments are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Later fragments replace whole top-level values.
    #[default]
    Shallow,

    /// Mappings are merged recursively; any other value is replaced.
    Deep,
}

/// The union of all data fragments for one build.
///
/// Built once before rendering and shared by reference afterwards. There is
/// no way to mutate it after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedContext {
    values: Map<String, Value>,
    sources: Vec<PathBuf>,
}

impl MergedContext {
    /// Merge fragments in the given order. Later fragments win on collision.
    pub fn from_fragments<I>(fragments: I, policy: MergePolicy) -> Self
    where
        I: IntoIterator<Item = DataFragment>,
    {
        let mut values = Map::new();
        let mut sources = Vec::new();

        for fragment in fragments {
            sources.push(fragment.path().to_path_buf());

            for (key, value) in fragment.into_values() {
                match policy {
                    MergePolicy::Shallow => {
                        values.insert(key, value);
                    }
                    MergePolicy::Deep => match values.get_mut(&key) {
                        Some(existing) => deep_merge(existing, value),
                        None => {
                            values.insert(key, value);
                        }
                    },
                }
            }
        }

        Self { values, sources }
    }

    /// Look up a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All top-level values.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Files the context was merged from, in merge order.
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serialize to JSON. Keys are emitted in sorted order, so equal
    /// contexts always produce identical bytes.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.values.clone()).to_string()
    }
}

impl Serialize for MergedContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// Recursively merge `incoming` into `target`.
fn deep_merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(target), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, incoming) => *target = incoming,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Format;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fragment(name: &str, source: &str) -> DataFragment {
        DataFragment::parse(Path::new(name), source, Format::Json).unwrap()
    }

    #[test]
    fn later_fragment_wins_on_collision() {
        let ctx = MergedContext::from_fragments(
            vec![fragment("a.json", r#"{"x": 1}"#), fragment("b.json", r#"{"x": 2}"#)],
            MergePolicy::Shallow,
        );

        assert_eq!(ctx.get("x"), Some(&json!(2)));
        assert_eq!(
            ctx.sources().collect::<Vec<_>>(),
            vec![Path::new("a.json"), Path::new("b.json")]
        );
    }

    #[test]
    fn shallow_merge_replaces_nested_mappings() {
        let ctx = MergedContext::from_fragments(
            vec![
                fragment("a.json", r#"{"site": {"title": "A", "lang": "en"}}"#),
                fragment("b.json", r#"{"site": {"title": "B"}}"#),
            ],
            MergePolicy::Shallow,
        );

        assert_eq!(ctx.get("site"), Some(&json!({ "title": "B" })));
    }

    #[test]
    fn deep_merge_combines_nested_mappings() {
        let ctx = MergedContext::from_fragments(
            vec![
                fragment("a.json", r#"{"site": {"title": "A", "lang": "en", "tags": [1, 2]}}"#),
                fragment("b.json", r#"{"site": {"title": "B", "tags": [3]}}"#),
            ],
            MergePolicy::Deep,
        );

        assert_eq!(
            ctx.get("site"),
            Some(&json!({ "title": "B", "lang": "en", "tags": [3] }))
        );
    }

    #[test]
    fn keeps_disjoint_keys() {
        let ctx = MergedContext::from_fragments(
            vec![fragment("a.json", r#"{"a": true}"#), fragment("b.json", r#"{"b": null}"#)],
            MergePolicy::Shallow,
        );

        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.to_json_string(), r#"{"a":true,"b":null}"#);
    }

    #[test]
    fn serializes_as_plain_mapping() {
        let ctx = MergedContext::from_fragments(
            vec![fragment("a.json", r#"{"name": "plinth"}"#)],
            MergePolicy::Shallow,
        );

        assert_eq!(serde_json::to_value(&ctx).unwrap(), json!({ "name": "plinth" }));
    }
}
