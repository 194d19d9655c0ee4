//! Translation bundles: the unit of loading and caching.
//!
//! A bundle is one JSON document per (language, namespace). Its entries form a
//! tree of string-keyed nodes whose leaves are strings or string lists; dotted
//! key paths such as `nav.about.title` address a leaf.

use crate::error::LoadError;
use crate::i18n::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Maximum namespace identifier length.
const MAX_NAMESPACE_LEN: usize = 64;

/// Version assumed when a bundle file does not declare one.
pub const DEFAULT_BUNDLE_VERSION: &str = "1.0";

/// Top-level keys that carry metadata rather than translations.
const RESERVED_KEYS: &[&str] = &["language", "version", "lastUpdated", "namespace"];

/// A named grouping of translation keys (e.g. "common", "navigation").
///
/// Restricted to `[A-Za-z0-9_-]` so it can be used directly as a file or URL
/// path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(Arc<str>);

impl Namespace {
    pub const COMMON: &'static str = "common";
    pub const NAVIGATION: &'static str = "navigation";
    pub const PAGES: &'static str = "pages";
    pub const FORMS: &'static str = "forms";
    pub const ACTIONS: &'static str = "actions";
    pub const MISC: &'static str = "misc";
    pub const MANIFEST: &'static str = "manifest";

    /// Validate and wrap a namespace identifier.
    pub fn new(name: &str) -> Option<Namespace> {
        let valid = !name.is_empty()
            && name.len() <= MAX_NAMESPACE_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| Namespace(Arc::from(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespaces every language ships with.
    pub fn defaults() -> Vec<Namespace> {
        [
            Self::COMMON,
            Self::NAVIGATION,
            Self::PAGES,
            Self::FORMS,
            Self::ACTIONS,
            Self::MISC,
        ]
        .iter()
        .filter_map(|name| Namespace::new(name))
        .collect()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Namespace::new(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid namespace '{}'", name)))
    }
}

/// A node in the entries tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    Text(String),
    List(Vec<String>),
    Node(BTreeMap<String, Entry>),
}

impl Entry {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Entry::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&BTreeMap<String, Entry>> {
        match self {
            Entry::Node(children) => Some(children),
            _ => None,
        }
    }

    /// Convert a JSON value, rejecting anything that is not a string, a list
    /// of strings, or an object of such.
    fn from_json(value: Value, path: &str) -> Result<Entry, String> {
        match value {
            Value::String(text) => Ok(Entry::Text(text)),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::String(text) => Ok(text),
                    other => Err(format!(
                        "{}[{}] must be a string, found {}",
                        path,
                        index,
                        json_type_name(&other)
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Entry::List),
            Value::Object(map) => {
                let mut children = BTreeMap::new();
                for (key, child) in map {
                    let child_path = join_path(path, &key);
                    children.insert(key, Entry::from_json(child, &child_path)?);
                }
                Ok(Entry::Node(children))
            }
            other => Err(format!(
                "{} must be a string, string list or object, found {}",
                if path.is_empty() { "<root>" } else { path },
                json_type_name(&other)
            )),
        }
    }
}

/// A loaded translation bundle. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationBundle {
    pub language: Language,
    pub namespace: Namespace,
    pub version: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
    pub entries: BTreeMap<String, Entry>,
}

impl TranslationBundle {
    /// Build a bundle directly from an entries tree.
    pub fn new(language: Language, namespace: Namespace, entries: BTreeMap<String, Entry>) -> Self {
        Self {
            language,
            namespace,
            version: DEFAULT_BUNDLE_VERSION.to_string(),
            last_updated: None,
            entries,
        }
    }

    /// Parse and validate raw bundle bytes for the requested key.
    ///
    /// `source_id` is only used to make errors actionable.
    pub fn parse(
        source_id: &str,
        language: Language,
        namespace: &Namespace,
        raw: &[u8],
    ) -> Result<TranslationBundle, LoadError> {
        let malformed = |reason: String| LoadError::Malformed {
            source_id: source_id.to_string(),
            reason,
        };

        let document: Value =
            serde_json::from_slice(raw).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;
        let Value::Object(mut root) = document else {
            return Err(malformed(format!(
                "top level must be an object, found {}",
                json_type_name(&document)
            )));
        };

        let declared_language = take_string_field(&mut root, "language").map_err(malformed)?;
        if let Some(declared) = declared_language {
            if declared != language.code() {
                return Err(LoadError::IntegrityMismatch {
                    source_id: source_id.to_string(),
                    field: "language",
                    requested: language.code().to_string(),
                    declared,
                });
            }
        }

        let declared_namespace = take_string_field(&mut root, "namespace").map_err(malformed)?;
        if let Some(declared) = declared_namespace {
            if declared != namespace.as_str() {
                return Err(LoadError::IntegrityMismatch {
                    source_id: source_id.to_string(),
                    field: "namespace",
                    requested: namespace.to_string(),
                    declared,
                });
            }
        }

        let version = match root.remove("version") {
            None | Some(Value::Null) => DEFAULT_BUNDLE_VERSION.to_string(),
            Some(Value::String(version)) => version,
            Some(Value::Number(number)) => number.to_string(),
            Some(other) => {
                return Err(malformed(format!(
                    "version must be a string, found {}",
                    json_type_name(&other)
                )))
            }
        };

        let last_updated = match take_string_field(&mut root, "lastUpdated").map_err(malformed)? {
            None => None,
            Some(raw_ts) => Some(
                DateTime::parse_from_rfc3339(&raw_ts)
                    .map_err(|e| malformed(format!("lastUpdated '{}' is not RFC 3339: {}", raw_ts, e)))?
                    .with_timezone(&Utc),
            ),
        };

        let entries_value = match root.remove("translations") {
            Some(Value::Object(map)) => Value::Object(map),
            Some(other) => {
                return Err(malformed(format!(
                    "translations must be an object, found {}",
                    json_type_name(&other)
                )))
            }
            None => Value::Object(root),
        };

        let entries = match Entry::from_json(entries_value, "").map_err(malformed)? {
            Entry::Node(children) => children,
            _ => return Err(malformed("entries must be an object".to_string())),
        };

        Ok(TranslationBundle {
            language,
            namespace: namespace.clone(),
            version,
            last_updated,
            entries,
        })
    }

    /// Walk a dotted key path through the entries tree.
    pub fn lookup(&self, key_path: &str) -> Option<&Entry> {
        let mut segments = key_path.split('.');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            current = current.as_node()?.get(segment)?;
        }
        Some(current)
    }

    /// Resolve a key path to a non-empty string leaf.
    pub fn get_text(&self, key_path: &str) -> Option<&str> {
        self.lookup(key_path)
            .and_then(Entry::as_text)
            .filter(|text| !text.is_empty())
    }

    /// All leaf key paths with their entries, in sorted order.
    pub fn leaves(&self) -> Vec<(String, &Entry)> {
        let mut out = Vec::new();
        for (key, entry) in &self.entries {
            collect_leaves(key.clone(), entry, &mut out);
        }
        out
    }

    /// Number of addressable leaves.
    pub fn key_count(&self) -> usize {
        self.leaves().len()
    }

    /// Serialize back to the on-disk document format.
    pub fn to_document(&self) -> Value {
        let mut root = serde_json::Map::new();
        root.insert("language".into(), Value::String(self.language.code().into()));
        root.insert("namespace".into(), Value::String(self.namespace.to_string()));
        root.insert("version".into(), Value::String(self.version.clone()));
        if let Some(ts) = self.last_updated {
            root.insert("lastUpdated".into(), Value::String(ts.to_rfc3339()));
        }
        root.insert(
            "translations".into(),
            serde_json::to_value(&self.entries).unwrap_or(Value::Object(Default::default())),
        );
        Value::Object(root)
    }
}

fn collect_leaves<'a>(path: String, entry: &'a Entry, out: &mut Vec<(String, &'a Entry)>) {
    match entry {
        Entry::Node(children) if !children.is_empty() => {
            for (key, child) in children {
                collect_leaves(join_path(&path, key), child, out);
            }
        }
        _ => out.push((path, entry)),
    }
}

fn take_string_field(
    root: &mut serde_json::Map<String, Value>,
    field: &str,
) -> Result<Option<String>, String> {
    match root.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(format!(
            "{} must be a string, found {}",
            field,
            json_type_name(&other)
        )),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// True when `name` is one of the metadata keys rather than an entry.
pub fn is_reserved_key(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(name: &str) -> Namespace {
        Namespace::new(name).unwrap()
    }

    fn parse(language: Language, namespace: &str, raw: &str) -> Result<TranslationBundle, LoadError> {
        TranslationBundle::parse("test", language, &ns(namespace), raw.as_bytes())
    }

    // ==================== Namespace Tests ====================

    #[test]
    fn test_namespace_accepts_identifiers() {
        assert!(Namespace::new("common").is_some());
        assert!(Namespace::new("donate-form_v2").is_some());
    }

    #[test]
    fn test_namespace_rejects_path_segments() {
        assert!(Namespace::new("").is_none());
        assert!(Namespace::new("../etc").is_none());
        assert!(Namespace::new("a/b").is_none());
        assert!(Namespace::new("with space").is_none());
        assert!(Namespace::new(&"x".repeat(65)).is_none());
    }

    #[test]
    fn test_namespace_defaults() {
        let names: Vec<_> = Namespace::defaults().iter().map(|n| n.to_string()).collect();
        assert_eq!(
            names,
            vec!["common", "navigation", "pages", "forms", "actions", "misc"]
        );
    }

    // ==================== Parse Tests ====================

    #[test]
    fn test_parse_flat_document_with_metadata() {
        let bundle = parse(
            Language::ENGLISH,
            "navigation",
            r#"{"language":"en","version":"2.1","lastUpdated":"2024-05-01T10:00:00Z",
                "nav":{"home":"Home","about":{"title":"About us"}}}"#,
        )
        .unwrap();

        assert_eq!(bundle.version, "2.1");
        assert!(bundle.last_updated.is_some());
        assert_eq!(bundle.get_text("nav.home"), Some("Home"));
        assert_eq!(bundle.get_text("nav.about.title"), Some("About us"));
        assert!(bundle.lookup("language").is_none());
    }

    #[test]
    fn test_parse_translations_wrapper() {
        let bundle = parse(
            Language::FRENCH,
            "common",
            r#"{"language":"fr","translations":{"hello":"Bonjour"}}"#,
        )
        .unwrap();
        assert_eq!(bundle.get_text("hello"), Some("Bonjour"));
        assert_eq!(bundle.version, DEFAULT_BUNDLE_VERSION);
    }

    #[test]
    fn test_parse_language_mismatch_is_integrity_error() {
        let err = parse(Language::FRENCH, "common", r#"{"language":"de","a":"b"}"#).unwrap_err();
        match err {
            LoadError::IntegrityMismatch {
                field,
                requested,
                declared,
                ..
            } => {
                assert_eq!(field, "language");
                assert_eq!(requested, "fr");
                assert_eq!(declared, "de");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_namespace_mismatch_is_integrity_error() {
        let err = parse(Language::ENGLISH, "forms", r#"{"namespace":"pages"}"#).unwrap_err();
        assert_eq!(err.kind(), "integrity_mismatch");
    }

    #[test]
    fn test_parse_invalid_json_is_malformed() {
        let err = parse(Language::ENGLISH, "common", "{not json").unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn test_parse_non_object_is_malformed() {
        let err = parse(Language::ENGLISH, "common", r#"["a","b"]"#).unwrap_err();
        assert!(err.to_string().contains("top level must be an object"));
    }

    #[test]
    fn test_parse_rejects_numeric_leaf_with_path() {
        let err = parse(Language::ENGLISH, "common", r#"{"stats":{"count":5}}"#).unwrap_err();
        assert!(err.to_string().contains("stats.count"));
    }

    #[test]
    fn test_parse_rejects_bad_timestamp() {
        let err = parse(Language::ENGLISH, "common", r#"{"lastUpdated":"yesterday"}"#).unwrap_err();
        assert!(err.to_string().contains("lastUpdated"));
    }

    #[test]
    fn test_parse_string_list_leaf() {
        let bundle = parse(
            Language::ENGLISH,
            "misc",
            r#"{"values":["Hope","Dignity"]}"#,
        )
        .unwrap();
        assert_eq!(
            bundle.lookup("values"),
            Some(&Entry::List(vec!["Hope".into(), "Dignity".into()]))
        );
        assert_eq!(bundle.get_text("values"), None);
    }

    // ==================== Lookup Tests ====================

    #[test]
    fn test_lookup_missing_paths() {
        let bundle = parse(Language::ENGLISH, "common", r#"{"a":{"b":"c"},"empty":""}"#).unwrap();
        assert!(bundle.lookup("a.x").is_none());
        assert!(bundle.lookup("a.b.c").is_none());
        assert!(bundle.lookup("").is_none());
        assert!(bundle.lookup(".a").is_none());
        assert_eq!(bundle.get_text("a"), None);
        assert_eq!(bundle.get_text("empty"), None);
    }

    #[test]
    fn test_leaves_and_key_count() {
        let bundle = parse(
            Language::ENGLISH,
            "common",
            r#"{"a":{"b":"1","c":{"d":"2"}},"e":["x"]}"#,
        )
        .unwrap();
        let keys: Vec<_> = bundle.leaves().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a.b", "a.c.d", "e"]);
        assert_eq!(bundle.key_count(), 3);
    }

    #[test]
    fn test_document_reparses_to_same_bundle() {
        let bundle = parse(
            Language::ARABIC,
            "pages",
            r#"{"language":"ar","version":"3","title":"مرحبا"}"#,
        )
        .unwrap();
        let raw = serde_json::to_vec(&bundle.to_document()).unwrap();
        let again = TranslationBundle::parse("again", Language::ARABIC, &ns("pages"), &raw).unwrap();
        assert_eq!(bundle, again);
    }

    #[test]
    fn test_reserved_keys() {
        assert!(is_reserved_key("lastUpdated"));
        assert!(!is_reserved_key("nav"));
    }
}
