//! Configuration block of a declaration
//!
//! `Meta` is an ordered bag of option name -> value. Only the names in
//! [`DEFAULT_NAMES`] (plus `verbose_name_plural`) are recognized; anything
//! else is rejected when the declaration is built. Names starting with `_`
//! are private and ignored.

use indexmap::IndexMap;
use stratadoc_core::{PrimitiveMap, Value};

/// Recognized option names
pub const DEFAULT_NAMES: [&str; 8] = [
    "verbose_name",
    "db_table",
    "ordering",
    "schema_key",
    "app_label",
    "collection",
    "virtual",
    "proxy",
];

/// Recognized outside `DEFAULT_NAMES`: it defaults from `verbose_name`
pub const VERBOSE_NAME_PLURAL: &str = "verbose_name_plural";

/// Configuration block attached to a schema or document declaration
///
/// # Example
///
/// ```
/// use stratadoc_schema::Meta;
///
/// let meta = Meta::new().collection("people").ordering(["-age", "name"]);
/// assert_eq!(meta.get("collection").and_then(|v| v.as_str()), Some("people"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    entries: IndexMap<String, Value>,
}

impl Meta {
    /// Empty configuration block
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a stored mapping (e.g. a parsed declaration file)
    pub fn from_map(map: PrimitiveMap) -> Self {
        let mut entries: IndexMap<String, Value> = map.into_iter().collect();
        entries.sort_keys();
        Meta { entries }
    }

    /// Set an arbitrary option; validity is checked at build time
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// Human-readable singular name
    pub fn verbose_name(self, name: impl Into<String>) -> Self {
        self.set("verbose_name", name.into())
    }

    /// Human-readable plural name
    pub fn verbose_name_plural(self, name: impl Into<String>) -> Self {
        self.set(VERBOSE_NAME_PLURAL, name.into())
    }

    /// Storage table name
    pub fn db_table(self, table: impl Into<String>) -> Self {
        self.set("db_table", table.into())
    }

    /// Default sort order
    pub fn ordering<I, S>(self, ordering: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = ordering
            .into_iter()
            .map(|s| Value::String(s.into()))
            .collect::<Vec<_>>();
        self.set("ordering", Value::Array(items))
    }

    /// Explicit catalog key
    pub fn schema_key(self, key: impl Into<String>) -> Self {
        self.set("schema_key", key.into())
    }

    /// Owning namespace
    pub fn app_label(self, label: impl Into<String>) -> Self {
        self.set("app_label", label.into())
    }

    /// Storage bucket name
    pub fn collection(self, collection: impl Into<String>) -> Self {
        self.set("collection", collection.into())
    }

    /// Mark the type virtual (not catalogued, not persisted)
    pub fn virtual_type(self, flag: bool) -> Self {
        self.set("virtual", flag)
    }

    /// Mark the type a proxy of its first base
    pub fn proxy(self, flag: bool) -> Self {
        self.set("proxy", flag)
    }

    /// Look up an option
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Check whether an option is set
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// True when `proxy` is set to `true`
    pub fn is_proxy(&self) -> bool {
        matches!(self.get("proxy"), Some(Value::Bool(true)))
    }

    /// Iterate over options in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub(crate) fn insert_if_absent(&mut self, name: &str, value: Value) {
        self.entries.entry(name.to_string()).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_recognized_names() {
        let meta = Meta::new()
            .verbose_name("human")
            .schema_key("app.human")
            .virtual_type(true);
        assert!(meta.contains("verbose_name"));
        assert_eq!(meta.get("virtual"), Some(&Value::Bool(true)));
        assert!(!meta.is_proxy());
    }

    #[test]
    fn test_proxy_flag() {
        assert!(Meta::new().proxy(true).is_proxy());
        assert!(!Meta::new().proxy(false).is_proxy());
        // Non-boolean values are rejected at build time, not treated as proxies
        assert!(!Meta::new().set("proxy", "yes").is_proxy());
    }

    #[test]
    fn test_insert_if_absent_keeps_explicit_value() {
        let mut meta = Meta::new().collection("mine");
        meta.insert_if_absent("collection", Value::from("theirs"));
        meta.insert_if_absent("ordering", Value::Array(vec![]));
        assert_eq!(meta.get("collection"), Some(&Value::from("mine")));
        assert!(meta.contains("ordering"));
    }

    #[test]
    fn test_from_map_is_sorted() {
        let mut map = PrimitiveMap::new();
        map.insert("collection".into(), Value::from("c"));
        map.insert("app_label".into(), Value::from("a"));
        let meta = Meta::from_map(map);
        let names: Vec<_> = meta.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["app_label", "collection"]);
    }
}
