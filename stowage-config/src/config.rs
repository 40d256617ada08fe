//! Configuration tree

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

use crate::{ConfigError, Result};

/// A single configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Section(Config),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_section(&self) -> Option<&Config> {
        match self {
            ConfigValue::Section(c) => Some(c),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Integer(value.into())
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<Config> for ConfigValue {
    fn from(value: Config) -> Self {
        ConfigValue::Section(value)
    }
}

/// Insertion-ordered mapping from keys to values.
///
/// There is no mutable access once a `Config` is built; `with` consumes and
/// returns the tree so construction reads as a chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    entries: Vec<(String, ConfigValue)>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Add or replace `key`, keeping its original position when replaced
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    fn insert(&mut self, key: String, value: ConfigValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Load a tree previously persisted by [`crate::ConfigWriter`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    pub fn get_section(&self, key: &str) -> Option<&Config> {
        self.get(key).and_then(ConfigValue::as_section)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K, V> FromIterator<(K, V)> for Config
where
    K: Into<String>,
    V: Into<ConfigValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Config::new(), |config, (k, v)| config.with(k, v))
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct ConfigVisitor;

impl<'de> Visitor<'de> for ConfigVisitor {
    type Value = Config;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of configuration values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Config, A::Error> {
        let mut config = Config::new();
        while let Some((key, value)) = access.next_entry::<String, ConfigValue>()? {
            config.insert(key, value);
        }
        Ok(config)
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(ConfigVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_order() {
        let config = Config::new()
            .with("zeta", "last-alphabetically")
            .with("alpha", 1)
            .with("db", Config::new().with("host", "localhost").with("port", 5432));

        assert_eq!(config.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "db"]);
        assert_eq!(config.get_str("zeta"), Some("last-alphabetically"));
        assert_eq!(config.get("alpha").and_then(ConfigValue::as_i64), Some(1));
        assert_eq!(
            config.get_section("db").and_then(|db| db.get_str("host")),
            Some("localhost")
        );
        assert!(!config.contains_key("missing"));
    }

    #[test]
    fn test_replacing_keeps_position() {
        let config = Config::new().with("a", 1).with("b", 2).with("a", 3);
        assert_eq!(config.len(), 2);
        assert_eq!(config.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(config.get("a").and_then(ConfigValue::as_i64), Some(3));
    }

    #[test]
    fn test_json_shape() {
        let config: Config = vec![("test", "foo")].into_iter().collect();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"test":"foo"}"#);

        let parsed = Config::from_json_str(r#"{"b": true, "a": 2.5, "n": {"x": "y"}}"#).unwrap();
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["b", "a", "n"]);
        assert_eq!(parsed.get("b").and_then(ConfigValue::as_bool), Some(true));
        assert_eq!(parsed.get("a").and_then(ConfigValue::as_f64), Some(2.5));
    }

    #[test]
    fn test_top_level_must_be_a_map() {
        assert!(Config::from_json_str(r#"["not", "a", "map"]"#).is_err());
    }
}
