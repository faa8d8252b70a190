//! String-keyed session configuration.
//!
//! Tunables like error quotas are read from a flat key/value map so callers
//! can thread settings through without the engine growing a field per knob.

use std::collections::HashMap;

/// A configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}

/// A flat map of configuration properties with typed, defaulted reads.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    values: HashMap<String, ConfigValue>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Reads an integer, falling back to `default` when the key is absent or
    /// holds a non-integer value.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(ConfigValue::Int(v)) => *v,
            _ => default,
        }
    }

    /// Reads a boolean, falling back to `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(ConfigValue::Bool(v)) => *v,
            _ => default,
        }
    }

    /// Reads a string, falling back to `default`.
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.values.get(key) {
            Some(ConfigValue::Str(v)) => v,
            _ => default,
        }
    }
}
