//! String- and bool-valued attribute maps stamped on modules and wires.
//!
//! Passes communicate with each other and with the final emitters by
//! stamping attributes rather than threading extra fields through every
//! entity: `mem_shadow` stamps `loom_shadow_addr_bits` on a module,
//! `reset_extract` stamps `loom_reset_value` on a wire, and so on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named bag of string and boolean attributes.
///
/// Two separate maps rather than one `enum`-valued map because the two
/// kinds are read differently throughout the pipeline: string attributes
/// are usually parsed once and cached, bool attributes are checked with a
/// plain `contains`/`get` on every visit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attrs {
    strings: BTreeMap<String, String>,
    bools: BTreeMap<String, bool>,
}

impl Attrs {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a string-valued attribute.
    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    /// Returns a string-valued attribute, if set.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    /// Removes a string-valued attribute, returning its prior value.
    pub fn remove_string(&mut self, key: &str) -> Option<String> {
        self.strings.remove(key)
    }

    /// Sets a bool-valued attribute.
    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.bools.insert(key.into(), value);
    }

    /// Returns a bool-valued attribute, defaulting to `false` if unset.
    pub fn get_bool(&self, key: &str) -> bool {
        self.bools.get(key).copied().unwrap_or(false)
    }

    /// Iterates over all string attributes.
    pub fn strings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.strings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip() {
        let mut attrs = Attrs::new();
        attrs.set_string("hdlname", "top.counter.q");
        assert_eq!(attrs.get_string("hdlname"), Some("top.counter.q"));
        assert_eq!(attrs.get_string("missing"), None);
    }

    #[test]
    fn bool_defaults_false() {
        let attrs = Attrs::new();
        assert!(!attrs.get_bool("loom_resets_extracted"));
    }

    #[test]
    fn string_remove() {
        let mut attrs = Attrs::new();
        attrs.set_string("loom_reset_value", "8'b0");
        assert!(attrs.remove_string("loom_reset_value").is_some());
        assert_eq!(attrs.get_string("loom_reset_value"), None);
    }

    #[test]
    fn overwrite_bool() {
        let mut attrs = Attrs::new();
        attrs.set_bool("loom_dpi_builtin", true);
        attrs.set_bool("loom_dpi_builtin", false);
        assert!(!attrs.get_bool("loom_dpi_builtin"));
    }

    #[test]
    fn serde_roundtrip() {
        let mut attrs = Attrs::new();
        attrs.set_string("hdlname", "a.b");
        attrs.set_bool("flag", true);
        let json = serde_json::to_string(&attrs).unwrap();
        let restored: Attrs = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.get_string("hdlname"), Some("a.b"));
        assert!(restored.get_bool("flag"));
    }
}
