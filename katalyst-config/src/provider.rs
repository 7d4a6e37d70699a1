use std::collections::HashMap;

/// Typed, hierarchical configuration access
///
/// This is the "caller-supplied provider" contract the core consumes — it
/// does not parse YAML or `.env` files itself (that remains an explicit
/// Non-goal); embedders hand the core an implementation backed by whatever
/// file/env loader they choose. A trait rather than a concrete config type
/// so the core never depends on a particular loader.
pub trait ConfigProvider: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_long(&self, key: &str) -> Option<i64>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_string_list(&self, key: &str) -> Option<Vec<String>>;
    fn contains_key(&self, key: &str) -> bool;

    fn get_string_or(&self, key: &str, default: impl Into<String>) -> String
    where
        Self: Sized,
    {
        self.get_string(key).unwrap_or_else(|| default.into())
    }

    fn get_int_or(&self, key: &str, default: i64) -> i64
    where
        Self: Sized,
    {
        self.get_int(key).unwrap_or(default)
    }

    fn get_bool_or(&self, key: &str, default: bool) -> bool
    where
        Self: Sized,
    {
        self.get_bool(key).unwrap_or(default)
    }
}

/// Reference `ConfigProvider` backed by an in-memory map.
///
/// An in-memory-map shape, minus any YAML parsing (out of scope here) —
/// used by the orchestrator's own tests and available to embedders who
/// already have a flat key/value map (e.g. assembled from their own
/// YAML/env loader) and just need something implementing [`ConfigProvider`].
#[derive(Debug, Clone, Default)]
pub struct MapConfigProvider {
    values: HashMap<String, String>,
}

impl MapConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Builds a provider overlaying `overlay` on top of `base` (`overlay`
    /// wins on key collision) — the profile-additive-overlay shape the runtime
    /// requires for `katalyst.profile`, generalized from `R2eConfig::load`'s
    /// base-then-`-{profile}` YAML layering to "whatever two maps are handed
    /// in", since actual file loading is the embedder's job.
    pub fn overlay(base: &MapConfigProvider, overlay: &MapConfigProvider) -> Self {
        let mut merged = base.values.clone();
        merged.extend(overlay.values.clone());
        Self { values: merged }
    }
}

impl ConfigProvider for MapConfigProvider {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key)?.parse().ok()
    }

    fn get_long(&self, key: &str) -> Option<i64> {
        self.get_int(key)
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)?.to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        }
    }

    fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        Some(
            self.values
                .get(key)?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        )
    }

    fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_provider_typed_access() {
        let provider = MapConfigProvider::new()
            .with("katalyst.tx.retry.maxAttempts", "3")
            .with("katalyst.di.verbose", "true")
            .with("katalyst.scan.roots", "app, app::service");

        assert_eq!(provider.get_int("katalyst.tx.retry.maxAttempts"), Some(3));
        assert_eq!(provider.get_bool("katalyst.di.verbose"), Some(true));
        assert_eq!(
            provider.get_string_list("katalyst.scan.roots"),
            Some(vec!["app".to_string(), "app::service".to_string()])
        );
        assert!(!provider.contains_key("missing"));
    }

    #[test]
    fn overlay_prefers_overlay_values() {
        let base = MapConfigProvider::new().with("katalyst.profile", "dev").with("a", "1");
        let overlay = MapConfigProvider::new().with("katalyst.profile", "prod");
        let merged = MapConfigProvider::overlay(&base, &overlay);

        assert_eq!(merged.get_string("katalyst.profile"), Some("prod".to_string()));
        assert_eq!(merged.get_string("a"), Some("1".to_string()));
    }
}
