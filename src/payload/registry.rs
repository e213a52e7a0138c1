//! Format tag → loader lookup

use crate::index::MetadataRecord;
use crate::payload::error::{PayloadError, PayloadResult};
use crate::payload::ekpy::EkpyLoader;
use crate::payload::json::JsonLoader;
use crate::payload::types::{Payload, DEFAULT_AXIS};
use crate::payload::PayloadLoader;
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatches each record to the loader registered for its format tag
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn PayloadLoader>>,
}

impl LoaderRegistry {
    /// Registry with no loaders
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `csv` and `json` loaders
    pub fn with_defaults(axis_column: &str) -> Self {
        let mut registry = Self::new();
        registry.register(EkpyLoader::new(axis_column));
        registry.register(JsonLoader::new(axis_column));
        registry
    }

    /// Add a loader, replacing any loader for the same format tag
    pub fn register(&mut self, loader: impl PayloadLoader + 'static) {
        let format = loader.format().to_ascii_lowercase();
        self.loaders.insert(format, Arc::new(loader));
    }

    pub fn get(&self, format: &str) -> Option<&Arc<dyn PayloadLoader>> {
        self.loaders.get(format)
    }

    /// Registered format tags, sorted
    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }

    /// Load a record's payload with the loader for its format tag
    pub fn load(&self, record: &MetadataRecord) -> PayloadResult<Payload> {
        let loader = self
            .get(&record.payload.format)
            .ok_or_else(|| PayloadError::FormatUnsupported {
                format: record.payload.format.clone(),
                path: record.payload.path.clone(),
            })?;
        loader.load(record)
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

impl PayloadLoader for LoaderRegistry {
    fn format(&self) -> &str {
        "*"
    }

    fn load(&self, record: &MetadataRecord) -> PayloadResult<Payload> {
        LoaderRegistry::load(self, record)
    }
}

/// Default registry used when none is configured
pub fn default_registry() -> LoaderRegistry {
    LoaderRegistry::with_defaults(DEFAULT_AXIS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PayloadRef;
    use std::collections::BTreeMap;

    struct Constant;

    impl PayloadLoader for Constant {
        fn format(&self) -> &str {
            "DAT"
        }

        fn load(&self, _record: &MetadataRecord) -> PayloadResult<Payload> {
            Payload::new(
                "time",
                vec![0.0],
                BTreeMap::from([("p1".to_string(), vec![1.0])]),
            )
        }
    }

    #[test]
    fn test_unknown_format() {
        let registry = default_registry();
        let record = MetadataRecord::new(PayloadRef::from_path("trace.h5"));
        let err = registry.load(&record).unwrap_err();
        assert_eq!(
            err,
            PayloadError::FormatUnsupported {
                format: "h5".to_string(),
                path: "trace.h5".into(),
            }
        );
    }

    #[test]
    fn test_register_custom_loader() {
        let mut registry = default_registry();
        registry.register(Constant);
        assert_eq!(registry.formats(), vec!["csv", "dat", "json"]);

        let record = MetadataRecord::new(PayloadRef::from_path("x.dat"));
        assert_eq!(registry.load(&record).unwrap().len(), 1);
    }
}
