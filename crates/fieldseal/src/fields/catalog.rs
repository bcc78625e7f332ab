//! Which fields of which record kinds hold encrypted envelopes.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use thiserror::Error;

/// Dot-notation paths of the encrypted fields of one record kind.
pub type FieldPaths = BTreeSet<String>;

/// Errors from the field catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The requested record kind has no entry in the catalog.
    #[error("unknown record kind: {0}")]
    UnknownKind(String),
}

/// Immutable map from record kind to its encrypted field paths.
///
/// Built once at startup and shared by reference-counted handle, so lookups
/// on the request path never lock.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    kinds: HashMap<String, Arc<FieldPaths>>,
}

impl FieldCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the artifact records this service protects: user save files
    /// and clinical-style analysis text.
    pub fn builtin() -> Self {
        Self::new()
            .with_kind("savefile", ["datos_savefile"])
            .with_kind(
                "analisis",
                [
                    "resumen_ejecutivo",
                    "conclusiones_clinicas",
                    "alertas_psicologicas",
                ],
            )
    }

    /// Register (or replace) the encrypted fields of `kind`.
    pub fn with_kind<I, P>(mut self, kind: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let paths: FieldPaths = paths.into_iter().map(Into::into).collect();
        self.kinds.insert(kind.into(), Arc::new(paths));
        self
    }

    /// Look up the encrypted field paths for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownKind`] if `kind` was never registered.
    pub fn get(&self, kind: &str) -> Result<Arc<FieldPaths>, CatalogError> {
        self.kinds
            .get(kind)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownKind(kind.to_owned()))
    }

    /// Number of record kinds in the catalog.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_catalog() {
        let catalog = FieldCatalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.get("savefile").is_err());
    }

    #[test]
    fn builtin_kinds() {
        let catalog = FieldCatalog::builtin();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("savefile").unwrap().contains("datos_savefile"));
        assert_eq!(catalog.get("analisis").unwrap().len(), 3);
    }

    #[test]
    fn unknown_kind_names_the_kind() {
        let err = FieldCatalog::builtin().get("sesion").unwrap_err();
        assert!(err.to_string().contains("sesion"));
    }

    #[test]
    fn with_kind_replaces() {
        let catalog = FieldCatalog::new()
            .with_kind("savefile", ["a"])
            .with_kind("savefile", ["b", "c"]);
        let paths = catalog.get("savefile").unwrap();
        assert_eq!(paths.len(), 2);
        assert!(!paths.contains("a"));
    }
}
