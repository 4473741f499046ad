//! Catalog discovery.
//!
//! Asks the upstream which models exist. A failed or empty answer is
//! replaced by a small built-in catalog so a refresh cycle always has
//! something to probe.

use super::models::{CatalogSource, ModelCatalog};
use super::upstream::ModelApi;

/// Catalog used when the upstream listing is unavailable.
pub const FALLBACK_MODELS: &[&str] = &[
    "gpt-3.5-turbo",
    "gpt-4",
    "claude-3-haiku",
    "claude-3-sonnet",
    "gemini-pro",
];

/// The built-in fallback catalog.
#[must_use]
pub fn fallback_catalog() -> ModelCatalog {
    ModelCatalog::new(FALLBACK_MODELS.iter().copied(), CatalogSource::Fallback)
}

/// Fetch the current catalog, falling back to [`FALLBACK_MODELS`].
///
/// Never fails. Timeouts, non-2xx responses, malformed payloads and empty
/// listings are logged at `warn` and answered with the fallback.
pub async fn discover(api: &dyn ModelApi) -> ModelCatalog {
    match api.list_models().await {
        Ok(models) if !models.is_empty() => {
            let catalog = ModelCatalog::new(models, CatalogSource::Upstream);
            tracing::info!(count = catalog.len(), "Discovered models from upstream");
            catalog
        }
        Ok(_) => {
            tracing::warn!(
                fallback = FALLBACK_MODELS.len(),
                "Upstream returned an empty model list, using fallback catalog"
            );
            fallback_catalog()
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                fallback = FALLBACK_MODELS.len(),
                "Model discovery failed, using fallback catalog"
            );
            fallback_catalog()
        }
    }
}
