// ABOUTME: In-memory model catalog registry
// ABOUTME: Loads the embedded catalog JSON once and answers provider/model lookups

use lazy_static::lazy_static;
use serde::Deserialize;

use crate::types::{CatalogModel, Provider, ProviderCatalog};

const CATALOG_JSON: &str = include_str!("../config/catalog.json");

lazy_static! {
    pub static ref REGISTRY: ModelRegistry =
        ModelRegistry::from_json(CATALOG_JSON).expect("embedded model catalog must be valid");
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelRegistry {
    providers: Vec<ProviderCatalog>,
}

impl ModelRegistry {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Enabled providers in display order
    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.providers
            .iter()
            .filter(|entry| !entry.disabled)
            .map(|entry| entry.provider)
    }

    pub fn catalog(&self, provider: Provider) -> Option<&ProviderCatalog> {
        self.providers.iter().find(|entry| entry.provider == provider)
    }

    pub fn models(&self, provider: Provider) -> &[CatalogModel] {
        self.catalog(provider)
            .map(|entry| entry.models.as_slice())
            .unwrap_or(&[])
    }

    pub fn default_models(&self, provider: Provider) -> &[String] {
        self.catalog(provider)
            .map(|entry| entry.default_models.as_slice())
            .unwrap_or(&[])
    }

    /// Providers missing from the catalog count as disabled
    pub fn is_disabled(&self, provider: Provider) -> bool {
        self.catalog(provider).map_or(true, |entry| entry.disabled)
    }

    pub fn has_model(&self, provider: Provider, model_id: &str) -> bool {
        self.models(provider).iter().any(|model| model.id == model_id)
    }
}
