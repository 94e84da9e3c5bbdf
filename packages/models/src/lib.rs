// ABOUTME: LLM provider and model catalog
// ABOUTME: JSON-backed configuration for curated and default-enabled models with in-memory lookup

pub mod registry;
pub mod types;

pub use registry::{ModelRegistry, REGISTRY};
pub use types::{CatalogModel, ParseProviderError, Provider, ProviderCatalog};
