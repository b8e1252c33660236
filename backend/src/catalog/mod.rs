use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shared::Severity;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse catalog file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantType {
    pub id: Uuid,
    pub name: String,
    pub scientific_name: String,
    #[serde(default)]
    pub common_diseases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseType {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub arabic_name: Option<String>,
    /// Internal classifier-label key, e.g. `tomato_early_blight`.
    #[serde(default)]
    pub tag: Option<String>,
    pub description: String,
    pub treatment: String,
    #[serde(default)]
    pub plant_types: Vec<Uuid>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PestType {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub treatment: String,
    #[serde(default)]
    pub plant_types: Vec<Uuid>,
    pub severity: Severity,
}

/// Read-only reference lookups the pipeline resolves raw labels against.
/// A miss is an expected outcome, never an error.
pub trait CatalogStore: Send + Sync {
    fn resolve_plant(&self, label: &str) -> Option<PlantType>;
    fn resolve_disease(&self, label: &str) -> Option<DiseaseType>;
    fn resolve_pest(&self, label: &str) -> Option<PestType>;
}

/// Catalogs seeded from JSON files at startup and held in memory.
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    plants: Vec<PlantType>,
    diseases: Vec<DiseaseType>,
    pests: Vec<PestType>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
        path: path.display().to_string(),
        source,
    })
}

impl JsonCatalog {
    pub fn load(data_dir: &Path) -> Result<Self, CatalogError> {
        Ok(Self {
            plants: read_json(&data_dir.join("plants.json"))?,
            diseases: read_json(&data_dir.join("diseases.json"))?,
            pests: read_json(&data_dir.join("pests.json"))?,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        plants: Vec<PlantType>,
        diseases: Vec<DiseaseType>,
        pests: Vec<PestType>,
    ) -> Self {
        Self {
            plants,
            diseases,
            pests,
        }
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.plants.len(), self.diseases.len(), self.pests.len())
    }
}

impl CatalogStore for JsonCatalog {
    fn resolve_plant(&self, label: &str) -> Option<PlantType> {
        let needle = label.to_lowercase();
        self.plants
            .iter()
            .find(|p| p.name.to_lowercase() == needle)
            .cloned()
    }

    fn resolve_disease(&self, label: &str) -> Option<DiseaseType> {
        let needle = label.to_lowercase();
        self.diseases
            .iter()
            .find(|d| {
                d.name.to_lowercase() == needle
                    || d.tag.as_deref().is_some_and(|t| t.to_lowercase() == needle)
            })
            .cloned()
    }

    fn resolve_pest(&self, label: &str) -> Option<PestType> {
        let needle = label.to_lowercase();
        self.pests
            .iter()
            .find(|p| p.name.to_lowercase() == needle)
            .cloned()
    }
}
