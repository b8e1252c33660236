use serde::{Deserialize, Serialize};

use crate::detect::preprocess::TensorSpec;

/// Service configuration: model locations, per-classifier input specs and
/// label sets, drought window, fetch timeout. Loaded once at startup.
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub version: f32,
    pub models_dir: String,
    pub fetch: FetchConfig,
    pub species: SpeciesConfig,
    pub disease: ClassifierConfig,
    pub pest: ClassifierConfig,
    pub drought: DroughtConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub model: String,
    pub input_size: [u32; 2],
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub confidence_threshold: f32,
    pub labels: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub model: String,
    pub input_size: [u32; 2],
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub labels: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DroughtConfig {
    pub model: String,
    pub window_days: usize,
}

impl DetectionConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = if let Ok(path) = std::env::var("DETECTION_CONFIG") {
            path
        } else {
            let manifest_dir =
                std::env::var("CARGO_MANIFEST_DIR").map_err(|_| "Failed to get manifest directory")?;
            format!("{}/../config/detection.yaml", manifest_dir)
        };
        let config_str = std::fs::read_to_string(config_path)?;
        let config: DetectionConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }

    pub fn model_path(&self, file: &str) -> String {
        format!("{}/{}", self.models_dir, file)
    }

    pub fn species_spec(&self) -> TensorSpec {
        TensorSpec {
            width: self.species.input_size[0],
            height: self.species.input_size[1],
            mean: self.species.mean,
            std: self.species.std,
        }
    }

    pub fn disease_spec(&self) -> TensorSpec {
        TensorSpec {
            width: self.disease.input_size[0],
            height: self.disease.input_size[1],
            mean: self.disease.mean,
            std: self.disease.std,
        }
    }

    pub fn pest_spec(&self) -> TensorSpec {
        TensorSpec {
            width: self.pest.input_size[0],
            height: self.pest.input_size[1],
            mean: self.pest.mean,
            std: self.pest.std,
        }
    }
}
