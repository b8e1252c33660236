use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Severity grade shared by disease and pest catalog entries.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Direction of drought development derived from the predicted level bucket.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DroughtTrend {
    Decreasing,
    Stable,
    Increasing,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    pub image_url: String,
}

/// Daily climate observations, one value per day per channel.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClimateSeries {
    pub temperature: Vec<f32>,
    pub humidity: Vec<f32>,
    pub rainfall: Vec<f32>,
    pub wind_speed: Vec<f32>,
    pub soil_moisture: Vec<f32>,
    pub evapotranspiration: Vec<f32>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlantDetection {
    pub success: bool,
    pub plant_id: Option<Uuid>,
    pub name: String,
    pub scientific_name: Option<String>,
    pub common_diseases: Vec<String>,
    pub confidence: f32,
    pub image_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseDetection {
    pub success: bool,
    pub disease_id: Option<Uuid>,
    pub name: String,
    pub arabic_name: Option<String>,
    pub description: Option<String>,
    pub treatment: Option<String>,
    pub severity: Option<Severity>,
    pub confidence: f32,
    pub image_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PestDetection {
    pub success: bool,
    pub pest_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub treatment: Option<String>,
    pub severity: Option<Severity>,
    pub confidence: f32,
    pub image_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DroughtDetection {
    pub success: bool,
    pub level: u8,
    pub label: String,
    pub trend: DroughtTrend,
    pub confidence: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFailure {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Envelope returned by every detection endpoint. Serializes flat, matching
/// the shapes the report layer stores on its detection snapshots.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum DetectionResult {
    Drought(DroughtDetection),
    Plant(PlantDetection),
    Disease(DiseaseDetection),
    Pest(PestDetection),
    Failure(DetectionFailure),
}

impl DetectionResult {
    pub fn failure(message: impl Into<String>, image_url: Option<String>) -> Self {
        DetectionResult::Failure(DetectionFailure {
            success: false,
            message: message.into(),
            image_url,
        })
    }

    pub fn is_success(&self) -> bool {
        match self {
            DetectionResult::Drought(d) => d.success,
            DetectionResult::Plant(p) => p.success,
            DetectionResult::Disease(d) => d.success,
            DetectionResult::Pest(p) => p.success,
            DetectionResult::Failure(_) => false,
        }
    }
}
