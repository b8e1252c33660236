use std::sync::{Arc, Mutex};

use tch::nn::ModuleT;
use tch::{CModule, Device, Kind, Tensor};

use crate::config::DetectionConfig;
use crate::detect::error::DetectError;

/// One ranked class prediction. `index` is the raw model class id, `label`
/// the configured name for it (or the stringified index when the label set
/// is shorter than the model head).
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub label: String,
    pub confidence: f32,
}

/// Common shape of the four detection capabilities: some input tensor in,
/// predictions sorted descending by confidence out. An empty list is a valid
/// outcome for detection-style models (nothing found in the image).
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &Tensor) -> Result<Vec<Prediction>, DetectError>;
}

fn label_for(labels: &[String], index: usize) -> String {
    labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| index.to_string())
}

/// Ranks a softmax probability vector against its label set.
pub fn rank_scores(scores: &[f32], labels: &[String]) -> Vec<Prediction> {
    let mut ranked: Vec<Prediction> = scores
        .iter()
        .enumerate()
        .map(|(index, &confidence)| Prediction {
            index,
            label: label_for(labels, index),
            confidence,
        })
        .collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked
}

/// Decodes detection rows of `[x1, y1, x2, y2, confidence, class]`, dropping
/// everything below the confidence threshold.
pub fn decode_detections(flat: &[f32], threshold: f32, labels: &[String]) -> Vec<Prediction> {
    let mut ranked = Vec::new();
    for row in flat.chunks_exact(6) {
        let confidence = row[4];
        if confidence < threshold {
            continue;
        }
        let index = row[5] as usize;
        ranked.push(Prediction {
            index,
            label: label_for(labels, index),
            confidence,
        });
    }
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked
}

fn load_module(path: &str) -> Result<Arc<Mutex<CModule>>, DetectError> {
    let device = Device::cuda_if_available();
    let module = CModule::load_on_device(path, device)?;
    Ok(Arc::new(Mutex::new(module)))
}

fn tensor_to_vec(tensor: &Tensor) -> Vec<f32> {
    let flat = tensor.to_kind(Kind::Float).view([-1]);
    let num_elements = flat.size()[0] as usize;
    let mut out = vec![0.0f32; num_elements];
    flat.copy_data(&mut out, num_elements);
    out
}

/// Closed-set softmax classifier backed by a TorchScript module.
#[derive(Clone)]
pub struct TorchClassifier {
    module: Arc<Mutex<CModule>>,
    labels: Vec<String>,
}

impl TorchClassifier {
    pub fn load(path: &str, labels: Vec<String>) -> Result<Self, DetectError> {
        Ok(Self {
            module: load_module(path)?,
            labels,
        })
    }
}

impl Classifier for TorchClassifier {
    fn classify(&self, input: &Tensor) -> Result<Vec<Prediction>, DetectError> {
        let output = self.module.lock().unwrap().forward_t(input, false);
        let probabilities = output.softmax(-1, Kind::Float);
        let scores = tensor_to_vec(&probabilities);
        Ok(rank_scores(&scores, &self.labels))
    }
}

/// Detection-head model (bounding boxes + class + confidence). The pipeline
/// only consumes the ranked classes; box geometry is decoded and discarded.
#[derive(Clone)]
pub struct TorchSpeciesDetector {
    module: Arc<Mutex<CModule>>,
    labels: Vec<String>,
    confidence_threshold: f32,
}

impl TorchSpeciesDetector {
    pub fn load(
        path: &str,
        labels: Vec<String>,
        confidence_threshold: f32,
    ) -> Result<Self, DetectError> {
        Ok(Self {
            module: load_module(path)?,
            labels,
            confidence_threshold,
        })
    }
}

impl Classifier for TorchSpeciesDetector {
    fn classify(&self, input: &Tensor) -> Result<Vec<Prediction>, DetectError> {
        let output = self.module.lock().unwrap().forward_t(input, false);
        let flat = tensor_to_vec(&output.view([-1, 6]));
        Ok(decode_detections(
            &flat,
            self.confidence_threshold,
            &self.labels,
        ))
    }
}

/// All four classifiers, loaded once at startup and shared read-only across
/// workers. Handed to the pipeline explicitly instead of living in globals.
#[derive(Clone)]
pub struct ClassifierRegistry {
    pub species: Arc<dyn Classifier>,
    pub disease: Arc<dyn Classifier>,
    pub pest: Arc<dyn Classifier>,
    pub drought: Arc<dyn Classifier>,
}

impl ClassifierRegistry {
    pub fn load(config: &DetectionConfig) -> Result<Self, DetectError> {
        log::info!("loading species detector from {}", config.species.model);
        let species = TorchSpeciesDetector::load(
            &config.model_path(&config.species.model),
            config.species.labels.clone(),
            config.species.confidence_threshold,
        )?;

        log::info!("loading disease classifier from {}", config.disease.model);
        let disease = TorchClassifier::load(
            &config.model_path(&config.disease.model),
            config.disease.labels.clone(),
        )?;

        log::info!("loading pest classifier from {}", config.pest.model);
        let pest = TorchClassifier::load(
            &config.model_path(&config.pest.model),
            config.pest.labels.clone(),
        )?;

        log::info!("loading drought forecaster from {}", config.drought.model);
        let drought = TorchClassifier::load(
            &config.model_path(&config.drought.model),
            crate::detect::drought::DROUGHT_LEVELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )?;

        Ok(Self {
            species: Arc::new(species),
            disease: Arc::new(disease),
            pest: Arc::new(pest),
            drought: Arc::new(drought),
        })
    }
}
