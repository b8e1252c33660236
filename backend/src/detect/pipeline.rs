use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use shared::{
    ClimateSeries, DetectionResult, DiseaseDetection, DroughtDetection, PestDetection,
    PlantDetection,
};

use crate::catalog::CatalogStore;
use crate::config::DetectionConfig;
use crate::detect::classifier::{ClassifierRegistry, Prediction};
use crate::detect::drought;
use crate::detect::error::DetectError;
use crate::detect::fetch::ImageFetcher;
use crate::detect::preprocess::{self, TensorSpec};

const NO_PLANT_MESSAGE: &str = "No plant detected in the image";

/// Fetch → preprocess → classify → resolve → assemble, one independent unit
/// of work per call. Classifier weights and catalogs are loaded once and
/// shared read-only; errors surface as failure envelopes, never as faults.
pub struct DetectionPipeline {
    fetcher: ImageFetcher,
    classifiers: ClassifierRegistry,
    catalog: Arc<dyn CatalogStore>,
    species_spec: TensorSpec,
    disease_spec: TensorSpec,
    pest_spec: TensorSpec,
    drought_window: usize,
}

impl DetectionPipeline {
    pub fn new(
        config: &DetectionConfig,
        classifiers: ClassifierRegistry,
        catalog: Arc<dyn CatalogStore>,
    ) -> Result<Self, DetectError> {
        let fetcher = ImageFetcher::new(Duration::from_secs(config.fetch.timeout_seconds))?;
        Ok(Self {
            fetcher,
            classifiers,
            catalog,
            species_spec: config.species_spec(),
            disease_spec: config.disease_spec(),
            pest_spec: config.pest_spec(),
            drought_window: config.drought.window_days,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        fetcher: ImageFetcher,
        classifiers: ClassifierRegistry,
        catalog: Arc<dyn CatalogStore>,
        species_spec: TensorSpec,
        disease_spec: TensorSpec,
        pest_spec: TensorSpec,
        drought_window: usize,
    ) -> Self {
        Self {
            fetcher,
            classifiers,
            catalog,
            species_spec,
            disease_spec,
            pest_spec,
            drought_window,
        }
    }

    pub async fn detect_species(&self, image_url: &str) -> DetectionResult {
        match self.fetcher.fetch(image_url).await {
            Ok(image) => self.species_from_image(&image, image_url),
            Err(err) => self.failure(err, image_url),
        }
    }

    pub async fn detect_disease(&self, image_url: &str) -> DetectionResult {
        match self.fetcher.fetch(image_url).await {
            Ok(image) => self.disease_from_image(&image, image_url),
            Err(err) => self.failure(err, image_url),
        }
    }

    pub async fn detect_pest(&self, image_url: &str) -> DetectionResult {
        match self.fetcher.fetch(image_url).await {
            Ok(image) => self.pest_from_image(&image, image_url),
            Err(err) => self.failure(err, image_url),
        }
    }

    pub fn forecast_drought(&self, series: &ClimateSeries) -> DetectionResult {
        match self.try_drought(series) {
            Ok(result) => result,
            Err(err) => {
                log::error!("drought forecast failed: {err}");
                DetectionResult::failure(err.to_string(), None)
            }
        }
    }

    pub(crate) fn species_from_image(&self, image: &DynamicImage, image_url: &str) -> DetectionResult {
        match self.try_species(image, image_url) {
            Ok(result) => result,
            Err(err) => self.failure(err, image_url),
        }
    }

    pub(crate) fn disease_from_image(&self, image: &DynamicImage, image_url: &str) -> DetectionResult {
        match self.try_disease(image, image_url) {
            Ok(result) => result,
            Err(err) => self.failure(err, image_url),
        }
    }

    pub(crate) fn pest_from_image(&self, image: &DynamicImage, image_url: &str) -> DetectionResult {
        match self.try_pest(image, image_url) {
            Ok(result) => result,
            Err(err) => self.failure(err, image_url),
        }
    }

    fn try_species(
        &self,
        image: &DynamicImage,
        image_url: &str,
    ) -> Result<DetectionResult, DetectError> {
        let tensor = preprocess::to_input_tensor(image, &self.species_spec)?;
        let predictions = self.classifiers.species.classify(&tensor)?;
        let Some(top) = predictions.first() else {
            // Distinct from fetch/preprocess failures: the model ran and saw
            // nothing it recognizes as a plant.
            return Ok(DetectionResult::failure(
                NO_PLANT_MESSAGE,
                Some(image_url.to_string()),
            ));
        };
        Ok(self.assemble_plant(top, image_url))
    }

    fn try_disease(
        &self,
        image: &DynamicImage,
        image_url: &str,
    ) -> Result<DetectionResult, DetectError> {
        let tensor = preprocess::to_input_tensor(image, &self.disease_spec)?;
        let predictions = self.classifiers.disease.classify(&tensor)?;
        let top = first_prediction(&predictions, "disease")?;
        Ok(self.assemble_disease(top, image_url))
    }

    fn try_pest(
        &self,
        image: &DynamicImage,
        image_url: &str,
    ) -> Result<DetectionResult, DetectError> {
        let tensor = preprocess::to_input_tensor(image, &self.pest_spec)?;
        let predictions = self.classifiers.pest.classify(&tensor)?;
        let top = first_prediction(&predictions, "pest")?;
        Ok(self.assemble_pest(top, image_url))
    }

    fn try_drought(&self, series: &ClimateSeries) -> Result<DetectionResult, DetectError> {
        let rows = drought::window_series(series, self.drought_window);
        let tensor = drought::to_input_tensor(&rows)?;
        let predictions = self.classifiers.drought.classify(&tensor)?;
        let top = first_prediction(&predictions, "drought")?;
        Ok(DetectionResult::Drought(DroughtDetection {
            success: true,
            level: top.index as u8,
            label: drought::level_label(top.index).to_string(),
            trend: drought::trend_for_level(top.index),
            confidence: top.confidence,
        }))
    }

    fn assemble_plant(&self, top: &Prediction, image_url: &str) -> DetectionResult {
        let detection = match self.catalog.resolve_plant(&top.label) {
            Some(plant) => PlantDetection {
                success: true,
                plant_id: Some(plant.id),
                name: plant.name,
                scientific_name: Some(plant.scientific_name),
                common_diseases: plant.common_diseases,
                confidence: top.confidence,
                image_url: image_url.to_string(),
            },
            // Recognized by the model but unknown to the catalog: still a
            // success, with the raw label preserved.
            None => PlantDetection {
                success: true,
                plant_id: None,
                name: top.label.clone(),
                scientific_name: None,
                common_diseases: Vec::new(),
                confidence: top.confidence,
                image_url: image_url.to_string(),
            },
        };
        DetectionResult::Plant(detection)
    }

    fn assemble_disease(&self, top: &Prediction, image_url: &str) -> DetectionResult {
        let detection = match self.catalog.resolve_disease(&top.label) {
            Some(disease) => DiseaseDetection {
                success: true,
                disease_id: Some(disease.id),
                name: disease.name,
                arabic_name: disease.arabic_name,
                description: Some(disease.description),
                treatment: Some(disease.treatment),
                severity: Some(disease.severity),
                confidence: top.confidence,
                image_url: image_url.to_string(),
            },
            None => DiseaseDetection {
                success: true,
                disease_id: None,
                name: top.label.clone(),
                arabic_name: None,
                description: None,
                treatment: None,
                severity: None,
                confidence: top.confidence,
                image_url: image_url.to_string(),
            },
        };
        DetectionResult::Disease(detection)
    }

    fn assemble_pest(&self, top: &Prediction, image_url: &str) -> DetectionResult {
        let detection = match self.catalog.resolve_pest(&top.label) {
            Some(pest) => PestDetection {
                success: true,
                pest_id: Some(pest.id),
                name: pest.name,
                description: Some(pest.description),
                treatment: Some(pest.treatment),
                severity: Some(pest.severity),
                confidence: top.confidence,
                image_url: image_url.to_string(),
            },
            None => PestDetection {
                success: true,
                pest_id: None,
                name: top.label.clone(),
                description: None,
                treatment: None,
                severity: None,
                confidence: top.confidence,
                image_url: image_url.to_string(),
            },
        };
        DetectionResult::Pest(detection)
    }

    fn failure(&self, err: DetectError, image_url: &str) -> DetectionResult {
        log::error!("detection failed for {image_url}: {err}");
        DetectionResult::failure(err.to_string(), Some(image_url.to_string()))
    }
}

fn first_prediction<'a>(
    predictions: &'a [Prediction],
    kind: &str,
) -> Result<&'a Prediction, DetectError> {
    predictions
        .first()
        .ok_or_else(|| DetectError::Classify(format!("{kind} model returned no predictions")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DiseaseType, JsonCatalog, PestType, PlantType};
    use crate::detect::classifier::Classifier;
    use shared::Severity;
    use tch::Tensor;
    use uuid::Uuid;

    struct FixedClassifier(Vec<Prediction>);

    impl Classifier for FixedClassifier {
        fn classify(&self, _input: &Tensor) -> Result<Vec<Prediction>, DetectError> {
            Ok(self.0.clone())
        }
    }

    fn prediction(index: usize, label: &str, confidence: f32) -> Prediction {
        Prediction {
            index,
            label: label.into(),
            confidence,
        }
    }

    fn registry(
        species: Vec<Prediction>,
        disease: Vec<Prediction>,
        pest: Vec<Prediction>,
        drought: Vec<Prediction>,
    ) -> ClassifierRegistry {
        ClassifierRegistry {
            species: Arc::new(FixedClassifier(species)),
            disease: Arc::new(FixedClassifier(disease)),
            pest: Arc::new(FixedClassifier(pest)),
            drought: Arc::new(FixedClassifier(drought)),
        }
    }

    fn tomato_id() -> Uuid {
        "499a0376-4f96-40ca-a20c-e0851d55afd6".parse().unwrap()
    }

    fn catalog() -> Arc<JsonCatalog> {
        Arc::new(JsonCatalog::from_parts(
            vec![PlantType {
                id: tomato_id(),
                name: "Tomato".into(),
                scientific_name: "Solanum lycopersicum".into(),
                common_diseases: vec!["Early Blight".into(), "Late Blight".into()],
            }],
            vec![DiseaseType {
                id: Uuid::new_v4(),
                name: "Tomato Early Blight".into(),
                arabic_name: None,
                tag: Some("tomato_early_blight".into()),
                description: "Concentric leaf spots.".into(),
                treatment: "Fungicide.".into(),
                plant_types: vec![tomato_id()],
                severity: Severity::High,
            }],
            vec![PestType {
                id: Uuid::new_v4(),
                name: "Aphid".into(),
                description: "Sap-sucking insect.".into(),
                treatment: "Insecticidal soap.".into(),
                plant_types: vec![tomato_id()],
                severity: Severity::Medium,
            }],
        ))
    }

    fn pipeline(registry: ClassifierRegistry) -> DetectionPipeline {
        let spec = |size: u32| TensorSpec {
            width: size,
            height: size,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        };
        DetectionPipeline {
            fetcher: ImageFetcher::new(Duration::from_secs(2)).unwrap(),
            classifiers: registry,
            catalog: catalog(),
            species_spec: spec(640),
            disease_spec: spec(224),
            pest_spec: spec(224),
            drought_window: 30,
        }
    }

    fn leaf() -> DynamicImage {
        DynamicImage::new_rgb8(64, 64)
    }

    #[test]
    fn species_hit_carries_catalog_identity() {
        let pipeline = pipeline(registry(
            vec![prediction(0, "Tomato", 0.93)],
            vec![],
            vec![],
            vec![],
        ));
        let result = pipeline.species_from_image(&leaf(), "http://img/leaf.jpg");
        let DetectionResult::Plant(plant) = result else {
            panic!("expected plant detection");
        };
        assert!(plant.success);
        assert_eq!(plant.plant_id, Some(tomato_id()));
        assert_eq!(plant.name, "Tomato");
        assert_eq!(plant.scientific_name.as_deref(), Some("Solanum lycopersicum"));
        assert!((plant.confidence - 0.93).abs() < 1e-6);
        assert_eq!(plant.image_url, "http://img/leaf.jpg");
    }

    #[test]
    fn species_miss_keeps_raw_label_as_success() {
        let pipeline = pipeline(registry(
            vec![prediction(7, "Cactus", 0.6)],
            vec![],
            vec![],
            vec![],
        ));
        let result = pipeline.species_from_image(&leaf(), "http://img/leaf.jpg");
        let DetectionResult::Plant(plant) = result else {
            panic!("expected plant detection");
        };
        assert!(plant.success);
        assert_eq!(plant.plant_id, None);
        assert_eq!(plant.name, "Cactus");
        assert!(plant.common_diseases.is_empty());
    }

    #[test]
    fn empty_species_output_is_a_no_plant_failure() {
        let pipeline = pipeline(registry(vec![], vec![], vec![], vec![]));
        let result = pipeline.species_from_image(&leaf(), "http://img/leaf.jpg");
        let DetectionResult::Failure(failure) = result else {
            panic!("expected failure envelope");
        };
        assert!(!failure.success);
        assert_eq!(failure.message, NO_PLANT_MESSAGE);
    }

    #[test]
    fn disease_resolves_by_classifier_tag() {
        let pipeline = pipeline(registry(
            vec![],
            vec![prediction(0, "tomato_early_blight", 0.88)],
            vec![],
            vec![],
        ));
        let result = pipeline.disease_from_image(&leaf(), "http://img/leaf.jpg");
        let DetectionResult::Disease(disease) = result else {
            panic!("expected disease detection");
        };
        assert!(disease.success);
        assert!(disease.disease_id.is_some());
        assert_eq!(disease.name, "Tomato Early Blight");
        assert_eq!(disease.severity, Some(Severity::High));
    }

    #[test]
    fn disease_miss_is_success_with_null_identity() {
        let pipeline = pipeline(registry(
            vec![],
            vec![prediction(3, "unknown_blight", 0.7)],
            vec![],
            vec![],
        ));
        let result = pipeline.disease_from_image(&leaf(), "http://img/leaf.jpg");
        let DetectionResult::Disease(disease) = result else {
            panic!("expected disease detection");
        };
        assert!(disease.success);
        assert_eq!(disease.disease_id, None);
        assert_eq!(disease.name, "unknown_blight");
        assert!((disease.confidence - 0.7).abs() < 1e-6);
        assert_eq!(disease.treatment, None);
    }

    #[test]
    fn pest_hit_carries_treatment_and_severity() {
        let pipeline = pipeline(registry(
            vec![],
            vec![],
            vec![prediction(0, "aphid", 0.81)],
            vec![],
        ));
        let result = pipeline.pest_from_image(&leaf(), "http://img/leaf.jpg");
        let DetectionResult::Pest(pest) = result else {
            panic!("expected pest detection");
        };
        assert!(pest.success);
        assert_eq!(pest.name, "Aphid");
        assert_eq!(pest.severity, Some(Severity::Medium));
    }

    #[test]
    fn grayscale_input_fails_at_preprocess_stage() {
        let pipeline = pipeline(registry(
            vec![prediction(0, "Tomato", 0.9)],
            vec![],
            vec![],
            vec![],
        ));
        let gray = DynamicImage::new_luma8(32, 32);
        let result = pipeline.species_from_image(&gray, "http://img/gray.jpg");
        let DetectionResult::Failure(failure) = result else {
            panic!("expected failure envelope");
        };
        assert!(failure.message.contains("preprocess"));
        assert_eq!(failure.image_url.as_deref(), Some("http://img/gray.jpg"));
    }

    #[test]
    fn drought_forecast_reports_level_and_trend() {
        let pipeline = pipeline(registry(
            vec![],
            vec![],
            vec![],
            vec![prediction(4, "Extreme Drought", 0.77)],
        ));
        let series = ClimateSeries {
            temperature: vec![31.0; 10],
            humidity: vec![20.0; 10],
            rainfall: vec![0.0; 10],
            wind_speed: vec![12.0; 10],
            soil_moisture: vec![0.1; 10],
            evapotranspiration: vec![5.0; 10],
        };
        let result = pipeline.forecast_drought(&series);
        let DetectionResult::Drought(drought) = result else {
            panic!("expected drought detection");
        };
        assert!(drought.success);
        assert_eq!(drought.level, 4);
        assert_eq!(drought.label, "Extreme Drought");
        assert_eq!(drought.trend, shared::DroughtTrend::Increasing);
    }

    #[test]
    fn detection_is_idempotent_for_fixed_model_output() {
        let pipeline = pipeline(registry(
            vec![],
            vec![prediction(0, "tomato_early_blight", 0.88)],
            vec![],
            vec![],
        ));
        let first = pipeline.disease_from_image(&leaf(), "http://img/leaf.jpg");
        let second = pipeline.disease_from_image(&leaf(), "http://img/leaf.jpg");
        let (DetectionResult::Disease(a), DetectionResult::Disease(b)) = (first, second) else {
            panic!("expected disease detections");
        };
        assert_eq!(a.disease_id, b.disease_id);
        assert_eq!(a.name, b.name);
    }

    #[actix_web::test]
    async fn unreachable_url_yields_fetch_failure() {
        let pipeline = pipeline(registry(
            vec![prediction(0, "Tomato", 0.9)],
            vec![],
            vec![],
            vec![],
        ));
        // Discard port: connection refused without touching the network.
        let result = pipeline.detect_species("http://127.0.0.1:9/leaf.jpg").await;
        let DetectionResult::Failure(failure) = result else {
            panic!("expected failure envelope");
        };
        assert!(failure.message.contains("fetch"));
        assert_eq!(
            failure.image_url.as_deref(),
            Some("http://127.0.0.1:9/leaf.jpg")
        );
    }
}
