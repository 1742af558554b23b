use std::sync::Arc;

use bytes::Bytes;
use futures::future::try_join_all;
use tracing::{info, warn};

use crate::analyzer::{strip_code_fence, RecommendationAnalyzer};
use crate::capabilities::{ReasoningCapability, SynthesisCapability, VisionCapability};
use crate::config::PipelineSettings;
use crate::error::{Capability, PipelineError};
use crate::models::{
    CustomizationDescriptor, DesignArtifact, Finger, MeasurementOutcome, Money,
    NailMeasurement, RawMeasurement, RecommendationReport, StylePreferences,
};
use crate::orchestrator::GenerationOrchestrator;
use crate::pricing::PriceSchedule;
use crate::prompt::{DesignBrief, PromptSynthesizer};
use crate::validator::MeasurementValidator;

/// The external services a pipeline is wired to.
#[derive(Clone)]
pub struct Capabilities {
    pub vision: Arc<dyn VisionCapability>,
    pub synthesis: Arc<dyn SynthesisCapability>,
    pub reasoning: Arc<dyn ReasoningCapability>,
}

/// Entry point for the booking layer: every design operation goes through here.
pub struct DesignPipeline {
    vision: Arc<dyn VisionCapability>,
    validator: MeasurementValidator,
    synthesizer: PromptSynthesizer,
    orchestrator: GenerationOrchestrator,
    analyzer: RecommendationAnalyzer,
    pricing: PriceSchedule,
}

impl DesignPipeline {
    pub fn new(settings: PipelineSettings, capabilities: Capabilities) -> Self {
        let validator = MeasurementValidator::new(settings.usable_confidence);
        let synthesizer = PromptSynthesizer::new(validator);
        Self {
            vision: capabilities.vision,
            validator,
            synthesizer,
            orchestrator: GenerationOrchestrator::new(
                capabilities.synthesis,
                synthesizer,
                settings.rotation,
                settings.max_variations,
            ),
            analyzer: RecommendationAnalyzer::new(capabilities.reasoning, validator),
            pricing: settings.pricing,
        }
    }

    /// Validity verdict plus whether the reading may feed generation.
    pub fn validate_measurement(&self, measurement: NailMeasurement) -> MeasurementOutcome {
        self.validator.assess(measurement)
    }

    /// Measures every photographed nail and validates the readings. Rejected
    /// readings are kept in the result for audit; capability failures abort
    /// the whole hand.
    pub async fn measure_hand(&self, photos: &[(Finger, Bytes)]) -> Result<Vec<MeasurementOutcome>, PipelineError> {
        let outcomes = try_join_all(photos.iter().map(|(finger, image)| self.measure_finger(finger, image))).await?;

        let usable = outcomes.iter().filter(|o| o.usable).count();
        info!("📏 Measured {} nails, {} usable for generation", outcomes.len(), usable);
        Ok(outcomes)
    }

    async fn measure_finger(&self, finger: &Finger, image: &Bytes) -> Result<MeasurementOutcome, PipelineError> {
        let raw = self.vision.measure(image, finger).await?;
        let fields: RawMeasurement = serde_json::from_str(strip_code_fence(&raw)).map_err(|e| {
            PipelineError::malformed(Capability::Vision, format!("{}: {}", finger, e))
        })?;

        let outcome = self.validator.assess(fields.into_measurement(finger.clone()));
        if let Some(reason) = outcome.verdict.reason {
            warn!("⚠️ {} measurement rejected: {}", finger, reason);
        }
        Ok(outcome)
    }

    pub fn synthesize_prompt(
        &self,
        measurements: &[NailMeasurement],
        preferences: &StylePreferences,
        custom_text: Option<&str>,
    ) -> DesignBrief {
        self.synthesizer.synthesize(measurements, preferences, custom_text)
    }

    pub async fn generate_design(&self, brief: &DesignBrief) -> Result<DesignArtifact, PipelineError> {
        self.orchestrator.generate(brief).await
    }

    pub async fn generate_variations(&self, brief: &DesignBrief, count: usize) -> Vec<DesignArtifact> {
        self.orchestrator.generate_variations(brief, count).await
    }

    pub async fn analyze_recommendations(
        &self,
        measurements: &[NailMeasurement],
        preferences: &StylePreferences,
    ) -> RecommendationReport {
        self.analyzer.analyze(measurements, preferences).await
    }

    pub fn calculate_price(&self, descriptor: &CustomizationDescriptor) -> Money {
        self.pricing.price(descriptor)
    }
}
