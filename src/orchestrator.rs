use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Serialize, Deserialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::capabilities::SynthesisCapability;
use crate::error::{Capability, PipelineError};
use crate::models::{
    DesignArtifact, Intensity, PatternPreference, StyleAttributes, StyleHint, VariationOverride,
};
use crate::prompt::{DesignBrief, PromptSynthesizer};

/// Intensity/pattern overrides cycled through when several designs are
/// requested at once.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct VariationRotation(Vec<VariationOverride>);

impl Default for VariationRotation {
    fn default() -> Self {
        Self(vec![
            VariationOverride { intensity: Intensity::Subtle, pattern_preference: PatternPreference::Solid },
            VariationOverride { intensity: Intensity::Moderate, pattern_preference: PatternPreference::Gradient },
            VariationOverride { intensity: Intensity::Bold, pattern_preference: PatternPreference::Pattern },
        ])
    }
}

impl VariationRotation {
    pub fn entries(&self) -> &[VariationOverride] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct GenerationOrchestrator {
    synthesis: Arc<dyn SynthesisCapability>,
    synthesizer: PromptSynthesizer,
    rotation: VariationRotation,
    max_variations: usize,
}

impl GenerationOrchestrator {
    pub fn new(
        synthesis: Arc<dyn SynthesisCapability>,
        synthesizer: PromptSynthesizer,
        rotation: VariationRotation,
        max_variations: usize,
    ) -> Self {
        Self { synthesis, synthesizer, rotation, max_variations }
    }

    /// Number of variations actually attempted for a requested count.
    pub fn variation_slots(&self, requested: usize) -> usize {
        requested.min(self.max_variations).min(self.rotation.len())
    }

    /// Single generation. Capability failures are surfaced, never retried here.
    pub async fn generate(&self, brief: &DesignBrief) -> Result<DesignArtifact, PipelineError> {
        self.render(brief, None).await
    }

    /// Generates one design per rotation entry. Failed slots are logged and
    /// dropped; the rest are returned in rotation order, possibly none.
    pub async fn generate_variations(&self, brief: &DesignBrief, count: usize) -> Vec<DesignArtifact> {
        let slots = self.variation_slots(count);
        if slots == 0 {
            return Vec::new();
        }

        let briefs: Vec<DesignBrief> = self.rotation.entries()[..slots]
            .iter()
            .map(|variation| {
                let preferences = brief.preferences().with_variation(variation);
                self.synthesizer.synthesize(brief.measurements(), &preferences, brief.custom_text())
            })
            .collect();

        info!("🎨 Generating {} design variations", slots);
        let results = join_all(
            briefs.iter().enumerate().map(|(slot, b)| self.render(b, Some(slot))),
        )
        .await;

        let artifacts: Vec<DesignArtifact> = results
            .into_iter()
            .enumerate()
            .filter_map(|(slot, result)| match result {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    warn!("⚠️ Variation {} failed and was skipped: {}", slot, e);
                    None
                }
            })
            .collect();

        info!("✅ {}/{} variations generated", artifacts.len(), slots);
        artifacts
    }

    async fn render(&self, brief: &DesignBrief, variation: Option<usize>) -> Result<DesignArtifact, PipelineError> {
        let preferences = brief.preferences();
        let hint = StyleHint::for_intensity(preferences.intensity);

        let reply = self
            .synthesis
            .synthesize(&brief.text, hint)
            .await
            .map_err(PipelineError::GenerationFailed)?;

        let image_ref = reply
            .image_ref
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                let detail = if reply.texts.is_empty() {
                    "no image in response".to_string()
                } else {
                    format!("no image in response: {}", reply.texts.join(" "))
                };
                PipelineError::malformed(Capability::Synthesis, detail)
            })?;

        Ok(DesignArtifact {
            id: Uuid::new_v4(),
            image_ref,
            brief: brief.text.clone(),
            style_hint: hint,
            style: StyleAttributes::from(preferences),
            variation,
            created_at: Utc::now(),
        })
    }
}
