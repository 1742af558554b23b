use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::capabilities::{ReasoningCapability, ReasoningRequest};
use crate::error::{Capability, PipelineError};
use crate::models::{NailMeasurement, RecommendationReport, StylePreferences};
use crate::prompt::{complexity_phrase, intensity_phrase};
use crate::validator::MeasurementValidator;

pub const REPORT_KEYS: [&str; 4] = ["recommendations", "colorSuggestions", "styleSuggestions", "warnings"];

const INSTRUCTIONS: &str = "You are an expert nail technician and color consultant. \
Analyze the nail measurements and style preferences and respond with a single JSON object \
with exactly these keys: \"recommendations\", \"colorSuggestions\", \"styleSuggestions\", \"warnings\". \
Each value must be an array of short strings. Use \"warnings\" for practical concerns such as \
nail length versus lifestyle. Return JSON only.";

pub struct RecommendationAnalyzer {
    reasoning: Arc<dyn ReasoningCapability>,
    validator: MeasurementValidator,
}

impl RecommendationAnalyzer {
    pub fn new(reasoning: Arc<dyn ReasoningCapability>, validator: MeasurementValidator) -> Self {
        Self { reasoning, validator }
    }

    /// Never fails: an unavailable or unreadable analysis degrades to
    /// [`fallback_report`].
    pub async fn analyze(&self, measurements: &[NailMeasurement], preferences: &StylePreferences) -> RecommendationReport {
        let request = self.build_request(measurements, preferences);
        match self.reasoning.reason(&request).await {
            Ok(raw) => match normalize_report(&raw) {
                Ok(report) => {
                    info!(
                        "✅ Recommendation analysis returned {} recommendations, {} warnings",
                        report.recommendations.len(),
                        report.warnings.len()
                    );
                    report
                }
                Err(e) => {
                    warn!("⚠️ {}; using fallback recommendations", e);
                    fallback_report(preferences)
                }
            },
            Err(e) => {
                warn!("⚠️ Recommendation analysis unavailable ({}); using fallback recommendations", e);
                fallback_report(preferences)
            }
        }
    }

    pub fn build_request(&self, measurements: &[NailMeasurement], p: &StylePreferences) -> ReasoningRequest {
        let usable = self.validator.usable(measurements);
        let mut lines = Vec::new();

        if usable.is_empty() {
            lines.push("Nail measurements: none available".to_string());
        } else {
            lines.push("Nail measurements:".to_string());
            for (m, shape) in &usable {
                lines.push(format!(
                    "- {}: {} shape, {:.1}mm wide, {:.1}mm long, {:.0}% confidence",
                    m.finger_type.display_name(),
                    shape.as_str(),
                    m.nail_width,
                    m.nail_length,
                    m.confidence * 100.0
                ));
            }
        }

        lines.push("Style preferences:".to_string());
        push_list(&mut lines, "Colors", &p.colors);
        push_list(&mut lines, "Styles", &p.styles);
        push_list(&mut lines, "Occasions", &p.occasions);
        push_opt(&mut lines, "Complexity", p.complexity.map(|c| c.as_str()));
        push_opt(&mut lines, "Intensity", p.intensity.map(|i| i.as_str()));
        push_opt(&mut lines, "Pattern", p.pattern_preference.map(|x| x.as_str()));
        push_opt(&mut lines, "Color harmony", p.color_harmony.map(|h| h.as_str()));
        push_opt(&mut lines, "Skin tone", p.skin_tone.as_deref());
        push_opt(&mut lines, "Lifestyle", p.lifestyle.as_deref());
        push_list(&mut lines, "Personality", &p.personality_traits);
        push_list(&mut lines, "Finishes", &p.finish_types);
        push_opt(&mut lines, "Notes", p.notes.as_deref());

        ReasoningRequest { instructions: INSTRUCTIONS.to_string(), prompt: lines.join("\n") }
    }
}

fn push_list(lines: &mut Vec<String>, label: &str, values: &[String]) {
    let values: Vec<&str> = values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
    if !values.is_empty() {
        lines.push(format!("- {label}: {}", values.join(", ")));
    }
}

fn push_opt(lines: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        lines.push(format!("- {label}: {value}"));
    }
}

/// Parses the reasoning reply into a report. Missing or ill-typed keys become
/// empty lists; anything that is not a JSON object is malformed.
pub fn normalize_report(raw: &str) -> Result<RecommendationReport, PipelineError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| PipelineError::malformed(Capability::Reasoning, format!("invalid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(PipelineError::malformed(Capability::Reasoning, "expected a JSON object"));
    };

    for key in map.keys().filter(|k| !REPORT_KEYS.contains(&k.as_str())) {
        debug!("ignoring unexpected recommendation key '{}'", key);
    }

    let list = |key: &str| -> Vec<String> {
        match map.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(other) => {
                warn!("recommendation key '{}' is not a list: {}", key, other);
                Vec::new()
            }
            None => {
                debug!("recommendation key '{}' missing", key);
                Vec::new()
            }
        }
    };

    Ok(RecommendationReport {
        recommendations: list(REPORT_KEYS[0]),
        color_suggestions: list(REPORT_KEYS[1]),
        style_suggestions: list(REPORT_KEYS[2]),
        warnings: list(REPORT_KEYS[3]),
    })
}

pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Deterministic stand-in used whenever the reasoning capability cannot help.
pub fn fallback_report(p: &StylePreferences) -> RecommendationReport {
    let colors: Vec<&str> = p.colors.iter().map(|c| c.trim()).filter(|c| !c.is_empty()).collect();
    let styles: Vec<&str> = p.styles.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    let occasion = p.occasions.iter().map(|o| o.trim()).find(|o| !o.is_empty());

    let mut recommendations = vec![match p.complexity {
        Some(c) => format!("Keep the design {} to match your preferred complexity", complexity_phrase(c)),
        None => "Start with a balanced design and adjust the level of detail after a first fitting".to_string(),
    }];
    if let Some(intensity) = p.intensity {
        recommendations.push(format!("Aim for a look that is {}", intensity_phrase(intensity)));
    }
    recommendations.push(match occasion {
        Some(o) => format!("Plan your appointment a few days before your {o} so the set looks fresh"),
        None => "Book a short consultation so your technician can fine-tune the design to your nail shape".to_string(),
    });

    let mut color_suggestions = vec![if colors.is_empty() {
        "Start from versatile neutrals such as nude, blush and soft white".to_string()
    } else {
        format!("Build the palette around {}", colors.join(", "))
    }];
    if let Some(harmony) = p.color_harmony {
        color_suggestions.push(format!("Keep accents within a {} color scheme", harmony.as_str()));
    }

    let style_suggestions = vec![if styles.is_empty() {
        "A classic manicure with a single accent nail is an easy starting point".to_string()
    } else {
        format!("Lean into {} elements across the set", styles.join(", "))
    }];

    RecommendationReport { recommendations, color_suggestions, style_suggestions, warnings: Vec::new() }
}
