use std::{str::FromStr, time::Duration};
use tracing::warn;

use crate::orchestrator::VariationRotation;
use crate::pricing::PriceSchedule;
use crate::validator::DEFAULT_USABLE_CONFIDENCE;

pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub image_model: String,
    pub text_model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub usable_confidence: f64,
    pub max_variations: usize,
    pub rotation: VariationRotation,
    pub pricing: PriceSchedule,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            usable_confidence: DEFAULT_USABLE_CONFIDENCE,
            max_variations: 3,
            rotation: VariationRotation::default(),
            pricing: PriceSchedule::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub gemini: GeminiConfig,
    pub pipeline: PipelineSettings,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let defaults = PipelineSettings::default();

        let rotation = match lookup("NAIL_VARIATION_ROTATION") {
            Some(raw) => match serde_json::from_str::<VariationRotation>(&raw) {
                Ok(rotation) if !rotation.is_empty() => rotation,
                Ok(_) => {
                    warn!("NAIL_VARIATION_ROTATION is empty, using the default rotation");
                    defaults.rotation.clone()
                }
                Err(e) => {
                    warn!("Ignoring invalid NAIL_VARIATION_ROTATION: {}", e);
                    defaults.rotation.clone()
                }
            },
            None => defaults.rotation.clone(),
        };

        let usable_confidence = parsed(&lookup, "NAIL_USABLE_CONFIDENCE", defaults.usable_confidence);
        let usable_confidence = if (0.0..=1.0).contains(&usable_confidence) {
            usable_confidence
        } else {
            warn!("NAIL_USABLE_CONFIDENCE must be within [0, 1], using {}", DEFAULT_USABLE_CONFIDENCE);
            DEFAULT_USABLE_CONFIDENCE
        };

        Self {
            port: parsed(&lookup, "PORT", 8080),
            gemini: GeminiConfig {
                api_key: string("GEMINI_API_KEY", DEMO_KEY),
                base_url: string("GEMINI_API_BASE", "https://generativelanguage.googleapis.com/v1beta"),
                image_model: string("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image-preview"),
                text_model: string("GEMINI_TEXT_MODEL", "gemini-2.5-flash"),
                timeout: Duration::from_secs(parsed(&lookup, "GEMINI_TIMEOUT_SECS", 60)),
            },
            pipeline: PipelineSettings {
                usable_confidence,
                max_variations: parsed(&lookup, "NAIL_MAX_VARIATIONS", defaults.max_variations),
                rotation,
                pricing: PriceSchedule {
                    base_price: parsed(&lookup, "NAIL_BASE_PRICE", defaults.pricing.base_price),
                    element_fee: parsed(&lookup, "NAIL_ELEMENT_FEE", defaults.pricing.element_fee),
                    currency: string("NAIL_CURRENCY", &defaults.pricing.currency),
                },
            },
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        None => default,
    }
}
