use serde::{Serialize, Deserialize};
use serde_with::{skip_serializing_none, DeserializeFromStr, SerializeDisplay};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use std::{convert::Infallible, fmt, str::FromStr};

use crate::error::ValidationError;

// --- Measurements ---

/// Finger position a nail photo was taken of. Anything outside the ten
/// standard positions is kept verbatim as a free-form label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Finger {
    LeftThumb,
    LeftIndex,
    LeftMiddle,
    LeftRing,
    LeftPinky,
    RightThumb,
    RightIndex,
    RightMiddle,
    RightRing,
    RightPinky,
    Other(String),
}

impl Finger {
    pub fn slug(&self) -> &str {
        match self {
            Finger::LeftThumb => "left_thumb",
            Finger::LeftIndex => "left_index",
            Finger::LeftMiddle => "left_middle",
            Finger::LeftRing => "left_ring",
            Finger::LeftPinky => "left_pinky",
            Finger::RightThumb => "right_thumb",
            Finger::RightIndex => "right_index",
            Finger::RightMiddle => "right_middle",
            Finger::RightRing => "right_ring",
            Finger::RightPinky => "right_pinky",
            Finger::Other(label) => label,
        }
    }

    /// Human-readable name used inside design briefs ("Left thumb").
    pub fn display_name(&self) -> String {
        match self {
            Finger::Other(label) => label.clone(),
            _ => {
                let slug = self.slug().replace('_', " ");
                let mut chars = slug.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => slug,
                }
            }
        }
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Finger {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Ok(match normalized.as_str() {
            "left_thumb" => Finger::LeftThumb,
            "left_index" => Finger::LeftIndex,
            "left_middle" => Finger::LeftMiddle,
            "left_ring" => Finger::LeftRing,
            "left_pinky" => Finger::LeftPinky,
            "right_thumb" => Finger::RightThumb,
            "right_index" => Finger::RightIndex,
            "right_middle" => Finger::RightMiddle,
            "right_ring" => Finger::RightRing,
            "right_pinky" => Finger::RightPinky,
            _ => Finger::Other(s.trim().to_string()),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShapeCategory {
    Oval,
    Square,
    Round,
    Almond,
    Coffin,
    Stiletto,
    Unknown,
}

impl ShapeCategory {
    pub const ALL: [ShapeCategory; 7] = [
        ShapeCategory::Oval,
        ShapeCategory::Square,
        ShapeCategory::Round,
        ShapeCategory::Almond,
        ShapeCategory::Coffin,
        ShapeCategory::Stiletto,
        ShapeCategory::Unknown,
    ];

    /// Case-insensitive lookup; `None` for anything outside the known set.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|shape| shape.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeCategory::Oval => "oval",
            ShapeCategory::Square => "square",
            ShapeCategory::Round => "round",
            ShapeCategory::Almond => "almond",
            ShapeCategory::Coffin => "coffin",
            ShapeCategory::Stiletto => "stiletto",
            ShapeCategory::Unknown => "unknown",
        }
    }
}

/// One nail reading as reported by the vision service. Lengths are in millimetres.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NailMeasurement {
    #[serde(alias = "fingerType")]
    pub finger_type: Finger,
    #[serde(alias = "nailWidth")]
    pub nail_width: f64,
    #[serde(alias = "nailLength")]
    pub nail_length: f64,
    #[serde(default, alias = "nailArea")]
    pub nail_area: Option<f64>,
    #[serde(default, alias = "nailCurvature")]
    pub nail_curvature: Option<f64>,
    #[serde(alias = "shapeCategory")]
    pub shape_category: String,
    pub confidence: f64,
}

impl NailMeasurement {
    /// Reported area, or the ellipse approximation of width × length when the
    /// vision service did not report one.
    pub fn area(&self) -> f64 {
        self.nail_area
            .unwrap_or(std::f64::consts::FRAC_PI_4 * self.nail_width * self.nail_length)
    }
}

/// Raw field set the vision capability is asked to return for a single nail.
#[derive(Debug, Deserialize, Clone)]
pub struct RawMeasurement {
    #[serde(alias = "nailWidth", alias = "width")]
    pub nail_width: f64,
    #[serde(alias = "nailLength", alias = "length")]
    pub nail_length: f64,
    #[serde(default, alias = "nailArea", alias = "area")]
    pub nail_area: Option<f64>,
    #[serde(default, alias = "nailCurvature", alias = "curvature")]
    pub nail_curvature: Option<f64>,
    #[serde(alias = "shapeCategory", alias = "shape")]
    pub shape_category: String,
    pub confidence: f64,
}

impl RawMeasurement {
    pub fn into_measurement(self, finger: Finger) -> NailMeasurement {
        NailMeasurement {
            finger_type: finger,
            nail_width: self.nail_width,
            nail_length: self.nail_length,
            nail_area: self.nail_area,
            nail_curvature: self.nail_curvature,
            shape_category: self.shape_category,
            confidence: self.confidence,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MeasurementVerdict {
    pub accepted: bool,
    pub reason: Option<ValidationError>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MeasurementOutcome {
    pub measurement: NailMeasurement,
    pub verdict: MeasurementVerdict,
    pub usable: bool,
}

// --- Style preferences ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity { Simple, Medium, Complex }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Budget { Low, Medium, High }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Intensity { Subtle, Moderate, Bold, Dramatic }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatternPreference { Solid, Gradient, Pattern, Mixed }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorHarmony { Monochromatic, Complementary, Triadic, Analogous }

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Subtle => "subtle",
            Intensity::Moderate => "moderate",
            Intensity::Bold => "bold",
            Intensity::Dramatic => "dramatic",
        }
    }
}

impl PatternPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternPreference::Solid => "solid",
            PatternPreference::Gradient => "gradient",
            PatternPreference::Pattern => "pattern",
            PatternPreference::Mixed => "mixed",
        }
    }
}

impl ColorHarmony {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorHarmony::Monochromatic => "monochromatic",
            ColorHarmony::Complementary => "complementary",
            ColorHarmony::Triadic => "triadic",
            ColorHarmony::Analogous => "analogous",
        }
    }
}

/// A customer's design preferences. Absent fields stay absent; nothing here
/// is ever filled with a guessed default.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StylePreferences {
    pub colors: Vec<String>,
    pub styles: Vec<String>,
    pub occasions: Vec<String>,
    pub complexity: Option<Complexity>,
    pub budget: Option<Budget>,
    pub intensity: Option<Intensity>,
    #[serde(alias = "patternPreference")]
    pub pattern_preference: Option<PatternPreference>,
    #[serde(alias = "colorHarmony")]
    pub color_harmony: Option<ColorHarmony>,
    #[serde(alias = "skinTone")]
    pub skin_tone: Option<String>,
    pub lifestyle: Option<String>,
    #[serde(alias = "personalityTraits")]
    pub personality_traits: Vec<String>,
    pub inspiration: Option<String>,
    #[serde(alias = "finishTypes")]
    pub finish_types: Vec<String>,
    pub notes: Option<String>,
}

impl StylePreferences {
    /// Copy of these preferences with one rotation entry applied.
    pub fn with_variation(&self, variation: &VariationOverride) -> Self {
        Self {
            intensity: Some(variation.intensity),
            pattern_preference: Some(variation.pattern_preference),
            ..self.clone()
        }
    }
}

/// Intensity/pattern pair substituted into the base preferences for one variation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct VariationOverride {
    pub intensity: Intensity,
    pub pattern_preference: PatternPreference,
}

// --- Generation ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StyleHint { Vivid, Natural }

impl StyleHint {
    pub fn for_intensity(intensity: Option<Intensity>) -> Self {
        match intensity {
            Some(Intensity::Dramatic) => StyleHint::Vivid,
            _ => StyleHint::Natural,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleHint::Vivid => "vivid",
            StyleHint::Natural => "natural",
        }
    }
}

impl fmt::Display for StyleHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Style attributes a design was generated from.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StyleAttributes {
    pub intensity: Option<Intensity>,
    pub pattern_preference: Option<PatternPreference>,
    pub complexity: Option<Complexity>,
    pub color_harmony: Option<ColorHarmony>,
    pub colors: Vec<String>,
    pub styles: Vec<String>,
    pub finish_types: Vec<String>,
}

impl From<&StylePreferences> for StyleAttributes {
    fn from(p: &StylePreferences) -> Self {
        Self {
            intensity: p.intensity,
            pattern_preference: p.pattern_preference,
            complexity: p.complexity,
            color_harmony: p.color_harmony,
            colors: p.colors.clone(),
            styles: p.styles.clone(),
            finish_types: p.finish_types.clone(),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DesignArtifact {
    pub id: Uuid,
    pub image_ref: String,
    pub brief: String,
    pub style_hint: StyleHint,
    pub style: StyleAttributes,
    /// Index into the variation rotation, `None` for a single generation.
    pub variation: Option<usize>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DesignSession {
    pub id: Uuid,
    pub artifacts: Vec<DesignArtifact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DesignSession {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self { id, artifacts: Vec::new(), created_at: now, updated_at: now }
    }
}

// --- Recommendations & pricing ---

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationReport {
    pub recommendations: Vec<String>,
    pub color_suggestions: Vec<String>,
    pub style_suggestions: Vec<String>,
    pub warnings: Vec<String>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CustomizationDescriptor {
    pub complexity: Option<Complexity>,
    #[serde(alias = "colorCount")]
    pub color_count: usize,
    #[serde(alias = "styleKeywords")]
    pub style_keywords: Vec<String>,
    pub occasion: Option<String>,
    #[serde(alias = "personalizedElements")]
    pub personalized_elements: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Money {
    /// Whole currency units.
    pub amount: u64,
    pub currency: String,
}

// --- HTTP bodies ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FingerPhoto {
    pub finger: Finger,
    /// Base64 payload, optionally as a `data:` URI.
    #[serde(alias = "imageBase64")]
    pub image_base64: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MeasureHandRequest {
    pub photos: Vec<FingerPhoto>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BriefRequest {
    #[serde(default)]
    pub measurements: Vec<NailMeasurement>,
    #[serde(default)]
    pub preferences: StylePreferences,
    #[serde(default, alias = "customRequest")]
    pub custom_request: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateDesignRequest {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<Uuid>,
    #[serde(flatten)]
    pub brief: BriefRequest,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateVariationsRequest {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<Uuid>,
    #[serde(default = "default_variation_count")]
    pub count: usize,
    #[serde(flatten)]
    pub brief: BriefRequest,
}

fn default_variation_count() -> usize { 3 }

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateDesignResponse {
    pub session_id: Uuid,
    pub artifact: DesignArtifact,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateVariationsResponse {
    pub session_id: Uuid,
    pub requested: usize,
    pub artifacts: Vec<DesignArtifact>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub measurements: Vec<NailMeasurement>,
    #[serde(default)]
    pub preferences: StylePreferences,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PricingRequest {
    #[serde(default)]
    pub descriptor: Option<CustomizationDescriptor>,
    #[serde(default)]
    pub preferences: Option<StylePreferences>,
    #[serde(default, alias = "personalizedElements")]
    pub personalized_elements: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PricingResponse {
    pub descriptor: CustomizationDescriptor,
    pub price: Money,
}
