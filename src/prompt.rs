//! Design brief construction.
//!
//! A brief is an ordered list of labelled sections. The order is fixed by
//! [`SectionKind`]; a preference that is absent or empty simply drops its
//! section. The same inputs always render byte-identical text.

use serde::Serialize;

use crate::models::{
    Budget, ColorHarmony, Complexity, Intensity, NailMeasurement, PatternPreference, StylePreferences,
};
use crate::validator::MeasurementValidator;

/// Section kinds in brief order.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    CustomRequest,
    Measurements,
    ColorPalette,
    StyleElements,
    Personality,
    PatternFinish,
    Intensity,
    Complexity,
    Occasion,
    SkinTone,
    Inspiration,
    Lifestyle,
    Technique,
    TechnicalRequirements,
}

impl SectionKind {
    pub fn heading(&self) -> &'static str {
        match self {
            SectionKind::CustomRequest => "CUSTOM REQUEST",
            SectionKind::Measurements => "NAIL MEASUREMENTS",
            SectionKind::ColorPalette => "COLOR PALETTE",
            SectionKind::StyleElements => "STYLE ELEMENTS",
            SectionKind::Personality => "PERSONALITY EXPRESSION",
            SectionKind::PatternFinish => "PATTERN & FINISH",
            SectionKind::Intensity => "DESIGN INTENSITY",
            SectionKind::Complexity => "COMPLEXITY",
            SectionKind::Occasion => "OCCASION",
            SectionKind::SkinTone => "SKIN TONE",
            SectionKind::Inspiration => "INSPIRATION",
            SectionKind::Lifestyle => "LIFESTYLE",
            SectionKind::Technique => "TECHNIQUE",
            SectionKind::TechnicalRequirements => "TECHNICAL REQUIREMENTS",
        }
    }
}

pub const BRIEF_OPENING: &str =
    "Create a professional nail art design for a custom press-on nail set, shown as a close-up of a full set of nails.";

pub const TECHNICAL_REQUIREMENTS: &str = "\
- Keep each nail design proportional to the measured nail width and length
- Account for natural nail curvature so the artwork wraps cleanly at the edges
- Keep the artwork printable: crisp edges, no details finer than a fine-liner brush
- Photorealistic studio photography, soft even lighting, sharp focus on the nails, neutral background";

pub fn intensity_phrase(intensity: Intensity) -> &'static str {
    match intensity {
        Intensity::Subtle => "subtle and understated",
        Intensity::Moderate => "moderately eye-catching",
        Intensity::Bold => "bold and striking",
        Intensity::Dramatic => "dramatic and show-stopping",
    }
}

pub fn complexity_phrase(complexity: Complexity) -> &'static str {
    match complexity {
        Complexity::Simple => "simple and clean with minimal details",
        Complexity::Medium => "moderately detailed with balanced elements",
        Complexity::Complex => "intricate and highly detailed with multiple elements",
    }
}

pub fn technique_phrase(budget: Budget) -> &'static str {
    match budget {
        Budget::Low => "Use cost-effective techniques: solid colors, simple lines and minimal embellishment",
        Budget::Medium => "Use mid-range techniques: gradients, stamping, simple hand-drawn accents and a few embellishments",
        Budget::High => "Use premium techniques: detailed hand-painted art, 3D elements, crystals and luxury finishes",
    }
}

pub fn pattern_phrase(pattern: PatternPreference) -> &'static str {
    match pattern {
        PatternPreference::Solid => "solid, uniform color on every nail",
        PatternPreference::Gradient => "smooth gradient or ombre transitions",
        PatternPreference::Pattern => "defined repeating patterns and motifs",
        PatternPreference::Mixed => "a mix of solid, gradient and patterned nails",
    }
}

pub fn harmony_phrase(harmony: ColorHarmony) -> &'static str {
    match harmony {
        ColorHarmony::Monochromatic => "shades and tints of a single hue",
        ColorHarmony::Complementary => "colors from opposite sides of the color wheel",
        ColorHarmony::Triadic => "three evenly spaced colors on the color wheel",
        ColorHarmony::Analogous => "neighboring colors on the color wheel",
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BriefSection {
    pub kind: SectionKind,
    pub heading: String,
    pub body: String,
}

/// A rendered brief plus the inputs it was built from, so variations can be
/// re-derived from the same base.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DesignBrief {
    pub sections: Vec<BriefSection>,
    pub text: String,
    #[serde(skip)]
    measurements: Vec<NailMeasurement>,
    #[serde(skip)]
    preferences: StylePreferences,
    #[serde(skip)]
    custom_text: Option<String>,
}

impl DesignBrief {
    pub fn measurements(&self) -> &[NailMeasurement] { &self.measurements }
    pub fn preferences(&self) -> &StylePreferences { &self.preferences }
    pub fn custom_text(&self) -> Option<&str> { self.custom_text.as_deref() }

    pub fn kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    #[cfg(test)]
    pub fn section(&self, kind: SectionKind) -> Option<&BriefSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptSynthesizer {
    validator: MeasurementValidator,
}

impl PromptSynthesizer {
    pub fn new(validator: MeasurementValidator) -> Self {
        Self { validator }
    }

    pub fn synthesize(
        &self,
        measurements: &[NailMeasurement],
        preferences: &StylePreferences,
        custom_text: Option<&str>,
    ) -> DesignBrief {
        let p = preferences;
        let mut builder = SectionBuilder::default();

        builder.push(SectionKind::CustomRequest, non_blank(custom_text).map(str::to_string));

        let lines: Vec<String> = self
            .validator
            .usable(measurements)
            .into_iter()
            .map(|(m, shape)| {
                format!(
                    "- {}: {}, {:.1}mm × {:.1}mm",
                    m.finger_type.display_name(),
                    shape.as_str(),
                    m.nail_width,
                    m.nail_length
                )
            })
            .collect();
        builder.push(SectionKind::Measurements, (!lines.is_empty()).then(|| lines.join("\n")));

        let colors = tags(&p.colors);
        let palette = match (colors.is_empty(), p.color_harmony) {
            (true, None) => None,
            (false, None) => Some(colors.join(", ")),
            (true, Some(h)) => Some(format!("{} harmony: {}", h.as_str(), harmony_phrase(h))),
            (false, Some(h)) => Some(format!(
                "{}\n{} harmony: {}",
                colors.join(", "),
                h.as_str(),
                harmony_phrase(h)
            )),
        };
        builder.push(SectionKind::ColorPalette, palette);

        builder.push(SectionKind::StyleElements, joined(&p.styles));
        builder.push(
            SectionKind::Personality,
            joined(&p.personality_traits).map(|t| format!("Reflect a personality that is {t}")),
        );

        let finishes = tags(&p.finish_types);
        let pattern_finish = match (p.pattern_preference, finishes.is_empty()) {
            (None, true) => None,
            (Some(pat), true) => Some(format!("Pattern: {}", pattern_phrase(pat))),
            (None, false) => Some(format!("Finish: {}", finishes.join(", "))),
            (Some(pat), false) => Some(format!(
                "Pattern: {}\nFinish: {}",
                pattern_phrase(pat),
                finishes.join(", ")
            )),
        };
        builder.push(SectionKind::PatternFinish, pattern_finish);

        builder.push(SectionKind::Intensity, p.intensity.map(|i| intensity_phrase(i).to_string()));
        builder.push(SectionKind::Complexity, p.complexity.map(|c| complexity_phrase(c).to_string()));
        builder.push(SectionKind::Occasion, joined(&p.occasions).map(|o| format!("Designed for: {o}")));
        builder.push(
            SectionKind::SkinTone,
            non_blank(p.skin_tone.as_deref()).map(|t| format!("Complement a {t} skin tone")),
        );
        builder.push(SectionKind::Inspiration, non_blank(p.inspiration.as_deref()).map(str::to_string));
        builder.push(
            SectionKind::Lifestyle,
            non_blank(p.lifestyle.as_deref()).map(|l| format!("Practical for this lifestyle: {l}")),
        );
        builder.push(SectionKind::Technique, p.budget.map(|b| technique_phrase(b).to_string()));
        builder.push(SectionKind::TechnicalRequirements, Some(TECHNICAL_REQUIREMENTS.to_string()));

        let sections = builder.finish();
        let text = render(&sections);
        DesignBrief {
            sections,
            text,
            measurements: measurements.to_vec(),
            preferences: preferences.clone(),
            custom_text: non_blank(custom_text).map(str::to_string),
        }
    }
}

#[derive(Default)]
struct SectionBuilder {
    sections: Vec<BriefSection>,
}

impl SectionBuilder {
    fn push(&mut self, kind: SectionKind, body: Option<String>) {
        if let Some(body) = body {
            debug_assert!(self.sections.last().map_or(true, |s| s.kind < kind));
            self.sections.push(BriefSection { kind, heading: kind.heading().to_string(), body });
        }
    }

    fn finish(self) -> Vec<BriefSection> {
        self.sections
    }
}

fn render(sections: &[BriefSection]) -> String {
    let mut out = String::from(BRIEF_OPENING);
    for section in sections {
        out.push_str("\n\n");
        out.push_str(&section.heading);
        out.push_str(":\n");
        out.push_str(&section.body);
    }
    out
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn tags(values: &[String]) -> Vec<&str> {
    values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect()
}

fn joined(values: &[String]) -> Option<String> {
    let values = tags(values);
    (!values.is_empty()).then(|| values.join(", "))
}
