use std::ops::RangeInclusive;
use tracing::debug;

use crate::error::ValidationError;
use crate::models::{MeasurementOutcome, MeasurementVerdict, NailMeasurement, ShapeCategory};

pub const MAX_NAIL_LENGTH_MM: f64 = 50.0;
pub const MAX_NAIL_WIDTH_MM: f64 = 30.0;
pub const DEFAULT_USABLE_CONFIDENCE: f64 = 0.5;
pub const CURVATURE_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Two-tier gate for vision readings: a record is *valid* when it is
/// physically plausible, and *usable* when it is also confident enough to be
/// fed into generation.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementValidator {
    usable_confidence: f64,
}

impl Default for MeasurementValidator {
    fn default() -> Self {
        Self { usable_confidence: DEFAULT_USABLE_CONFIDENCE }
    }
}

impl MeasurementValidator {
    pub fn new(usable_confidence: f64) -> Self {
        Self { usable_confidence }
    }

    /// Structural checks, in order. The first violation wins.
    pub fn check(&self, m: &NailMeasurement) -> Result<ShapeCategory, ValidationError> {
        if !(m.nail_length > 0.0 && m.nail_length < MAX_NAIL_LENGTH_MM) {
            return Err(ValidationError::OutOfRangeLength);
        }
        if !(m.nail_width > 0.0 && m.nail_width < MAX_NAIL_WIDTH_MM) {
            return Err(ValidationError::OutOfRangeWidth);
        }
        if !(m.area() > 0.0) {
            return Err(ValidationError::NonPositiveArea);
        }
        if !(0.0..=1.0).contains(&m.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange);
        }
        ShapeCategory::parse(&m.shape_category).ok_or(ValidationError::UnknownShape)
    }

    pub fn validate(&self, m: &NailMeasurement) -> MeasurementVerdict {
        match self.check(m) {
            Ok(_) => MeasurementVerdict { accepted: true, reason: None },
            Err(reason) => {
                debug!(finger = %m.finger_type, %reason, "measurement rejected");
                MeasurementVerdict { accepted: false, reason: Some(reason) }
            }
        }
    }

    pub fn is_usable(&self, m: &NailMeasurement) -> bool {
        self.check(m).is_ok()
            && m.confidence >= self.usable_confidence
            && m.nail_curvature.map_or(true, |c| CURVATURE_RANGE.contains(&c))
    }

    pub fn assess(&self, m: NailMeasurement) -> MeasurementOutcome {
        let verdict = self.validate(&m);
        let usable = verdict.accepted && self.is_usable(&m);
        MeasurementOutcome { measurement: m, verdict, usable }
    }

    /// Usable measurements paired with their parsed shape, input order kept.
    pub fn usable<'a>(&self, measurements: &'a [NailMeasurement]) -> Vec<(&'a NailMeasurement, ShapeCategory)> {
        measurements
            .iter()
            .filter(|m| self.is_usable(m))
            .filter_map(|m| self.check(m).ok().map(|shape| (m, shape)))
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_measurement() -> NailMeasurement {
    use crate::models::Finger;
    NailMeasurement {
        finger_type: Finger::LeftThumb,
        nail_width: 14.2,
        nail_length: 18.5,
        nail_area: Some(210.0),
        nail_curvature: None,
        shape_category: "oval".into(),
        confidence: 0.92,
    }
}
