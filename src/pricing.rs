use serde::{Serialize, Deserialize};

use crate::models::{Complexity, CustomizationDescriptor, Money, StylePreferences};

pub const COMPLEX_TECHNIQUES: [&str; 5] = ["gradient", "marble", "glitter", "3d", "hand-painted"];
pub const PREMIUM_OCCASIONS: [&str; 3] = ["wedding", "special_event", "party"];

const MANY_COLORS: usize = 3;
const MANY_COLORS_FACTOR: f64 = 1.2;
const COMPLEX_TECHNIQUE_FACTOR: f64 = 1.4;
const PREMIUM_OCCASION_FACTOR: f64 = 1.3;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PriceSchedule {
    pub base_price: f64,
    pub element_fee: f64,
    pub currency: String,
}

impl Default for PriceSchedule {
    fn default() -> Self {
        Self { base_price: 50.0, element_fee: 5.0, currency: "USD".into() }
    }
}

impl PriceSchedule {
    /// Deterministic price of a customization. Multipliers are applied in a
    /// fixed order, then per-element fees, then rounding to whole units.
    pub fn price(&self, d: &CustomizationDescriptor) -> Money {
        let mut total = self.base_price;
        total *= complexity_factor(d.complexity);
        if d.color_count > MANY_COLORS {
            total *= MANY_COLORS_FACTOR;
        }
        if d.style_keywords.iter().any(|k| is_complex_technique(k)) {
            total *= COMPLEX_TECHNIQUE_FACTOR;
        }
        if d.occasion.as_deref().is_some_and(is_premium_occasion) {
            total *= PREMIUM_OCCASION_FACTOR;
        }
        total += self.element_fee * f64::from(d.personalized_elements);

        Money { amount: total.round().max(0.0) as u64, currency: self.currency.clone() }
    }
}

/// Absent complexity is priced like `simple`.
pub fn complexity_factor(complexity: Option<Complexity>) -> f64 {
    match complexity {
        None | Some(Complexity::Simple) => 1.0,
        Some(Complexity::Medium) => 1.3,
        Some(Complexity::Complex) => 1.7,
    }
}

pub fn is_complex_technique(keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    COMPLEX_TECHNIQUES.iter().any(|t| keyword.contains(t))
}

pub fn is_premium_occasion(occasion: &str) -> bool {
    let normalized = normalize_occasion(occasion);
    PREMIUM_OCCASIONS.contains(&normalized.as_str())
}

fn normalize_occasion(occasion: &str) -> String {
    occasion.trim().to_lowercase().replace(['-', ' '], "_")
}

impl CustomizationDescriptor {
    pub fn from_preferences(p: &StylePreferences, personalized_elements: u32) -> Self {
        let mut colors: Vec<String> = p
            .colors
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        colors.sort();
        colors.dedup();

        let style_keywords = p
            .styles
            .iter()
            .chain(&p.finish_types)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let occasions: Vec<&str> = p.occasions.iter().map(|o| o.trim()).filter(|o| !o.is_empty()).collect();
        let occasion = occasions
            .iter()
            .find(|o| is_premium_occasion(o))
            .or_else(|| occasions.first())
            .map(|o| o.to_string());

        Self {
            complexity: p.complexity,
            color_count: colors.len(),
            style_keywords,
            occasion,
            personalized_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn descriptor(complexity: Complexity) -> CustomizationDescriptor {
        CustomizationDescriptor {
            complexity: Some(complexity),
            color_count: 2,
            style_keywords: vec!["minimal".into()],
            occasion: Some("work".into()),
            personalized_elements: 0,
        }
    }

    #[test]
    fn simple_design_costs_the_base_price() {
        let price = PriceSchedule::default().price(&descriptor(Complexity::Simple));
        assert_eq!(price, Money { amount: 50, currency: "USD".into() });
    }

    #[test]
    fn premium_wedding_set_stacks_every_multiplier() {
        let schedule = PriceSchedule::default();
        let d = CustomizationDescriptor {
            complexity: Some(Complexity::Complex),
            color_count: 4,
            style_keywords: vec!["glitter".into()],
            occasion: Some("wedding".into()),
            personalized_elements: 2,
        };
        let expected = (50.0 * 1.7 * 1.2 * 1.4 * 1.3 + 2.0 * 5.0_f64).round() as u64;
        assert_eq!(expected, 196);
        assert_eq!(schedule.price(&d).amount, expected);
    }

    #[test]
    fn complex_always_costs_more_than_simple() {
        let schedule = PriceSchedule::default();
        for base in [1.0, 10.0, 50.0, 120.0] {
            let schedule = PriceSchedule { base_price: base, ..schedule.clone() };
            let simple = schedule.price(&descriptor(Complexity::Simple));
            let complex = schedule.price(&descriptor(Complexity::Complex));
            assert!(complex.amount > simple.amount, "base {base}");
        }
    }

    #[test]
    fn same_descriptor_same_price() {
        let schedule = PriceSchedule::default();
        let d = descriptor(Complexity::Medium);
        assert_eq!(schedule.price(&d), schedule.price(&d));
        assert_eq!(schedule.price(&d).amount, 65);
    }

    #[test]
    fn three_colors_is_not_many() {
        let schedule = PriceSchedule::default();
        let mut d = descriptor(Complexity::Simple);
        d.color_count = 3;
        assert_eq!(schedule.price(&d).amount, 50);
        d.color_count = 4;
        assert_eq!(schedule.price(&d).amount, 60);
    }

    #[test]
    fn technique_match_is_case_insensitive_substring() {
        assert!(is_complex_technique("Hand-Painted florals"));
        assert!(is_complex_technique("3D charms"));
        assert!(is_complex_technique("Marbled"));
        assert!(!is_complex_technique("french tip"));
    }

    #[test]
    fn premium_occasions_accept_spacing_variants() {
        assert!(is_premium_occasion("Special Event"));
        assert!(is_premium_occasion("party"));
        assert!(!is_premium_occasion("office"));
    }

    #[test]
    fn descriptor_is_derived_from_preferences() {
        let prefs = StylePreferences {
            colors: vec!["Red".into(), "red".into(), "gold".into(), " ".into()],
            styles: vec!["minimal".into()],
            finish_types: vec!["glitter topcoat".into()],
            occasions: vec!["brunch".into(), "wedding".into()],
            complexity: Some(Complexity::Medium),
            ..Default::default()
        };
        let d = CustomizationDescriptor::from_preferences(&prefs, 1);
        assert_eq!(
            d,
            CustomizationDescriptor {
                complexity: Some(Complexity::Medium),
                color_count: 2,
                style_keywords: vec!["minimal".into(), "glitter topcoat".into()],
                occasion: Some("wedding".into()),
                personalized_elements: 1,
            }
        );
    }
}
