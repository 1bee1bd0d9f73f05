use crate::config::EstimatorConfig;
use serde::Serialize;
use std::collections::HashMap;

/// Mass and energy of one item
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NutritionEstimate {
    pub mass_grams: f64,
    pub energy_kcal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientEntry {
    /// g/cm^3
    pub density: f64,
    pub kcal_per_100g: f64,
}

/// Immutable density and caloric tables, keyed by normalized label
#[derive(Debug, Clone, Default)]
pub struct NutritionTable {
    entries: HashMap<String, NutrientEntry>,
}

impl NutritionTable {
    pub fn from_config(config: &EstimatorConfig) -> Self {
        let entries = config
            .foods
            .iter()
            .map(|(label, food)| {
                (
                    label.clone(),
                    NutrientEntry {
                        density: food.density,
                        kcal_per_100g: food.kcal_per_100g,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn with_entry(mut self, label: &str, density: f64, kcal_per_100g: f64) -> Self {
        self.entries.insert(
            EstimatorConfig::normalize_label(label),
            NutrientEntry {
                density,
                kcal_per_100g,
            },
        );
        self
    }

    pub fn entry(&self, label: &str) -> Option<&NutrientEntry> {
        self.entries.get(&EstimatorConfig::normalize_label(label))
    }

    /// Mass from density, energy from the per-100g caloric value
    ///
    /// Labels missing from the table yield zeros.
    pub fn to_nutrition(&self, label: &str, volume_cm3: f64) -> NutritionEstimate {
        let Some(entry) = self.entry(label) else {
            return NutritionEstimate::default();
        };

        let mass_grams = volume_cm3.max(0.0) * entry.density;
        let energy_kcal = (entry.kcal_per_100g / 100.0) * mass_grams;

        NutritionEstimate {
            mass_grams,
            energy_kcal,
        }
    }
}
