//! Simulation constants, loadable from JSON.
//!
//! Every field has a default, so a settings file only needs the values it
//! changes:
//!
//! ```json
//! { "world_size": 300.0, "max_food": 120 }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors from loading or validating [`SimSettings`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The settings text is not valid JSON for [`SimSettings`].
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid setting '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Tunable constants of the biome simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimSettings {
    /// Radius of the world disc.
    pub world_size: f64,

    /// Seconds between hunger ticks.
    pub hunger_tick_delay: f64,
    /// Extra hunger lost per tick per unit of move speed.
    pub speed_hunger_multiplier: f64,
    /// Health multiplier applied on each starving hunger tick.
    pub starvation_health_factor: f64,
    /// Flat health lost on each starving hunger tick, after the multiplier.
    pub starvation_health_penalty: f64,

    /// Seconds between food spawn batches.
    pub food_create_delay: f64,
    /// Bushes spawned per batch.
    pub food_batch_size: usize,
    /// No batch is spawned once this many bushes exist.
    pub max_food: usize,

    /// Seconds between gathering passes.
    pub gathering_interval: f64,
    /// A creature this close to a bush eats it.
    pub eat_distance: f64,
    pub bush_food_value: f64,
    pub bush_health_value: f64,

    /// Below this hunger a creature switches to gathering.
    pub extreme_hunger_value: f64,
    /// Below this health a creature switches to safety.
    pub extreme_health_value: f64,

    /// Hunger at which a creature evolves.
    pub evolve_hunger_value: f64,
    /// Hunger spent by one evolution.
    pub evolve_hunger_cost: f64,

    /// Seconds between hunting passes.
    pub hunting_interval: f64,
    /// Seconds between damage passes.
    pub damage_interval: f64,
    /// Enemies this close hurt each other on a damage pass.
    pub attack_distance: f64,
    /// Damage dealt per point of strength.
    pub damage_multiplier: f64,
    /// Health a killer gains.
    pub kill_treatment: f64,
    /// Hunger a killer gains.
    pub meat_food_value: f64,

    /// Per-frame death chance is `age / life_time_divisor`.
    pub life_time_divisor: f64,

    /// Seconds between reproduction rounds.
    pub reproduce_delay: f64,
    /// Chance that a creature has offspring in a round.
    pub reproduce_chance: f64,
    /// Seconds between new bots joining.
    pub bot_create_delay: f64,
    /// Reproduction and new bots stop at this many creatures.
    pub max_creatures: usize,

    /// Creatures seeded at start by the headless driver.
    pub start_creatures: usize,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            world_size: 600.0,
            hunger_tick_delay: 0.8,
            speed_hunger_multiplier: 0.25,
            starvation_health_factor: 0.9,
            starvation_health_penalty: 10.0,
            food_create_delay: 0.05,
            food_batch_size: 4,
            max_food: 500,
            gathering_interval: 1.2,
            eat_distance: 17.0,
            bush_food_value: 35.0,
            bush_health_value: 5.0,
            extreme_hunger_value: 65.0,
            extreme_health_value: 30.0,
            evolve_hunger_value: 200.0,
            evolve_hunger_cost: 90.0,
            hunting_interval: 1.5,
            damage_interval: 0.5,
            attack_distance: 20.0,
            damage_multiplier: 6.5,
            kill_treatment: 60.0,
            meat_food_value: 60.0,
            life_time_divisor: 4000.0,
            reproduce_delay: 30.0,
            reproduce_chance: 0.1,
            bot_create_delay: 5.0,
            max_creatures: 100,
            start_creatures: 40,
        }
    }
}

impl SimSettings {
    /// Parse and validate settings from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, SettingsError> {
        let settings: SimSettings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("world_size", self.world_size),
            ("hunger_tick_delay", self.hunger_tick_delay),
            ("food_create_delay", self.food_create_delay),
            ("gathering_interval", self.gathering_interval),
            ("eat_distance", self.eat_distance),
            ("life_time_divisor", self.life_time_divisor),
            ("hunting_interval", self.hunting_interval),
            ("damage_interval", self.damage_interval),
            ("attack_distance", self.attack_distance),
            ("reproduce_delay", self.reproduce_delay),
            ("bot_create_delay", self.bot_create_delay),
        ];
        for (field, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SettingsError::Invalid {
                    field,
                    reason: format!("must be positive and finite, got {value}"),
                });
            }
        }
        let fractions = [
            ("starvation_health_factor", self.starvation_health_factor),
            ("reproduce_chance", self.reproduce_chance),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::Invalid {
                    field,
                    reason: format!("must be within [0, 1], got {value}"),
                });
            }
        }
        if self.evolve_hunger_cost > self.evolve_hunger_value {
            return Err(SettingsError::Invalid {
                field: "evolve_hunger_cost",
                reason: format!(
                    "must not exceed evolve_hunger_value ({}), got {}",
                    self.evolve_hunger_value, self.evolve_hunger_cost
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimSettings::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let settings =
            SimSettings::from_json_str(r#"{ "world_size": 300.0, "max_food": 12 }"#).unwrap();
        assert_eq!(settings.world_size, 300.0);
        assert_eq!(settings.max_food, 12);
        assert_eq!(settings.hunger_tick_delay, SimSettings::default().hunger_tick_delay);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = SimSettings::from_json_str(r#"{ "wrld_size": 1.0 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn non_positive_delay_is_rejected() {
        let err = SimSettings::from_json_str(r#"{ "hunger_tick_delay": 0.0 }"#).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                field: "hunger_tick_delay",
                ..
            }
        ));
    }

    #[test]
    fn reproduce_chance_must_be_a_probability() {
        let err = SimSettings::from_json_str(r#"{ "reproduce_chance": 1.5 }"#).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                field: "reproduce_chance",
                ..
            }
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SimSettings::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
