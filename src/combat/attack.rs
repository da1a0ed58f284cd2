use serde::{Deserialize, Serialize};

use crate::shared::AnimState;

/// Horizontal step taken during the swing itself, after the approach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lunge {
    /// Pixels per second; zero disables the lunge.
    pub speed: f32,
    /// How far past the approach point the attacker pushes, toward the defender.
    pub target_offset: f32,
    pub stop_threshold: f32,
}

/// Seconds into the attack during which a counter input succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterWindow {
    pub start: f32,
    pub end: f32,
}

impl CounterWindow {
    pub fn contains(&self, t: f32) -> bool {
        t >= self.start && t <= self.end
    }
}

/// One combat move.
///
/// All times are seconds since the attacker reached its approach point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub name: String,
    pub damage: f32,
    pub anim: AnimState,
    pub impact_time: f32,
    pub end_time: f32,
    /// Distance in front of the defender where the approach stops.
    #[serde(default = "default_reach")]
    pub reach: f32,
    #[serde(default)]
    pub lunge: Option<Lunge>,
    #[serde(default)]
    pub counter_window: Option<CounterWindow>,
    #[serde(default)]
    pub counterable: bool,
}

fn default_reach() -> f32 {
    24.0
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AttackError {
    #[error("attack '{0}': impact time must be positive")]
    ImpactNotPositive(String),

    #[error("attack '{0}': end time must come after impact time")]
    EndBeforeImpact(String),

    #[error("attack '{0}': damage must not be negative")]
    NegativeDamage(String),

    #[error("attack '{0}': counterable attacks need a counter window")]
    MissingCounterWindow(String),

    #[error("attack '{name}': counter window {start}..{end} must lie within 0..{end_time}")]
    CounterWindowOutOfRange {
        name: String,
        start: f32,
        end: f32,
        end_time: f32,
    },

    #[error("attack '{0}': lunge stop threshold must be positive")]
    LungeThreshold(String),
}

impl Attack {
    /// Timings that could stall a turn are rejected here, before combat starts.
    pub fn validate(&self) -> Result<(), AttackError> {
        let name = || self.name.clone();

        // Negated comparisons also catch NaN.
        if !(self.impact_time > 0.0) {
            return Err(AttackError::ImpactNotPositive(name()));
        }
        if !(self.end_time > self.impact_time) {
            return Err(AttackError::EndBeforeImpact(name()));
        }
        if !(self.damage >= 0.0) {
            return Err(AttackError::NegativeDamage(name()));
        }
        if let Some(lunge) = &self.lunge {
            if !(lunge.stop_threshold > 0.0) {
                return Err(AttackError::LungeThreshold(name()));
            }
        }
        if self.counterable {
            let Some(window) = self.counter_window else {
                return Err(AttackError::MissingCounterWindow(name()));
            };
            let in_range = window.start >= 0.0
                && window.start < window.end
                && window.end <= self.end_time;
            if !in_range {
                return Err(AttackError::CounterWindowOutOfRange {
                    name: name(),
                    start: window.start,
                    end: window.end,
                    end_time: self.end_time,
                });
            }
        }
        Ok(())
    }

    /// Window to check counter input against, if this attack can be countered.
    pub fn active_counter_window(&self) -> Option<CounterWindow> {
        if self.counterable {
            self.counter_window
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slash() -> Attack {
        Attack {
            name: "slash".into(),
            damage: 10.0,
            anim: AnimState::Attack,
            impact_time: 0.3,
            end_time: 0.6,
            reach: 20.0,
            lunge: None,
            counter_window: Some(CounterWindow { start: 0.1, end: 0.3 }),
            counterable: true,
        }
    }

    #[test]
    fn test_valid_attack_passes() {
        assert_eq!(slash().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_stalling_timings() {
        let mut attack = slash();
        attack.impact_time = 0.0;
        assert!(matches!(attack.validate(), Err(AttackError::ImpactNotPositive(_))));

        let mut attack = slash();
        attack.end_time = 0.3;
        assert!(matches!(attack.validate(), Err(AttackError::EndBeforeImpact(_))));

        let mut attack = slash();
        attack.end_time = f32::NAN;
        assert!(attack.validate().is_err());
    }

    #[test]
    fn test_counter_window_must_fit_inside_attack() {
        let mut attack = slash();
        attack.counter_window = Some(CounterWindow { start: 0.5, end: 0.9 });
        assert!(matches!(
            attack.validate(),
            Err(AttackError::CounterWindowOutOfRange { .. })
        ));

        attack.counter_window = None;
        assert!(matches!(attack.validate(), Err(AttackError::MissingCounterWindow(_))));

        attack.counterable = false;
        assert_eq!(attack.validate(), Ok(()));
        assert_eq!(attack.active_counter_window(), None);
    }

    #[test]
    fn test_counter_window_bounds_are_inclusive() {
        let window = CounterWindow { start: 0.1, end: 0.3 };
        assert!(window.contains(0.1));
        assert!(window.contains(0.3));
        assert!(!window.contains(0.31));
    }
}
