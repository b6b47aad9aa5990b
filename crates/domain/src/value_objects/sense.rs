//! The four canonical senses and the clarity scale derived from them
//! (spec.md §4.5).

use serde::{Deserialize, Serialize};

/// Canonical sense order used to break ties deterministically when two
/// senses would otherwise produce the same clarity (spec.md §9, Open
/// Questions: "Pin this to a stable order").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sense {
    Light,
    Pressure,
    Aroma,
    Thaumic,
}

impl Sense {
    pub const CANONICAL_ORDER: [Sense; 4] =
        [Sense::Light, Sense::Pressure, Sense::Aroma, Sense::Thaumic];

    pub fn rank(&self) -> usize {
        Self::CANONICAL_ORDER.iter().position(|s| s == self).unwrap_or(usize::MAX)
    }

    /// `thaumic` penetrates walls / place boundaries; the others do not
    /// (spec.md §4.5: "thaumic (magic, omnidirectional, penetrates walls)").
    pub fn penetrates_walls(&self) -> bool {
        matches!(self, Sense::Thaumic)
    }

    pub fn is_directional(&self) -> bool {
        matches!(self, Sense::Light)
    }
}

/// Qualitative precision of a perception (spec.md §3, glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Clarity {
    /// Ordered worst-to-best so `Clarity::Obscured < Clarity::Clear`
    /// comparisons read naturally in threshold checks.
    NotPerceived,
    Obscured,
    Sensed,
    Vague,
    Clear,
}

/// A vision-cone preset: angle and range for a kind of observer
/// (spec.md §4.5, "Vision cone gate" presets).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionCone {
    pub angle_degrees: f64,
    pub range_tiles: f64,
}

impl VisionCone {
    pub const HUMANOID: VisionCone = VisionCone { angle_degrees: 120.0, range_tiles: 12.0 };
    pub const GUARD: VisionCone = VisionCone { angle_degrees: 140.0, range_tiles: 15.0 };
    pub const ANIMAL: VisionCone = VisionCone { angle_degrees: 180.0, range_tiles: 10.0 };
    pub const SCOUT: VisionCone = VisionCone { angle_degrees: 90.0, range_tiles: 20.0 };
    pub const BLIND: VisionCone = VisionCone { angle_degrees: 0.0, range_tiles: 0.0 };

    /// Hearing range is capped at 0.6x this cone's vision range for the
    /// same entity (spec.md §4.5, "Hearing").
    pub fn hearing_range(&self) -> f64 {
        self.range_tiles * 0.6
    }

    /// Whether `angle_to_target` (degrees, 0..360) falls within the cone
    /// centered on `facing_degrees`, AND `distance` is within range.
    pub fn gate(&self, facing_degrees: f64, angle_to_target: f64, distance: f64) -> bool {
        if distance > self.range_tiles {
            return false;
        }
        if self.angle_degrees <= 0.0 {
            return false;
        }
        let mut delta = (angle_to_target - facing_degrees).rem_euclid(360.0);
        if delta > 180.0 {
            delta -= 360.0;
        }
        delta.abs() <= self.angle_degrees / 2.0
    }
}

/// Clarity from the distance/max-range ratio (spec.md §4.5, "Clarity curve").
///
/// `has_visual` distinguishes the "vague if visual-only else sensed" branch
/// at `(0.5, 0.8]`, and `auditory_only` applies the one-step reduction for
/// "Auditory-only with no visual in range."
pub fn clarity_from_ratio(ratio: f64, has_visual: bool, auditory_only: bool) -> Clarity {
    let mut clarity = if ratio <= 0.5 {
        Clarity::Clear
    } else if ratio <= 0.8 {
        if has_visual {
            Clarity::Vague
        } else {
            Clarity::Sensed
        }
    } else if ratio <= 1.0 {
        Clarity::Vague
    } else {
        return Clarity::NotPerceived;
    };

    if auditory_only && !has_visual {
        clarity = step_down(clarity);
    }
    clarity
}

fn step_down(clarity: Clarity) -> Clarity {
    match clarity {
        Clarity::Clear => Clarity::Vague,
        Clarity::Vague => Clarity::Obscured,
        Clarity::Sensed => Clarity::Obscured,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_pins_light_first() {
        assert_eq!(Sense::Light.rank(), 0);
        assert_eq!(Sense::Thaumic.rank(), 3);
        assert!(Sense::Light.rank() < Sense::Pressure.rank());
    }

    #[test]
    fn thaumic_penetrates_walls_others_do_not() {
        assert!(Sense::Thaumic.penetrates_walls());
        assert!(!Sense::Light.penetrates_walls());
        assert!(!Sense::Pressure.penetrates_walls());
    }

    #[test]
    fn vision_cone_gate_accepts_within_half_angle() {
        let cone = VisionCone::HUMANOID;
        assert!(cone.gate(0.0, 30.0, 5.0));
        assert!(cone.gate(0.0, -59.0, 5.0));
        assert!(!cone.gate(0.0, 61.0, 5.0));
    }

    #[test]
    fn vision_cone_gate_rejects_beyond_range() {
        let cone = VisionCone::HUMANOID;
        assert!(!cone.gate(0.0, 0.0, 13.0));
    }

    #[test]
    fn blind_cone_never_gates() {
        assert!(!VisionCone::BLIND.gate(0.0, 0.0, 0.0));
    }

    #[test]
    fn hearing_range_is_sixty_percent_of_vision() {
        assert_eq!(VisionCone::HUMANOID.hearing_range(), 7.2);
    }

    #[test]
    fn clarity_curve_boundaries() {
        assert_eq!(clarity_from_ratio(0.5, true, false), Clarity::Clear);
        assert_eq!(clarity_from_ratio(0.51, true, false), Clarity::Vague);
        assert_eq!(clarity_from_ratio(0.51, false, false), Clarity::Sensed);
        assert_eq!(clarity_from_ratio(0.8, true, false), Clarity::Vague);
        assert_eq!(clarity_from_ratio(0.81, true, false), Clarity::Vague);
        assert_eq!(clarity_from_ratio(1.0, true, false), Clarity::Vague);
        assert_eq!(clarity_from_ratio(1.01, true, false), Clarity::NotPerceived);
    }

    #[test]
    fn auditory_only_steps_clarity_down_one_level() {
        assert_eq!(clarity_from_ratio(0.4, false, true), Clarity::Vague);
        assert_eq!(clarity_from_ratio(0.6, false, true), Clarity::Obscured);
    }

    #[test]
    fn clarity_orders_worst_to_best() {
        assert!(Clarity::NotPerceived < Clarity::Obscured);
        assert!(Clarity::Obscured < Clarity::Sensed);
        assert!(Clarity::Sensed < Clarity::Vague);
        assert!(Clarity::Vague < Clarity::Clear);
    }
}
