//! Threat/interest/urgency scoring (spec.md §4.5 "Threat/interest/urgency"):
//! tabled per verb, then adjusted by proximity and clarity, clamped to
//! `[0,100]`.

use taleforge_domain::entities::{clamp_score, Verb};
use taleforge_domain::value_objects::Clarity;

#[derive(Debug, Clone, Copy)]
pub struct BaseScore {
    pub threat: i32,
    pub interest: i32,
    pub urgency: i32,
}

/// The per-verb table (spec.md §4.5: "Tabled per verb").
pub fn base_scores(verb: Verb) -> BaseScore {
    match verb {
        Verb::Attack => BaseScore { threat: 70, interest: 50, urgency: 60 },
        Verb::Cast => BaseScore { threat: 60, interest: 55, urgency: 50 },
        Verb::Flee => BaseScore { threat: 40, interest: 40, urgency: 50 },
        Verb::Move => BaseScore { threat: 5, interest: 15, urgency: 10 },
        Verb::Travel => BaseScore { threat: 5, interest: 15, urgency: 5 },
        Verb::Communicate => BaseScore { threat: 0, interest: 40, urgency: 10 },
        Verb::Give => BaseScore { threat: 0, interest: 30, urgency: 5 },
        Verb::Use | Verb::PickUp | Verb::Drop | Verb::Equip | Verb::Unequip => {
            BaseScore { threat: 5, interest: 20, urgency: 10 }
        }
        Verb::Guard => BaseScore { threat: 10, interest: 15, urgency: 10 },
        Verb::Rest => BaseScore { threat: 0, interest: 5, urgency: 0 },
        Verb::Examine => BaseScore { threat: 0, interest: 10, urgency: 0 },
    }
}

const CLOSE_DISTANCE: f64 = 2.0;
const FAR_DISTANCE: f64 = 6.0;

/// Proximity and clarity adjustment, then clamp (spec.md §4.5: "adjusted
/// by proximity (close +urgency, far -urgency and -threat) and by clarity
/// (obscured increases both interest and threat). All three clamped to
/// [0,100]").
pub fn score(verb: Verb, distance: f64, clarity: Clarity) -> (u8, u8, u8) {
    let base = base_scores(verb);
    let mut threat = base.threat;
    let mut interest = base.interest;
    let mut urgency = base.urgency;

    if distance <= CLOSE_DISTANCE {
        urgency += 15;
    } else if distance > FAR_DISTANCE {
        urgency -= 15;
        threat -= 15;
    }

    if clarity == Clarity::Obscured {
        interest += 20;
        threat += 20;
    }

    (clamp_score(threat), clamp_score(interest), clamp_score(urgency))
}
