//! Social interest score (spec.md §4.6 "Social interest score (0-100)").

use once_cell::sync::Lazy;
use regex_lite::Regex;
use taleforge_domain::entities::{clamp_score, EntityRecord};
use taleforge_domain::ids::ActorRef;

static GOSSIP_KEYWORDS: &[&str] = &["heard", "secret", "rumor", "word is", "they say"];
static FAREWELL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)goodbye|bye|farewell|see you|later|until").expect("valid regex"));

pub fn is_farewell(message: &str) -> bool {
    FAREWELL_PATTERN.is_match(message)
}

pub struct SocialScoreInput<'a> {
    pub observer: &'a EntityRecord,
    pub speaker: ActorRef,
    pub message: &'a str,
    pub distance: f64,
    pub volume_range: f64,
    pub directly_addressed: bool,
    pub is_whisper: bool,
    pub is_shout: bool,
    pub interest_keywords: &'a [&'a str],
}

/// Additive contributions clamped to 100 (spec.md §4.6): base curiosity
/// x3; professional stake (shopkeepers in their shop: +40, direct-address
/// bonus +20); distance factor `(1 - distance/volume_range) x 20`; content
/// keyword hits +20 each; relationship fondness x2; gossip tendency
/// triggers on keywords (+15); suspiciousness on whisper (+15); shout
/// attracts (+10).
pub fn social_interest_score(input: &SocialScoreInput<'_>) -> u8 {
    let Some(personality) = &input.observer.personality else {
        return 0;
    };

    let mut score = personality.curiosity * 3.0;

    if personality.is_shopkeeper() {
        score += 40.0;
        if input.directly_addressed {
            score += 20.0;
        }
    }

    let proximity = (1.0 - (input.distance / input.volume_range.max(f64::EPSILON))).max(0.0);
    score += proximity as f32 * 20.0;

    let lowercase = input.message.to_lowercase();
    for keyword in input.interest_keywords {
        if lowercase.contains(&keyword.to_lowercase()) {
            score += 20.0;
        }
    }

    score += personality.fondness_for(input.speaker) * 2.0;

    if personality.gossip_tendency > 0.0 && GOSSIP_KEYWORDS.iter().any(|k| lowercase.contains(k)) {
        score += 15.0;
    }

    if input.is_whisper && personality.suspiciousness > 0.0 {
        score += 15.0;
    }

    if input.is_shout {
        score += 10.0;
    }

    clamp_score(score.round() as i32)
}

/// Response type thresholds (spec.md §4.6: "join (>=70), eavesdrop (>=40),
/// or ignore").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialResponse {
    Join,
    Eavesdrop,
    Ignore,
}

pub fn classify(score: u8) -> SocialResponse {
    if score >= 70 {
        SocialResponse::Join
    } else if score >= 40 {
        SocialResponse::Eavesdrop
    } else {
        SocialResponse::Ignore
    }
}
