mod sense;

pub use sense::{clarity_from_ratio, Clarity, Sense, VisionCone};
