use crate::shared::region::Region;

/// One detected face with its estimated attributes.
///
/// Produced in detection order; the position in the result set is not a
/// stable identity across analysis cycles.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    pub region: Region,
    pub dominant_emotion: String,
    pub age: AgeReading,
    pub gender: GenderReading,
}

/// Gender output as delivered by the attribute backend.
///
/// `Scored` carries per-class probabilities in model output order;
/// `Label` carries anything that already arrived as plain text.
#[derive(Clone, Debug, PartialEq)]
pub enum GenderReading {
    Scored(Vec<(String, f32)>),
    Label(String),
}

impl GenderReading {
    /// Resolve to the class label with the highest probability.
    ///
    /// Ties keep the earliest entry in stored order. A `Label` resolves
    /// to its text unchanged.
    pub fn resolved(&self) -> String {
        match self {
            GenderReading::Label(text) => text.clone(),
            GenderReading::Scored(scores) => {
                let mut best: Option<&(String, f32)> = None;
                for entry in scores {
                    let better = match best {
                        Some(current) => entry.1 > current.1,
                        None => true,
                    };
                    if better {
                        best = Some(entry);
                    }
                }
                match best {
                    Some((label, _)) => label.clone(),
                    None => "N/A".to_string(),
                }
            }
        }
    }
}

/// Age output: numeric estimates format as whole years (truncated),
/// anything else passes through as-is.
#[derive(Clone, Debug, PartialEq)]
pub enum AgeReading {
    Years(f32),
    Text(String),
}

impl AgeReading {
    pub fn formatted(&self) -> String {
        match self {
            AgeReading::Years(years) => format!("{}", *years as i32),
            AgeReading::Text(text) => text.clone(),
        }
    }
}
