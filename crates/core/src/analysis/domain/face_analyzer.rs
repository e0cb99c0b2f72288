use crate::analysis::domain::face_observation::FaceObservation;
use crate::shared::frame::Frame;

/// What one successful analysis cycle produced.
///
/// The attribute backend reports exactly one face as a bare record and
/// several as a sequence; `into_faces` collapses both shapes at the
/// boundary so the loop only ever handles the sequence form.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisOutcome {
    Single(Box<FaceObservation>),
    Faces(Vec<FaceObservation>),
}

impl AnalysisOutcome {
    pub fn into_faces(self) -> Vec<FaceObservation> {
        match self {
            AnalysisOutcome::Single(face) => vec![*face],
            AnalysisOutcome::Faces(faces) => faces,
        }
    }
}

/// Domain interface for face-attribute inference.
///
/// Finding no faces is a successful outcome with an empty sequence;
/// `Err` is reserved for inference failures.
pub trait FaceAnalyzer: Send {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisOutcome, Box<dyn std::error::Error>>;
}
