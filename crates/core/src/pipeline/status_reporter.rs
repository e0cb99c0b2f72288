use chrono::Local;

use crate::analysis::domain::face_observation::FaceObservation;

/// Observer for loop lifecycle events.
///
/// Decouples the loop from stdout so tests and embedders can capture
/// events without scraping output.
pub trait StatusReporter: Send {
    /// A new result set was computed.
    fn analysis_complete(&mut self, observations: &[FaceObservation]);

    /// An analysis cycle failed; the previous result set stays active.
    fn analysis_failed(&mut self, detail: &str);

    /// The frame source stopped yielding frames.
    fn capture_failed(&mut self);
}

/// Reporter that prints the product's line-oriented status contract.
pub struct StdoutStatusReporter;

impl StatusReporter for StdoutStatusReporter {
    fn analysis_complete(&mut self, observations: &[FaceObservation]) {
        let timestamp = Local::now().format("%H:%M:%S").to_string();
        for (idx, obs) in observations.iter().enumerate() {
            println!("{}", person_line(&timestamp, idx + 1, obs));
        }
    }

    fn analysis_failed(&mut self, detail: &str) {
        println!("⚠️ Analysis error: {detail}");
    }

    fn capture_failed(&mut self) {
        println!("❌ ERROR: Cannot read frame from webcam.");
    }
}

fn person_line(timestamp: &str, person: usize, obs: &FaceObservation) -> String {
    format!(
        "[{timestamp}] Person {person}; Gender: {}; Emotion: {}; Age: {}",
        obs.gender.resolved(),
        obs.dominant_emotion,
        obs.age.formatted()
    )
}

/// Silent reporter for tests and embedding.
pub struct NullStatusReporter;

impl StatusReporter for NullStatusReporter {
    fn analysis_complete(&mut self, _observations: &[FaceObservation]) {}
    fn analysis_failed(&mut self, _detail: &str) {}
    fn capture_failed(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::face_observation::{AgeReading, GenderReading};
    use crate::shared::region::Region;

    fn observation() -> FaceObservation {
        FaceObservation {
            region: Region::new(0, 0, 10, 10),
            dominant_emotion: "happy".to_string(),
            age: AgeReading::Years(29.6),
            gender: GenderReading::Scored(vec![
                ("Woman".to_string(), 0.9),
                ("Man".to_string(), 0.1),
            ]),
        }
    }

    #[test]
    fn test_person_line_format() {
        let line = person_line("12:34:56", 1, &observation());
        assert_eq!(line, "[12:34:56] Person 1; Gender: Woman; Emotion: happy; Age: 29");
    }

    #[test]
    fn test_null_reporter_is_noop() {
        let mut reporter = NullStatusReporter;
        reporter.analysis_complete(&[observation()]);
        reporter.analysis_failed("boom");
        reporter.capture_failed();
        // No panics = success
    }
}
