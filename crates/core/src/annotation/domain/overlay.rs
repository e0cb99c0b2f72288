use crate::analysis::domain::face_observation::FaceObservation;
use crate::shared::region::Region;

/// One rectangle-plus-label to draw over a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub region: Region,
    pub label: String,
}

/// Build overlays for a result set, one per face in detection order.
///
/// Labels carry a 1-based person index: `P1: Woman, happy, 29`.
pub fn build_overlays(observations: &[FaceObservation]) -> Vec<Overlay> {
    observations
        .iter()
        .enumerate()
        .map(|(idx, obs)| Overlay {
            region: obs.region.clone(),
            label: format!(
                "P{}: {}, {}, {}",
                idx + 1,
                obs.gender.resolved(),
                obs.dominant_emotion,
                obs.age.formatted()
            ),
        })
        .collect()
}
