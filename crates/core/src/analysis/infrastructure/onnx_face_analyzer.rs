/// Face-attribute inference using ONNX Runtime via `ort`.
///
/// Localizes faces with BlazeFace, then runs three attribute heads
/// (emotion, age, gender) on a square crop of each face.
use std::path::Path;

use crate::analysis::domain::face_analyzer::{AnalysisOutcome, FaceAnalyzer};
use crate::analysis::domain::face_observation::{AgeReading, FaceObservation, GenderReading};
use crate::analysis::infrastructure::blazeface_locator::{self, BlazefaceLocator};
use crate::analysis::infrastructure::execution_provider::preferred_execution_providers;
use crate::shared::constants::{EMOTION_LABELS, GENDER_LABELS};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Emotion head input resolution (grayscale).
const EMOTION_INPUT_SIZE: u32 = 48;

/// Age and gender head input resolution (RGB).
const ATTRIBUTE_INPUT_SIZE: u32 = 224;

/// Number of bins in the age head's distribution output.
const AGE_BINS: usize = 101;

/// Analyzer backed by four ONNX Runtime sessions: a face localizer plus
/// per-attribute heads.
///
/// Exactly one localized face is reported as `Single`, mirroring the
/// upstream inference contract the loop normalizes at its boundary.
pub struct OnnxFaceAnalyzer {
    locator: BlazefaceLocator,
    emotion: ort::session::Session,
    age: ort::session::Session,
    gender: ort::session::Session,
}

impl OnnxFaceAnalyzer {
    pub fn new(
        face_model: &Path,
        emotion_model: &Path,
        age_model: &Path,
        gender_model: &Path,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            locator: BlazefaceLocator::new(face_model, blazeface_locator::DEFAULT_CONFIDENCE)?,
            emotion: load_session(emotion_model)?,
            age: load_session(age_model)?,
            gender: load_session(gender_model)?,
        })
    }

    fn observe(
        &mut self,
        frame: &Frame,
        region: Region,
    ) -> Result<FaceObservation, Box<dyn std::error::Error>> {
        let crop = square_crop(frame, &region);
        let dominant_emotion = self.dominant_emotion(&crop)?;
        let age = self.estimate_age(&crop)?;
        let gender = self.score_gender(&crop)?;
        Ok(FaceObservation {
            region,
            dominant_emotion,
            age,
            gender,
        })
    }

    fn dominant_emotion(&mut self, crop: &Frame) -> Result<String, Box<dyn std::error::Error>> {
        let scores = run_head(&mut self.emotion, preprocess_gray(crop, EMOTION_INPUT_SIZE))?;
        let idx = argmax(&scores).ok_or("Emotion head returned no scores")?;
        let label = EMOTION_LABELS
            .get(idx)
            .ok_or("Emotion head returned unexpected class count")?;
        Ok((*label).to_string())
    }

    fn estimate_age(&mut self, crop: &Frame) -> Result<AgeReading, Box<dyn std::error::Error>> {
        let scores = run_head(&mut self.age, preprocess_rgb(crop, ATTRIBUTE_INPUT_SIZE))?;
        if scores.len() != AGE_BINS {
            return Err(format!(
                "Age head expected {AGE_BINS} bins, got {}",
                scores.len()
            )
            .into());
        }
        Ok(AgeReading::Years(expected_age(&softmax(&scores))))
    }

    fn score_gender(&mut self, crop: &Frame) -> Result<GenderReading, Box<dyn std::error::Error>> {
        let scores = softmax(&run_head(
            &mut self.gender,
            preprocess_rgb(crop, ATTRIBUTE_INPUT_SIZE),
        )?);
        let scored = GENDER_LABELS
            .iter()
            .zip(scores.iter())
            .map(|(label, p)| ((*label).to_string(), *p))
            .collect();
        Ok(GenderReading::Scored(scored))
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisOutcome, Box<dyn std::error::Error>> {
        let regions = self.locator.locate(frame)?;
        let mut faces = Vec::with_capacity(regions.len());
        for region in regions {
            faces.push(self.observe(frame, region)?);
        }
        if faces.len() == 1 {
            return Ok(AnalysisOutcome::Single(Box::new(faces.swap_remove(0))));
        }
        Ok(AnalysisOutcome::Faces(faces))
    }
}

fn load_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    Ok(ort::session::Session::builder()?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?)
}

/// Run a single-output head and flatten its scores.
fn run_head(
    session: &mut ort::session::Session,
    tensor: ndarray::Array4<f32>,
) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let input_value = ort::value::Tensor::from_array(tensor)?;
    let outputs = session.run(ort::inputs![input_value])?;
    if outputs.len() < 1 {
        return Err("Attribute head produced no outputs".into());
    }
    let output = outputs[0].try_extract_array::<f32>()?;
    Ok(output.iter().copied().collect())
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize to `size × size` and normalize to [0,1] NCHW float32 RGB.
fn preprocess_rgb(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Same resize, collapsed to one luma channel for the emotion head.
fn preprocess_gray(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            let r = src[[src_y, src_x, 0]] as f32;
            let g = src[[src_y, src_x, 1]] as f32;
            let b = src[[src_y, src_x, 2]] as f32;
            tensor[[0, 0, y, x]] = (0.299 * r + 0.587 * g + 0.114 * b) / 255.0;
        }
    }

    tensor
}

/// Extract a square crop centered on the region, clamped to frame bounds.
fn square_crop(frame: &Frame, region: &Region) -> Frame {
    let fw = frame.width() as i32;
    let fh = frame.height() as i32;

    let clamped = region.clamped(frame.width(), frame.height());
    let cx = clamped.x + clamped.width / 2;
    let cy = clamped.y + clamped.height / 2;
    let half = (clamped.width.max(clamped.height) / 2).max(1);

    let x1 = (cx - half).max(0) as usize;
    let y1 = (cy - half).max(0) as usize;
    let x2 = (cx + half).min(fw) as usize;
    let y2 = (cy + half).min(fh) as usize;

    let crop_w = x2 - x1;
    let crop_h = y2 - y1;
    let channels = frame.channels() as usize;

    let src = frame.as_ndarray();
    let mut data = Vec::with_capacity(crop_w * crop_h * channels);

    for row in y1..y2 {
        for col in x1..x2 {
            for c in 0..channels {
                data.push(src[[row, col, c]]);
            }
        }
    }

    Frame::new(data, crop_w as u32, crop_h as u32, channels as u8)
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 {
        return exps;
    }
    exps.iter().map(|e| e / sum).collect()
}

/// Index of the maximum score; ties keep the earliest index.
fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        let better = match best {
            Some((_, current)) => score > current,
            None => true,
        };
        if better {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

/// Expected value of the age distribution: sum of bin index × probability.
fn expected_age(probs: &[f32]) -> f32 {
    probs
        .iter()
        .enumerate()
        .map(|(i, p)| i as f32 * p)
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
