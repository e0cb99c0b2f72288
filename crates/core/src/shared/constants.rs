use std::time::Duration;

pub const FACE_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/facewatch/facewatch/releases/download/v0.1.0/blazeface_short_range.onnx";

pub const EMOTION_MODEL_NAME: &str = "emotion_fer7.onnx";
pub const EMOTION_MODEL_URL: &str =
    "https://github.com/facewatch/facewatch/releases/download/v0.1.0/emotion_fer7.onnx";

pub const AGE_MODEL_NAME: &str = "age_vgg16.onnx";
pub const AGE_MODEL_URL: &str =
    "https://github.com/facewatch/facewatch/releases/download/v0.1.0/age_vgg16.onnx";

pub const GENDER_MODEL_NAME: &str = "gender_vgg16.onnx";
pub const GENDER_MODEL_URL: &str =
    "https://github.com/facewatch/facewatch/releases/download/v0.1.0/gender_vgg16.onnx";

/// Minimum elapsed time between attribute analysis passes on the live feed.
pub const ANALYSIS_INTERVAL: Duration = Duration::from_secs(2);

pub const DEFAULT_DEVICE_INDEX: i32 = 0;

pub const WINDOW_TITLE: &str = "🎥 Live Multi-Face Emotion/Age/Gender Detection";

/// Key that ends the live session.
pub const QUIT_KEY: char = 'q';

/// Emotion classes in model output order.
pub const EMOTION_LABELS: [&str; 7] = [
    "angry", "disgust", "fear", "happy", "sad", "surprise", "neutral",
];

/// Gender classes in model output order.
pub const GENDER_LABELS: [&str; 2] = ["Woman", "Man"];
