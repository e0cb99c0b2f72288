use std::path::PathBuf;
use std::process;

use facewatch_core::analysis::infrastructure::model_resolver;
use facewatch_core::analysis::infrastructure::onnx_face_analyzer::OnnxFaceAnalyzer;
use facewatch_core::annotation::infrastructure::highgui_window::HighguiWindow;
use facewatch_core::capture::infrastructure::opencv_camera::OpenCvCamera;
use facewatch_core::pipeline::live_annotation_use_case::{LiveAnnotationUseCase, LoopEnd};
use facewatch_core::pipeline::status_reporter::StdoutStatusReporter;
use facewatch_core::shared::constants::{
    AGE_MODEL_NAME, AGE_MODEL_URL, ANALYSIS_INTERVAL, DEFAULT_DEVICE_INDEX, EMOTION_MODEL_NAME,
    EMOTION_MODEL_URL, FACE_MODEL_NAME, FACE_MODEL_URL, GENDER_MODEL_NAME, GENDER_MODEL_URL,
    WINDOW_TITLE,
};

fn main() {
    env_logger::init();

    println!("🚀 Starting webcam emotion + age + gender detector...");

    match run() {
        Ok(LoopEnd::Quit) => println!("👋 Exiting webcam."),
        Ok(LoopEnd::SourceExhausted) => {}
        Err(e) => {
            println!("❌ ERROR: {e}");
            process::exit(1);
        }
    }
}

fn run() -> Result<LoopEnd, Box<dyn std::error::Error>> {
    let camera = OpenCvCamera::open(DEFAULT_DEVICE_INDEX)?;

    let face_model = resolve_model(FACE_MODEL_NAME, FACE_MODEL_URL)?;
    let emotion_model = resolve_model(EMOTION_MODEL_NAME, EMOTION_MODEL_URL)?;
    let age_model = resolve_model(AGE_MODEL_NAME, AGE_MODEL_URL)?;
    let gender_model = resolve_model(GENDER_MODEL_NAME, GENDER_MODEL_URL)?;
    let analyzer = OnnxFaceAnalyzer::new(&face_model, &emotion_model, &age_model, &gender_model)?;

    let mut use_case = LiveAnnotationUseCase::new(
        Box::new(camera),
        Box::new(analyzer),
        Box::new(HighguiWindow::new(WINDOW_TITLE)),
        Box::new(StdoutStatusReporter),
        ANALYSIS_INTERVAL,
    );
    use_case.run()
}

fn resolve_model(name: &str, url: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let already_cached = model_resolver::model_cache_dir()?.join(name).exists();
    let path = model_resolver::resolve(name, url, Some(Box::new(download_progress)))?;
    if !already_cached {
        eprintln!();
    }
    Ok(path)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face analysis model... {pct}%");
    } else {
        eprint!("\rDownloading face analysis model... {downloaded} bytes");
    }
}
