pub mod blazeface_locator;
pub mod execution_provider;
pub mod model_resolver;
pub mod onnx_face_analyzer;
