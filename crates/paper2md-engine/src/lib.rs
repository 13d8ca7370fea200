pub mod engine_trait;
pub mod mathpix;
pub mod null_engine;
pub mod registry;

pub use engine_trait::RecognitionEngine;
pub use mathpix::{interpret_response, MathpixEngine, OPTIONS_JSON};
pub use null_engine::NullEngine;
pub use registry::EngineRegistry;
