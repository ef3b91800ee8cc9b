// Library exports for the webcam emotion annotator

pub mod annotate;
pub mod camera;
pub mod config;
pub mod controller;
pub mod emotion;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod translate;
pub mod ui;

pub use config::AppConfig;
pub use controller::{LoopController, LoopState, RunSummary, TerminationReason};
pub use error::{ClassificationFailure, EmotionAnnotatorError, Result};
pub use models::{EmotionLabel, EmotionResult, FaceRect, Frame};
pub use pipeline::{EmotionPipeline, FrameReport};
pub use translate::translate;
