// Error types for the emotion annotator

use thiserror::Error;

/// Main error type for the emotion annotator.
///
/// Everything here is fatal for the run: startup failures (camera, models,
/// configuration) and display failures while running.
#[derive(Debug, Error)]
pub enum EmotionAnnotatorError {
    #[error("Camera initialization failed: {0}")]
    CameraInit(String),

    #[error("Frame processing failed: {0}")]
    FrameProcessing(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Face detection failed: {0}")]
    FaceDetection(String),

    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(String),

    #[error("OpenCV error: {0}")]
    OpenCV(String),

    #[error("Display error: {0}")]
    Display(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for emotion annotator operations
pub type Result<T> = std::result::Result<T, EmotionAnnotatorError>;

/// Why a single face could not be classified.
///
/// Never fatal: the face is left unannotated on that frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationFailure {
    #[error("region {width}x{height} is too small to classify")]
    DegenerateRegion { width: u32, height: u32 },

    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model produced no scores")]
    EmptyOutput,

    #[error("model produced {actual} scores but {expected} labels are configured")]
    LabelCount { expected: usize, actual: usize },
}

// Conversion from nokhwa errors
#[cfg(feature = "webcam")]
impl From<nokhwa::NokhwaError> for EmotionAnnotatorError {
    fn from(err: nokhwa::NokhwaError) -> Self {
        match err {
            nokhwa::NokhwaError::StructureError { structure, error } => {
                EmotionAnnotatorError::CameraInit(format!("{structure}: {error}"))
            }
            nokhwa::NokhwaError::OpenDeviceError(device, error) => {
                EmotionAnnotatorError::CameraInit(format!("Device {device}: {error}"))
            }
            nokhwa::NokhwaError::GetPropertyError { property, error } => {
                EmotionAnnotatorError::CameraInit(format!("Property {property}: {error}"))
            }
            _ => EmotionAnnotatorError::CameraInit(err.to_string()),
        }
    }
}

// Conversion from OpenCV errors
#[cfg(feature = "webcam")]
impl From<opencv::Error> for EmotionAnnotatorError {
    fn from(err: opencv::Error) -> Self {
        EmotionAnnotatorError::OpenCV(err.to_string())
    }
}

// Conversion from ONNX Runtime errors
#[cfg(feature = "webcam")]
impl From<ort::Error> for EmotionAnnotatorError {
    fn from(err: ort::Error) -> Self {
        EmotionAnnotatorError::OnnxRuntime(err.to_string())
    }
}

#[cfg(feature = "webcam")]
impl From<opencv::Error> for ClassificationFailure {
    fn from(err: opencv::Error) -> Self {
        ClassificationFailure::Preprocess(err.to_string())
    }
}

#[cfg(feature = "webcam")]
impl From<ort::Error> for ClassificationFailure {
    fn from(err: ort::Error) -> Self {
        ClassificationFailure::Inference(err.to_string())
    }
}
