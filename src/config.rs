// Runtime configuration for the emotion annotator

use crate::error::{EmotionAnnotatorError, Result};
use crate::models::EmotionLabel;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the Haar cascade path
pub const CASCADE_PATH_ENV: &str = "EMOTION_ANNOTATOR_CASCADE";
/// Environment variable overriding the ONNX emotion model path
pub const MODEL_PATH_ENV: &str = "EMOTION_ANNOTATOR_MODEL";

/// File name of the stock frontal-face cascade shipped with OpenCV
pub const CASCADE_FILE: &str = "haarcascade_frontalface_default.xml";

/// Where OpenCV packages install their bundled Haar cascades
const OPENCV_CASCADE_DIRS: [&str; 5] = [
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/opt/homebrew/share/opencv4/haarcascades",
    "C:/tools/opencv/build/etc/haarcascades",
];

/// Top-level application configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Index of the capture device (0 is the system default camera)
    pub camera_index: u32,
    /// Title of the preview window
    pub window_title: String,
    /// Key that ends the loop
    pub exit_key: char,
    /// How long each iteration waits for a keypress
    pub key_poll: Duration,
    pub models: ModelPaths,
    pub detector: DetectorConfig,
    pub classifier: ClassifierConfig,
    pub style: AnnotationStyle,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            window_title: "Reconhecimento de Emoções".to_string(),
            exit_key: 'q',
            key_poll: Duration::from_millis(1),
            models: ModelPaths::default(),
            detector: DetectorConfig::default(),
            classifier: ClassifierConfig::default(),
            style: AnnotationStyle::default(),
        }
    }
}

impl AppConfig {
    /// Default configuration with model paths taken from the environment
    /// when set.
    pub fn from_env() -> Self {
        Self {
            models: ModelPaths::from_env(),
            ..Self::default()
        }
    }

    /// Checks the settings that the external libraries would otherwise
    /// reject at run time (or silently misbehave on).
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.classifier.validate()?;
        if self.key_poll.is_zero() {
            return Err(EmotionAnnotatorError::Config(
                "key poll timeout must be at least 1 ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Locations of the two model assets loaded at startup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelPaths {
    pub cascade: PathBuf,
    pub emotion: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            cascade: Path::new("assets/models").join(CASCADE_FILE),
            emotion: PathBuf::from("assets/models/emotion.onnx"),
        }
    }
}

impl ModelPaths {
    /// Paths from the environment overrides. Without an override, the
    /// cascade comes from `assets/models/` or, failing that, from the
    /// cascades bundled with the OpenCV install.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), Path::is_file)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        exists: impl Fn(&Path) -> bool,
    ) -> Self {
        let defaults = Self::default();
        let override_for = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        };
        Self {
            cascade: override_for(CASCADE_PATH_ENV)
                .unwrap_or_else(|| installed_cascade(defaults.cascade, &exists)),
            emotion: override_for(MODEL_PATH_ENV).unwrap_or(defaults.emotion),
        }
    }
}

fn installed_cascade(local: PathBuf, exists: impl Fn(&Path) -> bool) -> PathBuf {
    if exists(local.as_path()) {
        return local;
    }
    OPENCV_CASCADE_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(CASCADE_FILE))
        .find(|candidate| exists(candidate.as_path()))
        .unwrap_or(local)
}

/// Multiscale cascade settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Image pyramid step between scales (must be > 1.0)
    pub scale_factor: f64,
    /// Neighbouring detections needed to keep a candidate; higher is stricter
    pub min_neighbors: u32,
    /// Smallest face searched for, in pixels (width, height)
    pub min_size: (u32, u32),
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: (30, 30),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scale_factor.is_nan() || self.scale_factor <= 1.0 {
            return Err(EmotionAnnotatorError::Config(format!(
                "scale factor must be greater than 1.0, got {}",
                self.scale_factor
            )));
        }
        if self.min_size.0 == 0 || self.min_size.1 == 0 {
            return Err(EmotionAnnotatorError::Config(format!(
                "minimum face size must be positive, got {}x{}",
                self.min_size.0, self.min_size.1
            )));
        }
        Ok(())
    }
}

/// Pixel layout the emotion model was trained on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Grayscale,
    Rgb,
}

/// What the first model output holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputActivation {
    /// Raw scores; softmax is applied before picking the dominant class
    Logits,
    /// Already a probability distribution
    Probabilities,
}

/// Emotion model input/output description and classification policy
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierConfig {
    /// Square input side expected by the model
    pub input_size: u32,
    pub color_mode: ColorMode,
    pub activation: OutputActivation,
    /// Label for each output index
    pub labels: Vec<EmotionLabel>,
    /// Regions with a side shorter than this are rejected without inference
    pub min_region_side: u32,
    /// Calls slower than this are reported with a warning
    pub slow_call_warning: Duration,
}

impl Default for ClassifierConfig {
    /// FER-2013 style model: 48x48 grayscale, 7 softmax outputs
    fn default() -> Self {
        Self {
            input_size: 48,
            color_mode: ColorMode::Grayscale,
            activation: OutputActivation::Probabilities,
            labels: EmotionLabel::CANONICAL.to_vec(),
            min_region_side: 2,
            slow_call_warning: Duration::from_millis(500),
        }
    }
}

impl ClassifierConfig {
    /// HSEmotion (EfficientNet-B2) layout: 260x260 RGB, 8 logits with contempt last
    pub fn hsemotion() -> Self {
        let mut labels = EmotionLabel::CANONICAL.to_vec();
        labels.push(EmotionLabel::Other("contempt".to_string()));
        Self {
            input_size: 260,
            color_mode: ColorMode::Rgb,
            activation: OutputActivation::Logits,
            labels,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(EmotionAnnotatorError::Config(
                "classifier input size must be positive".to_string(),
            ));
        }
        if self.labels.is_empty() {
            return Err(EmotionAnnotatorError::Config(
                "classifier needs at least one output label".to_string(),
            ));
        }
        Ok(())
    }
}

/// Drawing style for boxes and labels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnnotationStyle {
    /// Colour as (r, g, b)
    pub color: (u8, u8, u8),
    pub thickness: i32,
    pub font_scale: f64,
    /// Distance of the text baseline above the box
    pub label_offset: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: (0, 255, 0),
            thickness: 2,
            font_scale: 0.9,
            label_offset: 10,
        }
    }
}
