// Face detection and emotion classification

use crate::config::{ClassifierConfig, ColorMode, OutputActivation};
use crate::error::ClassificationFailure;
use crate::models::{EmotionLabel, EmotionResult, FaceRect, Frame};
use image::imageops::{self, FilterType};
use ndarray::Array4;

/// Locates faces in a frame.
pub trait FaceDetector {
    /// Returns the face rectangles found in `frame`, all inside its bounds.
    /// An empty vector is a normal result.
    fn detect(&mut self, frame: &Frame) -> Vec<FaceRect>;
}

/// Infers the dominant emotion of a face crop.
pub trait EmotionClassifier {
    fn classify(&mut self, region: &Frame) -> Result<EmotionResult, ClassificationFailure>;
}

/// Turns a face crop into the NCHW tensor the model expects.
///
/// Pixels are resized (bilinear) to `input_size` x `input_size`, converted to
/// the configured colour mode and scaled to [0, 1].
pub fn preprocess_face(
    region: &Frame,
    config: &ClassifierConfig,
) -> Result<Array4<f32>, ClassificationFailure> {
    if region.width < config.min_region_side || region.height < config.min_region_side {
        return Err(ClassificationFailure::DegenerateRegion {
            width: region.width,
            height: region.height,
        });
    }

    let rgb = region.to_rgb_image().ok_or_else(|| {
        ClassificationFailure::Preprocess(format!(
            "buffer of {} bytes does not match {}x{} RGB",
            region.data.len(),
            region.width,
            region.height
        ))
    })?;

    let size = config.input_size;
    let side = size as usize;

    let tensor = match config.color_mode {
        ColorMode::Grayscale => {
            let gray = imageops::grayscale(&rgb);
            let resized = imageops::resize(&gray, size, size, FilterType::Triangle);
            Array4::from_shape_fn((1, 1, side, side), |(_, _, y, x)| {
                resized.get_pixel(x as u32, y as u32).0[0] as f32 / 255.0
            })
        }
        ColorMode::Rgb => {
            let resized = imageops::resize(&rgb, size, size, FilterType::Triangle);
            Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
                resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
            })
        }
    };

    Ok(tensor)
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();
    logits
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .collect()
}

/// Builds the classification result from raw model output.
///
/// A batched `[N, C]` output is reduced to its first row, so callers always
/// get zero or one result per region.
pub fn scores_to_result(
    raw: &[f32],
    labels: &[EmotionLabel],
    activation: OutputActivation,
) -> Result<EmotionResult, ClassificationFailure> {
    if raw.is_empty() || labels.is_empty() {
        return Err(ClassificationFailure::EmptyOutput);
    }
    if raw.len() % labels.len() != 0 {
        return Err(ClassificationFailure::LabelCount {
            expected: labels.len(),
            actual: raw.len(),
        });
    }

    let row = &raw[..labels.len()];
    let probabilities = match activation {
        OutputActivation::Logits => softmax(row),
        OutputActivation::Probabilities => row.to_vec(),
    };

    let (max_idx, max_prob) = probabilities
        .iter()
        .copied()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or(ClassificationFailure::EmptyOutput)?;

    let scores = labels.iter().cloned().zip(probabilities).collect();
    Ok(EmotionResult::new(labels[max_idx].clone(), max_prob, scores))
}

#[cfg(feature = "webcam")]
pub use self::backend::{CascadeFaceDetector, OnnxEmotionClassifier};

#[cfg(feature = "webcam")]
mod backend {
    use super::{preprocess_face, scores_to_result, EmotionClassifier, FaceDetector};
    use crate::config::{ClassifierConfig, DetectorConfig};
    use crate::error::{ClassificationFailure, EmotionAnnotatorError, Result};
    use crate::models::{EmotionResult, FaceRect, Frame};
    use opencv::core::{Mat, Rect, Size, Vector};
    use opencv::imgproc;
    use opencv::objdetect::CascadeClassifier;
    use opencv::prelude::*;
    use ort::session::Session;
    use ort::value::Tensor;
    use std::path::Path;
    use tracing::{error, info, warn};

    /// Face detector using an OpenCV Haar cascade
    pub struct CascadeFaceDetector {
        classifier: CascadeClassifier,
        config: DetectorConfig,
    }

    impl CascadeFaceDetector {
        /// Loads the cascade from `cascade_path`
        pub fn new(cascade_path: &Path, config: DetectorConfig) -> Result<Self> {
            config.validate()?;

            if !cascade_path.is_file() {
                return Err(EmotionAnnotatorError::ModelLoad(format!(
                    "Haar cascade not found at {}",
                    cascade_path.display()
                )));
            }

            let classifier =
                CascadeClassifier::new(&cascade_path.to_string_lossy()).map_err(|e| {
                    error!("Failed to load Haar Cascade: {}", e);
                    EmotionAnnotatorError::ModelLoad(format!("Haar Cascade load failed: {e}"))
                })?;

            if classifier.empty()? {
                return Err(EmotionAnnotatorError::ModelLoad(
                    "Haar Cascade classifier is empty".to_string(),
                ));
            }

            info!("Loaded face cascade from {}", cascade_path.display());
            Ok(Self { classifier, config })
        }

        fn try_detect(&mut self, frame: &Frame) -> Result<Vec<FaceRect>> {
            if frame.is_empty() {
                return Ok(Vec::new());
            }

            let mat = Mat::from_slice(&frame.data)?;
            let mat = mat.reshape(3, frame.height as i32)?;

            // The cascade works on intensity only
            let mut gray = Mat::default();
            imgproc::cvt_color_def(&mat, &mut gray, imgproc::COLOR_RGB2GRAY)?;

            let (min_w, min_h) = self.config.min_size;
            let mut faces = Vector::<Rect>::new();
            self.classifier
                .detect_multi_scale(
                    &gray,
                    &mut faces,
                    self.config.scale_factor,
                    self.config.min_neighbors as i32,
                    0,
                    Size::new(min_w as i32, min_h as i32),
                    Size::new(0, 0), // no upper bound
                )
                .map_err(|e| {
                    EmotionAnnotatorError::FaceDetection(format!("Cascade detection failed: {e}"))
                })?;

            Ok(faces
                .iter()
                .filter_map(|r| {
                    FaceRect::clamped_to(r.x, r.y, r.width, r.height, frame.width, frame.height)
                })
                .collect())
        }
    }

    impl FaceDetector for CascadeFaceDetector {
        fn detect(&mut self, frame: &Frame) -> Vec<FaceRect> {
            match self.try_detect(frame) {
                Ok(faces) => faces,
                Err(e) => {
                    warn!("Face detection failed, treating frame as empty: {}", e);
                    Vec::new()
                }
            }
        }
    }

    /// Emotion classifier using ONNX Runtime
    pub struct OnnxEmotionClassifier {
        session: Session,
        config: ClassifierConfig,
    }

    impl OnnxEmotionClassifier {
        /// Creates a new classifier by loading the ONNX model
        pub fn new(model_path: &Path, config: ClassifierConfig) -> Result<Self> {
            config.validate()?;

            let session = Session::builder()
                .map_err(|e| {
                    EmotionAnnotatorError::ModelLoad(format!(
                        "Failed to create session builder: {e}"
                    ))
                })?
                .commit_from_file(model_path)
                .map_err(|e| {
                    error!("Failed to load ONNX model: {}", e);
                    EmotionAnnotatorError::ModelLoad(format!(
                        "ONNX model load failed ({}): {e}",
                        model_path.display()
                    ))
                })?;

            info!(
                "Loaded emotion model from {} ({}x{}, {} classes)",
                model_path.display(),
                config.input_size,
                config.input_size,
                config.labels.len()
            );
            Ok(Self { session, config })
        }
    }

    impl EmotionClassifier for OnnxEmotionClassifier {
        fn classify(
            &mut self,
            region: &Frame,
        ) -> std::result::Result<EmotionResult, ClassificationFailure> {
            let input = preprocess_face(region, &self.config)?;
            let input_tensor = Tensor::from_array(input)?;

            let outputs = self.session.run(ort::inputs![input_tensor])?;

            // Only the first output carries the class scores
            let (_, output_value) = outputs
                .iter()
                .next()
                .ok_or(ClassificationFailure::EmptyOutput)?;
            let (_, scores) = output_value.try_extract_tensor::<f32>()?;

            scores_to_result(scores, &self.config.labels, self.config.activation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn softmax_sums_to_one_and_keeps_order() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert_relative_eq!(probs.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
        assert_relative_eq!(probs[2], 0.665_240_96, epsilon = 1e-5);
    }

    #[test]
    fn softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert_relative_eq!(probs[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn dominant_emotion_is_arg_max() {
        let labels = EmotionLabel::CANONICAL.to_vec();
        let raw = [0.05, 0.0, 0.05, 0.1, 0.6, 0.1, 0.1];

        let result = scores_to_result(&raw, &labels, OutputActivation::Probabilities).unwrap();

        assert_eq!(result.label, EmotionLabel::Sad);
        assert_relative_eq!(result.confidence, 0.6);
        assert_eq!(result.scores.len(), 7);
        assert_eq!(result.scores[3], (EmotionLabel::Happy, 0.1));
    }

    #[test]
    fn batched_output_uses_first_row() {
        let labels = vec![EmotionLabel::Happy, EmotionLabel::Sad];
        let raw = [0.0, 4.0, 9.0, 0.0];

        let result = scores_to_result(&raw, &labels, OutputActivation::Logits).unwrap();

        assert_eq!(result.label, EmotionLabel::Sad);
        assert!(result.confidence > 0.98);
    }

    #[test]
    fn mismatched_output_is_a_failure() {
        let labels = EmotionLabel::CANONICAL.to_vec();
        assert_eq!(
            scores_to_result(&[0.5; 5], &labels, OutputActivation::Probabilities),
            Err(ClassificationFailure::LabelCount {
                expected: 7,
                actual: 5
            })
        );
        assert_eq!(
            scores_to_result(&[], &labels, OutputActivation::Probabilities),
            Err(ClassificationFailure::EmptyOutput)
        );
    }

    #[test]
    fn one_pixel_region_is_degenerate() {
        let region = Frame::filled(1, 1, [10, 20, 30]);
        assert_eq!(
            preprocess_face(&region, &ClassifierConfig::default()),
            Err(ClassificationFailure::DegenerateRegion {
                width: 1,
                height: 1
            })
        );
    }

    #[test]
    fn grayscale_tensor_shape_and_range() {
        let region = Frame::filled(31, 17, [255, 255, 255]);
        let tensor = preprocess_face(&region, &ClassifierConfig::default()).unwrap();

        assert_eq!(tensor.shape(), &[1, 1, 48, 48]);
        assert!(tensor.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn rgb_tensor_is_channel_first() {
        let config = ClassifierConfig {
            input_size: 8,
            ..ClassifierConfig::hsemotion()
        };
        let region = Frame::filled(4, 4, [255, 0, 51]);
        let tensor = preprocess_face(&region, &config).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
        assert_relative_eq!(tensor[[0, 0, 3, 3]], 1.0, epsilon = 1e-3);
        assert_relative_eq!(tensor[[0, 1, 3, 3]], 0.0, epsilon = 1e-3);
        assert_relative_eq!(tensor[[0, 2, 3, 3]], 0.2, epsilon = 1e-3);
    }
}
