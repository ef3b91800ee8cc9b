// Per-frame detect -> classify -> translate -> annotate pipeline

use crate::annotate::Annotator;
use crate::emotion::{EmotionClassifier, FaceDetector};
use crate::models::Frame;
use crate::translate::translate_label;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What happened to one frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Faces returned by the detector
    pub faces: usize,
    /// Faces that received a box and label
    pub annotated: usize,
    /// Faces left unannotated: crop outside the frame, classification or
    /// drawing failed
    pub skipped: usize,
}

/// Runs detection, classification and annotation for a single frame.
///
/// Failures are contained per face: a face that cannot be classified (or
/// drawn) is skipped and the remaining faces are still processed.
pub struct EmotionPipeline<D, C, A> {
    detector: D,
    classifier: C,
    annotator: A,
    slow_call_warning: Duration,
}

impl<D, C, A> EmotionPipeline<D, C, A>
where
    D: FaceDetector,
    C: EmotionClassifier,
    A: Annotator,
{
    pub fn new(detector: D, classifier: C, annotator: A) -> Self {
        Self {
            detector,
            classifier,
            annotator,
            slow_call_warning: Duration::from_millis(500),
        }
    }

    /// Classification calls slower than `threshold` are logged as warnings.
    pub fn with_slow_call_warning(mut self, threshold: Duration) -> Self {
        self.slow_call_warning = threshold;
        self
    }

    pub fn annotator(&self) -> &A {
        &self.annotator
    }

    /// Processes one frame, drawing annotations onto it in place
    pub fn process_frame(&mut self, frame: &mut Frame) -> FrameReport {
        let faces = self.detector.detect(frame);
        let mut report = FrameReport {
            faces: faces.len(),
            ..FrameReport::default()
        };

        for rect in faces {
            let Some(region) = frame.crop(&rect) else {
                debug!(
                    "Face {:?} lies outside the {}x{} frame",
                    rect, frame.width, frame.height
                );
                report.skipped += 1;
                continue;
            };

            let started = Instant::now();
            let outcome = self.classifier.classify(&region);
            let elapsed = started.elapsed();
            if elapsed > self.slow_call_warning {
                warn!(
                    "Emotion classification took {} ms for a {}x{} face",
                    elapsed.as_millis(),
                    rect.width,
                    rect.height
                );
            }

            let result = match outcome {
                Ok(result) => result,
                Err(failure) => {
                    debug!("Skipping face at {:?}: {}", rect, failure);
                    report.skipped += 1;
                    continue;
                }
            };

            debug!("Face at {:?}: {}", rect, result);
            let text = translate_label(&result.label);
            match self.annotator.annotate(frame, &rect, text) {
                Ok(()) => report.annotated += 1,
                Err(e) => {
                    debug!("Could not annotate face at {:?}: {}", rect, e);
                    report.skipped += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::emotion::preprocess_face;
    use crate::error::{ClassificationFailure, EmotionAnnotatorError, Result};
    use crate::models::{EmotionLabel, EmotionResult, FaceRect};

    struct FixedDetector(Vec<FaceRect>);

    impl FaceDetector for FixedDetector {
        fn detect(&mut self, _frame: &Frame) -> Vec<FaceRect> {
            self.0.clone()
        }
    }

    /// Fails on tiny regions, otherwise reports the configured label
    struct SizeAwareClassifier {
        label: EmotionLabel,
        seen: Vec<(u32, u32)>,
    }

    impl EmotionClassifier for SizeAwareClassifier {
        fn classify(
            &mut self,
            region: &Frame,
        ) -> std::result::Result<EmotionResult, ClassificationFailure> {
            self.seen.push((region.width, region.height));
            if region.width < 2 || region.height < 2 {
                return Err(ClassificationFailure::DegenerateRegion {
                    width: region.width,
                    height: region.height,
                });
            }
            Ok(EmotionResult::new(self.label.clone(), 0.9, Vec::new()))
        }
    }

    /// Runs the real preprocessing before reporting the configured label
    struct PreprocessingClassifier {
        config: ClassifierConfig,
        label: EmotionLabel,
    }

    impl EmotionClassifier for PreprocessingClassifier {
        fn classify(
            &mut self,
            region: &Frame,
        ) -> std::result::Result<EmotionResult, ClassificationFailure> {
            let tensor = preprocess_face(region, &self.config)?;
            let side = self.config.input_size as usize;
            assert_eq!(tensor.shape(), &[1, 1, side, side]);
            Ok(EmotionResult::new(self.label.clone(), 1.0, Vec::new()))
        }
    }

    #[derive(Default)]
    struct RecordingAnnotator {
        calls: Vec<(FaceRect, String)>,
        fail: bool,
    }

    impl Annotator for RecordingAnnotator {
        fn annotate(&mut self, _frame: &mut Frame, rect: &FaceRect, text: &str) -> Result<()> {
            if self.fail {
                return Err(EmotionAnnotatorError::FrameProcessing("boom".into()));
            }
            self.calls.push((*rect, text.to_string()));
            Ok(())
        }
    }

    fn classifier(label: EmotionLabel) -> SizeAwareClassifier {
        SizeAwareClassifier {
            label,
            seen: Vec::new(),
        }
    }

    #[test]
    fn no_faces_means_no_annotations() {
        let mut pipeline = EmotionPipeline::new(
            FixedDetector(Vec::new()),
            classifier(EmotionLabel::Happy),
            RecordingAnnotator::default(),
        );
        let mut frame = Frame::filled(64, 48, [128, 128, 128]);

        let report = pipeline.process_frame(&mut frame);

        assert_eq!(report, FrameReport::default());
        assert!(pipeline.annotator().calls.is_empty());
    }

    #[test]
    fn degenerate_face_is_skipped_and_next_face_still_annotated() {
        let tiny = FaceRect::new(0, 0, 1, 1);
        let face = FaceRect::new(10, 10, 30, 30);
        let mut pipeline = EmotionPipeline::new(
            FixedDetector(vec![tiny, face]),
            classifier(EmotionLabel::Happy),
            RecordingAnnotator::default(),
        );
        let mut frame = Frame::filled(64, 64, [0, 0, 0]);

        let report = pipeline.process_frame(&mut frame);

        assert_eq!(
            report,
            FrameReport {
                faces: 2,
                annotated: 1,
                skipped: 1
            }
        );
        assert_eq!(pipeline.annotator().calls, vec![(face, "Feliz".to_string())]);
    }

    #[test]
    fn classifier_sees_exact_crop() {
        let face = FaceRect::new(5, 7, 31, 33);
        let mut pipeline = EmotionPipeline::new(
            FixedDetector(vec![face]),
            classifier(EmotionLabel::Neutral),
            RecordingAnnotator::default(),
        );
        let mut frame = Frame::filled(80, 60, [1, 2, 3]);

        pipeline.process_frame(&mut frame);

        assert_eq!(pipeline.classifier.seen, vec![(31, 33)]);
    }

    #[test]
    fn unknown_label_is_drawn_untranslated() {
        let face = FaceRect::new(0, 0, 40, 40);
        let mut pipeline = EmotionPipeline::new(
            FixedDetector(vec![face]),
            classifier(EmotionLabel::Other("contempt".into())),
            RecordingAnnotator::default(),
        );
        let mut frame = Frame::filled(40, 40, [0, 0, 0]);

        pipeline.process_frame(&mut frame);

        assert_eq!(pipeline.annotator().calls[0].1, "contempt");
    }

    #[test]
    fn annotation_failure_is_not_fatal() {
        let mut pipeline = EmotionPipeline::new(
            FixedDetector(vec![FaceRect::new(0, 0, 40, 40)]),
            classifier(EmotionLabel::Sad),
            RecordingAnnotator {
                fail: true,
                ..RecordingAnnotator::default()
            },
        );
        let mut frame = Frame::filled(40, 40, [0, 0, 0]);

        let report = pipeline.process_frame(&mut frame);

        assert_eq!(report.skipped, 1);
        assert_eq!(report.annotated, 0);
    }

    #[test]
    fn out_of_frame_rect_is_skipped() {
        let mut pipeline = EmotionPipeline::new(
            FixedDetector(vec![FaceRect::new(30, 30, 40, 40)]),
            classifier(EmotionLabel::Sad),
            RecordingAnnotator::default(),
        );
        let mut frame = Frame::filled(40, 40, [0, 0, 0]);

        let report = pipeline.process_frame(&mut frame);

        assert_eq!(report.skipped, 1);
        assert!(pipeline.classifier.seen.is_empty());
    }

    #[test]
    fn one_pixel_face_fails_preprocessing_without_stopping_the_frame() {
        let tiny = FaceRect::new(3, 3, 1, 1);
        let face = FaceRect::new(8, 8, 32, 32);
        let mut pipeline = EmotionPipeline::new(
            FixedDetector(vec![tiny, face]),
            PreprocessingClassifier {
                config: ClassifierConfig::default(),
                label: EmotionLabel::Surprise,
            },
            RecordingAnnotator::default(),
        );
        let mut frame = Frame::filled(48, 48, [90, 120, 150]);

        let report = pipeline.process_frame(&mut frame);

        assert_eq!(
            report,
            FrameReport {
                faces: 2,
                annotated: 1,
                skipped: 1
            }
        );
        assert_eq!(
            pipeline.annotator().calls,
            vec![(face, "Surpreso".to_string())]
        );
    }
}
