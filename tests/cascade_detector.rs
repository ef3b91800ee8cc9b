#![cfg(feature = "webcam")]

use emotion_annotator::config::{DetectorConfig, ModelPaths, CASCADE_PATH_ENV};
use emotion_annotator::emotion::{CascadeFaceDetector, FaceDetector};
use emotion_annotator::{EmotionAnnotatorError, Frame};
use std::path::{Path, PathBuf};

/// A single, upright, frontal face photo
const FACE_FIXTURE: &str = "tests/fixtures/frontal_face.png";

fn cascade_path() -> PathBuf {
    let path = ModelPaths::from_env().cascade;
    assert!(
        path.is_file(),
        "no Haar cascade at {}; install OpenCV's bundled cascades or set {}",
        path.display(),
        CASCADE_PATH_ENV
    );
    path
}

fn detector() -> CascadeFaceDetector {
    CascadeFaceDetector::new(&cascade_path(), DetectorConfig::default()).unwrap()
}

fn face_frame() -> Frame {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(FACE_FIXTURE);
    let image = image::open(&path)
        .unwrap_or_else(|e| panic!("cannot read face fixture {}: {e}", path.display()))
        .to_rgb8();
    let (width, height) = image.dimensions();
    Frame::new(image.into_raw(), width, height)
}

#[test]
fn missing_cascade_is_a_model_load_error() {
    let result =
        CascadeFaceDetector::new(Path::new("does/not/exist.xml"), DetectorConfig::default());
    assert!(matches!(result, Err(EmotionAnnotatorError::ModelLoad(_))));
}

#[test]
fn blank_frame_has_no_faces() {
    let faces = detector().detect(&Frame::filled(320, 240, [128, 128, 128]));

    assert!(faces.is_empty());
}

#[test]
fn empty_frame_has_no_faces() {
    assert!(detector().detect(&Frame::new(Vec::new(), 0, 0)).is_empty());
}

#[test]
fn single_frontal_face_gives_one_rect() {
    let frame = face_frame();

    let faces = detector().detect(&frame);

    assert_eq!(faces.len(), 1, "{faces:?}");
    let face = faces[0];
    assert!(face.contained_in(frame.width, frame.height), "{face:?}");
    assert!(face.width >= 30 && face.height >= 30, "{face:?}");
}
