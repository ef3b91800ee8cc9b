// Drawing face boxes and emotion labels onto frames

use crate::error::Result;
use crate::models::{FaceRect, Frame};

/// Draws one face annotation directly onto a frame.
pub trait Annotator {
    /// Outlines `rect` and writes `text` just above it, mutating `frame` in place.
    fn annotate(&mut self, frame: &mut Frame, rect: &FaceRect, text: &str) -> Result<()>;
}

#[cfg(feature = "webcam")]
pub use self::opencv_annotator::OpenCvAnnotator;

#[cfg(feature = "webcam")]
mod opencv_annotator {
    use super::Annotator;
    use crate::config::AnnotationStyle;
    use crate::error::{EmotionAnnotatorError, Result};
    use crate::models::{FaceRect, Frame};
    use opencv::core::{Mat, Point, Rect, Scalar};
    use opencv::imgproc;
    use opencv::prelude::*;

    /// Annotator backed by `opencv::imgproc` drawing primitives
    pub struct OpenCvAnnotator {
        style: AnnotationStyle,
    }

    impl OpenCvAnnotator {
        pub fn new(style: AnnotationStyle) -> Self {
            Self { style }
        }

        // Frames are RGB, so the scalar is laid out in the same order
        fn color(&self) -> Scalar {
            let (r, g, b) = self.style.color;
            Scalar::new(f64::from(r), f64::from(g), f64::from(b), 0.0)
        }
    }

    impl Annotator for OpenCvAnnotator {
        fn annotate(&mut self, frame: &mut Frame, rect: &FaceRect, text: &str) -> Result<()> {
            if frame.is_empty() {
                return Err(EmotionAnnotatorError::FrameProcessing(
                    "cannot annotate an empty frame".to_string(),
                ));
            }

            let rows = frame.height as i32;
            let row_bytes = frame.width as i32 * 3;
            // Draw straight into the frame buffer
            let mut flat =
                Mat::new_rows_cols_with_data_mut(rows, row_bytes, frame.data.as_mut_slice())?;
            let mut canvas = flat.reshape_mut(3, rows)?;

            let color = self.color();
            imgproc::rectangle(
                &mut *canvas,
                Rect::new(
                    rect.x as i32,
                    rect.y as i32,
                    rect.width as i32,
                    rect.height as i32,
                ),
                color,
                self.style.thickness,
                imgproc::LINE_8,
                0,
            )?;

            let (text_x, text_y) = rect.label_origin(self.style.label_offset);
            imgproc::put_text(
                &mut *canvas,
                text,
                Point::new(text_x, text_y),
                imgproc::FONT_HERSHEY_SIMPLEX,
                self.style.font_scale,
                color,
                self.style.thickness,
                imgproc::LINE_8,
                false,
            )?;

            Ok(())
        }
    }
}
