// Preview window for the annotated feed

use crate::error::Result;
use crate::models::Frame;
use std::time::Duration;

/// Display surface presenting frames and reporting keypresses.
pub trait VideoWindow {
    /// Presents `frame` in the window
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// Waits up to `timeout` for a keypress
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>>;

    /// Closes the window. Calling it more than once is a no-op.
    fn close(&mut self);
}

/// Converts a `wait_key` return value into the pressed character, if any.
///
/// Only the low byte identifies the key; modifier bits above it are dropped.
pub fn key_from_code(code: i32) -> Option<char> {
    if code < 0 {
        return None;
    }
    char::from_u32((code & 0xFF) as u32)
}

/// Poll timeout in whole milliseconds, never below 1 so the loop cannot spin
pub fn poll_millis(timeout: Duration) -> i32 {
    timeout.as_millis().clamp(1, i32::MAX as u128) as i32
}

#[cfg(feature = "webcam")]
pub use self::highgui_window::HighGuiWindow;

#[cfg(feature = "webcam")]
mod highgui_window {
    use super::{key_from_code, poll_millis, VideoWindow};
    use crate::error::{EmotionAnnotatorError, Result};
    use crate::models::Frame;
    use opencv::core::Mat;
    use opencv::highgui;
    use opencv::imgproc;
    use opencv::prelude::*;
    use std::time::Duration;
    use tracing::{info, warn};

    /// Titled OpenCV HighGUI window
    pub struct HighGuiWindow {
        title: String,
        is_open: bool,
    }

    impl HighGuiWindow {
        /// Creates the window with the given title
        pub fn open(title: &str) -> Result<Self> {
            highgui::named_window(title, highgui::WINDOW_AUTOSIZE).map_err(|e| {
                EmotionAnnotatorError::Display(format!("Failed to create window: {e}"))
            })?;
            info!("Opened window \"{}\"", title);

            Ok(Self {
                title: title.to_string(),
                is_open: true,
            })
        }
    }

    impl VideoWindow for HighGuiWindow {
        fn show(&mut self, frame: &Frame) -> Result<()> {
            if !self.is_open || frame.is_empty() {
                return Ok(());
            }

            let rgb = Mat::from_slice(&frame.data)?;
            let rgb = rgb.reshape(3, frame.height as i32)?;

            // HighGUI expects BGR
            let mut bgr = Mat::default();
            imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;

            highgui::imshow(&self.title, &bgr)
                .map_err(|e| EmotionAnnotatorError::Display(format!("Failed to show frame: {e}")))
        }

        fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>> {
            if !self.is_open {
                return Ok(None);
            }
            let code = highgui::wait_key(poll_millis(timeout))?;
            Ok(key_from_code(code))
        }

        fn close(&mut self) {
            if !self.is_open {
                return;
            }

            self.is_open = false;

            if let Err(e) = highgui::destroy_window(&self.title) {
                warn!("Error closing window: {}", e);
            }
            info!("Window closed");
        }
    }

    impl Drop for HighGuiWindow {
        fn drop(&mut self) {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_codes_use_low_byte() {
        assert_eq!(key_from_code(-1), None);
        assert_eq!(key_from_code('q' as i32), Some('q'));
        assert_eq!(key_from_code(0x10_0000 | 'q' as i32), Some('q'));
    }

    #[test]
    fn poll_never_drops_below_one_millisecond() {
        assert_eq!(poll_millis(Duration::ZERO), 1);
        assert_eq!(poll_millis(Duration::from_millis(30)), 30);
    }
}
