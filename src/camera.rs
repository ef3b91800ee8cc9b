// Camera module for webcam capture

use crate::models::Frame;

/// Source of video frames for the annotation loop.
pub trait FrameSource {
    /// Blocks until the next frame is available.
    ///
    /// `None` means end of stream: the device failed or has no more frames.
    /// It is not retried.
    fn acquire(&mut self) -> Option<Frame>;

    /// Releases the underlying device. Calling it more than once is a no-op.
    fn release(&mut self);
}

#[cfg(feature = "webcam")]
pub use self::device::CameraManager;

#[cfg(feature = "webcam")]
mod device {
    use super::FrameSource;
    use crate::error::{EmotionAnnotatorError, Result};
    use crate::models::Frame;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    };
    use nokhwa::Camera;
    use tracing::{error, info};

    /// Owns the capture device for the lifetime of the loop
    pub struct CameraManager {
        camera: Camera,
        is_running: bool,
    }

    impl CameraManager {
        /// Opens the camera at `index` and starts its stream.
        ///
        /// Failure here is fatal for the application.
        pub fn open(index: u32) -> Result<Self> {
            // Request 640x480 at 30 FPS, the closest the device offers
            let requested_format = RequestedFormat::new::<RgbFormat>(
                RequestedFormatType::Closest(CameraFormat::new(
                    Resolution::new(640, 480),
                    FrameFormat::YUYV,
                    30,
                )),
            );

            let mut camera =
                Camera::new(CameraIndex::Index(index), requested_format).map_err(|e| {
                    error!("Failed to open camera {}: {}", index, e);
                    EmotionAnnotatorError::CameraInit(format!(
                        "Could not open camera {index}. Make sure:\n\
                        1. A camera is connected\n\
                        2. No other app is using it\n\
                        3. Camera permissions are granted\n\
                        Error: {e}"
                    ))
                })?;

            camera.open_stream().map_err(|e| {
                error!("Failed to open camera stream: {}", e);
                EmotionAnnotatorError::CameraInit(e.to_string())
            })?;

            info!("Camera opened: {}", camera.info().human_name());

            Ok(Self {
                camera,
                is_running: true,
            })
        }

        /// Returns the current camera resolution
        pub fn resolution(&self) -> (u32, u32) {
            let res = self.camera.resolution();
            (res.width(), res.height())
        }

        /// Captures and decodes the most recent frame
        fn capture(&mut self) -> Result<Frame> {
            let frame_data = self.camera.frame().map_err(|e| {
                EmotionAnnotatorError::FrameProcessing(format!("Failed to capture frame: {e}"))
            })?;

            let buffer = frame_data.decode_image::<RgbFormat>().map_err(|e| {
                EmotionAnnotatorError::FrameProcessing(format!("Failed to decode frame: {e}"))
            })?;

            let (width, height) = (buffer.width(), buffer.height());
            Ok(Frame::new(buffer.into_raw(), width, height))
        }
    }

    impl FrameSource for CameraManager {
        fn acquire(&mut self) -> Option<Frame> {
            if !self.is_running {
                return None;
            }

            match self.capture() {
                Ok(frame) => Some(frame),
                Err(e) => {
                    error!("Camera stopped delivering frames: {}", e);
                    None
                }
            }
        }

        fn release(&mut self) {
            if !self.is_running {
                return;
            }

            self.is_running = false;

            if let Err(e) = self.camera.stop_stream() {
                error!("Error stopping camera stream: {}", e);
            }
            info!("Camera released");
        }
    }

    impl Drop for CameraManager {
        fn drop(&mut self) {
            self.release();
        }
    }
}
