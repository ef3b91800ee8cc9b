// Main capture/annotate/display loop

use crate::annotate::Annotator;
use crate::camera::FrameSource;
use crate::emotion::{EmotionClassifier, FaceDetector};
use crate::error::Result;
use crate::pipeline::{EmotionPipeline, FrameReport};
use crate::ui::VideoWindow;
use std::time::Duration;
use tracing::{debug, info};

/// Lifecycle of the loop. There is no way back from `Terminating`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminating,
}

/// Why the loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    /// The frame source had no more frames
    EndOfStream,
    /// The user pressed the exit key
    ExitKey,
}

/// Totals over a whole run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub faces_detected: u64,
    pub faces_annotated: u64,
    pub skipped_faces: u64,
    pub reason: TerminationReason,
}

#[derive(Default)]
struct Totals {
    frames: u64,
    faces_detected: u64,
    faces_annotated: u64,
    skipped: u64,
}

impl Totals {
    fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.faces_detected += report.faces as u64;
        self.faces_annotated += report.annotated as u64;
        self.skipped += report.skipped as u64;
    }

    fn finish(&self, reason: TerminationReason) -> RunSummary {
        RunSummary {
            frames: self.frames,
            faces_detected: self.faces_detected,
            faces_annotated: self.faces_annotated,
            skipped_faces: self.skipped,
            reason,
        }
    }
}

/// Owns the camera and window for the whole run and drives the
/// acquire -> annotate -> show -> poll cycle.
pub struct LoopController<S, W, D, C, A>
where
    S: FrameSource,
    W: VideoWindow,
{
    source: S,
    window: W,
    pipeline: EmotionPipeline<D, C, A>,
    exit_key: char,
    key_poll: Duration,
    state: LoopState,
    released: bool,
}

impl<S, W, D, C, A> LoopController<S, W, D, C, A>
where
    S: FrameSource,
    W: VideoWindow,
    D: FaceDetector,
    C: EmotionClassifier,
    A: Annotator,
{
    /// Takes ownership of an already opened source and window
    pub fn new(source: S, window: W, pipeline: EmotionPipeline<D, C, A>) -> Self {
        Self {
            source,
            window,
            pipeline,
            exit_key: 'q',
            key_poll: Duration::from_millis(1),
            state: LoopState::Running,
            released: false,
        }
    }

    pub fn with_exit_key(mut self, key: char) -> Self {
        self.exit_key = key;
        self
    }

    pub fn with_key_poll(mut self, timeout: Duration) -> Self {
        self.key_poll = timeout;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn pipeline(&self) -> &EmotionPipeline<D, C, A> {
        &self.pipeline
    }

    /// Runs until end of stream or the exit key, then releases the camera
    /// and window. Resources are released on the error path as well.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut totals = Totals::default();
        let outcome = self.run_loop(&mut totals);
        self.release();

        let reason = outcome?;
        let summary = totals.finish(reason);
        info!(
            "Stopped ({:?}) after {} frames: {} faces, {} annotated, {} skipped",
            summary.reason,
            summary.frames,
            summary.faces_detected,
            summary.faces_annotated,
            summary.skipped_faces
        );
        Ok(summary)
    }

    fn run_loop(&mut self, totals: &mut Totals) -> Result<TerminationReason> {
        if self.state == LoopState::Terminating {
            return Ok(TerminationReason::EndOfStream);
        }

        loop {
            let Some(mut frame) = self.source.acquire() else {
                info!("Frame source reached end of stream");
                return Ok(TerminationReason::EndOfStream);
            };

            let report = self.pipeline.process_frame(&mut frame);
            totals.record(&report);

            self.window.show(&frame)?;

            if let Some(key) = self.window.poll_key(self.key_poll)? {
                debug!("Key pressed: {:?}", key);
                if key == self.exit_key {
                    info!("Exit key pressed");
                    return Ok(TerminationReason::ExitKey);
                }
            }
        }
    }
}

impl<S, W, D, C, A> LoopController<S, W, D, C, A>
where
    S: FrameSource,
    W: VideoWindow,
{
    /// Releases the camera and closes the window. Only the first call has
    /// any effect.
    pub fn release(&mut self) {
        self.state = LoopState::Terminating;
        if self.released {
            return;
        }
        self.released = true;

        self.source.release();
        self.window.close();
    }
}

impl<S, W, D, C, A> Drop for LoopController<S, W, D, C, A>
where
    S: FrameSource,
    W: VideoWindow,
{
    fn drop(&mut self) {
        self.release();
    }
}
