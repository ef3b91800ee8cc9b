// Core data models for the emotion annotator

use image::RgbImage;

/// Represents a single video frame with RGB data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Raw RGB pixel data (width * height * 3 bytes, row-major)
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl Frame {
    /// Creates a new Frame with the given parameters
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 3);
        Self {
            data,
            width,
            height,
        }
    }

    /// Creates a frame where every pixel has the same colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(data, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the RGB value at `(x, y)`, or `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Copies out exactly the pixels bounded by `rect`.
    ///
    /// Returns `None` when the rectangle is empty or reaches outside the frame.
    pub fn crop(&self, rect: &FaceRect) -> Option<Frame> {
        if rect.width == 0 || rect.height == 0 || !rect.contained_in(self.width, self.height) {
            return None;
        }

        let row_len = rect.width as usize * 3;
        let mut data = Vec::with_capacity(row_len * rect.height as usize);
        for row in rect.y..rect.bottom() {
            let start = (row as usize * self.width as usize + rect.x as usize) * 3;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }

        Some(Frame::new(data, rect.width, rect.height))
    }

    /// Copies the frame into an `image` RGB buffer
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// Axis-aligned face bounding box in pixel coordinates, origin top-left
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// True when the whole rectangle lies inside a `width` x `height` frame
    pub fn contained_in(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Builds a rectangle from signed detector output, clipped to the frame.
    ///
    /// Returns `None` when nothing of the rectangle is left inside the frame.
    pub fn clamped_to(x: i32, y: i32, w: i32, h: i32, width: u32, height: u32) -> Option<Self> {
        let (frame_w, frame_h) = (i64::from(width), i64::from(height));
        let x0 = i64::from(x).clamp(0, frame_w);
        let y0 = i64::from(y).clamp(0, frame_h);
        let x1 = (i64::from(x) + i64::from(w)).clamp(0, frame_w);
        let y1 = (i64::from(y) + i64::from(h)).clamp(0, frame_h);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Self::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        ))
    }

    /// Baseline position for a label drawn `offset` pixels above the top edge.
    /// Goes negative for faces touching the top of the frame.
    pub fn label_origin(&self, offset: u32) -> (i32, i32) {
        (self.x as i32, self.y as i32 - offset as i32)
    }
}

/// Emotion categories produced by the classifier
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
    /// A class outside the seven canonical ones (e.g. `contempt`)
    Other(String),
}

impl EmotionLabel {
    /// The seven canonical labels, in the usual FER output order
    pub const CANONICAL: [EmotionLabel; 7] = [
        EmotionLabel::Angry,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
    ];

    /// Canonical lowercase English name
    pub fn as_str(&self) -> &str {
        match self {
            EmotionLabel::Angry => "angry",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Other(name) => name,
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of emotion classification for one face region
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionResult {
    /// The dominant (highest probability) emotion
    pub label: EmotionLabel,
    /// Probability of the dominant emotion (0.0 to 1.0)
    pub confidence: f32,
    /// Full distribution in model output order
    pub scores: Vec<(EmotionLabel, f32)>,
}

impl EmotionResult {
    /// Creates a new EmotionResult
    pub fn new(label: EmotionLabel, confidence: f32, scores: Vec<(EmotionLabel, f32)>) -> Self {
        Self {
            label,
            confidence,
            scores,
        }
    }

    /// Returns the confidence as a percentage (0-100)
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

impl std::fmt::Display for EmotionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}% confidence)",
            self.label,
            self.confidence_percent()
        )
    }
}
