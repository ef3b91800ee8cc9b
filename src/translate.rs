// Display strings for emotion labels

use crate::models::EmotionLabel;

/// Canonical English label -> Portuguese display string
pub const TRANSLATIONS: [(&str, &str); 7] = [
    ("angry", "Raiva"),
    ("disgust", "Nojo"),
    ("fear", "Medo"),
    ("happy", "Feliz"),
    ("sad", "Triste"),
    ("surprise", "Surpreso"),
    ("neutral", "Neutro"),
];

/// Maps a label to its display string, or returns the label itself when
/// there is no entry for it.
pub fn translate(label: &str) -> &str {
    TRANSLATIONS
        .iter()
        .find(|(en, _)| *en == label)
        .map_or(label, |&(_, display)| display)
}

pub fn translate_label(label: &EmotionLabel) -> &str {
    translate(label.as_str())
}
