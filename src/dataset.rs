use crate::types::SPAM_CLASS;

const HAM_CLASS: i64 = 0;

/// The labeled sample messages the shipped model is trained on.
pub const SAMPLES: &[(&str, i64)] = &[
    ("Free money now!!!", SPAM_CLASS),
    ("Hi, how are you?", HAM_CLASS),
    ("Lowest prices on meds", SPAM_CLASS),
    ("Are you coming to the meeting?", HAM_CLASS),
    ("Win cash fast!", SPAM_CLASS),
    ("Let's meet tomorrow.", HAM_CLASS),
    ("Congratulations! You have won!", SPAM_CLASS),
];

/// Texts and class encodings as parallel vectors.
pub fn training_set() -> (Vec<&'static str>, Vec<i64>) {
    SAMPLES.iter().copied().unzip()
}
