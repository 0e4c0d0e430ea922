use serde::{Deserialize, Serialize};

/// Class encoding the classifier uses for unwanted messages.
pub const SPAM_CLASS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Spam,
    Ham,
}

impl Label {
    /// Class 1 is SPAM, anything else is HAM.
    pub fn from_class(class: i64) -> Self {
        if class == SPAM_CLASS {
            Label::Spam
        } else {
            Label::Ham
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Spam => "SPAM",
            Label::Ham => "HAM",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: Label,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchPredictRequest {
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchPredictResponse {
    pub predictions: Vec<Label>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}
