use anyhow::{Context, Result, ensure};
use candle_core::Device;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::naive_bayes::MultinomialNb;
use crate::types::Label;
use crate::vectorizer::CountVectorizer;

pub const FORMAT_VERSION: u32 = 1;

/// Count vectorizer followed by multinomial naive Bayes. This is the
/// artifact the training utility writes and the server loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    format_version: u32,
    vectorizer: CountVectorizer,
    classifier: MultinomialNb,
}

impl Pipeline {
    pub fn fit<S: AsRef<str>>(documents: &[S], targets: &[i64], alpha: f64) -> Result<Self> {
        let vectorizer = CountVectorizer::fit(documents)?;
        let counts = vectorizer.transform(documents, &Device::Cpu)?;
        let classifier = MultinomialNb::fit(&counts, targets, alpha)?;
        Self::new(vectorizer, classifier)
    }

    fn new(vectorizer: CountVectorizer, classifier: MultinomialNb) -> Result<Self> {
        let pipeline = Self {
            format_version: FORMAT_VERSION,
            vectorizer,
            classifier,
        };
        pipeline.validate()?;
        Ok(pipeline)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.format_version == FORMAT_VERSION,
            "Unsupported artifact format version {} (expected {FORMAT_VERSION})",
            self.format_version
        );
        ensure!(
            self.vectorizer.n_features() == self.classifier.n_features(),
            "Vocabulary has {} terms but the classifier expects {} features",
            self.vectorizer.n_features(),
            self.classifier.n_features()
        );
        Ok(())
    }

    /// Read and validate an artifact. Any failure here means the service
    /// cannot start.
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        let pipeline: Self = serde_json::from_slice(&raw)
            .with_context(|| format!("Model artifact {} is corrupt", path.display()))?;
        pipeline
            .validate()
            .with_context(|| format!("Model artifact {} is inconsistent", path.display()))?;
        tracing::info!(
            features = pipeline.vectorizer.n_features(),
            classes = ?pipeline.classifier.classes(),
            "Model artifact loaded"
        );
        Ok(pipeline)
    }

    /// Write the artifact, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write model artifact {}", path.display()))?;
        Ok(())
    }

    /// Raw class encodings, one per document, in input order.
    pub fn predict_classes<S: AsRef<str>>(&self, documents: &[S]) -> Result<Vec<i64>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let counts = self.vectorizer.transform(documents, &Device::Cpu)?;
        self.classifier.predict(&counts)
    }

    pub fn predict<S: AsRef<str>>(&self, documents: &[S]) -> Result<Vec<Label>> {
        Ok(self
            .predict_classes(documents)?
            .into_iter()
            .map(Label::from_class)
            .collect())
    }

    pub fn predict_proba<S: AsRef<str>>(&self, documents: &[S]) -> Result<Vec<Vec<f32>>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let counts = self.vectorizer.transform(documents, &Device::Cpu)?;
        self.classifier.predict_proba(&counts)
    }

    pub fn classes(&self) -> &[i64] {
        self.classifier.classes()
    }

    pub fn vocabulary(&self) -> &[String] {
        self.vectorizer.vocabulary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset;
    use tempfile::TempDir;

    fn sample_pipeline() -> Pipeline {
        let (texts, targets) = dataset::training_set();
        Pipeline::fit(&texts, &targets, 1.0).unwrap()
    }

    #[test]
    fn classifies_sample_messages() {
        let pipeline = sample_pipeline();
        let labels = pipeline
            .predict(&[
                "Meeting at 10?",
                "Win cash fast!",
                "Congratulations, you won a prize!",
                "Hi, how are you?",
            ])
            .unwrap();
        assert_eq!(labels, vec![Label::Ham, Label::Spam, Label::Spam, Label::Ham]);
    }

    #[test]
    fn vocabulary_follows_token_rules() {
        let pipeline = sample_pipeline();
        let vocabulary = pipeline.vocabulary();
        assert_eq!(vocabulary.len(), 24);
        assert!(vocabulary.iter().any(|term| term == "let"));
        assert!(!vocabulary.iter().any(|term| term == "s"));
        assert!(vocabulary.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn empty_batch_yields_no_labels() {
        let pipeline = sample_pipeline();
        let none: [&str; 0] = [];
        assert!(pipeline.predict(&none).unwrap().is_empty());
    }

    #[test]
    fn saved_artifact_reloads_with_same_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("spam_model.json");
        let pipeline = sample_pipeline();
        pipeline.save(&path).unwrap();

        let loaded = Pipeline::load(&path).unwrap();
        let inputs = ["Free money now!!!", "Let's meet tomorrow.", "unknown words only"];
        assert_eq!(
            loaded.predict(&inputs).unwrap(),
            pipeline.predict(&inputs).unwrap()
        );
        assert_eq!(loaded.classes(), &[0, 1]);
    }

    #[test]
    fn missing_artifact_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let err = Pipeline::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read model artifact"));
    }

    #[test]
    fn corrupt_artifact_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spam_model.json");
        fs::write(&path, b"not a model").unwrap();
        assert!(Pipeline::load(&path).is_err());
    }

    #[test]
    fn mismatched_artifact_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spam_model.json");
        let mut artifact = serde_json::to_value(sample_pipeline()).unwrap();
        artifact["vectorizer"] = serde_json::json!(["only", "three", "terms"]);
        fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();
        let err = Pipeline::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("features"));
    }

    #[test]
    fn unknown_format_version_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spam_model.json");
        let mut artifact = serde_json::to_value(sample_pipeline()).unwrap();
        artifact["format_version"] = serde_json::json!(99);
        fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();
        assert!(Pipeline::load(&path).is_err());
    }
}
