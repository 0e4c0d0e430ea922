use anyhow::{Context, Result, bail};
use candle_core::{Device, Tensor};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Regex,
}

impl Tokenizer {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(TOKEN_PATTERN).context("Failed to compile token pattern")?;
        Ok(Self { pattern })
    }

    pub fn tokenize<'a>(&self, lowered: &'a str) -> impl Iterator<Item = &'a str> {
        self.pattern.find_iter(lowered).map(|m| m.as_str())
    }
}

/// Bag-of-words features: lowercased word tokens of two or more characters,
/// counted against a fixed vocabulary. Serialized as the vocabulary in
/// feature-index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct CountVectorizer {
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
    tokenizer: Tokenizer,
}

impl CountVectorizer {
    /// Learn the vocabulary from `documents`. Terms are sorted so feature
    /// indices do not depend on document order.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Result<Self> {
        let tokenizer = Tokenizer::new()?;
        let mut terms = BTreeSet::new();
        for document in documents {
            let lowered = document.as_ref().to_lowercase();
            terms.extend(tokenizer.tokenize(&lowered).map(str::to_owned));
        }
        if terms.is_empty() {
            bail!("Empty vocabulary; the training documents contain no tokens");
        }
        Self::from_vocabulary(terms.into_iter().collect())
    }

    pub fn from_vocabulary(vocabulary: Vec<String>) -> Result<Self> {
        if vocabulary.is_empty() {
            bail!("Vocabulary must not be empty");
        }
        let mut index = HashMap::with_capacity(vocabulary.len());
        for (position, term) in vocabulary.iter().enumerate() {
            if index.insert(term.clone(), position).is_some() {
                bail!("Duplicate vocabulary term {term:?}");
            }
        }
        Ok(Self {
            vocabulary,
            index,
            tokenizer: Tokenizer::new()?,
        })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Term counts for one document. Unknown terms are dropped.
    pub fn counts(&self, document: &str) -> Vec<f32> {
        let mut row = vec![0f32; self.n_features()];
        let lowered = document.to_lowercase();
        for token in self.tokenizer.tokenize(&lowered) {
            if let Some(&feature) = self.index.get(token) {
                row[feature] += 1.0;
            }
        }
        row
    }

    /// Document-term matrix of shape `(documents, n_features)`.
    pub fn transform<S: AsRef<str>>(&self, documents: &[S], device: &Device) -> Result<Tensor> {
        let n_features = self.n_features();
        let mut data = Vec::with_capacity(documents.len() * n_features);
        for document in documents {
            data.extend(self.counts(document.as_ref()));
        }
        Ok(Tensor::from_vec(data, (documents.len(), n_features), device)?)
    }
}

impl From<CountVectorizer> for Vec<String> {
    fn from(vectorizer: CountVectorizer) -> Self {
        vectorizer.vocabulary
    }
}

impl TryFrom<Vec<String>> for CountVectorizer {
    type Error = anyhow::Error;

    fn try_from(vocabulary: Vec<String>) -> Result<Self> {
        Self::from_vocabulary(vocabulary)
    }
}
