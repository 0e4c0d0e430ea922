use anyhow::{Result, bail, ensure};
use candle_core::{D, Device, Tensor};
use candle_nn::ops::softmax;
use serde::{Deserialize, Serialize};

/// Fitted parameters as they are persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultinomialNbParams {
    pub alpha: f64,
    /// Class encodings, ascending. Row `i` of the other fields belongs to `classes[i]`.
    pub classes: Vec<i64>,
    pub class_log_prior: Vec<f32>,
    /// `(n_classes, n_features)`
    pub feature_log_prob: Vec<Vec<f32>>,
}

/// Multinomial naive Bayes over term-count features.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "MultinomialNbParams", try_from = "MultinomialNbParams")]
pub struct MultinomialNb {
    params: MultinomialNbParams,
    /// `(n_features, n_classes)`, transposed once so inference is a single matmul.
    feature_log_prob_t: Tensor,
    class_log_prior: Tensor,
}

impl MultinomialNb {
    /// Fit on a `(documents, n_features)` count matrix with one class per row.
    #[tracing::instrument(skip(counts, targets), fields(documents = targets.len()))]
    pub fn fit(counts: &Tensor, targets: &[i64], alpha: f64) -> Result<Self> {
        ensure!(alpha > 0.0 && alpha.is_finite(), "alpha must be positive, got {alpha}");
        let (documents, n_features) = counts.dims2()?;
        ensure!(documents > 0, "Cannot fit on zero documents");
        ensure!(
            documents == targets.len(),
            "Got {documents} documents but {} targets",
            targets.len()
        );

        let mut classes = targets.to_vec();
        classes.sort_unstable();
        classes.dedup();

        // Transposed one-hot targets, (n_classes, documents).
        let mut membership = vec![0f32; classes.len() * documents];
        let mut class_counts = vec![0usize; classes.len()];
        for (document, target) in targets.iter().enumerate() {
            let class = classes.binary_search(target).unwrap_or_default();
            membership[class * documents + document] = 1.0;
            class_counts[class] += 1;
        }
        let membership = Tensor::from_vec(membership, (classes.len(), documents), counts.device())?;

        let feature_count = membership.matmul(&counts.to_dtype(candle_core::DType::F32)?)?;
        let smoothed = feature_count.affine(1.0, alpha)?;
        let totals = smoothed.sum_keepdim(1)?;
        let feature_log_prob = smoothed.broadcast_div(&totals)?.log()?.to_vec2::<f32>()?;

        let class_log_prior = class_counts
            .iter()
            .map(|&count| (count as f64 / documents as f64).ln() as f32)
            .collect();

        tracing::debug!(classes = ?classes, n_features, "Fitted multinomial naive Bayes");
        Self::from_params(MultinomialNbParams {
            alpha,
            classes,
            class_log_prior,
            feature_log_prob,
        })
    }

    pub fn from_params(params: MultinomialNbParams) -> Result<Self> {
        let n_classes = params.classes.len();
        ensure!(n_classes > 0, "Classifier has no classes");
        ensure!(
            params.classes.windows(2).all(|pair| pair[0] < pair[1]),
            "Classes must be unique and ascending"
        );
        ensure!(
            params.class_log_prior.len() == n_classes,
            "Expected {n_classes} class priors, found {}",
            params.class_log_prior.len()
        );
        ensure!(
            params.feature_log_prob.len() == n_classes,
            "Expected {n_classes} feature probability rows, found {}",
            params.feature_log_prob.len()
        );
        let n_features = params.feature_log_prob[0].len();
        ensure!(n_features > 0, "Classifier has no features");
        for (class, row) in params.feature_log_prob.iter().enumerate() {
            if row.len() != n_features {
                bail!(
                    "Feature probability row {class} has {} entries, expected {n_features}",
                    row.len()
                );
            }
        }
        let all_finite = params
            .class_log_prior
            .iter()
            .chain(params.feature_log_prob.iter().flatten())
            .all(|value| value.is_finite());
        ensure!(all_finite, "Classifier parameters contain non-finite values");

        let device = Device::Cpu;
        let flat: Vec<f32> = params.feature_log_prob.iter().flatten().copied().collect();
        let feature_log_prob_t = Tensor::from_vec(flat, (n_classes, n_features), &device)?
            .t()?
            .contiguous()?;
        let class_log_prior = Tensor::new(params.class_log_prior.as_slice(), &device)?;

        Ok(Self {
            params,
            feature_log_prob_t,
            class_log_prior,
        })
    }

    pub fn classes(&self) -> &[i64] {
        &self.params.classes
    }

    pub fn n_features(&self) -> usize {
        self.params.feature_log_prob[0].len()
    }

    pub fn params(&self) -> &MultinomialNbParams {
        &self.params
    }

    fn joint_log_likelihood(&self, counts: &Tensor) -> Result<Tensor> {
        let (_, n_features) = counts.dims2()?;
        ensure!(
            n_features == self.n_features(),
            "Expected {} features, got {n_features}",
            self.n_features()
        );
        Ok(counts
            .matmul(&self.feature_log_prob_t)?
            .broadcast_add(&self.class_log_prior)?)
    }

    /// Most likely class encoding per row.
    pub fn predict(&self, counts: &Tensor) -> Result<Vec<i64>> {
        if counts.dims2()?.0 == 0 {
            return Ok(Vec::new());
        }
        let best = self.joint_log_likelihood(counts)?.argmax(D::Minus1)?.to_vec1::<u32>()?;
        best.into_iter()
            .map(|index| match self.params.classes.get(index as usize) {
                Some(&class) => Ok(class),
                None => bail!("Class index {index} out of range"),
            })
            .collect()
    }

    /// Per-row class probabilities, columns ordered like [`Self::classes`].
    pub fn predict_proba(&self, counts: &Tensor) -> Result<Vec<Vec<f32>>> {
        if counts.dims2()?.0 == 0 {
            return Ok(Vec::new());
        }
        let jll = self.joint_log_likelihood(counts)?;
        Ok(softmax(&jll, 1)?.to_vec2::<f32>()?)
    }
}

impl From<MultinomialNb> for MultinomialNbParams {
    fn from(model: MultinomialNb) -> Self {
        model.params
    }
}

impl TryFrom<MultinomialNbParams> for MultinomialNb {
    type Error = anyhow::Error;

    fn try_from(params: MultinomialNbParams) -> Result<Self> {
        Self::from_params(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(rows: &[&[f32]]) -> Tensor {
        let width = rows[0].len();
        let flat: Vec<f32> = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Tensor::from_vec(flat, (rows.len(), width), &Device::Cpu).unwrap()
    }

    #[test]
    fn fit_matches_closed_form() {
        // Two features, class 0 sees only feature 0, class 1 only feature 1.
        let x = counts(&[&[2.0, 0.0], &[0.0, 1.0], &[0.0, 3.0]]);
        let model = MultinomialNb::fit(&x, &[0, 1, 1], 1.0).unwrap();
        let params = model.params();

        assert_eq!(params.classes, vec![0, 1]);
        assert!((params.class_log_prior[0] - (1f32 / 3.0).ln()).abs() < 1e-6);
        assert!((params.class_log_prior[1] - (2f32 / 3.0).ln()).abs() < 1e-6);
        // class 0: (2 + 1) / (2 + 2), (0 + 1) / (2 + 2)
        assert!((params.feature_log_prob[0][0] - 0.75f32.ln()).abs() < 1e-6);
        assert!((params.feature_log_prob[0][1] - 0.25f32.ln()).abs() < 1e-6);
        // class 1: (0 + 1) / (4 + 2), (4 + 1) / (4 + 2)
        assert!((params.feature_log_prob[1][0] - (1f32 / 6.0).ln()).abs() < 1e-6);
        assert!((params.feature_log_prob[1][1] - (5f32 / 6.0).ln()).abs() < 1e-6);
    }

    #[test]
    fn predicts_by_dominant_feature() {
        let x = counts(&[&[3.0, 0.0], &[0.0, 3.0]]);
        let model = MultinomialNb::fit(&x, &[0, 1], 1.0).unwrap();
        let queries = counts(&[&[0.0, 2.0], &[5.0, 1.0]]);
        assert_eq!(model.predict(&queries).unwrap(), vec![1, 0]);

        let proba = model.predict_proba(&queries).unwrap();
        assert_eq!(proba.len(), 2);
        for row in &proba {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
        assert!(proba[0][1] > 0.5);
        assert!(proba[1][0] > 0.5);
    }

    #[test]
    fn empty_input_predicts_nothing() {
        let x = counts(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let model = MultinomialNb::fit(&x, &[0, 1], 1.0).unwrap();
        let empty = Tensor::zeros((0, 2), candle_core::DType::F32, &Device::Cpu).unwrap();
        assert!(model.predict(&empty).unwrap().is_empty());
    }

    #[test]
    fn rejects_feature_width_mismatch() {
        let x = counts(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let model = MultinomialNb::fit(&x, &[0, 1], 1.0).unwrap();
        assert!(model.predict(&counts(&[&[1.0, 0.0, 0.0]])).is_err());
    }

    #[test]
    fn rejects_inconsistent_params() {
        let ragged = MultinomialNbParams {
            alpha: 1.0,
            classes: vec![0, 1],
            class_log_prior: vec![-0.7, -0.7],
            feature_log_prob: vec![vec![-0.5, -1.0], vec![-0.5]],
        };
        assert!(MultinomialNb::from_params(ragged).is_err());

        let unsorted = MultinomialNbParams {
            alpha: 1.0,
            classes: vec![1, 0],
            class_log_prior: vec![-0.7, -0.7],
            feature_log_prob: vec![vec![-0.5], vec![-0.5]],
        };
        assert!(MultinomialNb::from_params(unsorted).is_err());

        let non_finite = MultinomialNbParams {
            alpha: 1.0,
            classes: vec![0, 1],
            class_log_prior: vec![f32::NAN, -0.7],
            feature_log_prob: vec![vec![-0.5], vec![-0.5]],
        };
        assert!(MultinomialNb::from_params(non_finite).is_err());
    }

    #[test]
    fn fit_requires_matching_targets() {
        let x = counts(&[&[1.0, 0.0], &[0.0, 1.0]]);
        assert!(MultinomialNb::fit(&x, &[0], 1.0).is_err());
        assert!(MultinomialNb::fit(&x, &[0, 1], 0.0).is_err());
    }
}
