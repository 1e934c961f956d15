//! Loss functions and classification metrics

use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Trait for loss functions
pub trait LossFunction {
    /// Type of input for loss calculation
    type Input;

    /// Calculate the loss between predictions and targets
    fn calculate_loss(&self, predictions: &Self::Input, targets: &Self::Input) -> f64;

    /// Calculate gradients of the loss with respect to predictions
    fn calculate_gradients(&self, predictions: &Self::Input, targets: &Self::Input) -> Self::Input;
}

/// Helper function to compute softmax probabilities
pub fn softmax(x: &ArrayView1<f64>) -> Array1<f64> {
    let max_val = x.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let exp_x = x.mapv(|xi| (xi - max_val).exp());
    let sum_exp = exp_x.sum();
    exp_x / sum_exp
}

/// Row-wise softmax of a batch of logits
pub fn softmax_rows(logits: &Array2<f64>) -> Array2<f64> {
    let mut probs = logits.clone();
    for mut row in probs.axis_iter_mut(Axis(0)) {
        let p = softmax(&row.view());
        row.assign(&p);
    }
    probs
}

/// One-hot targets, one row per label
pub fn one_hot(labels: &[usize], classes: usize) -> Array2<f64> {
    let mut targets = Array2::zeros((labels.len(), classes));
    for (row, &label) in labels.iter().enumerate() {
        if label < classes {
            targets[[row, label]] = 1.0;
        }
    }
    targets
}

/// Index of the largest logit of every row; ties go to the lowest index.
pub fn argmax_rows(logits: &Array2<f64>) -> Vec<usize> {
    logits
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(best, best_val), (i, &v)| {
                    if v > best_val { (i, v) } else { (best, best_val) }
                })
                .0
        })
        .collect()
}

/// Fraction of rows whose arg-max matches the label.
pub fn accuracy(logits: &Array2<f64>, labels: &[usize]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = argmax_rows(logits)
        .iter()
        .zip(labels.iter())
        .filter(|(predicted, label)| predicted == label)
        .count();
    correct as f64 / labels.len() as f64
}

/// Categorical cross-entropy with softmax activation, averaged over the batch
///
/// Predictions are raw logits and targets one-hot rows, both shaped
/// `(batch, classes)`.
#[derive(Debug, Clone, Copy)]
pub struct SoftmaxCrossEntropy;

impl LossFunction for SoftmaxCrossEntropy {
    type Input = Array2<f64>;

    fn calculate_loss(&self, logits: &Self::Input, targets: &Self::Input) -> f64 {
        let probs = softmax_rows(logits);
        let n = probs.nrows().max(1) as f64;
        let mut loss = 0.0;

        for (p, t) in probs.iter().zip(targets.iter()) {
            if *t > 0.0 {
                // Clip probabilities to avoid numerical issues
                let p_clipped = p.max(1e-15);
                loss -= t * p_clipped.ln();
            }
        }

        loss / n
    }

    fn calculate_gradients(&self, logits: &Self::Input, targets: &Self::Input) -> Self::Input {
        let probs = softmax_rows(logits);
        let n = probs.nrows().max(1) as f64;

        // Gradient of softmax cross-entropy is (p - y)/n
        (probs - targets) / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_uniform_logits_loss_is_log_classes() {
        let logits = Array2::zeros((3, 7));
        let targets = one_hot(&[0, 3, 6], 7);
        let loss = SoftmaxCrossEntropy.calculate_loss(&logits, &targets);
        assert!((loss - 7f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_rows_sum_to_zero() {
        let logits = array![[1.0, -2.0, 0.5], [0.0, 3.0, -1.0]];
        let targets = one_hot(&[2, 1], 3);
        let grads = SoftmaxCrossEntropy.calculate_gradients(&logits, &targets);
        for row in grads.axis_iter(Axis(0)) {
            assert!(row.sum().abs() < 1e-12);
        }
    }

    #[test]
    fn test_accuracy_counts_argmax_hits() {
        let logits = array![[0.1, 0.9], [0.8, 0.2], [0.3, 0.7]];
        assert!((accuracy(&logits, &[1, 0, 0]) - 2.0 / 3.0).abs() < 1e-12);
    }
}
