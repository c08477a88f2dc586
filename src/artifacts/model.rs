use crate::artifacts::error::PredictionError;
use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::LogisticRegression;
use std::fmt;

/// A single prediction in wire-ready form.
///
/// Serialized untagged, so it lands in JSON as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionValue {
    /// Class label from a classifier
    Class(i64),

    /// Continuous score from a regressor
    Score(f64),
}

impl PredictionValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            PredictionValue::Class(c) => *c as f64,
            PredictionValue::Score(s) => *s,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.as_f64().is_finite()
    }
}

impl fmt::Display for PredictionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionValue::Class(c) => write!(f, "{}", c),
            PredictionValue::Score(s) => write!(f, "{}", s),
        }
    }
}

/// A fitted predictor.
///
/// Returns one value per input row. Implementations are immutable after
/// load and may be called concurrently.
pub trait Model: Send + Sync {
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Vec<PredictionValue>, PredictionError>;

    /// Width the model was trained on, when the artifact records it
    fn n_features(&self) -> Option<usize>;

    fn kind(&self) -> &'static str;
}

type SmartcoreLogistic = LogisticRegression<f64, i32, DenseMatrix<f64>, Vec<i32>>;
type SmartcoreForest = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Persisted model representation, keyed by estimator kind
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelArtifact {
    /// Ordinary least squares: `x . coefficients + intercept`
    LinearRegression(LinearModel),

    /// Binary logistic regression with a decision threshold
    LogisticRegression(BinaryLogisticModel),

    /// Serialized smartcore logistic regression
    SmartcoreLogisticRegression(SmartcoreLogistic),

    /// Serialized smartcore random forest
    SmartcoreRandomForest(SmartcoreForest),
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("kind", &self.kind())
            .field("n_features", &self.n_features())
            .finish()
    }
}

impl ModelArtifact {
    /// Check internal consistency of the fitted parameters
    pub fn validate(&self) -> Result<(), PredictionError> {
        match self {
            ModelArtifact::LinearRegression(m) => check_coefficients(&m.coefficients, m.intercept),
            ModelArtifact::LogisticRegression(m) => {
                check_coefficients(&m.coefficients, m.intercept)?;
                if !(0.0..=1.0).contains(&m.threshold) {
                    return Err(PredictionError::Estimator(format!(
                        "threshold {} outside [0, 1]",
                        m.threshold
                    )));
                }
                Ok(())
            }
            ModelArtifact::SmartcoreLogisticRegression(_) | ModelArtifact::SmartcoreRandomForest(_) => {
                Ok(())
            }
        }
    }
}

impl Model for ModelArtifact {
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Vec<PredictionValue>, PredictionError> {
        match self {
            ModelArtifact::LinearRegression(m) => m.predict(x),
            ModelArtifact::LogisticRegression(m) => m.predict(x),
            ModelArtifact::SmartcoreLogisticRegression(m) => {
                let labels = m
                    .predict(&to_dense_matrix(x))
                    .map_err(|e| PredictionError::Estimator(e.to_string()))?;
                Ok(labels.into_iter().map(|l| PredictionValue::Class(l as i64)).collect())
            }
            ModelArtifact::SmartcoreRandomForest(m) => {
                let labels = m
                    .predict(&to_dense_matrix(x))
                    .map_err(|e| PredictionError::Estimator(e.to_string()))?;
                Ok(labels.into_iter().map(|l| PredictionValue::Class(l as i64)).collect())
            }
        }
    }

    fn n_features(&self) -> Option<usize> {
        match self {
            ModelArtifact::LinearRegression(m) => Some(m.coefficients.len()),
            ModelArtifact::LogisticRegression(m) => Some(m.coefficients.len()),
            // smartcore estimators do not expose their training width
            ModelArtifact::SmartcoreLogisticRegression(_) | ModelArtifact::SmartcoreRandomForest(_) => {
                None
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::LinearRegression(_) => "linear_regression",
            ModelArtifact::LogisticRegression(_) => "logistic_regression",
            ModelArtifact::SmartcoreLogisticRegression(_) => "smartcore_logistic_regression",
            ModelArtifact::SmartcoreRandomForest(_) => "smartcore_random_forest",
        }
    }
}

/// Linear regressor producing a continuous score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearModel {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl LinearModel {
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Vec<PredictionValue>, PredictionError> {
        let scores = linear_scores(x, &self.coefficients, self.intercept)?;
        Ok(scores.iter().map(|&s| PredictionValue::Score(s)).collect())
    }
}

/// Binary logistic classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BinaryLogisticModel {
    pub coefficients: Array1<f64>,
    pub intercept: f64,

    /// Probability at or above which the positive class is chosen
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Labels for the negative and positive class
    #[serde(default = "default_classes")]
    pub classes: (i64, i64),
}

impl BinaryLogisticModel {
    pub fn new(coefficients: Array1<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            threshold: default_threshold(),
            classes: default_classes(),
        }
    }

    /// Positive-class probability for each row
    pub fn predict_proba(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>, PredictionError> {
        let z = linear_scores(x, &self.coefficients, self.intercept)?;
        Ok(z.mapv(|v| 1.0 / (1.0 + (-v).exp())))
    }

    fn predict(&self, x: &ArrayView2<f64>) -> Result<Vec<PredictionValue>, PredictionError> {
        let (negative, positive) = self.classes;
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|&p| {
                PredictionValue::Class(if p >= self.threshold { positive } else { negative })
            })
            .collect())
    }
}

fn linear_scores(
    x: &ArrayView2<f64>,
    coefficients: &Array1<f64>,
    intercept: f64,
) -> Result<Array1<f64>, PredictionError> {
    let got = x.len_of(Axis(1));
    if got != coefficients.len() {
        return Err(PredictionError::DimensionMismatch {
            expected: coefficients.len(),
            got,
        });
    }
    Ok(x.dot(coefficients) + intercept)
}

fn check_coefficients(coefficients: &Array1<f64>, intercept: f64) -> Result<(), PredictionError> {
    if coefficients.is_empty() {
        return Err(PredictionError::Estimator("model has no coefficients".to_string()));
    }
    if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
        return Err(PredictionError::Estimator(
            "model parameters contain non-finite values".to_string(),
        ));
    }
    Ok(())
}

fn to_dense_matrix(x: &ArrayView2<f64>) -> DenseMatrix<f64> {
    let (rows, cols) = x.dim();
    let data: Vec<f64> = x.iter().copied().collect();
    DenseMatrix::new(rows, cols, data, false)
}

fn default_threshold() -> f64 {
    0.5
}

fn default_classes() -> (i64, i64) {
    (0, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use smartcore::linear::logistic_regression::LogisticRegressionParameters;

    #[test]
    fn test_linear_model_scores() {
        let model = ModelArtifact::LinearRegression(LinearModel {
            coefficients: array![1.0, -1.0, 0.5],
            intercept: 2.0,
        });
        let x = array![[1.0, 1.0, 2.0]];

        let out = model.predict(&x.view()).unwrap();
        assert_eq!(out, vec![PredictionValue::Score(3.0)]);
        assert_eq!(model.n_features(), Some(3));
    }

    #[test]
    fn test_logistic_model_thresholds() {
        let model = BinaryLogisticModel::new(array![2.0, 0.0], -1.0);
        let x = array![[1.0, 5.0], [0.0, 5.0]];

        let out = ModelArtifact::LogisticRegression(model).predict(&x.view()).unwrap();
        assert_eq!(out, vec![PredictionValue::Class(1), PredictionValue::Class(0)]);
    }

    #[test]
    fn test_linear_model_rejects_wrong_width() {
        let model = LinearModel {
            coefficients: array![1.0, 2.0],
            intercept: 0.0,
        };
        let x = array![[1.0, 2.0, 3.0]];

        assert_eq!(
            model.predict(&x.view()).unwrap_err(),
            PredictionError::DimensionMismatch { expected: 2, got: 3 }
        );
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut model = BinaryLogisticModel::new(array![1.0], 0.0);
        model.threshold = 1.5;

        assert!(ModelArtifact::LogisticRegression(model).validate().is_err());
    }

    #[test]
    fn test_smartcore_logistic_predicts_single_row() {
        let x = DenseMatrix::from_2d_array(&[
            &[0.0, 0.1],
            &[0.2, 0.0],
            &[0.1, 0.3],
            &[5.0, 5.2],
            &[5.1, 4.9],
            &[4.8, 5.3],
        ]);
        let y: Vec<i32> = vec![0, 0, 0, 1, 1, 1];
        let fitted =
            LogisticRegression::fit(&x, &y, LogisticRegressionParameters::default()).unwrap();
        let model = ModelArtifact::SmartcoreLogisticRegression(fitted);

        let out = model.predict(&array![[5.0, 5.0]].view()).unwrap();
        assert_eq!(out, vec![PredictionValue::Class(1)]);
        assert_eq!(model.kind(), "smartcore_logistic_regression");
    }

    #[test]
    fn test_prediction_value_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&PredictionValue::Class(1)).unwrap(), "1");
        assert_eq!(serde_json::to_string(&PredictionValue::Score(0.25)).unwrap(), "0.25");
    }

    #[test]
    fn test_prediction_value_finiteness() {
        assert!(PredictionValue::Class(3).is_finite());
        assert_eq!(PredictionValue::Class(3).as_f64(), 3.0);
        assert!(PredictionValue::Score(0.25).is_finite());
        assert!(!PredictionValue::Score(f64::NAN).is_finite());
        assert!(!PredictionValue::Score(f64::INFINITY).is_finite());
    }
}
