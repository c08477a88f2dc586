use crate::artifacts::error::TransformError;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// A fitted feature transform.
///
/// Implementations are immutable after load and may be called from many
/// threads at once.
pub trait Scaler: Send + Sync {
    /// Transform a batch of samples (one sample per row)
    fn transform(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>, TransformError>;

    /// Width the scaler was fitted on, when the artifact records it
    fn n_features(&self) -> Option<usize>;

    /// Short name of the transform, used in logs and reports
    fn kind(&self) -> &'static str;
}

/// Persisted scaler representation, keyed by transform kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ScalerArtifact {
    /// Standardization: `(x - mean) / scale`
    Standard(StandardScaler),

    /// Range scaling: `x * scale + min`
    MinMax(MinMaxScaler),

    /// Pass-through with a fixed width
    Identity { n_features: usize },
}

impl ScalerArtifact {
    /// Check internal consistency of the fitted parameters
    pub fn validate(&self) -> Result<(), TransformError> {
        match self {
            ScalerArtifact::Standard(s) => s.validate(),
            ScalerArtifact::MinMax(s) => s.validate(),
            ScalerArtifact::Identity { n_features } if *n_features == 0 => Err(
                TransformError::InvalidParameters("identity scaler with zero features".to_string()),
            ),
            ScalerArtifact::Identity { .. } => Ok(()),
        }
    }
}

impl Scaler for ScalerArtifact {
    fn transform(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>, TransformError> {
        match self {
            ScalerArtifact::Standard(s) => s.transform(x),
            ScalerArtifact::MinMax(s) => s.transform(x),
            ScalerArtifact::Identity { n_features } => {
                check_input(x, *n_features)?;
                Ok(x.to_owned())
            }
        }
    }

    fn n_features(&self) -> Option<usize> {
        match self {
            ScalerArtifact::Standard(s) => Some(s.mean.len()),
            ScalerArtifact::MinMax(s) => Some(s.min.len()),
            ScalerArtifact::Identity { n_features } => Some(*n_features),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ScalerArtifact::Standard(_) => "standard",
            ScalerArtifact::MinMax(_) => "min_max",
            ScalerArtifact::Identity { .. } => "identity",
        }
    }
}

/// Per-feature standardization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler {
    /// Per-feature mean seen during fitting
    pub mean: Array1<f64>,

    /// Per-feature standard deviation; zeros are treated as one
    pub scale: Array1<f64>,

    #[serde(default = "default_true")]
    pub with_mean: bool,

    #[serde(default = "default_true")]
    pub with_std: bool,
}

impl StandardScaler {
    pub fn new(mean: Array1<f64>, scale: Array1<f64>) -> Self {
        Self {
            mean,
            scale,
            with_mean: true,
            with_std: true,
        }
    }

    fn validate(&self) -> Result<(), TransformError> {
        if self.mean.is_empty() {
            return Err(TransformError::InvalidParameters(
                "standard scaler has no features".to_string(),
            ));
        }
        if self.mean.len() != self.scale.len() {
            return Err(TransformError::InvalidParameters(format!(
                "mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.iter().chain(self.scale.iter()).any(|v| !v.is_finite()) {
            return Err(TransformError::InvalidParameters(
                "standard scaler parameters contain non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    fn transform(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>, TransformError> {
        check_input(x, self.mean.len())?;

        let mut out = x.to_owned();
        if self.with_mean {
            out -= &self.mean;
        }
        if self.with_std {
            let scale = self.scale.mapv(|s| if s == 0.0 { 1.0 } else { s });
            out /= &scale;
        }
        check_output(&out)?;
        Ok(out)
    }
}

/// Per-feature range scaling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MinMaxScaler {
    /// Per-feature offset applied after scaling
    pub min: Array1<f64>,

    /// Per-feature multiplicative factor
    pub scale: Array1<f64>,

    /// Clip transformed values into `feature_range`
    #[serde(default)]
    pub clip: bool,

    #[serde(default = "default_feature_range")]
    pub feature_range: (f64, f64),
}

impl MinMaxScaler {
    pub fn new(min: Array1<f64>, scale: Array1<f64>) -> Self {
        Self {
            min,
            scale,
            clip: false,
            feature_range: default_feature_range(),
        }
    }

    fn validate(&self) -> Result<(), TransformError> {
        if self.min.is_empty() {
            return Err(TransformError::InvalidParameters(
                "min-max scaler has no features".to_string(),
            ));
        }
        if self.min.len() != self.scale.len() {
            return Err(TransformError::InvalidParameters(format!(
                "min has {} entries but scale has {}",
                self.min.len(),
                self.scale.len()
            )));
        }
        let (lo, hi) = self.feature_range;
        if !(lo < hi) {
            return Err(TransformError::InvalidParameters(format!(
                "feature_range ({}, {}) is empty",
                lo, hi
            )));
        }
        Ok(())
    }

    fn transform(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>, TransformError> {
        check_input(x, self.min.len())?;

        let mut out = x.to_owned();
        out *= &self.scale;
        out += &self.min;
        if self.clip {
            let (lo, hi) = self.feature_range;
            out.mapv_inplace(|v| v.clamp(lo, hi));
        }
        check_output(&out)?;
        Ok(out)
    }
}

fn check_input(x: &ArrayView2<f64>, expected: usize) -> Result<(), TransformError> {
    let got = x.len_of(Axis(1));
    if got != expected {
        return Err(TransformError::DimensionMismatch { expected, got });
    }
    first_non_finite(x).map_or(Ok(()), |index| Err(TransformError::NonFinite { index }))
}

fn check_output(out: &Array2<f64>) -> Result<(), TransformError> {
    first_non_finite(&out.view()).map_or(Ok(()), |index| Err(TransformError::NonFinite { index }))
}

/// Column index of the first NaN/inf cell, scanning row by row
fn first_non_finite(x: &ArrayView2<f64>) -> Option<usize> {
    x.rows()
        .into_iter()
        .find_map(|row| row.iter().position(|v| !v.is_finite()))
}

fn default_true() -> bool {
    true
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn standard() -> ScalerArtifact {
        ScalerArtifact::Standard(StandardScaler::new(
            array![1.0, 2.0, 3.0, 4.0],
            array![1.0, 2.0, 0.0, 4.0],
        ))
    }

    #[test]
    fn test_standard_scaler_transform() {
        let x = array![[2.0, 4.0, 5.0, 8.0]];
        let out = standard().transform(&x.view()).unwrap();

        assert_eq!(out, array![[1.0, 1.0, 2.0, 1.0]]);
    }

    #[test]
    fn test_standard_scaler_rejects_wrong_width() {
        let x = array![[1.0, 2.0]];
        let err = standard().transform(&x.view()).unwrap_err();

        assert_eq!(err, TransformError::DimensionMismatch { expected: 4, got: 2 });
    }

    #[test]
    fn test_standard_scaler_rejects_nan() {
        let x = array![[1.0, f64::NAN, 3.0, 4.0]];
        let err = standard().transform(&x.view()).unwrap_err();

        assert_eq!(err, TransformError::NonFinite { index: 1 });
    }

    #[test]
    fn test_min_max_scaler_with_clip() {
        let mut scaler = MinMaxScaler::new(array![0.0, -1.0], array![0.5, 0.25]);
        scaler.clip = true;
        let scaler = ScalerArtifact::MinMax(scaler);

        let x = array![[1.0, 4.0], [4.0, 12.0]];
        let out = scaler.transform(&x.view()).unwrap();

        assert_eq!(out, array![[0.5, 0.0], [1.0, 1.0]]);
    }

    #[test]
    fn test_identity_scaler_keeps_values() {
        let scaler = ScalerArtifact::Identity { n_features: 3 };
        let x = Array2::from_shape_vec((1, 3), vec![7.0, 8.0, 9.0]).unwrap();

        assert_eq!(scaler.transform(&x.view()).unwrap(), x);
        assert_eq!(scaler.n_features(), Some(3));
    }

    #[test]
    fn test_validate_catches_length_mismatch() {
        let scaler = ScalerArtifact::Standard(StandardScaler::new(array![1.0, 2.0], array![1.0]));
        assert!(matches!(
            scaler.validate(),
            Err(TransformError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_scaler_artifact_json_layout() {
        let json = r#"{"standard":{"mean":{"v":1,"dim":[2],"data":[0.0,1.0]},"scale":{"v":1,"dim":[2],"data":[1.0,1.0]}}}"#;
        let scaler: ScalerArtifact = serde_json::from_str(json).unwrap();

        assert_eq!(scaler.kind(), "standard");
        assert_eq!(scaler.n_features(), Some(2));
    }
}
