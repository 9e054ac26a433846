//! Elastic net regression fitted by cyclic coordinate descent.
//!
//! Minimizes `1/(2n)·‖y − Xw − b‖² + α·ρ·‖w‖₁ + ½·α·(1−ρ)·‖w‖²` with an
//! unpenalized intercept `b`.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

/// Errors for the regularized regression model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model has not been fitted yet")]
    NotFitted,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Solver parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticNetParams {
    pub alpha: f64,
    /// Share of the penalty that is L1 (ρ).
    pub l1_ratio: f64,
    pub max_iter: usize,
    /// Stop once the largest coefficient update falls below this fraction of
    /// the largest coefficient.
    pub tolerance: f64,
}

impl Default for ElasticNetParams {
    fn default() -> Self {
        Self {
            alpha: 1e-5,
            l1_ratio: 0.5,
            max_iter: 10_000,
            tolerance: 1e-5,
        }
    }
}

/// Convergence report of one fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSummary {
    pub converged: bool,
    pub iterations: usize,
    pub objective: f64,
}

#[derive(Debug, Clone)]
pub struct ElasticNet {
    params: ElasticNetParams,
    coefficients: Option<Array1<f64>>,
    intercept: Option<f64>,
}

impl ElasticNet {
    #[must_use]
    pub fn new(params: ElasticNetParams) -> Self {
        Self {
            params,
            coefficients: None,
            intercept: None,
        }
    }

    /// Fits the model.
    ///
    /// When the iteration budget runs out the lowest-objective iterate seen
    /// is kept and the summary reports `converged == false`.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidParameter`] for out-of-domain parameters or
    /// an empty design matrix, and [`ModelError::DimensionMismatch`] when `x`
    /// and `y` disagree on the number of samples.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FitSummary, ModelError> {
        self.validate()?;
        if x.nrows() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.nrows(),
                got: y.len(),
            });
        }
        if x.nrows() == 0 {
            return Err(ModelError::InvalidParameter(
                "cannot fit on zero samples".to_string(),
            ));
        }

        let n_features = x.ncols();
        #[allow(clippy::cast_precision_loss)]
        let n_samples = x.nrows() as f64;

        let x_mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let y_mean = y.mean().unwrap_or(0.0);
        let x_centered = x - &x_mean;
        let y_centered = y - y_mean;

        let column_norms: Vec<f64> = x_centered
            .columns()
            .into_iter()
            .map(|col| col.dot(&col))
            .collect();

        let l1_penalty = n_samples * self.params.alpha * self.params.l1_ratio;
        let l2_penalty = n_samples * self.params.alpha * (1.0 - self.params.l1_ratio);

        let mut coef = Array1::<f64>::zeros(n_features);
        let mut residual = y_centered.clone();
        let mut best_coef = coef.clone();
        let mut best_objective = self.objective(residual.view(), coef.view(), n_samples);
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..self.params.max_iter {
            iterations = iter + 1;
            let mut max_update = 0.0_f64;
            let mut max_coef = 0.0_f64;

            for j in 0..n_features {
                let old = coef[j];
                let new = if column_norms[j] > 1e-12 {
                    let column = x_centered.column(j);
                    let rho = column.dot(&residual) + column_norms[j] * old;
                    soft_threshold(rho, l1_penalty) / (column_norms[j] + l2_penalty)
                } else {
                    0.0
                };

                let delta = new - old;
                if delta != 0.0 {
                    residual.scaled_add(-delta, &x_centered.column(j));
                    coef[j] = new;
                }
                max_update = max_update.max(delta.abs());
                max_coef = max_coef.max(new.abs());
            }

            let objective = self.objective(residual.view(), coef.view(), n_samples);
            if objective <= best_objective {
                best_objective = objective;
                best_coef.assign(&coef);
            }

            if max_update <= self.params.tolerance * max_coef || max_update == 0.0 {
                converged = true;
                break;
            }
        }

        let intercept = y_mean - x_mean.dot(&best_coef);
        self.coefficients = Some(best_coef);
        self.intercept = Some(intercept);

        Ok(FitSummary {
            converged,
            iterations,
            objective: best_objective,
        })
    }

    /// Predicts targets for new samples.
    ///
    /// # Errors
    /// Returns [`ModelError::NotFitted`] before a successful fit and
    /// [`ModelError::DimensionMismatch`] for the wrong feature count.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let coef = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        let intercept = self.intercept.ok_or(ModelError::NotFitted)?;
        if x.ncols() != coef.len() {
            return Err(ModelError::DimensionMismatch {
                expected: coef.len(),
                got: x.ncols(),
            });
        }
        Ok(x.dot(coef) + intercept)
    }

    #[must_use]
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    #[must_use]
    pub fn intercept(&self) -> Option<f64> {
        self.intercept
    }

    /// Number of coefficients that are exactly zero.
    #[must_use]
    pub fn zero_coefficients(&self) -> usize {
        self.coefficients
            .as_ref()
            .map_or(0, |coef| coef.iter().filter(|c| **c == 0.0).count())
    }

    fn validate(&self) -> Result<(), ModelError> {
        let p = &self.params;
        if !(p.alpha >= 0.0 && p.alpha.is_finite()) {
            return Err(ModelError::InvalidParameter(format!("alpha = {}", p.alpha)));
        }
        if !(0.0..=1.0).contains(&p.l1_ratio) {
            return Err(ModelError::InvalidParameter(format!(
                "l1_ratio = {}",
                p.l1_ratio
            )));
        }
        if p.max_iter == 0 {
            return Err(ModelError::InvalidParameter("max_iter = 0".to_string()));
        }
        Ok(())
    }

    fn objective(&self, residual: ArrayView1<f64>, coef: ArrayView1<f64>, n_samples: f64) -> f64 {
        let l1: f64 = coef.iter().map(|c| c.abs()).sum();
        let l2: f64 = coef.dot(&coef);
        residual.dot(&residual) / (2.0 * n_samples)
            + self.params.alpha * self.params.l1_ratio * l1
            + 0.5 * self.params.alpha * (1.0 - self.params.l1_ratio) * l2
    }
}

fn soft_threshold(x: f64, lambda: f64) -> f64 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn params(alpha: f64) -> ElasticNetParams {
        ElasticNetParams {
            alpha,
            l1_ratio: 0.5,
            max_iter: 10_000,
            tolerance: 1e-8,
        }
    }

    #[test]
    fn recovers_linear_relationship_with_small_penalty() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0], [5.0, 0.0]];
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0) - x.column(1).mapv(|v| 0.5 * v);

        let mut model = ElasticNet::new(params(1e-8));
        let summary = model.fit(&x, &y).unwrap();

        assert!(summary.converged);
        let coef = model.coefficients().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-4);
        assert!((coef[1] + 0.5).abs() < 1e-4);
        assert!((model.intercept().unwrap() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn heavy_penalty_zeroes_all_coefficients() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 3.0]];
        let y = array![0.1, 0.2, 0.3, 0.4];

        let mut model = ElasticNet::new(params(1e3));
        model.fit(&x, &y).unwrap();

        assert_eq!(model.zero_coefficients(), 2);
        assert!((model.intercept().unwrap() - 0.25).abs() < 1e-12);
        let prediction = model.predict(&array![[10.0, -10.0]]).unwrap();
        assert!((prediction[0] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn constant_column_gets_zero_weight() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]];
        let y = array![1.0, 2.0, 3.0];
        let mut model = ElasticNet::new(params(1e-6));
        model.fit(&x, &y).unwrap();
        assert_eq!(model.coefficients().unwrap()[1], 0.0);
    }

    #[test]
    fn exhausted_budget_reports_not_converged() {
        let x = array![[1.0, 0.9], [2.0, 2.1], [3.0, 2.9], [4.0, 4.2]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let mut model = ElasticNet::new(ElasticNetParams {
            max_iter: 1,
            ..params(1e-6)
        });

        let summary = model.fit(&x, &y).unwrap();
        assert!(!summary.converged);
        assert_eq!(summary.iterations, 1);
        assert!(model.coefficients().is_some());
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let model = ElasticNet::new(ElasticNetParams::default());
        assert_eq!(
            model.predict(&array![[1.0]]).unwrap_err(),
            ModelError::NotFitted
        );
    }

    #[test]
    fn mismatched_samples_are_rejected() {
        let mut model = ElasticNet::new(ElasticNetParams::default());
        let err = model.fit(&array![[1.0], [2.0]], &array![1.0]).unwrap_err();
        assert_eq!(err, ModelError::DimensionMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn invalid_l1_ratio_is_rejected() {
        let mut model = ElasticNet::new(ElasticNetParams {
            l1_ratio: 1.5,
            ..ElasticNetParams::default()
        });
        assert!(matches!(
            model.fit(&array![[1.0]], &array![1.0]),
            Err(ModelError::InvalidParameter(_))
        ));
    }
}
