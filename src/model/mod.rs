//! Deviation modelling
//!
//! # Components
//!
//! - **arma**: ARMA(p,0,q) maximum-likelihood estimation and forecasting
//! - **deviation**: official-minus-central deviation model and adjusted rates
//! - **kalman**: state-space form and Kalman filter behind the likelihood
//! - **optimize**: Nelder–Mead simplex minimiser
//! - **transform**: stationarity / invertibility reparameterisation

pub mod arma;
pub mod deviation;
pub mod kalman;
pub mod optimize;
pub mod transform;

pub use arma::{ArmaEstimator, ArmaOrder, ArmaParams, DeviationForecast, FittedArma};
pub use deviation::{AdjustedRow, DeviationFit, DeviationModel};

#[cfg(test)]
pub(crate) mod testing;
