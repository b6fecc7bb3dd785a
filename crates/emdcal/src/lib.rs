//! emdcal library: application logic for the calibration experiment runner.

pub mod app;
pub mod config;
pub mod errors;
pub mod experiment;
