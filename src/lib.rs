//! surveyfit: passenger survey analysis library
//!
//! Loads a passenger table, profiles it, applies a missing-data policy and
//! feature engineering, fits a regularised logistic regression on a
//! stratified split and writes a report, the cleaned data, coefficients and
//! diagnostic figures.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
