//! Report module - text report, exported files, figures and console summary

pub mod export;
pub mod plots;
pub mod summary;
pub mod text_report;

pub use export::*;
pub use summary::*;
pub use text_report::*;
