//! Pipeline module - the analysis stages and the runner that chains them

pub mod cleaner;
pub mod columns;
pub mod diagnostics;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod loader;
pub mod model;
pub mod runner;
pub mod schema;
pub mod split;

pub use cleaner::{clean, CleanOutcome};
pub use diagnostics::{
    categorical_summary, missingness, numeric_summary, survival_rate_by, CategoricalSummary,
    GroupRate, MissingEntry, NumericSummary,
};
pub use error::{Notice, NoticeLevel, PipelineError, PipelineResult};
pub use evaluation::{evaluate, ConfusionMatrix, EvaluationResult};
pub use features::{
    build_feature_matrix, encode_features, FeatureMatrix, FeatureSet, ScalingScope, Standardizer,
};
pub use loader::{dataset_stats, load_dataset};
pub use model::{fit, FitConfig, FitError, FitOutcome, LogisticModel};
pub use runner::{run_pipeline, ModelRun, PipelineConfig, RunOutcome};
pub use schema::{normalize_column_name, Field};
pub use split::{stratified_split, Partition};
