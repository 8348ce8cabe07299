// Library interface for trainload
// The binary and the integration tests both go through these modules

pub mod aggregation;
pub mod config;
pub mod engine;
pub mod error;
pub mod import;
pub mod logging;
pub mod models;
pub mod pmc;
pub mod readiness;
pub mod tss;
pub mod zones;

// Re-export commonly used types for convenience
pub use aggregation::{DailyLoadAggregator, DateWindow};
pub use engine::{EngineConfig, TrainingLoadEngine, TrainingLoadReport};
pub use error::{Result, TrainLoadError};
pub use models::*;
pub use pmc::{PmcCalculator, PmcMetrics, TrainingStatus};
pub use readiness::{ReadinessEvaluator, ReadinessLevel, ReadinessResult};
pub use tss::StressEstimator;
pub use zones::{AnalysisResult, ZoneAnalyzer, ZoneModel, ZoneScheme};
