//! Pipeline orchestration

mod analyzer;

pub use analyzer::AnalysisPipeline;
