pub mod upload;
pub mod extraction;
pub mod analysis;
pub mod translation;
pub mod formatting;
pub mod cleanup;
pub mod processor; // Report pipeline orchestrator

pub use processor::{
    PipelineProfile, PipelineStage, ProcessRequest, ProcessingError, ProcessingOutcome,
    ReportProcessor,
};
