//! Pixdrop Core Library
//!
//! This crate provides the domain models, constants and configuration shared by the
//! storage, processing and CLI crates. It performs no I/O beyond reading the environment.

pub mod config;
pub mod constants;
pub mod models;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use models::{
    AppliedTransform, DecodeLimits, DerivedFile, OutputEncoding, StagedFile, TransformSpec,
    UploadItem, ValidationPolicy,
};
