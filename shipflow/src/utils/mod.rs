//! Small utilities shared across the pipeline.

pub mod fs;
