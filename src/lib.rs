//! Core library functions for the NP cluster analyzer

pub mod config;
pub mod error;
pub mod data;
pub mod similarity;
pub mod cluster;
pub mod graph;
pub mod storage;
pub mod viz;

pub use anyhow::{Result, anyhow};
pub use error::{AnalysisError, AnalysisResult};
