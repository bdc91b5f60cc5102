//! Thresholded similarity graph module

pub mod algorithms;
pub mod builder;
pub mod compressed;

pub use algorithms::{membership_counts, Community, CommunityAnnotation, DegreeCentrality, GraphAnalysis};
pub use builder::{mean_off_diagonal, ThresholdGraph, ThresholdGraphBuilder};
pub use compressed::AdjacencyGraph;
