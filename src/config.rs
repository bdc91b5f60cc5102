//! Configuration management for the NP cluster analyzer

use serde::{Deserialize, Serialize};

/// A genomic interval used to select the windows under analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Chromosome name as written in the detection file (e.g. "chr13")
    pub chrom: String,

    /// Smallest allowed window start
    pub start: u64,

    /// Largest allowed window stop
    pub stop: u64,
}

impl Region {
    pub fn new(chrom: impl Into<String>, start: u64, stop: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            stop,
        }
    }

    /// The Hist1 locus on mouse chromosome 13 (21.7 - 24.1 Mb)
    pub fn hist1() -> Self {
        Self::new("chr13", 21_700_000, 24_100_000)
    }

    /// Whether a window lies fully inside this region
    pub fn contains(&self, chrom: &str, start: u64, stop: u64) -> bool {
        chrom == self.chrom && start >= self.start && stop <= self.stop
    }
}

/// Default configuration for the NP cluster analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of clusters to partition NPs into
    pub k: usize,

    /// Cap on assign/update rounds per clustering run
    pub max_iterations: usize,

    /// Number of independently seeded clustering runs
    pub runs: usize,

    /// Number of top-centrality hubs to build communities around
    pub hub_count: usize,

    /// Master random seed; `None` draws one from the OS
    pub seed: Option<u64>,

    /// Window subset to analyze; `None` keeps the whole genome
    pub region: Option<Region>,

    /// Number of worker threads (0 = use all available cores)
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k: 3,
            max_iterations: 100,
            runs: 100,
            hub_count: 5,
            seed: None,
            region: Some(Region::hist1()),
            threads: 0,
        }
    }
}

impl Config {
    /// Create a new configuration with custom values
    pub fn new(
        k: usize,
        max_iterations: usize,
        runs: usize,
        hub_count: usize,
        seed: Option<u64>,
        region: Option<Region>,
    ) -> Self {
        Self {
            k,
            max_iterations,
            runs,
            hub_count,
            seed,
            region,
            threads: 0,
        }
    }

    /// Resolved worker thread count
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            num_cpus::get()
        }
    }
}
