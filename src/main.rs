use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use np_cluster_analyzer::cluster::{Criterion, MedoidClusterer, MedoidSearch};
use np_cluster_analyzer::config::{Config, Region};
use np_cluster_analyzer::data::{self, DetectionMatrix};
use np_cluster_analyzer::graph::{GraphAnalysis, ThresholdGraphBuilder};
use np_cluster_analyzer::similarity::{SimilarityKind, SimilarityMatrix};
use np_cluster_analyzer::{storage, viz};

#[derive(Parser, Debug)]
#[clap(
    name = "np-cluster-analyzer",
    about = "Clustering and co-segregation network analysis of NP window detections"
)]
struct Cli {
    /// Path to input detection file (TSV or Parquet)
    #[clap(long)]
    input: String,

    /// Output directory for results
    #[clap(long, default_value = "np_results")]
    output_dir: String,

    /// Chromosome of the region to analyze (default: the Hist1 locus)
    #[clap(long)]
    chrom: Option<String>,

    /// First base of the region
    #[clap(long, requires = "chrom")]
    start: Option<u64>,

    /// Last base of the region
    #[clap(long, requires = "chrom")]
    stop: Option<u64>,

    /// Analyze every window instead of a region
    #[clap(long, conflicts_with = "chrom")]
    whole_genome: bool,

    /// Random seed for reproducible clustering
    #[clap(long)]
    seed: Option<u64>,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a similarity matrix and save it
    Similarity {
        #[clap(long, value_enum, default_value = "normalized-jaccard")]
        measure: Measure,
    },

    /// Cluster NPs around medoids from many random starts
    Cluster {
        /// Number of clusters
        #[clap(long, default_value = "3")]
        k: usize,

        /// Number of initial medoid sets to try
        #[clap(long, default_value = "100")]
        runs: usize,

        /// Cap on assign/update rounds per run
        #[clap(long, default_value = "100")]
        max_iterations: usize,

        /// Reuse a saved NP similarity matrix
        #[clap(long)]
        matrix: Option<String>,
    },

    /// Build the window co-segregation network and its hub communities
    Network {
        /// Number of hubs to build communities around
        #[clap(long, default_value = "5")]
        hubs: usize,

        /// Per-window feature flags (CSV) used to annotate communities
        #[clap(long)]
        features: Option<String>,

        /// Fixed edge threshold instead of the mean linkage
        #[clap(long)]
        threshold: Option<f64>,

        /// Reuse a saved window linkage matrix
        #[clap(long)]
        matrix: Option<String>,
    },

    /// Describe the dataset only
    Summary,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Measure {
    NormalizedJaccard,
    Jaccard,
    Linkage,
}

impl Measure {
    fn kind(self) -> SimilarityKind {
        match self {
            Measure::NormalizedJaccard => SimilarityKind::NormalizedJaccard,
            Measure::Jaccard => SimilarityKind::Jaccard,
            Measure::Linkage => SimilarityKind::NormalizedLinkage,
        }
    }
}

impl Cli {
    fn region(&self) -> Option<Region> {
        if self.whole_genome {
            return None;
        }
        match &self.chrom {
            Some(chrom) => Some(Region::new(
                chrom.clone(),
                self.start.unwrap_or(0),
                self.stop.unwrap_or(u64::MAX),
            )),
            None => Some(Region::hist1()),
        }
    }

    fn config(&self) -> Config {
        let mut config = Config {
            seed: self.seed,
            region: self.region(),
            threads: self.threads,
            ..Config::default()
        };
        match &self.command {
            Command::Cluster { k, runs, max_iterations, .. } => {
                config.k = *k;
                config.runs = *runs;
                config.max_iterations = *max_iterations;
            }
            Command::Network { hubs, .. } => config.hub_count = *hubs,
            _ => {}
        }
        config
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let config = args.config();

    let num_threads = config.worker_threads();
    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    log::info!("Starting NP cluster analysis");
    log::info!("Input: {}", args.input);
    log::info!("Output: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    // 1. Load and restrict the detection matrix
    let detections = load(&args.input, &config)?;
    let summary = detections.summary();
    log::info!(
        "Analyzing {} windows x {} NPs ({:.1} windows per NP on average)",
        summary.window_count,
        summary.sample_count,
        summary.mean_windows_per_sample
    );
    storage::save_summary(&config, &summary, &args.output_dir)?;

    // 2. Run the requested analysis
    match &args.command {
        Command::Similarity { measure } => {
            let matrix = SimilarityMatrix::from_detections(&detections, measure.kind())?;
            storage::save_similarity(&matrix, &Path::new(&args.output_dir).join(storage::SIMILARITY_FILE))?;
            viz::write_similarity_csv(&matrix, &Path::new(&args.output_dir).join("similarity_matrix.csv"))?;
        }
        Command::Cluster { matrix, .. } => {
            let matrix = match matrix {
                Some(path) => storage::load_similarity(Path::new(path))?,
                None => SimilarityMatrix::from_detections(&detections, SimilarityKind::NormalizedJaccard)?,
            };

            let clusterer = MedoidClusterer::new(config.k).with_max_iterations(config.max_iterations);
            let mut search = MedoidSearch::new(clusterer, config.runs);
            if let Some(seed) = config.seed {
                search = search.with_seed(seed);
            }
            let outcome = search.run(&matrix)?;

            for criterion in Criterion::ALL {
                let best = outcome.best(criterion);
                log::info!(
                    "Best by {}: medoids {:?}, sizes {:?}, similarity {:.4}, separation {:.4}",
                    criterion.name(),
                    best.clustering.medoid_ids(&matrix),
                    best.clustering.partition.sizes(),
                    best.scores.similarity_avg,
                    best.scores.inter_cluster_distance_avg
                );
            }

            storage::save_clustering(&outcome, &matrix, &args.output_dir)?;
            viz::generate_cluster_exports(&outcome, &matrix, &args.output_dir)?;
        }
        Command::Network {
            features,
            threshold,
            matrix,
            ..
        } => {
            let matrix = match matrix {
                Some(path) => storage::load_similarity(Path::new(path))?,
                None => SimilarityMatrix::from_detections(&detections, SimilarityKind::NormalizedLinkage)?,
            };

            let features = match features {
                Some(path) => Some(data::loader::load_feature_table(path, matrix.ids())?),
                None => None,
            };

            let mut builder = ThresholdGraphBuilder::new();
            if let Some(threshold) = threshold {
                builder = builder.with_threshold(*threshold);
            }

            let analysis = GraphAnalysis::run(&matrix, &builder, config.hub_count, features.as_ref())?;
            log::info!(
                "Network has {} edges at threshold {:.4}; {} of {} windows connected",
                analysis.graph.edge_count(),
                analysis.threshold,
                analysis.connected_nodes().len(),
                analysis.graph.node_count
            );

            storage::save_network(&analysis, &args.output_dir)?;
            viz::generate_network_exports(&analysis, &matrix, &args.output_dir)?;
        }
        Command::Summary => {}
    }

    log::info!("Analysis complete. Results saved to {}", args.output_dir);

    Ok(())
}

fn load(input: &str, config: &Config) -> Result<DetectionMatrix> {
    let detections = data::loader::load_detection_matrix(input)?;
    let detections = match &config.region {
        Some(region) => data::preprocessing::filter_region(&detections, region),
        None => detections,
    };
    Ok(detections)
}
