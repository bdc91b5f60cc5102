//! Results persistence module

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, to_string_pretty};

use crate::cluster::{Criterion, SearchOutcome};
use crate::config::Config;
use crate::data::DatasetSummary;
use crate::graph::GraphAnalysis;
use crate::similarity::SimilarityMatrix;

/// File name of the persisted similarity matrix
pub const SIMILARITY_FILE: &str = "similarity.bin";

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    file.write_all(to_string_pretty(value)?.as_bytes())?;
    Ok(())
}

/// Save the run configuration and dataset summary
pub fn save_summary(config: &Config, summary: &DatasetSummary, output_dir: &str) -> Result<()> {
    log::info!("Saving summary information");
    fs::create_dir_all(output_dir)?;

    let summary = json!({
        "config": config,
        "dataset": summary,
    });

    write_json(&Path::new(output_dir).join("summary.json"), &summary)
}

/// Save the winning clustering under every criterion plus per-run scores
pub fn save_clustering(outcome: &SearchOutcome, matrix: &SimilarityMatrix, output_dir: &str) -> Result<()> {
    log::info!(
        "Saving clustering results for {} runs to {}",
        outcome.runs.len(),
        output_dir
    );
    fs::create_dir_all(output_dir)?;

    let best = Criterion::ALL
        .iter()
        .map(|&criterion| {
            let run = outcome.best(criterion);
            let clusters = run.clustering.cluster_ids(matrix);
            json!({
                "criterion": criterion.name(),
                "initial_medoids": run
                    .initial_medoids
                    .iter()
                    .map(|&m| matrix.ids()[m].clone())
                    .collect::<Vec<_>>(),
                "medoids": run.clustering.medoid_ids(matrix),
                "iterations": run.clustering.iterations,
                "scores": run.scores,
                "balance_distance": run.scores.balance_distance(),
                "clusters": clusters,
            })
        })
        .collect::<Vec<_>>();

    let failures = outcome
        .failures
        .iter()
        .map(|failure| {
            json!({
                "initial_medoids": failure.initial_medoids,
                "error": failure.error.to_string(),
            })
        })
        .collect::<Vec<_>>();

    let clustering = json!({
        "entity_count": matrix.len(),
        "converged_runs": outcome.runs.len(),
        "failed_runs": outcome.failures.len(),
        "best": best,
        "failures": failures,
    });

    write_json(&Path::new(output_dir).join("clustering.json"), &clustering)
}

/// Save threshold, centralities, hubs and communities
pub fn save_network(analysis: &GraphAnalysis, output_dir: &str) -> Result<()> {
    log::info!("Saving network analysis");
    fs::create_dir_all(output_dir)?;

    let ids = &analysis.graph.node_ids;
    let centrality = analysis
        .centrality
        .iter()
        .map(|(id, value)| json!({ "id": id, "degree_centrality": value }))
        .collect::<Vec<_>>();

    let communities = analysis
        .communities
        .iter()
        .enumerate()
        .map(|(i, community)| {
            json!({
                "hub": community.hub_id,
                "size": community.len(),
                "members": community.member_ids,
                "annotations": analysis.annotations.as_ref().map(|all| &all[i]),
            })
        })
        .collect::<Vec<_>>();

    let network = json!({
        "threshold": analysis.threshold,
        "node_count": analysis.graph.node_count,
        "edge_count": analysis.graph.edge_count(),
        "hubs": analysis.hubs.iter().map(|&h| ids[h].clone()).collect::<Vec<_>>(),
        "centrality": centrality,
        "communities": communities,
    });

    write_json(&Path::new(output_dir).join("network.json"), &network)
}

/// Write a similarity matrix in bincode form
pub fn save_similarity(matrix: &SimilarityMatrix, path: &Path) -> Result<()> {
    log::info!("Saving {}x{} similarity matrix to {}", matrix.len(), matrix.len(), path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, matrix)?;
    Ok(())
}

/// Read a similarity matrix written by [`save_similarity`]
pub fn load_similarity(path: &Path) -> Result<SimilarityMatrix> {
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("opening similarity matrix {}", path.display()))?,
    );
    let matrix: SimilarityMatrix = bincode::deserialize_from(reader)?;
    log::info!("Loaded {}x{} similarity matrix", matrix.len(), matrix.len());
    Ok(matrix)
}
