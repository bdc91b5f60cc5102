//! Export of analysis results for external renderers
//!
//! Heatmaps, scatter plots and network drawings are produced by other tools;
//! this module writes the CSV, GraphML and DOT files they read.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use petgraph::dot::{Config as DotConfig, Dot};

use crate::cluster::SearchOutcome;
use crate::graph::{AdjacencyGraph, GraphAnalysis};
use crate::similarity::SimilarityMatrix;

/// Write the clustering exports into `<output_dir>/visualizations`
pub fn generate_cluster_exports(
    outcome: &SearchOutcome,
    matrix: &SimilarityMatrix,
    output_dir: &str,
) -> Result<()> {
    log::info!("Generating clustering exports for {} runs", outcome.runs.len());

    let viz_dir = Path::new(output_dir).join("visualizations");
    fs::create_dir_all(&viz_dir)?;

    write_similarity_csv(matrix, &viz_dir.join("similarity_matrix.csv"))?;
    write_cluster_scores_csv(outcome, &viz_dir.join("cluster_scores.csv"))?;

    Ok(())
}

/// Write the network exports into `<output_dir>/visualizations`
pub fn generate_network_exports(
    analysis: &GraphAnalysis,
    matrix: &SimilarityMatrix,
    output_dir: &str,
) -> Result<()> {
    log::info!(
        "Generating network exports for {} communities",
        analysis.communities.len()
    );

    let viz_dir = Path::new(output_dir).join("visualizations");
    fs::create_dir_all(&viz_dir)?;

    write_similarity_csv(matrix, &viz_dir.join("similarity_matrix.csv"))?;

    // Isolated nodes are left out of drawings
    let connected = analysis.graph.subgraph(&analysis.connected_nodes());
    write_graphml(&connected, &viz_dir.join("network.graphml"))?;

    for (i, community) in analysis.communities.iter().enumerate() {
        let subgraph = analysis.graph.subgraph(&community.members);
        write_graphml(&subgraph, &viz_dir.join(format!("community_{}.graphml", i)))?;
    }

    let dot = format!(
        "{:?}",
        Dot::with_config(&connected.to_petgraph(), &[DotConfig::EdgeNoLabel])
    );
    fs::write(viz_dir.join("network.dot"), dot)?;

    write_memberships_csv(analysis, &viz_dir.join("node_memberships.csv"))?;

    Ok(())
}

/// Full matrix with a header row and an id column
pub fn write_similarity_csv(matrix: &SimilarityMatrix, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "id,{}", matrix.ids().join(","))?;
    for (i, id) in matrix.ids().iter().enumerate() {
        let row = matrix
            .values()
            .row(i)
            .iter()
            .map(|v| format!("{:.6}", v))
            .collect::<Vec<_>>();
        writeln!(file, "{},{}", id, row.join(","))?;
    }

    file.flush()?;
    Ok(())
}

/// One row per converged run: intra-cluster against inter-cluster quality
pub fn write_cluster_scores_csv(outcome: &SearchOutcome, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(
        file,
        "run,initial_medoids,iterations,similarity_avg,distance_avg,inter_cluster_distance_avg,balance_distance"
    )?;
    for (i, run) in outcome.runs.iter().enumerate() {
        let medoids = run
            .initial_medoids
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(";");
        writeln!(
            file,
            "{},{},{},{:.6},{:.6},{:.6},{:.6}",
            i,
            medoids,
            run.clustering.iterations,
            run.scores.similarity_avg,
            run.scores.distance_avg,
            run.scores.inter_cluster_distance_avg,
            run.scores.balance_distance()
        )?;
    }

    file.flush()?;
    Ok(())
}

/// Undirected GraphML with node labels
pub fn write_graphml(graph: &AdjacencyGraph, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    // Write GraphML header
    writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(file, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    writeln!(file, "  <key id=\"label\" for=\"node\" attr.name=\"label\" attr.type=\"string\"/>")?;
    writeln!(file, "  <graph id=\"G\" edgedefault=\"undirected\">")?;

    for (node, label) in graph.node_ids.iter().enumerate() {
        writeln!(
            file,
            "    <node id=\"n{}\">\n      <data key=\"label\">{}</data>\n    </node>",
            node,
            escape_xml(label)
        )?;
    }

    for (edge_id, (src, dst)) in graph.edge_pairs().enumerate() {
        writeln!(
            file,
            "    <edge id=\"e{}\" source=\"n{}\" target=\"n{}\"/>",
            edge_id, src, dst
        )?;
    }

    // Write GraphML footer
    writeln!(file, "  </graph>")?;
    writeln!(file, "</graphml>")?;

    file.flush()?;
    Ok(())
}

/// Per-node degree, centrality, hub flag and community membership count
pub fn write_memberships_csv(analysis: &GraphAnalysis, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "id,degree,degree_centrality,is_hub,community_memberships")?;
    for (node, (id, centrality)) in analysis.centrality.iter().enumerate() {
        writeln!(
            file,
            "{},{},{:.6},{},{}",
            id,
            analysis.graph.degree(node),
            centrality,
            analysis.hubs.contains(&node),
            analysis.membership_counts[node]
        )?;
    }

    file.flush()?;
    Ok(())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
