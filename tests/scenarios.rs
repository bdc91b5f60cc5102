use std::fs;

use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

use np_cluster_analyzer::cluster::{score_clustering, Criterion, MedoidClusterer, MedoidSearch};
use np_cluster_analyzer::config::Region;
use np_cluster_analyzer::data::{loader, preprocessing, DetectionMatrix, Window};
use np_cluster_analyzer::graph::{GraphAnalysis, ThresholdGraphBuilder};
use np_cluster_analyzer::similarity::{normalized_linkage, SimilarityKind, SimilarityMatrix};
use np_cluster_analyzer::storage;

fn windows(n: u64) -> Vec<Window> {
    (0..n)
        .map(|i| Window {
            id: i.to_string(),
            chrom: "chr13".to_string(),
            start: 21_700_000 + i * 40_000,
            stop: 21_740_000 + i * 40_000,
        })
        .collect()
}

fn two_block_detections() -> DetectionMatrix {
    // columns A, B, C, D; A = B = [1, 1, 0, 0], C = D = [0, 0, 1, 1]
    DetectionMatrix::new(
        windows(4),
        vec!["A".into(), "B".into(), "C".into(), "D".into()],
        array![[1, 1, 0, 0], [1, 1, 0, 0], [0, 0, 1, 1], [0, 0, 1, 1]],
    )
    .unwrap()
}

#[test]
fn two_medoids_split_identical_pairs_in_one_iteration() {
    let detections = two_block_detections();
    let matrix = SimilarityMatrix::from_samples(&detections, SimilarityKind::NormalizedJaccard).unwrap();
    assert_eq!(matrix.get_by_id("A", "B").unwrap(), 1.0);
    assert_eq!(matrix.get_by_id("A", "C").unwrap(), 0.0);

    let clustering = MedoidClusterer::new(2)
        .run_with_ids(&matrix, &["A".to_string(), "C".to_string()], &mut StdRng::seed_from_u64(1))
        .unwrap();

    assert_eq!(clustering.iterations, 1);
    assert_eq!(
        clustering.cluster_ids(&matrix),
        vec![vec!["A".to_string(), "B".to_string()], vec!["C".to_string(), "D".to_string()]]
    );

    let scores = score_clustering(&clustering, &matrix).unwrap();
    assert_eq!(scores.similarity_avg, 1.0);
    assert_eq!(scores.inter_cluster_distance_avg, 1.0);
}

#[test]
fn uniform_similarity_gives_an_edgeless_network() {
    let matrix = SimilarityMatrix::from_values(
        vec!["x".into(), "y".into(), "z".into()],
        array![[1.0, 0.5, 0.5], [0.5, 1.0, 0.5], [0.5, 0.5, 1.0]],
    )
    .unwrap();

    let analysis = GraphAnalysis::run(&matrix, &ThresholdGraphBuilder::new(), 5, None).unwrap();
    assert_eq!(analysis.threshold, 0.5);
    assert_eq!(analysis.graph.edge_count(), 0);
    assert!(analysis.centrality.values().iter().all(|&c| c == 0.0));
}

#[test]
fn undetected_window_has_zero_linkage_with_every_partner() {
    let detections = DetectionMatrix::new(
        windows(4),
        vec!["NP1".into(), "NP2".into(), "NP3".into()],
        array![[0, 0, 0], [1, 0, 1], [1, 1, 0], [0, 1, 1]],
    )
    .unwrap();

    let matrix = SimilarityMatrix::from_windows(&detections, SimilarityKind::NormalizedLinkage).unwrap();
    for partner in 0..4 {
        assert_eq!(matrix.get(0, partner), 0.0);
    }
    // self-linkage of a window detected in some but not all NPs is maximal
    assert_eq!(matrix.get(1, 1), 1.0);
}

#[test]
fn file_to_results_pipeline() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("detections.tsv");
    fs::write(
        &input,
        "chrom\tstart\tstop\tNP1\tNP2\tNP3\tNP4\tNP5\n\
         chr13\t21700000\t21740000\t1\t1\t0\t0\t0\n\
         chr13\t21740000\t21780000\t1\t1\t0\t0\t0\n\
         chr13\t21780000\t21820000\t0\t0\t1\t1\t0\n\
         chr13\t21820000\t21860000\t0\t0\t1\t1\t0\n\
         chr1\t1000\t41000\t0\t0\t0\t0\t1\n",
    )
    .unwrap();

    let detections = loader::load_detection_matrix(input.to_str().unwrap()).unwrap();
    let detections = preprocessing::filter_region(&detections, &Region::hist1());
    assert_eq!(detections.window_count(), 4);
    assert_eq!(detections.sample_count(), 5);

    let matrix = SimilarityMatrix::from_detections(&detections, SimilarityKind::NormalizedJaccard).unwrap();
    assert_eq!(matrix.ids(), &["NP1", "NP2", "NP3", "NP4"]);
    let outcome = MedoidSearch::new(MedoidClusterer::new(2), 20)
        .with_seed(7)
        .run(&matrix)
        .unwrap();
    let best = outcome.best(Criterion::Balance);
    assert_eq!(best.scores.balance_distance(), 0.0);

    let out = dir.path().join("out");
    let out = out.to_str().unwrap();
    storage::save_clustering(&outcome, &matrix, out).unwrap();

    // NP5 detects nothing in the region but still counts towards frequencies
    let windows = SimilarityMatrix::from_detections(&detections, SimilarityKind::NormalizedLinkage).unwrap();
    let expected = normalized_linkage(&[1, 1, 0, 0, 0], &[0, 0, 1, 1, 0]).unwrap();
    assert_eq!(windows.get(0, 2), expected);
    let path = dir.path().join("out").join(storage::SIMILARITY_FILE);
    storage::save_similarity(&windows, &path).unwrap();
    let reloaded = storage::load_similarity(&path).unwrap();

    let analysis = GraphAnalysis::run(&reloaded, &ThresholdGraphBuilder::new(), 2, None).unwrap();
    assert_eq!(analysis.graph.edge_count(), 2);
    assert_eq!(analysis.communities.len(), 2);
}
