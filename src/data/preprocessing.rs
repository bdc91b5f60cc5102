//! Data preprocessing module for detection matrix analysis

use crate::config::Region;
use crate::data::DetectionMatrix;

/// Keep only the windows that lie inside `region`, preserving their order
pub fn filter_region(matrix: &DetectionMatrix, region: &Region) -> DetectionMatrix {
    let rows: Vec<usize> = matrix
        .windows()
        .iter()
        .enumerate()
        .filter(|(_, w)| region.contains(&w.chrom, w.start, w.stop))
        .map(|(i, _)| i)
        .collect();

    let cols: Vec<usize> = (0..matrix.sample_count()).collect();

    log::info!(
        "Region {}:{}-{} keeps {} of {} windows",
        region.chrom,
        region.start,
        region.stop,
        rows.len(),
        matrix.window_count()
    );

    matrix.select(&rows, &cols)
}

/// Drop NPs that detect none of the remaining windows
pub fn drop_empty_samples(matrix: &DetectionMatrix) -> DetectionMatrix {
    let cols: Vec<usize> = matrix
        .windows_per_sample()
        .into_iter()
        .enumerate()
        .filter(|&(_, count)| count > 0)
        .map(|(i, _)| i)
        .collect();

    let rows: Vec<usize> = (0..matrix.window_count()).collect();

    log::debug!(
        "Dropping {} NPs with no detections",
        matrix.sample_count() - cols.len()
    );

    matrix.select(&rows, &cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Window;
    use ndarray::array;

    fn window(id: &str, chrom: &str, start: u64) -> Window {
        Window {
            id: id.to_string(),
            chrom: chrom.to_string(),
            start,
            stop: start + 30_000,
        }
    }

    fn genome() -> DetectionMatrix {
        DetectionMatrix::new(
            vec![
                window("0", "chr12", 22_000_000),
                window("1", "chr13", 21_690_000),
                window("2", "chr13", 21_700_000),
                window("3", "chr13", 22_500_000),
                window("4", "chr13", 24_090_000),
            ],
            vec!["F1".into(), "F2".into(), "F3".into()],
            array![[1, 1, 1], [1, 0, 1], [1, 0, 0], [0, 0, 1], [1, 1, 1]],
        )
        .unwrap()
    }

    #[test]
    fn region_filter_keeps_contained_windows() {
        let filtered = filter_region(&genome(), &Region::hist1());
        assert_eq!(filtered.window_ids(), vec!["2".to_string(), "3".to_string()]);
        assert_eq!(filtered.sample_count(), 3);
    }

    #[test]
    fn empty_samples_are_dropped_after_filtering() {
        let filtered = drop_empty_samples(&filter_region(&genome(), &Region::hist1()));
        assert_eq!(filtered.samples(), &["F1".to_string(), "F3".to_string()]);
        assert_eq!(filtered.sample_vector(1), vec![0, 1]);
    }
}
