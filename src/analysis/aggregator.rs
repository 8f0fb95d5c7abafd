//! Series statistics and classification.
//!
//! This module summarizes the data series of line-chart projections and
//! sorts their values into the misinformation bands used by the report.

use crate::models::{BandCounts, MatrixShape, Projection, Series, SeriesStats, Shape};
use crate::projection::shapes::THRESHOLDS;
use std::cmp::Ordering;

/// Classification band of a propagation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    /// Below the first threshold.
    Below,
    FactualError,
    Lie,
    Propaganda,
}

impl Band {
    /// Band of a value: `[1, 3)` factual error, `[3, 4)` lie, `>= 4` propaganda.
    pub fn classify(value: f64) -> Self {
        let [(factual_error, _), (lie, _), (propaganda, _)] = THRESHOLDS;

        if value >= propaganda {
            Band::Propaganda
        } else if value >= lie {
            Band::Lie
        } else if value >= factual_error {
            Band::FactualError
        } else {
            Band::Below
        }
    }

    /// Display label, matching the threshold series names.
    pub fn label(&self) -> &'static str {
        match self {
            Band::Below => "Below",
            Band::FactualError => "Factual Error",
            Band::Lie => "Lie",
            Band::Propaganda => "Propaganda",
        }
    }
}

/// Count values per band.
pub fn band_counts(values: &[f64]) -> BandCounts {
    let mut counts = BandCounts::default();

    for value in values {
        match Band::classify(*value) {
            Band::Below => counts.below += 1,
            Band::FactualError => counts.factual_error += 1,
            Band::Lie => counts.lie += 1,
            Band::Propaganda => counts.propaganda += 1,
        }
    }

    counts
}

/// Min, max, mean and peak position of one series.
///
/// An empty series reports zeros and `peak_agent = 0`.
pub fn series_stats(series: &Series) -> SeriesStats {
    let values = &series.values;

    if values.is_empty() {
        return SeriesStats {
            name: series.name.clone(),
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            peak_agent: 0,
            band_counts: BandCounts::default(),
        };
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let (peak_index, max) = values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        });
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    SeriesStats {
        name: series.name.clone(),
        min,
        max,
        mean,
        peak_agent: peak_index + 1,
        band_counts: band_counts(values),
    }
}

/// Statistics of every data series in the line-chart projections.
pub fn collect_statistics(projections: &[Projection]) -> Vec<SeriesStats> {
    projections
        .iter()
        .filter_map(|projection| match &projection.shape {
            Shape::LabeledSeries(table) => Some(table),
            _ => None,
        })
        .flat_map(|table| table.data_series())
        .map(series_stats)
        .collect()
}

/// Top `n` series by peak value (highest first).
pub fn most_propagating(stats: &[SeriesStats], n: usize) -> Vec<&SeriesStats> {
    let mut sorted: Vec<&SeriesStats> = stats.iter().collect();
    sorted.sort_by(|a, b| b.max.partial_cmp(&a.max).unwrap_or(Ordering::Equal));
    sorted.truncate(n);
    sorted
}

/// Mean of each matrix column, paired with its label.
pub fn matrix_column_means(matrix: &MatrixShape) -> Vec<(String, f64)> {
    matrix
        .col_labels
        .iter()
        .enumerate()
        .map(|(column, label)| {
            let values: Vec<f64> = matrix
                .cells
                .iter()
                .filter_map(|row| row.get(column).copied())
                .collect();
            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            (label.clone(), mean)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabeledSeries, SeriesKind};

    fn data_series(name: &str, values: Vec<f64>) -> Series {
        Series {
            name: name.to_string(),
            values,
            kind: SeriesKind::Data,
            color: "rgba(0, 0, 0, 1)".to_string(),
        }
    }

    #[test]
    fn test_band_classify() {
        assert_eq!(Band::classify(0.0), Band::Below);
        assert_eq!(Band::classify(0.99), Band::Below);
        assert_eq!(Band::classify(1.0), Band::FactualError);
        assert_eq!(Band::classify(2.9), Band::FactualError);
        assert_eq!(Band::classify(3.0), Band::Lie);
        assert_eq!(Band::classify(4.0), Band::Propaganda);
        assert_eq!(Band::classify(12.0), Band::Propaganda);
        assert_eq!(Band::Lie.label(), "Lie");
    }

    #[test]
    fn test_series_stats() {
        let stats = series_stats(&data_series("crime", vec![0.5, 4.5, 2.0, 3.0]));

        assert_eq!(stats.name, "crime");
        assert_eq!(stats.min, 0.5);
        assert_eq!(stats.max, 4.5);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.peak_agent, 2);
        assert_eq!(
            stats.band_counts,
            BandCounts {
                below: 1,
                factual_error: 1,
                lie: 1,
                propaganda: 1
            }
        );
    }

    #[test]
    fn test_series_stats_empty_and_flat() {
        let empty = series_stats(&data_series("none", Vec::new()));
        assert_eq!(empty.peak_agent, 0);
        assert_eq!(empty.mean, 0.0);

        // ties keep the first position
        let flat = series_stats(&data_series("flat", vec![0.0, 0.0, 0.0]));
        assert_eq!(flat.peak_agent, 1);
        assert_eq!(flat.band_counts.below, 3);
    }

    #[test]
    fn test_collect_statistics_skips_thresholds() {
        let mut threshold = data_series("Lie", vec![3.0, 3.0]);
        threshold.kind = SeriesKind::Threshold;

        let projections = vec![Projection {
            title: "Group 1".to_string(),
            dataset: "file1Data".to_string(),
            metric: None,
            shape: Shape::LabeledSeries(LabeledSeries {
                labels: vec!["Agent 1".to_string(), "Agent 2".to_string()],
                series: vec![data_series("crime", vec![1.0, 2.0]), threshold],
            }),
        }];

        let stats = collect_statistics(&projections);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "crime");
    }

    #[test]
    fn test_most_propagating() {
        let stats: Vec<SeriesStats> = vec![
            series_stats(&data_series("low", vec![0.5])),
            series_stats(&data_series("high", vec![4.5])),
            series_stats(&data_series("mid", vec![2.0])),
        ];

        let top = most_propagating(&stats, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "high");
        assert_eq!(top[1].name, "mid");
    }

    #[test]
    fn test_matrix_column_means() {
        let matrix = MatrixShape {
            row_labels: vec!["1".to_string(), "2".to_string()],
            col_labels: vec!["1-30 crime".to_string(), "1-30 health".to_string()],
            cells: vec![vec![1.0, 0.0], vec![3.0, 0.5]],
        };

        let means = matrix_column_means(&matrix);
        assert_eq!(means[0], ("1-30 crime".to_string(), 2.0));
        assert_eq!(means[1], ("1-30 health".to_string(), 0.25));
    }
}
