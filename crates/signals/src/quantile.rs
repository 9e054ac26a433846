//! Cross-sectional ranking and fixed-width percentile bucketing of predictions.

/// 1-based ordinal ranks in ascending order; ties keep first-seen order.
#[must_use]
pub fn ordinal_ranks(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // Stable sort keeps equal values in input order.
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0; values.len()];
    for (position, &idx) in order.iter().enumerate() {
        ranks[idx] = position + 1;
    }
    ranks
}

/// Percentile ranks `ordinal / count`, each in (0, 1].
#[must_use]
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let count = values.len() as f64;
    ordinal_ranks(values)
        .into_iter()
        .map(|rank| {
            #[allow(clippy::cast_precision_loss)]
            let rank = rank as f64;
            rank / count
        })
        .collect()
}

/// Cuts percentile ranks into `bins` fixed, right-inclusive intervals
/// `((k-1)/bins, k/bins]` and returns reversed labels: the top interval is 1,
/// the bottom interval is `bins`.
///
/// The edges do not depend on the ranks, so a thin cross-section leaves some
/// buckets empty. Ranks at or below zero land in the bottom interval and ranks
/// above one in the top interval.
#[must_use]
pub fn cut_labels(ranks: &[f64], bins: u32) -> Vec<u32> {
    if bins == 0 {
        return Vec::new();
    }
    let edges = bin_edges(bins);

    ranks
        .iter()
        .map(|&rank| {
            let bucket = edges
                .iter()
                .position(|&edge| rank <= edge)
                .unwrap_or(edges.len() - 1);
            #[allow(clippy::cast_possible_truncation)]
            let bucket = bucket as u32;
            bins - bucket
        })
        .collect()
}

/// Percentile rank and bucket label for each value of one cross-section.
#[must_use]
pub fn rank_and_bucket(values: &[f64], bins: u32) -> Vec<(f64, u32)> {
    let percentiles = percentile_ranks(values);
    let labels = cut_labels(&percentiles, bins);
    percentiles.into_iter().zip(labels).collect()
}

/// Upper edges `k / bins` for `k` in `1..=bins`.
fn bin_edges(bins: u32) -> Vec<f64> {
    (1..=bins)
        .map(|k| f64::from(k) / f64::from(bins))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_ranks_break_ties_by_position() {
        assert_eq!(ordinal_ranks(&[0.3, 0.1, 0.3, 0.2]), vec![3, 1, 4, 2]);
    }

    #[test]
    fn ordinal_ranks_are_a_permutation() {
        let values = [0.5, -1.0, 0.5, 2.0, 0.0, -1.0, 3.5, 0.5];
        let mut ranks = ordinal_ranks(&values);
        ranks.sort_unstable();
        assert_eq!(ranks, (1..=values.len()).collect::<Vec<_>>());
    }

    #[test]
    fn percentiles_end_at_one() {
        let pct = percentile_ranks(&[3.0, 1.0, 2.0, 4.0]);
        assert_eq!(pct, vec![0.75, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn ten_names_split_two_per_quintile_top_first() {
        let values: Vec<f64> = (0..10).map(f64::from).collect();
        let buckets = rank_and_bucket(&values, 5);
        let labels: Vec<u32> = buckets.iter().map(|(_, label)| *label).collect();
        assert_eq!(labels, vec![5, 5, 4, 4, 3, 3, 2, 2, 1, 1]);
    }

    #[test]
    fn single_name_lands_in_top_bucket() {
        let buckets = rank_and_bucket(&[0.42], 5);
        assert_eq!(buckets, vec![(1.0, 1)]);
    }

    fn labels(values: &[f64]) -> Vec<u32> {
        rank_and_bucket(values, 5)
            .into_iter()
            .map(|(_, label)| label)
            .collect()
    }

    #[test]
    fn thin_cross_sections_leave_buckets_empty() {
        // Percentiles 1.0 and 0.5.
        assert_eq!(labels(&[0.2, 0.1]), vec![1, 3]);
        // Percentiles 1.0, 0.667 and 0.333.
        assert_eq!(labels(&[0.3, 0.2, 0.1]), vec![1, 2, 4]);
    }

    #[test]
    fn edges_are_fixed_on_the_percentile_axis() {
        assert_eq!(cut_labels(&[0.2, 0.2000001, 0.6, 1.0], 5), vec![5, 4, 3, 1]);
        assert_eq!(cut_labels(&[-0.5, 1.5], 5), vec![5, 1]);
        assert!(cut_labels(&[0.5], 0).is_empty());
    }

    #[test]
    fn extremes_fall_in_outer_buckets() {
        let labels = cut_labels(&[0.0, 0.5, 1.0], 4);
        assert_eq!(labels, vec![4, 3, 1]);
    }
}
