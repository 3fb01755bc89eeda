use crate::features::Descriptor;

/// One query descriptor paired with one train descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: u32,
}

pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Brute-force k nearest neighbours by Hamming distance.
///
/// Returns one list per query descriptor, nearest first. Equal distances keep
/// train order. Lists are shorter than `k` when `train` is.
pub fn knn_match(query: &[Descriptor], train: &[Descriptor], k: usize) -> Vec<Vec<Match>> {
    query
        .iter()
        .enumerate()
        .map(|(query_idx, q)| {
            let mut neighbours: Vec<Match> = train
                .iter()
                .enumerate()
                .map(|(train_idx, t)| Match {
                    query_idx,
                    train_idx,
                    distance: hamming_distance(q, t),
                })
                .collect();
            neighbours.sort_by_key(|m| m.distance);
            neighbours.truncate(k);
            neighbours
        })
        .collect()
}

/// Whether the nearest neighbour is clearly better than the runner-up.
pub fn passes_ratio_test(neighbours: &[Match], ratio: f32) -> bool {
    match neighbours {
        [best, second, ..] => (best.distance as f32) < ratio * second.distance as f32,
        _ => false,
    }
}

/// Number of `query` descriptors whose two nearest `train` neighbours pass the ratio test.
pub fn count_good_matches(query: &[Descriptor], train: &[Descriptor], ratio: f32) -> usize {
    if query.is_empty() || train.len() < 2 {
        return 0;
    }
    knn_match(query, train, 2)
        .iter()
        .filter(|neighbours| passes_ratio_test(neighbours, ratio))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_bits(bits: u32) -> Descriptor {
        let mut d = [0u8; 32];
        for i in 0..bits as usize {
            d[i / 8] |= 1 << (i % 8);
        }
        d
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(&[0; 32], &[0; 32]), 0);
        assert_eq!(hamming_distance(&[0; 32], &[0xff; 32]), 256);
        assert_eq!(hamming_distance(&with_bits(3), &with_bits(10)), 7);
    }

    #[test]
    fn test_knn_sorted_and_truncated() {
        let train = [with_bits(40), with_bits(5), with_bits(20)];
        let result = knn_match(&[with_bits(0)], &train, 2);

        assert_eq!(result.len(), 1);
        let idx: Vec<usize> = result[0].iter().map(|m| m.train_idx).collect();
        assert_eq!(idx, vec![1, 2]);
        assert_eq!(result[0][0].distance, 5);
    }

    #[test]
    fn test_knn_ties_keep_train_order() {
        let train = [with_bits(4), with_bits(4), with_bits(4)];
        let result = knn_match(&[with_bits(0)], &train, 2);
        assert_eq!(result[0][0].train_idx, 0);
        assert_eq!(result[0][1].train_idx, 1);
    }

    #[test]
    fn test_ratio_test() {
        let query = [with_bits(0)];
        // 1 < 0.7 * 8
        assert_eq!(
            count_good_matches(&query, &[with_bits(1), with_bits(8)], 0.7),
            1
        );
        // 1 < 0.7 * 1 fails
        assert_eq!(
            count_good_matches(&query, &[with_bits(1), with_bits(1)], 0.7),
            0
        );
        // exact match against a distinct runner-up
        assert_eq!(
            count_good_matches(&query, &[with_bits(30), with_bits(0)], 0.7),
            1
        );
    }

    #[test]
    fn test_single_neighbour_contributes_nothing() {
        let query = [with_bits(0), with_bits(2)];
        assert_eq!(count_good_matches(&query, &[with_bits(0)], 0.7), 0);
        assert_eq!(count_good_matches(&query, &[], 0.7), 0);
        assert_eq!(count_good_matches(&[], &[with_bits(0), with_bits(9)], 0.7), 0);
    }
}
