//! Instrumented in-place sorts.
//!
//! Every algorithm reports an `iterations` counter whose unit depends on the
//! algorithm (see [`SortAlgorithm`]). The counters are kept comparable with
//! earlier releases, so they are not a uniform comparison count.

use crate::timing::{duration_ms, Stopwatch};
use crate::traits::Scalar;
use fastrand::Rng;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BogoSettings {
    /// Maximum number of shuffles. `None` keeps shuffling until sorted.
    pub max_attempts: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortReport {
    #[serde(with = "duration_ms", rename = "elapsed_ms")]
    pub elapsed: Duration,
    pub iterations: u64,
    /// False only when bogosort hit its attempt cap.
    pub is_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum SortAlgorithm {
    /// One iteration per outer pass.
    Bubble,
    /// One iteration per inserted element.
    Insertion,
    /// One iteration per left-to-right plus right-to-left round.
    Shaker,
    /// Lomuto partition around the last element; one iteration per partition.
    Quick,
    /// One iteration per shuffle.
    Bogo(BogoSettings),
}

impl SortAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            SortAlgorithm::Bubble => "bubble sort",
            SortAlgorithm::Insertion => "insertion sort",
            SortAlgorithm::Shaker => "shaker sort",
            SortAlgorithm::Quick => "quicksort",
            SortAlgorithm::Bogo(_) => "bogosort",
        }
    }

    pub fn all(bogo: BogoSettings) -> [SortAlgorithm; 5] {
        [
            SortAlgorithm::Bubble,
            SortAlgorithm::Insertion,
            SortAlgorithm::Shaker,
            SortAlgorithm::Quick,
            SortAlgorithm::Bogo(bogo),
        ]
    }
}

/// `left` must come after `right` in the requested order.
#[inline]
fn out_of_order<T: Scalar>(left: T, right: T, ascending: bool) -> bool {
    if ascending {
        left > right
    } else {
        left < right
    }
}

/// Checks adjacent pairs only. NaN compares false both ways and so never
/// breaks the order; inputs containing NaN should be rejected upstream.
pub fn is_sorted<T: Scalar>(data: &[T], ascending: bool) -> bool {
    data.windows(2)
        .all(|pair| !out_of_order(pair[0], pair[1], ascending))
}

/// Sorts `data` in place with `algorithm`. `rng` is only drawn from by
/// bogosort.
pub fn sort<T: Scalar>(
    algorithm: SortAlgorithm,
    data: &mut [T],
    ascending: bool,
    rng: &mut Rng,
) -> SortReport {
    let report = match algorithm {
        SortAlgorithm::Bubble => bubble_sort(data, ascending),
        SortAlgorithm::Insertion => insertion_sort(data, ascending),
        SortAlgorithm::Shaker => shaker_sort(data, ascending),
        SortAlgorithm::Quick => quick_sort(data, ascending),
        SortAlgorithm::Bogo(settings) => bogo_sort(data, ascending, &settings, rng),
    };
    debug!(
        "{} on {} elements: {} iterations in {:?}",
        algorithm.name(),
        data.len(),
        report.iterations,
        report.elapsed
    );
    report
}

fn finished(watch: Stopwatch, iterations: u64) -> SortReport {
    SortReport {
        elapsed: watch.elapsed(),
        iterations,
        is_completed: true,
    }
}

/// Adjacent-swap passes. Always performs `n - 1` passes, so the counter is
/// `max(n, 1) - 1` regardless of the input order.
pub fn bubble_sort<T: Scalar>(data: &mut [T], ascending: bool) -> SortReport {
    let watch = Stopwatch::start();
    let n = data.len();
    let mut iterations = 0;

    for i in 0..n.saturating_sub(1) {
        for j in 0..n - i - 1 {
            if out_of_order(data[j], data[j + 1], ascending) {
                data.swap(j, j + 1);
            }
        }
        iterations += 1;
    }

    finished(watch, iterations)
}

pub fn insertion_sort<T: Scalar>(data: &mut [T], ascending: bool) -> SortReport {
    let watch = Stopwatch::start();
    let mut iterations = 0;

    for i in 1..data.len() {
        let key = data[i];
        let mut j = i;
        while j > 0 && out_of_order(data[j - 1], key, ascending) {
            data[j] = data[j - 1];
            j -= 1;
        }
        data[j] = key;
        iterations += 1;
    }

    finished(watch, iterations)
}

/// Cocktail sort: bubbles the extreme element right, then the opposite
/// extreme left, and narrows both ends.
pub fn shaker_sort<T: Scalar>(data: &mut [T], ascending: bool) -> SortReport {
    let watch = Stopwatch::start();
    let mut iterations = 0;
    if data.is_empty() {
        return finished(watch, iterations);
    }

    let mut left = 0usize;
    let mut right = data.len() - 1;
    loop {
        for i in left..right {
            if out_of_order(data[i], data[i + 1], ascending) {
                data.swap(i, i + 1);
            }
        }
        let exhausted = right == 0;
        right = right.saturating_sub(1);

        for i in (left + 1..=right).rev() {
            if out_of_order(data[i - 1], data[i], ascending) {
                data.swap(i - 1, i);
            }
        }
        left += 1;
        iterations += 1;

        if exhausted || left > right {
            break;
        }
    }

    finished(watch, iterations)
}

pub fn quick_sort<T: Scalar>(data: &mut [T], ascending: bool) -> SortReport {
    let watch = Stopwatch::start();
    let mut iterations = 0;
    quick_sort_range(data, ascending, &mut iterations);
    finished(watch, iterations)
}

/// Recurses into the shorter side and loops on the longer one, so the stack
/// depth stays logarithmic on already-sorted input.
fn quick_sort_range<T: Scalar>(mut data: &mut [T], ascending: bool, iterations: &mut u64) {
    while data.len() > 1 {
        let pivot = partition(data, ascending);
        *iterations += 1;

        let (low, rest) = std::mem::take(&mut data).split_at_mut(pivot);
        let high = &mut rest[1..];
        if low.len() < high.len() {
            quick_sort_range(low, ascending, iterations);
            data = high;
        } else {
            quick_sort_range(high, ascending, iterations);
            data = low;
        }
    }
}

/// Lomuto partition with the last element as pivot. Returns the pivot's
/// final index.
fn partition<T: Scalar>(data: &mut [T], ascending: bool) -> usize {
    let high = data.len() - 1;
    let pivot = data[high];
    let mut store = 0;

    for j in 0..high {
        if !out_of_order(data[j], pivot, ascending) {
            data.swap(store, j);
            store += 1;
        }
    }
    data.swap(store, high);
    store
}

/// Fisher-Yates shuffles until the slice is sorted or the attempt cap is
/// reached. `iterations` never exceeds `max_attempts`.
pub fn bogo_sort<T: Scalar>(
    data: &mut [T],
    ascending: bool,
    settings: &BogoSettings,
    rng: &mut Rng,
) -> SortReport {
    let watch = Stopwatch::start();
    let mut iterations = 0u64;

    while !is_sorted(data, ascending) {
        if settings.max_attempts.is_some_and(|max| iterations >= max) {
            warn!("bogosort gave up after {iterations} shuffles");
            return SortReport {
                elapsed: watch.elapsed(),
                iterations,
                is_completed: false,
            };
        }
        iterations += 1;
        shuffle(data, rng);
    }

    finished(watch, iterations)
}

fn shuffle<T>(data: &mut [T], rng: &mut Rng) {
    let n = data.len();
    for i in 0..n {
        let j = rng.usize(i..n);
        data.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> Vec<Vec<f64>> {
        vec![
            vec![],
            vec![42.0],
            vec![3.0, 1.0, 2.0, 3.0, 1.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![5.0, 4.0, 3.0, 2.0, 1.0],
            vec![-1.5, 7.25, 0.0, -3.0, 2.5, 7.25, 1e-3],
        ]
    }

    fn sorted_copy(data: &[f64], ascending: bool) -> Vec<f64> {
        let mut copy = data.to_vec();
        copy.sort_by(|a, b| a.partial_cmp(b).unwrap());
        if !ascending {
            copy.reverse();
        }
        copy
    }

    #[test]
    fn deterministic_sorts_order_every_input() {
        let mut rng = Rng::with_seed(7);
        for algorithm in [
            SortAlgorithm::Bubble,
            SortAlgorithm::Insertion,
            SortAlgorithm::Shaker,
            SortAlgorithm::Quick,
        ] {
            for ascending in [true, false] {
                for input in inputs() {
                    let mut data = input.clone();
                    let report = sort(algorithm, &mut data, ascending, &mut rng);
                    assert!(report.is_completed);
                    assert_eq!(
                        data,
                        sorted_copy(&input, ascending),
                        "{} ascending={ascending} on {input:?}",
                        algorithm.name()
                    );
                }
            }
        }
    }

    #[test]
    fn bubble_counts_passes() {
        let mut data = vec![4.0, 3.0, 2.0, 1.0];
        assert_eq!(bubble_sort(&mut data, true).iterations, 3);
        assert_eq!(bubble_sort(&mut Vec::<f64>::new(), true).iterations, 0);
    }

    #[test]
    fn insertion_counts_insertions() {
        let mut data = vec![2.0, 1.0, 3.0];
        assert_eq!(insertion_sort(&mut data, true).iterations, 2);
        assert_eq!(insertion_sort(&mut [1.0], true).iterations, 0);
    }

    #[test]
    fn shaker_counts_round_trips() {
        let mut single = [1.0];
        assert_eq!(shaker_sort(&mut single, true).iterations, 1);
        let mut empty: [f64; 0] = [];
        assert_eq!(shaker_sort(&mut empty, true).iterations, 0);
        let mut data = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        // Rounds narrow both ends until left passes right: ceil(5 / 2).
        assert_eq!(shaker_sort(&mut data, true).iterations, 3);
        assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn quick_sort_counts_partitions() {
        // Sorted input: every partition peels off only the pivot.
        let mut data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(quick_sort(&mut data, true).iterations, 3);
        let mut pair = vec![2.0, 1.0];
        assert_eq!(quick_sort(&mut pair, true).iterations, 1);
        assert_eq!(pair, vec![1.0, 2.0]);
    }

    #[test]
    fn quick_sort_handles_long_sorted_input() {
        let mut data: Vec<f64> = (0..5_000).map(f64::from).collect();
        let report = quick_sort(&mut data, false);
        assert!(is_sorted(&data, false));
        assert_eq!(report.iterations, 4_999);
    }

    #[test]
    fn bogo_sort_finishes_small_input() {
        let mut rng = Rng::with_seed(1);
        let mut data = vec![3.0, 1.0, 2.0];
        let report = bogo_sort(&mut data, true, &BogoSettings::default(), &mut rng);
        assert!(report.is_completed);
        assert!(report.iterations >= 1);
        assert_eq!(data, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn bogo_sort_respects_cap() {
        let mut rng = Rng::with_seed(99);
        let input: Vec<f64> = (0..12).rev().map(f64::from).collect();
        let mut data = input.clone();
        let settings = BogoSettings {
            max_attempts: Some(25),
        };
        let report = bogo_sort(&mut data, true, &settings, &mut rng);
        assert!(report.iterations <= 25);
        if !report.is_completed {
            assert_eq!(report.iterations, 25);
        }
        assert_eq!(sorted_copy(&data, true), sorted_copy(&input, true));
    }

    #[test]
    fn bogo_sort_on_sorted_input_does_nothing() {
        let mut rng = Rng::with_seed(3);
        let mut data = vec![1.0, 1.0, 2.0];
        let settings = BogoSettings {
            max_attempts: Some(0),
        };
        let report = bogo_sort(&mut data, true, &settings, &mut rng);
        assert!(report.is_completed);
        assert_eq!(report.iterations, 0);
    }

    #[test]
    fn sorts_f32_descending() {
        let mut rng = Rng::with_seed(0);
        let mut data = vec![0.5f32, -2.0, 9.0, 0.5];
        sort(SortAlgorithm::Insertion, &mut data, false, &mut rng);
        assert_eq!(data, vec![9.0f32, 0.5, 0.5, -2.0]);
    }

    #[test]
    fn is_sorted_respects_direction() {
        assert!(is_sorted::<f64>(&[], true));
        assert!(is_sorted(&[1.0, 1.0, 2.0], true));
        assert!(!is_sorted(&[1.0, 1.0, 2.0], false));
        assert!(is_sorted(&[2.0, 1.0, 1.0], false));
    }
}
