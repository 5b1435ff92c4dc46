//! Longest non-decreasing subsequence
//!
//! Patience-sorting variant running in O(n log n). `tails[len]` holds the
//! index of the smallest value ending a subsequence of length `len`;
//! `predecessors[i]` links each element to the previous element of the best
//! subsequence ending at `i`.
//!
//! Comparisons are non-strict: equal values extend a subsequence, so
//! duplicates that are already in order may all stay in place.

/// Returns the first index in `[low, high)` whose key is greater than `value`,
/// or `high` if there is none.
///
/// `key` must be non-decreasing over the range.
pub fn upper_bound<K, F>(mut low: usize, mut high: usize, key: F, value: K) -> usize
where
	K: PartialOrd,
	F: Fn(usize) -> K,
{
	while low < high {
		let mid = low + ((high - low) >> 1);
		if key(mid) <= value {
			low = mid + 1;
		} else {
			high = mid;
		}
	}
	low
}

/// Indices of one longest non-decreasing subsequence of `keys`, ascending.
///
/// ```
/// use reinhardt_hydration::lis::longest_non_decreasing;
///
/// let indices = longest_non_decreasing(&[3, 1, 4, 1, 5, 9, 2, 6]);
/// assert_eq!(indices, vec![1, 3, 6, 7]);
/// ```
pub fn longest_non_decreasing<K>(keys: &[K]) -> Vec<usize>
where
	K: PartialOrd + Copy,
{
	if keys.is_empty() {
		return Vec::new();
	}

	let mut tails = vec![0usize; keys.len() + 1];
	let mut predecessors: Vec<Option<usize>> = vec![None; keys.len()];
	let mut longest = 0usize;

	for (i, &current) in keys.iter().enumerate() {
		// Fast path: current extends the longest run found so far.
		let seq_len = if longest > 0 && keys[tails[longest]] <= current {
			longest
		} else {
			upper_bound(1, longest, |len| keys[tails[len]], current) - 1
		};

		predecessors[i] = if seq_len == 0 {
			None
		} else {
			Some(tails[seq_len])
		};
		let new_len = seq_len + 1;
		tails[new_len] = i;
		longest = longest.max(new_len);
	}

	let mut indices = Vec::with_capacity(longest);
	let mut cursor = Some(tails[longest]);
	while let Some(i) = cursor {
		indices.push(i);
		cursor = predecessors[i];
	}
	indices.reverse();
	indices
}
