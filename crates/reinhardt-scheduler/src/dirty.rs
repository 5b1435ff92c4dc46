//! Dirty masks
//!
//! A component's state is split into numbered slots. Each mark sets the bit
//! of the slot that changed; the component's `patch` then re-renders only
//! the output that depends on set bits.

/// Bitset of changed state slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyMask {
	words: Vec<u64>,
}

impl DirtyMask {
	const BITS: usize = u64::BITS as usize;

	/// Exclusive upper bound on slot numbers accepted by
	/// [`Scheduler::make_dirty`](crate::Scheduler::make_dirty).
	pub const MAX_SLOTS: usize = 1 << 16;

	/// An empty mask.
	pub fn new() -> Self {
		Self::default()
	}

	/// A mask with a single bit set.
	pub fn with_bit(bit: usize) -> Self {
		let mut mask = Self::new();
		mask.set(bit);
		mask
	}

	/// Sets the bit for `slot`.
	///
	/// The mask grows to hold `slot`, so callers keep slots below
	/// [`Self::MAX_SLOTS`].
	pub fn set(&mut self, slot: usize) {
		debug_assert!(slot < Self::MAX_SLOTS, "slot {slot} out of range");
		let word = slot / Self::BITS;
		if self.words.len() <= word {
			self.words.resize(word + 1, 0);
		}
		self.words[word] |= 1 << (slot % Self::BITS);
	}

	/// Whether the bit for `slot` is set.
	pub fn contains(&self, slot: usize) -> bool {
		self.words
			.get(slot / Self::BITS)
			.is_some_and(|word| word & (1 << (slot % Self::BITS)) != 0)
	}

	/// Whether any of `slots` is set.
	pub fn intersects(&self, slots: &[usize]) -> bool {
		slots.iter().any(|&slot| self.contains(slot))
	}

	/// Whether no bit is set.
	pub fn is_empty(&self) -> bool {
		self.words.iter().all(|&word| word == 0)
	}

	/// Set slots in ascending order.
	pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
		self.words.iter().enumerate().flat_map(|(i, &word)| {
			(0..Self::BITS)
				.filter(move |bit| word & (1 << bit) != 0)
				.map(move |bit| i * Self::BITS + bit)
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_empty_mask() {
		let mask = DirtyMask::new();
		assert!(mask.is_empty());
		assert!(!mask.contains(0));
		assert_eq!(mask.iter().count(), 0);
	}

	#[rstest]
	#[case(0)]
	#[case(31)]
	#[case(63)]
	#[case(64)]
	#[case(200)]
	fn test_set_and_contains(#[case] slot: usize) {
		let mask = DirtyMask::with_bit(slot);
		assert!(mask.contains(slot));
		assert!(!mask.contains(slot + 1));
		assert!(!mask.is_empty());
		assert_eq!(mask.iter().collect::<Vec<_>>(), vec![slot]);
	}

	#[rstest]
	fn test_highest_slot_fits() {
		let slot = DirtyMask::MAX_SLOTS - 1;
		let mask = DirtyMask::with_bit(slot);
		assert_eq!(mask.words.len(), DirtyMask::MAX_SLOTS / DirtyMask::BITS);
		assert_eq!(mask.iter().collect::<Vec<_>>(), vec![slot]);
	}

	#[rstest]
	fn test_iter_across_words() {
		let mut mask = DirtyMask::new();
		for slot in [70, 3, 64, 3] {
			mask.set(slot);
		}
		assert_eq!(mask.iter().collect::<Vec<_>>(), vec![3, 64, 70]);
		assert!(mask.intersects(&[1, 64]));
		assert!(!mask.intersects(&[1, 2]));
	}
}
