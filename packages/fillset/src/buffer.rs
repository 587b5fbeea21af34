//! Centralized amortized growth policy for the resizable buffers of this crate.

/// Grows the capacity of `vec` to the next power of two that fits `additional`
/// more elements, if it does not fit them already. Both the bitset word arrays
/// and the list byte buffers grow through this single helper, which keeps their
/// push costs amortized O(1).
pub(crate) fn reserve_pow2<T>(vec: &mut Vec<T>, additional: usize) {
	let needed = vec.len().saturating_add(additional);
	if needed <= vec.capacity() {
		return;
	}

	vec.reserve_exact(needed.next_power_of_two() - vec.len());
}
