//! Contains the [`Bitset`] compressed bitset and its mutation engine.

use std::fmt::{Debug, Formatter};

use fill_word::{
	BLOCK_BITS, BlockBit, MAX_FILL_LENGTH, clear_fill_position, fill_length, fill_position,
	is_colored_fill, is_fill, literal_for_bit, literal_min_bit, literal_popcount, make_fill,
	set_fill_position
};
use log::{debug, trace};
use slice_group_by::GroupBy;
use thiserror::Error;
use tinyvec::ArrayVec;

use crate::{
	Offset, buffer,
	stream::{
		StreamWriter, WordIter, bit_in_block, block_of, stream_count, stream_get, stream_max,
		stream_min
	}
};


/// An error that may happen when deserializing a bitset from a byte buffer.
#[derive(Debug, Error)]
pub enum BitsetBufferError {
	/// The buffer cannot be an array of 4-byte encoded words.
	#[error("Bitset buffer length {length} is not a multiple of the 4-byte word size")]
	UnalignedLength {
		/// The offending buffer length, in bytes.
		length: usize
	},
	/// The buffer contains a fill word with the reserved color bit set.
	#[error("Encoded word {index} is a colored fill ({word:#010X}); only clean-zero fills are supported")]
	ColoredFill {
		/// The index of the offending word within the buffer.
		index: usize,
		/// The offending word.
		word: u32
	}
}

/// A compressed bitset: a set of non-negative bit offsets stored as a stream of
/// word-aligned hybrid fill and literal words.
///
/// All operations work directly on the compressed stream. Mutations keep the
/// stream in canonical form around the edited words, so that two bitsets holding
/// the same offsets through the same construction path compare equal word by
/// word.
///
/// The in-memory interchange representation is a packed array of little-endian
/// 32-bit words with no framing, produced by [`to_bytes`](Self::to_bytes) and
/// accepted by [`from_buffer`](Self::from_buffer).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bitset {
	words: Vec<u32>
}

impl Bitset {
	/// Creates an empty bitset. Does not allocate.
	pub fn new() -> Self {
		Self { words: Vec::new() }
	}

	pub(crate) fn from_words(words: Vec<u32>) -> Self {
		Self { words }
	}

	/// Deserializes a bitset from a packed array of little-endian 32-bit encoded
	/// words.
	///
	/// The buffer length must be a multiple of 4, and fills with the reserved
	/// color bit set are rejected.
	pub fn from_buffer(bytes: &[u8]) -> Result<Self, BitsetBufferError> {
		if bytes.len() % 4 != 0 {
			return Err(BitsetBufferError::UnalignedLength {
				length: bytes.len()
			});
		}

		let mut words = Vec::with_capacity(bytes.len() / 4);
		for (index, chunk) in bytes.chunks_exact(4).enumerate() {
			let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
			if is_colored_fill(word) {
				return Err(BitsetBufferError::ColoredFill { index, word });
			}
			words.push(word);
		}

		debug!("Deserialized bitset with {} encoded words", words.len());

		Ok(Self { words })
	}

	/// Creates a bitset holding the specified offsets. Duplicates are allowed.
	///
	/// Sorted inputs are encoded in a single left-to-right pass; unsorted inputs
	/// fall back to setting each offset in order.
	pub fn from_offsets(offsets: &[Offset]) -> Self {
		if offsets.windows(2).all(|pair| pair[0] <= pair[1]) {
			let mut writer = StreamWriter::new();
			let mut next_block = 0u64;

			for group in offsets.linear_group_by_key(|offset| block_of(*offset)) {
				let block = block_of(group[0]);
				writer.zeros(block - next_block);

				let mut payload = 0u32;
				for offset in group {
					payload |= literal_for_bit(bit_in_block(*offset));
				}
				writer.literal(payload);

				next_block = block + 1;
			}

			Self::from_words(writer.finish())
		} else {
			let mut bitset = Self::new();
			for offset in offsets {
				bitset.set(*offset);
			}
			bitset
		}
	}

	/// Returns whether the bit at `offset` is set.
	pub fn get(&self, offset: Offset) -> bool {
		stream_get(self.word_iter(), offset)
	}

	/// Sets the bit at `offset`, returning its previous value.
	pub fn set(&mut self, offset: Offset) -> bool {
		self.set_to(offset, true)
	}

	/// Clears the bit at `offset`, returning its previous value.
	pub fn unset(&mut self, offset: Offset) -> bool {
		self.set_to(offset, false)
	}

	/// Sets the bit at `offset` to `value`, returning its previous value.
	///
	/// Clearing a bit that lies past the encoded stream does not allocate.
	pub fn set_to(&mut self, offset: Offset, value: bool) -> bool {
		let target = block_of(offset);
		let bit = bit_in_block(offset);
		let mut block = 0u64;
		let mut index = 0;

		while index < self.words.len() {
			let word = self.words[index];
			if is_fill(word) {
				let length = fill_length(word) as u64;
				let position = fill_position(word);
				if target < block + length {
					// The bit lands inside the clean span
					if !value {
						return false;
					}
					self.split_fill(index, (target - block) as u32, bit);
					return false;
				}
				if let Some(absorbed) = position {
					if target == block + length {
						return self.set_in_absorbed_block(index, absorbed, bit, value);
					}
					block += length + 1;
				} else {
					block += length;
				}
			} else {
				if target == block {
					return self.set_in_literal(index, bit, value);
				}
				block += 1;
			}
			index += 1;
		}

		// The bit lies past the encoded stream
		if !value {
			return false;
		}
		self.append_bit(target - block, bit);
		false
	}

	/// Counts the set bits.
	pub fn count(&self) -> Offset {
		stream_count(self.word_iter()) as Offset
	}

	/// Returns the lowest set offset, or 0 if the bitset is empty.
	pub fn min(&self) -> Offset {
		stream_min(self.word_iter()).unwrap_or(0) as Offset
	}

	/// Returns the highest set offset, or 0 if the bitset is empty.
	pub fn max(&self) -> Offset {
		stream_max(self.word_iter()).unwrap_or(0) as Offset
	}

	/// Removes every bit, preserving the allocated capacity.
	pub fn clear(&mut self) {
		self.words.clear();
	}

	/// Returns the length of the serialized form, in bytes.
	pub fn byte_length(&self) -> usize {
		self.words.len() * 4
	}

	/// Serializes the bitset to a packed array of little-endian 32-bit encoded
	/// words, the exact form [`from_buffer`](Self::from_buffer) accepts.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut bytes = Vec::with_capacity(self.byte_length());
		for word in &self.words {
			bytes.extend_from_slice(&word.to_le_bytes());
		}
		bytes
	}

	/// Returns the encoded word stream.
	pub fn as_words(&self) -> &[u32] {
		&self.words
	}

	/// Returns an iterator over the set offsets, in ascending order.
	pub fn ones(&self) -> Ones<'_> {
		Ones {
			words: self.words.iter(),
			block: 0,
			pending: 0,
			pending_block: 0
		}
	}

	pub(crate) fn word_iter(&self) -> WordIter<'_> {
		WordIter::from_words(&self.words)
	}

	/// Rewrites the fill at `index` so that block `lead` of its clean span
	/// carries `bit`: a shortened clean head, a literal with the bit, and
	/// whatever remains of the original span behind it.
	fn split_fill(&mut self, index: usize, lead: u32, bit: BlockBit) {
		let word = self.words[index];
		let length = fill_length(word);
		let position = fill_position(word);
		let tail = length - lead - 1;

		trace!("Splitting fill of length {length} at span block {lead}");

		let mut replacement: ArrayVec<[u32; 3]> = ArrayVec::new();
		if lead > 0 {
			// Unwrap is safe: lead is less than the original valid length
			replacement.push(make_fill(lead, None).unwrap());
		}
		replacement.push(literal_for_bit(bit));
		if tail > 0 {
			// The shortened span keeps the original absorbed bit behind it
			replacement.push(make_fill(tail, position).unwrap());
		} else if let Some(absorbed) = position {
			// Nothing remains of the span, so the absorbed block directly
			// follows the new literal
			replacement.push(literal_for_bit(absorbed));
		}

		buffer::reserve_pow2(&mut self.words, replacement.len() - 1);
		self.words.splice(index..=index, replacement);
	}

	/// Mutates the bit carried by the position field of the fill at `index`.
	fn set_in_absorbed_block(
		&mut self,
		index: usize,
		absorbed: BlockBit,
		bit: BlockBit,
		value: bool
	) -> bool {
		let previous = absorbed == bit;
		if previous == value {
			return previous;
		}

		let word = self.words[index];
		let length = fill_length(word);

		if value {
			// A second bit in the absorbed block forces it out into a literal
			trace!("Materializing the absorbed block of fill {index} as a literal");
			let literal = literal_for_bit(absorbed) | literal_for_bit(bit);
			if length == 0 {
				self.words[index] = literal;
			} else {
				self.words[index] = clear_fill_position(word);
				buffer::reserve_pow2(&mut self.words, 1);
				self.words.insert(index + 1, literal);
			}
			return false;
		}

		// Clearing the absorbed bit leaves one more clean block in the run
		trace!("Clearing the absorbed bit of fill {index}");
		let mut tail_index = index;
		if length < MAX_FILL_LENGTH {
			// Unwrap is safe: the length stays within the codec maximum
			self.words[index] = make_fill(length + 1, None).unwrap();
		} else {
			self.words[index] = clear_fill_position(word);
			buffer::reserve_pow2(&mut self.words, 1);
			self.words.insert(index + 1, make_fill(1, None).unwrap());
			tail_index = index + 1;
		}

		self.merge_fill_pair(tail_index);
		if index > 0 {
			self.merge_fill_pair(index - 1);
		}
		self.trim_trailing_zeros();

		true
	}

	/// Mutates one bit of the literal at `index`.
	fn set_in_literal(&mut self, index: usize, bit: BlockBit, value: bool) -> bool {
		let mask = literal_for_bit(bit);
		let word = self.words[index];
		let previous = word & mask != 0;
		if previous == value {
			return previous;
		}

		let updated = word ^ mask;
		self.words[index] = updated;

		if updated == 0 {
			self.fold_cleared_literal(index);
		} else if literal_popcount(updated) == 1 {
			self.fold_single_bit_literal(index);
		}

		previous
	}

	/// Re-canonicalizes around a literal that just became all-zero: trailing
	/// empty words are trimmed, and a preceding clean fill grows over the empty
	/// block. A mid-stream all-zero literal with no such neighbor is a valid
	/// encoding and stays.
	fn fold_cleared_literal(&mut self, index: usize) {
		if index + 1 == self.words.len() {
			self.words.pop();
			self.trim_trailing_zeros();
			return;
		}

		if index > 0 {
			let previous = self.words[index - 1];
			if is_fill(previous)
				&& fill_position(previous).is_none()
				&& fill_length(previous) < MAX_FILL_LENGTH
			{
				// Unwrap is safe: the length stays within the codec maximum
				self.words[index - 1] = make_fill(fill_length(previous) + 1, None).unwrap();
				self.words.remove(index);
				self.merge_fill_pair(index - 1);
			}
		}
	}

	/// Folds a literal that just dropped to a single set bit into the position
	/// field of a preceding clean fill, if there is one.
	fn fold_single_bit_literal(&mut self, index: usize) {
		if index == 0 {
			return;
		}

		let previous = self.words[index - 1];
		if is_fill(previous) && fill_position(previous).is_none() {
			// Unwrap is safe: a single-bit literal always names a block bit
			let bit = literal_min_bit(self.words[index]).unwrap();
			self.words[index - 1] = set_fill_position(previous, bit);
			self.words.remove(index);
		}
	}

	/// Appends `bit` in the block that lies `gap` clean blocks past the current
	/// end of the stream, chaining gap fills as needed and absorbing the new
	/// bit into the last of them.
	fn append_bit(&mut self, mut gap: u64, bit: BlockBit) {
		trace!("Appending block bit {} after a gap of {gap} clean blocks", bit.get());

		buffer::reserve_pow2(&mut self.words, (gap / MAX_FILL_LENGTH as u64) as usize + 1);

		while gap > MAX_FILL_LENGTH as u64 {
			// Unwraps below are safe: every length is at most the codec maximum
			self.words.push(make_fill(MAX_FILL_LENGTH, None).unwrap());
			gap -= MAX_FILL_LENGTH as u64;
		}

		if gap > 0 {
			self.words.push(make_fill(gap as u32, Some(bit)).unwrap());
			return;
		}

		match self.words.last().copied() {
			Some(word) if is_fill(word) && fill_position(word).is_none() => {
				// The bit's block directly follows a trailing clean fill, which
				// can absorb it
				let last = self.words.len() - 1;
				self.words[last] = set_fill_position(word, bit);
			}
			_ => self.words.push(literal_for_bit(bit))
		}
	}

	/// Merges the fills at `index` and `index + 1` into one word when the first
	/// has no absorbed bit and the combined span fits the codec maximum.
	fn merge_fill_pair(&mut self, index: usize) {
		if index + 1 >= self.words.len() {
			return;
		}

		let first = self.words[index];
		let second = self.words[index + 1];
		if !is_fill(first) || !is_fill(second) || fill_position(first).is_some() {
			return;
		}

		let combined = fill_length(first) as u64 + fill_length(second) as u64;
		if combined > MAX_FILL_LENGTH as u64 {
			return;
		}

		// The merged word keeps the second fill's absorbed bit
		self.words[index] = make_fill(combined as u32, fill_position(second)).unwrap();
		self.words.remove(index + 1);
	}

	/// Pops words from the end of the stream while they encode nothing but
	/// zeros.
	fn trim_trailing_zeros(&mut self) {
		while let Some(&word) = self.words.last() {
			let empty = if is_fill(word) {
				fill_position(word).is_none()
			} else {
				word == 0
			};
			if !empty {
				break;
			}
			self.words.pop();
		}
	}
}

impl Debug for Bitset {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		struct HexWord(u32);
		impl Debug for HexWord {
			fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
				write!(f, "{:#010X}", self.0)
			}
		}

		f.write_str("Bitset")?;
		f.debug_list()
			.entries(self.words.iter().map(|word| HexWord(*word)))
			.finish()
	}
}

/// Iterator over the set offsets of a [`Bitset`], in ascending order. Created by
/// [`Bitset::ones`].
pub struct Ones<'bitset> {
	words: std::slice::Iter<'bitset, u32>,
	/// Logical block index of the next word to decode.
	block: u64,
	/// Payload bits of the literal being drained, most significant first.
	pending: u32,
	pending_block: u64
}

impl Iterator for Ones<'_> {
	type Item = Offset;

	fn next(&mut self) -> Option<Offset> {
		loop {
			if self.pending != 0 {
				// Unwrap is safe: the pending payload is non-zero
				let bit = literal_min_bit(self.pending).unwrap();
				self.pending &= !literal_for_bit(bit);
				return Some(
					(self.pending_block * BLOCK_BITS as u64 + bit.get() as u64) as Offset
				);
			}

			let word = *self.words.next()?;
			if is_fill(word) {
				let length = fill_length(word) as u64;
				if let Some(absorbed) = fill_position(word) {
					let offset = (self.block + length) * BLOCK_BITS as u64 + absorbed.get() as u64;
					self.block += length + 1;
					return Some(offset as Offset);
				}
				self.block += length;
			} else {
				self.pending = word;
				self.pending_block = self.block;
				self.block += 1;
			}
		}
	}
}
