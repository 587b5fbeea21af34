//! Word-stream plumbing shared by the bitset engine, the operation planner and
//! the bitset list: a unified word iterator over owned or byte-backed streams,
//! the total read-only queries, a logical-block cursor and a canonicalizing
//! stream writer.

use fill_word::{
	BLOCK_BITS, BlockBit, MAX_FILL_LENGTH, fill_length, fill_position, is_fill, literal_for_bit,
	literal_has_bit, literal_max_bit, literal_min_bit, literal_popcount, make_fill
};

use crate::Offset;

/// Maps an offset to the index of the 31-bit block containing it.
pub(crate) fn block_of(offset: Offset) -> u64 {
	offset as u64 / BLOCK_BITS as u64
}

/// Maps an offset to its bit index within its block.
pub(crate) fn bit_in_block(offset: Offset) -> BlockBit {
	// Unwrap is safe: the modulo keeps the index below the block width
	BlockBit::new((offset as u64 % BLOCK_BITS as u64) as u8).unwrap()
}

/// Iterator over the encoded words of a bitset, regardless of whether they are
/// stored as native words or borrowed as little-endian bytes from a list buffer.
pub(crate) enum WordIter<'stream> {
	Words(std::slice::Iter<'stream, u32>),
	LeBytes(std::slice::ChunksExact<'stream, u8>)
}

impl<'stream> WordIter<'stream> {
	pub(crate) fn from_words(words: &'stream [u32]) -> Self {
		Self::Words(words.iter())
	}

	pub(crate) fn from_le_bytes(bytes: &'stream [u8]) -> Self {
		debug_assert_eq!(bytes.len() % 4, 0);
		Self::LeBytes(bytes.chunks_exact(4))
	}
}

impl Iterator for WordIter<'_> {
	type Item = u32;

	fn next(&mut self) -> Option<u32> {
		match self {
			Self::Words(words) => words.next().copied(),
			Self::LeBytes(chunks) => chunks
				.next()
				.map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
		}
	}
}

/// Returns whether the bit at `offset` is set in the specified word stream.
pub(crate) fn stream_get(words: WordIter<'_>, offset: Offset) -> bool {
	let target = block_of(offset);
	let bit = bit_in_block(offset);
	let mut block = 0u64;

	for word in words {
		if is_fill(word) {
			let length = fill_length(word) as u64;
			if target < block + length {
				return false;
			}
			if let Some(absorbed) = fill_position(word) {
				if target == block + length {
					return absorbed == bit;
				}
				block += length + 1;
			} else {
				block += length;
			}
		} else {
			if target == block {
				return literal_has_bit(word, bit);
			}
			block += 1;
		}
	}

	false
}

/// Counts the set bits of the specified word stream: the payload popcount of
/// every literal, plus one per fill with an absorbed bit.
pub(crate) fn stream_count(words: WordIter<'_>) -> u64 {
	let mut total = 0u64;

	for word in words {
		if is_fill(word) {
			total += u64::from(fill_position(word).is_some());
		} else {
			total += literal_popcount(word) as u64;
		}
	}

	total
}

/// Returns the lowest set offset of the specified word stream, or `None` if no
/// bit is set.
pub(crate) fn stream_min(words: WordIter<'_>) -> Option<u64> {
	let mut block = 0u64;

	for word in words {
		if is_fill(word) {
			let length = fill_length(word) as u64;
			if let Some(absorbed) = fill_position(word) {
				return Some((block + length) * BLOCK_BITS as u64 + absorbed.get() as u64);
			}
			block += length;
		} else {
			if let Some(bit) = literal_min_bit(word) {
				return Some(block * BLOCK_BITS as u64 + bit.get() as u64);
			}
			block += 1;
		}
	}

	None
}

/// Returns the highest set offset of the specified word stream, or `None` if no
/// bit is set.
pub(crate) fn stream_max(words: WordIter<'_>) -> Option<u64> {
	let mut block = 0u64;
	let mut best = None;

	for word in words {
		if is_fill(word) {
			let length = fill_length(word) as u64;
			if let Some(absorbed) = fill_position(word) {
				best = Some((block + length) * BLOCK_BITS as u64 + absorbed.get() as u64);
				block += length + 1;
			} else {
				block += length;
			}
		} else {
			if let Some(bit) = literal_max_bit(word) {
				best = Some(block * BLOCK_BITS as u64 + bit.get() as u64);
			}
			block += 1;
		}
	}

	best
}

/// Decomposes one word stream into runs of logical blocks that share a single
/// 31-bit payload, so that several streams can be walked in lockstep without
/// aligning their word boundaries.
pub(crate) struct BlockCursor<'stream> {
	words: WordIter<'stream>,
	state: CursorState
}

#[derive(Clone, Copy)]
enum CursorState {
	/// Inside a fill's clean span, with the fill's absorbed bit, if any, still
	/// to be yielded after the span.
	Zeros { remaining: u64, after: Option<BlockBit> },
	/// At a single block carrying the specified payload bits.
	Block { payload: u32 },
	/// Past the last word. Every further block reads as clean zero.
	Drained
}

impl<'stream> BlockCursor<'stream> {
	pub(crate) fn new(words: WordIter<'stream>) -> Self {
		let mut cursor = Self {
			words,
			state: CursorState::Drained
		};
		cursor.load_next();
		cursor
	}

	/// Returns how many upcoming logical blocks share one payload, and that
	/// payload. A drained cursor reports an unbounded run of zeros.
	pub(crate) fn run(&self) -> (u64, u32) {
		match self.state {
			CursorState::Zeros { remaining, .. } => (remaining, 0),
			CursorState::Block { payload } => (1, payload),
			CursorState::Drained => (u64::MAX, 0)
		}
	}

	pub(crate) fn is_drained(&self) -> bool {
		matches!(self.state, CursorState::Drained)
	}

	/// Advances the cursor past `blocks` logical blocks. `blocks` must not
	/// exceed the current run length.
	pub(crate) fn advance(&mut self, blocks: u64) {
		match self.state {
			CursorState::Zeros { remaining, after } => {
				debug_assert!(blocks <= remaining);
				let remaining = remaining - blocks;
				if remaining > 0 {
					self.state = CursorState::Zeros { remaining, after };
				} else if let Some(bit) = after {
					self.state = CursorState::Block {
						payload: literal_for_bit(bit)
					};
				} else {
					self.load_next();
				}
			}
			CursorState::Block { .. } => {
				debug_assert_eq!(blocks, 1);
				self.load_next();
			}
			CursorState::Drained => {}
		}
	}

	fn load_next(&mut self) {
		self.state = loop {
			let Some(word) = self.words.next() else {
				break CursorState::Drained;
			};

			if is_fill(word) {
				let length = fill_length(word) as u64;
				let after = fill_position(word);
				if length > 0 {
					break CursorState::Zeros {
						remaining: length,
						after
					};
				}
				if let Some(bit) = after {
					break CursorState::Block {
						payload: literal_for_bit(bit)
					};
				}
				// A degenerate zero-length fill with no absorbed bit encodes
				// nothing at all; skip it
			} else {
				break CursorState::Block { payload: word };
			}
		};
	}
}

/// Assembles a canonical word stream left to right: zero blocks are buffered
/// and lazily flushed as chained fills, lone bits after a gap are absorbed into
/// the gap fill's position field, and trailing zeros are never emitted.
pub(crate) struct StreamWriter {
	words: Vec<u32>,
	pending_zero_blocks: u64
}

impl StreamWriter {
	pub(crate) fn new() -> Self {
		Self {
			words: Vec::new(),
			pending_zero_blocks: 0
		}
	}

	/// Appends `blocks` clean zero blocks.
	pub(crate) fn zeros(&mut self, blocks: u64) {
		self.pending_zero_blocks += blocks;
	}

	/// Appends one block with the specified payload bits.
	pub(crate) fn literal(&mut self, payload: u32) {
		if payload == 0 {
			self.pending_zero_blocks += 1;
			return;
		}

		if literal_popcount(payload) == 1 && self.pending_zero_blocks > 0 {
			// Unwrap is safe: the payload is non-zero
			let bit = literal_min_bit(payload).unwrap();
			self.flush_zeros_absorbing(bit);
			return;
		}

		self.flush_zeros();
		self.words.push(payload);
	}

	/// Consumes the writer, discarding any zero blocks still pending so the
	/// stream never ends in empty words.
	pub(crate) fn finish(self) -> Vec<u32> {
		self.words
	}

	fn flush_zeros(&mut self) {
		while self.pending_zero_blocks > MAX_FILL_LENGTH as u64 {
			self.push_fill(MAX_FILL_LENGTH, None);
			self.pending_zero_blocks -= MAX_FILL_LENGTH as u64;
		}
		if self.pending_zero_blocks > 0 {
			let length = self.pending_zero_blocks as u32;
			self.push_fill(length, None);
			self.pending_zero_blocks = 0;
		}
	}

	fn flush_zeros_absorbing(&mut self, bit: BlockBit) {
		while self.pending_zero_blocks > MAX_FILL_LENGTH as u64 {
			self.push_fill(MAX_FILL_LENGTH, None);
			self.pending_zero_blocks -= MAX_FILL_LENGTH as u64;
		}
		// The chaining loop always leaves a non-empty remainder
		let length = self.pending_zero_blocks as u32;
		self.push_fill(length, Some(bit));
		self.pending_zero_blocks = 0;
	}

	fn push_fill(&mut self, length: u32, position: Option<BlockBit>) {
		// Unwrap is safe: callers clamp the length to the codec maximum
		self.words.push(make_fill(length, position).unwrap());
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn fill(length: u32, position: Option<u8>) -> u32 {
		make_fill(length, position.map(|bit| BlockBit::new(bit).unwrap())).unwrap()
	}

	#[test]
	fn cursor_decomposes_a_mixed_stream_into_runs() {
		let words = [fill(3, Some(4)), 0x0000_0007, fill(1, None)];
		let mut cursor = BlockCursor::new(WordIter::from_words(&words));

		assert_eq!(cursor.run(), (3, 0));
		cursor.advance(2);
		assert_eq!(cursor.run(), (1, 0));
		cursor.advance(1);

		// The absorbed block follows the clean span as a one-block run
		assert_eq!(cursor.run(), (1, literal_for_bit(BlockBit::new(4).unwrap())));
		cursor.advance(1);

		assert_eq!(cursor.run(), (1, 0x0000_0007));
		cursor.advance(1);
		assert_eq!(cursor.run(), (1, 0));
		assert!(!cursor.is_drained());
		cursor.advance(1);

		assert!(cursor.is_drained());
		assert_eq!(cursor.run(), (u64::MAX, 0));
	}

	#[test]
	fn drained_cursor_ignores_advances() {
		let mut cursor = BlockCursor::new(WordIter::from_words(&[]));

		assert!(cursor.is_drained());
		cursor.advance(123);
		assert!(cursor.is_drained());
	}

	#[test]
	fn byte_backed_streams_decode_little_endian_words() {
		let words = [fill(7, Some(0)), 0x1234_5678];
		let mut bytes = Vec::new();
		for word in words {
			bytes.extend_from_slice(&word.to_le_bytes());
		}

		assert!(WordIter::from_le_bytes(&bytes).eq(words.into_iter()));
	}

	#[test]
	fn writer_absorbs_a_lone_bit_into_the_gap_fill() {
		let mut writer = StreamWriter::new();
		writer.zeros(5);
		writer.literal(literal_for_bit(BlockBit::new(9).unwrap()));

		assert_eq!(writer.finish(), [fill(5, Some(9))]);
	}

	#[test]
	fn writer_chains_overlong_zero_runs() {
		let mut writer = StreamWriter::new();
		writer.zeros(MAX_FILL_LENGTH as u64 * 2 + 11);
		writer.literal(0x0600_0000);

		assert_eq!(
			writer.finish(),
			[
				fill(MAX_FILL_LENGTH, None),
				fill(MAX_FILL_LENGTH, None),
				fill(11, None),
				0x0600_0000
			]
		);
	}

	#[test]
	fn writer_drops_trailing_zeros() {
		let mut writer = StreamWriter::new();
		writer.literal(0x0000_0001);
		writer.zeros(42);
		writer.literal(0);

		assert_eq!(writer.finish(), [0x0000_0001]);
	}

	#[test]
	fn writer_emits_a_leading_lone_bit_as_a_literal() {
		let mut writer = StreamWriter::new();
		writer.literal(literal_for_bit(BlockBit::new(0).unwrap()));

		assert_eq!(writer.finish(), [0x4000_0000]);
	}
}
