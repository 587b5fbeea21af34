//! Contains the [`BitsetList`] append-only packed container and its windowed,
//! zero-copy iterator.

use std::{
	fmt::{Debug, Formatter},
	ops::{Bound, RangeBounds}
};

use log::{debug, trace};
use thiserror::Error;

use crate::{
	Offset,
	bitset::Bitset,
	buffer,
	operation::{BooleanOp, fold_word_streams},
	stream::{WordIter, stream_count, stream_get, stream_max, stream_min}
};

mod varint;


/// An error that may happen when pushing to or deserializing a [`BitsetList`].
#[derive(Debug, Error)]
pub enum BitsetListError {
	/// An entry was pushed at an offset below the current list tail.
	#[error("Cannot push an entry at offset {offset} behind the list tail at offset {tail_offset}")]
	NonMonotonicPush {
		/// The offending entry offset.
		offset: Offset,
		/// The absolute offset of the current last entry.
		tail_offset: Offset
	},
	/// The distance to the previous entry does not fit the entry header.
	#[error("Entry offset delta {delta} does not fit the 30-bit varint domain")]
	OffsetDeltaOverflow {
		/// The offending offset delta.
		delta: u64
	},
	/// The entry's word count does not fit the entry header.
	#[error("Entry word count {word_count} does not fit the 30-bit varint domain")]
	WordCountOverflow {
		/// The offending word count.
		word_count: usize
	},
	/// An entry's absolute offset does not fit the configured offset width.
	#[error("Entry offset {offset} overflows the configured offset width")]
	OffsetOverflow {
		/// The entry's would-be absolute offset.
		offset: u64
	},
	/// A buffer being deserialized ends in the middle of an entry.
	#[error("Bitset list buffer is truncated within the entry starting at byte {position}")]
	TruncatedEntry {
		/// The byte position of the offending entry's header.
		position: usize
	}
}

/// An append-only container packing many bitsets, each tagged with an absolute
/// offset, into one contiguous byte buffer.
///
/// Entries are stored as `(delta offset, word count, words)` with the two
/// header integers in a length-prefixed varint encoding and the offset
/// delta-encoded against the previous entry, so dense ascending collections
/// stay small. Entries must be pushed in non-decreasing offset order;
/// duplicate offsets are allowed.
///
/// The buffer itself, as exposed by [`as_bytes`](Self::as_bytes) and accepted
/// by [`from_buffer`](Self::from_buffer), is the list's serialized
/// interchange form: it is self-delimited entry by entry, and deserialization
/// re-derives the entry count and tail bookkeeping by replaying the headers.
#[derive(Clone, Default)]
pub struct BitsetList {
	buf: Vec<u8>,
	count: usize,
	/// Byte position of the last entry's header.
	tail: usize,
	/// Absolute offset of the last entry.
	tail_offset: Offset
}

impl BitsetList {
	/// Creates an empty list. Does not allocate.
	pub fn new() -> Self {
		Self::default()
	}

	/// Deserializes a list from a byte buffer previously produced by
	/// [`as_bytes`](Self::as_bytes), re-deriving the entry count and tail
	/// bookkeeping by replaying the entry headers.
	pub fn from_buffer(bytes: &[u8]) -> Result<Self, BitsetListError> {
		let mut count = 0;
		let mut tail = 0;
		let mut tail_offset = 0u64;
		let mut position = 0;

		while position < bytes.len() {
			let entry_start = position;
			let truncated = BitsetListError::TruncatedEntry {
				position: entry_start
			};

			let Some((delta, used)) = varint::read(&bytes[position..]) else {
				return Err(truncated);
			};
			position += used;
			let Some((word_count, used)) = varint::read(&bytes[position..]) else {
				return Err(truncated);
			};
			position += used;

			let body = word_count as usize * 4;
			if bytes.len() - position < body {
				return Err(truncated);
			}
			position += body;

			tail_offset += delta as u64;
			tail = entry_start;
			count += 1;
		}

		debug!("Deserialized bitset list with {count} entries");

		Ok(Self {
			buf: bytes.to_vec(),
			count,
			tail,
			tail_offset: tail_offset as Offset
		})
	}

	/// Appends `bitset` at the specified absolute offset.
	///
	/// `offset` must not be below the offset of the last pushed entry; pushing
	/// several entries at the same offset is fine. On error the list is left
	/// untouched.
	pub fn push(&mut self, offset: Offset, bitset: &Bitset) -> Result<(), BitsetListError> {
		let words = bitset.as_words();
		let entry_start = self.begin_entry(offset, words.len())?;
		for word in words {
			self.buf.extend_from_slice(&word.to_le_bytes());
		}
		self.commit_entry(entry_start, offset);
		Ok(())
	}

	/// Appends every entry of `other` to this list, with each offset increased
	/// by `shift`. `other` is only read.
	pub fn concat(&mut self, other: &Self, shift: Offset) -> Result<(), BitsetListError> {
		debug!("Concatenating {} list entries shifted by {shift}", other.count);

		for (offset, view) in other.iter() {
			let shifted = offset.checked_add(shift).ok_or(BitsetListError::OffsetOverflow {
				offset: (offset as u64).saturating_add(shift as u64)
			})?;
			let entry_start = self.begin_entry(shifted, view.word_count())?;
			self.buf.extend_from_slice(view.as_bytes());
			self.commit_entry(entry_start, shifted);
		}

		Ok(())
	}

	/// Returns the number of entries.
	pub fn count(&self) -> usize {
		self.count
	}

	/// Returns the length of the underlying byte buffer.
	pub fn byte_length(&self) -> usize {
		self.buf.len()
	}

	/// Returns the absolute offset of the last entry, or 0 for an empty list.
	pub fn tail_offset(&self) -> Offset {
		self.tail_offset
	}

	/// Returns the last entry without walking the whole buffer, or `None` for
	/// an empty list.
	pub fn tail(&self) -> Option<(Offset, BitsetView<'_>)> {
		if self.count == 0 {
			return None;
		}

		// Unwraps are safe: the buffer layout was validated when the list was
		// built, and `tail` points at the last entry's header
		let (_, used) = varint::read(&self.buf[self.tail..]).unwrap();
		let mut position = self.tail + used;
		let (word_count, used) = varint::read(&self.buf[position..]).unwrap();
		position += used;
		let words = &self.buf[position..position + word_count as usize * 4];

		Some((self.tail_offset, BitsetView { bytes: words }))
	}

	/// Returns the underlying byte buffer, the list's serialized form.
	pub fn as_bytes(&self) -> &[u8] {
		&self.buf
	}

	/// Iterates over every entry, in push order.
	pub fn iter(&self) -> BitsetListIter<'_> {
		self.range(..)
	}

	/// Iterates over the entries whose absolute offset falls within the
	/// specified window, in push order.
	///
	/// ```
	/// use fillset::{Bitset, BitsetList};
	///
	/// let mut list = BitsetList::new();
	/// list.push(3, &Bitset::from_offsets(&[10])).unwrap();
	/// list.push(10, &Bitset::from_offsets(&[100, 1000])).unwrap();
	///
	/// assert_eq!(list.range(3..10).count(), 1);
	/// assert_eq!(list.range(4..5).count(), 0);
	/// assert_eq!(list.range(..).count(), 2);
	/// ```
	pub fn range<R: RangeBounds<Offset>>(&self, window: R) -> BitsetListIter<'_> {
		let start = match window.start_bound() {
			Bound::Unbounded => 0,
			Bound::Included(&offset) => offset,
			Bound::Excluded(&offset) => offset.saturating_add(1)
		};
		// An inclusive bound at the offset maximum is the same as no bound
		let end = match window.end_bound() {
			Bound::Unbounded => None,
			Bound::Excluded(&offset) => Some(offset),
			Bound::Included(&offset) => offset.checked_add(1)
		};

		BitsetListIter {
			bytes: &self.buf,
			position: 0,
			offset: 0,
			start: start as u64,
			end: end.map(|offset| offset as u64)
		}
	}

	/// Validates the entry header invariants and writes the header, returning
	/// the entry's start position for [`commit_entry`](Self::commit_entry).
	/// Nothing is written on error.
	fn begin_entry(&mut self, offset: Offset, word_count: usize) -> Result<usize, BitsetListError> {
		if offset < self.tail_offset {
			return Err(BitsetListError::NonMonotonicPush {
				offset,
				tail_offset: self.tail_offset
			});
		}
		let delta = offset as u64 - self.tail_offset as u64;
		if delta > varint::MAX_VALUE as u64 {
			return Err(BitsetListError::OffsetDeltaOverflow { delta });
		}
		if word_count > varint::MAX_VALUE as usize {
			return Err(BitsetListError::WordCountOverflow { word_count });
		}

		trace!("Pushing {word_count}-word list entry at offset {offset}");

		let entry_start = self.buf.len();
		buffer::reserve_pow2(&mut self.buf, 8 + word_count * 4);
		varint::write(&mut self.buf, delta as u32);
		varint::write(&mut self.buf, word_count as u32);
		Ok(entry_start)
	}

	fn commit_entry(&mut self, entry_start: usize, offset: Offset) {
		self.tail = entry_start;
		self.tail_offset = offset;
		self.count += 1;
	}
}

impl Debug for BitsetList {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BitsetList")
			.field("count", &self.count)
			.field("byte_length", &self.buf.len())
			.field("tail_offset", &self.tail_offset)
			.finish_non_exhaustive()
	}
}

impl<'list> IntoIterator for &'list BitsetList {
	type Item = (Offset, BitsetView<'list>);
	type IntoIter = BitsetListIter<'list>;

	fn into_iter(self) -> BitsetListIter<'list> {
		self.iter()
	}
}

/// A windowed iterator over the entries of a [`BitsetList`], yielding each
/// entry's absolute offset together with a zero-copy [`BitsetView`] of its
/// words. Created by [`BitsetList::iter`] and [`BitsetList::range`].
///
/// The iterator borrows the list's buffer; the list cannot be pushed to while
/// any iterator is alive.
#[derive(Clone)]
pub struct BitsetListIter<'list> {
	bytes: &'list [u8],
	position: usize,
	/// Absolute offset of the last decoded entry. Wider than [`Offset`] so
	/// that replaying adversarial buffers cannot overflow it.
	offset: u64,
	start: u64,
	/// Exclusive window end; `None` means unbounded.
	end: Option<u64>
}

impl<'list> BitsetListIter<'list> {
	/// Counts the set bits over every entry in the iterator's window,
	/// returning `(raw, unique)`: `raw` sums the per-entry population counts,
	/// while `unique` counts the bits of the OR fold of all the entries,
	/// computed in compressed form.
	pub fn population_counts(self) -> (Offset, Offset) {
		let views: Vec<BitsetView<'list>> = self.map(|(_, view)| view).collect();

		let raw = views.iter().map(|view| view.count() as u64).sum::<u64>();
		let folded = fold_word_streams(
			views
				.iter()
				.map(|view| (BooleanOp::Or, view.word_iter()))
				.collect()
		);
		let unique = stream_count(WordIter::from_words(&folded));

		(raw as Offset, unique as Offset)
	}
}

impl<'list> Iterator for BitsetListIter<'list> {
	type Item = (Offset, BitsetView<'list>);

	fn next(&mut self) -> Option<Self::Item> {
		while self.position < self.bytes.len() {
			// Unwraps are safe: the buffer layout was validated when the list
			// was built
			let (delta, used) = varint::read(&self.bytes[self.position..]).unwrap();
			self.position += used;
			let (word_count, used) = varint::read(&self.bytes[self.position..]).unwrap();
			self.position += used;

			let body = word_count as usize * 4;
			let words = &self.bytes[self.position..self.position + body];
			self.position += body;

			self.offset += delta as u64;

			if let Some(end) = self.end {
				if self.offset >= end {
					// Offsets never decrease, so no further entry can match
					self.position = self.bytes.len();
					return None;
				}
			}
			if self.offset < self.start {
				continue;
			}

			return Some((self.offset as Offset, BitsetView { bytes: words }));
		}

		None
	}
}

/// A read-only bitset borrowing its encoded words, as little-endian bytes,
/// from a [`BitsetList`] buffer. Supports the whole query surface of
/// [`Bitset`] without copying a single word.
#[derive(Clone, Copy)]
pub struct BitsetView<'list> {
	bytes: &'list [u8]
}

impl BitsetView<'_> {
	/// Returns whether the bit at `offset` is set.
	pub fn get(&self, offset: Offset) -> bool {
		stream_get(self.word_iter(), offset)
	}

	/// Counts the set bits.
	pub fn count(&self) -> Offset {
		stream_count(self.word_iter()) as Offset
	}

	/// Returns the lowest set offset, or 0 if the view is empty.
	pub fn min(&self) -> Offset {
		stream_min(self.word_iter()).unwrap_or(0) as Offset
	}

	/// Returns the highest set offset, or 0 if the view is empty.
	pub fn max(&self) -> Offset {
		stream_max(self.word_iter()).unwrap_or(0) as Offset
	}

	/// Returns the length of the viewed word stream, in bytes.
	pub fn byte_length(&self) -> usize {
		self.bytes.len()
	}

	/// Returns the number of encoded words in the viewed stream.
	pub fn word_count(&self) -> usize {
		self.bytes.len() / 4
	}

	/// Returns the viewed encoded words, verbatim, as little-endian bytes.
	pub fn as_bytes(&self) -> &[u8] {
		self.bytes
	}

	/// Copies the viewed words into an owned, mutable [`Bitset`].
	pub fn to_bitset(&self) -> Bitset {
		Bitset::from_words(self.word_iter().collect())
	}

	pub(crate) fn word_iter(&self) -> WordIter<'_> {
		WordIter::from_le_bytes(self.bytes)
	}
}

impl Debug for BitsetView<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		self.to_bitset().fmt(f)
	}
}
