//! Contains the [`Operation`] boolean expression planner, which composes any
//! number of bitsets in compressed form.

use log::trace;

use crate::{
	Offset,
	bitset::Bitset,
	stream::{BlockCursor, StreamWriter, WordIter}
};

#[cfg(test)]
mod test;

/// A boolean operator combining an operand into the running result of an
/// [`Operation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BooleanOp {
	/// Keep the bits present in both sides.
	And,
	/// Keep the bits present in either side.
	Or,
	/// Keep the bits present in exactly one side.
	Xor,
	/// Keep the bits of the left side not present in the right side.
	AndNot
}

impl BooleanOp {
	/// Applies the operator to one 31-bit block of the running result and one
	/// block of the operand.
	fn apply(self, accumulated: u32, operand: u32) -> u32 {
		match self {
			Self::And => accumulated & operand,
			Self::Or => accumulated | operand,
			Self::Xor => accumulated ^ operand,
			Self::AndNot => accumulated & !operand
		}
	}
}

/// A planned boolean expression over bitsets, evaluated as a left fold: the
/// running result starts empty, and every step combines its operand into it
/// with its operator. The first step added is therefore the primary operand,
/// typically combined with [`BooleanOp::Or`].
///
/// Steps reference their operand bitsets without owning them; none of the
/// operands may be mutated while the operation is alive. A step may also hold a
/// whole nested operation, whose result is computed on the fly when the outer
/// operation executes.
#[derive(Default)]
pub struct Operation<'bitsets> {
	steps: Vec<Step<'bitsets>>
}

struct Step<'bitsets> {
	op: BooleanOp,
	operand: Operand<'bitsets>
}

enum Operand<'bitsets> {
	Bitset(&'bitsets Bitset),
	Nested(Operation<'bitsets>)
}

/// A nested operation result lives only for the duration of the outer
/// execution, while plain operands are borrowed from the caller.
enum ResolvedOperand<'bitsets> {
	Borrowed(&'bitsets Bitset),
	Owned(Bitset)
}

impl ResolvedOperand<'_> {
	fn word_iter(&self) -> WordIter<'_> {
		match self {
			Self::Borrowed(bitset) => bitset.word_iter(),
			Self::Owned(bitset) => bitset.word_iter()
		}
	}
}

impl<'bitsets> Operation<'bitsets> {
	/// Creates an operation whose primary operand is the specified bitset.
	pub fn new(primary: &'bitsets Bitset) -> Self {
		let mut operation = Self::default();
		operation.add(primary, BooleanOp::Or);
		operation
	}

	/// Creates an operation with no steps at all. Executing it yields an empty
	/// bitset until steps are added.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Appends a step combining `bitset` into the running result with `op`.
	pub fn add(&mut self, bitset: &'bitsets Bitset, op: BooleanOp) -> &mut Self {
		self.steps.push(Step {
			op,
			operand: Operand::Bitset(bitset)
		});
		self
	}

	/// Appends a step combining the result of a whole nested operation into the
	/// running result with `op`.
	pub fn add_nested(&mut self, nested: Self, op: BooleanOp) -> &mut Self {
		self.steps.push(Step {
			op,
			operand: Operand::Nested(nested)
		});
		self
	}

	/// Executes the operation, producing a new bitset.
	///
	/// All operands are walked in lockstep over logical blocks, in compressed
	/// form: runs of blocks where every operand is inside a clean fill span are
	/// combined in one step and re-emitted as fills, so execution cost scales
	/// with the operands' encoded sizes, not with the offset range they span.
	pub fn execute(&self) -> Bitset {
		trace!("Executing {}-step bitset operation", self.steps.len());

		// Resolve nested operations up front so every source below is a flat
		// word stream
		let resolved: Vec<(BooleanOp, ResolvedOperand<'_>)> = self
			.steps
			.iter()
			.map(|step| {
				let operand = match &step.operand {
					Operand::Bitset(bitset) => ResolvedOperand::Borrowed(bitset),
					Operand::Nested(nested) => ResolvedOperand::Owned(nested.execute())
				};
				(step.op, operand)
			})
			.collect();

		let sources = resolved
			.iter()
			.map(|(op, operand)| (*op, operand.word_iter()))
			.collect();

		Bitset::from_words(fold_word_streams(sources))
	}

	/// Returns the population count of the operation's result.
	///
	/// The result is materialized internally and discarded; this is a
	/// convenience over [`execute`](Self::execute) for callers only interested
	/// in the count.
	pub fn count(&self) -> Offset {
		self.execute().count()
	}
}

/// Folds the specified word streams into one output stream, left to right, over
/// logical blocks.
///
/// At every step, each stream reports the longest upcoming run of blocks with a
/// stable payload; the shortest of those runs bounds how far all the streams
/// can advance at once. Runs where every stream contributes clean zeros fold to
/// zeros and buffer up into fills, so only blocks where some stream carries
/// bits are combined individually.
pub(crate) fn fold_word_streams(sources: Vec<(BooleanOp, WordIter<'_>)>) -> Vec<u32> {
	let mut cursors: Vec<(BooleanOp, BlockCursor<'_>)> = sources
		.into_iter()
		.map(|(op, words)| (op, BlockCursor::new(words)))
		.collect();
	let mut writer = StreamWriter::new();

	loop {
		if cursors.iter().all(|(_, cursor)| cursor.is_drained()) {
			break;
		}

		let mut stride = u64::MAX;
		let mut accumulated = 0u32;
		for (op, cursor) in &cursors {
			let (run, payload) = cursor.run();
			stride = stride.min(run);
			accumulated = op.apply(accumulated, payload);
		}

		if accumulated == 0 {
			writer.zeros(stride);
		} else {
			// A non-zero payload always comes from a single-block run
			debug_assert_eq!(stride, 1);
			writer.literal(accumulated);
		}

		for (_, cursor) in &mut cursors {
			cursor.advance(stride);
		}
	}

	writer.finish()
}
