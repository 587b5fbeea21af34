use test_log::test;

use super::*;
use crate::Offset;

fn offsets(bitset: &Bitset) -> Vec<Offset> {
	bitset.ones().collect()
}

#[test]
fn or_fold_unions_all_operands() {
	let b1 = Bitset::from_offsets(&[100, 200, 300]);
	let b2 = Bitset::from_offsets(&[100]);
	let b3 = Bitset::from_offsets(&[300, 400]);

	let mut operation = Operation::new(&b1);
	operation.add(&b2, BooleanOp::Or).add(&b3, BooleanOp::Or);

	let result = operation.execute();
	assert_eq!(offsets(&result), [100, 200, 300, 400]);
	assert_eq!(result.count(), 4);
	assert_eq!(operation.count(), 4);
}

#[test]
fn and_then_andnot_narrows_the_result() {
	let b1 = Bitset::from_offsets(&[3, 1000, 1001, 1100]);
	let b2 = Bitset::from_offsets(&[3, 130, 1000, 1101]);
	let b3 = Bitset::from_offsets(&[1000]);

	let mut operation = Operation::new(&b1);
	operation.add(&b2, BooleanOp::And).add(&b3, BooleanOp::AndNot);

	let result = operation.execute();
	assert_eq!(offsets(&result), [3]);
	assert_eq!(result.count(), 1);
}

#[test]
fn nested_operations_compose() {
	let b1 = Bitset::from_offsets(&[100, 200, 300]);
	let b2 = Bitset::from_offsets(&[100]);
	let b3 = Bitset::from_offsets(&[300, 400]);

	let mut inner = Operation::new(&b2);
	inner.add(&b3, BooleanOp::Or);

	let mut outer = Operation::new(&b1);
	outer.add_nested(inner, BooleanOp::And);

	let result = outer.execute();
	assert_eq!(offsets(&result), [100, 300]);
	assert_eq!(result.count(), 2);
}

#[test]
fn xor_with_the_same_operand_twice_is_identity() {
	let a = Bitset::from_offsets(&[0, 31, 40, 1000, 500_000]);
	let b = Bitset::from_offsets(&[31, 62, 1000, 250_000]);

	let mut operation = Operation::new(&a);
	operation.add(&b, BooleanOp::Xor).add(&b, BooleanOp::Xor);

	assert_eq!(operation.execute(), a);
}

#[test]
fn and_and_or_are_commutative() {
	let a = Bitset::from_offsets(&[1, 31, 100, 3000]);
	let b = Bitset::from_offsets(&[31, 99, 100, 4000]);

	for op in [BooleanOp::And, BooleanOp::Or] {
		let mut forward = Operation::new(&a);
		forward.add(&b, op);
		let mut backward = Operation::new(&b);
		backward.add(&a, op);

		assert_eq!(
			forward.execute(),
			backward.execute(),
			"{op:?} should be commutative"
		);
	}
}

#[test]
fn and_and_or_are_associative() {
	let a = Bitset::from_offsets(&[1, 31, 100, 3000, 5000]);
	let b = Bitset::from_offsets(&[31, 99, 100, 4000, 5000]);
	let c = Bitset::from_offsets(&[31, 100, 3000, 4000, 5000]);

	for op in [BooleanOp::And, BooleanOp::Or] {
		let mut left_first = Operation::new(&a);
		left_first.add(&b, op);
		let ab = left_first.execute();
		let mut then_c = Operation::new(&ab);
		then_c.add(&c, op);

		let mut right_first = Operation::new(&b);
		right_first.add(&c, op);
		let bc = right_first.execute();
		let mut a_then = Operation::new(&a);
		a_then.add(&bc, op);

		assert_eq!(
			then_c.execute(),
			a_then.execute(),
			"{op:?} should be associative"
		);
	}
}

#[test]
fn andnot_is_and_with_the_complement() {
	let span: Vec<Offset> = (0..=1200).collect();
	let universe = Bitset::from_offsets(&span);

	let a = Bitset::from_offsets(&[3, 31, 130, 1000, 1100]);
	let b = Bitset::from_offsets(&[3, 130, 1101]);

	let mut complement = Operation::new(&universe);
	complement.add(&b, BooleanOp::AndNot);
	let not_b = complement.execute();

	let mut with_complement = Operation::new(&a);
	with_complement.add(&not_b, BooleanOp::And);

	let mut direct = Operation::new(&a);
	direct.add(&b, BooleanOp::AndNot);

	assert_eq!(direct.execute(), with_complement.execute());
}

#[test]
fn operands_of_different_lengths_compose() {
	let short = Bitset::from_offsets(&[5]);
	let long = Bitset::from_offsets(&[1000, 70_000]);

	let mut operation = Operation::new(&short);
	operation.add(&long, BooleanOp::Xor);
	assert_eq!(offsets(&operation.execute()), [5, 1000, 70_000]);

	// Bits of the longer right operand past the shorter left one stay clear
	let mut operation = Operation::new(&short);
	operation.add(&long, BooleanOp::AndNot);
	assert_eq!(offsets(&operation.execute()), [5]);

	let mut operation = Operation::new(&long);
	operation.add(&short, BooleanOp::AndNot);
	assert_eq!(offsets(&operation.execute()), [1000, 70_000]);
}

#[test]
fn absorbed_bits_and_fills_compose() {
	let a = Bitset::from_offsets(&[31]);
	let b = Bitset::from_offsets(&[62]);

	let mut operation = Operation::new(&a);
	operation.add(&b, BooleanOp::Or);

	let result = operation.execute();
	assert_eq!(result, Bitset::from_offsets(&[31, 62]));
	assert_eq!(result.count(), 2);
}

#[test]
fn execution_output_is_canonically_coalesced() {
	// Two operands whose union is one long clean run followed by a lone bit:
	// the output must come back as a single absorbing fill word
	let a = Bitset::from_offsets(&[3100]);
	let b = Bitset::new();

	let mut operation = Operation::new(&a);
	operation.add(&b, BooleanOp::Or);

	assert_eq!(operation.execute().as_words(), a.as_words());
}

#[test]
fn empty_operations_yield_empty_bitsets() {
	assert_eq!(Operation::empty().execute(), Bitset::new());
	assert_eq!(Operation::empty().count(), 0);

	// An empty primary keeps AND steps empty
	let empty = Bitset::new();
	let full = Bitset::from_offsets(&[1, 2, 3]);
	let mut operation = Operation::new(&empty);
	operation.add(&full, BooleanOp::And);
	assert_eq!(operation.execute().count(), 0);
}

#[test]
fn count_matches_the_materialized_result() {
	let a = Bitset::from_offsets(&[1, 400, 100_000]);
	let b = Bitset::from_offsets(&[400, 500]);

	let mut operation = Operation::new(&a);
	operation.add(&b, BooleanOp::Xor);

	assert_eq!(operation.count(), operation.execute().count());
	assert_eq!(operation.count(), 3);
}
