#![allow(clippy::unusual_byte_groupings)]

use super::*;

#[test]
fn word_classification_works() {
	assert!(is_literal(0));
	assert!(is_literal(0b0_0_10010_0000000000000000000000101));
	assert!(is_fill(0b1_0_00000_0000000000000000000000001));
	assert!(!is_fill(LITERAL_PAYLOAD_MASK));

	// The color bit alone does not make a fill: it is literal payload bit 0
	assert!(is_literal(COLOR_FLAG));
	assert!(!is_colored_fill(COLOR_FLAG));
	assert!(is_colored_fill(FILL_FLAG | COLOR_FLAG | 3));
}

#[test]
fn fill_field_round_trip_works() {
	let bit = BlockBit::new(17).expect("17 is a valid block bit index");
	let fill = make_fill(12345, Some(bit)).expect("12345 is a valid fill length");

	assert!(is_fill(fill));
	assert_eq!(fill_length(fill), 12345);
	assert_eq!(fill_position(fill), Some(bit));

	let cleared = clear_fill_position(fill);
	assert_eq!(fill_position(cleared), None);
	assert_eq!(fill_length(cleared), 12345);

	let replaced = set_fill_position(cleared, BlockBit::new(0).unwrap());
	assert_eq!(fill_position(replaced), BlockBit::new(0));
}

#[test]
fn fill_position_encoding_is_off_by_one() {
	// Position field 0 means "no absorbed bit"; block bit k is stored as k + 1
	let fill = make_fill(1, Some(BlockBit::new(0).unwrap())).unwrap();
	assert_eq!(fill, 0b1_0_00001_0000000000000000000000001);

	let fill = make_fill(1, Some(BlockBit::new(30).unwrap())).unwrap();
	assert_eq!(fill, 0b1_0_11111_0000000000000000000000001);

	let fill = make_fill(1, None).unwrap();
	assert_eq!(fill, 0b1_0_00000_0000000000000000000000001);
}

#[test]
fn overlong_fill_is_rejected() {
	assert_eq!(make_fill(MAX_FILL_LENGTH, None), Some(FILL_FLAG | MAX_FILL_LENGTH));
	assert_eq!(make_fill(MAX_FILL_LENGTH + 1, None), None);
	assert_eq!(make_fill(u32::MAX, Some(BlockBit::new(3).unwrap())), None);
}

#[test]
fn out_of_range_block_bit_is_rejected() {
	assert!(BlockBit::new(30).is_some());
	assert_eq!(BlockBit::new(31), None);
	assert_eq!(BlockBit::new(u8::MAX), None);
}

#[test]
fn literal_bit_masks_work() {
	// Block bit 0 maps to the most significant payload bit, bit 30 to the least
	assert_eq!(literal_for_bit(BlockBit::new(0).unwrap()), 0x4000_0000);
	assert_eq!(literal_for_bit(BlockBit::new(1).unwrap()), 0x2000_0000);
	assert_eq!(literal_for_bit(BlockBit::new(30).unwrap()), 0x0000_0001);

	let word = literal_for_bit(BlockBit::new(7).unwrap()) | literal_for_bit(BlockBit::new(21).unwrap());
	assert!(literal_has_bit(word, BlockBit::new(7).unwrap()));
	assert!(literal_has_bit(word, BlockBit::new(21).unwrap()));
	assert!(!literal_has_bit(word, BlockBit::new(8).unwrap()));
}

#[test]
fn literal_popcount_ignores_the_discriminator_bit() {
	assert_eq!(literal_popcount(0), 0);
	assert_eq!(literal_popcount(LITERAL_PAYLOAD_MASK), 31);
	assert_eq!(literal_popcount(FILL_FLAG | 0b101), 2);
}

#[test]
fn literal_bit_extremes_work() {
	assert_eq!(literal_min_bit(0), None);
	assert_eq!(literal_max_bit(0), None);

	let word = literal_for_bit(BlockBit::new(4).unwrap()) | literal_for_bit(BlockBit::new(28).unwrap());
	assert_eq!(literal_min_bit(word), BlockBit::new(4));
	assert_eq!(literal_max_bit(word), BlockBit::new(28));

	let lone = literal_for_bit(BlockBit::new(13).unwrap());
	assert_eq!(literal_min_bit(lone), BlockBit::new(13));
	assert_eq!(literal_max_bit(lone), BlockBit::new(13));
}
