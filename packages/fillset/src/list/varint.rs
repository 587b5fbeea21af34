//! The length-prefixed variable-width integer encoding of the bitset list
//! buffer.
//!
//! The top two bits of the first byte announce how many bytes the integer
//! occupies in total (`00` → 1 through `11` → 4). The remaining six bits of the
//! first byte are the integer's most significant bits; any following bytes
//! carry the lower bits, most significant byte first. Encoders always pick the
//! shortest form, so persisted buffers have one canonical spelling per value.

/// The largest value the 4-byte form can carry.
pub(crate) const MAX_VALUE: u32 = (1 << 30) - 1;

/// Appends `value` to `buf` in the shortest form. `value` must not exceed
/// [`MAX_VALUE`].
pub(crate) fn write(buf: &mut Vec<u8>, value: u32) {
	debug_assert!(value <= MAX_VALUE);

	let extra_bytes = match value {
		0..=0x3F => 0u32,
		0x40..=0x3FFF => 1,
		0x4000..=0x003F_FFFF => 2,
		_ => 3
	};

	buf.push(((extra_bytes as u8) << 6) | (value >> (8 * extra_bytes)) as u8);
	for byte in (0..extra_bytes).rev() {
		buf.push((value >> (8 * byte)) as u8);
	}
}

/// Decodes the varint at the front of `bytes`, returning its value and how
/// many bytes it occupied, or `None` if `bytes` ends before the announced
/// byte count.
pub(crate) fn read(bytes: &[u8]) -> Option<(u32, usize)> {
	let first = *bytes.first()?;
	let extra_bytes = (first >> 6) as usize;
	if bytes.len() <= extra_bytes {
		return None;
	}

	let mut value = (first & 0x3F) as u32;
	for &byte in &bytes[1..=extra_bytes] {
		value = value << 8 | byte as u32;
	}

	Some((value, 1 + extra_bytes))
}
