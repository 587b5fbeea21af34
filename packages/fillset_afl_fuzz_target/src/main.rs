use fillset::{Bitset, BitsetList};

fn main() {
	afl::fuzz!(|data: &[u8]| {
		// Each fuzz run has to be pretty fast. Just check that no crashes happen
		if let Ok(mut bitset) = Bitset::from_buffer(data) {
			bitset.count();
			bitset.min();
			bitset.max();
			bitset.get(12_345);
			bitset.set(31 * 40 + 7);
			bitset.unset(62);
			Bitset::from_buffer(&bitset.to_bytes()).ok();
		}

		if let Ok(list) = BitsetList::from_buffer(data) {
			for (_, view) in list.iter() {
				view.count();
				view.max();
			}
		}
	})
}
