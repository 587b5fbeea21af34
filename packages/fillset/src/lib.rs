//! fillset is a Rust library of compressed bitsets: possibly very sparse sets of
//! non-negative integer offsets stored in a word-aligned hybrid run-length
//! encoding. Random-access queries, random-access mutation, population counting,
//! minimum/maximum extraction and multi-bitset boolean composition all operate
//! directly on the compressed representation; no decompression step ever runs.
//!
//! # Encoding
//!
//! Logical bits are grouped into 31-bit *blocks*, and a bitset is an ordered
//! stream of 32-bit encoded words, each either a *literal* (the raw bits of one
//! block) or a *fill* (a run-length encoded span of clean zero blocks, optionally
//! absorbing a single set bit of the following block into its position field).
//! The word-level codec lives in the companion [`fill_word`] crate; this crate
//! owns the streams and keeps them in canonical form across arbitrary mutations:
//! no trailing empty words, no empty fills, adjacent fills merged whenever their
//! combined span fits one word.
//!
//! # Components
//!
//! - [`Bitset`]: the owned, mutable compressed bitset.
//! - [`Operation`]: a boolean expression (AND/OR/XOR/ANDNOT, with nesting) over
//!   any number of bitsets, executed by walking all the operand streams in
//!   lockstep over logical blocks.
//! - [`BitsetList`]: an append-only packed container storing many bitsets in one
//!   contiguous byte buffer with delta-encoded offsets, iterated without copying
//!   via [`BitsetView`]s.
//!
//! # Offsets
//!
//! Offsets are 32-bit by default. Enabling the `64bit-offsets` Cargo feature
//! widens the [`Offset`] alias to 64 bits; the serialized forms are unchanged,
//! and reaching far-distant offsets simply chains more maximum-length fill words.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://crates.io/crates/log) crate for logging
//! status and diagnostic messages to any interested consumers. Executables can
//! customize the verbosity of this logging, and even compile it out, [as
//! explained in the `log` crate documentation](https://docs.rs/log/0.4/log).
//!
//! # Example
//!
//! ```
//! use fillset::{Bitset, BooleanOp, Operation};
//!
//! let mut wanted = Bitset::from_offsets(&[100, 200, 300]);
//! wanted.set(400);
//!
//! let banned = Bitset::from_offsets(&[200]);
//!
//! let mut operation = Operation::new(&wanted);
//! operation.add(&banned, BooleanOp::AndNot);
//!
//! let result = operation.execute();
//! assert_eq!(result.count(), 3);
//! assert!(result.get(100) && !result.get(200));
//! ```

#![forbid(unsafe_code)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]
#![deny(non_ascii_idents)]
#![deny(clippy::print_stdout)]
#![deny(clippy::unimplemented)]
#![warn(explicit_outlives_requirements)]
#![warn(noop_method_call)]
#![warn(unreachable_pub)]
#![warn(unused_import_braces)]
#![warn(unused_qualifications)]
#![warn(variant_size_differences)]
#![warn(clippy::empty_enum)]
#![warn(clippy::enum_glob_use)]
#![warn(clippy::invalid_upcast_comparisons)]
#![warn(clippy::multiple_inherent_impl)]
#![warn(clippy::use_self)]
#![warn(clippy::used_underscore_binding)]
#![warn(clippy::redundant_feature_names)]

pub use bitset::{Bitset, BitsetBufferError, Ones};
pub use list::{BitsetList, BitsetListError, BitsetListIter, BitsetView};
pub use operation::{BooleanOp, Operation};

mod bitset;
mod buffer;
mod list;
mod operation;
mod stream;

/// The logical bit offset type of every bitset in this crate.
///
/// 32 bits wide by default; the `64bit-offsets` Cargo feature widens it to 64
/// bits without changing any serialized representation.
#[cfg(not(feature = "64bit-offsets"))]
pub type Offset = u32;

/// The logical bit offset type of every bitset in this crate.
///
/// 32 bits wide by default; the `64bit-offsets` Cargo feature widens it to 64
/// bits without changing any serialized representation.
#[cfg(feature = "64bit-offsets")]
pub type Offset = u64;
