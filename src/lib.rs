//! A packed-memory array for Rust.
//!
//! This crate provides [`PackedMemoryArray`], a dynamic ordered multiset that
//! keeps its keys physically sorted in one contiguous allocation with
//! controlled gaps. Because the keys are laid out in order in memory, range
//! scans are simple forward walks over the backing store, and insertions only
//! move a handful of neighbouring keys on average.
//!
//! # Example
//!
//! ```
//! use wabi_pma::PackedMemoryArray;
//!
//! let mut pma = PackedMemoryArray::new();
//! pma.insert(5);
//! pma.insert(3);
//! pma.insert(4);
//! pma.insert(1);
//! pma.insert(2);
//!
//! assert_eq!(pma.len(), 5);
//! assert_eq!(pma.iter().collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
//!
//! // Largest key <= 4 (the predecessor query).
//! assert_eq!(pma.predecessor(4), Some(4));
//!
//! // Inclusive range scan, in ascending order.
//! let mut hits = Vec::new();
//! pma.scan(2, 4, |k| hits.push(k));
//! assert_eq!(hits, [2, 3, 4]);
//!
//! assert!(pma.erase(3));
//! assert_eq!(pma.iter().collect::<Vec<_>>(), [1, 2, 4, 5]);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Sorted, gapped storage** - Keys live in one flat array; scans are cache-oblivious
//! - **Duplicates allowed** - The container is a multiset; equal keys stay adjacent
//! - **Amortized cheap updates** - Density-driven rebalancing bounds the keys moved per insert
//!
//! # Implementation
//!
//! The backing store is divided into power-of-two *segments* of roughly
//! `capacity / log2(capacity)` slots each, and contiguous aligned runs of
//! segments form the *windows* of an implicit binary tree. Each tree height
//! carries an upper and a lower density threshold; an insertion that pushes a
//! segment past its threshold walks up the tree to the smallest window still
//! inside its own threshold and redistributes that window's keys with uniform
//! stride. When even the root window is saturated (or starved, on erase), the
//! whole array is reallocated at twice (or half) the capacity.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
// NOTE: We have to allow unsafe code in order to keep free-slot contents
// unspecified without paying for an `Option` per slot.
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod raw;

pub mod pma;

pub use pma::PackedMemoryArray;
