#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// A resizable array with explicit, non-shrinking capacity management.
pub mod array;

mod error;

/// Byte hashes and the pluggable [`HashFunctor`](hash::HashFunctor) strategies
/// used by [`HashMap`].
pub mod hash;

/// A key-value map over [`HashTable`].
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a key-value interface with a configurable hashing strategy.
pub mod hash_map;

/// The flat, internally chained hash table behind [`HashMap`].
pub mod hash_table;

pub mod numeric;

/// A byte string with small-buffer storage and a cached hash.
pub mod small_string;

pub mod utf8;

pub use array::Array;
pub use error::Error;
pub use error::Result;
#[cfg(feature = "foldhash")]
pub use hash::FoldHash;
pub use hash::FixedSizeHash;
pub use hash::HashFunctor;
pub use hash::IdentityHash;
pub use hash::StringHash;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_map::StringHashMap;
pub use hash_table::HashTable;
pub use small_string::SmallString;
