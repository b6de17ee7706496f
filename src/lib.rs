//! # tinymap
//!
//! *A map for keys 0..64 that stores nothing for absent keys.*
//!
//! ## Intuition First
//!
//! Picture a row of 64 mailboxes where most are empty. Building all 64 boxes
//! wastes space; building only the occupied ones loses the ability to find
//! box 37 without searching. The trick is a single 64-bit "directory": bit `k`
//! says whether box `k` exists, and the boxes that do exist stand shoulder to
//! shoulder in key order. To find box 37, count how many boxes exist below
//! it; that count is its position.
//!
//! ## The Problem
//!
//! Programs that allocate many small maps (per-node children in a trie,
//! per-slot attributes, sparse register files) pay heavily for general-purpose
//! maps:
//! - **Dense arrays**: 64 slots per map, mostly wasted.
//! - **Hash maps**: buckets, control bytes and load-factor slack.
//!
//! ## Mathematical Formulation
//!
//! With presence bitmap $P$ and packed values $V$, the slot of key $k$ is
//!
//! $$\mathrm{idx}(k) = \mathrm{popcount}(P \mathbin{\&} (2^k - 1))$$
//!
//! and the invariant maintained by every operation is
//! $|V| = \mathrm{popcount}(P)$, with $V$ sorted by key.
//!
//! ## Complexity Analysis
//!
//! - **Lookup**: $O(1)$, one mask and one `popcnt`.
//! - **Insert / remove**: $O(1)$ to locate, $O(n - \mathrm{idx})$ to shift,
//!   where $n \le 64$.
//! - **Space**: 8 bytes of bitmap plus 8 bytes per present key (and the `Vec`
//!   header).
//!
//! ## What Could Go Wrong
//!
//! 1. **Keys >= 64**: `1 << 64` overflows. [`Key`] can only hold `0..64`, so
//!    every raw integer goes through a checked conversion that fails with
//!    [`Error::KeyOutOfRange`].
//! 2. **Bitmap ahead of storage**: setting the presence bit before the value
//!    storage grows leaves the two out of sync if growth fails. Inserts grow
//!    first, and [`TinyMap::try_insert`] surfaces allocation failure as
//!    [`Error::ResourceExhausted`] with the map unchanged.
//! 3. **Concurrency**: there is no internal locking. Wrap the map in a lock to
//!    share it.
//!
//! ## Example
//!
//! ```rust
//! use tinymap::{Key, TinyMap};
//!
//! let mut map = TinyMap::new();
//! let five = Key::try_from(5u8)?;
//! map.insert(five, 100);
//! map.insert(Key::try_from(2u8)?, 200);
//! map.insert(five, 300);
//!
//! assert_eq!(map.get(five), Some(300));
//! assert_eq!(map.lookup(Key::MIN), (0, false));
//! assert_eq!(map.len(), 2);
//! assert!(Key::try_from(64u8).is_err());
//! # Ok::<(), tinymap::Error>(())
//! ```
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - **`TinyMap`**: the bitmap-indexed packed map.
//! - **`Key`**: the range-checked key type.
//! - **`ops`**: byte-stream action decoding and differential replay against
//!   `BTreeMap`, shared by the fuzz target and the property tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod map;
pub mod ops;

pub use error::{Error, Result};
pub use key::Key;
pub use map::TinyMap;
