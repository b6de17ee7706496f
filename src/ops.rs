//! Action streams and differential replay.
//!
//! A byte string decodes into a sequence of insert/delete/lookup actions,
//! which [`replay`] runs against both a [`TinyMap`] and a `BTreeMap`. Any
//! disagreement is reported as a [`Divergence`]. The fuzz target and the
//! property tests both drive the map through this module.
//!
//! # Wire format
//!
//! Each action starts with a header byte: the top two bits pick the action
//! (`0` insert, `1` delete, `2` lookup, `3` skipped), the low six bits are the
//! key. An insert is followed by its value, whose width depends on how many
//! bytes remain:
//!
//! ```text
//! remaining  value
//! 0          0
//! 1          that byte
//! 2, 3       u16, little-endian
//! >= 4       u32, little-endian
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::Error;
use crate::key::Key;
use crate::map::TinyMap;

const OP_INSERT: u8 = 0;
const OP_DELETE: u8 = 1;
const OP_LOOKUP: u8 = 2;

/// One step of an action stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Insert or overwrite `key`.
    Insert {
        /// Target key.
        key: Key,
        /// Stored value.
        value: u64,
    },
    /// Delete `key` if present.
    Delete {
        /// Target key.
        key: Key,
    },
    /// Look `key` up and compare against the reference.
    Lookup {
        /// Target key.
        key: Key,
    },
}

fn take_value(data: &[u8]) -> (u64, &[u8]) {
    match data.len() {
        0 => (0, data),
        1 => (data[0] as u64, &data[1..]),
        2 | 3 => (u16::from_le_bytes([data[0], data[1]]) as u64, &data[2..]),
        _ => (
            u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as u64,
            &data[4..],
        ),
    }
}

/// Decode a byte string into actions. Every input decodes; nothing is rejected.
pub fn decode(mut data: &[u8]) -> Vec<Action> {
    let mut actions = Vec::new();

    while let Some((&header, rest)) = data.split_first() {
        data = rest;
        let key = Key::from_low_bits(header);

        match header >> 6 {
            OP_INSERT => {
                let (value, rest) = take_value(data);
                data = rest;
                actions.push(Action::Insert { key, value });
            }
            OP_DELETE => actions.push(Action::Delete { key }),
            OP_LOOKUP => actions.push(Action::Lookup { key }),
            _ => {}
        }
    }

    actions
}

/// Encode actions into the wire format.
///
/// Insert values are written as four bytes, so `decode(&encode(a)?) == a`.
/// Fails with [`Error::ValueTooWide`] if an inserted value does not fit in a
/// `u32`.
pub fn encode(actions: &[Action]) -> crate::error::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(actions.len() * 5);
    for action in actions {
        match *action {
            Action::Insert { key, value } => {
                let narrow = u32::try_from(value).map_err(|_| Error::ValueTooWide(value))?;
                out.push((OP_INSERT << 6) | key.get());
                out.extend_from_slice(&narrow.to_le_bytes());
            }
            Action::Delete { key } => out.push((OP_DELETE << 6) | key.get()),
            Action::Lookup { key } => out.push((OP_LOOKUP << 6) | key.get()),
        }
    }
    Ok(out)
}

/// A disagreement between [`TinyMap`] and the reference map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Divergence {
    /// A lookup returned a different result than the reference.
    #[error("step {step}: lookup of key {key} returned {actual:?}, expected {expected:?}")]
    Lookup {
        /// Index of the lookup action.
        step: usize,
        /// Key looked up.
        key: Key,
        /// What the map returned.
        actual: Option<u64>,
        /// What the reference returned.
        expected: Option<u64>,
    },

    /// After the last action, a key's state differed from the reference.
    #[error("final sweep: key {key} holds {actual:?}, expected {expected:?}")]
    FinalState {
        /// Key probed.
        key: Key,
        /// What the map returned.
        actual: Option<u64>,
        /// What the reference returned.
        expected: Option<u64>,
    },

    /// The presence bitmap and the packed values disagree on the entry count.
    #[error("step {step}: presence has {presence_ones} bits set but {len} values are stored")]
    Length {
        /// Index of the action after which the check failed.
        step: usize,
        /// `presence().count_ones()`.
        presence_ones: u32,
        /// `len()`.
        len: usize,
    },
}

/// Run `actions` against a fresh [`TinyMap`] and a `BTreeMap`, checking every
/// lookup, the length invariant after every step, and finally all 64 keys.
///
/// Returns the resulting map when no divergence was found.
pub fn replay(actions: &[Action]) -> Result<TinyMap, Divergence> {
    let mut map = TinyMap::new();
    let mut reference = BTreeMap::new();
    match check(actions, &mut map, &mut reference) {
        Ok(()) => {
            log::debug!("replayed {} actions, {} keys live", actions.len(), map.len());
            Ok(map)
        }
        Err(divergence) => {
            log::warn!("{divergence}");
            Err(divergence)
        }
    }
}

fn check(
    actions: &[Action],
    map: &mut TinyMap,
    reference: &mut BTreeMap<Key, u64>,
) -> Result<(), Divergence> {
    for (step, action) in actions.iter().enumerate() {
        log::trace!("step {step}: {action:?}");
        match *action {
            Action::Insert { key, value } => {
                map.insert(key, value);
                reference.insert(key, value);
            }
            Action::Delete { key } => {
                map.remove(key);
                reference.remove(&key);
            }
            Action::Lookup { key } => {
                let actual = map.get(key);
                let expected = reference.get(&key).copied();
                if actual != expected {
                    return Err(Divergence::Lookup {
                        step,
                        key,
                        actual,
                        expected,
                    });
                }
            }
        }

        let presence_ones = map.presence().count_ones();
        if presence_ones as usize != map.len() {
            return Err(Divergence::Length {
                step,
                presence_ones,
                len: map.len(),
            });
        }
    }

    for key in Key::all() {
        let actual = map.get(key);
        let expected = reference.get(&key).copied();
        if actual != expected {
            return Err(Divergence::FinalState {
                key,
                actual,
                expected,
            });
        }
    }
    Ok(())
}
