//! Non-cryptographic digests, seals, and digest trees.
//!
//! These functions only mix bits deterministically. A digest is not
//! collision resistant and a seal involves no key, so neither proves
//! anything about authorship or tampering.

use serde::Serialize;

use crate::hash::{signed_magnitude, stable_hash};

/// Length of a rendered digest in hex characters.
pub const DIGEST_LEN: usize = 64;

/// Length of a rendered seal.
pub const SEAL_LEN: usize = 88;

const LANE_SEEDS: [u32; 8] = [
    0x5a4d, 0x8f3c, 0x1b7e, 0xd2a9, 0x6c1f, 0xe49b, 0x374a, 0xbc50,
];
const LANE_MULTIPLIER: u32 = 37;
const GOLDEN_GAMMA: u32 = 0x9e37_79b9;
const SEAL_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Digest that marks the start of a chain and the root of an empty tree.
#[must_use]
pub fn zero_digest() -> String {
    "0".repeat(DIGEST_LEN)
}

/// Mixes `input` into a 64-character lowercase hex digest.
///
/// Eight independent 32-bit lanes are folded over the UTF-16 code units of
/// the input and rendered as eight hex characters each.
///
/// # Examples
///
/// ```
/// use seeded_sim::provenance::content_digest;
///
/// let digest = content_digest("ssh-hardening:v0.1");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, content_digest("ssh-hardening:v0.1"));
/// ```
#[must_use]
pub fn content_digest(input: &str) -> String {
    LANE_SEEDS
        .iter()
        .map(|seed| {
            let lane = input.encode_utf16().fold(*seed, |acc, unit| {
                let mixed = acc.wrapping_mul(LANE_MULTIPLIER) ^ u32::from(unit);
                mixed.wrapping_mul(GOLDEN_GAMMA) ^ (mixed >> 16)
            });
            format!("{:08x}", signed_magnitude(lane))
        })
        .collect()
}

/// Derives the 88-character seal of an event.
///
/// The seal is a deterministic function of its three inputs. It has the
/// look of a base64 signature but no key is involved.
#[must_use]
pub fn simulated_seal(digest: &str, previous: &str, timestamp: &str) -> String {
    let payload = format!("{digest}:{previous}:{timestamp}");
    (0..SEAL_LEN)
        .map(|position| {
            let hash = usize::try_from(stable_hash(&format!("{payload}{position}{position}")))
                .unwrap_or_default();
            SEAL_ALPHABET
                .get(hash.rem_euclid(SEAL_ALPHABET.len()))
                .map_or('A', |byte| char::from(*byte))
        })
        .collect()
}

/// Side on which a sibling digest sits relative to the running digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingSide {
    /// The sibling is combined on the left.
    Left,
    /// The sibling is combined on the right.
    Right,
}

/// One step of a digest path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    /// Digest of the sibling node.
    pub sibling_digest: String,
    /// Side the sibling sits on.
    pub side: SiblingSide,
}

fn combine(left: &str, right: &str) -> String {
    content_digest(&format!("{left}{right}"))
}

/// Folds one tree layer into the next, pairing the last node with itself
/// when the layer has odd length.
fn next_layer(layer: &[String]) -> Vec<String> {
    layer
        .chunks(2)
        .filter_map(|pair| match pair {
            [left, rest @ ..] => Some(combine(left, rest.first().unwrap_or(left))),
            [] => None,
        })
        .collect()
}

/// Computes the root of the binary digest tree over `digests`.
///
/// Returns [`zero_digest`] for an empty slice.
#[must_use]
pub fn digest_root(digests: &[String]) -> String {
    let mut layer = digests.to_vec();
    while layer.len() > 1 {
        layer = next_layer(&layer);
    }
    layer.pop().unwrap_or_else(zero_digest)
}

/// Builds the sibling path from the leaf at `leaf` to the root.
///
/// Returns `None` when `leaf` is out of range.
#[must_use]
pub fn digest_path(digests: &[String], leaf: usize) -> Option<Vec<PathStep>> {
    if leaf >= digests.len() {
        return None;
    }
    let mut path = Vec::new();
    let mut layer = digests.to_vec();
    let mut position = leaf;
    while layer.len() > 1 {
        let is_right = position.rem_euclid(2) == 1;
        let sibling = if is_right {
            position.saturating_sub(1)
        } else {
            position.saturating_add(1)
        };
        let sibling_digest = layer.get(sibling).or_else(|| layer.last()).cloned()?;
        path.push(PathStep {
            sibling_digest,
            side: if is_right {
                SiblingSide::Left
            } else {
                SiblingSide::Right
            },
        });
        layer = next_layer(&layer);
        position = position.div_euclid(2);
    }
    Some(path)
}

/// Recombines a leaf digest with its path, yielding the implied root.
#[must_use]
pub fn fold_path(leaf_digest: &str, path: &[PathStep]) -> String {
    path.iter()
        .fold(leaf_digest.to_owned(), |current, step| match step.side {
            SiblingSide::Right => combine(&current, &step.sibling_digest),
            SiblingSide::Left => combine(&step.sibling_digest, &current),
        })
}
