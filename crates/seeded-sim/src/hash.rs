//! Stable string hashing.
//!
//! Every derived value in this crate is driven by [`stable_hash`], a 32-bit
//! rolling hash over UTF-16 code units. The hash is reproducible across
//! processes and platforms and matches identifiers already published on
//! runbook pages, so it must not change.

/// Number of leading UTF-16 code units of a seed that contribute to its hash.
///
/// Seeds frequently come from route parameters; capping the input bounds the
/// work per call regardless of what a client sends. Seeds no longer than this
/// are hashed whole.
pub const SEED_HASH_LIMIT: usize = 512;

/// Number of trailing UTF-16 code units always hashed for seeds longer than
/// [`SEED_HASH_LIMIT`].
///
/// Discriminators are appended to the end of a seed, so the tail keeps
/// sub-seeds of an over-long base seed distinct.
pub const SEED_TAIL_WINDOW: usize = 64;

const MULTIPLIER: u32 = 31;
const SIGN_BIT: u32 = 1 << 31;
const BASE36_RADIX: u32 = 36;

/// Hashes a seed string to a non-negative 32-bit value.
///
/// The accumulator is updated as `h = 31 * h + unit` with 32-bit wraparound
/// for each UTF-16 code unit, then interpreted as a signed integer and
/// replaced by its absolute value. An accumulator equal to `i32::MIN` maps to
/// `2_147_483_648`, so the result is always non-negative.
///
/// Seeds longer than [`SEED_HASH_LIMIT`] units are hashed as their first
/// [`SEED_HASH_LIMIT`] units followed by their last [`SEED_TAIL_WINDOW`]
/// units. Characters are never split between the two windows.
///
/// # Examples
///
/// ```
/// use seeded_sim::stable_hash;
///
/// assert_eq!(stable_hash(""), 0);
/// assert_eq!(stable_hash("abc"), 96_354);
/// assert_eq!(stable_hash("abc"), stable_hash("abc"));
/// ```
#[must_use]
pub fn stable_hash(seed: &str) -> u32 {
    let (head, tail) = hashed_window(seed);
    let accumulator = head
        .encode_utf16()
        .chain(tail.encode_utf16())
        .fold(0_u32, |acc, unit| {
            acc.wrapping_mul(MULTIPLIER).wrapping_add(u32::from(unit))
        });
    signed_magnitude(accumulator)
}

/// Splits `seed` into the head and tail that feed the hash. The tail is empty
/// unless the seed exceeds [`SEED_HASH_LIMIT`] units.
fn hashed_window(seed: &str) -> (&str, &str) {
    let mut head_units = 0_usize;
    let head_end = seed
        .char_indices()
        .find_map(|(offset, ch)| {
            head_units = head_units.saturating_add(ch.len_utf16());
            (head_units > SEED_HASH_LIMIT).then_some(offset)
        })
        .unwrap_or(seed.len());
    if head_end == seed.len() {
        return (seed, "");
    }

    let mut tail_units = 0_usize;
    let tail_start = seed
        .char_indices()
        .rev()
        .find_map(|(offset, ch)| {
            tail_units = tail_units.saturating_add(ch.len_utf16());
            (tail_units > SEED_TAIL_WINDOW).then(|| offset.saturating_add(ch.len_utf8()))
        })
        .unwrap_or(0);

    let head = seed.get(..head_end).unwrap_or(seed);
    let tail = seed.get(tail_start.max(head_end)..).unwrap_or_default();
    (head, tail)
}

/// Returns the magnitude of `bits` read as a two's-complement `i32`.
pub(crate) const fn signed_magnitude(bits: u32) -> u32 {
    if bits & SIGN_BIT == 0 {
        bits
    } else {
        bits.wrapping_neg()
    }
}

/// Renders a value in lowercase base 36.
///
/// # Examples
///
/// ```
/// use seeded_sim::to_base36;
///
/// assert_eq!(to_base36(0), "0");
/// assert_eq!(to_base36(35), "z");
/// assert_eq!(to_base36(96_354), "22ci");
/// ```
#[must_use]
pub fn to_base36(value: u32) -> String {
    let mut digits = Vec::new();
    let mut remaining = value;
    loop {
        if let Some(digit) = char::from_digit(remaining.rem_euclid(BASE36_RADIX), BASE36_RADIX) {
            digits.push(digit);
        }
        remaining = remaining.div_euclid(BASE36_RADIX);
        if remaining == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}
