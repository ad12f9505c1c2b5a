//! Bounded derivations from a seed.
//!
//! Each helper maps [`stable_hash`] of a seed into a bounded value: an
//! integer range, an index into an ordered option list, a list of
//! sub-seeded items, or a time offset. None of them hold state between
//! calls.
//!
//! Logically distinct fields must use distinct seeds. [`discriminate`] builds
//! the `seed:discriminator` form used throughout the crate so that, for
//! example, a status and a zone drawn from the same base seed do not
//! co-vary.

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use crate::error::DerivationError;
use crate::hash::stable_hash;

/// Derives an integer in `min..=max` from a seed.
///
/// The value is `min + stable_hash(seed) mod (max - min + 1)`.
///
/// # Errors
///
/// Returns [`DerivationError::InvalidRange`] when `max < min`.
///
/// # Examples
///
/// ```
/// use seeded_sim::derive_int;
///
/// let agents = derive_int("sw-aws-hardening-2026", 50, 500).expect("valid range");
/// assert_eq!(agents, 306);
/// assert!(derive_int("sw-aws-hardening-2026", 5, 2).is_err());
/// ```
pub fn derive_int(seed: &str, min: i64, max: i64) -> Result<i64, DerivationError> {
    if max < min {
        return Err(DerivationError::InvalidRange { min, max });
    }
    let hash = u64::from(stable_hash(seed));
    let offset = match max.abs_diff(min).checked_add(1) {
        Some(span) => hash.rem_euclid(span),
        // The range spans every i64, so the hash is already in bounds.
        None => hash,
    };
    min.checked_add_unsigned(offset)
        .ok_or(DerivationError::InvalidRange { min, max })
}

/// Derives an unsigned count in `min..=max` from a seed.
///
/// Uses the same mapping as [`derive_int`].
///
/// # Errors
///
/// Returns [`DerivationError::InvalidRange`] when `max < min`.
pub fn derive_count(seed: &str, min: u32, max: u32) -> Result<u32, DerivationError> {
    let (low, high) = (i64::from(min), i64::from(max));
    let value = derive_int(seed, low, high)?;
    u32::try_from(value).map_err(|_| DerivationError::InvalidRange {
        min: low,
        max: high,
    })
}

/// Derives an index in `0..len` from a seed.
///
/// # Errors
///
/// Returns [`DerivationError::EmptyOptions`] when `len` is zero.
pub fn derive_index(seed: &str, len: usize) -> Result<usize, DerivationError> {
    if len == 0 {
        return Err(DerivationError::EmptyOptions {
            seed: seed.to_owned(),
        });
    }
    let hash = usize::try_from(stable_hash(seed)).unwrap_or(usize::MAX);
    Ok(hash.rem_euclid(len))
}

/// Selects one option from an ordered, non-empty list.
///
/// # Errors
///
/// Returns [`DerivationError::EmptyOptions`] when `options` is empty.
///
/// # Examples
///
/// ```
/// use seeded_sim::{derive_enum, discriminate};
///
/// let zones = ["us-east-1a", "us-west-2a", "eu-west-1a"];
/// let seed = discriminate("sw-demo", "zone");
/// let zone = derive_enum(&seed, &zones).expect("zones are not empty");
/// assert!(zones.contains(zone));
/// ```
pub fn derive_enum<'a, T>(seed: &str, options: &'a [T]) -> Result<&'a T, DerivationError> {
    let index = derive_index(seed, options.len())?;
    options.get(index).ok_or_else(|| DerivationError::EmptyOptions {
        seed: seed.to_owned(),
    })
}

/// Appends a discriminator to a seed, yielding `seed:discriminator`.
#[must_use]
pub fn discriminate(seed: &str, discriminator: &str) -> String {
    format!("{seed}:{discriminator}")
}

/// Builds a list of `count` items, each from its own sub-seed.
///
/// Item `i` receives the sub-seed `seed:discriminator:i`, so its value does
/// not depend on `count`: growing or shrinking the list never changes the
/// items that remain.
///
/// # Errors
///
/// Propagates the first error returned by `factory`.
///
/// # Examples
///
/// ```
/// use seeded_sim::{DerivationError, derive_int, derive_list};
///
/// let short = derive_list("sw-demo", "agent", 3, |sub_seed, _| derive_int(sub_seed, 0, 9))?;
/// let long = derive_list("sw-demo", "agent", 5, |sub_seed, _| derive_int(sub_seed, 0, 9))?;
/// assert_eq!(short.as_slice(), long.get(..3).expect("five items"));
/// # Ok::<(), DerivationError>(())
/// ```
pub fn derive_list<T, E, F>(
    seed: &str,
    discriminator: &str,
    count: usize,
    mut factory: F,
) -> Result<Vec<T>, E>
where
    F: FnMut(&str, usize) -> Result<T, E>,
{
    let mut items = Vec::with_capacity(count);
    for index in 0..count {
        let sub_seed = format!("{seed}:{discriminator}:{index}");
        items.push(factory(&sub_seed, index)?);
    }
    Ok(items)
}

/// Derives a time offset in `0..=max_offset` at millisecond resolution.
///
/// # Errors
///
/// Returns [`DerivationError::InvalidRange`] when `max_offset` is negative.
pub fn derive_offset(seed: &str, max_offset: TimeDelta) -> Result<TimeDelta, DerivationError> {
    let max_ms = max_offset.num_milliseconds();
    let offset_ms = derive_int(seed, 0, max_ms)?;
    TimeDelta::try_milliseconds(offset_ms).ok_or(DerivationError::InvalidRange {
        min: 0,
        max: max_ms,
    })
}

/// Returns `now - derive_offset(seed, max_offset)`.
///
/// The result is offset-deterministic: the distance from the clock's current
/// instant is fixed by the seed, while the absolute instant moves with the
/// clock.
///
/// # Errors
///
/// Returns [`DerivationError::InvalidRange`] when `max_offset` is negative.
pub fn offset_timestamp(
    clock: &dyn Clock,
    seed: &str,
    max_offset: TimeDelta,
) -> Result<DateTime<Utc>, DerivationError> {
    let offset = derive_offset(seed, max_offset)?;
    let now = clock.utc();
    Ok(now.checked_sub_signed(offset).unwrap_or(DateTime::<Utc>::MIN_UTC))
}
