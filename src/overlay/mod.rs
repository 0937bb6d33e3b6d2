//! Per-environment overlay of manifest records.
//!
//! An environment override is a sparse copy of the base record: every field
//! it leaves at its zero value inherits the base value. [`resolve`] applies one
//! such patch to a copy of the base, following the rules of [`Merge`]:
//!
//! - scalars: a non-zero override wins, a zero override is ignored
//! - `Option`: a present override wins regardless of its content
//! - maps: key-wise union, recursing into keys present on both sides
//! - lists: a non-empty override replaces the whole list
//! - records: field by field
//!
//! A scalar deliberately set to zero in an override cannot be told apart from
//! an unset one, so it never clears the base value.

mod impls;

pub(crate) use impls::impl_merge;

use crate::error::OverlayError;

/// Types that can absorb a sparse override of themselves.
pub trait Merge {
    /// Merges `patch` into `self`, treating zero values in `patch` as unset.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MergeConflict`] if the two values have
    /// incompatible shapes.
    fn merge(&mut self, patch: &Self) -> Result<(), OverlayError>;

    /// Merges a value the override explicitly provided, e.g. the content of a
    /// `Some`. Scalars are replaced outright; records still merge field by
    /// field.
    ///
    /// # Errors
    ///
    /// Same as [`Merge::merge`].
    fn merge_present(&mut self, patch: &Self) -> Result<(), OverlayError> {
        self.merge(patch)
    }
}

/// Computes the effective record for a base and an optional override.
///
/// The base is never modified. Without an override the result is an
/// independent copy equal to the base.
///
/// # Errors
///
/// Returns [`OverlayError::MergeConflict`] if the override cannot be merged.
pub fn resolve<T: Merge + Clone>(base: &T, patch: Option<&T>) -> Result<T, OverlayError> {
    let mut effective = base.clone();
    if let Some(patch) = patch {
        effective.merge(patch)?;
    }
    Ok(effective)
}
