//! Memory overlap analysis.
//!
//! In-place operations can only be functionalized when writing to the output does not read back elements written
//! earlier by the same operation, which is the case when two logical elements of a tensor share one memory location.
//! Detecting that exactly is expensive, so the analysis is three-valued: [`MemOverlap::TooHard`] means the cheap checks
//! could not decide.
//!
//! [`has_internal_overlap_helper`] is the boolean view used by the functionalization pass. It treats an undecidable
//! result as "no overlap", the same choice eager mode makes.

use crate::tensor::{Layout, Tensor};
use crate::{Error, Result};

/// Whether the elements of a tensor overlap in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemOverlap {
    /// No two elements share a memory location.
    No,
    /// At least two elements share a memory location.
    Yes,
    /// The analysis could not decide.
    TooHard,
}

/// Analyze whether the elements of a tensor overlap in memory, using only cheap checks on its metadata.
///
/// - A non-overlapping and dense tensor does not overlap.
/// - A dimension with a zero stride and more than one element overlaps.
/// - Anything else, including symbolic strides that can not be decided and non-strided layouts, is too hard.
///
/// The analysis never reads the storage, and works the same for meta tensors.
///
/// # Panics
///
/// If the tensor is undefined.
#[track_caller]
pub fn has_internal_overlap(tensor: &Tensor) -> MemOverlap {
    if tensor.layout() != Layout::Strided {
        return MemOverlap::TooHard;
    }
    if tensor.is_non_overlapping_and_dense() {
        return MemOverlap::No;
    }
    let broadcast_dim = tensor
        .sym_sizes()
        .iter()
        .zip(tensor.sym_strides())
        .any(|(size, stride)| {
            matches!((size.maybe_as_int(), stride.maybe_as_int()), (Some(size), Some(0)) if size > 1)
        });
    if broadcast_dim {
        return MemOverlap::Yes;
    }
    MemOverlap::TooHard
}

/// An analysis of the internal memory overlap of a tensor.
///
/// Implement this trait to plug a more precise, and usually more expensive, analysis into an
/// [`InternalOverlapOracle`].
pub trait OverlapAnalyzer {
    /// Analyze whether the elements of a defined tensor overlap in memory.
    fn has_internal_overlap(&self, tensor: &Tensor) -> MemOverlap;
}

/// The default analyzer, [`has_internal_overlap`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EagerOverlapAnalyzer;
impl OverlapAnalyzer for EagerOverlapAnalyzer {
    fn has_internal_overlap(&self, tensor: &Tensor) -> MemOverlap {
        has_internal_overlap(tensor)
    }
}

/// A conservative boolean view of an [`OverlapAnalyzer`].
///
/// Only a definite [`MemOverlap::Yes`] is reported as overlapping. An undecidable result is reported as not
/// overlapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalOverlapOracle<A = EagerOverlapAnalyzer> {
    analyzer: A,
}
impl<A: OverlapAnalyzer> InternalOverlapOracle<A> {
    /// Create an oracle backed by the given analyzer.
    pub const fn new(analyzer: A) -> Self {
        Self { analyzer }
    }

    /// Whether the elements of the tensor definitely overlap in memory.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn has_internal_overlap(&self, tensor: &Tensor) -> bool {
        if !tensor.defined() {
            crate::log::error!("internal overlap queried on an undefined tensor");
            panic!("has_internal_overlap called on an undefined tensor");
        }
        match self.analyzer.has_internal_overlap(tensor) {
            MemOverlap::Yes => true,
            MemOverlap::No => false,
            // undecidable is treated as non overlapping, matching eager mode
            MemOverlap::TooHard => false,
        }
    }
}

/// Whether the elements of the tensor definitely overlap in memory.
///
/// Returns `true` exactly when [`has_internal_overlap`] returns [`MemOverlap::Yes`]. Both [`MemOverlap::No`] and
/// [`MemOverlap::TooHard`] yield `false`.
///
/// ```
/// use functionalize::overlap::has_internal_overlap_helper;
/// use functionalize::tensor::Tensor;
///
/// let t = Tensor::from_slice(&[1.0_f32, 2.0, 3.0], &[3]).unwrap();
/// assert!(!has_internal_overlap_helper(&t));
///
/// let expanded = t.as_strided(&[2, 3], &[0, 1], 0).unwrap();
/// assert!(has_internal_overlap_helper(&expanded));
/// ```
///
/// # Panics
///
/// If the tensor is undefined.
#[track_caller]
pub fn has_internal_overlap_helper(tensor: &Tensor) -> bool {
    InternalOverlapOracle::new(EagerOverlapAnalyzer).has_internal_overlap(tensor)
}

/// Fail with [`Error::InternalOverlap`] if the elements of the tensor definitely overlap in memory.
///
/// Undecidable results pass, the same as in [`has_internal_overlap_helper`].
///
/// # Panics
///
/// If the tensor is undefined.
#[track_caller]
pub fn assert_no_internal_overlap(tensor: &Tensor) -> Result<()> {
    if has_internal_overlap_helper(tensor) {
        crate::log::error!("unsupported operation: more than one element of the written-to tensor refers to a single memory location");
        return Err(Error::InternalOverlap);
    }
    Ok(())
}
