//! Error types.

use crate::debug::Mismatch;
use crate::fetch::FetchError;
use crate::registry::ListHandle;
use thiserror::Error;

/// Errors reported by the list manager and its consistency checks.
#[derive(Debug, Error)]
pub enum Error {
    /// The handle does not name a live list.
    #[error("no list registered as {0}")]
    UnknownList(ListHandle),

    /// The segment chain no longer partitions the list's index range.
    #[error("segment chain broken at item {index}: {reason}")]
    Partition {
        /// Item index where the problem was detected.
        index: usize,
        /// What went wrong.
        reason: &'static str,
    },

    /// A fetched range no longer fits the segment it was requested for.
    #[error("fetched items {first}..={last} no longer fit their segment")]
    StaleRange {
        /// First item of the range.
        first: usize,
        /// Last item of the range.
        last: usize,
    },

    /// A filler's height disagrees with the segment it stands in for.
    #[error("filler for items {first}..={last} is {actual} rows, expected {expected}")]
    FillerHeight {
        /// First item of the segment.
        first: usize,
        /// Last item of the segment.
        last: usize,
        /// Height the metrics call for.
        expected: usize,
        /// Height found in the container.
        actual: usize,
    },

    /// The container's nodes do not line up with the segment chain.
    #[error("container node {position} out of step with segments: {reason}")]
    NodeOrder {
        /// Position of the offending node in the container.
        position: usize,
        /// What went wrong.
        reason: &'static str,
    },

    /// Rendered items disagree with a full reference fetch.
    #[error("list {container} does not match its reference: {mismatch}")]
    Mismatch {
        /// Container of the offending list.
        container: String,
        /// The first difference found.
        mismatch: Mismatch,
    },

    /// A range fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
