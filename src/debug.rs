//! Consistency checking for demand-loaded lists.
//!
//! These helpers compare what a list has rendered against a reference fetch
//! of the whole list, and watch the segment invariants while the scheduler
//! runs. During development, call
//! [`Manager::enable_consistency_checks`](crate::manager::Manager::enable_consistency_checks)
//! to have the manager fetch each list's reference itself and compare after
//! every pass, or install [`invariant_hook`] with
//! [`Manager::set_up_debugging`](crate::manager::Manager::set_up_debugging)
//! to watch the structural invariants only.

use crate::container::{Container, NodeKind};
use crate::fetch::FetchRequest;
use crate::list::DemandList;
use crate::manager::{UpdateHook, UpdateOutcome};
use crate::registry::{ListHandle, Registry};
use std::collections::HashMap;
use std::fmt;
use tracing::error;

/// How rendered items differ from the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// The list ended before the reference did.
    NotEnoughOnPage,
    /// The list has items past the end of the reference.
    TooManyOnPage,
    /// An item's text differs from the reference.
    ResultsDoNotMatch,
}

impl MismatchKind {
    /// Upper-case name used in error codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotEnoughOnPage => "NOT_ENOUGH_ON_PAGE",
            Self::TooManyOnPage => "TOO_MANY_ON_PAGE",
            Self::ResultsDoNotMatch => "RESULTS_DO_NOT_MATCH",
        }
    }
}

/// The first difference between a list and its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// What went wrong.
    pub kind: MismatchKind,
    /// Index of the item where it went wrong.
    pub index: usize,
    /// Number of items in the reference.
    pub reference_count: usize,
}

impl Mismatch {
    /// Compact code of the form `KIND_<index>_<reference count>`.
    pub fn code(&self) -> String {
        format!("{}_{}_{}", self.kind.as_str(), self.index, self.reference_count)
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Text of an item with styling removed and whitespace runs collapsed.
pub fn normalize(item: &str) -> String {
    strip_ansi_escapes::strip_str(item)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compares the rendered items of `container` with `reference`, a fetch of
/// the full list.
///
/// Items are compared in order up to the first filler, since nothing past it
/// is guaranteed to be rendered yet. Returns how many items matched.
///
/// ```rust
/// use bubbletea_dllist::container::{Container, NodeKind};
/// use bubbletea_dllist::debug::{check_rendered, MismatchKind};
///
/// let mut container = Container::with_items("c", vec!["a".into(), "b  c".into()]);
/// container.append(NodeKind::Filler { height: 3 });
/// let reference = vec!["a".to_string(), "b c".into(), "d".into()];
/// assert_eq!(check_rendered(&container, &reference), Ok(2));
///
/// let wrong = vec!["a".to_string(), "x".into()];
/// let mismatch = check_rendered(&container, &wrong).unwrap_err();
/// assert_eq!(mismatch.kind, MismatchKind::ResultsDoNotMatch);
/// assert_eq!(mismatch.code(), "RESULTS_DO_NOT_MATCH_1_2");
/// ```
pub fn check_rendered(container: &Container, reference: &[String]) -> Result<usize, Mismatch> {
    let reference_count = reference.len();
    let mismatch = |kind, index| Mismatch {
        kind,
        index,
        reference_count,
    };

    let mut index = 0;
    for node in container.nodes() {
        let item = match &node.kind {
            NodeKind::Filler { .. } => return Ok(index),
            NodeKind::Item(item) => item,
        };
        let Some(expected) = reference.get(index) else {
            return Err(mismatch(MismatchKind::TooManyOnPage, index));
        };
        if normalize(item) != normalize(expected) {
            return Err(mismatch(MismatchKind::ResultsDoNotMatch, index));
        }
        index += 1;
    }

    if index < reference_count {
        return Err(mismatch(MismatchKind::NotEnoughOnPage, index));
    }
    Ok(index)
}

/// Request for every item of `list`, flagged as a debug fetch.
///
/// Returns `None` for an empty list.
pub fn full_range_request(list: &DemandList) -> Option<FetchRequest> {
    let last = list.total().checked_sub(1)?;
    let mut request = FetchRequest::new(list.fetch_url(), 0, last);
    request.for_debug = true;
    Some(request)
}

/// A debugging hook that checks every list after each scheduler pass and
/// logs any broken invariant.
pub fn invariant_hook() -> UpdateHook {
    Box::new(|registry: &Registry, outcome: &UpdateOutcome| {
        for list in registry.iter().filter(|list| list.is_ready()) {
            if let Err(err) = list.check() {
                error!(list = %list.handle(), outcome = ?outcome, error = %err, "list invariant broken");
            }
        }
    })
}

#[derive(Debug)]
enum Reference {
    Loading,
    Loaded(Vec<String>),
    Unavailable,
}

/// Reference contents and reported mismatches for every checked list.
#[derive(Debug, Default)]
pub(crate) struct ConsistencyChecks {
    references: HashMap<ListHandle, Reference>,
    mismatches: HashMap<ListHandle, Mismatch>,
}

impl ConsistencyChecks {
    /// Picks the next list needing a reference fetch and marks it loading.
    ///
    /// References are fetched one at a time.
    pub(crate) fn next_request(&mut self, registry: &Registry) -> Option<(ListHandle, FetchRequest)> {
        if self
            .references
            .values()
            .any(|reference| matches!(reference, Reference::Loading))
        {
            return None;
        }
        let (handle, request) = registry
            .iter()
            .filter(|list| !self.references.contains_key(&list.handle()))
            .find_map(|list| full_range_request(list).map(|request| (list.handle(), request)))?;
        self.references.insert(handle, Reference::Loading);
        Some((handle, request))
    }

    pub(crate) fn store(&mut self, list: ListHandle, items: Vec<String>) {
        self.references.insert(list, Reference::Loaded(items));
    }

    pub(crate) fn give_up(&mut self, list: ListHandle) {
        self.references.insert(list, Reference::Unavailable);
    }

    pub(crate) fn mismatch(&self, list: ListHandle) -> Option<Mismatch> {
        self.mismatches.get(&list).copied()
    }

    /// Compares every set-up list that has a reference. A mismatch is
    /// logged once, when it first appears or changes.
    pub(crate) fn run(&mut self, registry: &Registry) {
        for list in registry.iter().filter(|list| list.is_ready()) {
            let handle = list.handle();
            let Some(Reference::Loaded(reference)) = self.references.get(&handle) else {
                continue;
            };
            match check_rendered(list.container(), reference) {
                Ok(_) => {
                    self.mismatches.remove(&handle);
                }
                Err(mismatch) => {
                    if self.mismatches.insert(handle, mismatch) != Some(mismatch) {
                        error!(
                            list = %handle,
                            code = %mismatch.code(),
                            url = list.fetch_url(),
                            "rendered items do not match the reference"
                        );
                    }
                }
            }
        }
    }
}
