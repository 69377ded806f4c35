//! The set of lists owned by one manager.

use crate::list::{DemandList, Registration};
use std::fmt;

/// Identifies a registered list.
///
/// Handles are never reused: removing a list leaves its slot empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListHandle(usize);

impl ListHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Registration order of the list, starting at 0.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ListHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list {}", self.0)
    }
}

/// Where a list sits on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The list.
    pub handle: ListHandle,
    /// Row of the list's first line.
    pub top: usize,
    /// Rows the list occupies.
    pub height: usize,
}

/// Registered lists, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    slots: Vec<Option<DemandList>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a list and returns its handle.
    pub fn insert(&mut self, registration: Registration) -> ListHandle {
        let handle = ListHandle::new(self.slots.len());
        self.slots
            .push(Some(DemandList::from_registration(handle, registration)));
        handle
    }

    /// Clears a list's slot, returning the list if it was live.
    pub fn remove(&mut self, handle: ListHandle) -> Option<DemandList> {
        self.slots.get_mut(handle.0).and_then(Option::take)
    }

    /// Looks up a live list.
    pub fn get(&self, handle: ListHandle) -> Option<&DemandList> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    /// Looks up a live list mutably.
    pub fn get_mut(&mut self, handle: ListHandle) -> Option<&mut DemandList> {
        self.slots.get_mut(handle.0).and_then(Option::as_mut)
    }

    /// Live lists in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DemandList> + '_ {
        self.slots.iter().flatten()
    }

    /// Live lists in registration order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DemandList> + '_ {
        self.slots.iter_mut().flatten()
    }

    /// Number of live lists.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no live lists remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stacks live lists top to bottom with `spacing` blank rows between them.
    pub fn layout(&self, spacing: usize) -> Vec<Placement> {
        let mut top = 0;
        self.iter()
            .enumerate()
            .map(|(i, list)| {
                if i > 0 {
                    top += spacing;
                }
                let placement = Placement {
                    handle: list.handle(),
                    top,
                    height: list.height(),
                };
                top += placement.height;
                placement
            })
            .collect()
    }

    /// Total rows of the page built by [`layout`](Self::layout).
    pub fn page_height(&self, spacing: usize) -> usize {
        self.layout(spacing)
            .last()
            .map(|placement| placement.top + placement.height)
            .unwrap_or(0)
    }
}
