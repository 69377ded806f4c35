//! A single demand-loaded list.
//!
//! A [`DemandList`] owns the rendered [`Container`] for one list together
//! with the [`SegmentList`] that records which item ranges are rendered. The
//! list starts from whatever items were rendered up front, stands a filler in
//! for the rest, and swaps fillers for fetched items as ranges arrive.
//!
//! # Examples
//!
//! ```rust
//! use bubbletea_dllist::geometry::LineMeasure;
//! use bubbletea_dllist::list::{DemandList, Registration};
//! use bubbletea_dllist::registry::Registry;
//!
//! let mut registry = Registry::new();
//! let items = (0..5).map(|i| format!("item {i}")).collect();
//! let handle = registry.insert(Registration::new("results", 50, "/search?q=x").with_items(items));
//!
//! let list = registry.get_mut(handle).unwrap();
//! list.setup(&LineMeasure::default());
//! let ranges: Vec<_> = list.segments().iter().map(|(_, s)| (s.shown, s.first, s.last)).collect();
//! assert_eq!(ranges, vec![(true, 0, 4), (false, 5, 49)]);
//! ```

use crate::container::{Container, Node, NodeKind};
use crate::error::Error;
use crate::fetch::FetchRequest;
use crate::geometry::{Measure, Metrics};
use crate::registry::ListHandle;
use crate::segment::{widen, Segment, SegmentId, SegmentList};
use std::fmt;
use tracing::{debug, trace};

/// Callback run on fetched items before they are inserted.
///
/// The items can be edited in place; whatever is left in the vector is what
/// gets inserted.
pub type LoadCallback = Box<dyn FnMut(&LoadedRange, &mut Vec<String>) + Send>;

/// Describes a fetched range handed to a [`LoadCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedRange {
    /// The list the items belong to.
    pub list: ListHandle,
    /// First item of the request.
    pub requested_first: usize,
    /// First item being inserted.
    pub first: usize,
    /// Last item being inserted.
    pub last: usize,
}

/// Everything needed to register a list with a manager.
pub struct Registration {
    pub(crate) container_id: String,
    pub(crate) total: usize,
    pub(crate) fetch_url: String,
    pub(crate) items: Vec<String>,
    pub(crate) on_load: Option<LoadCallback>,
}

impl Registration {
    /// Describes a list of `total` items fetched from `fetch_url`.
    pub fn new(container_id: impl Into<String>, total: usize, fetch_url: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            total,
            fetch_url: fetch_url.into(),
            items: Vec::new(),
            on_load: None,
        }
    }

    /// Items already rendered, starting at index 0.
    pub fn with_items(mut self, items: Vec<String>) -> Self {
        self.items = items;
        self
    }

    /// Sets the callback run on fetched items before insertion.
    pub fn with_on_load<F>(mut self, on_load: F) -> Self
    where
        F: FnMut(&LoadedRange, &mut Vec<String>) + Send + 'static,
    {
        self.on_load = Some(Box::new(on_load));
        self
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("container_id", &self.container_id)
            .field("total", &self.total)
            .field("fetch_url", &self.fetch_url)
            .field("items", &self.items.len())
            .field("on_load", &self.on_load.is_some())
            .finish()
    }
}

/// One row of a rendered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row<'a> {
    /// A line of item content.
    Item(&'a str),
    /// A row of filler standing in for unrendered items.
    Filler,
    /// Blank space between nodes.
    Gap,
}

/// A registered list and its rendering state.
pub struct DemandList {
    handle: ListHandle,
    total: usize,
    fetch_url: String,
    on_load: Option<LoadCallback>,
    metrics: Metrics,
    segments: SegmentList,
    container: Container,
    ready: bool,
}

impl DemandList {
    pub(crate) fn from_registration(handle: ListHandle, registration: Registration) -> Self {
        let Registration {
            container_id,
            total,
            fetch_url,
            items,
            on_load,
        } = registration;
        Self {
            handle,
            total,
            fetch_url,
            on_load,
            metrics: Metrics::default(),
            segments: SegmentList::new(),
            container: Container::with_items(container_id, items),
            ready: false,
        }
    }

    /// The list's handle.
    pub fn handle(&self) -> ListHandle {
        self.handle
    }

    /// Total number of items, rendered or not.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Base URL for range requests.
    pub fn fetch_url(&self) -> &str {
        &self.fetch_url
    }

    /// Item geometry.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The shown/unshown partition.
    pub fn segments(&self) -> &SegmentList {
        &self.segments
    }

    /// The rendered nodes.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Whether [`setup`](Self::setup) has run.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Builds the initial partition from the pre-rendered items.
    ///
    /// The rendered items become one shown segment starting at 0 and the
    /// remainder, if any, one unshown segment backed by a single filler.
    /// Metrics are measured from the first two rendered items. Calling this
    /// twice has no effect.
    pub fn setup(&mut self, measure: &dyn Measure) {
        if self.ready {
            return;
        }

        let sample: Vec<String> = self.container.items().take(2).map(str::to_owned).collect();
        self.metrics = measure.measure(&sample);

        let rendered = self.container.item_count();
        if rendered > self.total {
            debug!(
                list = %self.handle,
                rendered,
                total = self.total,
                "dropping pre-rendered items past the end of the list"
            );
            self.container.truncate(self.total);
        }
        let shown = rendered.min(self.total);

        self.segments = SegmentList::new();
        if shown > 0 {
            let anchor = self.container.last();
            self.segments.push_back(Segment::new(true, 0, shown - 1, anchor));
        }
        if self.total > shown {
            let height = self.metrics.filler_height(self.total - shown);
            let filler = self.container.append(NodeKind::Filler { height });
            self.segments
                .push_back(Segment::new(false, shown, self.total - 1, Some(filler)));
        }

        self.ready = true;
        trace!(list = %self.handle, shown, total = self.total, metrics = ?self.metrics, "list set up");
    }

    /// Chooses what to fetch so that items `first..=last` become visible.
    ///
    /// Picks the first unshown segment overlapping the range, clamps the
    /// range to it, and widens it to at least `min_span + 1` items where the
    /// segment allows.
    pub fn plan_fetch(
        &self,
        first: usize,
        last: usize,
        min_span: usize,
    ) -> Option<(SegmentId, FetchRequest)> {
        let id = self.segments.find_unshown_overlap(first, last)?;
        let segment = self.segments.get(id)?;
        let (first, last) = widen(first, last, segment.first, segment.last, min_span);
        Some((id, FetchRequest::new(self.fetch_url.clone(), first, last)))
    }

    /// Inserts fetched items for `first..=last` in place of part of the
    /// unshown segment `id`.
    ///
    /// The segment becomes shown when the range covers it exactly; otherwise
    /// it is split into an optional unshown prefix, the shown range and an
    /// optional unshown suffix with its own filler. The number of items is
    /// trusted to match the range.
    pub fn splice(
        &mut self,
        id: SegmentId,
        first: usize,
        last: usize,
        mut items: Vec<String>,
    ) -> Result<(), Error> {
        let segment = self
            .segments
            .get(id)
            .cloned()
            .ok_or(Error::StaleRange { first, last })?;
        if segment.shown || first > last || first < segment.first || last > segment.last {
            return Err(Error::StaleRange { first, last });
        }

        if let Some(on_load) = self.on_load.as_mut() {
            let range = LoadedRange {
                list: self.handle,
                requested_first: first,
                first,
                last,
            };
            on_load(&range, &mut items);
        }
        if items.len() != last + 1 - first {
            debug!(
                list = %self.handle,
                first,
                last,
                received = items.len(),
                "fetched item count does not match the requested range"
            );
        }

        let metrics = self.metrics;
        let filler = segment.anchor;
        let mut insert_at = filler.and_then(|filler| self.container.next_sibling(filler));

        let target = if segment.first == first && segment.last == last {
            if let Some(filler) = filler {
                self.container.remove(filler);
            }
            if let Some(s) = self.segments.get_mut(id) {
                s.shown = true;
            }
            id
        } else if segment.first == first {
            if let Some(s) = self.segments.get_mut(id) {
                s.first = last + 1;
            }
            if let Some(filler) = filler {
                self.container
                    .set_filler_height(filler, metrics.filler_height(segment.last - last));
            }
            insert_at = filler;
            self.segments
                .insert_before(id, Segment::new(true, first, last, None))
        } else {
            if let Some(s) = self.segments.get_mut(id) {
                s.last = first - 1;
            }
            if let Some(filler) = filler {
                self.container
                    .set_filler_height(filler, metrics.filler_height(first - segment.first));
            }
            let shown = self
                .segments
                .insert_after(id, Segment::new(true, first, last, None));
            if last < segment.last {
                let height = metrics.filler_height(segment.last - last);
                let suffix = self
                    .container
                    .insert_before(insert_at, NodeKind::Filler { height });
                self.segments.insert_after(
                    shown,
                    Segment::new(false, last + 1, segment.last, Some(suffix)),
                );
                insert_at = Some(suffix);
            }
            shown
        };

        let mut anchor = None;
        for item in items {
            anchor = Some(self.container.insert_before(insert_at, NodeKind::Item(item)));
        }
        if let Some(s) = self.segments.get_mut(target) {
            s.anchor = anchor;
        }

        debug!(list = %self.handle, first, last, segments = self.segments.len(), "spliced range");
        Ok(())
    }

    fn node_span(&self, kind: &NodeKind, is_last: bool) -> (usize, usize) {
        let height = match kind {
            NodeKind::Item(_) => self.metrics.content_rows(),
            NodeKind::Filler { height } => *height,
        };
        let gap = if is_last { 0 } else { self.metrics.gap_height };
        (height, height + gap)
    }

    /// Height of the list in rows.
    pub fn height(&self) -> usize {
        let count = self.container.len();
        self.container
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| self.node_span(&node.kind, i + 1 == count).1)
            .sum()
    }

    /// Rows `start..end` of the list, relative to its top.
    ///
    /// Items are padded or cut to the content height from the metrics so
    /// every row lines up with the item index arithmetic.
    pub fn rows(&self, start: usize, end: usize) -> Vec<Row<'_>> {
        let mut rows = Vec::new();
        let count = self.container.len();
        let mut top = 0;
        for (i, node) in self.container.nodes().iter().enumerate() {
            if top >= end {
                break;
            }
            let (height, span) = self.node_span(&node.kind, i + 1 == count);
            if top + span <= start {
                top += span;
                continue;
            }
            let from = start.saturating_sub(top);
            let to = span.min(end - top);
            for r in from..to {
                rows.push(if r >= height {
                    Row::Gap
                } else {
                    match &node.kind {
                        NodeKind::Item(text) => Row::Item(text.lines().nth(r).unwrap_or("")),
                        NodeKind::Filler { .. } => Row::Filler,
                    }
                });
            }
            top += span;
        }
        rows
    }

    /// Verifies the partition, that the container's nodes follow the
    /// segments in order, and that every filler matches its segment.
    ///
    /// A shown segment owns exactly `len()` consecutive items ending at its
    /// anchor; an unshown segment owns exactly its filler.
    pub fn check(&self) -> Result<(), Error> {
        self.segments.check_partition(self.total)?;
        self.check_nodes()?;
        for (_, segment) in self.segments.iter().filter(|(_, s)| !s.shown) {
            let expected = self.metrics.filler_height(segment.len());
            let actual = segment
                .anchor
                .and_then(|filler| self.container.filler_height(filler))
                .unwrap_or(0);
            if actual != expected {
                return Err(Error::FillerHeight {
                    first: segment.first,
                    last: segment.last,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl DemandList {
    fn check_nodes(&self) -> Result<(), Error> {
        let nodes = self.container.nodes();
        let broken = |position, reason| Error::NodeOrder { position, reason };
        let mut position = 0;
        for (_, segment) in self.segments.iter() {
            if segment.shown {
                let end = position + segment.len();
                let run = nodes
                    .get(position..end)
                    .filter(|run| run.iter().all(|node| !node.is_filler()))
                    .ok_or(broken(position, "shown segment is missing items"))?;
                if run.last().map(Node::id) != segment.anchor {
                    return Err(broken(end - 1, "shown segment does not end at its anchor"));
                }
                position = end;
            } else {
                match nodes.get(position) {
                    Some(node) if node.is_filler() && Some(node.id()) == segment.anchor => {
                        position += 1;
                    }
                    _ => return Err(broken(position, "unshown segment is not backed by its filler")),
                }
            }
        }
        if position != nodes.len() {
            return Err(broken(position, "nodes left over after the last segment"));
        }
        Ok(())
    }
}

impl fmt::Debug for DemandList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemandList")
            .field("handle", &self.handle)
            .field("total", &self.total)
            .field("fetch_url", &self.fetch_url)
            .field("metrics", &self.metrics)
            .field("segments", &self.segments)
            .field("container", &self.container)
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}
