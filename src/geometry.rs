//! Row geometry for demand-loaded lists.
//!
//! Every item in a list is assumed to occupy the same number of rows. Given
//! that uniform [`Metrics`], a row offset on the page can be converted into an
//! item index with [`item_at`], and the size of a filler placeholder standing
//! in for `n` unrendered items is [`Metrics::filler_height`].

/// Row nudge applied to the top edge of the viewport when choosing what to
/// fetch.
pub const TOP_NUDGE: i64 = -2;

/// Row nudge applied to the bottom edge of the viewport.
pub const BOTTOM_NUDGE: i64 = 2;

/// Uniform item geometry, in terminal rows.
///
/// `item_height` is the distance from the top of one item to the top of the
/// next; `gap_height` is the blank space between two items, so each item's own
/// content is `item_height - gap_height` rows tall.
///
/// # Examples
///
/// ```rust
/// use bubbletea_dllist::geometry::Metrics;
///
/// let metrics = Metrics::new(3, 1);
/// assert_eq!(metrics.content_rows(), 2);
/// assert_eq!(metrics.filler_height(45), 134);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    /// Rows from the top of one item to the top of the next.
    pub item_height: usize,
    /// Blank rows separating consecutive items.
    pub gap_height: usize,
}

impl Metrics {
    /// Creates metrics, keeping at least one content row per item.
    pub fn new(item_height: usize, gap_height: usize) -> Self {
        Self {
            item_height: item_height.max(gap_height + 1),
            gap_height,
        }
    }

    /// Metrics for items that render `rows` rows each with `spacing` blank
    /// rows between them.
    pub fn from_rows(rows: usize, spacing: usize) -> Self {
        Self::new(rows.max(1) + spacing, spacing)
    }

    /// Rows of actual item content.
    pub fn content_rows(&self) -> usize {
        self.item_height - self.gap_height
    }

    /// Height of a filler standing in for `len` unrendered items.
    ///
    /// The trailing gap is left out because the container inserts it after
    /// every node but the last.
    pub fn filler_height(&self, len: usize) -> usize {
        (len * self.item_height).saturating_sub(self.gap_height)
    }

    /// Height of a container holding `total` items.
    pub fn list_height(&self, total: usize) -> usize {
        self.filler_height(total)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

/// Converts a page row into an item index for a list starting at
/// `container_top`.
///
/// The division rounds up so that a partially visible item counts, then
/// `nudge` widens the range by a few items. The result is clamped to
/// `[0, total - 1]`; an empty list always yields 0.
///
/// # Examples
///
/// ```rust
/// use bubbletea_dllist::geometry::{item_at, Metrics};
///
/// let metrics = Metrics::new(2, 0);
/// assert_eq!(item_at(10, 0, &metrics, 100, 0), 5);
/// assert_eq!(item_at(11, 0, &metrics, 100, 0), 6);
/// assert_eq!(item_at(0, 20, &metrics, 100, -2), 0);
/// assert_eq!(item_at(10_000, 0, &metrics, 100, 2), 99);
/// ```
pub fn item_at(row: i64, container_top: i64, metrics: &Metrics, total: usize, nudge: i64) -> usize {
    if total == 0 {
        return 0;
    }
    let height = metrics.item_height.max(1) as i64;
    let index = (row - container_top + height - 1).div_euclid(height) + nudge;
    index.clamp(0, total as i64 - 1) as usize
}

/// Infers [`Metrics`] from rendered items.
///
/// Measurement happens once, when a list is set up from its pre-rendered
/// items. Implementations receive at most the first two items.
pub trait Measure: Send + Sync {
    /// Returns the metrics for items like `sample`.
    fn measure(&self, sample: &[String]) -> Metrics;
}

/// Measures items by counting their rendered lines.
///
/// The taller of the sampled items decides the content height; `gap` blank
/// rows are placed between items. With no sample, items are one row tall.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineMeasure {
    /// Blank rows between items.
    pub gap: usize,
}

impl LineMeasure {
    /// Creates a line measure with the given gap.
    pub fn new(gap: usize) -> Self {
        Self { gap }
    }
}

impl Measure for LineMeasure {
    fn measure(&self, sample: &[String]) -> Metrics {
        let rows = sample
            .iter()
            .take(2)
            .map(|item| item.lines().count())
            .max()
            .unwrap_or(1);
        Metrics::from_rows(rows, self.gap)
    }
}

impl Measure for Metrics {
    fn measure(&self, _sample: &[String]) -> Metrics {
        *self
    }
}
