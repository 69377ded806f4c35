//! Manager configuration.
//!
//! Options are built with `with_*` methods starting from the defaults:
//!
//! ```rust
//! use bubbletea_dllist::options::{FailurePolicy, Options};
//! use bubbletea_dllist::geometry::Metrics;
//!
//! let options = Options::default()
//!     .with_min_span(32)
//!     .with_metrics(Metrics::new(2, 1))
//!     .with_failure_policy(FailurePolicy::Release);
//! assert_eq!(options.min_span, 32);
//! ```

use crate::geometry::{LineMeasure, Measure, Metrics, BOTTOM_NUDGE};
use lipgloss_extras::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Smallest `last - first` worth requesting in one fetch.
pub const DEFAULT_MIN_SPAN: usize = 16;

/// Items fetched beyond each edge of the viewport.
pub const DEFAULT_NUDGE: usize = BOTTOM_NUDGE as usize;

/// What happens to the in-flight fetch slot when a fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep the slot taken. No further fetches are issued by this manager.
    #[default]
    Stall,
    /// Free the slot without retrying; the next scroll or resize may issue a
    /// new fetch.
    Release,
}

/// Configuration for a [`Manager`](crate::manager::Manager).
#[derive(Clone)]
pub struct Options {
    /// Fetches are widened until `last - first` reaches this, within the
    /// segment being filled.
    pub min_span: usize,
    /// Items added beyond each viewport edge when deciding what is visible.
    pub nudge: usize,
    /// Handling of failed fetches.
    pub failure_policy: FailurePolicy,
    /// Blank rows between consecutive lists on the page.
    pub list_spacing: usize,
    /// Text repeated across a filler row.
    pub filler_glyph: String,
    /// Style applied to filler rows.
    pub filler_style: Style,
    measure: Arc<dyn Measure>,
}

impl Options {
    /// Sets [`min_span`](Self::min_span).
    pub fn with_min_span(mut self, min_span: usize) -> Self {
        self.min_span = min_span;
        self
    }

    /// Sets [`nudge`](Self::nudge).
    pub fn with_nudge(mut self, nudge: usize) -> Self {
        self.nudge = nudge;
        self
    }

    /// Sets [`failure_policy`](Self::failure_policy).
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Sets [`list_spacing`](Self::list_spacing).
    pub fn with_list_spacing(mut self, spacing: usize) -> Self {
        self.list_spacing = spacing;
        self
    }

    /// Sets the filler glyph.
    pub fn with_filler_glyph(mut self, glyph: impl Into<String>) -> Self {
        self.filler_glyph = glyph.into();
        self
    }

    /// Sets the filler style.
    pub fn with_filler_style(mut self, style: Style) -> Self {
        self.filler_style = style;
        self
    }

    /// Measures item geometry with `measure` when lists are set up.
    pub fn with_measure<M: Measure + 'static>(mut self, measure: M) -> Self {
        self.measure = Arc::new(measure);
        self
    }

    /// Uses fixed metrics instead of measuring rendered items.
    pub fn with_metrics(self, metrics: Metrics) -> Self {
        self.with_measure(metrics)
    }

    /// The measurement used when lists are set up.
    pub fn measure(&self) -> &dyn Measure {
        self.measure.as_ref()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            min_span: DEFAULT_MIN_SPAN,
            nudge: DEFAULT_NUDGE,
            failure_policy: FailurePolicy::default(),
            list_spacing: 1,
            filler_glyph: "·".to_string(),
            filler_style: Style::new().foreground(Color::from("240")),
            measure: Arc::new(LineMeasure::default()),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("min_span", &self.min_span)
            .field("nudge", &self.nudge)
            .field("failure_policy", &self.failure_policy)
            .field("list_spacing", &self.list_spacing)
            .field("filler_glyph", &self.filler_glyph)
            .finish_non_exhaustive()
    }
}
