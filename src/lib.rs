#![warn(missing_docs)]
#![doc(html_root_url = "https://docs.rs/bubbletea-dllist/")]

//! # bubbletea-dllist
//!
//! Demand-loading lists for [bubbletea-rs](https://github.com/joshka/bubbletea-rs)
//! applications.
//!
//! A demand-loading list knows how many items it has but only renders some of
//! them up front. Everything else is represented by filler rows of the right
//! height, so the page scrolls as if the whole list were there. As the
//! viewport moves over a filler, the [`Manager`] fetches the items under it
//! from the list's fetch URL and splices them in.
//!
//! ## Overview
//!
//! - **Segments** record which index ranges of a list are rendered
//!   ([`segment`]).
//! - **Containers** hold the rendered items and fillers in page order
//!   ([`container`]).
//! - **Geometry** converts page rows to item indices ([`geometry`]).
//! - **The manager** schedules one fetch at a time and splices results
//!   ([`manager`]).
//! - **Debug helpers** check lists against a full reference fetch
//!   ([`debug`]).
//!
//! ## Integration with bubbletea-rs
//!
//! [`Manager`] implements the bubbletea `Model` trait. Fetches are returned as
//! commands and their results come back through `update`:
//!
//! ```rust
//! use bubbletea_dllist::prelude::*;
//! use bubbletea_rs::{Cmd, Model, Msg};
//!
//! struct App {
//!     results: DemandListManager,
//! }
//!
//! impl Model for App {
//!     fn init() -> (Self, Option<Cmd>) {
//!         let mut results = DemandListManager::new(HttpFetcher::new());
//!         let first_page = vec!["<b>first</b>".to_string(), "second".to_string()];
//!         let _ = results.register(
//!             Registration::new("results", 500, "https://example.com/search?q=rust")
//!                 .with_items(first_page),
//!         );
//!         let cmd = results.start();
//!         (Self { results }, cmd)
//!     }
//!
//!     fn update(&mut self, msg: Msg) -> Option<Cmd> {
//!         self.results.update(msg)
//!     }
//!
//!     fn view(&self) -> String {
//!         self.results.view()
//!     }
//! }
//! ```
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! bubbletea-dllist = "0.1.0"
//! bubbletea-rs = "0.0.7"
//! ```

pub mod container;
pub mod debug;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod key;
pub mod list;
pub mod manager;
pub mod options;
pub mod registry;
pub mod segment;
pub mod viewport;

pub use container::{Container, Node, NodeId, NodeKind};
pub use debug::{check_rendered, full_range_request, invariant_hook, Mismatch, MismatchKind};
pub use error::Error;
pub use fetch::{decode_fragments, FetchError, FetchRequest, FnFetcher, HttpFetcher, RangeFetcher};
pub use geometry::{item_at, LineMeasure, Measure, Metrics};
pub use key::{Binding, Help as KeyHelp, KeyMap, KeyPress};
pub use list::{DemandList, LoadCallback, LoadedRange, Registration, Row};
pub use manager::{
    FetchFailedMsg, FetchedMsg, Manager, Manager as DemandListManager, PendingFetch, ReferenceMsg,
    UpdateHook, UpdateOutcome,
};
pub use options::{FailurePolicy, Options};
pub use registry::{ListHandle, Placement, Registry};
pub use segment::{Segment, SegmentId, SegmentList};
pub use viewport::Model as Viewport;

/// Prelude module for convenient imports.
///
/// ```rust
/// use bubbletea_dllist::prelude::*;
///
/// let options = Options::default().with_failure_policy(FailurePolicy::Release);
/// let manager = DemandListManager::new(HttpFetcher::new()).with_options(options);
/// assert!(manager.registry().is_empty());
/// ```
pub mod prelude {
    pub use crate::debug::{check_rendered, full_range_request, invariant_hook};
    pub use crate::error::Error;
    pub use crate::fetch::{FetchError, FetchRequest, FnFetcher, HttpFetcher, RangeFetcher};
    pub use crate::geometry::{LineMeasure, Measure, Metrics};
    pub use crate::key::{Binding, KeyMap};
    pub use crate::list::{LoadedRange, Registration};
    pub use crate::manager::{FetchFailedMsg, FetchedMsg, Manager as DemandListManager, ReferenceMsg};
    pub use crate::options::{FailurePolicy, Options};
    pub use crate::registry::ListHandle;
    pub use crate::viewport::Model as Viewport;
}
