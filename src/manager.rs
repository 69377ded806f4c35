//! The demand-loading list manager.
//!
//! A [`Manager`] owns every list on a page, the viewport scrolling over them
//! and the single fetch slot they share. Each scroll, resize or completed
//! fetch runs the scheduler: it finds the first list with an unrendered range
//! in view and returns a command fetching that range. When the command's
//! [`FetchedMsg`] comes back the items are spliced in and the scheduler runs
//! again, so one scroll keeps fetching until everything in view is rendered.
//!
//! ```rust
//! use bubbletea_dllist::fetch::{FetchRequest, FnFetcher};
//! use bubbletea_dllist::list::Registration;
//! use bubbletea_dllist::manager::Manager;
//!
//! let fetcher = FnFetcher::new(|request: &FetchRequest| {
//!     Ok((request.first..=request.last)
//!         .map(|i| format!("result {i}"))
//!         .collect::<Vec<_>>()
//!         .join("\n\n"))
//! });
//! let mut manager = Manager::new(fetcher).with_size(80, 10);
//! let first_page = (0..20).map(|i| format!("result {i}")).collect();
//! let (_handle, _) = manager.register(
//!     Registration::new("results", 1_000, "/search?q=rust").with_items(first_page),
//! );
//!
//! // Everything in view is already rendered, so nothing is fetched yet.
//! assert!(manager.start().is_none());
//! ```

use crate::debug::{ConsistencyChecks, Mismatch};
use crate::error::Error;
use crate::fetch::{decode_fragments, FetchError, FetchRequest, HttpFetcher, RangeFetcher};
use crate::geometry::item_at;
use crate::list::{DemandList, Registration, Row};
use crate::options::{FailurePolicy, Options};
use crate::registry::{ListHandle, Registry};
use crate::segment::SegmentId;
use crate::viewport;
use bubbletea_rs::{Cmd, KeyMsg, Model as BubbleTeaModel, Msg, WindowSizeMsg};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

static LAST_ID: AtomicI64 = AtomicI64::new(0);

fn next_id() -> i64 {
    LAST_ID.fetch_add(1, Ordering::SeqCst) + 1
}

/// Sent when a range fetch succeeds.
#[derive(Debug, Clone)]
pub struct FetchedMsg {
    /// The manager that issued the fetch.
    pub manager: i64,
    /// The list the range belongs to.
    pub list: ListHandle,
    /// First item requested.
    pub first: usize,
    /// Last item requested.
    pub last: usize,
    /// Rendered items, in order.
    pub items: Vec<String>,
}

/// Sent when a range fetch fails.
#[derive(Debug)]
pub struct FetchFailedMsg {
    /// The manager that issued the fetch.
    pub manager: i64,
    /// The list the range belongs to.
    pub list: ListHandle,
    /// First item requested.
    pub first: usize,
    /// Last item requested.
    pub last: usize,
    /// Why it failed.
    pub error: FetchError,
}

/// Sent when a reference fetch for consistency checking completes.
#[derive(Debug)]
pub struct ReferenceMsg {
    /// The manager that issued the fetch.
    pub manager: i64,
    /// The list the reference describes.
    pub list: ListHandle,
    /// Every item of the list, or why they could not be fetched.
    pub result: Result<Vec<String>, FetchError>,
}

/// The fetch currently occupying the manager's single slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    /// The list being filled.
    pub list: ListHandle,
    /// The unshown segment the range comes from.
    pub segment: SegmentId,
    /// The request that was issued.
    pub request: FetchRequest,
}

impl PendingFetch {
    fn answers(&self, list: ListHandle, first: usize, last: usize) -> bool {
        self.list == list && self.request.first == first && self.request.last == last
    }
}

/// Result of one scheduler pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A fetch was already in flight; nothing was considered.
    Busy,
    /// Everything in view is rendered.
    Idle,
    /// A fetch was issued.
    Issued(FetchRequest),
}

/// Observer run after every scheduler pass with the live registry.
pub type UpdateHook = Box<dyn FnMut(&Registry, &UpdateOutcome) + Send>;

/// Owns the lists on a page and drives their loading.
pub struct Manager {
    id: i64,
    options: Options,
    /// The window over the page.
    pub viewport: viewport::Model,
    registry: Registry,
    fetcher: Arc<dyn RangeFetcher>,
    in_flight: Option<PendingFetch>,
    started: bool,
    hook: Option<UpdateHook>,
    checks: Option<ConsistencyChecks>,
}

impl Manager {
    /// Creates a manager that fetches ranges with `fetcher`.
    pub fn new<F: RangeFetcher + 'static>(fetcher: F) -> Self {
        Self {
            id: next_id(),
            options: Options::default(),
            viewport: viewport::Model::default(),
            registry: Registry::new(),
            fetcher: Arc::new(fetcher),
            in_flight: None,
            started: false,
            hook: None,
            checks: None,
        }
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Sets the viewport size.
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.viewport.width = width;
        self.viewport.height = height;
        self
    }

    /// Identifier carried by this manager's messages.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// The active options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The live list registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Looks up a list.
    pub fn list(&self, handle: ListHandle) -> Option<&DemandList> {
        self.registry.get(handle)
    }

    /// The fetch in flight, if any.
    pub fn in_flight(&self) -> Option<&PendingFetch> {
        self.in_flight.as_ref()
    }

    /// Whether [`start`](Self::start) has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Total rows of all lists on the page.
    pub fn page_height(&self) -> usize {
        self.registry.page_height(self.options.list_spacing)
    }

    /// Registers a list.
    ///
    /// Lists registered before [`start`](Self::start) are set up when the
    /// manager starts. Once started, the list is set up immediately and the
    /// scheduler runs, which may return a fetch command.
    pub fn register(&mut self, registration: Registration) -> (ListHandle, Option<Cmd>) {
        let handle = self.registry.insert(registration);
        debug!(list = %handle, "registered list");
        if !self.started {
            return (handle, self.reference_cmd());
        }
        if let Some(list) = self.registry.get_mut(handle) {
            list.setup(self.options.measure());
        }
        let cmd = self.update_lists().or_else(|| self.reference_cmd());
        (handle, cmd)
    }

    /// Removes a list. Later passes skip it; a fetch in flight for it is
    /// discarded when it completes.
    pub fn remove(&mut self, handle: ListHandle) -> bool {
        let removed = self.registry.remove(handle).is_some();
        if removed {
            debug!(list = %handle, "removed list");
            self.viewport.clamp(self.page_height());
        }
        removed
    }

    /// Sets up every registered list from its pre-rendered items and runs the
    /// scheduler. Calling it again only runs the scheduler.
    pub fn start(&mut self) -> Option<Cmd> {
        if !self.started {
            let measure = self.options.measure();
            for list in self.registry.iter_mut() {
                list.setup(measure);
            }
            self.started = true;
        }
        self.update_lists()
    }

    /// Scrolls the page to `row` and runs the scheduler.
    pub fn scroll_to(&mut self, row: usize) -> Option<Cmd> {
        let page = self.page_height();
        self.viewport.set_y_offset(row, page);
        self.update_lists()
    }

    /// Resizes the viewport and runs the scheduler.
    pub fn set_size(&mut self, width: usize, height: usize) -> Option<Cmd> {
        self.viewport.width = width;
        self.viewport.height = height;
        self.viewport.clamp(self.page_height());
        self.update_lists()
    }

    /// Installs an observer run after every scheduler pass, returning the
    /// one it replaces.
    pub fn set_up_debugging(&mut self, hook: UpdateHook) -> Option<UpdateHook> {
        self.hook.replace(hook)
    }

    /// Turns on content checking.
    ///
    /// The manager fetches every list in full, one list at a time, through
    /// its fetcher with the debug flag set. Once a list's reference is in,
    /// its rendered items are compared with it after every scheduler pass and
    /// each new mismatch is logged at error level with its code and the
    /// list's fetch URL. Returns the first reference fetch.
    pub fn enable_consistency_checks(&mut self) -> Option<Cmd> {
        if self.checks.is_none() {
            debug!(manager = self.id, "consistency checks enabled");
            self.checks = Some(ConsistencyChecks::default());
        }
        self.reference_cmd()
    }

    /// The current mismatch between a list and its reference, if checks are
    /// enabled and the list differs.
    pub fn consistency_mismatch(&self, handle: ListHandle) -> Option<Mismatch> {
        self.checks.as_ref()?.mismatch(handle)
    }

    /// Runs the scheduler: issues at most one fetch for the first unrendered
    /// range in view.
    pub fn update_lists(&mut self) -> Option<Cmd> {
        let outcome = self.schedule();
        let cmd = match (&outcome, &self.in_flight) {
            (UpdateOutcome::Issued(request), Some(pending)) => {
                Some(self.fetch_cmd(pending.list, request.clone()))
            }
            _ => None,
        };
        if let Some(hook) = self.hook.as_mut() {
            hook(&self.registry, &outcome);
        }
        if let Some(checks) = self.checks.as_mut() {
            checks.run(&self.registry);
        }
        cmd
    }

    fn schedule(&mut self) -> UpdateOutcome {
        if let Some(pending) = &self.in_flight {
            trace!(list = %pending.list, request = %pending.request, "fetch in flight, skipping pass");
            return UpdateOutcome::Busy;
        }

        let (top, bottom) = self.viewport.visible_rows();
        let nudge = self.options.nudge as i64;
        let min_span = self.options.min_span;
        let registry = &self.registry;
        let plan = registry
            .layout(self.options.list_spacing)
            .into_iter()
            .find_map(|placement| {
                let list = registry.get(placement.handle)?;
                if !list.is_ready() || list.total() == 0 {
                    return None;
                }
                let container_top = placement.top as i64;
                let first = item_at(top as i64, container_top, list.metrics(), list.total(), -nudge);
                let last = item_at(bottom as i64, container_top, list.metrics(), list.total(), nudge);
                list.plan_fetch(first, last, min_span)
                    .map(|(segment, request)| PendingFetch {
                        list: placement.handle,
                        segment,
                        request,
                    })
            });

        match plan {
            Some(pending) => {
                debug!(list = %pending.list, request = %pending.request, "fetching range");
                let request = pending.request.clone();
                self.in_flight = Some(pending);
                UpdateOutcome::Issued(request)
            }
            None => UpdateOutcome::Idle,
        }
    }

    fn fetch_cmd(&self, list: ListHandle, request: FetchRequest) -> Cmd {
        let fetcher = Arc::clone(&self.fetcher);
        let manager = self.id;
        Box::pin(async move {
            let (first, last) = (request.first, request.last);
            let msg: Msg = match fetcher.fetch(request).await {
                Ok(body) => Box::new(FetchedMsg {
                    manager,
                    list,
                    first,
                    last,
                    items: decode_fragments(&body),
                }),
                Err(error) => Box::new(FetchFailedMsg {
                    manager,
                    list,
                    first,
                    last,
                    error,
                }),
            };
            Some(msg)
        })
    }

    fn reference_cmd(&mut self) -> Option<Cmd> {
        let (list, request) = self.checks.as_mut()?.next_request(&self.registry)?;
        debug!(list = %list, request = %request, "fetching reference");
        let fetcher = Arc::clone(&self.fetcher);
        let manager = self.id;
        let cmd: Cmd = Box::pin(async move {
            let result = fetcher
                .fetch(request)
                .await
                .map(|body| decode_fragments(&body));
            let msg: Msg = Box::new(ReferenceMsg {
                manager,
                list,
                result,
            });
            Some(msg)
        });
        Some(cmd)
    }

    fn handle_reference(&mut self, msg: ReferenceMsg) -> Option<Cmd> {
        let checks = self.checks.as_mut()?;
        match msg.result {
            Ok(items) => {
                debug!(list = %msg.list, items = items.len(), "reference loaded");
                checks.store(msg.list, items);
                checks.run(&self.registry);
            }
            Err(error) => {
                warn!(list = %msg.list, error = %error, "reference fetch failed, list will not be checked");
                checks.give_up(msg.list);
            }
        }
        self.reference_cmd()
    }

    fn handle_fetched(&mut self, msg: FetchedMsg) -> Option<Cmd> {
        let answers = self
            .in_flight
            .as_ref()
            .is_some_and(|pending| pending.answers(msg.list, msg.first, msg.last));
        if !answers {
            trace!(list = %msg.list, first = msg.first, last = msg.last, "ignoring unexpected range");
            return None;
        }
        let pending = self.in_flight.take()?;

        match self.registry.get_mut(pending.list) {
            Some(list) => {
                if let Err(err) = list.splice(pending.segment, msg.first, msg.last, msg.items) {
                    warn!(list = %pending.list, error = %err, "could not splice fetched range");
                }
            }
            None => debug!(list = %pending.list, "list removed while its fetch was in flight"),
        }

        self.update_lists().or_else(|| self.reference_cmd())
    }

    fn handle_failed(&mut self, msg: &FetchFailedMsg) -> Option<Cmd> {
        let answers = self
            .in_flight
            .as_ref()
            .is_some_and(|pending| pending.answers(msg.list, msg.first, msg.last));
        if !answers {
            return None;
        }
        warn!(
            list = %msg.list,
            first = msg.first,
            last = msg.last,
            error = %msg.error,
            policy = ?self.options.failure_policy,
            "range fetch failed"
        );
        if self.options.failure_policy == FailurePolicy::Release {
            self.in_flight = None;
        }
        None
    }

    /// Checks every live list's partition and filler heights.
    pub fn check_invariants(&self) -> Result<(), Error> {
        self.registry.iter().try_for_each(DemandList::check)
    }

    /// Compares a list's rendered items with a full `reference` fetch of it.
    ///
    /// Returns the number of items checked.
    pub fn verify(&self, handle: ListHandle, reference: &[String]) -> Result<usize, Error> {
        let list = self.registry.get(handle).ok_or(Error::UnknownList(handle))?;
        crate::debug::check_rendered(list.container(), reference).map_err(|mismatch| {
            Error::Mismatch {
                container: list.container().id().to_string(),
                mismatch,
            }
        })
    }

    fn paint(&self, row: Row<'_>) -> String {
        let width = self.viewport.width;
        match row {
            Row::Item(text) => viewport::truncate(text, width),
            Row::Filler => {
                let glyph_width = lipgloss_extras::lipgloss::width(&self.options.filler_glyph).max(1);
                let fill = self.options.filler_glyph.repeat(width / glyph_width);
                self.options.filler_style.render(&fill)
            }
            Row::Gap => String::new(),
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(HttpFetcher::new())
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("viewport", &self.viewport)
            .field("registry", &self.registry)
            .field("in_flight", &self.in_flight)
            .field("started", &self.started)
            .field("hook", &self.hook.is_some())
            .field("checks", &self.checks)
            .finish_non_exhaustive()
    }
}

impl BubbleTeaModel for Manager {
    fn init() -> (Self, Option<Cmd>) {
        let mut manager = Self::default();
        let cmd = manager.start();
        (manager, cmd)
    }

    fn update(&mut self, msg: Msg) -> Option<Cmd> {
        let msg = match msg.downcast::<FetchedMsg>() {
            Ok(fetched) if fetched.manager == self.id => return self.handle_fetched(*fetched),
            Ok(_) => return None,
            Err(msg) => msg,
        };

        let msg = match msg.downcast::<ReferenceMsg>() {
            Ok(reference) if reference.manager == self.id => {
                return self.handle_reference(*reference)
            }
            Ok(_) => return None,
            Err(msg) => msg,
        };

        if let Some(failed) = msg.downcast_ref::<FetchFailedMsg>() {
            if failed.manager != self.id {
                return None;
            }
            return self.handle_failed(failed);
        }

        if let Some(size) = msg.downcast_ref::<WindowSizeMsg>() {
            return self.set_size(size.width as usize, size.height as usize);
        }

        if let Some(key_msg) = msg.downcast_ref::<KeyMsg>() {
            let page = self.page_height();
            if self.viewport.handle_key(key_msg, page) {
                return self.update_lists();
            }
        }

        None
    }

    fn view(&self) -> String {
        let (top, bottom) = self.viewport.visible_rows();
        let bottom = bottom.min(self.page_height());
        if bottom <= top {
            return String::new();
        }

        let mut lines = vec![String::new(); bottom - top];
        for placement in self.registry.layout(self.options.list_spacing) {
            let list_bottom = placement.top + placement.height;
            if list_bottom <= top || placement.top >= bottom {
                continue;
            }
            let Some(list) = self.registry.get(placement.handle) else {
                continue;
            };
            let start = top.saturating_sub(placement.top);
            let end = bottom.min(list_bottom) - placement.top;
            for (i, row) in list.rows(start, end).into_iter().enumerate() {
                lines[placement.top + start + i - top] = self.paint(row);
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::MismatchKind;
    use crate::fetch::FnFetcher;
    use crate::geometry::Metrics;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::Mutex;

    fn numbered() -> FnFetcher {
        FnFetcher::new(|request: &FetchRequest| {
            Ok((request.first..=request.last)
                .map(|i| format!("item {i}"))
                .collect::<Vec<_>>()
                .join("\n\n"))
        })
    }

    fn manager(height: usize) -> Manager {
        Manager::new(numbered())
            .with_options(Options::default().with_metrics(Metrics::new(1, 0)))
            .with_size(40, height)
    }

    fn ranges(manager: &Manager, handle: ListHandle) -> Vec<(bool, usize, usize)> {
        manager
            .list(handle)
            .unwrap()
            .segments()
            .iter()
            .map(|(_, s)| (s.shown, s.first, s.last))
            .collect()
    }

    async fn run(manager: &mut Manager, mut cmd: Option<Cmd>) -> usize {
        let mut fetches = 0;
        while let Some(pending) = cmd {
            fetches += 1;
            let msg = pending.await.expect("fetch command yields a message");
            cmd = manager.update(msg);
        }
        fetches
    }

    #[tokio::test]
    async fn test_scroll_into_unshown_range_issues_one_fetch() {
        let mut manager = manager(6);
        let (handle, _) = manager.register(Registration::new("results", 100, "/list?id=7"));
        manager.viewport.y_offset = 40;

        let cmd = manager.start();
        assert_eq!(
            manager.in_flight().map(|p| (p.request.first, p.request.last)),
            Some((38, 54))
        );
        assert_eq!(manager.in_flight().unwrap().request.url(), "/list?id=7&r=38,54");

        let msg = cmd.unwrap().await.unwrap();
        let fetched = msg.downcast_ref::<FetchedMsg>().unwrap();
        assert_eq!(fetched.items.len(), 17);

        let next = manager.update(msg);
        assert!(next.is_none());
        assert!(manager.in_flight().is_none());
        assert_eq!(
            ranges(&manager, handle),
            vec![(false, 0, 37), (true, 38, 54), (false, 55, 99)]
        );
        assert!(manager.check_invariants().is_ok());
    }

    #[tokio::test]
    async fn test_only_one_fetch_in_flight() {
        let mut manager = manager(5);
        manager.register(Registration::new("a", 100, "/a?"));
        let first = manager.start();
        assert!(first.is_some());
        assert!(manager.scroll_to(60).is_none());
        assert!(manager.update_lists().is_none());
        assert_eq!(manager.in_flight().unwrap().request.first, 0);
    }

    #[tokio::test]
    async fn test_fetch_chain_fills_view() {
        let mut manager = manager(40);
        let a = manager.register(Registration::new("a", 10, "/a?")).0;
        let b = manager.register(Registration::new("b", 12, "/b?")).0;
        let cmd = manager.start();
        let fetches = run(&mut manager, cmd).await;

        assert_eq!(fetches, 2);
        assert_eq!(ranges(&manager, a), vec![(true, 0, 9)]);
        assert_eq!(ranges(&manager, b), vec![(true, 0, 11)]);
        assert_eq!(manager.page_height(), 23);
        assert!(manager.check_invariants().is_ok());
    }

    #[tokio::test]
    async fn test_idle_pass_changes_nothing() {
        let mut manager = manager(5);
        let items = (0..20).map(|i| format!("item {i}")).collect();
        let (handle, _) = manager.register(Registration::new("a", 20, "/a?").with_items(items));
        assert!(manager.start().is_none());
        let before = ranges(&manager, handle);
        assert!(manager.update_lists().is_none());
        assert_eq!(ranges(&manager, handle), before);
        assert!(manager.in_flight().is_none());
    }

    #[tokio::test]
    async fn test_second_list_is_reached_by_scrolling() {
        let mut manager = manager(5);
        let first_items = (0..10).map(|i| format!("a{i}")).collect();
        let a = manager.register(Registration::new("a", 10, "/a?").with_items(first_items)).0;
        let b = manager.register(Registration::new("b", 50, "/b?")).0;

        // Indices above a list's top clamp to 0, so b's head loads early.
        let cmd = manager.start();
        assert_eq!(
            manager.in_flight().map(|p| (p.list, p.request.first, p.request.last)),
            Some((b, 0, 16))
        );
        run(&mut manager, cmd).await;
        assert_eq!(ranges(&manager, a), vec![(true, 0, 9)]);
        assert_eq!(ranges(&manager, b), vec![(true, 0, 16), (false, 17, 49)]);

        // List b starts at row 11: 10 rows of a plus one spacing row.
        let cmd = manager.scroll_to(30);
        assert_eq!(
            manager.in_flight().map(|p| (p.list, p.request.first, p.request.last)),
            Some((b, 17, 33))
        );
        run(&mut manager, cmd).await;
        assert_eq!(
            ranges(&manager, b),
            vec![(true, 0, 16), (true, 17, 33), (false, 34, 49)]
        );
    }

    #[tokio::test]
    async fn test_register_after_start_fetches_immediately() {
        let mut manager = manager(5);
        assert!(manager.start().is_none());
        let (handle, cmd) = manager.register(Registration::new("late", 30, "/late?"));
        assert!(cmd.is_some());
        run(&mut manager, cmd).await;
        assert_eq!(ranges(&manager, handle)[0], (true, 0, 16));
    }

    #[tokio::test]
    async fn test_removed_list_releases_slot() {
        let mut manager = manager(5);
        let (handle, _) = manager.register(Registration::new("a", 40, "/a?"));
        let cmd = manager.start().unwrap();
        assert!(manager.remove(handle));

        let next = manager.update(cmd.await.unwrap());
        assert!(next.is_none());
        assert!(manager.in_flight().is_none());
        assert!(manager.list(handle).is_none());
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_failure_stalls_by_default() {
        let mut manager = Manager::new(FnFetcher::new(|_: &FetchRequest| {
            Err(FetchError::Source("connection reset".into()))
        }))
        .with_options(Options::default().with_metrics(Metrics::new(1, 0)))
        .with_size(40, 5);
        manager.register(Registration::new("a", 40, "/a?"));
        let msg = manager.start().unwrap().await.unwrap();
        assert!(msg.downcast_ref::<FetchFailedMsg>().is_some());

        assert!(manager.update(msg).is_none());
        assert!(manager.in_flight().is_some());
        assert!(manager.scroll_to(20).is_none());
    }

    #[tokio::test]
    async fn test_failure_release_policy_frees_slot() {
        let mut manager = Manager::new(FnFetcher::new(|_: &FetchRequest| {
            Err(FetchError::Source("timeout".into()))
        }))
        .with_options(
            Options::default()
                .with_metrics(Metrics::new(1, 0))
                .with_failure_policy(FailurePolicy::Release),
        )
        .with_size(40, 5);
        manager.register(Registration::new("a", 40, "/a?"));
        let msg = manager.start().unwrap().await.unwrap();

        assert!(manager.update(msg).is_none());
        assert!(manager.in_flight().is_none());
        assert!(manager.scroll_to(20).is_some());
    }

    #[tokio::test]
    async fn test_messages_for_other_managers_are_ignored() {
        let mut one = manager(5);
        let mut two = manager(5);
        one.register(Registration::new("a", 40, "/a?"));
        two.register(Registration::new("a", 40, "/a?"));
        let msg = one.start().unwrap().await.unwrap();
        assert!(two.start().is_some());

        assert!(two.update(msg).is_none());
        assert!(two.in_flight().is_some());
        assert!(one.in_flight().is_some());
    }

    #[test]
    fn test_debug_hook_sees_every_pass() {
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&outcomes);
        let mut manager = manager(5);
        manager.register(Registration::new("a", 40, "/a?"));
        let previous = manager.set_up_debugging(Box::new(move |registry: &Registry, outcome: &UpdateOutcome| {
            assert_eq!(registry.len(), 1);
            record.lock().unwrap().push(outcome.clone());
        }));
        assert!(previous.is_none());

        let _cmd = manager.start();
        let _ = manager.update_lists();
        let outcomes = outcomes.lock().unwrap();
        assert_eq!(
            *outcomes,
            vec![
                UpdateOutcome::Issued(FetchRequest::new("/a?", 0, 16)),
                UpdateOutcome::Busy
            ]
        );
        assert!(manager.set_up_debugging(Box::new(|_: &Registry, _: &UpdateOutcome| {})).is_some());
    }

    #[tokio::test]
    async fn test_keys_and_resize_trigger_updates() {
        let mut manager = manager(5);
        manager.register(Registration::new("a", 100, "/a?"));
        let cmd = manager.start();
        run(&mut manager, cmd).await;

        for _ in 0..4 {
            let cmd = manager.update(Box::new(KeyMsg {
                key: KeyCode::PageDown,
                modifiers: KeyModifiers::NONE,
            }));
            run(&mut manager, cmd).await;
        }
        assert_eq!(manager.viewport.y_offset, 20);

        let cmd = manager.update(Box::new(WindowSizeMsg {
            width: 40,
            height: 60,
        }));
        run(&mut manager, cmd).await;
        let list = manager.registry().iter().next().unwrap();
        assert!(list.segments().iter().take_while(|(_, s)| s.shown).last().unwrap().1.last >= 81);
        assert!(manager.check_invariants().is_ok());
    }

    #[test]
    fn test_view_renders_items_fillers_and_spacing() {
        let mut manager = Manager::new(numbered())
            .with_options(
                Options::default()
                    .with_metrics(Metrics::new(1, 0))
                    .with_filler_glyph("~")
                    .with_filler_style(lipgloss_extras::prelude::Style::new()),
            )
            .with_size(6, 6);
        let items = vec!["first item".to_string(), "second".to_string()];
        manager.register(Registration::new("a", 4, "/a?").with_items(items));
        manager.register(Registration::new("b", 1, "/b?").with_items(vec!["b0".into()]));
        manager.started = true;
        for list in manager.registry.iter_mut() {
            list.setup(&Metrics::new(1, 0));
        }

        let view = manager.view();
        let lines: Vec<_> = view.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "first ");
        assert_eq!(lines[1], "second");
        assert!(lines[2].contains("~~~~~~"));
        assert!(lines[3].contains("~~~~~~"));
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "b0");
    }

    fn corrupting(bad: usize, seen: Arc<Mutex<Vec<String>>>) -> FnFetcher {
        FnFetcher::new(move |request: &FetchRequest| {
            seen.lock().unwrap().push(request.url());
            Ok((request.first..=request.last)
                .map(|i| {
                    if i == bad && !request.for_debug {
                        format!("stale {i}")
                    } else {
                        format!("item {i}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n\n"))
        })
    }

    #[tokio::test]
    async fn test_consistency_checks_report_corrupted_range() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut manager = Manager::new(corrupting(5, Arc::clone(&seen)))
            .with_options(Options::default().with_metrics(Metrics::new(1, 0)))
            .with_size(40, 5);
        let (handle, _) = manager.register(Registration::new("a", 30, "/a?"));

        let cmd = manager.enable_consistency_checks();
        assert_eq!(run(&mut manager, cmd).await, 1);
        assert!(manager.consistency_mismatch(handle).is_none());

        let cmd = manager.start();
        run(&mut manager, cmd).await;
        let mismatch = manager.consistency_mismatch(handle).unwrap();
        assert_eq!(
            mismatch,
            Mismatch {
                kind: MismatchKind::ResultsDoNotMatch,
                index: 5,
                reference_count: 30,
            }
        );
        assert_eq!(mismatch.code(), "RESULTS_DO_NOT_MATCH_5_30");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["/a?&r=0,29&FOR_DEBUG=yes".to_string(), "/a?&r=0,16".to_string()]
        );
    }

    #[tokio::test]
    async fn test_consistency_checks_cover_late_lists() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut manager = Manager::new(corrupting(usize::MAX, Arc::clone(&seen)))
            .with_options(Options::default().with_metrics(Metrics::new(1, 0)))
            .with_size(40, 5);
        let a = manager.register(Registration::new("a", 20, "/a?")).0;
        let cmd = manager.enable_consistency_checks();
        run(&mut manager, cmd).await;
        let cmd = manager.start();
        run(&mut manager, cmd).await;

        let (b, cmd) = manager.register(Registration::new("b", 8, "/b?"));
        run(&mut manager, cmd).await;

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&"/a?&r=0,19&FOR_DEBUG=yes".to_string()));
        assert!(seen.contains(&"/b?&r=0,7&FOR_DEBUG=yes".to_string()));
        assert!(manager.consistency_mismatch(a).is_none());
        assert!(manager.consistency_mismatch(b).is_none());
        assert!(manager.check_invariants().is_ok());
    }

    #[tokio::test]
    async fn test_empty_fetch_is_caught_by_invariants() {
        let mut manager = Manager::new(FnFetcher::new(|_: &FetchRequest| Ok(String::new())))
            .with_options(Options::default().with_metrics(Metrics::new(1, 0)))
            .with_size(40, 5);
        let (handle, _) = manager.register(Registration::new("a", 10, "/a?"));
        let cmd = manager.start();
        assert_eq!(run(&mut manager, cmd).await, 1);

        assert_eq!(ranges(&manager, handle), vec![(true, 0, 9)]);
        assert!(matches!(
            manager.check_invariants(),
            Err(Error::NodeOrder { position: 0, .. })
        ));
    }

    #[test]
    fn test_verify_reports_unknown_list() {
        let mut manager = manager(5);
        let (handle, _) = manager.register(Registration::new("a", 3, "/a?"));
        manager.remove(handle);
        assert!(matches!(
            manager.verify(handle, &[]),
            Err(Error::UnknownList(h)) if h == handle
        ));
    }
}
