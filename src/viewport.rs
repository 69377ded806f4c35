//! Scroll state for the page that holds the lists.
//!
//! The viewport does not own content. It tracks how big the visible window is
//! and where it sits, and the caller passes in the current page height
//! whenever a scroll needs clamping. That keeps it usable while lists grow
//! and shrink underneath it.
//!
//! ```rust
//! use bubbletea_dllist::viewport::Model;
//!
//! let mut viewport = Model::new(80, 10);
//! viewport.scroll_down(5, 100);
//! assert_eq!(viewport.visible_rows(), (5, 15));
//! viewport.goto_bottom(100);
//! assert!(viewport.at_bottom(100));
//! ```

use crate::key::{self, KeyMap as KeyMapTrait};
use bubbletea_rs::KeyMsg;
use crossterm::event::KeyCode;
use lipgloss_extras::lipgloss::width as lg_width;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const SPACEBAR: char = ' ';

/// Key bindings for scrolling the page.
#[derive(Debug, Clone)]
pub struct ViewportKeyMap {
    /// Scroll down one page. Default keys: Page Down, Space, `f`.
    pub page_down: key::Binding,
    /// Scroll up one page. Default keys: Page Up, `b`.
    pub page_up: key::Binding,
    /// Scroll up half a page. Default keys: `u`, Ctrl+U.
    pub half_page_up: key::Binding,
    /// Scroll down half a page. Default keys: `d`, Ctrl+D.
    pub half_page_down: key::Binding,
    /// Scroll down one row. Default keys: Down, `j`.
    pub down: key::Binding,
    /// Scroll up one row. Default keys: Up, `k`.
    pub up: key::Binding,
    /// Jump to the top. Default keys: Home, `g`.
    pub top: key::Binding,
    /// Jump to the bottom. Default keys: End, `G`.
    pub bottom: key::Binding,
}

impl Default for ViewportKeyMap {
    fn default() -> Self {
        Self {
            page_down: key::Binding::new(vec![
                KeyCode::PageDown,
                KeyCode::Char(SPACEBAR),
                KeyCode::Char('f'),
            ])
            .with_help("f/pgdn", "page down"),
            page_up: key::Binding::new(vec![KeyCode::PageUp, KeyCode::Char('b')])
                .with_help("b/pgup", "page up"),
            half_page_up: key::Binding::new(vec!["u", "ctrl+u"]).with_help("u/ctrl+u", "½ page up"),
            half_page_down: key::Binding::new(vec!["d", "ctrl+d"])
                .with_help("d/ctrl+d", "½ page down"),
            up: key::Binding::new(vec![KeyCode::Up, KeyCode::Char('k')]).with_help("↑/k", "up"),
            down: key::Binding::new(vec![KeyCode::Down, KeyCode::Char('j')])
                .with_help("↓/j", "down"),
            top: key::Binding::new(vec![KeyCode::Home, KeyCode::Char('g')])
                .with_help("g/home", "go to top"),
            bottom: key::Binding::new(vec![KeyCode::End, KeyCode::Char('G')])
                .with_help("G/end", "go to bottom"),
        }
    }
}

impl KeyMapTrait for ViewportKeyMap {
    fn short_help(&self) -> Vec<&key::Binding> {
        vec![&self.up, &self.down, &self.page_up, &self.page_down]
    }

    fn full_help(&self) -> Vec<Vec<&key::Binding>> {
        vec![
            vec![&self.up, &self.down],
            vec![&self.page_up, &self.page_down],
            vec![&self.half_page_up, &self.half_page_down],
            vec![&self.top, &self.bottom],
        ]
    }
}

/// Position and size of the visible window over the page.
#[derive(Debug, Clone)]
pub struct Model {
    /// Width in columns.
    pub width: usize,
    /// Height in rows.
    pub height: usize,
    /// First visible page row.
    pub y_offset: usize,
    /// Scrolling key bindings.
    pub keymap: ViewportKeyMap,
}

impl Model {
    /// Creates a viewport at the top of the page.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            y_offset: 0,
            keymap: ViewportKeyMap::default(),
        }
    }

    /// Page rows covered by the viewport, as `(top, bottom)` with `bottom`
    /// exclusive.
    pub fn visible_rows(&self) -> (usize, usize) {
        (self.y_offset, self.y_offset + self.height)
    }

    fn max_y_offset(&self, content_height: usize) -> usize {
        content_height.saturating_sub(self.height)
    }

    /// Whether the top of the page is visible.
    pub fn at_top(&self) -> bool {
        self.y_offset == 0
    }

    /// Whether the bottom of the page is visible.
    pub fn at_bottom(&self, content_height: usize) -> bool {
        self.y_offset >= self.max_y_offset(content_height)
    }

    /// Moves to row `n`, clamped so the viewport stays on the page.
    pub fn set_y_offset(&mut self, n: usize, content_height: usize) {
        self.y_offset = n.min(self.max_y_offset(content_height));
    }

    /// Re-clamps the offset after the page or viewport changed size.
    pub fn clamp(&mut self, content_height: usize) {
        self.set_y_offset(self.y_offset, content_height);
    }

    /// Scrolls down `n` rows.
    pub fn scroll_down(&mut self, n: usize, content_height: usize) {
        self.set_y_offset(self.y_offset.saturating_add(n), content_height);
    }

    /// Scrolls up `n` rows.
    pub fn scroll_up(&mut self, n: usize) {
        self.y_offset = self.y_offset.saturating_sub(n);
    }

    /// Scrolls down one viewport height.
    pub fn page_down(&mut self, content_height: usize) {
        self.scroll_down(self.height, content_height);
    }

    /// Scrolls up one viewport height.
    pub fn page_up(&mut self) {
        self.scroll_up(self.height);
    }

    /// Scrolls down half a viewport height.
    pub fn half_page_down(&mut self, content_height: usize) {
        self.scroll_down(self.height.div_ceil(2), content_height);
    }

    /// Scrolls up half a viewport height.
    pub fn half_page_up(&mut self) {
        self.scroll_up(self.height.div_ceil(2));
    }

    /// Jumps to the top of the page.
    pub fn goto_top(&mut self) {
        self.y_offset = 0;
    }

    /// Jumps to the bottom of the page.
    pub fn goto_bottom(&mut self, content_height: usize) {
        self.y_offset = self.max_y_offset(content_height);
    }

    /// Applies a scrolling key. Returns `true` when the key was bound, even if
    /// the viewport was already at the edge.
    pub fn handle_key(&mut self, msg: &KeyMsg, content_height: usize) -> bool {
        if self.keymap.page_down.matches(msg) {
            self.page_down(content_height);
        } else if self.keymap.page_up.matches(msg) {
            self.page_up();
        } else if self.keymap.half_page_down.matches(msg) {
            self.half_page_down(content_height);
        } else if self.keymap.half_page_up.matches(msg) {
            self.half_page_up();
        } else if self.keymap.down.matches(msg) {
            self.scroll_down(1, content_height);
        } else if self.keymap.up.matches(msg) {
            self.scroll_up(1);
        } else if self.keymap.top.matches(msg) {
            self.goto_top();
        } else if self.keymap.bottom.matches(msg) {
            self.goto_bottom(content_height);
        } else {
            return false;
        }
        true
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Cuts `line` to at most `width` display columns.
///
/// Lines that already fit are returned unchanged, escape sequences included.
/// Longer lines lose their styling and are cut on grapheme boundaries.
pub fn truncate(line: &str, width: usize) -> String {
    if lg_width(line) <= width {
        return line.to_string();
    }
    let plain = strip_ansi_escapes::strip_str(line);
    let mut out = String::new();
    let mut used = 0;
    for grapheme in plain.graphemes(true) {
        let w = grapheme.width();
        if used + w > width {
            break;
        }
        used += w;
        out.push_str(grapheme);
    }
    out
}

/// Creates a viewport. Equivalent to [`Model::new`].
pub fn new(width: usize, height: usize) -> Model {
    Model::new(width, height)
}
