//! Pager traversal over the portal's result grid.
//!
//! The pager shows a limited window of page buttons. When the next page is
//! outside the window, the last button renders as an expander (`...`);
//! clicking it moves the window and lands on that page, so the following
//! match must not be clicked again. [`PageTraversal`] holds that bookkeeping
//! and decides, one rendered button at a time, what the caller should do.

/// What to do with one rendered pager button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerStep {
    /// Not the page we are looking for
    Skip,
    /// Click the expander and rescan the pager
    Expand,
    /// Process a page
    Visit {
        /// Page number being entered
        page: usize,
        /// Whether the button still needs a click to get there
        click: bool,
    },
}

/// Progress through one customer's result pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTraversal {
    next_page: usize,
    expanded: bool,
    finished: bool,
}

impl Default for PageTraversal {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTraversal {
    /// Page 1 is extracted straight after the search, so traversal starts at 2.
    pub fn new() -> Self {
        Self {
            next_page: 2,
            expanded: false,
            finished: false,
        }
    }

    /// Page number the traversal is looking for.
    pub fn next_page(&self) -> usize {
        self.next_page
    }

    /// The last visited page sat in the pager's last position.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decide what to do with the button at 1-based `position` of `count`
    /// rendering `text`.
    pub fn observe(&mut self, position: usize, count: usize, text: &str) -> PagerStep {
        let text = text.trim();

        if position == count && is_expander(text) {
            self.expanded = true;
            return PagerStep::Expand;
        }

        if text.parse::<usize>().ok() == Some(self.next_page) {
            let click = !self.expanded;
            self.expanded = false;

            let page = self.next_page;
            self.next_page += 1;
            if position == count {
                self.finished = true;
            }
            return PagerStep::Visit { page, click };
        }

        PagerStep::Skip
    }
}

fn is_expander(text: &str) -> bool {
    text == "..." || text == "\u{2026}"
}
