//! Viewport alignment with bounded retries.
//!
//! Secondary async-rendered content (a cart panel whose height depends on a
//! separate in-flight fetch) can shift layout after the first alignment
//! pass. The reconciler re-measures after a settle delay and retries at
//! most [`MAX_RETRIES`] times, trading perfect alignment for predictable
//! termination.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// Delay between an alignment pass and the follow-up height measurement.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Height change below this threshold is treated as settled layout.
pub const HEIGHT_THRESHOLD_PX: f64 = 4.0;

/// Maximum number of retries after the initial alignment pass.
pub const MAX_RETRIES: u32 = 3;

/// Padding kept above the anchored message (log padding + breathing room).
const MESSAGE_PADDING_PX: f64 = 80.0;

/// Extra space kept visible below the log when scrolling to the tail.
const TAIL_PADDING_PX: f64 = 80.0;

/// Where to anchor the viewport after a log mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAnchor {
    /// The bottom of the log.
    Tail,
    /// The most recent message.
    LastMessage,
    /// A specific message index (e.g. the first item of a response batch).
    Message(usize),
}

/// Read/scroll access to the rendered log viewport.
///
/// Implemented by the render layer; the engine only computes offsets and
/// issues scroll requests through it.
pub trait Viewport: Send + Sync {
    /// Total scrollable content height, in pixels.
    fn content_height(&self) -> f64;
    /// Visible viewport height, in pixels.
    fn client_height(&self) -> f64;
    /// Current scroll offset from the top, in pixels.
    fn scroll_top(&self) -> f64;
    /// Number of rendered messages.
    fn message_count(&self) -> usize;
    /// Top offset of the message at `index`, if rendered.
    fn message_offset(&self, index: usize) -> Option<f64>;
    /// Scrolls the log to `offset`, animated or immediate.
    fn scroll_to(&self, offset: f64, animated: bool);
}

/// Derived scroll-position flags consumed by the render layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    /// Show the "scroll down" affordance (far from the bottom).
    pub show_scroll_down: bool,
    /// The viewport rests at (or near) the bottom of the log.
    pub at_bottom: bool,
}

/// Recomputes the scroll-position flags from the current viewport geometry.
pub fn observe(viewport: &dyn Viewport) -> ScrollState {
    let offset_from_bottom =
        viewport.content_height() - (viewport.scroll_top() + viewport.client_height());
    ScrollState {
        show_scroll_down: offset_from_bottom > 200.0,
        at_bottom: offset_from_bottom <= 50.0,
    }
}

/// Bounded-retry viewport alignment.
pub struct ScrollReconciler {
    viewport: Arc<dyn Viewport>,
}

impl ScrollReconciler {
    pub fn new(viewport: Arc<dyn Viewport>) -> Self {
        Self { viewport }
    }

    /// Aligns the viewport at `anchor`, retrying while late layout shifts
    /// keep moving the content height. Never performs more than
    /// [`MAX_RETRIES`] retries after the initial pass.
    pub async fn align(&self, anchor: ScrollAnchor, animated: bool) {
        let mut attempt = 0;
        loop {
            let height_before = self.viewport.content_height();
            self.scroll_once(anchor, animated);
            tokio::time::sleep(SETTLE_DELAY).await;

            let height_after = self.viewport.content_height();
            let settled = (height_after - height_before).abs() <= HEIGHT_THRESHOLD_PX;
            if settled || attempt >= MAX_RETRIES {
                break;
            }
            attempt += 1;
            debug!(attempt, "content height shifted, realigning viewport");
        }
    }

    /// Re-derives the scroll-position flags for the render layer.
    pub fn observe(&self) -> ScrollState {
        observe(self.viewport.as_ref())
    }

    fn scroll_once(&self, anchor: ScrollAnchor, animated: bool) {
        let offset = match anchor {
            ScrollAnchor::Tail => {
                self.viewport.content_height() - (self.viewport.client_height() - TAIL_PADDING_PX)
            }
            ScrollAnchor::LastMessage => {
                let count = self.viewport.message_count();
                if count == 0 {
                    return;
                }
                match self.viewport.message_offset(count - 1) {
                    Some(top) => (top - MESSAGE_PADDING_PX).max(0.0),
                    None => return,
                }
            }
            ScrollAnchor::Message(index) => match self.viewport.message_offset(index) {
                Some(top) => (top - MESSAGE_PADDING_PX).max(0.0),
                None => return,
            },
        };
        self.viewport.scroll_to(offset, animated);
    }
}
