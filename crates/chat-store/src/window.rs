//! Virtualized windows over the message sequence.
//!
//! A list renderer only needs the rows near the viewport. [`VirtualWindow`]
//! turns a viewport into a clamped range, pads it with overscan rows, and
//! hands back the same `Arc<WindowSlice>` for as long as neither the range
//! nor the store generation moved.

use std::sync::Arc;

use tracing::trace;

use crate::store::ChatStore;
use crate::types::{Message, MessageId};
use crate::view::{clamp_range, StoreView};

/// Default number of rows rendered beyond each edge of the viewport.
pub const DEFAULT_OVERSCAN: usize = 4;

/// One materialized window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSlice {
    /// Store generation the slice was read at.
    pub generation: u64,
    pub start: usize,
    pub end: usize,
    /// Message count at `generation`.
    pub total: usize,
    pub messages: Vec<Arc<Message>>,
}

impl WindowSlice {
    pub fn ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(|message| message.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug)]
pub struct VirtualWindow {
    overscan: usize,
    last: Option<Arc<WindowSlice>>,
}

impl Default for VirtualWindow {
    fn default() -> Self {
        Self::new(DEFAULT_OVERSCAN)
    }
}

impl VirtualWindow {
    pub fn new(overscan: usize) -> Self {
        Self {
            overscan,
            last: None,
        }
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Range covering the viewport plus overscan, clamped to `total`.
    pub fn range_for(&self, first_visible: usize, visible_count: usize, total: usize) -> (usize, usize) {
        let start = first_visible.saturating_sub(self.overscan);
        let end = first_visible
            .saturating_add(visible_count)
            .saturating_add(self.overscan);
        clamp_range(start, end, total)
    }

    /// Window for a viewport starting at row `first_visible`.
    pub fn view(
        &mut self,
        store: &ChatStore,
        first_visible: usize,
        visible_count: usize,
    ) -> Arc<WindowSlice> {
        let overscan = self.overscan;
        store.read(|view| {
            let start = first_visible.saturating_sub(overscan);
            let end = first_visible
                .saturating_add(visible_count)
                .saturating_add(overscan);
            self.materialize(view, start, end)
        })
    }

    /// Window for the raw range `[start, end)`, clamped, without overscan.
    pub fn slice(&mut self, store: &ChatStore, start: usize, end: usize) -> Arc<WindowSlice> {
        store.read(|view| self.materialize(view, start, end))
    }

    /// Forgets the cached slice.
    pub fn reset(&mut self) {
        self.last = None;
    }

    fn materialize(
        &mut self,
        view: StoreView<'_>,
        start: usize,
        end: usize,
    ) -> Arc<WindowSlice> {
        let total = view.len();
        let (start, end) = clamp_range(start, end, total);
        let generation = view.generation();

        if let Some(last) = &self.last {
            if last.generation == generation && last.start == start && last.end == end {
                return Arc::clone(last);
            }
        }

        trace!(generation, start, end, total, "chat-store: window materialized");
        let slice = Arc::new(WindowSlice {
            generation,
            start,
            end,
            total,
            messages: view.slice(start, end).to_vec(),
        });
        self.last = Some(Arc::clone(&slice));
        slice
    }
}
