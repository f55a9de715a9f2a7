//! Incremental Batch Renderer
//!
//! Renders large collections into a container a batch at a time, yielding to
//! the host between batches so the interaction thread never blocks for long.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::Config;
use crate::error::{PerfError, Result};
use crate::render::{Container, Fragment, Row, RowIdentity};
use crate::runtime::Scheduler;

/// Default number of rows appended per frame.
pub const DEFAULT_BATCH_SIZE: usize = 100;

// == Batch Options ==
/// Per-call options for [`BatchRenderer::render`].
#[derive(Default)]
pub struct BatchOptions {
    batch_size: Option<usize>,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows per batch. Falls back to the renderer's default when unset.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Called once after the final batch is appended.
    pub fn on_complete(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

// == Batch Renderer ==
/// Appends rendered rows to a container across frame ticks.
#[derive(Clone)]
pub struct BatchRenderer {
    scheduler: Rc<dyn Scheduler>,
    default_batch_size: usize,
}

impl BatchRenderer {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            default_batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Uses `config.batch_size` as the default, rejecting zero.
    pub fn from_config(scheduler: Rc<dyn Scheduler>, config: &Config) -> Result<Self> {
        let batch_size = validate_batch_size(config.batch_size)?;
        Ok(Self {
            scheduler,
            default_batch_size: batch_size,
        })
    }

    pub fn default_batch_size(&self) -> usize {
        self.default_batch_size
    }

    // == Render ==
    /// Clears `container` and renders `items` into it.
    ///
    /// - No items: returns after clearing; `on_complete` is not called.
    /// - At most one batch: a single append, `on_complete` runs before returning.
    /// - More: the first batch is appended now and each following batch on
    ///   the next frame tick; `on_complete` runs after the last one.
    ///
    /// Rows carry the item's `id` and `sku` attributes when present. Once
    /// started a sequence runs to completion; there is no cancellation.
    ///
    /// # Errors
    /// `PerfError::InvalidOption` if the batch size is zero. The container
    /// is left untouched in that case.
    pub fn render<T, C, F>(
        &self,
        container: Rc<RefCell<C>>,
        items: Vec<T>,
        render_item: F,
        options: BatchOptions,
    ) -> Result<()>
    where
        T: RowIdentity + 'static,
        C: Container + 'static,
        F: Fn(&T) -> String + 'static,
    {
        let batch_size = validate_batch_size(options.batch_size.unwrap_or(self.default_batch_size))?;

        container.borrow_mut().clear();
        if items.is_empty() {
            return Ok(());
        }

        debug!(
            items = items.len(),
            batch_size,
            batches = items.len().div_ceil(batch_size),
            "Starting batched render"
        );

        BatchJob {
            scheduler: Rc::clone(&self.scheduler),
            container,
            items,
            render_item,
            batch_size,
            cursor: 0,
            on_complete: options.on_complete,
        }
        .step();
        Ok(())
    }
}

fn validate_batch_size(batch_size: usize) -> Result<usize> {
    if batch_size == 0 {
        return Err(PerfError::InvalidOption(
            "batch size must be at least 1".to_string(),
        ));
    }
    Ok(batch_size)
}

/// Render state moved from one frame task to the next.
struct BatchJob<T, C, F> {
    scheduler: Rc<dyn Scheduler>,
    container: Rc<RefCell<C>>,
    items: Vec<T>,
    render_item: F,
    batch_size: usize,
    /// Index of the first item not yet rendered
    cursor: usize,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl<T, C, F> BatchJob<T, C, F>
where
    T: RowIdentity + 'static,
    C: Container + 'static,
    F: Fn(&T) -> String + 'static,
{
    fn step(mut self) {
        let end = (self.cursor + self.batch_size).min(self.items.len());
        let mut fragment = Fragment::with_capacity(end - self.cursor);
        for item in &self.items[self.cursor..end] {
            fragment.push(self.render_row(item));
        }
        self.container.borrow_mut().append(fragment);
        debug!(from = self.cursor, to = end, "Appended batch");
        self.cursor = end;

        if self.cursor < self.items.len() {
            let scheduler = Rc::clone(&self.scheduler);
            scheduler.request_frame(Box::new(move || self.step()));
        } else if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
    }

    fn render_row(&self, item: &T) -> Row {
        let mut row = Row::new((self.render_item)(item));
        if let Some(id) = item.row_id() {
            row.set_attribute("id", id);
        }
        if let Some(sku) = item.row_sku() {
            row.set_attribute("sku", sku);
        }
        row
    }
}
