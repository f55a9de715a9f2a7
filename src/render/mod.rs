//! Render Module
//!
//! Frame-aligned rendering helpers.
//!
//! # Components
//! - RenderScheduler: coalesces render requests into one flush per frame
//! - BatchRenderer: appends large collections across several frames

mod batch;
mod container;
mod scheduler;

pub use batch::{BatchOptions, BatchRenderer, DEFAULT_BATCH_SIZE};
pub use container::{Container, Fragment, MemoryContainer, Row, RowIdentity};
pub use scheduler::{RenderCallback, RenderScheduler, RenderStats};
