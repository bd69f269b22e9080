//! Buffer pool: page caching, pinning, and eviction.
//!
//! The buffer pool sits between the heap layer and a `Storage` backend,
//! caching pages in a fixed set of frames. Access is mediated by RAII
//! guards: holding a guard pins the page (it cannot be evicted), and
//! dropping the guard unpins it, carrying an accurate dirty flag back to
//! the pool. Pinning discipline is therefore structural: a pin cannot
//! leak on an error path, and a page cannot be unpinned twice.

mod error;
mod frame;
mod guard;
mod pool;
mod replacer;

pub use error::BufferPoolError;
pub use frame::FrameId;
pub use guard::{PageReadGuard, PageWriteGuard};
pub use pool::BufferPool;
pub use replacer::{LruReplacer, Replacer};
