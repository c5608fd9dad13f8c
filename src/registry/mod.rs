//! Handle Registries
//!
//! Growable slot tables that own every open store and stream and hand out
//! small copyable handles in their place.
//!
//! ## Responsibilities
//! - Reuse the first free slot before growing
//! - Grow by doubling when every slot is taken
//! - Reject stale handles: each handle carries the slot's generation, which
//!   is bumped when the slot is released
//!
//! ## Slot Lifecycle
//! ```text
//!   UnAllocated ──allocate──▶ UnInitialized ──init ok──▶ Active
//!        ▲                          │                      │
//!        └────────init failed───────┘                      │
//!        └──────────────────────release────────────────────┘
//! ```

mod handle;
mod table;

pub use handle::{SlotStatus, StoreHandle, StreamHandle};
pub(crate) use handle::RawHandle;
pub(crate) use table::Registry;
