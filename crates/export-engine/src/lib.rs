//! Layercut Export Engine
//!
//! Drives an image engine through resolved export descriptors.
//!
//! # Pipeline
//!
//! ```text
//! original ──validate──► duplicate ──► apply show/hide/mask rules
//!                                        │
//!                                        ▼
//!                          crop (bounding box | named layer)
//!                                        │
//!                                        ▼
//!                          resize (scale | width/height)
//!                                        │
//!                                        ▼
//!                          save ──► geometry ──► metadata store
//! ```

pub mod document;
pub mod dump;
pub mod memory;
pub mod pipeline;
pub mod runner;

pub use document::{Document, ImageEngine, LayerId, LayerInfo, Scoped};
pub use dump::{dump_visible_tree, VisibleTree};
pub use memory::{MemoryDocument, MemoryEngine, MemoryLayer};
pub use pipeline::*;
pub use runner::{matches_filter, run_exports};
