//! Image store collaborators.
//!
//! The routing layer never touches these directly; handlers in
//! [`crate::handlers`] call an [`ImageBackend`] and encode its results for
//! their namespace.

pub mod backend;
pub mod memory;

pub use backend::{
    abbreviate, join_reference, normalize_reference, HistoryEntry, ImageBackend, ImageError,
    ImageRecord, ImageResult, Layer, PrunedImage, RemoveReport, SearchResult,
};
pub use memory::MemoryImageBackend;
