//! Directory trigger: turns files landing in a watched folder into blobs.

pub mod blob;
pub mod watcher;

pub use blob::{list_existing, matches_extension, open_blob, BlobRef};
pub use watcher::BlobWatcher;
