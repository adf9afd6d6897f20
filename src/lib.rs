//! Client-side data layer of an RSS reader: a cache of remote resources with
//! request deduplication, query bindings, debounced search, pagination and
//! the summary lifecycle of articles, plus the actors they run on.

pub mod api;
pub mod app;
pub mod debounce;
pub mod fs;
pub mod log;
pub mod net;
pub mod query;
pub mod utils;

pub use utils::*;

/// Default buffer size of the actors' message channels.
pub const BUFFER_SIZE: usize = 128;
