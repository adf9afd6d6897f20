use std::{path::Path, sync::Arc};

/// Cheaply clonable, immutable string shared between actors.
pub type ArcStr = Arc<str>;

/// Cheaply clonable, immutable path shared between actors.
pub type ArcPath = Arc<Path>;

/// Builds an [`ArcPath`] from anything path-like.
pub fn arc_path<P: AsRef<Path>>(path: P) -> ArcPath {
    Arc::from(path.as_ref())
}
