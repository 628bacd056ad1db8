//! Asset store path resolution
//!
//! Assets are sharded on disk by the leading characters of their identifier:
//! `<root>/ab/12/cd/ab12cd34ef`. Resolution is pure; whether the file exists
//! is discovered later, when the validator opens it.

use crate::model::AssetIdentifier;
use std::path::{Component, Path, PathBuf};

/// Number of two-character shard directories above each asset
pub const SHARD_DEPTH: usize = 3;

/// Width of one shard segment, in characters
pub const SHARD_WIDTH: usize = 2;

/// Map an identifier to its location under `root`
///
/// Identifiers shorter than six characters produce short or empty segments
/// rather than an error. The result always stays under `root`: separators,
/// root prefixes and `.`/`..` inside the identifier are dropped.
pub fn resolve_location(root: &Path, identifier: &AssetIdentifier) -> PathBuf {
    let id = identifier.as_str();
    let mut path = root.to_path_buf();

    for depth in 0..SHARD_DEPTH {
        push_within(&mut path, &shard_segment(id, depth));
    }
    push_within(&mut path, id);
    path
}

/// Append only the plain name components of `piece`
fn push_within(path: &mut PathBuf, piece: &str) {
    for component in Path::new(piece).components() {
        if let Component::Normal(name) = component {
            path.push(name);
        }
    }
}

/// The `depth`-th shard segment of `id`, counted in characters
fn shard_segment(id: &str, depth: usize) -> String {
    id.chars()
        .skip(depth * SHARD_WIDTH)
        .take(SHARD_WIDTH)
        .collect()
}
