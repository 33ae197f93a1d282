use std::path::{Component, Path};

use log::debug;

use crate::cloud::store::RemoteStore;
use crate::errors::Result;
use crate::transfer::cache::DirectoryCache;

/// Split a relative directory path into ordered segment names.
///
/// `.` and empty components are dropped; an empty result means "no
/// subdirectory — upload directly under the given parent".
pub fn split_segments(rel_dir: &Path) -> Vec<String> {
    rel_dir
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Resolve or create the chain of remote folders for `rel_dir` under
/// `root_parent`, returning the innermost folder's id.
///
/// Segments are materialized strictly left-to-right: each segment is taken
/// from the cache when present, otherwise looked up remotely, otherwise
/// created — and every resolution is cached. An empty path returns
/// `root_parent` unchanged.
///
/// On failure the underlying error propagates; folders already created stay
/// in place. Re-resolution is safe because lookup always precedes creation.
pub async fn materialize<S>(
    store: &S,
    cache: &mut DirectoryCache,
    rel_dir: &Path,
    root_parent: &str,
) -> Result<String>
where
    S: RemoteStore + ?Sized,
{
    let mut parent = root_parent.to_string();

    for segment in split_segments(rel_dir) {
        if let Some(cached) = cache.get(&parent, &segment) {
            debug!("Cache hit for \"{}\" under {}: {}", segment, parent, cached);
            parent = cached.to_string();
            continue;
        }

        let node = match store.find_folder(&segment, &parent).await? {
            Some(existing) => {
                debug!(
                    "Folder \"{}\" already exists under {} ({})",
                    segment, parent, existing.id
                );
                existing
            }
            None => store.create_folder(&segment, &parent).await?,
        };

        cache.insert(&parent, &segment, &node.id);
        parent = node.id;
    }

    Ok(parent)
}
