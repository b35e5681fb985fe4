//! Previous model retrieval
//!
//! The "old" graph of a compatibility run is the model as it stood in the
//! second most recent commit that touched the model file.

use git2::{Commit, Oid, Repository, Sort, Tree};
use std::path::{Path, PathBuf};

use crate::error::{GuardError, Result};

fn entry_id(tree: &Tree<'_>, path: &Path) -> Option<Oid> {
    tree.get_path(path).ok().map(|entry| entry.id())
}

/// Blob id of the file in the commit's first parent, if any
fn parent_entry_id(commit: &Commit<'_>, path: &Path) -> Result<Option<Oid>> {
    if commit.parent_count() == 0 {
        return Ok(None);
    }
    let parent = commit.parent(0)?;
    Ok(entry_id(&parent.tree()?, path))
}

fn relative_to_workdir(repo: &Repository, model_path: &Path) -> Result<PathBuf> {
    if model_path.is_relative() {
        return Ok(model_path.to_path_buf());
    }
    let workdir = repo
        .workdir()
        .ok_or_else(|| GuardError::History("repository has no working directory".to_string()))?;
    model_path
        .strip_prefix(workdir)
        .map(Path::to_path_buf)
        .map_err(|_| {
            GuardError::History(format!(
                "{} is not inside {}",
                model_path.display(),
                workdir.display()
            ))
        })
}

/// Contents of `model_path` as of the second most recent commit that changed
/// it, or `None` when the file has fewer than two revisions.
///
/// `model_path` is relative to the repository root, or absolute inside it.
pub fn previous_model_source(repo_path: &Path, model_path: &Path) -> Result<Option<String>> {
    let repo = Repository::discover(repo_path)?;
    let relative = relative_to_workdir(&repo, model_path)?;

    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let mut revisions = 0;
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        let current = entry_id(&commit.tree()?, &relative);
        if current == parent_entry_id(&commit, &relative)? {
            continue;
        }

        revisions += 1;
        if revisions < 2 {
            continue;
        }

        tracing::info!(commit = %commit.id(), path = %relative.display(), "Found previous model revision");
        let Some(blob_id) = current else {
            return Ok(None);
        };
        let blob = repo.find_blob(blob_id)?;
        let content = String::from_utf8(blob.content().to_vec())
            .map_err(|e| GuardError::History(format!("{} is not UTF-8: {}", relative.display(), e)))?;
        return Ok(Some(content));
    }

    tracing::debug!(path = %relative.display(), revisions, "No previous model revision");
    Ok(None)
}
