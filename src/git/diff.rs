use std::path::{Path, PathBuf};

use git2::{Commit, Delta, Diff, DiffDelta, DiffFindOptions, DiffOptions, Patch, Repository};
use tracing::debug;

use crate::AppResult;
use crate::git::Thresholds;
use crate::track::PathChange;

fn diff_opts() -> DiffOptions {
    let mut opts = DiffOptions::new();
    opts.include_typechange(true)
        .ignore_whitespace(false)
        .context_lines(3)
        .indent_heuristic(true);
    opts
}

fn find_opts(thresholds: Thresholds) -> DiffFindOptions {
    let mut opts = DiffFindOptions::new();
    opts.renames(true)
        .copies(true)
        .rename_threshold(thresholds.rename.percent())
        .copy_threshold(thresholds.copy.percent());
    opts
}

/// Diff a commit against its first parent, with rename/copy detection at the
/// run's thresholds. Root commits have no parent to compare against and
/// yield `None`; `root_against_empty` instead diffs them against the empty
/// tree so the commit that introduced a file still reports its additions.
pub(crate) fn parent_diff<'r>(
    repo: &'r Repository,
    commit: &Commit,
    thresholds: Thresholds,
    root_against_empty: bool,
) -> AppResult<Option<Diff<'r>>> {
    let tree = commit.tree()?;
    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree()?),
        Err(_) if root_against_empty => None,
        Err(_) => return Ok(None),
    };
    let mut diff = repo.diff_tree_to_tree(
        parent_tree.as_ref(),
        Some(&tree),
        Some(&mut diff_opts()),
    )?;
    diff.find_similar(Some(&mut find_opts(thresholds)))?;
    Ok(Some(diff))
}

fn old_path(delta: &DiffDelta) -> Option<PathBuf> {
    delta.old_file().path().map(Path::to_path_buf)
}

fn new_path(delta: &DiffDelta) -> Option<PathBuf> {
    delta.new_file().path().map(Path::to_path_buf)
}

/// Flatten a diff into the change entries the path tracker consumes.
/// Deltas without a usable path are skipped.
pub(crate) fn path_changes(diff: &Diff) -> Vec<PathChange> {
    let mut changes = Vec::new();
    for delta in diff.deltas() {
        let change = match delta.status() {
            Delta::Added => new_path(&delta).map(PathChange::Added),
            Delta::Deleted => old_path(&delta).map(PathChange::Deleted),
            Delta::Modified | Delta::Typechange => new_path(&delta).map(PathChange::Modified),
            Delta::Renamed => match (old_path(&delta), new_path(&delta)) {
                (Some(old), Some(new)) => Some(PathChange::Renamed { old, new }),
                _ => None,
            },
            Delta::Copied => match (old_path(&delta), new_path(&delta)) {
                (Some(old), Some(new)) => Some(PathChange::Copied { old, new }),
                _ => None,
            },
            _ => None,
        };
        match change {
            Some(change) => changes.push(change),
            None => debug!("Skipping delta with status {:?}", delta.status()),
        }
    }
    changes
}

/// Build the textual patch a diff carries for one path. Returns `None` when
/// the diff does not touch the path or the patch renders empty (binary
/// content, or a root commit diffed against nothing).
pub(crate) fn patch_for(diff: &Diff, path: &Path) -> AppResult<Option<String>> {
    for (idx, delta) in diff.deltas().enumerate() {
        let matches_new = delta.new_file().path().is_some_and(|p| p == path);
        let matches_old = delta.old_file().path().is_some_and(|p| p == path);
        if !(matches_new || matches_old) {
            continue;
        }

        return match Patch::from_diff(diff, idx)? {
            Some(mut patch) => {
                let buf = patch.to_buf()?;
                let text = std::str::from_utf8(&buf)?;
                if text.trim().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(text.to_string()))
                }
            }
            // Binary or otherwise unrepresentable.
            None => Ok(None),
        };
    }
    Ok(None)
}
