use std::path::{Path, PathBuf};

use tracing::trace;

/// One path-level change a commit introduced relative to its parent.
///
/// Rename and copy entries carry both operands; everything else names the
/// single path it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathChange {
    Added(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Renamed { old: PathBuf, new: PathBuf },
    Copied { old: PathBuf, new: PathBuf },
}

impl PathChange {
    /// The path this change resolves the tracked file to, when the tracked
    /// file is involved at all.
    fn resolve_against(&self, tracked: &Path) -> Option<PathBuf> {
        match self {
            PathChange::Renamed { old, new } | PathChange::Copied { old, new } => {
                if new == tracked {
                    // The change landed on the tracked path: its pre-image in
                    // this commit is the source path.
                    Some(old.clone())
                } else if old == tracked {
                    // The tracked path was the source and migrated.
                    Some(new.clone())
                } else {
                    None
                }
            }
            PathChange::Added(p) | PathChange::Modified(p) | PathChange::Deleted(p) => {
                (p == tracked).then(|| p.clone())
            }
        }
    }
}

/// Outcome of resolving one commit against the tracked path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Path identifying the tracked file relative to this commit.
    pub path: PathBuf,
    /// Whether any change entry mentioned the tracked path.
    pub matched: bool,
    /// More than one entry matched; the last one scanned won.
    pub ambiguous: bool,
}

/// Resolve a single commit's change set against the previously tracked path.
///
/// Entries are scanned in the order the history provider returned them and
/// the last matching entry wins. When nothing matches, the path is assumed
/// unchanged at this commit.
pub fn resolve(changes: &[PathChange], previous: &Path) -> Resolution {
    let mut resolved: Option<PathBuf> = None;
    let mut matches = 0usize;
    for change in changes {
        if let Some(path) = change.resolve_against(previous) {
            trace!("{:?} matched {:?} -> {:?}", change, previous, path);
            matches += 1;
            resolved = Some(path);
        }
    }
    match resolved {
        Some(path) => Resolution {
            path,
            matched: true,
            ambiguous: matches > 1,
        },
        None => Resolution {
            path: previous.to_path_buf(),
            matched: false,
            ambiguous: false,
        },
    }
}

/// Thread the tracked path through an ordered commit sequence.
///
/// `changes_for` is queried once per commit, in sequence order; the state
/// handed to commit `i` is exactly the path resolved at commit `i - 1`.
/// Returns one `Resolution` per commit, in the same order.
pub fn follow<C, E>(
    start: PathBuf,
    commits: &[C],
    mut changes_for: impl FnMut(&C) -> Result<Vec<PathChange>, E>,
) -> Result<Vec<Resolution>, E> {
    let mut tracked = start;
    let mut resolutions = Vec::with_capacity(commits.len());
    for commit in commits {
        let changes = changes_for(commit)?;
        let resolution = resolve(&changes, &tracked);
        tracked = resolution.path.clone();
        resolutions.push(resolution);
    }
    Ok(resolutions)
}
