use std::path::Path;

use git2::{Commit, Oid, Repository, Sort};
use tracing::{debug, trace};

use crate::git::{Thresholds, diff};
use crate::time_utils::human_date;
use crate::track::{self, PathChange};
use crate::{AppError, AppResult};

/// Metadata for one commit in the tracked file's history.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: Oid,
    pub full_id: String,
    pub short_id: String,
    /// Seconds since the epoch.
    pub timestamp: i64,
    /// Human-readable date in the author's own timezone.
    pub date: String,
    pub author_name: String,
    pub author_email: String,
    /// First line of the commit message.
    pub message: String,
}

impl CommitInfo {
    fn new(commit: &Commit) -> AppResult<Self> {
        let full_id = commit.id().to_string();
        let short_id = commit
            .as_object()
            .short_id()?
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| full_id[..7].to_string());
        let time = commit.time();
        let author = commit.author();
        Ok(CommitInfo {
            id: commit.id(),
            full_id,
            short_id,
            timestamp: time.seconds(),
            date: human_date(time.seconds(), time.offset_minutes())?,
            author_name: author.name().unwrap_or("unknown").to_string(),
            author_email: author.email().unwrap_or("unknown").to_string(),
            message: commit.summary().unwrap_or_default().to_string(),
        })
    }
}

/// Read-only view of the repository's history for one file.
pub struct RevisionSource {
    repo: Repository,
}

impl std::fmt::Debug for RevisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionSource").finish_non_exhaustive()
    }
}

impl RevisionSource {
    /// Locate the repository enclosing `dir`. Failing to find one is the only
    /// fatal error of the whole pipeline.
    pub fn discover_from<P: AsRef<Path>>(dir: P) -> AppResult<Self> {
        match Repository::discover(dir.as_ref()) {
            Ok(repo) => Ok(RevisionSource { repo }),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Err(AppError::OutsideRepository(
                format!("no repository found from {:?}", dir.as_ref()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// List the commits whose parent-diff mentions the tracked file,
    /// newest first, re-anchoring the path through renames and copies as
    /// the walk moves toward older commits.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commits_touching(
        &self,
        filename: &Path,
        thresholds: Thresholds,
    ) -> AppResult<Vec<CommitInfo>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        if let Err(e) = revwalk.push_head() {
            // Unborn branch or empty repository: no history to export.
            debug!("No HEAD to walk: {}", e);
            return Ok(Vec::new());
        }

        let mut tracked = filename.to_path_buf();
        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            // The walk diffs root commits against the empty tree so the
            // commit that introduced the file makes it into the list.
            let changes = match diff::parent_diff(&self.repo, &commit, thresholds, true)? {
                Some(diff) => diff::path_changes(&diff),
                None => Vec::new(),
            };
            let resolution = track::resolve(&changes, &tracked);
            if resolution.matched {
                trace!("{} touches {:?}", commit.id(), resolution.path);
                commits.push(CommitInfo::new(&commit)?);
            }
            tracked = resolution.path;
        }
        Ok(commits)
    }

    /// The path-status entries of one commit's diff against its first
    /// parent, at the same thresholds the commit list was built with.
    /// A root commit has nothing to diff against and yields no entries.
    pub fn status_records(
        &self,
        commit: &CommitInfo,
        thresholds: Thresholds,
    ) -> AppResult<Vec<PathChange>> {
        let commit = self.repo.find_commit(commit.id)?;
        match diff::parent_diff(&self.repo, &commit, thresholds, false)? {
            Some(diff) => Ok(diff::path_changes(&diff)),
            None => Ok(Vec::new()),
        }
    }

    /// Full content of `path` in the commit's tree, or `None` when the path
    /// does not exist there (a deletion, or the pre-image of a rename).
    pub fn file_content(&self, commit: &CommitInfo, path: &Path) -> Option<Vec<u8>> {
        let commit = self.repo.find_commit(commit.id).ok()?;
        let tree = commit.tree().ok()?;
        let entry = tree.get_path(path).ok()?;
        let blob = self.repo.find_blob(entry.id()).ok()?;
        Some(blob.content().to_vec())
    }

    /// Textual patch the commit introduced for `path`, or `None` when the
    /// patch is empty or the path is untouched.
    pub fn patch_text(
        &self,
        commit: &CommitInfo,
        path: &Path,
        thresholds: Thresholds,
    ) -> AppResult<Option<String>> {
        let commit = self.repo.find_commit(commit.id)?;
        match diff::parent_diff(&self.repo, &commit, thresholds, false)? {
            Some(diff) => diff::patch_for(&diff, path),
            None => Ok(None),
        }
    }

    /// Resolve every listed commit to the path identifying the tracked file
    /// there, threading the tracked-path state through the sequence.
    pub fn follow_paths(
        &self,
        filename: &Path,
        commits: &[CommitInfo],
        thresholds: Thresholds,
    ) -> AppResult<Vec<track::Resolution>> {
        track::follow(filename.to_path_buf(), commits, |commit| {
            self.status_records(commit, thresholds)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use git2::{IndexAddOption, Signature, Time};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sig(secs: i64) -> Signature<'static> {
        Signature::new("Jean Dupont", "jean@example.com", &Time::new(secs, 0)).unwrap()
    }

    /// Stage everything (additions, modifications, deletions) and commit.
    pub(crate) fn commit_all(repo: &Repository, message: &str, secs: i64) -> Oid {
        let mut index = repo.index().unwrap();
        index.add_all(["*"], IndexAddOption::DEFAULT, None).unwrap();
        index.update_all(["*"], None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parent = repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .map(|oid| repo.find_commit(oid).unwrap());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let author = sig(secs);
        repo.commit(Some("HEAD"), &author, &author, message, &tree, &parents)
            .unwrap()
    }

    /// A repo where `old.md` is added, renamed to `new.md`, then modified.
    pub(crate) fn rename_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let root = dir.path().to_path_buf();

        fs::write(root.join("old.md"), "# Cahier des charges\n\ncontenu initial\n").unwrap();
        commit_all(&repo, "add old.md", 1_000);

        fs::rename(root.join("old.md"), root.join("new.md")).unwrap();
        commit_all(&repo, "rename old.md to new.md", 2_000);

        fs::write(
            root.join("new.md"),
            "# Cahier des charges\n\ncontenu initial\n\nune section de plus\n",
        )
        .unwrap();
        commit_all(&repo, "extend new.md", 3_000);

        (dir, repo)
    }

    fn source_for(dir: &TempDir) -> RevisionSource {
        RevisionSource::discover_from(dir.path()).unwrap()
    }

    #[test]
    fn discover_fails_outside_a_repository() {
        let dir = TempDir::new().unwrap();
        let err = RevisionSource::discover_from(dir.path()).unwrap_err();
        assert!(
            matches!(err, AppError::OutsideRepository(_)),
            "Expected OutsideRepository, got {:?}",
            err
        );
    }

    #[test]
    fn unchanged_file_is_listed_once_per_touching_commit() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let root = dir.path().to_path_buf();
        for (i, body) in ["un\n", "deux\n", "trois\n"].iter().enumerate() {
            fs::write(root.join("notes.md"), body).unwrap();
            commit_all(&repo, &format!("edit {}", i), 1_000 * (i as i64 + 1));
        }

        let source = source_for(&dir);
        let commits = source
            .commits_touching(Path::new("notes.md"), Thresholds::default())
            .unwrap();
        assert_eq!(commits.len(), 3);
        assert!(
            commits.windows(2).all(|w| w[0].timestamp > w[1].timestamp),
            "Commits must be listed newest first"
        );

        let resolutions = source
            .follow_paths(Path::new("notes.md"), &commits, Thresholds::default())
            .unwrap();
        assert!(
            resolutions
                .iter()
                .all(|r| r.path == Path::new("notes.md")),
            "No rename anywhere, the path never moves: {:?}",
            resolutions
        );
    }

    #[test]
    fn rename_re_anchors_the_tracked_path() {
        let (dir, _repo) = rename_repo();
        let source = source_for(&dir);
        let thresholds = Thresholds::default();

        let commits = source
            .commits_touching(Path::new("new.md"), thresholds)
            .unwrap();
        assert_eq!(commits.len(), 3, "All three commits touch the file");
        assert_eq!(commits[0].message, "extend new.md");
        assert_eq!(commits[2].message, "add old.md");

        let resolutions = source
            .follow_paths(Path::new("new.md"), &commits, thresholds)
            .unwrap();
        let paths: Vec<_> = resolutions.iter().map(|r| r.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("new.md"),
                PathBuf::from("old.md"),
                PathBuf::from("old.md"),
            ]
        );

        // The rename commit's tree only knows the post-image name; the
        // pre-image resolution makes content retrieval fail there, which the
        // exporter tolerates.
        assert!(source.file_content(&commits[1], &resolutions[1].path).is_none());
        assert!(source.file_content(&commits[0], &resolutions[0].path).is_some());
        assert!(source.file_content(&commits[2], &resolutions[2].path).is_some());
    }

    #[test]
    fn unknown_file_yields_an_empty_history() {
        let (dir, _repo) = rename_repo();
        let source = source_for(&dir);
        let commits = source
            .commits_touching(Path::new("absent.md"), Thresholds::default())
            .unwrap();
        assert!(commits.is_empty(), "Got {:?}", commits);
    }

    #[test]
    fn root_commit_has_no_status_records_and_no_patch() {
        let (dir, _repo) = rename_repo();
        let source = source_for(&dir);
        let thresholds = Thresholds::default();
        let commits = source
            .commits_touching(Path::new("new.md"), thresholds)
            .unwrap();
        let root = commits.last().unwrap();

        let records = source.status_records(root, thresholds).unwrap();
        assert!(records.is_empty(), "Got {:?}", records);
        let patch = source.patch_text(root, Path::new("old.md"), thresholds).unwrap();
        assert_eq!(patch, None);
        // Content is still retrievable even though resolution fell through.
        assert!(source.file_content(root, Path::new("old.md")).is_some());
    }

    #[test]
    fn modification_patch_is_nonempty() {
        let (dir, _repo) = rename_repo();
        let source = source_for(&dir);
        let thresholds = Thresholds::default();
        let commits = source
            .commits_touching(Path::new("new.md"), thresholds)
            .unwrap();

        let patch = source
            .patch_text(&commits[0], Path::new("new.md"), thresholds)
            .unwrap()
            .expect("the modification commit must carry a patch");
        assert!(
            patch.contains("+une section de plus"),
            "Patch body missing the added line:\n{}",
            patch
        );
    }

    #[test]
    fn rename_commit_reports_a_rename_record() {
        let (dir, _repo) = rename_repo();
        let source = source_for(&dir);
        let thresholds = Thresholds::default();
        let commits = source
            .commits_touching(Path::new("new.md"), thresholds)
            .unwrap();

        let records = source.status_records(&commits[1], thresholds).unwrap();
        assert_eq!(
            records,
            vec![PathChange::Renamed {
                old: PathBuf::from("old.md"),
                new: PathBuf::from("new.md"),
            }]
        );
    }

    #[test]
    fn deletion_still_matches_and_yields_a_patch() {
        let (dir, repo) = rename_repo();
        fs::remove_file(dir.path().join("new.md")).unwrap();
        commit_all(&repo, "drop new.md", 4_000);

        let source = source_for(&dir);
        let thresholds = Thresholds::default();
        let commits = source
            .commits_touching(Path::new("new.md"), thresholds)
            .unwrap();
        assert_eq!(commits.len(), 4);
        assert_eq!(commits[0].message, "drop new.md");

        let resolutions = source
            .follow_paths(Path::new("new.md"), &commits, thresholds)
            .unwrap();
        assert_eq!(resolutions[0].path, PathBuf::from("new.md"));

        // The deleted path has no content at the deleting commit, but the
        // deletion diff itself is a perfectly good patch.
        assert!(source.file_content(&commits[0], &resolutions[0].path).is_none());
        let patch = source
            .patch_text(&commits[0], &resolutions[0].path, thresholds)
            .unwrap();
        assert!(patch.is_some(), "Deletion must produce a patch");
    }

    #[test]
    fn commit_metadata_is_populated() {
        let (dir, _repo) = rename_repo();
        let source = source_for(&dir);
        let commits = source
            .commits_touching(Path::new("new.md"), Thresholds::default())
            .unwrap();
        let c = &commits[2];
        assert_eq!(c.author_name, "Jean Dupont");
        assert_eq!(c.author_email, "jean@example.com");
        assert_eq!(c.timestamp, 1_000);
        assert_eq!(c.date, "1970-01-01 00:16:40 +00:00");
        assert_eq!(c.full_id.len(), 40);
        assert!(c.full_id.starts_with(&c.short_id));
        assert_eq!(c.message, "add old.md");
    }
}
