use std::path::{Path, PathBuf};

use serde::ser;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::AppResult;
use crate::git::hist::CommitInfo;

/// File names of the artifacts written for one commit, relative to the
/// output directory. Absent entries were skipped (missing content, empty
/// patch, rendering disabled).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportArtifact {
    pub content_file: Option<String>,
    pub patch_file: Option<String>,
    pub html_file: Option<String>,
}

/// Keep `[A-Za-z0-9._-]`, replace everything else. Keeps artifact names
/// portable whatever the tracked path looked like.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Default output directory for a tracked filename, e.g.
/// `historique_docs_cdc.md` for `docs/cdc.md`.
pub fn default_output_dir(filename: &Path) -> PathBuf {
    PathBuf::from(format!(
        "historique_{}",
        sanitize(&filename.display().to_string())
    ))
}

/// Deterministic artifact stem: `<timestamp>_<shortId>_<sanitizedBasename>`.
/// The commit id keeps distinct paths sharing a basename from colliding.
pub fn artifact_stem(commit: &CommitInfo, path: &Path) -> String {
    let basename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    format!(
        "{}_{}_{}",
        commit.timestamp,
        commit.short_id,
        sanitize(basename)
    )
}

/// Write the content and patch artifacts for one resolved revision.
/// Either input may be absent; the corresponding file is simply not
/// produced and the run moves on.
#[tracing::instrument(level = "debug", skip(content, patch))]
pub async fn write_revision(
    dir: &Path,
    stem: &str,
    content: Option<&[u8]>,
    patch: Option<&str>,
) -> AppResult<ExportArtifact> {
    let mut artifact = ExportArtifact::default();

    if let Some(bytes) = content {
        let name = stem.to_string();
        write_bytes(&dir.join(&name), bytes).await?;
        debug!("Wrote content artifact {}", name);
        artifact.content_file = Some(name);
    }

    if let Some(text) = patch {
        let name = format!("{}.patch", stem);
        write_bytes(&dir.join(&name), text.as_bytes()).await?;
        debug!("Wrote patch artifact {}", name);
        artifact.patch_file = Some(name);
    }

    Ok(artifact)
}

/// Write a rendered HTML diff next to the other artifacts.
pub async fn write_html(dir: &Path, stem: &str, html: &str) -> AppResult<String> {
    let name = format!("{}.html", stem);
    write_bytes(&dir.join(&name), html.as_bytes()).await?;
    info!("Wrote HTML diff {}", name);
    Ok(name)
}

/// Serialize a value to pretty JSON on disk.
pub async fn write_json<S: ser::Serialize>(path: &Path, value: &S) -> AppResult<()> {
    let data = serde_json::to_string_pretty(value)?;
    write_bytes(path, data.as_bytes()).await
}

/// Write raw data to a file, replacing any previous content.
async fn write_bytes(path: &Path, data: &[u8]) -> AppResult<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Oid;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn commit_info() -> CommitInfo {
        CommitInfo {
            id: Oid::zero(),
            full_id: "0".repeat(40),
            short_id: "ab12cd3".to_string(),
            timestamp: 1_715_517_192,
            date: "2024-05-12 14:33:12 +02:00".to_string(),
            author_name: "Jean Dupont".to_string(),
            author_email: "jean@example.com".to_string(),
            message: "edit".to_string(),
        }
    }

    #[test]
    fn sanitize_keeps_safe_characters_only() {
        assert_eq!(sanitize("cdc.md"), "cdc.md");
        assert_eq!(sanitize("docs/cahier des charges.md"), "docs_cahier_des_charges.md");
        assert_eq!(sanitize("a:b*c"), "a_b_c");
    }

    #[test]
    fn output_dir_is_derived_from_the_full_filename() {
        assert_eq!(
            default_output_dir(Path::new("docs/cdc.md")),
            PathBuf::from("historique_docs_cdc.md")
        );
    }

    #[test]
    fn artifact_stem_combines_timestamp_id_and_basename() {
        let stem = artifact_stem(&commit_info(), Path::new("docs/cdc.md"));
        assert_eq!(stem, "1715517192_ab12cd3_cdc.md");
    }

    #[test]
    fn stems_for_a_same_basename_differ_by_commit() {
        let a = commit_info();
        let mut b = commit_info();
        b.short_id = "ff00aa1".to_string();
        assert_ne!(
            artifact_stem(&a, Path::new("x/cdc.md")),
            artifact_stem(&b, Path::new("y/cdc.md"))
        );
    }

    #[tokio::test]
    async fn absent_inputs_produce_no_files() {
        let dir = TempDir::new().unwrap();
        let artifact = write_revision(dir.path(), "stem", None, None).await.unwrap();
        assert_eq!(artifact, ExportArtifact::default());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn content_and_patch_land_on_disk() {
        let dir = TempDir::new().unwrap();
        let artifact = write_revision(
            dir.path(),
            "1715517192_ab12cd3_cdc.md",
            Some(b"contenu"),
            Some("--- a/cdc.md\n+++ b/cdc.md\n"),
        )
        .await
        .unwrap();

        let content_file = artifact.content_file.unwrap();
        let patch_file = artifact.patch_file.unwrap();
        assert_eq!(content_file, "1715517192_ab12cd3_cdc.md");
        assert_eq!(patch_file, "1715517192_ab12cd3_cdc.md.patch");
        assert_eq!(
            std::fs::read(dir.path().join(&content_file)).unwrap(),
            b"contenu"
        );
        assert!(
            std::fs::read_to_string(dir.path().join(&patch_file))
                .unwrap()
                .starts_with("---")
        );
    }

    #[tokio::test]
    async fn html_artifact_gets_the_html_extension() {
        let dir = TempDir::new().unwrap();
        let name = write_html(dir.path(), "stem", "<html></html>").await.unwrap();
        assert_eq!(name, "stem.html");
        assert!(dir.path().join("stem.html").exists());
    }
}
