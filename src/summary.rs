use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::AppResult;
use crate::export::ExportArtifact;
use crate::git::hist::CommitInfo;

/// One block of the summary log: commit metadata plus the locations of the
/// artifacts that were actually produced. The rendered labels keep the
/// legacy French wording of the summary format.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    pub commit: String,
    pub date: String,
    pub timestamp: i64,
    pub author: String,
    pub email: String,
    pub message: String,
    /// Path identifying the tracked file at this commit.
    pub path: PathBuf,
    pub content_file: Option<String>,
    pub patch_file: Option<String>,
    pub html_file: Option<String>,
}

impl SummaryRecord {
    pub fn new(commit: &CommitInfo, path: &Path, artifact: &ExportArtifact) -> Self {
        SummaryRecord {
            commit: commit.full_id.clone(),
            date: commit.date.clone(),
            timestamp: commit.timestamp,
            author: commit.author_name.clone(),
            email: commit.author_email.clone(),
            message: commit.message.clone(),
            path: path.to_path_buf(),
            content_file: artifact.content_file.clone(),
            patch_file: artifact.patch_file.clone(),
            html_file: artifact.html_file.clone(),
        }
    }
}

impl Display for SummaryRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "----------------------------------------")?;
        writeln!(f, "Commit : {}", self.commit)?;
        writeln!(f, "Date : {}", self.date)?;
        writeln!(f, "Auteur : {} <{}>", self.author, self.email)?;
        writeln!(f, "Message : {}", self.message)?;
        writeln!(f, "Chemin : {}", self.path.display())?;
        if let Some(content) = &self.content_file {
            writeln!(f, "Fichier extrait : {}", content)?;
        }
        if let Some(patch) = &self.patch_file {
            writeln!(f, "Patch : {}", patch)?;
        }
        if let Some(html) = &self.html_file {
            writeln!(f, "Diff HTML : {}", html)?;
        }
        writeln!(f)
    }
}

/// Append-only writer for `summary.txt`. The file is truncated exactly once,
/// when the writer is created at the start of the run.
pub struct SummaryWriter {
    file: File,
}

impl SummaryWriter {
    pub async fn create(path: &Path) -> AppResult<Self> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;
        Ok(SummaryWriter { file })
    }

    pub async fn append(&mut self, record: &SummaryRecord) -> AppResult<()> {
        self.file.write_all(record.to_string().as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }
}
