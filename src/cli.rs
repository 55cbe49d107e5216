use std::io::Write;
use std::path::{Path, PathBuf};

use clap::builder::FalseyValueParser;
use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use clap_complete::aot::{Shell, generate};
use clap_complete_nushell::Nushell;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::AppResult;
use crate::export;
use crate::git::hist::RevisionSource;
use crate::git::{Similarity, Thresholds};
use crate::render::{self, Diff2Html};
use crate::summary::{SummaryRecord, SummaryWriter};

pub static BIN_NAME: &str = "git-historique";

const STYLES: Styles = Styles::styled()
    .header(Style::new().bold())
    .usage(Style::new().bold())
    .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))))
    .literal(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))));

/// Long-form CLI description shown in `--help`.
const LONG_ABOUT: &str = "git-historique - Export the full history of one file

Walks the file's commits newest to oldest inside the enclosing git
repository, following renames and copies at configurable similarity
thresholds, and writes into an output directory:
- one content snapshot per commit
- one patch per commit
- an optional HTML diff per commit (rendered by the external diff2html tool)
- a running summary.txt describing every processed commit

The repository itself is never modified.";

/// Export the full history of one file from the enclosing git repository.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = Some(LONG_ABOUT), styles = STYLES)]
pub struct Cli {
    /// File to follow through history, as a repository-relative path
    #[arg(default_value = "cdc.md")]
    pub filename: PathBuf,

    /// Minimum content similarity for a delete+add pair to count as a rename
    #[arg(long, env = "RENAME_THRESHOLD", default_value_t = Similarity::default())]
    pub rename_threshold: Similarity,

    /// Minimum content similarity for a change to count as a copy
    #[arg(long, env = "COPY_THRESHOLD", default_value_t = Similarity::default())]
    pub copy_threshold: Similarity,

    /// Render an HTML diff for each patch (requires diff2html on the PATH)
    #[arg(long, env = "ENABLE_HTML_DIFF", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub html: bool,

    /// Also write a machine-readable journal.json into the output directory
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Output directory (derived from the tracked filename when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write shell completions to stdout and exit
    #[arg(long, value_enum)]
    pub completions: Option<CompletionShell>,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

/// Supported completion targets for shell auto-completion.
#[derive(ValueEnum, Clone, Debug)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
    Nushell,
}

impl CompletionShell {
    fn write_to(&self, cmd: &mut clap::Command, buf: &mut dyn Write) {
        match self {
            CompletionShell::Bash => generate(Shell::Bash, cmd, BIN_NAME, buf),
            CompletionShell::Zsh => generate(Shell::Zsh, cmd, BIN_NAME, buf),
            CompletionShell::Fish => generate(Shell::Fish, cmd, BIN_NAME, buf),
            CompletionShell::PowerShell => generate(Shell::PowerShell, cmd, BIN_NAME, buf),
            CompletionShell::Elvish => generate(Shell::Elvish, cmd, BIN_NAME, buf),
            CompletionShell::Nushell => generate(Nushell, cmd, BIN_NAME, buf),
        }
    }
}

/// Emit the completion script for the requested shell on stdout.
pub fn write_completions(shell: &CompletionShell) {
    let mut cmd = Cli::command();
    shell.write_to(&mut cmd, &mut std::io::stdout());
}

impl Cli {
    /// Run the export against the repository enclosing the current directory.
    pub async fn run(&self) -> AppResult<()> {
        self.run_in(Path::new(".")).await
    }

    /// Full pipeline: list the file's commits, resolve a path per commit,
    /// export artifacts, and record every processed commit in the summary.
    #[tracing::instrument(name = "Exporting file history", level = "info", skip(self, root))]
    pub async fn run_in(&self, root: &Path) -> AppResult<()> {
        let source = RevisionSource::discover_from(root)?;
        let thresholds = Thresholds {
            rename: self.rename_threshold,
            copy: self.copy_threshold,
        };

        let commits = source.commits_touching(&self.filename, thresholds)?;

        let out_dir = match &self.output {
            Some(dir) => dir.clone(),
            None => export::default_output_dir(&self.filename),
        };
        fs::create_dir_all(&out_dir).await?;
        let mut summary = SummaryWriter::create(&out_dir.join("summary.txt")).await?;

        if commits.is_empty() {
            tracing_indicatif::indicatif_println!(
                "No commits touch {}; nothing to export",
                self.filename.display()
            );
            return Ok(());
        }
        info!(
            "Following {} through {} commits",
            self.filename.display(),
            commits.len()
        );

        let resolutions = source.follow_paths(&self.filename, &commits, thresholds)?;

        let renderer = Diff2Html::new();
        let mut html_enabled = self.html;
        let mut records: Vec<SummaryRecord> = Vec::with_capacity(commits.len());

        for (commit, resolution) in commits.iter().zip(&resolutions) {
            if resolution.ambiguous {
                warn!(
                    "Commit {} mentions {} more than once; keeping the last match",
                    commit.short_id,
                    resolution.path.display()
                );
            }

            let content = source.file_content(commit, &resolution.path);
            if content.is_none() {
                info!(
                    "{} is absent from commit {}; no content artifact",
                    resolution.path.display(),
                    commit.short_id
                );
            }
            let patch = match source.patch_text(commit, &resolution.path, thresholds) {
                Ok(patch) => {
                    if patch.is_none() {
                        debug!("Empty patch for commit {}; no patch artifact", commit.short_id);
                    }
                    patch
                }
                Err(e) => {
                    warn!("Patch generation failed for commit {}: {}", commit.short_id, e);
                    None
                }
            };

            let stem = export::artifact_stem(commit, &resolution.path);
            let mut artifact =
                export::write_revision(&out_dir, &stem, content.as_deref(), patch.as_deref())
                    .await?;

            if let Some(patch_text) = patch.as_deref()
                && let Some(html) =
                    render::render_patch(&renderer, &mut html_enabled, patch_text).await
            {
                artifact.html_file = Some(export::write_html(&out_dir, &stem, &html).await?);
            }

            let record = SummaryRecord::new(commit, &resolution.path, &artifact);
            summary.append(&record).await?;
            records.push(record);
        }

        if self.json {
            export::write_json(&out_dir.join("journal.json"), &records).await?;
        }
        tracing_indicatif::indicatif_println!(
            "Exported {} revisions of {} to {}",
            records.len(),
            self.filename.display(),
            out_dir.display()
        );
        Ok(())
    }
}
