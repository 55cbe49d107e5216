use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::AppResult;

/// What came out of a render attempt. Unavailability of the renderer itself
/// is reported distinctly from an empty rendering so the caller can fall
/// back to patch-only mode with a single notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(String),
    Empty,
    Unavailable,
}

/// A capability that turns patch text into an HTML diff. Kept behind a trait
/// so the pipeline can run against a stand-in and so the external tool's
/// absence never blocks anything.
pub trait PatchRenderer {
    fn render(&self, patch: &str) -> impl Future<Output = AppResult<RenderOutcome>> + Send;
}

/// Renders through the external `diff2html` binary, feeding the patch on
/// stdin and collecting HTML from stdout.
pub struct Diff2Html {
    program: String,
    args: Vec<String>,
}

impl Diff2Html {
    pub fn new() -> Self {
        Diff2Html {
            program: "diff2html".to_string(),
            args: ["-i", "stdin", "-o", "stdout"]
                .map(String::from)
                .to_vec(),
        }
    }

    #[cfg(test)]
    fn with_program(program: &str) -> Self {
        Diff2Html {
            program: program.to_string(),
            args: Vec::new(),
        }
    }
}

impl PatchRenderer for Diff2Html {
    async fn render(&self, patch: &str) -> AppResult<RenderOutcome> {
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RenderOutcome::Unavailable);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(mut stdin) = child.stdin.take() {
            // A renderer that exits early closes the pipe; its own output
            // decides the outcome, so a failed write is not fatal.
            if let Err(e) = stdin.write_all(patch.as_bytes()).await {
                debug!("Failed writing the patch to {}: {}", self.program, e);
            }
            // Dropping stdin closes the pipe so the child can finish.
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            debug!("{} exited with {}", self.program, output.status);
            return Ok(RenderOutcome::Empty);
        }

        let html = String::from_utf8_lossy(&output.stdout);
        if html.trim().is_empty() {
            Ok(RenderOutcome::Empty)
        } else {
            Ok(RenderOutcome::Rendered(html.into_owned()))
        }
    }
}

/// Render one patch when HTML output is enabled. A renderer reported
/// unavailable disables HTML for the remainder of the run after a single
/// notice; rendering failures are logged and never propagate.
pub async fn render_patch<R: PatchRenderer>(
    renderer: &R,
    enabled: &mut bool,
    patch: &str,
) -> Option<String> {
    if !*enabled {
        return None;
    }
    match renderer.render(patch).await {
        Ok(RenderOutcome::Rendered(html)) => Some(html),
        Ok(RenderOutcome::Empty) => {
            debug!("Renderer produced no output; skipping the HTML artifact");
            None
        }
        Ok(RenderOutcome::Unavailable) => {
            warn!("HTML renderer not found; continuing in patch-only mode");
            *enabled = false;
            None
        }
        Err(e) => {
            warn!("HTML rendering failed: {}", e);
            None
        }
    }
}
