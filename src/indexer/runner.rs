//! Run a SCIP indexer against a project.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::Language;
use super::download::IndexerManager;
use super::error::IndexerError;
use super::registry::indexer_for;

/// Command-line arguments for an indexer run.
pub fn indexer_args(language: Language, project_dir: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    match language {
        Language::Go => {
            for flag in ["--project-root", "--module-root", "--repository-root"] {
                args.push(flag.into());
                args.push(project_dir.into());
            }
            args.push("--skip-tests".into());
        }
        Language::TypeScript | Language::Python | Language::Java => {
            args.push("index".into());
        }
    }
    args.push("--output".into());
    args.push(output.into());
    args
}

impl IndexerManager {
    /// Index `project_dir` with the `language` indexer, writing a SCIP file to `output`.
    ///
    /// Stdout and stderr are captured into one buffer, line by line in arrival
    /// order, and returned in the error on failure.
    pub async fn run_indexer(
        &self,
        language: Language,
        project_dir: &Path,
        output: &Path,
    ) -> Result<(), IndexerError> {
        let binary = self.ensure_indexer(language).await?;
        let pinned = indexer_for(language)?;

        // The indexer runs inside the project, so relative paths must be pinned first
        let project_dir = std::path::absolute(project_dir)?;
        let output = std::path::absolute(output)?;
        let args = indexer_args(language, &project_dir, &output);

        info!(indexer = pinned.name, project = %project_dir.display(), output = %output.display(), "running indexer");
        debug!(binary = %binary.display(), ?args, "indexer command");

        let mut child = Command::new(&binary)
            .args(&args)
            .current_dir(&project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut combined = String::new();
        while let Some(line) = rx.recv().await {
            combined.push_str(&line);
        }
        let status = child.wait().await?;

        if !status.success() {
            return Err(IndexerError::IndexerFailed {
                indexer: pinned.name.to_string(),
                status: status.to_string(),
                output: combined,
            });
        }

        debug!(indexer = pinned.name, output_len = combined.len(), "indexer finished");
        Ok(())
    }
}

/// Send each line of `reader` (newline kept) until EOF or the receiver is gone.
async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                    break;
                }
            }
        }
    }
}
