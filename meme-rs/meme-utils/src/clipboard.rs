//! Copies meme links to the system clipboard when a copy tool is installed.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Clipboard executables tried in order.
pub const CLIPBOARD_COMMANDS: &[&str] = &["/usr/bin/pbcopy", "/usr/bin/xclip"];

/// Returns the first candidate that exists on disk.
pub fn find_clipboard<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    for candidate in candidates {
        let path = candidate.as_ref();
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }
    None
}

/// Writes `text` to the first available clipboard tool.
///
/// Returns `Ok(false)` when no tool is installed.
pub fn paste(text: &str) -> io::Result<bool> {
    match find_clipboard(CLIPBOARD_COMMANDS) {
        Some(command) => {
            pipe_to(&command, text)?;
            Ok(true)
        }
        None => {
            tracing::debug!("no clipboard tool found");
            Ok(false)
        }
    }
}

fn pipe_to(command: &Path, text: &str) -> io::Result<()> {
    let mut child = Command::new(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }

    let status = child.wait()?;
    tracing::debug!(command = %command.display(), %status, "copied link to clipboard");
    Ok(())
}
