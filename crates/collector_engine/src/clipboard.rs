use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard helper unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard write failed: {0}")]
    Write(String),
}

pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Copies text to the system clipboard in an OS-specific way:
/// - macOS: pbcopy
/// - Linux: xclip or xsel
/// - Windows: clip.exe
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        #[cfg(target_os = "macos")]
        {
            pipe_to(&["pbcopy"], text)
        }

        #[cfg(target_os = "linux")]
        {
            pipe_to(&["xclip", "-selection", "clipboard"], text)
                .or_else(|_| pipe_to(&["xsel", "--clipboard", "--input"], text))
        }

        #[cfg(target_os = "windows")]
        {
            pipe_to(&["clip.exe"], text)
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            let _ = text;
            Err(ClipboardError::Unavailable(
                "no clipboard helper on this platform".to_string(),
            ))
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
fn pipe_to(command: &[&str], text: &str) -> Result<(), ClipboardError> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new(command[0])
        .args(&command[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| ClipboardError::Unavailable(format!("failed to spawn {}: {err}", command[0])))?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|err| ClipboardError::Write(err.to_string()))?;
    }

    let status = child
        .wait()
        .map_err(|err| ClipboardError::Write(err.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(ClipboardError::Write(format!(
            "{} exited with {status}",
            command[0]
        )))
    }
}
