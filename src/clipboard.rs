//! Clipboard writer with a terminal fallback.
//!
//! The native backend shells out to the platform clipboard tool. When that
//! fails the text is handed to the terminal via an OSC 52 escape sequence.
//! Either way the user gets a success toast; a failing fallback is only logged.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use base64::Engine;
use thiserror::Error;

use crate::notify::{ToastCategory, Toaster};

/// Toast shown after every copy.
pub const COPIED_MESSAGE: &str = "Copied to clipboard!";

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Clipboard write failed: {0}")]
    WriteFailed(String),
}

/// Something that can take text onto the clipboard.
pub trait ClipboardBackend: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Platform clipboard commands: `pbcopy`, `xclip`/`xsel`, `clip`.
pub struct SystemClipboard;

/// Clipboard commands to try in order, as argv.
#[cfg(target_os = "macos")]
const CLIPBOARD_COMMANDS: &[&[&str]] = &[&["pbcopy"]];

#[cfg(target_os = "windows")]
const CLIPBOARD_COMMANDS: &[&[&str]] = &[&["clip"]];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CLIPBOARD_COMMANDS: &[&[&str]] = &[
    &["xclip", "-selection", "clipboard"],
    &["xsel", "--clipboard", "--input"],
];

impl SystemClipboard {
    fn pipe_to(program: &str, args: &[&str], text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipboardError::Unavailable(format!("{}: {}", program, e)))?;

        // stdin drops with its match arm, so the child sees EOF before `wait`.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        if written.is_err() {
            let _ = child.kill();
        }
        // Always reap the child, including after a failed write.
        let status = child.wait();

        written.map_err(|e| ClipboardError::WriteFailed(format!("{}: {}", program, e)))?;
        let status =
            status.map_err(|e| ClipboardError::WriteFailed(format!("{}: {}", program, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::WriteFailed(format!("{} exited with {}", program, status)))
        }
    }
}

impl ClipboardBackend for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut last_err = ClipboardError::Unavailable("no clipboard command".to_string());
        for argv in CLIPBOARD_COMMANDS {
            let Some((program, args)) = argv.split_first() else {
                continue;
            };
            match Self::pipe_to(program, args, text) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::debug!("Clipboard command failed: {}", e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

/// Legacy copy: the OSC 52 escape sequence, understood by most terminal
/// emulators (including over SSH).
pub struct TerminalClipboard;

impl TerminalClipboard {
    /// The escape sequence carrying `text`; this is the off-screen holder.
    pub fn sequence(text: &str) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        format!("\x1b]52;c;{}\x07", payload)
    }
}

impl ClipboardBackend for TerminalClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let holder = Self::sequence(text);
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(holder.as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(|e| ClipboardError::WriteFailed(e.to_string()))
    }
}

/// Copies text and reports success through the toaster.
pub struct ClipboardWriter {
    native: Arc<dyn ClipboardBackend>,
    fallback: Arc<dyn ClipboardBackend>,
    toaster: Arc<Toaster>,
}

impl ClipboardWriter {
    pub fn new(
        native: Arc<dyn ClipboardBackend>,
        fallback: Arc<dyn ClipboardBackend>,
        toaster: Arc<Toaster>,
    ) -> Self {
        Self {
            native,
            fallback,
            toaster,
        }
    }

    /// System clipboard first, terminal escape as fallback.
    pub fn system(toaster: Arc<Toaster>) -> Self {
        Self::new(Arc::new(SystemClipboard), Arc::new(TerminalClipboard), toaster)
    }

    /// Copy `text`. Never fails; a success toast is always presented.
    pub async fn copy(&self, text: &str) {
        let native = Arc::clone(&self.native);
        let owned = text.to_string();
        let result = tokio::task::spawn_blocking(move || native.write_text(&owned)).await;

        let native_err = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(format!("clipboard task failed: {}", e)),
        };

        if let Some(reason) = native_err {
            log::warn!("Native clipboard failed ({}), using fallback", reason);
            if let Err(e) = self.fallback.write_text(text) {
                // TODO: surface double failure once the product decides on wording.
                log::debug!("Clipboard fallback failed: {}", e);
            }
        }

        self.toaster.present(COPIED_MESSAGE, ToastCategory::Success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::tests::{RecordingSink, SinkEvent};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        fail: bool,
        written: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn written(&self) -> Vec<String> {
            self.written.lock().unwrap().clone()
        }
    }

    impl ClipboardBackend for FakeBackend {
        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable("denied".into()));
            }
            self.written.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn writer(
        native: Arc<FakeBackend>,
        fallback: Arc<FakeBackend>,
    ) -> (ClipboardWriter, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let toaster = Arc::new(Toaster::new(sink.clone()));
        (ClipboardWriter::new(native, fallback, toaster), sink)
    }

    #[tokio::test]
    async fn test_native_success_skips_fallback() {
        let native = Arc::new(FakeBackend::default());
        let fallback = Arc::new(FakeBackend::default());
        let (writer, sink) = writer(native.clone(), fallback.clone());

        writer.copy("hello").await;

        assert_eq!(native.written(), vec!["hello".to_string()]);
        assert!(fallback.written().is_empty());
        assert_eq!(
            sink.events(),
            vec![SinkEvent::Show(COPIED_MESSAGE.into(), ToastCategory::Success)]
        );
    }

    #[tokio::test]
    async fn test_native_failure_uses_fallback_and_still_reports_success() {
        let native = Arc::new(FakeBackend::failing());
        let fallback = Arc::new(FakeBackend::default());
        let (writer, sink) = writer(native, fallback.clone());

        writer.copy("secret").await;

        assert_eq!(fallback.written(), vec!["secret".to_string()]);
        assert_eq!(sink.shows(), 1);
        assert_eq!(
            sink.events()[0],
            SinkEvent::Show(COPIED_MESSAGE.into(), ToastCategory::Success)
        );
    }

    #[tokio::test]
    async fn test_double_failure_is_silent() {
        let (writer, sink) = writer(
            Arc::new(FakeBackend::failing()),
            Arc::new(FakeBackend::failing()),
        );

        writer.copy("lost").await;

        assert_eq!(sink.shows(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_pipe_to_reports_command_output_status() {
        assert!(SystemClipboard::pipe_to("cat", &[], "hello").is_ok());
        assert!(matches!(
            SystemClipboard::pipe_to("false", &[], "hello"),
            Err(ClipboardError::WriteFailed(_))
        ));
        assert!(matches!(
            SystemClipboard::pipe_to("definitely-not-a-clipboard-tool", &[], "hello"),
            Err(ClipboardError::Unavailable(_))
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_child_is_reaped_when_it_stops_reading() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let pid_arg = pid_file.to_str().unwrap();

        // Larger than a pipe buffer, so the write fails once the child exits.
        let text = "x".repeat(1 << 20);
        let result = SystemClipboard::pipe_to(
            "sh",
            &["-c", "echo $$ > \"$1\"", "sh", pid_arg],
            &text,
        );
        assert!(matches!(result, Err(ClipboardError::WriteFailed(_))));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let proc_entry = std::path::PathBuf::from(format!("/proc/{}", pid.trim()));
        assert!(!proc_entry.exists(), "child {} left as a zombie", pid.trim());
    }

    #[test]
    fn test_osc52_sequence() {
        assert_eq!(TerminalClipboard::sequence("hi"), "\x1b]52;c;aGk=\x07");
    }
}
