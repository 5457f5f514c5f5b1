//! Tesseract-backed [`OcrEngine`].
//!
//! The engine shells out to the `tesseract` binary rather than linking
//! libtesseract, so a missing installation is a runtime condition
//! ([`OcrError::Unavailable`]) instead of a build failure.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use biodata_core::{OcrEngine, OcrError, OcrRequest};

const DEFAULT_COMMAND: &str = "tesseract";

/// Page segmentation mode 6: assume a single uniform block of text.
/// Biodata sheets are mostly one column of `Label: value` lines.
const PAGE_SEGMENTATION_MODE: &str = "6";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self {
            command: PathBuf::from(DEFAULT_COMMAND),
        }
    }
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit binary instead of resolving `tesseract` from `PATH`.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Build from configuration: `tesseract_cmd` if set, `PATH` lookup otherwise.
    pub fn from_settings(settings: &biodata_core::OcrSettings) -> Self {
        match &settings.tesseract_cmd {
            Some(cmd) => Self::with_command(cmd),
            None => Self::default(),
        }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    fn spawn_error(&self, e: std::io::Error) -> OcrError {
        if e.kind() == std::io::ErrorKind::NotFound {
            OcrError::Unavailable(format!("{} not found", self.command.display()))
        } else {
            OcrError::Unavailable(format!("cannot start {}: {e}", self.command.display()))
        }
    }
}

/// Drain a child pipe on its own thread so a chatty process cannot block on a
/// full pipe while we poll for exit.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Wait for `child` until `deadline`, killing it if the deadline passes.
/// Returns `None` on timeout.
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Tesseract reports a missing traineddata file on stderr and exits non-zero.
fn is_missing_language(stderr: &str) -> bool {
    stderr.contains("Failed loading language") || stderr.contains("Error opening data file")
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn probe(&self) -> Result<(), OcrError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(OcrError::Unavailable(format!(
                "{} --version exited with {}",
                self.command.display(),
                output.status
            )));
        }
        Ok(())
    }

    fn recognize(&self, image: &Path, request: &OcrRequest<'_>) -> Result<String, OcrError> {
        let started = Instant::now();
        let deadline = started + request.timeout;

        let mut child = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(request.language)
            .arg("--psm")
            .arg(PAGE_SEGMENTATION_MODE)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let Some(status) = wait_until(&mut child, deadline)? else {
            // A process the engine spawned may still hold the pipes open, so
            // the drain threads are left to finish on their own.
            tracing::warn!(image = %image.display(), timeout = ?request.timeout, "tesseract killed after timeout");
            return Err(OcrError::TimedOut(request.timeout));
        };
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        let stderr = String::from_utf8_lossy(&stderr);
        if !status.success() {
            let message = stderr.trim().to_string();
            if is_missing_language(&message) {
                return Err(OcrError::Unavailable(format!(
                    "language '{}' not installed: {message}",
                    request.language
                )));
            }
            return Err(OcrError::Engine(message));
        }

        tracing::debug!(
            image = %image.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = stdout.len(),
            "tesseract finished"
        );
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(timeout: Duration) -> OcrRequest<'static> {
        OcrRequest {
            language: "eng",
            timeout,
        }
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let engine = TesseractEngine::with_command("/nonexistent/bin/tesseract-xyz");
        assert!(matches!(engine.probe(), Err(OcrError::Unavailable(_))));

        let err = engine
            .recognize(Path::new("page.png"), &request(Duration::from_secs(1)))
            .unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }

    #[test]
    fn settings_select_command() {
        let settings = biodata_core::OcrSettings {
            tesseract_cmd: Some(PathBuf::from("/opt/tesseract/bin/tesseract")),
            ..Default::default()
        };
        let engine = TesseractEngine::from_settings(&settings);
        assert_eq!(engine.command(), Path::new("/opt/tesseract/bin/tesseract"));
        assert_eq!(
            TesseractEngine::from_settings(&Default::default()).command(),
            Path::new("tesseract")
        );
    }

    #[test]
    fn missing_language_detection() {
        assert!(is_missing_language(
            "Error opening data file /usr/share/tessdata/xyz.traineddata\nFailed loading language 'xyz'"
        ));
        assert!(!is_missing_language("Warning: Invalid resolution 0 dpi."));
    }

    // `sh` runs the "image" path as a script, which stands in for tesseract.
    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-page.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn stdout_becomes_text() {
        let dir = tempfile::tempdir().unwrap();
        let page = script(dir.path(), "echo 'Name: Ravi Kumar'\necho 'Age: 31'\n");
        let engine = TesseractEngine::with_command("sh");
        let text = engine
            .recognize(&page, &request(Duration::from_secs(10)))
            .unwrap();
        assert_eq!(text, "Name: Ravi Kumar\nAge: 31\n");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let page = script(dir.path(), "echo 'cannot read image' >&2\nexit 1\n");
        let engine = TesseractEngine::with_command("sh");
        let err = engine
            .recognize(&page, &request(Duration::from_secs(10)))
            .unwrap_err();
        assert!(matches!(err, OcrError::Engine(ref m) if m.contains("cannot read image")));
    }

    #[cfg(unix)]
    #[test]
    fn slow_engine_is_killed_at_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let page = script(dir.path(), "exec sleep 30\n");
        let engine = TesseractEngine::with_command("sh");
        let started = Instant::now();
        let err = engine
            .recognize(&page, &request(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, OcrError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_does_not_wait_for_inherited_pipes() {
        let dir = tempfile::tempdir().unwrap();
        // The background sleep outlives the killed engine and keeps stdout open.
        let page = script(dir.path(), "sleep 30 &\nexec sleep 30\n");
        let engine = TesseractEngine::with_command("sh");
        let started = Instant::now();
        let err = engine
            .recognize(&page, &request(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, OcrError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
