use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use super::{ConvertError, Renderer};

/// Fallback strategy: hand the markup to pandoc and keep whatever .docx it
/// writes to stdout.
pub struct PandocRenderer {
    program: PathBuf,
}

impl Default for PandocRenderer {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl PandocRenderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Whether the program resolves to an executable, either as a path or
    /// on `PATH`.
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn failure(&self, detail: impl ToString) -> ConvertError {
        ConvertError::Program {
            program: display_name(&self.program),
            detail: detail.to_string(),
        }
    }
}

fn display_name(program: &Path) -> String {
    program.display().to_string()
}

impl Renderer for PandocRenderer {
    fn name(&self) -> &'static str {
        "pandoc"
    }

    fn render(&self, html: &str, title: &str) -> Result<Vec<u8>, ConvertError> {
        let mut child = Command::new(&self.program)
            .args(["-f", "html", "-t", "docx", "-o", "-", "--metadata"])
            .arg(format!("title={}", title))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(e))?;

        // Feed stdin from another thread so a large document can't deadlock
        // against a full stdout pipe.
        let mut stdin = child.stdin.take().ok_or_else(|| self.failure("stdin not captured"))?;
        let input = html.to_owned();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output().map_err(|e| self.failure(e))?;
        let written = writer.join();

        // A program that dies early also breaks the stdin pipe; its exit
        // status and stderr say why.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("{}: {}", output.status, stderr.trim())));
        }
        written
            .map_err(|_| self.failure("stdin writer panicked"))?
            .map_err(|e| self.failure(format!("writing stdin: {}", e)))?;
        if output.stdout.is_empty() {
            return Err(self.failure("produced no output"));
        }
        Ok(output.stdout)
    }
}

// ── Tests ──
