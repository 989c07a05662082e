pub mod docx;
pub mod pandoc;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};

pub use self::docx::DocxRenderer;
pub use self::pandoc::PandocRenderer;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unsupported content: {0}")]
    Unsupported(String),
    #[error("failed to build document: {0}")]
    Render(String),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{program} failed: {detail}")]
    Program { program: String, detail: String },
}

/// Both strategies gave up on a posting.
#[derive(Debug, Error)]
#[error("primary: {primary}; fallback: {fallback}")]
pub struct ConversionFailed {
    pub primary: ConvertError,
    pub fallback: ConvertError,
}

/// Which strategy produced the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Primary,
    Fallback,
}

/// Turns an HTML fragment into a complete document held in memory.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;
    fn render(&self, html: &str, title: &str) -> Result<Vec<u8>, ConvertError>;
}

/// HTML → document file, primary strategy first, fallback only when the
/// primary errors.
pub struct DocumentConverter {
    primary: Box<dyn Renderer>,
    fallback: Box<dyn Renderer>,
}

impl DocumentConverter {
    pub fn new(primary: Box<dyn Renderer>, fallback: Box<dyn Renderer>) -> Self {
        Self { primary, fallback }
    }

    /// docx-rs translation, falling back to pandoc.
    pub fn standard() -> Self {
        Self::new(Box::new(DocxRenderer), Box::new(PandocRenderer::default()))
    }

    pub fn convert(&self, html: &str, title: &str, path: &Path) -> Result<Conversion, ConversionFailed> {
        let primary = match write_with(self.primary.as_ref(), html, title, path) {
            Ok(()) => {
                info!("{} created ({})", path.display(), self.primary.name());
                return Ok(Conversion::Primary);
            }
            Err(e) => e,
        };
        debug!(
            "{} converter failed for {}: {}; retrying with {}",
            self.primary.name(),
            title,
            primary,
            self.fallback.name()
        );

        match write_with(self.fallback.as_ref(), html, title, path) {
            Ok(()) => {
                info!("Fallback retry success: {} created ({})", path.display(), self.fallback.name());
                Ok(Conversion::Fallback)
            }
            Err(fallback) => {
                error!("Fallback converter also failed for {}: {}", title, fallback);
                Err(ConversionFailed { primary, fallback })
            }
        }
    }
}

// The whole document is rendered before the file is touched, and the write
// truncates, so a failed render leaves nothing behind and a retry overwrites.
fn write_with(renderer: &dyn Renderer, html: &str, title: &str, path: &Path) -> Result<(), ConvertError> {
    let bytes = renderer.render(html, title)?;
    fs::write(path, bytes).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ──
