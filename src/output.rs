use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::registry::JobEntry;

pub const JOBS_CSV: &str = "jobs.csv";

/// Folder name for a category page: its last path segment.
pub fn category_name(url: &str) -> &str {
    let trimmed = url.strip_suffix('/').unwrap_or(url);
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Document name for a posting: the second-to-last path segment, since
/// posting URLs end in `/`.
pub fn job_name(url: &str) -> Option<&str> {
    url.rsplit('/').nth(1).filter(|s| !s.is_empty())
}

/// `{out}/{category}/{job}.docx`
pub fn document_path(out_dir: &Path, category: &str, job: &str) -> PathBuf {
    out_dir.join(category).join(format!("{}.docx", job))
}

/// Make sure every category has a folder. Existing folders are fine; a folder
/// that cannot be created is logged and left for the conversion step to trip
/// over.
pub fn ensure_folders(out_dir: &Path, categories: &[String]) {
    for url in categories {
        let name = category_name(url);
        let dir = out_dir.join(name);
        if dir.is_dir() {
            info!("Folder {} already exists", name);
            continue;
        }
        match fs::create_dir_all(&dir) {
            Ok(()) => info!("Folder {} created", name),
            Err(e) => warn!("Failed to create folder {}: {}", dir.display(), e),
        }
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_field<W: Write>(w: &mut W, field: &str) -> io::Result<()> {
    if needs_quotes(field) {
        write!(w, "\"{}\"", field.replace('"', "\"\""))
    } else {
        write!(w, "{}", field)
    }
}

/// Write the accepted postings as `Category,url` rows, registry order.
pub fn write_jobs_csv<W: Write>(w: W, entries: &[JobEntry]) -> io::Result<()> {
    let mut w = BufWriter::new(w);
    writeln!(w, "Category,url")?;
    for entry in entries {
        write_field(&mut w, &entry.category)?;
        write!(w, ",")?;
        write_field(&mut w, &entry.url)?;
        writeln!(w)?;
    }
    w.flush()
}

pub fn save_jobs_csv(out_dir: &Path, entries: &[JobEntry]) -> io::Result<PathBuf> {
    let path = out_dir.join(JOBS_CSV);
    let file = fs::File::create(&path)?;
    write_jobs_csv(file, entries)?;
    Ok(path)
}

// ── Tests ──
