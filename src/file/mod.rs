// src/file/mod.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

/// A document picked by the user, held in memory until it is submitted.
/// Replaced wholesale on a new selection; nothing is persisted.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Preview shown under the file picker: the first 500 characters.
    pub fn preview(&self) -> String {
        const PREVIEW_CHARS: usize = 500;
        if self.content.chars().count() > PREVIEW_CHARS {
            let cut: String = self.content.chars().take(PREVIEW_CHARS).collect();
            format!("{cut}...")
        } else {
            self.content.clone()
        }
    }
}

/// File extensions offered by the picker.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["txt", "md", "json", "csv"];

pub fn load_document(path: &Path) -> Result<Document> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let size_bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(content.len() as u64);

    Ok(Document {
        mime_type: mime_for_path(path).to_string(),
        content,
        name,
        size_bytes,
        uploaded_at: Utc::now(),
    })
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}
