//! Uploaded-file summarisation.
//!
//! Each upload becomes a short textual summary keyed by file extension. Extraction
//! problems are reported inside the summary text; nothing here returns an error.

use serde::Serialize;
use tracing::warn;

/// Heading placed before the joined file summaries.
pub const FILE_CONTEXT_HEADING: &str = "--- Additional Context from Uploaded Files ---";

const TEXT_PREVIEW_CHARS: usize = 1000;
const STRUCTURED_PREVIEW_CHARS: usize = 500;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContext {
    pub file_name: String,
    pub file_type: String,
    pub content: String,
}

/// Lowercased extension after the last `.`, or an empty string.
fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// First `max` chars of `text`, with `...` appended when anything was cut.
fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Summarises one upload by extension.
pub fn extract_file_context(file_name: &str, bytes: &[u8]) -> FileContext {
    let file_type = extension_of(file_name);

    let content = match file_type.as_str() {
        "pdf" => summarize_pdf(file_name, bytes),
        "txt" | "md" => format!(
            "Text File:\n{}",
            preview(&String::from_utf8_lossy(bytes), TEXT_PREVIEW_CHARS)
        ),
        "csv" => summarize_csv(&String::from_utf8_lossy(bytes)),
        "json" => summarize_json(bytes),
        "xml" => format!(
            "XML Data:\n{}",
            preview(&String::from_utf8_lossy(bytes), STRUCTURED_PREVIEW_CHARS)
        ),
        ext if IMAGE_EXTENSIONS.contains(&ext) => {
            format!("Image: {}, {file_name}", ext.to_uppercase())
        }
        other => format!("Unsupported file type: {other}"),
    };

    FileContext {
        file_name: file_name.to_string(),
        file_type,
        content,
    }
}

fn summarize_pdf(file_name: &str, bytes: &[u8]) -> String {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => format!("PDF Document:\n{}", preview(text.trim(), TEXT_PREVIEW_CHARS)),
        Err(e) => {
            warn!("PDF extraction failed for {file_name}: {e}");
            "PDF Document (Unable to extract text)".to_string()
        }
    }
}

fn summarize_csv(text: &str) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let columns = lines
        .first()
        .map(|header| {
            header
                .split(',')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    format!(
        "CSV Data:\nColumns: {columns}\nRows: {}",
        lines.len().saturating_sub(1)
    )
}

fn summarize_json(bytes: &[u8]) -> String {
    let pretty = serde_json::from_slice::<serde_json::Value>(bytes)
        .and_then(|value| serde_json::to_string_pretty(&value));

    match pretty {
        Ok(text) => format!("JSON Data:\n{}", preview(&text, STRUCTURED_PREVIEW_CHARS)),
        Err(_) => "Error: Invalid JSON format".to_string(),
    }
}

/// Joins summaries under `FILE_CONTEXT_HEADING`. Empty input yields an empty string so
/// the result can be appended to a prompt unconditionally.
pub fn format_file_context_for_prompt(contexts: &[FileContext]) -> String {
    if contexts.is_empty() {
        return String::new();
    }

    let body = contexts
        .iter()
        .map(|c| format!("File: {}\n{}", c.file_name, c.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("\n\n{FILE_CONTEXT_HEADING}\n\n{body}")
}
