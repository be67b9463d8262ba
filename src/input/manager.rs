//! Input manager for handling different file types

use crate::error::{RelevanceError, Result};
use crate::input::file_detector::FileType;
use crate::input::text_extractor::{
    DocxExtractor, MarkdownExtractor, PdfExtractor, PlainTextExtractor, TextExtractor,
};
use log::info;
use std::path::Path;

/// Marker older extraction front-ends returned instead of failing
pub const UNSUPPORTED_FORMAT_SENTINEL: &str =
    "Unsupported file format. Please upload a PDF or DOCX file.";

const READ_ERROR_PREFIX: &str = "Error reading ";

/// Extracts text from documents on disk. Stateless: every call re-reads the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputManager;

impl InputManager {
    pub fn new() -> Self {
        Self
    }

    pub async fn extract_text(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(RelevanceError::DocumentExtraction(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let file_type = self.detect_file_type(path)?;

        let text = match file_type {
            FileType::Pdf => {
                info!("Extracting text from PDF: {}", path.display());
                PdfExtractor.extract(path).await?
            }
            FileType::Docx => {
                info!("Extracting text from DOCX: {}", path.display());
                DocxExtractor.extract(path).await?
            }
            FileType::Text => {
                info!("Reading plain text file: {}", path.display());
                PlainTextExtractor.extract(path).await?
            }
            FileType::Markdown => {
                info!("Processing markdown file: {}", path.display());
                MarkdownExtractor.extract(path).await?
            }
            FileType::Unknown => {
                return Err(RelevanceError::DocumentExtraction(format!(
                    "Unsupported file type for: {} (expected pdf, docx, txt or md)",
                    path.display()
                )));
            }
        };

        validate_document_text(&text).map_err(|e| match e {
            RelevanceError::DocumentExtraction(msg) => {
                RelevanceError::DocumentExtraction(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        Ok(text)
    }

    fn detect_file_type(&self, path: &Path) -> Result<FileType> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                RelevanceError::DocumentExtraction(format!(
                    "File has no extension: {}",
                    path.display()
                ))
            })?;

        Ok(FileType::from_extension(extension))
    }
}

/// Reject extraction output that must never be scored
pub fn validate_document_text(text: &str) -> Result<()> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RelevanceError::DocumentExtraction(
            "document contains no extractable text".to_string(),
        ));
    }
    if trimmed == UNSUPPORTED_FORMAT_SENTINEL || trimmed.starts_with(READ_ERROR_PREFIX) {
        return Err(RelevanceError::DocumentExtraction(format!(
            "extractor reported a failure instead of text: {}",
            trimmed
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_and_sentinels() {
        assert!(validate_document_text("   \n\t").is_err());
        assert!(validate_document_text(UNSUPPORTED_FORMAT_SENTINEL).is_err());
        assert!(validate_document_text("Error reading PDF file: broken xref").is_err());
        assert!(validate_document_text("Senior Python developer").is_ok());
    }

    #[tokio::test]
    async fn test_empty_text_file_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "  \n ").unwrap();

        let result = InputManager::new().extract_text(&path).await;
        assert!(matches!(result, Err(RelevanceError::DocumentExtraction(_))));
    }

    #[tokio::test]
    async fn test_missing_extension_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("resume");
        std::fs::write(&path, "python").unwrap();

        let result = InputManager::new().extract_text(&path).await;
        assert!(matches!(result, Err(RelevanceError::DocumentExtraction(_))));
    }
}
