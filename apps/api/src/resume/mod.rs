// Résumé ingestion: PDF → plain text.
// Uploaded bytes live only for the duration of the request; nothing touches disk.

pub mod handlers;

use bytes::Bytes;

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Canonical form of résumé text. Used both after extraction and as part of the interview
/// session's natural key, so it must be idempotent.
pub fn normalize_resume_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in unified.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            // at most one blank line between paragraphs
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

pub fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}

/// Extracts and normalizes the text layer of a PDF.
///
/// `pdf-extract` is CPU-bound, so it runs via `spawn_blocking`.
pub async fn extract_pdf_text(data: Bytes) -> Result<String, AppError> {
    if !is_pdf(&data) {
        return Err(AppError::UnsupportedMediaType(
            "only PDF résumés are supported".to_string(),
        ));
    }

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF extraction: {e}")))?
        .map_err(|e| AppError::Validation(format!("could not read PDF: {e}")))?;

    let normalized = normalize_resume_text(&text);
    if normalized.is_empty() {
        return Err(AppError::Validation(
            "the PDF contains no extractable text (is it a scanned image?)".to_string(),
        ));
    }
    Ok(normalized)
}
