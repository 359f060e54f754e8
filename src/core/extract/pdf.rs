//! PDF page text via `pdf_oxide`.

use super::ExtractError;

#[cfg(feature = "pdf")]
pub(super) fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    use std::io::Write;

    use pdf_oxide::PdfDocument;

    // pdf_oxide opens documents from a path.
    let mut temp_file = tempfile::NamedTempFile::new().map_err(|e| {
        ExtractError::ExtractionFailed(format!("failed to create temp file: {e}"))
    })?;
    temp_file
        .write_all(bytes)
        .map_err(|e| ExtractError::ExtractionFailed(format!("failed to write temp file: {e}")))?;

    let mut doc = PdfDocument::open(temp_file.path())
        .map_err(|e| ExtractError::ExtractionFailed(format!("failed to parse PDF: {e}")))?;

    let page_count = doc.page_count().map_err(|e| {
        ExtractError::ExtractionFailed(format!("failed to read page count: {e}"))
    })?;

    let mut pages = Vec::with_capacity(page_count);
    for page_index in 0..page_count {
        let text = doc.extract_text(page_index).map_err(|e| {
            ExtractError::ExtractionFailed(format!(
                "failed to extract page {}: {e}",
                page_index + 1
            ))
        })?;
        pages.push(text);
    }

    tracing::debug!(page_count, "PDF text extraction complete");
    Ok(pages)
}

#[cfg(not(feature = "pdf"))]
pub(super) fn extract_pages(_bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    Err(ExtractError::MissingDependency {
        format: "pdf",
        feature: "pdf",
    })
}
