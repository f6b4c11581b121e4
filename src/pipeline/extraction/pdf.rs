use super::ExtractionError;

/// Text layer of a digital PDF, pages joined by blank lines.
///
/// Scanned PDFs have no text layer and come back (nearly) empty; the
/// minimum-length check downstream turns that into an insufficient-text
/// failure rather than an empty success.
pub fn extract_pdf_text(pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

    let text = pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    tracing::debug!(page_count = pages.len(), text_len = text.len(), "PDF text layer read");
    Ok(text)
}
