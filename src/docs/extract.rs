use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{Result, TutorError};

/// Upper bound on excerpt size, in characters, to keep prompts small.
pub const MAX_EXCERPT_CHARS: usize = 5000;

/// Extract a bounded plain-text excerpt from PDF bytes.
///
/// Pages are read in order. A page whose text cannot be extracted contributes
/// nothing; only a document that fails to load is an error.
pub fn extract_pdf_text(pdf_bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(pdf_bytes)
        .map_err(|e| TutorError::Extraction(format!("failed to parse PDF: {e}")))?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), size = pdf_bytes.len(), "PDF loaded");

    let texts = pages.keys().map(|&page_number| {
        match doc.extract_text(&[page_number]) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(page_number, error = %e, "No text extracted from page");
                None
            }
        }
    });

    Ok(assemble_excerpt(texts))
}

/// Concatenate page texts and cut the result to [`MAX_EXCERPT_CHARS`].
pub fn assemble_excerpt<I>(pages: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut text = String::new();
    for page in pages {
        text.push_str(page.as_deref().unwrap_or(""));
        if text.chars().count() > MAX_EXCERPT_CHARS {
            break;
        }
    }
    truncate_chars(&text, MAX_EXCERPT_CHARS).to_string()
}

/// Longest prefix of `s` holding at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object};

    fn blank_pdf(page_count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..page_count)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_invalid_pdf_is_extraction_error() {
        let err = extract_pdf_text(b"This is not a PDF").unwrap_err();
        assert!(matches!(err, TutorError::Extraction(_)));
    }

    #[test]
    fn test_pages_without_text_yield_empty_excerpt() {
        let text = extract_pdf_text(&blank_pdf(3)).unwrap();
        assert!(text.trim().is_empty());
    }

    #[test]
    fn test_pages_concatenate_in_order() {
        let pages = vec![
            Some("Graphs ".to_string()),
            None,
            Some("are sets of vertices.".to_string()),
        ];
        assert_eq!(assemble_excerpt(pages), "Graphs are sets of vertices.");
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let page = "x".repeat(1800);
        let pages = (0..10).map(|_| Some(page.clone()));
        let text = assemble_excerpt(pages);
        assert_eq!(text.chars().count(), MAX_EXCERPT_CHARS);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "é".repeat(MAX_EXCERPT_CHARS + 10);
        let cut = truncate_chars(&s, MAX_EXCERPT_CHARS);
        assert_eq!(cut.chars().count(), MAX_EXCERPT_CHARS);
        assert_eq!(truncate_chars("short", MAX_EXCERPT_CHARS), "short");
    }
}
