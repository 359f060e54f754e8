//! Word paragraph text from Office Open XML packages.
//!
//! The package is a zip archive; the body lives in `word/document.xml`. Each
//! WordprocessingML `w:p` element is one paragraph. Its text is the
//! concatenation of the `w:t` runs it contains, with `w:tab` rendered as a tab
//! and `w:br`/`w:cr` as a line break when they appear inside a `w:r` run.
//! Elements are matched by namespace, so DrawingML `a:p`/`a:t` are not text.
//! Nested paragraphs (text boxes) are emitted as their own paragraphs when
//! they close. `mc:Fallback` content is skipped, since it repeats the
//! `mc:Choice` branch.

use super::ExtractError;

#[cfg(feature = "docx")]
const DOCUMENT_PART: &str = "word/document.xml";

#[cfg(feature = "docx")]
const WORDPROCESSING_NS: &[u8] = b"http://schemas.openxmlformats.org/wordprocessingml/2006/main";

#[cfg(feature = "docx")]
const MARKUP_COMPATIBILITY_NS: &[u8] =
    b"http://schemas.openxmlformats.org/markup-compatibility/2006";

#[cfg(feature = "docx")]
pub(super) fn extract_paragraphs(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    use std::io::{Cursor, Read};

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        ExtractError::ExtractionFailed(format!("not an Office Open XML package: {e}"))
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::ExtractionFailed(format!("missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::ExtractionFailed(format!("failed to read {DOCUMENT_PART}: {e}")))?;

    paragraphs_from_xml(&xml)
}

/// Elements the extractor reacts to.
#[cfg(feature = "docx")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Paragraph,
    Run,
    Text,
    Tab,
    Break,
    Fallback,
    Other,
}

#[cfg(feature = "docx")]
impl Element {
    fn classify(namespace: &quick_xml::name::ResolveResult<'_>, local_name: &[u8]) -> Self {
        use quick_xml::name::{Namespace, ResolveResult};

        match namespace {
            ResolveResult::Bound(Namespace(uri)) if *uri == WORDPROCESSING_NS => match local_name {
                b"p" => Self::Paragraph,
                b"r" => Self::Run,
                b"t" => Self::Text,
                b"tab" => Self::Tab,
                b"br" | b"cr" => Self::Break,
                _ => Self::Other,
            },
            ResolveResult::Bound(Namespace(uri))
                if *uri == MARKUP_COMPATIBILITY_NS && local_name == b"Fallback" =>
            {
                Self::Fallback
            }
            _ => Self::Other,
        }
    }
}

#[cfg(feature = "docx")]
pub(super) fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractError> {
    use quick_xml::NsReader;
    use quick_xml::events::Event;

    let mut reader = NsReader::from_str(xml);
    let mut paragraphs = Vec::new();
    // Open paragraphs, innermost last.
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;
    // Depth of open `mc:Fallback` elements; their content is ignored.
    let mut fallback_depth = 0usize;

    loop {
        let (namespace, event) = reader.read_resolved_event().map_err(|e| {
            ExtractError::ExtractionFailed(format!("malformed document XML: {e}"))
        })?;

        match event {
            Event::Start(e) => {
                let element = Element::classify(&namespace, e.local_name().as_ref());
                if element == Element::Fallback {
                    fallback_depth += 1;
                } else if fallback_depth == 0 {
                    match element {
                        Element::Paragraph => open.push(String::new()),
                        Element::Run => run_depth += 1,
                        Element::Text => in_text = run_depth > 0,
                        _ => {}
                    }
                }
            }
            Event::Empty(e) if fallback_depth == 0 => {
                match Element::classify(&namespace, e.local_name().as_ref()) {
                    Element::Paragraph => paragraphs.push(String::new()),
                    Element::Tab if run_depth > 0 => push_to_current(&mut open, "\t"),
                    Element::Break if run_depth > 0 => push_to_current(&mut open, "\n"),
                    _ => {}
                }
            }
            Event::End(e) => {
                let element = Element::classify(&namespace, e.local_name().as_ref());
                if element == Element::Fallback {
                    fallback_depth = fallback_depth.saturating_sub(1);
                } else if fallback_depth == 0 {
                    match element {
                        Element::Paragraph => {
                            if let Some(paragraph) = open.pop() {
                                paragraphs.push(paragraph);
                            }
                        }
                        Element::Run => run_depth = run_depth.saturating_sub(1),
                        Element::Text => in_text = false,
                        _ => {}
                    }
                }
            }
            Event::Text(text) if in_text && fallback_depth == 0 => {
                let unescaped = text.unescape().map_err(|e| {
                    ExtractError::ExtractionFailed(format!("invalid text escape: {e}"))
                })?;
                push_to_current(&mut open, &unescaped);
            }
            Event::CData(data) if in_text && fallback_depth == 0 => {
                push_to_current(&mut open, &String::from_utf8_lossy(&data));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(feature = "docx")]
fn push_to_current(open: &mut [String], text: &str) {
    if let Some(current) = open.last_mut() {
        current.push_str(text);
    }
}

#[cfg(not(feature = "docx"))]
pub(super) fn extract_paragraphs(_bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    Err(ExtractError::MissingDependency {
        format: "docx",
        feature: "docx",
    })
}

#[cfg(all(test, feature = "docx"))]
mod tests {
    use super::*;
    use crate::core::extract::{ExtractError, extract};
    use std::io::{Cursor, Write};

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn document_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn docx_bytes(body: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(document_xml(body).as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_joined_with_newlines() {
        let bytes = docx_bytes(
            "<w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Second</w:t></w:r><w:r><w:t xml:space=\"preserve\"> paragraph.</w:t></w:r></w:p>",
        );
        let text = extract(&bytes, "docx").unwrap();
        assert_eq!(text, "First paragraph.\nSecond paragraph.\n");
    }

    #[test]
    fn test_empty_paragraph_still_yields_newline() {
        let bytes = docx_bytes("<w:p><w:r><w:t>a</w:t></w:r></w:p><w:p/><w:p></w:p><w:p><w:r><w:t>b</w:t></w:r></w:p>");
        assert_eq!(extract(&bytes, "docx").unwrap(), "a\n\n\nb\n");
    }

    #[test]
    fn test_tabs_breaks_and_entities() {
        let xml = document_xml(
            "<w:p><w:r><w:t>Q&amp;A</w:t><w:tab/><w:t>x</w:t><w:br/><w:t>y</w:t></w:r></w:p>",
        );
        let paragraphs = paragraphs_from_xml(&xml).unwrap();
        assert_eq!(paragraphs, vec!["Q&A\tx\ny".to_string()]);
    }

    #[test]
    fn test_text_outside_runs_is_ignored() {
        let xml = document_xml("<w:p><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr>ignored<w:r><w:t>kept</w:t></w:r></w:p>");
        assert_eq!(paragraphs_from_xml(&xml).unwrap(), vec!["kept".to_string()]);
    }

    #[test]
    fn test_tab_stop_definitions_are_not_text() {
        let xml = document_xml(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/><w:tab w:val=\"right\" w:pos=\"9000\"/></w:tabs></w:pPr>\
             <w:r><w:t>Title</w:t></w:r></w:p>",
        );
        assert_eq!(paragraphs_from_xml(&xml).unwrap(), vec!["Title".to_string()]);
    }

    #[test]
    fn test_drawingml_text_is_not_a_paragraph() {
        let xml = document_xml(
            "<w:p><w:r><w:drawing><a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
             <a:p><a:r><a:t>Chart label</a:t></a:r></a:p></a:graphic></w:drawing></w:r>\
             <w:r><w:t>Caption</w:t></w:r></w:p>",
        );
        assert_eq!(paragraphs_from_xml(&xml).unwrap(), vec!["Caption".to_string()]);
    }

    #[test]
    fn test_text_box_fallback_is_not_extracted_twice() {
        let xml = document_xml(
            "<w:p><w:r><mc:AlternateContent xmlns:mc=\"http://schemas.openxmlformats.org/markup-compatibility/2006\" xmlns:v=\"urn:schemas-microsoft-com:vml\">\
             <mc:Choice Requires=\"wps\"><w:drawing><w:txbxContent><w:p><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent></w:drawing></mc:Choice>\
             <mc:Fallback><w:pict><v:textbox><w:txbxContent><w:p><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent></v:textbox></w:pict></mc:Fallback>\
             </mc:AlternateContent></w:r><w:r><w:t>Body</w:t></w:r></w:p>",
        );
        assert_eq!(
            paragraphs_from_xml(&xml).unwrap(),
            vec!["Boxed".to_string(), "Body".to_string()]
        );
    }

    #[test]
    fn test_doc_extension_uses_same_parser() {
        let bytes = docx_bytes("<w:p><w:r><w:t>legacy name</w:t></w:r></w:p>");
        assert_eq!(extract(&bytes, "doc").unwrap(), "legacy name\n");
    }

    #[test]
    fn test_binary_doc_fails_extraction() {
        // OLE compound file header, as written by Word 97-2003
        let bytes = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0, 0, 0];
        assert!(matches!(
            extract(&bytes, "doc"),
            Err(ExtractError::ExtractionFailed(_))
        ));
    }

    #[test]
    fn test_package_without_document_part_fails() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"<styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        match extract(&bytes, "docx") {
            Err(ExtractError::ExtractionFailed(msg)) => assert!(msg.contains(DOCUMENT_PART)),
            other => panic!("expected ExtractionFailed, got {other:?}"),
        }
    }
}
