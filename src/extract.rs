//! Text extraction for non-plain-text documents (PDF, HTML).
//!
//! Connectors supply bytes or markup plus a content type; this module
//! returns plain UTF-8 text. Extraction failures are returned as errors so
//! the connector can skip the item and keep going.

/// Supported MIME types for extraction.
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_HTML: &str = "text/html";

/// Extraction error: the pipeline skips the affected item, never panics.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    Pdf(String),
    Html(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {}", ct)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Html(e) => write!(f, "HTML extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts plain text from binary or markup content.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_HTML => html_to_text(&String::from_utf8_lossy(bytes)),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Strip markup from an HTML fragment, keeping text content.
///
/// Handles Confluence storage format and plain HTML pages; `script` and
/// `style` bodies are dropped. Block-level closes insert a newline so
/// paragraph boundaries survive for the chunker.
pub fn html_to_text(html: &str) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(html.as_bytes());
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::new();
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if is_skipped_element(e.local_name().as_ref()) {
                    skip_depth += 1;
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if is_skipped_element(e.local_name().as_ref()) {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if skip_depth == 0 && is_block_element(e.local_name().as_ref()) {
                    push_newline(&mut out);
                }
            }
            Ok(quick_xml::events::Event::Empty(e)) => {
                if skip_depth == 0 && e.local_name().as_ref() == b"br" {
                    push_newline(&mut out);
                }
            }
            Ok(quick_xml::events::Event::Text(te)) => {
                if skip_depth == 0 {
                    // Non-XML entities (&nbsp; and friends) fail to
                    // unescape; keep the raw text rather than drop it.
                    let text = te
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(te.as_ref()).into_owned());
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        if !out.is_empty() && !out.ends_with('\n') {
                            out.push(' ');
                        }
                        out.push_str(trimmed);
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Html(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim().to_string())
}

fn is_skipped_element(name: &[u8]) -> bool {
    matches!(name, b"script" | b"style")
}

fn is_block_element(name: &[u8]) -> bool {
    matches!(
        name,
        b"p" | b"div"
            | b"li"
            | b"tr"
            | b"h1"
            | b"h2"
            | b"h3"
            | b"h4"
            | b"h5"
            | b"h6"
            | b"table"
            | b"ul"
            | b"ol"
            | b"blockquote"
            | b"pre"
    )
}

fn push_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}
