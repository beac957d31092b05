//! `.docx` paragraph extraction.
//!
//! Only the paragraph structure of the main document part is used. Tables,
//! headers, footers and styles are ignored.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::LoadError;

/// Archive member holding the document body.
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// Loads a `.docx` file and returns its non-blank paragraphs, each followed by `\n`.
pub fn load_document_text(path: impl AsRef<Path>) -> Result<String, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let mut xml = String::new();
    {
        let mut part = match archive.by_name(MAIN_DOCUMENT_PART) {
            Ok(part) => part,
            Err(ZipError::FileNotFound) => return Err(LoadError::MissingPart(MAIN_DOCUMENT_PART)),
            Err(err) => return Err(err.into()),
        };
        part.read_to_string(&mut xml)
            .map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
    }
    let paragraphs = paragraph_text_from_xml(&xml)?;
    Ok(join_paragraphs(&paragraphs))
}

/// Concatenates paragraphs that are not blank, terminating each with a newline.
pub fn join_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> String {
    let mut out = String::new();
    for paragraph in paragraphs {
        let text = paragraph.as_ref();
        if text.trim().is_empty() {
            continue;
        }
        out.push_str(text);
        out.push('\n');
    }
    out
}

/// Extracts the text of every body-level paragraph in a WordprocessingML document.
///
/// Paragraphs that live inside tables are skipped. Blank paragraphs are kept so
/// callers see the document's paragraph sequence unchanged. Text boxes and the
/// fallback copy of alternate content are skipped, and a paragraph nested in
/// another one never splits its parent. Tabs and breaks count only inside runs,
/// so tab-stop definitions in paragraph properties add nothing.
pub fn paragraph_text_from_xml(xml: &str) -> Result<Vec<String>, LoadError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut table_depth = 0usize;
    let mut skip_depth = 0usize;
    let mut paragraph_depth = 0usize;
    let mut run_depth = 0usize;
    let mut in_text_run = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|err| LoadError::Xml {
            position: reader.buffer_position() as u64,
            message: err.to_string(),
        })?;
        match event {
            Event::Start(ref e) if skip_depth > 0 => {
                if is_skipped_subtree(e.local_name().as_ref()) {
                    skip_depth += 1;
                }
            }
            Event::End(ref e) if skip_depth > 0 => {
                if is_skipped_subtree(e.local_name().as_ref()) {
                    skip_depth -= 1;
                }
            }
            Event::Start(ref e) => match e.local_name().as_ref() {
                name if is_skipped_subtree(name) => skip_depth += 1,
                b"tbl" => table_depth += 1,
                b"p" if table_depth == 0 => {
                    paragraph_depth += 1;
                    if paragraph_depth == 1 {
                        current = Some(String::new());
                    }
                }
                b"r" => run_depth += 1,
                b"t" => in_text_run = current.is_some(),
                b"tab" if run_depth > 0 => push_text(&mut current, "\t"),
                b"br" | b"cr" if run_depth > 0 => push_text(&mut current, "\n"),
                _ => {}
            },
            Event::Empty(ref e) if skip_depth == 0 => match e.local_name().as_ref() {
                b"p" if table_depth == 0 && paragraph_depth == 0 => {
                    paragraphs.push(String::new())
                }
                b"tab" if run_depth > 0 => push_text(&mut current, "\t"),
                b"br" | b"cr" if run_depth > 0 => push_text(&mut current, "\n"),
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                b"p" if table_depth == 0 && paragraph_depth > 0 => {
                    paragraph_depth -= 1;
                    if paragraph_depth == 0 {
                        if let Some(text) = current.take() {
                            paragraphs.push(text);
                        }
                    }
                }
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text_run = false,
                _ => {}
            },
            Event::Text(ref e) if in_text_run => {
                let text = e.unescape().map_err(|err| LoadError::Xml {
                    position: reader.buffer_position() as u64,
                    message: err.to_string(),
                })?;
                push_text(&mut current, &text);
            }
            Event::CData(ref e) if in_text_run => {
                let text = String::from_utf8_lossy(e).into_owned();
                push_text(&mut current, &text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

/// Text boxes and the legacy duplicate of alternate content.
fn is_skipped_subtree(local_name: &[u8]) -> bool {
    matches!(local_name, b"txbxContent" | b"Fallback")
}

fn push_text(current: &mut Option<String>, text: &str) {
    if let Some(paragraph) = current.as_mut() {
        paragraph.push_str(text);
    }
}
