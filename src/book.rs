//! Book record consumed by the engine.
//!
//! The format-normalization step (plain text or EPUB into a single HTML
//! fragment plus TOC) happens elsewhere; this module only describes the
//! shape it produces and finds the chapter markers inside the fragment.

use core::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReaderError;

/// Title used when a book does not carry one.
pub const UNTITLED: &str = "Untitled";

/// Class token marking a root-level chapter element.
pub const CHAPTER_CLASS: &str = "chapter";

/// Attribute marking a root-level chapter element.
pub const CHAPTER_ATTR: &str = "data-chapter";

/// One table-of-contents entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TocEntry {
    /// Display label.
    pub title: String,
    /// Id of the chapter element this entry points at.
    pub chapter_id: String,
}

/// A normalized book: one HTML fragment plus its table of contents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    /// Book title.
    pub title: String,
    /// Self-contained HTML fragment; root-level units carry chapter markers.
    pub html: String,
    /// Table of contents in reading order.
    pub toc: Vec<TocEntry>,
    /// Preferences shipped with the book, if any (raw, coerced on use).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    /// Progress shipped with the book, if any (raw, coerced on use).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
}

impl Book {
    /// Create a book from its title, HTML and TOC.
    pub fn new(title: impl Into<String>, html: impl Into<String>, toc: Vec<TocEntry>) -> Self {
        Self {
            title: title.into(),
            html: html.into(),
            toc,
            settings: None,
            progress: None,
        }
    }

    /// Title, or `Untitled` when blank.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    /// Stable identity used to scope persisted records.
    pub fn id(&self) -> BookId {
        BookId::for_book(self)
    }

    /// Chapter ids in document order.
    pub fn chapter_ids(&self) -> Result<Vec<String>, ReaderError> {
        scan_chapter_ids(&self.html)
    }
}

/// Identity of a book for persistence: `title::toc_len::html_len`.
///
/// The HTML length counts UTF-16 code units so ids agree with records
/// keyed by JavaScript string length.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Derive the id of a book.
    pub fn for_book(book: &Book) -> Self {
        BookId(format!(
            "{}::{}::{}",
            book.display_title(),
            book.toc.len(),
            book.html.encode_utf16().count()
        ))
    }

    /// Wrap an id read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        BookId(raw.into())
    }

    /// Id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Find chapter element ids in document order.
///
/// An element is a chapter when its `class` list contains `chapter` or it
/// carries a `data-chapter` attribute. The id comes from `id`, falling back
/// to a non-empty `data-chapter` value. Markers without any id are skipped.
/// The fragment is HTML, so mismatched end tags are tolerated.
pub fn scan_chapter_ids(html: &str) -> Result<Vec<String>, ReaderError> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut ids = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if let Some(id) = chapter_marker_id(&reader, &e) {
                    ids.push(id);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                log::warn!(
                    "[BOOK] Chapter scan stopped at byte {}: {}",
                    reader.buffer_position(),
                    err
                );
                return Err(err.into());
            }
        }
    }
    log::debug!("[BOOK] Found {} chapter markers", ids.len());
    Ok(ids)
}

fn chapter_marker_id(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Option<String> {
    let mut is_chapter = false;
    let mut id: Option<String> = None;
    let mut data_id: Option<String> = None;

    for attr in e.attributes().flatten() {
        let key = reader
            .decoder()
            .decode(attr.key.as_ref())
            .unwrap_or_default();
        let value = reader
            .decoder()
            .decode(&attr.value)
            .unwrap_or_default()
            .trim()
            .to_string();
        match &*key {
            "class" => {
                if value.split_ascii_whitespace().any(|c| c == CHAPTER_CLASS) {
                    is_chapter = true;
                }
            }
            "id" if !value.is_empty() => id = Some(value),
            CHAPTER_ATTR => {
                is_chapter = true;
                if !value.is_empty() {
                    data_id = Some(value);
                }
            }
            _ => {}
        }
    }

    if is_chapter {
        id.or(data_id)
    } else {
        None
    }
}
