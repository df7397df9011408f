//! Current-chapter detection.
//!
//! Picks the chapter the reader is *in*, not the one merely peeking in at
//! the bottom: the last chapter (in document order) whose leading edge has
//! scrolled to within a small lookahead of the container's top.

/// Id reported when the book has no chapter markers.
pub const FALLBACK_CHAPTER_ID: &str = "chapter-001";

/// Distance past the container top at which a chapter already counts as current.
pub const LOOKAHEAD_PX: f64 = 24.0;

/// Linear-scan chapter locator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChapterLocator {
    lookahead: f64,
}

impl Default for ChapterLocator {
    fn default() -> Self {
        Self::new(LOOKAHEAD_PX)
    }
}

impl ChapterLocator {
    /// Locator with a custom lookahead.
    pub fn new(lookahead: f64) -> Self {
        Self { lookahead }
    }

    /// Locate the current chapter.
    ///
    /// `chapters` yields `(id, offset)` in document order, where `offset` is
    /// the chapter's top edge minus the container's top edge. Offsets grow
    /// monotonically, so the scan stops at the first chapter below the
    /// lookahead line. The first chapter is the candidate until another
    /// qualifies.
    pub fn locate<'a, I>(&self, chapters: I) -> &'a str
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut iter = chapters.into_iter();
        let Some((first_id, first_offset)) = iter.next() else {
            return FALLBACK_CHAPTER_ID;
        };
        if first_offset > self.lookahead {
            return first_id;
        }
        let mut candidate = first_id;
        for (id, offset) in iter {
            if offset <= self.lookahead {
                candidate = id;
            } else {
                break;
            }
        }
        candidate
    }
}

/// Locate with the default lookahead.
pub fn locate_chapter<'a, I>(chapters: I) -> &'a str
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    ChapterLocator::default().locate(chapters)
}
