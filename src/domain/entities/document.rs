use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Raw text of one document page, as delivered by the PDF extractor.
#[derive(Debug, Clone)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

impl PageText {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

/// Immutable unit of indexed text. Never mutated after creation; only added
/// to the current index generation or destroyed with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    /// Originating page, 1-based. `None` when the source page is unknown.
    pub source_page: Option<u32>,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, source_page: Option<u32>) -> Self {
        Self {
            text: text.into(),
            source_page,
        }
    }
}

/// A chunk paired with its similarity score, as returned by the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Output of the chunker: a chunk plus its byte span within the
/// page-concatenated document text. The span makes the lossless-cover
/// guarantee checkable; it is not persisted.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub text: String,
    pub source_page: Option<u32>,
    pub span: Range<usize>,
}

impl ChunkCandidate {
    pub fn into_chunk(self) -> DocumentChunk {
        DocumentChunk::new(self.text, self.source_page)
    }
}

/// Splits document pages into overlapping chunks.
///
/// Pages are joined with a blank line and the combined text is cut into
/// windows of at most `chunk_size` bytes with `overlap` bytes carried into
/// the next window. Cuts prefer paragraph boundaries, then sentence ends,
/// then whitespace, before falling back to a hard cut on a UTF-8 boundary.
///
/// Each chunk is attributed to the page the majority of its characters come
/// from; ties go to the earlier page. An empty document yields no chunks.
pub fn split_pages(pages: &[PageText], chunk_size: usize, overlap: usize) -> Vec<ChunkCandidate> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    let (combined, spans) = flatten_pages(pages);
    if combined.is_empty() {
        return Vec::new();
    }

    let total = combined.len();
    let mut candidates = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = floor_boundary(&combined, (start + chunk_size).min(total));
        let end = if hard_end >= total {
            total
        } else {
            find_break(&combined, start, hard_end)
        };

        candidates.push(ChunkCandidate {
            text: combined[start..end].to_string(),
            source_page: predominant_page(&spans, start, end),
            span: start..end,
        });

        if end >= total {
            break;
        }

        let stepped = end.saturating_sub(overlap).max(start + 1);
        start = ceil_boundary(&combined, stepped);
    }

    candidates
}

/// Joins non-empty pages with a blank line, recording which byte range each
/// page owns. The separator is attributed to the preceding page.
fn flatten_pages(pages: &[PageText]) -> (String, Vec<(Range<usize>, u32)>) {
    let mut combined = String::new();
    let mut spans: Vec<(Range<usize>, u32)> = Vec::new();

    for page in pages.iter().filter(|p| !p.text.is_empty()) {
        if !combined.is_empty() {
            combined.push_str("\n\n");
            if let Some((range, _)) = spans.last_mut() {
                range.end = combined.len();
            }
        }
        let from = combined.len();
        combined.push_str(&page.text);
        spans.push((from..combined.len(), page.page));
    }

    (combined, spans)
}

/// Picks a cut position in `[start, hard_end]`, preferring natural
/// boundaries in the second half of the window so chunks don't degenerate.
fn find_break(s: &str, start: usize, hard_end: usize) -> usize {
    let window = &s[start..hard_end];
    let floor = window.len() / 2;

    if let Some(pos) = window.rfind("\n\n") {
        if pos + 2 >= floor {
            return start + pos + 2;
        }
    }

    for pat in [". ", ".\n", "! ", "? "] {
        if let Some(pos) = window.rfind(pat) {
            if pos + 2 >= floor {
                return start + pos + 2;
            }
        }
    }

    if let Some(pos) = window.rfind([' ', '\n']) {
        if pos + 1 >= floor {
            return start + pos + 1;
        }
    }

    hard_end
}

fn predominant_page(spans: &[(Range<usize>, u32)], start: usize, end: usize) -> Option<u32> {
    let mut best: Option<(u32, usize)> = None;
    for (range, page) in spans {
        let lo = range.start.max(start);
        let hi = range.end.min(end);
        if hi > lo {
            let owned = hi - lo;
            if best.map_or(true, |(_, len)| owned > len) {
                best = Some((*page, owned));
            }
        }
    }
    best.map(|(page, _)| page)
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
