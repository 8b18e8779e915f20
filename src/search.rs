//! Full-document text search
//!
//! Pure scanning and formatting; workers run [`scan_page`] over extracted
//! page text and the service assembles the per-range results.

/// Hard cap on hits per search
pub const MAX_HITS: usize = 500;

/// Characters of context kept on each side of a match
pub const SNIPPET_RADIUS: usize = 50;

/// A single match with its display snippet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    /// Page the match is on (0-indexed)
    pub page: usize,
    /// Context around the match, newlines flattened to spaces
    pub snippet: String,
    /// Byte offset of the match inside `snippet`
    pub match_start: usize,
    /// Byte length of the match inside `snippet`
    pub match_len: usize,
}

/// Scan one page of text for case-insensitive matches of `query`.
/// Hits come back in document order.
#[must_use]
pub fn scan_page(page: usize, text: &str, query: &str) -> Vec<SearchHit> {
    if query.is_empty() || text.is_empty() {
        return Vec::new();
    }

    let haystack = text.to_lowercase();
    let needle = query.to_lowercase();

    // Byte offsets found below index into the original text. When case
    // folding shifted byte lengths (rare scripts) snippets come from the
    // lowered copy instead.
    let source = if haystack.len() == text.len() {
        text
    } else {
        haystack.as_str()
    };

    let mut hits = Vec::new();
    let mut from = 0;
    while let Some(found) = haystack[from..].find(&needle) {
        let start = from + found;
        let end = start + needle.len();
        hits.push(make_hit(page, source, start, end));
        from = end.max(start + 1);
    }

    hits
}

fn make_hit(page: usize, text: &str, start: usize, end: usize) -> SearchHit {
    let start = snap_to_boundary(text, start);
    let end = snap_to_boundary(text, end).max(start);

    let mut snippet_start = start;
    for _ in 0..SNIPPET_RADIUS {
        match text[..snippet_start].chars().next_back() {
            Some(ch) => snippet_start -= ch.len_utf8(),
            None => break,
        }
    }

    let mut snippet_end = end;
    for _ in 0..SNIPPET_RADIUS {
        match text[snippet_end..].chars().next() {
            Some(ch) => snippet_end += ch.len_utf8(),
            None => break,
        }
    }

    let mut snippet = String::with_capacity(snippet_end - snippet_start + 8);
    let mut match_start = start - snippet_start;
    if snippet_start > 0 {
        snippet.push('…');
        match_start += '…'.len_utf8();
    }

    snippet.extend(
        text[snippet_start..snippet_end]
            .chars()
            .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch }),
    );

    if snippet_end < text.len() {
        snippet.push('…');
    }

    SearchHit {
        page,
        snippet,
        match_start,
        match_len: end - start,
    }
}

fn snap_to_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Render results as a plain-text report for export
#[must_use]
pub fn format_export(query: &str, doc_name: &str, hits: &[SearchHit]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Search results for \"{query}\"\n"));
    out.push_str(&format!("Document: {doc_name}\n"));

    let word = if hits.len() == 1 { "match" } else { "matches" };
    out.push_str(&format!("{} {word} found\n", hits.len()));
    out.push_str(&"-".repeat(60));
    out.push('\n');

    for hit in hits {
        out.push_str(&format!("[Page {}] {}\n", hit.page + 1, hit.snippet));
    }

    out
}

/// File name for an exported result set, derived from the query
#[must_use]
pub fn export_filename(query: &str) -> String {
    let mut slug = String::new();
    for ch in query.chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }

    let slug: String = slug.trim_end_matches('_').chars().take(40).collect();
    if slug.is_empty() {
        "search-results.txt".to_string()
    } else {
        format!("search-{slug}.txt")
    }
}
