/// Characters per page.
pub const PAGE_SIZE: usize = 2000;

/// Split `text` into consecutive chunks of at most `size` characters.
///
/// Counts Unicode scalar values, so a multi-byte character is never cut in half.
/// Joining the chunks gives back `text` exactly. Empty input yields no chunks.
pub fn paginate(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }
    chunks
}

/// The paginated book text. Always holds at least one (possibly empty) page.
#[derive(Debug, Clone, PartialEq)]
pub struct Pages {
    chunks: Vec<String>,
}

impl Pages {
    pub fn from_text(text: &str, size: usize) -> Self {
        let mut chunks = paginate(text, size);
        if chunks.is_empty() {
            chunks.push(String::new());
        }
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(|c| c.is_empty())
    }

    /// Page text, or "" when `index` is past the end.
    pub fn get(&self, index: usize) -> &str {
        self.chunks.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn clamp(&self, index: usize) -> usize {
        index.min(self.chunks.len() - 1)
    }
}

impl Default for Pages {
    fn default() -> Self {
        Self::from_text("", PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_rejoin_to_source() {
        let text: String = (0..4321).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let chunks = paginate(&text, 2000);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), text);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks[1].chars().count(), 2000);
        assert_eq!(chunks[2].chars().count(), 321);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_chunk() {
        let text = "x".repeat(4000);
        let chunks = paginate(&text, 2000);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let text = "पृष्ठ".repeat(7);
        let chunks = paginate(&text, 3);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.chars().count(), 3);
        }
    }

    #[test]
    fn test_short_text_is_a_single_page() {
        let pages = Pages::from_text("Dune\n\nby Frank Herbert", PAGE_SIZE);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages.get(0), "Dune\n\nby Frank Herbert");
    }

    #[test]
    fn test_empty_text_still_has_one_page() {
        assert!(paginate("", 10).is_empty());
        let pages = Pages::from_text("", 10);
        assert_eq!(pages.len(), 1);
        assert!(pages.is_empty());
        assert_eq!(pages.clamp(5), 0);
    }

    #[test]
    fn test_zero_size_is_treated_as_one() {
        assert_eq!(paginate("abc", 0), vec!["a", "b", "c"]);
    }
}
