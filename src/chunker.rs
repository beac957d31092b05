//! Fixed-width character chunking of the loaded document text.

/// Characters per fragment when no override is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Contiguous slice of the document text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Position of the fragment in chunk order.
    pub index: usize,
    /// Offset of the first character (in chars, not bytes).
    pub char_start: usize,
    /// Offset one past the last character.
    pub char_end: usize,
    /// Fragment body.
    pub text: String,
}

impl Fragment {
    /// Number of characters covered by the fragment.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Splits `text` into consecutive, non-overlapping windows of `chunk_size` characters.
///
/// The final fragment may be shorter. Words and sentences are cut wherever the
/// window ends. A `chunk_size` of zero is treated as one.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<Fragment> {
    let size = chunk_size.max(1);
    let mut fragments = Vec::new();
    let mut byte_start = 0usize;
    let mut char_start = 0usize;
    let mut chars_in_window = 0usize;

    for (byte_idx, _) in text.char_indices() {
        if chars_in_window == size {
            push_fragment(&mut fragments, text, byte_start, byte_idx, char_start, size);
            byte_start = byte_idx;
            char_start += size;
            chars_in_window = 0;
        }
        chars_in_window += 1;
    }
    if chars_in_window > 0 {
        push_fragment(
            &mut fragments,
            text,
            byte_start,
            text.len(),
            char_start,
            chars_in_window,
        );
    }
    fragments
}

fn push_fragment(
    fragments: &mut Vec<Fragment>,
    text: &str,
    byte_start: usize,
    byte_end: usize,
    char_start: usize,
    char_len: usize,
) {
    fragments.push(Fragment {
        index: fragments.len(),
        char_start,
        char_end: char_start + char_len,
        text: text[byte_start..byte_end].to_string(),
    });
}
