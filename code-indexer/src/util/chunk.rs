//! Chunk stage: fixed-size ~2000-character windows with 200-character
//! overlap between adjacent chunks; empty/whitespace-only chunks dropped
//! (§4.4).

pub const CHUNK_SIZE_CHARS: usize = 2000;
pub const CHUNK_OVERLAP_CHARS: usize = 200;

pub struct TextChunk {
    pub index: u32,
    pub content: String,
}

/// Splits `content` into overlapping character windows. Operates on
/// `char` boundaries (not bytes) so multi-byte UTF-8 source never gets cut
/// mid-codepoint.
pub fn chunk_text(content: &str) -> Vec<TextChunk> {
    let chars: Vec<char> = content.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = CHUNK_SIZE_CHARS.saturating_sub(CHUNK_OVERLAP_CHARS).max(1);
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut index = 0u32;

    while start < chars.len() {
        let end = (start + CHUNK_SIZE_CHARS).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        if !piece.trim().is_empty() {
            out.push(TextChunk {
                index,
                content: piece,
            });
            index += 1;
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    out
}
