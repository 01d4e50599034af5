//! Splits the narrative into overlapping chunks for embedding.
//!
//! Sizes are given in tokens and converted with the same rough estimate the
//! rest of the workspace uses (4 characters per token). Chunks break on
//! whitespace, so a single word longer than the chunk is kept whole.

/// Characters per token, rough estimate.
pub const CHARS_PER_TOKEN: usize = 4;

/// Split `text` into chunks of at most `chunk_tokens`, each sharing up to
/// `overlap_tokens` of trailing words with the next one.
pub fn chunk_text(text: &str, chunk_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    let max_chars = (chunk_tokens * CHARS_PER_TOKEN).max(1);
    let overlap_chars = overlap_tokens * CHARS_PER_TOKEN;
    let words: Vec<&str> = text.split_whitespace().collect();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let mut end = start;
        let mut len = 0;
        while end < words.len() {
            let add = words[end].chars().count() + usize::from(end > start);
            if end > start && len + add > max_chars {
                break;
            }
            len += add;
            end += 1;
        }

        chunks.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }

        // Step back over trailing words for the overlap, always moving forward by one word
        let mut next = end;
        let mut back = 0;
        while next > start + 1 {
            let w = words[next - 1].chars().count() + 1;
            if back + w > overlap_chars {
                break;
            }
            back += w;
            next -= 1;
        }
        start = next;
    }

    chunks
}
