//! Sentence-respecting text chunking.

/// Characters that may trail a sentence terminator without breaking it.
const CLOSERS: &[char] = &['"', '\'', ')', ']', '\u{201D}', '\u{2019}', '\u{00BB}'];

/// Check whether a word closes a sentence.
///
/// A word closes a sentence when it ends in `.`, `!` or `?`, optionally
/// followed by closing quotes or brackets.
///
/// # Examples
///
/// ```
/// use storyloom_core::ends_sentence;
///
/// assert!(ends_sentence("end."));
/// assert!(ends_sentence("really?\")"));
/// assert!(!ends_sentence("middle,"));
/// ```
pub fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(CLOSERS).ends_with(['.', '!', '?'])
}

/// Split text into ordered chunks of roughly `max_words_per_chunk` words.
///
/// Each window of `max_words_per_chunk` words is extended forward one word at a
/// time until its last word closes a sentence or the input runs out, so a chunk
/// may exceed the limit when the text has no terminator for a long stretch.
/// Words are rejoined with single spaces. A limit of zero is treated as one.
///
/// # Examples
///
/// ```
/// use storyloom_core::split;
///
/// let chunks = split("One two three. Four five six seven. Eight.", 2);
/// assert_eq!(chunks, vec!["One two three.", "Four five six seven.", "Eight."]);
/// ```
pub fn split(text: &str, max_words_per_chunk: usize) -> Vec<String> {
    let window = max_words_per_chunk.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::with_capacity(words.len() / window + 1);

    let mut start = 0;
    while start < words.len() {
        let mut end = (start + window).min(words.len());
        while end < words.len() && !ends_sentence(words[end - 1]) {
            end += 1;
        }
        chunks.push(words[start..end].join(" "));
        start = end;
    }

    chunks
}
