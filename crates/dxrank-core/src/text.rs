//! Word-level matching used for keyword and attribute detection.

/// Split into lower-case alphanumeric words.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `phrase` occurs in `haystack` as a contiguous run of whole words.
pub fn contains_phrase(haystack: &[String], phrase: &str) -> bool {
    let needle = words(phrase);
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}
