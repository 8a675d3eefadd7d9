/// Strategy for case-insensitive substring matching
#[derive(Debug, Clone)]
enum MatchStrategy {
    /// Needle is pure ASCII: compare bytes with ASCII case folding, no allocation per line
    Ascii(Vec<u8>),
    /// Needle has non-ASCII characters: lowercase both sides with full Unicode rules
    Unicode(String),
}

/// Decides whether a line contains the search text, ignoring case
#[derive(Debug, Clone)]
pub struct LineMatcher {
    strategy: MatchStrategy,
}

impl LineMatcher {
    /// Creates a new LineMatcher for the given search text
    pub fn new(search_text: &str) -> Self {
        let lowered = search_text.to_lowercase();
        let strategy = if lowered.is_ascii() {
            MatchStrategy::Ascii(lowered.into_bytes())
        } else {
            MatchStrategy::Unicode(lowered)
        };
        Self { strategy }
    }

    /// Checks whether `line` contains the search text
    pub fn is_match(&self, line: &str) -> bool {
        match &self.strategy {
            MatchStrategy::Ascii(needle) if line.is_ascii() => {
                contains_ignore_ascii_case(line.as_bytes(), needle)
            }
            MatchStrategy::Ascii(needle) => {
                contains_ignore_ascii_case(line.to_lowercase().as_bytes(), needle)
            }
            MatchStrategy::Unicode(needle) => line.to_lowercase().contains(needle.as_str()),
        }
    }
}

fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}
