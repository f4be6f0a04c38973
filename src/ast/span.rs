//! Line lookup over module source text

/// Source text of one module, indexed by line for diagnostic context
#[derive(Debug, Clone, Default)]
pub struct SourceLines {
    text: String,
    /// Byte range of every line, terminator excluded
    lines: Vec<(usize, usize)>,
}

impl SourceLines {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut lines = Vec::new();
        let mut start = 0;
        for (newline, _) in text.match_indices('\n') {
            lines.push((start, newline));
            start = newline + 1;
        }
        if start < text.len() {
            lines.push((start, text.len()));
        }
        Self { text, lines }
    }

    /// Text of a 1-indexed line, without `\n` or `\r\n`
    pub fn line(&self, number: usize) -> Option<&str> {
        let (start, end) = *self.lines.get(number.checked_sub(1)?)?;
        Some(self.text[start..end].trim_end_matches('\r'))
    }
}

#[cfg(test)]
#[path = "span_tests.rs"]
mod tests;
