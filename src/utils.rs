//! # Utilities Module
//!
//! ## Purpose
//! Small helpers shared across the QA engine: request timing and text
//! display utilities for logs and responses.

use std::time::Instant;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

/// Text display utilities
pub struct TextUtils;

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

impl TextUtils {
    /// Truncate text to specified length with ellipsis
    pub fn truncate(text: &str, max_length: usize) -> String {
        if text.len() <= max_length {
            text.to_string()
        } else {
            let cut = max_length.saturating_sub(3);
            let boundary = text
                .char_indices()
                .take_while(|(i, _)| *i <= cut)
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            format!("{}...", &text[..boundary])
        }
    }

    /// First `max_words` words of the text, with ellipsis when cut
    pub fn preview(text: &str, max_words: usize) -> String {
        let words: Vec<&str> = text.split_whitespace().take(max_words).collect();
        let preview = words.join(" ");

        if words.len() >= max_words {
            format!("{}...", preview)
        } else {
            preview
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_text_unchanged() {
        assert_eq!(TextUtils::truncate("Hello world", 20), "Hello world");
    }

    #[test]
    fn truncate_long_text_adds_ellipsis() {
        let out = TextUtils::truncate("This is a very long text", 10);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 11);
    }

    #[test]
    fn preview_limits_words() {
        assert_eq!(TextUtils::preview("one two three four", 2), "one two...");
        assert_eq!(TextUtils::preview("one two", 5), "one two");
    }
}
