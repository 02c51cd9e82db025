/// Accumulated transcript: committed text plus the in-flight partial.
///
/// Committed text is append-only. The partial segment is replaced wholesale
/// on every partial result and cleared exactly when a final result is
/// merged into the committed text.
#[derive(Debug, Clone, Default)]
pub struct TranscriptState {
    committed: String,
    partial: String,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the partial segment with the latest provisional text.
    pub fn apply_partial(&mut self, text: impl Into<String>) {
        self.partial = text.into();
    }

    /// Merge a final result: trim it, append to the committed text with a
    /// single separating space if non-empty, and clear the partial.
    pub fn apply_final(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            if !self.committed.is_empty() {
                self.committed.push(' ');
            }
            self.committed.push_str(text);
        }
        self.partial.clear();
    }

    /// Reset both committed and partial text.
    pub fn clear(&mut self) {
        self.committed.clear();
        self.partial.clear();
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn partial(&self) -> &str {
        &self.partial
    }

    /// Displayed text: committed plus, if a partial is pending, one
    /// separating space and the partial.
    pub fn display(&self) -> String {
        if self.partial.is_empty() {
            self.committed.clone()
        } else {
            format!("{} {}", self.committed, self.partial)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty() && self.partial.is_empty()
    }
}
