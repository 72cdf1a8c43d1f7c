//! Accumulation of text message fragments.

/// Collects fragments of one logical text message.
///
/// Only the terminal fragment yields the complete text; the buffer is empty
/// again afterwards.
#[derive(Debug, Default)]
pub struct FragmentBuffer {
    text: String,
}

impl FragmentBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Returns the complete message when `last` is set.
    pub fn push(&mut self, fragment: &str, last: bool) -> Option<String> {
        self.text.push_str(fragment);
        last.then(|| std::mem::take(&mut self.text))
    }

    /// Whether a partial message is pending.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Drop any partial message.
    pub fn clear(&mut self) {
        self.text.clear();
    }
}
