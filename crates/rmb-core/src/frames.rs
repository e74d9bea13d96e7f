//! Frame reassembly: raw transport fragments to logical messages.

/// Accumulates text fragments into logical messages.
///
/// Fragment payloads concatenate in arrival order; a fragment marked
/// final completes exactly one logical message.
#[derive(Debug, Default)]
pub struct Reassembler {
    buf: String,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment. Returns the completed logical message when
    /// `fin` is set, `None` while the message is still partial.
    pub fn push(&mut self, text: &str, fin: bool) -> Option<String> {
        self.buf.push_str(text);
        if fin {
            Some(std::mem::take(&mut self.buf))
        } else {
            None
        }
    }
}
