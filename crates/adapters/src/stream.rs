//! Line framing for streamed HTTP bodies.
//!
//! Ollama streams newline-delimited JSON and Azure OpenAI streams
//! server-sent events; both arrive as arbitrary byte chunks that must be
//! re-assembled into lines before parsing.

/// Accumulates byte chunks and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete, non-blank line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Return whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_chunks() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"{\"a\":").is_empty());
        assert_eq!(buf.push(b"1}\n{\"b\""), vec!["{\"a\":1}"]);
        assert_eq!(buf.push(b":2}\n\n"), vec!["{\"b\":2}"]);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_finish_returns_unterminated_tail() {
        let mut buf = LineBuffer::new();
        buf.push(b"data: [DONE]");
        assert_eq!(buf.finish().as_deref(), Some("data: [DONE]"));
    }

    #[test]
    fn test_crlf_is_trimmed() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"data: x\r\n"), vec!["data: x"]);
    }
}
