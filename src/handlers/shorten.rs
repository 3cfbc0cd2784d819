//! Converter that truncates an element to at most `max_len` bytes,
//! appending a terminator regardless of whether that leaves valid JSON
//! (the caller's responsibility, per spec).

use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::path::Path;

#[derive(Debug, Clone)]
pub struct ShortenHandler {
    max_len: usize,
    terminator: Vec<u8>,
    current: Vec<u8>,
}

impl ShortenHandler {
    pub fn new(max_len: usize, terminator: impl Into<Vec<u8>>) -> Self {
        Self {
            max_len,
            terminator: terminator.into(),
            current: Vec::new(),
        }
    }
}

impl Handler for ShortenHandler {
    fn is_converter(&self) -> bool {
        true
    }

    fn use_path(&self) -> bool {
        false
    }

    fn on_start(&mut self, _path: Option<&Path>, _matcher_id: MatcherId) -> Result<()> {
        self.current.clear();
        Ok(())
    }

    fn on_feed(&mut self, bytes: &[u8], _matcher_id: MatcherId) -> Result<()> {
        if self.current.len() < self.max_len {
            let take = (self.max_len - self.current.len()).min(bytes.len());
            self.current.extend_from_slice(&bytes[..take]);
        }
        Ok(())
    }

    fn on_end(&mut self, _path: Option<&Path>, _matcher_id: MatcherId) -> Result<Option<Vec<u8>>> {
        let mut out = std::mem::take(&mut self.current);
        out.extend_from_slice(&self.terminator);
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_and_appends_terminator() {
        let mut h = ShortenHandler::new(3, &b"..."[..]);
        h.on_start(None, 0).unwrap();
        h.on_feed(b"hello world", 0).unwrap();
        let out = h.on_end(None, 0).unwrap().unwrap();
        assert_eq!(out, b"hel...".to_vec());
    }
}
