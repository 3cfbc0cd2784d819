//! Thin observer over [`BufferHandler`] that records each matched
//! element's path alongside a running sequence number instead of its
//! bytes, useful for building an index without retaining payloads.

use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::path::Path;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct IndexerHandler {
    next_seq: u64,
    current_path: Option<Path>,
    entries: VecDeque<(u64, Path)>,
}

impl IndexerHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop_front(&mut self) -> Option<(u64, Path)> {
        self.entries.pop_front()
    }
}

impl Handler for IndexerHandler {
    fn on_start(&mut self, path: Option<&Path>, _matcher_id: MatcherId) -> Result<()> {
        self.current_path = path.cloned();
        Ok(())
    }

    fn on_end(&mut self, _path: Option<&Path>, _matcher_id: MatcherId) -> Result<Option<Vec<u8>>> {
        if let Some(path) = self.current_path.take() {
            self.entries.push_back((self.next_seq, path));
            self.next_seq += 1;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_matches_in_document_order() {
        let mut h = IndexerHandler::new();
        let mut p = Path::new();
        p.push_key("users".to_string());
        p.push_index(0);
        h.on_start(Some(&p), 0).unwrap();
        h.on_end(Some(&p), 0).unwrap();
        p.pop();
        p.push_index(1);
        h.on_start(Some(&p), 0).unwrap();
        h.on_end(Some(&p), 0).unwrap();

        assert_eq!(h.pop_front().unwrap().0, 0);
        assert_eq!(h.pop_front().unwrap().0, 1);
    }
}
