//! Accumulates each matched element's bytes and exposes them as an
//! ordered FIFO, mirroring `BufferHandler` from the upstream bindings
//! (`original_source/streamson/handler.py`).

use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::path::Path;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct BufferHandler {
    current: Vec<u8>,
    current_path: Option<Path>,
    records: VecDeque<(Option<Path>, Vec<u8>)>,
}

impl BufferHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the oldest buffered `(path, bytes)` record.
    pub fn pop_front(&mut self) -> Option<(Option<Path>, Vec<u8>)> {
        self.records.pop_front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Handler for BufferHandler {
    fn on_start(&mut self, path: Option<&Path>, _matcher_id: MatcherId) -> Result<()> {
        self.current.clear();
        self.current_path = path.cloned();
        Ok(())
    }

    fn on_feed(&mut self, bytes: &[u8], _matcher_id: MatcherId) -> Result<()> {
        self.current.extend_from_slice(bytes);
        Ok(())
    }

    fn on_end(&mut self, _path: Option<&Path>, _matcher_id: MatcherId) -> Result<Option<Vec<u8>>> {
        let bytes = std::mem::take(&mut self.current);
        let path = self.current_path.take();
        self.records.push_back((path, bytes));
        Ok(None)
    }
}
