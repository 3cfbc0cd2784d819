//! Thin observer over [`BufferHandler`] that writes each matched
//! element straight to stdout as it completes, one per line.

use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::handlers::buffer::BufferHandler;
use crate::path::Path;
use std::io::{self, Write};

#[derive(Debug, Default)]
pub struct StdoutHandler {
    buffer: BufferHandler,
}

impl StdoutHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Handler for StdoutHandler {
    fn on_start(&mut self, path: Option<&Path>, matcher_id: MatcherId) -> Result<()> {
        self.buffer.on_start(path, matcher_id)
    }

    fn on_feed(&mut self, bytes: &[u8], matcher_id: MatcherId) -> Result<()> {
        self.buffer.on_feed(bytes, matcher_id)
    }

    fn on_end(&mut self, path: Option<&Path>, matcher_id: MatcherId) -> Result<Option<Vec<u8>>> {
        self.buffer.on_end(path, matcher_id)?;
        if let Some((_, bytes)) = self.buffer.pop_front() {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(&bytes)?;
            lock.write_all(b"\n")?;
        }
        Ok(None)
    }
}
