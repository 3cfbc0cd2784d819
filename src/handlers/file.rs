//! Appends each matched element's bytes, one per line, to a file.
//! Mirrors `FileHandler` from the upstream bindings.

use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::path::Path;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug)]
pub struct FileHandler {
    writer: BufWriter<File>,
    write_path: bool,
    current: Vec<u8>,
    current_path: Option<Path>,
}

impl FileHandler {
    pub fn new(path: impl Into<PathBuf>, write_path: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.into())?;
        Ok(Self {
            writer: BufWriter::new(file),
            write_path,
            current: Vec::new(),
            current_path: None,
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Handler for FileHandler {
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
        if self.write_path {
            if let Some(path) = &self.current_path {
                self.writer.write_all(path.serialize().as_bytes())?;
                self.writer.write_all(b"\t")?;
            }
        }
        self.writer.write_all(&self.current)?;
        self.writer.write_all(b"\n")?;
        self.current.clear();
        Ok(None)
    }
}
