//! Converter that treats a matched JSON string as itself holding escaped
//! JSON, and emits that inner JSON in place of the outer string. Falls
//! back to the original bytes unchanged if the content does not
//! unescape to valid JSON (spec.md §4.5).

use crate::emitter::{Emitter, EmitterSink};
use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::path::Path;

#[derive(Debug, Default)]
pub struct UnstringifyHandler {
    current: Vec<u8>,
}

impl UnstringifyHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Handler for UnstringifyHandler {
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
        self.current.extend_from_slice(bytes);
        Ok(())
    }

    fn on_end(&mut self, _path: Option<&Path>, _matcher_id: MatcherId) -> Result<Option<Vec<u8>>> {
        let original = self.current.clone();
        match unstringify(&self.current) {
            Some(inner) if is_valid_json(&inner) => Ok(Some(inner)),
            _ => Ok(Some(original)),
        }
    }
}

/// Strip the outer quotes of a JSON string literal and undo its escape
/// sequences, returning the raw content bytes. Returns `None` if `bytes`
/// is not a well-formed quoted string.
fn unstringify(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.len() < 2 || bytes[0] != b'"' || bytes[bytes.len() - 1] != b'"' {
        return None;
    }
    let inner = &bytes[1..bytes.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        let b = inner[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        i += 1;
        let escape = *inner.get(i)?;
        match escape {
            b'"' => out.push(b'"'),
            b'\\' => out.push(b'\\'),
            b'/' => out.push(b'/'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'u' => {
                let hex = inner.get(i + 1..i + 5)?;
                let code = u32::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()?;
                let ch = char::from_u32(code)?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                i += 4;
            }
            _ => return None,
        }
        i += 1;
    }
    Some(out)
}

struct NullSink;
impl EmitterSink for NullSink {
    fn on_start(&mut self, _path: &Path) {}
    fn on_bytes(&mut self, _bytes: &[u8]) {}
    fn on_end(&mut self, _path: &Path) {}
    fn on_separator(&mut self, _bytes: &[u8]) {}
}

fn is_valid_json(bytes: &[u8]) -> bool {
    let mut emitter = Emitter::new();
    let mut sink = NullSink;
    emitter.process(bytes, &mut sink).is_ok() && emitter.terminate(&mut sink).is_ok()
}
