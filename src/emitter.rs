//! Drives the [`Lexer`] byte by byte, maintains the [`Path`], and
//! dispatches `Start`/bytes/`End` events to whatever [`EmitterSink`] a
//! strategy provides. The emitter owns no output buffer of its own: it
//! only ever forwards bytes onward, in document order, to the sink.

use crate::error::{Result, StreamsonError};
use crate::lexer::{ContainerKind, LexEvent, Lexer, ValueKind};
use crate::path::Path;

/// Receives the event stream produced by [`Emitter::process`]/`terminate`.
///
/// `on_bytes` fires for every byte that lies within at least one
/// currently open element — which, because element ranges nest, is every
/// byte between a value's own `Start` and `End` including the bytes of
/// any values nested inside it. `on_separator` fires instead for bytes
/// that lie outside every element: whitespace between concatenated
/// top-level documents.
pub trait EmitterSink {
    fn on_start(&mut self, path: &Path);
    fn on_bytes(&mut self, bytes: &[u8]);
    fn on_end(&mut self, path: &Path);
    fn on_separator(&mut self, bytes: &[u8]);

    /// Fires on the first byte of an object member's key, before any of
    /// the key's own bytes reach [`EmitterSink::on_bytes`]. Most sinks
    /// don't care where a key starts (a key never becomes an element of
    /// its own — spec.md §4.3); [`crate::strategy::filter::Filter`] uses
    /// it to know exactly where a dropped member's trailing comma ends
    /// and the next member's key begins.
    fn on_key_start(&mut self) {}

    /// Fires right before a container's own closing `}`/`]` byte reaches
    /// [`EmitterSink::on_bytes`]. [`crate::strategy::filter::Filter`] uses
    /// it as the other boundary (besides [`EmitterSink::on_key_start`] and
    /// a sibling's `on_start`) where a dropped trailing member's elided
    /// separator run must stop, so the bracket itself is never eaten.
    fn on_container_end(&mut self) {}
}

#[derive(Debug)]
pub struct Emitter {
    lexer: Lexer,
    path: Path,
    pending_key: Option<String>,
    array_counters: Vec<usize>,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            lexer: Lexer::new(),
            path: Path::new(),
            pending_key: None,
            array_counters: Vec::new(),
        }
    }

    pub fn current_depth(&self) -> usize {
        self.path.depth()
    }

    /// Feed one chunk of input. May be called any number of times with
    /// chunks of any size, including a single byte at a time; behavior
    /// must not depend on how the input is chunked (boundary
    /// independence, spec.md §8 property 4).
    pub fn process<S: EmitterSink>(&mut self, chunk: &[u8], sink: &mut S) -> Result<()> {
        let mut i = 0;
        while i < chunk.len() {
            let byte = chunk[i];
            let enclosing_before = self.lexer.top_container();
            let (consumed, event) = self.lexer.step(byte)?;
            self.dispatch(byte, event, enclosing_before, sink)?;
            if consumed {
                i += 1;
            }
        }
        Ok(())
    }

    /// Signal end of input. Fails if a container or token is still open.
    ///
    /// A trailing top-level number (`42`, the last value of `1 2 3`) has
    /// no closing delimiter of its own — it's only ever ended by a
    /// following non-digit byte, which end of input never supplies. Flush
    /// it here before checking [`Lexer::can_end`], the same way
    /// [`Emitter::dispatch`]'s `ScalarEnd` arm would have.
    pub fn terminate<S: EmitterSink>(&mut self, sink: &mut S) -> Result<()> {
        if self.lexer.finish() {
            sink.on_end(&self.path.snapshot());
            self.path.pop();
        }
        if !self.lexer.can_end() {
            return Err(StreamsonError::truncated(self.lexer.truncated_message()));
        }
        Ok(())
    }

    fn dispatch<S: EmitterSink>(
        &mut self,
        byte: u8,
        event: Option<LexEvent>,
        enclosing_before: Option<ContainerKind>,
        sink: &mut S,
    ) -> Result<()> {
        match event {
            None => sink.on_bytes(&[byte]),

            Some(LexEvent::TopLevelWhitespace) => sink.on_separator(&[byte]),

            Some(LexEvent::ValueStart(kind)) => {
                self.push_path_for_new_value(enclosing_before);
                if kind == ValueKind::Array {
                    self.array_counters.push(0);
                }
                sink.on_start(&self.path.snapshot());
                sink.on_bytes(&[byte]);
            }

            Some(LexEvent::Colon) => sink.on_bytes(&[byte]),

            Some(LexEvent::Comma(ContainerKind::Object)) => sink.on_bytes(&[byte]),
            Some(LexEvent::Comma(ContainerKind::Array)) => {
                sink.on_bytes(&[byte]);
                if let Some(counter) = self.array_counters.last_mut() {
                    *counter += 1;
                }
            }

            Some(LexEvent::KeyStart) => {
                sink.on_key_start();
                sink.on_bytes(&[byte]);
            }
            Some(LexEvent::KeyEnd) => {
                sink.on_bytes(&[byte]);
                let key = self.lexer.take_key();
                self.pending_key = Some(key);
                self.lexer.enter_expect_colon();
            }

            Some(LexEvent::ContainerEnd(kind)) => {
                sink.on_container_end();
                sink.on_bytes(&[byte]);
                sink.on_end(&self.path.snapshot());
                self.path.pop();
                if kind == ContainerKind::Array {
                    self.array_counters.pop();
                }
            }

            Some(LexEvent::ScalarEnd { reprocess, .. }) => {
                if !reprocess {
                    sink.on_bytes(&[byte]);
                }
                sink.on_end(&self.path.snapshot());
                self.path.pop();
            }
        }
        Ok(())
    }

    fn push_path_for_new_value(&mut self, enclosing: Option<ContainerKind>) {
        match enclosing {
            None => {}
            Some(ContainerKind::Object) => {
                let key = self
                    .pending_key
                    .take()
                    .expect("an object member value must be preceded by a key");
                self.path.push_key(key);
            }
            Some(ContainerKind::Array) => {
                let index = *self
                    .array_counters
                    .last()
                    .expect("an array element must be preceded by an open array frame");
                self.path.push_index(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        starts: Vec<String>,
        ends: Vec<String>,
        bytes: Vec<u8>,
        separators: Vec<u8>,
    }

    impl EmitterSink for Recorder {
        fn on_start(&mut self, path: &Path) {
            self.starts.push(path.serialize());
        }
        fn on_bytes(&mut self, bytes: &[u8]) {
            self.bytes.extend_from_slice(bytes);
        }
        fn on_end(&mut self, path: &Path) {
            self.ends.push(path.serialize());
        }
        fn on_separator(&mut self, bytes: &[u8]) {
            self.separators.extend_from_slice(bytes);
        }
    }

    fn run(input: &[u8]) -> Recorder {
        let mut emitter = Emitter::new();
        let mut rec = Recorder::default();
        emitter.process(input, &mut rec).unwrap();
        emitter.terminate(&mut rec).unwrap();
        rec
    }

    #[test]
    fn simple_array_of_strings() {
        let rec = run(br#"{"users": ["john","carl","bob"]}"#);
        assert!(rec.starts.contains(&"{\"users\"}[0]".to_string()));
        assert!(rec.starts.contains(&"{\"users\"}[1]".to_string()));
        assert!(rec.starts.contains(&"{\"users\"}[2]".to_string()));
        assert_eq!(rec.starts.len(), rec.ends.len());
        assert_eq!(rec.bytes, br#"{"users": ["john","carl","bob"]}"#.to_vec());
    }

    #[test]
    fn root_path_is_empty() {
        let rec = run(b"42");
        assert_eq!(rec.starts, vec!["".to_string()]);
        assert_eq!(rec.ends, vec!["".to_string()]);
    }

    #[test]
    fn nested_object_depth() {
        let rec = run(br#"{"a":{"b":1}}"#);
        assert!(rec.starts.contains(&"{\"a\"}".to_string()));
        assert!(rec.starts.contains(&"{\"a\"}{\"b\"}".to_string()));
    }

    #[test]
    fn byte_boundary_independence() {
        let input = br#"{"users": ["john","carl","bob"],"n":-12.5e1}"#;
        let whole = run(input);

        let mut emitter = Emitter::new();
        let mut rec = Recorder::default();
        for byte in input {
            emitter.process(std::slice::from_ref(byte), &mut rec).unwrap();
        }
        emitter.terminate(&mut rec).unwrap();

        assert_eq!(whole.bytes, rec.bytes);
        assert_eq!(whole.starts, rec.starts);
        assert_eq!(whole.ends, rec.ends);
    }

    #[test]
    fn concatenated_top_level_values_each_get_root_path() {
        let rec = run(b"1 2 3");
        assert_eq!(rec.starts, vec!["", "", ""]);
        assert_eq!(rec.separators, vec![b' ', b' ']);
    }

    #[test]
    fn truncated_container_is_an_error() {
        let mut emitter = Emitter::new();
        let mut rec = Recorder::default();
        emitter.process(br#"{"a":1"#, &mut rec).unwrap();
        assert!(emitter.terminate(&mut rec).is_err());
    }
}
