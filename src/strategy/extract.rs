//! Captures raw bytes of matched elements and emits each as an
//! independent `(path, data)` record on `End`. Nested matches are
//! delivered independently (spec.md §4.6): an outer match's capture
//! buffer keeps accumulating through an inner match's own Start/End.

use super::{handler_on_end, handler_on_feed, handler_on_start, matched_ids, Binding, OutputRecord, Strategy};
#[cfg(feature = "logging")]
use super::trace_matches;
use crate::emitter::{Emitter, EmitterSink};
use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::matcher::Matcher;
#[cfg(feature = "logging")]
use crate::options::TraceEntry;
use crate::path::Path;

struct Frame {
    ids: Vec<MatcherId>,
    raw: Vec<u8>,
}

struct Sink<'a> {
    bindings: &'a [Binding],
    require_path: bool,
    stack: Vec<Frame>,
    records: Vec<OutputRecord>,
    error: Option<crate::error::StreamsonError>,
    #[cfg(feature = "logging")]
    trace: Vec<TraceEntry>,
}

impl<'a> Sink<'a> {
    fn new(bindings: &'a [Binding], require_path: bool) -> Self {
        Self {
            bindings,
            require_path,
            stack: Vec::new(),
            records: Vec::new(),
            error: None,
            #[cfg(feature = "logging")]
            trace: Vec::new(),
        }
    }

    fn fail(&mut self, e: crate::error::StreamsonError) {
        if self.error.is_none() {
            self.error = Some(e);
        }
    }
}

impl<'a> EmitterSink for Sink<'a> {
    fn on_start(&mut self, path: &Path) {
        if self.error.is_some() {
            self.stack.push(Frame {
                ids: Vec::new(),
                raw: Vec::new(),
            });
            return;
        }
        let ids = matched_ids(self.bindings, path);
        #[cfg(feature = "logging")]
        trace_matches(&mut self.trace, &ids, path);
        if let Err(e) = handler_on_start(self.bindings, &ids, path) {
            self.fail(e);
        }
        self.stack.push(Frame {
            ids,
            raw: Vec::new(),
        });
    }

    fn on_bytes(&mut self, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }
        for frame in &mut self.stack {
            if frame.ids.is_empty() {
                continue;
            }
            frame.raw.extend_from_slice(bytes);
            if let Err(e) = handler_on_feed(self.bindings, &frame.ids, bytes) {
                self.error = Some(e);
                return;
            }
        }
    }

    fn on_end(&mut self, path: &Path) {
        let frame = self.stack.pop().expect("on_end without matching on_start");
        if self.error.is_some() || frame.ids.is_empty() {
            return;
        }
        match handler_on_end(self.bindings, &frame.ids, path) {
            Ok(converted) => {
                let data = converted.unwrap_or(frame.raw);
                self.records.push(OutputRecord::Element {
                    path: self.require_path.then(|| path.clone()),
                    data,
                });
            }
            Err(e) => self.fail(e),
        }
    }

    fn on_separator(&mut self, _bytes: &[u8]) {}
}

/// Emits one `(path, data)` record per matched element (spec.md §4.6).
pub struct Extract {
    bindings: Vec<Binding>,
    emitter: Emitter,
    require_path: bool,
    #[cfg(feature = "logging")]
    trace: Vec<TraceEntry>,
}

impl Default for Extract {
    fn default() -> Self {
        Self::new()
    }
}

impl Extract {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            emitter: Emitter::new(),
            require_path: true,
            #[cfg(feature = "logging")]
            trace: Vec::new(),
        }
    }

    /// Attach the matched path to every emitted record (default: on).
    pub fn require_path(mut self, require: bool) -> Self {
        self.require_path = require;
        self
    }

    /// Every matcher/path pair observed so far (requires the `logging`
    /// feature).
    #[cfg(feature = "logging")]
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }
}

impl Strategy for Extract {
    fn add_binding(&mut self, matcher: Matcher, handler: Box<dyn Handler>) -> MatcherId {
        self.bindings.push(Binding::new(matcher, handler));
        self.bindings.len() - 1
    }

    fn process(&mut self, chunk: &[u8]) -> Result<Vec<OutputRecord>> {
        let mut sink = Sink::new(&self.bindings, self.require_path);
        self.emitter.process(chunk, &mut sink)?;
        if let Some(e) = sink.error {
            return Err(e);
        }
        #[cfg(feature = "logging")]
        self.trace.append(&mut sink.trace);
        Ok(sink.records)
    }

    fn terminate(&mut self) -> Result<Vec<OutputRecord>> {
        let mut sink = Sink::new(&self.bindings, self.require_path);
        self.emitter.terminate(&mut sink)?;
        if let Some(e) = sink.error {
            return Err(e);
        }
        #[cfg(feature = "logging")]
        self.trace.append(&mut sink.trace);
        Ok(sink.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::replace::ReplaceHandler;

    fn records_of(strategy: &mut Extract, input: &[u8]) -> Vec<OutputRecord> {
        let mut out = strategy.process(input).unwrap();
        out.extend(strategy.terminate().unwrap());
        out
    }

    #[test]
    fn scenario_s1_array_elements() {
        let mut e = Extract::new();
        e.add_binding(
            Matcher::parse_simple(r#"{"users"}[]"#).unwrap(),
            Box::new(crate::handlers::buffer::BufferHandler::new()),
        );
        let recs = records_of(&mut e, br#"{"users": ["john","carl","bob"]}"#);
        let flat: Vec<(String, Vec<u8>)> = recs
            .into_iter()
            .map(|r| match r {
                OutputRecord::Element { path, data } => (path.unwrap().serialize(), data),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            flat,
            vec![
                ("{\"users\"}[0]".to_string(), b"\"john\"".to_vec()),
                ("{\"users\"}[1]".to_string(), b"\"carl\"".to_vec()),
                ("{\"users\"}[2]".to_string(), b"\"bob\"".to_vec()),
            ]
        );
    }

    #[test]
    fn scenario_s2_depth_range_emits_both_levels() {
        let mut e = Extract::new();
        e.add_binding(
            Matcher::parse_depth("0-1").unwrap(),
            Box::new(crate::handlers::buffer::BufferHandler::new()),
        );
        let recs = records_of(&mut e, br#"{"users": ["john","carl","bob"]}"#);
        let paths: Vec<String> = recs
            .into_iter()
            .map(|r| match r {
                OutputRecord::Element { path, .. } => path.unwrap().serialize(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(paths, vec!["{\"users\"}".to_string(), "".to_string()]);
    }

    #[test]
    fn converter_handler_replaces_extracted_bytes() {
        let mut e = Extract::new();
        e.add_binding(
            Matcher::parse_simple(r#"{"users"}[1]"#).unwrap(),
            Box::new(ReplaceHandler::new(&b"\"***\""[..])),
        );
        let recs = records_of(&mut e, br#"{"users": ["john","carl","bob"]}"#);
        match &recs[0] {
            OutputRecord::Element { data, .. } => assert_eq!(data, b"\"***\""),
            _ => unreachable!(),
        }
    }

    #[test]
    fn concatenation_equals_document_minus_whitespace() {
        let mut e = Extract::new().require_path(false);
        e.add_binding(
            Matcher::parse_depth("0").unwrap(),
            Box::new(crate::handlers::buffer::BufferHandler::new()),
        );
        let recs = records_of(&mut e, b"1 2 3");
        let concatenated: Vec<u8> = recs
            .into_iter()
            .flat_map(|r| match r {
                OutputRecord::Element { data, .. } => data,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(concatenated, b"123".to_vec());
    }
}
