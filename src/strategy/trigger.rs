//! Passes every byte through unchanged; handlers run purely for side
//! effects and their output is discarded. The fastest strategy, since it
//! never has to buffer or rewrite anything (mirrors upstream's own
//! description of `Trigger` as "the fastest strategy in streamson-lib").

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
}

struct Sink<'a> {
    bindings: &'a [Binding],
    stack: Vec<Frame>,
    output: Vec<u8>,
    error: Option<crate::error::StreamsonError>,
    #[cfg(feature = "logging")]
    trace: Vec<TraceEntry>,
}

impl<'a> Sink<'a> {
    fn new(bindings: &'a [Binding]) -> Self {
        Self {
            bindings,
            stack: Vec::new(),
            output: Vec::new(),
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
            self.stack.push(Frame { ids: Vec::new() });
            return;
        }
        let ids = matched_ids(self.bindings, path);
        #[cfg(feature = "logging")]
        trace_matches(&mut self.trace, &ids, path);
        if let Err(e) = handler_on_start(self.bindings, &ids, path) {
            self.fail(e);
        }
        self.stack.push(Frame { ids });
    }

    fn on_bytes(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
        if self.error.is_some() {
            return;
        }
        for frame in &self.stack {
            if let Err(e) = handler_on_feed(self.bindings, &frame.ids, bytes) {
                self.error = Some(e);
                return;
            }
        }
    }

    fn on_end(&mut self, path: &Path) {
        let frame = self.stack.pop().expect("on_end without matching on_start");
        if self.error.is_some() {
            return;
        }
        if let Err(e) = handler_on_end(self.bindings, &frame.ids, path) {
            self.fail(e);
        }
    }

    fn on_separator(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }
}

/// Pass-through strategy that fires handlers for their side effects
/// (spec.md §4.6).
#[derive(Default)]
pub struct Trigger {
    bindings: Vec<Binding>,
    emitter: Emitter,
    #[cfg(feature = "logging")]
    trace: Vec<TraceEntry>,
}

impl Trigger {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            emitter: Emitter::new(),
            #[cfg(feature = "logging")]
            trace: Vec::new(),
        }
    }

    /// Every matcher/path pair observed so far (requires the `logging`
    /// feature).
    #[cfg(feature = "logging")]
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }
}

impl Strategy for Trigger {
    fn add_binding(&mut self, matcher: Matcher, handler: Box<dyn Handler>) -> MatcherId {
        self.bindings.push(Binding::new(matcher, handler));
        self.bindings.len() - 1
    }

    fn process(&mut self, chunk: &[u8]) -> Result<Vec<OutputRecord>> {
        let mut sink = Sink::new(&self.bindings);
        self.emitter.process(chunk, &mut sink)?;
        if let Some(e) = sink.error {
            return Err(e);
        }
        #[cfg(feature = "logging")]
        self.trace.append(&mut sink.trace);
        Ok(vec![OutputRecord::Bytes(sink.output)])
    }

    fn terminate(&mut self) -> Result<Vec<OutputRecord>> {
        let mut sink = Sink::new(&self.bindings);
        self.emitter.terminate(&mut sink)?;
        if let Some(e) = sink.error {
            return Err(e);
        }
        #[cfg(feature = "logging")]
        self.trace.append(&mut sink.trace);
        Ok(vec![OutputRecord::Bytes(sink.output)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Recorder(Rc<RefCell<Vec<(String, Vec<u8>)>>>);

    impl Handler for Recorder {
        fn on_end(&mut self, path: Option<&Path>, _id: MatcherId) -> Result<Option<Vec<u8>>> {
            self.0
                .borrow_mut()
                .push((path.unwrap().serialize(), Vec::new()));
            Ok(None)
        }
    }

    #[test]
    fn pass_through_round_trip() {
        let input = br#"{"users": ["john","carl","bob"]}"#;
        let mut t = Trigger::new();
        let mut out = Vec::new();
        for rec in t.process(input).unwrap() {
            if let OutputRecord::Bytes(b) = rec {
                out.extend(b);
            }
        }
        for rec in t.terminate().unwrap() {
            if let OutputRecord::Bytes(b) = rec {
                out.extend(b);
            }
        }
        assert_eq!(out, input.to_vec());
    }

    #[test]
    fn nested_matches_fire_independently() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut t = Trigger::new();
        t.add_binding(
            Matcher::parse_depth("0-2").unwrap(),
            Box::new(Recorder(log.clone())),
        );
        t.process(br#"{"a":{"b":1}}"#).unwrap();
        t.terminate().unwrap();
        let fired: Vec<String> = log.borrow().iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(fired, vec!["{\"a\"}{\"b\"}", "{\"a\"}", ""]);
    }
}
