//! Rewrites matched elements in place: everything outside a match passes
//! through verbatim; a matched element's raw bytes are replaced by the
//! concatenation of its converter handlers' `on_end` output, in
//! registration order (spec.md §4.6).
//!
//! A match nested inside another match still fires its own handlers
//! independently (spec.md §9's nested-trigger rule applies here too),
//! but only the outermost match of a given span actually rewrites the
//! output — an inner rewrite would just be overwritten anyway once the
//! outer handler reassembles its own captured span. See DESIGN.md.

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
    is_root_capture: bool,
    raw: Vec<u8>,
}

struct Sink<'a> {
    bindings: &'a [Binding],
    stack: Vec<Frame>,
    capturing: bool,
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
            capturing: false,
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
            self.stack.push(Frame {
                ids: Vec::new(),
                is_root_capture: false,
                raw: Vec::new(),
            });
            return;
        }
        let ids = matched_ids(self.bindings, path);
        #[cfg(feature = "logging")]
        trace_matches(&mut self.trace, &ids, path);
        let is_root_capture = !ids.is_empty() && !self.capturing;
        if is_root_capture {
            self.capturing = true;
        }
        if let Err(e) = handler_on_start(self.bindings, &ids, path) {
            self.fail(e);
        }
        self.stack.push(Frame {
            ids,
            is_root_capture,
            raw: Vec::new(),
        });
    }

    fn on_bytes(&mut self, bytes: &[u8]) {
        if self.error.is_none() {
            for frame in &mut self.stack {
                if frame.ids.is_empty() {
                    continue;
                }
                if let Err(e) = handler_on_feed(self.bindings, &frame.ids, bytes) {
                    self.error = Some(e);
                    break;
                }
            }
        }
        if self.capturing {
            let root = self
                .stack
                .iter_mut()
                .rev()
                .find(|f| f.is_root_capture)
                .expect("capturing implies an open root-capture frame");
            root.raw.extend_from_slice(bytes);
        } else {
            self.output.extend_from_slice(bytes);
        }
    }

    fn on_end(&mut self, path: &Path) {
        let frame = self.stack.pop().expect("on_end without matching on_start");
        if self.error.is_some() {
            return;
        }
        let replacement = match handler_on_end(self.bindings, &frame.ids, path) {
            Ok(r) => r,
            Err(e) => {
                self.fail(e);
                return;
            }
        };
        if frame.is_root_capture {
            self.capturing = false;
            self.output.extend(replacement.unwrap_or(frame.raw));
        }
    }

    fn on_separator(&mut self, bytes: &[u8]) {
        if self.capturing {
            let root = self
                .stack
                .iter_mut()
                .rev()
                .find(|f| f.is_root_capture)
                .expect("capturing implies an open root-capture frame");
            root.raw.extend_from_slice(bytes);
        } else {
            self.output.extend_from_slice(bytes);
        }
    }
}

/// Replaces matched elements with converter output (spec.md §4.6).
#[derive(Default)]
pub struct Convert {
    bindings: Vec<Binding>,
    emitter: Emitter,
    #[cfg(feature = "logging")]
    trace: Vec<TraceEntry>,
}

impl Convert {
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

impl Strategy for Convert {
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
    use crate::handlers::replace::ReplaceHandler;
    use crate::handlers::unstringify::UnstringifyHandler;

    fn run(c: &mut Convert, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for rec in c.process(input).unwrap() {
            if let OutputRecord::Bytes(b) = rec {
                out.extend(b);
            }
        }
        for rec in c.terminate().unwrap() {
            if let OutputRecord::Bytes(b) = rec {
                out.extend(b);
            }
        }
        out
    }

    #[test]
    fn scenario_s3_replace_one_array_element() {
        let mut c = Convert::new();
        c.add_binding(
            Matcher::parse_simple(r#"{"users"}[1]"#).unwrap(),
            Box::new(ReplaceHandler::new(&b"\"***\""[..])),
        );
        let out = run(&mut c, br#"{"users": ["john","carl","bob"]}"#);
        assert_eq!(out, br#"{"users": ["john","***","bob"]}"#.to_vec());
    }

    #[test]
    fn scenario_s6_unstringify() {
        let mut c = Convert::new();
        c.add_binding(
            Matcher::parse_simple(r#"{"a"}"#).unwrap(),
            Box::new(UnstringifyHandler::new()),
        );
        let input = br#"{"a":"{\"b\":1}"}"#;
        let out = run(&mut c, input);
        assert_eq!(out, br#"{"a":{"b":1}}"#.to_vec());
    }

    #[test]
    fn no_bindings_is_round_trip() {
        let mut c = Convert::new();
        let input = br#"{"a":[1,2,{"b":3}]}"#;
        assert_eq!(run(&mut c, input), input.to_vec());
    }
}
