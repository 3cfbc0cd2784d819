//! Passes every byte through except matched elements, which are elided
//! along with whatever comma (and, for object members, key) keeps the
//! surrounding container valid (spec.md §4.6, §9). Handlers still fire
//! on elided elements for their side effects; their return value is
//! unused (Filter never rewrites, only removes).
//!
//! Elision policy (spec.md §9's recommended rule): dropping element `E`
//! drops the dangling `"key":` that precedes it (for an object member)
//! and whatever comma keeps the container valid — the *preceding* one
//! if some earlier sibling survived, the *following* one otherwise.
//!
//! Implemented by remembering, per open container, the output offset
//! right after the last sibling that was actually kept (or the
//! container's own opening byte, if none has been kept yet):
//!
//! - Eliding a member always truncates output back to that mark first —
//!   this is what removes the member's own dangling `"key":` together
//!   with whatever separator preceded it, in one step.
//! - If nothing has been kept yet in this container, the *next*
//!   separator run is also suppressed — but only up to the next
//!   member's key, the next element's value, or the container's own
//!   closing bracket if no sibling follows at all.
//!   [`crate::emitter::EmitterSink::on_key_start`] and
//!   [`crate::emitter::EmitterSink::on_container_end`] give the exact
//!   boundary for the first two cases; a plain sibling `Start` covers
//!   arrays.

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

struct Container {
    sep_mark: usize,
    just_opened: bool,
    emitted_any: bool,
    suppress_leading: bool,
}

struct Frame {
    discarded: bool,
    ids: Vec<MatcherId>,
    container: Option<Container>,
}

struct Sink<'a> {
    bindings: &'a [Binding],
    stack: Vec<Frame>,
    discard_depth: usize,
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
            discard_depth: 0,
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

    /// Clears the leading-elision suppression of whatever container is
    /// currently open. Called at every point a dropped leading run could
    /// end: a sibling's `on_start`, an object member's `on_key_start`, or
    /// the container's own `on_container_end`.
    fn clear_top_suppress(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            if let Some(cont) = top.container.as_mut() {
                cont.suppress_leading = false;
            }
        }
    }
}

impl<'a> EmitterSink for Sink<'a> {
    fn on_start(&mut self, path: &Path) {
        if self.discard_depth > 0 {
            self.discard_depth += 1;
            self.stack.push(Frame {
                discarded: true,
                ids: Vec::new(),
                container: None,
            });
            return;
        }
        if self.error.is_some() {
            self.stack.push(Frame {
                discarded: false,
                ids: Vec::new(),
                container: Some(Container {
                    sep_mark: 0,
                    just_opened: true,
                    emitted_any: false,
                    suppress_leading: false,
                }),
            });
            return;
        }

        self.clear_top_suppress();
        let ids = matched_ids(self.bindings, path);
        #[cfg(feature = "logging")]
        trace_matches(&mut self.trace, &ids, path);
        if ids.is_empty() {
            self.stack.push(Frame {
                discarded: false,
                ids,
                container: Some(Container {
                    sep_mark: 0,
                    just_opened: true,
                    emitted_any: false,
                    suppress_leading: false,
                }),
            });
            return;
        }

        if let Err(e) = handler_on_start(self.bindings, &ids, path) {
            self.fail(e);
        }
        if let Some(parent) = self.stack.last_mut() {
            if let Some(cont) = parent.container.as_mut() {
                if cont.emitted_any {
                    self.output.truncate(cont.sep_mark);
                } else {
                    self.output.truncate(cont.sep_mark);
                    cont.suppress_leading = true;
                }
            }
        }
        self.discard_depth = 1;
        self.stack.push(Frame {
            discarded: true,
            ids,
            container: None,
        });
    }

    fn on_key_start(&mut self) {
        if self.discard_depth == 0 {
            self.clear_top_suppress();
        }
    }

    fn on_container_end(&mut self) {
        if self.discard_depth == 0 {
            self.clear_top_suppress();
        }
    }

    fn on_bytes(&mut self, bytes: &[u8]) {
        if self.discard_depth > 0 {
            if self.error.is_none() {
                if let Some(top) = self.stack.last() {
                    if !top.ids.is_empty() {
                        let ids = top.ids.clone();
                        if let Err(e) = handler_on_feed(self.bindings, &ids, bytes) {
                            self.error = Some(e);
                        }
                    }
                }
            }
            return;
        }
        if let Some(top) = self.stack.last() {
            if let Some(cont) = &top.container {
                if cont.suppress_leading {
                    return;
                }
            }
        }
        self.output.extend_from_slice(bytes);
        if let Some(top) = self.stack.last_mut() {
            if let Some(cont) = top.container.as_mut() {
                if cont.just_opened {
                    cont.sep_mark = self.output.len();
                    cont.just_opened = false;
                }
            }
        }
    }

    fn on_end(&mut self, path: &Path) {
        let frame = self.stack.pop().expect("on_end without matching on_start");
        if frame.discarded {
            if self.discard_depth > 0 {
                self.discard_depth -= 1;
            }
            if self.discard_depth == 0 && self.error.is_none() && !frame.ids.is_empty() {
                if let Err(e) = handler_on_end(self.bindings, &frame.ids, path) {
                    self.fail(e);
                }
            }
            return;
        }
        if let Some(parent) = self.stack.last_mut() {
            if let Some(cont) = parent.container.as_mut() {
                cont.sep_mark = self.output.len();
                cont.emitted_any = true;
            }
        }
    }

    fn on_separator(&mut self, bytes: &[u8]) {
        if self.discard_depth == 0 {
            self.output.extend_from_slice(bytes);
        }
    }
}

/// Elides matched elements from the output (spec.md §4.6).
#[derive(Default)]
pub struct Filter {
    bindings: Vec<Binding>,
    emitter: Emitter,
    #[cfg(feature = "logging")]
    trace: Vec<TraceEntry>,
}

impl Filter {
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

impl Strategy for Filter {
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
    use crate::handlers::buffer::BufferHandler;

    fn run(f: &mut Filter, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for rec in f.process(input).unwrap() {
            if let OutputRecord::Bytes(b) = rec {
                out.extend(b);
            }
        }
        for rec in f.terminate().unwrap() {
            if let OutputRecord::Bytes(b) = rec {
                out.extend(b);
            }
        }
        out
    }

    #[test]
    fn scenario_s4_drop_preceding_comma() {
        let mut f = Filter::new();
        f.add_binding(
            Matcher::parse_simple(r#"{"users"}[]"#).unwrap(),
            Box::new(BufferHandler::new()),
        );
        let input = br#"{"users":["john","carl","bob"],"groups":["admins","users"]}"#;
        let out = run(&mut f, input);
        assert_eq!(
            out,
            br#"{"users":[],"groups":["admins","users"]}"#.to_vec()
        );
    }

    #[test]
    fn drop_first_array_element_keeps_the_rest() {
        let mut f = Filter::new();
        f.add_binding(Matcher::parse_simple(r#"[0]"#).unwrap(), Box::new(BufferHandler::new()));
        let out = run(&mut f, b"[1,2,3]");
        assert_eq!(out, b"[2,3]".to_vec());
    }

    #[test]
    fn drop_all_elements_leaves_empty_array() {
        let mut f = Filter::new();
        f.add_binding(Matcher::parse_depth("1").unwrap(), Box::new(BufferHandler::new()));
        let out = run(&mut f, b"[1,2,3]");
        assert_eq!(out, b"[]".to_vec());
    }

    #[test]
    fn drop_leading_run_of_elements() {
        let mut f = Filter::new();
        f.add_binding(
            Matcher::parse_simple("[0]").unwrap(),
            Box::new(BufferHandler::new()),
        );
        f.add_binding(
            Matcher::parse_simple("[1]").unwrap(),
            Box::new(BufferHandler::new()),
        );
        let out = run(&mut f, b"[1,2,3]");
        assert_eq!(out, b"[3]".to_vec());
    }

    #[test]
    fn drop_first_object_member_removes_its_key_and_comma() {
        let mut f = Filter::new();
        f.add_binding(
            Matcher::parse_simple(r#"{"a"}"#).unwrap(),
            Box::new(BufferHandler::new()),
        );
        let out = run(&mut f, br#"{"a":1,"b":2}"#);
        assert_eq!(out, br#"{"b":2}"#.to_vec());
    }

    #[test]
    fn drop_last_object_member_keeps_closing_brace() {
        let mut f = Filter::new();
        f.add_binding(
            Matcher::parse_simple(r#"{"b"}"#).unwrap(),
            Box::new(BufferHandler::new()),
        );
        let out = run(&mut f, br#"{"a":1,"b":2}"#);
        assert_eq!(out, br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn drop_only_member_leaves_empty_object() {
        let mut f = Filter::new();
        f.add_binding(
            Matcher::parse_simple(r#"{"a"}"#).unwrap(),
            Box::new(BufferHandler::new()),
        );
        let out = run(&mut f, br#"{"a":1}"#);
        assert_eq!(out, b"{}".to_vec());
    }

    #[test]
    fn idempotent_on_its_own_output() {
        let mut f1 = Filter::new();
        f1.add_binding(
            Matcher::parse_simple(r#"{"users"}[]"#).unwrap(),
            Box::new(BufferHandler::new()),
        );
        let input = br#"{"users":["john","carl","bob"],"groups":["admins"]}"#;
        let once = run(&mut f1, input);

        let mut f2 = Filter::new();
        f2.add_binding(
            Matcher::parse_simple(r#"{"users"}[]"#).unwrap(),
            Box::new(BufferHandler::new()),
        );
        let twice = run(&mut f2, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn whitespace_around_kept_siblings_preserved() {
        let mut f = Filter::new();
        f.add_binding(Matcher::parse_simple("[1]").unwrap(), Box::new(BufferHandler::new()));
        let out = run(&mut f, b"[1, 2, 3]");
        assert_eq!(out, b"[1, 3]".to_vec());
    }
}
