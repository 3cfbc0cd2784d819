//! Treats every element as matched (the implicit `All` matcher, spec.md
//! §4.6): handlers run against every element in the document, nested
//! elements included. A registered converter handler rewrites the whole
//! document from its own output ("convert mode" per the spec); a plain
//! handler's output is discarded and the byte stream passes through
//! verbatim ("observer mode") — both behaviors fall out of [`Convert`]'s
//! existing root-capture bookkeeping once every element matches, so
//! `All` is built directly on top of it rather than duplicating its
//! `Sink`.

use super::{Convert, OutputRecord, Strategy};
use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::matcher::Matcher;

/// Runs handlers against every element of the document (spec.md §4.6).
#[derive(Default)]
pub struct All {
    inner: Convert,
}

impl All {
    pub fn new() -> Self {
        Self {
            inner: Convert::new(),
        }
    }

    /// Register a handler to run against every element, in registration
    /// order. Returns its `MatcherId` for diagnostics.
    pub fn add_handler(&mut self, handler: Box<dyn Handler>) -> MatcherId {
        self.inner.add_binding(Matcher::all(), handler)
    }

    /// Every matcher/path pair observed so far (requires the `logging`
    /// feature).
    #[cfg(feature = "logging")]
    pub fn trace(&self) -> &[crate::options::TraceEntry] {
        self.inner.trace()
    }
}

impl Strategy for All {
    /// The supplied matcher is ignored — every binding matches every
    /// element, per spec.md §4.6's "matcher is implicit `All`".
    fn add_binding(&mut self, _matcher: Matcher, handler: Box<dyn Handler>) -> MatcherId {
        self.add_handler(handler)
    }

    fn process(&mut self, chunk: &[u8]) -> Result<Vec<OutputRecord>> {
        self.inner.process(chunk)
    }

    fn terminate(&mut self) -> Result<Vec<OutputRecord>> {
        self.inner.terminate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::analyser::AnalyserHandler;
    use crate::handlers::replace::ReplaceHandler;

    fn run(a: &mut All, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for rec in a.process(input).unwrap() {
            if let OutputRecord::Bytes(b) = rec {
                out.extend(b);
            }
        }
        for rec in a.terminate().unwrap() {
            if let OutputRecord::Bytes(b) = rec {
                out.extend(b);
            }
        }
        out
    }

    #[test]
    fn scenario_s5_observer_mode_is_pass_through() {
        let mut a = All::new();
        a.add_handler(Box::new(AnalyserHandler::new()));
        let input = br#"{"users":["john","carl","bob"],"groups":["admins","users"]}"#;
        assert_eq!(run(&mut a, input), input.to_vec());
    }

    #[test]
    fn convert_mode_rewrites_every_element() {
        let mut a = All::new();
        a.add_handler(Box::new(ReplaceHandler::new(&b"0"[..])));
        // The outermost element (the whole document) is the sole root
        // capture; its handler's output replaces the entire stream.
        assert_eq!(run(&mut a, br#"{"a":1}"#), b"0".to_vec());
    }

    #[test]
    fn no_handlers_is_round_trip() {
        let mut a = All::new();
        let input = br#"[1,2,3]"#;
        assert_eq!(run(&mut a, input), input.to_vec());
    }
}
