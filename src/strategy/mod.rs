//! The five top-level drivers (spec.md §4.6) that wire an [`Emitter`] to
//! a list of `(matcher, handler)` bindings and assemble an output byte
//! stream: [`extract`], [`filter`], [`convert`], [`trigger`] and [`all`].
//!
//! Each strategy owns one [`Emitter`], a binding list (matcher index =
//! registration order = `MatcherId`), and whatever working buffers it
//! needs; all five share the small live-span bookkeeping below rather
//! than reimplementing "which matchers are live for the element I'm
//! currently inside" five times.

pub mod all;
pub mod convert;
pub mod extract;
pub mod filter;
pub mod trigger;

use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::matcher::Matcher;
use crate::path::Path;
use std::cell::RefCell;

pub use all::All;
pub use convert::Convert;
pub use extract::Extract;
pub use filter::Filter;
pub use trigger::Trigger;

/// One `(matcher, handler)` registration. `RefCell` lets `on_bytes`
/// thread bytes through every live handler without the strategy having
/// to prove to the borrow checker that no two live handlers alias —
/// strategies only ever touch one binding's handler at a time.
pub(crate) struct Binding {
    matcher: Matcher,
    handler: RefCell<Box<dyn Handler>>,
}

impl Binding {
    fn new(matcher: Matcher, handler: Box<dyn Handler>) -> Self {
        Self {
            matcher,
            handler: RefCell::new(handler),
        }
    }
}

/// An output chunk produced by a strategy: either raw pass-through bytes
/// or a `(path, data)` pair for a per-element sink (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRecord {
    Bytes(Vec<u8>),
    Element { path: Option<Path>, data: Vec<u8> },
}

/// Every strategy's common surface (spec.md §4.6): register bindings,
/// feed chunks, and flush at the end of input.
pub trait Strategy {
    /// Register a matcher/handler pair. `matcher_id` for callbacks is
    /// this binding's position in registration order.
    fn add_binding(&mut self, matcher: Matcher, handler: Box<dyn Handler>) -> MatcherId;

    /// Feed one chunk of input, in any size, including a single byte.
    fn process(&mut self, chunk: &[u8]) -> Result<Vec<OutputRecord>>;

    /// Signal end of input; flush trailing emissions and return them.
    fn terminate(&mut self) -> Result<Vec<OutputRecord>>;
}

/// Evaluate every binding's matcher against `path`, in registration
/// order, returning the ids that matched (spec.md §4.4's tie-break: the
/// order bindings were registered).
pub(crate) fn matched_ids(bindings: &[Binding], path: &Path) -> Vec<MatcherId> {
    bindings
        .iter()
        .enumerate()
        .filter(|(_, b)| b.matcher.matches(path))
        .map(|(i, _)| i)
        .collect()
}

/// Appends one [`crate::options::TraceEntry`] per matched id, behind the
/// `logging` feature. Shared by every strategy's `Sink::on_start` so the
/// trace stays consistent across them.
#[cfg(feature = "logging")]
pub(crate) fn trace_matches(
    trace: &mut Vec<crate::options::TraceEntry>,
    ids: &[MatcherId],
    path: &Path,
) {
    for &id in ids {
        trace.push(crate::options::TraceEntry {
            matcher_id: id,
            path: path.serialize(),
        });
    }
}

pub(crate) fn handler_on_start(
    bindings: &[Binding],
    ids: &[MatcherId],
    path: &Path,
) -> Result<()> {
    for &id in ids {
        let mut h = bindings[id].handler.borrow_mut();
        let p = if h.use_path() { Some(path) } else { None };
        h.on_start(p, id)?;
    }
    Ok(())
}

pub(crate) fn handler_on_feed(bindings: &[Binding], ids: &[MatcherId], bytes: &[u8]) -> Result<()> {
    for &id in ids {
        bindings[id].handler.borrow_mut().on_feed(bytes, id)?;
    }
    Ok(())
}

/// Runs every matched id's `on_end` in registration order and
/// concatenates whatever bytes they return (spec.md §4.4: "a handler
/// that returns output bytes contributes them in that order").
pub(crate) fn handler_on_end(
    bindings: &[Binding],
    ids: &[MatcherId],
    path: &Path,
) -> Result<Option<Vec<u8>>> {
    let mut combined: Option<Vec<u8>> = None;
    for &id in ids {
        let mut h = bindings[id].handler.borrow_mut();
        let p = if h.use_path() { Some(path) } else { None };
        if let Some(bytes) = h.on_end(p, id)? {
            combined.get_or_insert_with(Vec::new).extend(bytes);
        }
    }
    Ok(combined)
}
