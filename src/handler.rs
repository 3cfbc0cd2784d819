//! Handler protocol: user-supplied sinks/transformers invoked on
//! Start/Data/End. A handler may be a converter (its returned bytes
//! replace the element's bytes in the strategy's output) or an observer.
//!
//! Modeled on `streamson.handler.py`'s native handler wrappers and on
//! `PythonConverterHandler`'s buffer-then-convert-on-end shape: a handler
//! here accumulates whatever it needs in `on_feed` and produces its
//! converted bytes from `on_end`, rather than streaming partial output
//! mid-element (simpler, and sufficient for every built-in handler this
//! engine needs).

use crate::error::Result;
use crate::path::Path;

/// Identifies which `(matcher, handler)` binding a callback belongs to;
/// matcher/handler indices are registration order within a strategy.
pub type MatcherId = usize;

/// A sink or transformer invoked for every element matched by at least
/// one of a strategy's bindings.
///
/// Every method has a default no-op implementation so a handler only
/// needs to override what it cares about.
pub trait Handler: std::fmt::Debug {
    /// When true, a converting strategy (Convert/All-convert) replaces
    /// the element's raw bytes with whatever `on_end` returns.
    fn is_converter(&self) -> bool {
        false
    }

    /// Whether the strategy should bother computing/cloning a path
    /// snapshot for this handler's callbacks. Handlers that ignore the
    /// path (e.g. a plain byte counter) can return false to skip the
    /// allocation.
    fn use_path(&self) -> bool {
        true
    }

    fn on_start(&mut self, _path: Option<&Path>, _matcher_id: MatcherId) -> Result<()> {
        Ok(())
    }

    fn on_feed(&mut self, _bytes: &[u8], _matcher_id: MatcherId) -> Result<()> {
        Ok(())
    }

    /// Called once the matched element's final byte has been fed.
    /// Returns converter output, if any.
    fn on_end(&mut self, _path: Option<&Path>, _matcher_id: MatcherId) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    /// Chain `self` followed by `next` into a [`Chain`] (spec.md §4.5's
    /// handler composition: "the output bytes of handler N become input
    /// bytes of handler N+1").
    fn then(self, next: impl Handler + 'static) -> Chain
    where
        Self: Sized + 'static,
    {
        Chain::new(vec![Box::new(self), Box::new(next)])
    }
}

/// Chains a sequence of handlers so the converter output of handler N
/// feeds handler N+1's `on_feed` as input, with the final handler's
/// `on_end` output becoming the chain's output. Mirrors handler grouping
/// by `GROUP` on the CLI (spec.md §6) and `original_source`'s linked-list
/// handler composition.
#[derive(Debug)]
pub struct Chain {
    handlers: Vec<Box<dyn Handler>>,
}

impl Chain {
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Self {
        Self { handlers }
    }
}

impl Handler for Chain {
    fn is_converter(&self) -> bool {
        self.handlers.iter().any(|h| h.is_converter())
    }

    fn use_path(&self) -> bool {
        self.handlers.iter().any(|h| h.use_path())
    }

    fn on_start(&mut self, path: Option<&Path>, matcher_id: MatcherId) -> Result<()> {
        for h in &mut self.handlers {
            h.on_start(path, matcher_id)?;
        }
        Ok(())
    }

    fn on_feed(&mut self, bytes: &[u8], matcher_id: MatcherId) -> Result<()> {
        for h in &mut self.handlers {
            h.on_feed(bytes, matcher_id)?;
        }
        Ok(())
    }

    fn on_end(&mut self, path: Option<&Path>, matcher_id: MatcherId) -> Result<Option<Vec<u8>>> {
        let mut last_output: Option<Vec<u8>> = None;
        for h in &mut self.handlers {
            if let Some(bytes) = &last_output {
                h.on_feed(bytes, matcher_id)?;
            }
            let out = h.on_end(path, matcher_id)?;
            if out.is_some() {
                last_output = out;
            }
        }
        Ok(last_output)
    }
}

/// Wraps a handler behind `Rc<RefCell<_>>` so a caller can keep its own
/// handle to a handler after handing an owned copy to a strategy —
/// needed by the CLI to read an [`crate::handlers::analyser::AnalyserHandler`]'s
/// report after `terminate()`, since [`crate::strategy::Strategy::add_binding`]
/// takes ownership of the `Box<dyn Handler>`.
#[derive(Debug)]
pub struct Shared<H>(pub std::rc::Rc<std::cell::RefCell<H>>);

impl<H> Shared<H> {
    pub fn new(handler: H) -> Self {
        Self(std::rc::Rc::new(std::cell::RefCell::new(handler)))
    }
}

// Not `#[derive(Clone)]`: the derive would add an `H: Clone` bound even
// though cloning a `Shared` only bumps the `Rc` refcount and never
// touches `H` itself.
impl<H> Clone for Shared<H> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<H: Handler> Handler for Shared<H> {
    fn is_converter(&self) -> bool {
        self.0.borrow().is_converter()
    }

    fn use_path(&self) -> bool {
        self.0.borrow().use_path()
    }

    fn on_start(&mut self, path: Option<&Path>, matcher_id: MatcherId) -> Result<()> {
        self.0.borrow_mut().on_start(path, matcher_id)
    }

    fn on_feed(&mut self, bytes: &[u8], matcher_id: MatcherId) -> Result<()> {
        self.0.borrow_mut().on_feed(bytes, matcher_id)
    }

    fn on_end(&mut self, path: Option<&Path>, matcher_id: MatcherId) -> Result<Option<Vec<u8>>> {
        self.0.borrow_mut().on_end(path, matcher_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Upper(Vec<u8>);
    impl Handler for Upper {
        fn is_converter(&self) -> bool {
            true
        }
        fn on_feed(&mut self, bytes: &[u8], _matcher_id: MatcherId) -> Result<()> {
            self.0.extend(bytes);
            Ok(())
        }
        fn on_end(
            &mut self,
            _path: Option<&Path>,
            _matcher_id: MatcherId,
        ) -> Result<Option<Vec<u8>>> {
            Ok(Some(self.0.to_ascii_uppercase()))
        }
    }

    #[derive(Debug, Default)]
    struct Exclaim;
    impl Handler for Exclaim {
        fn is_converter(&self) -> bool {
            true
        }
        fn on_end(
            &mut self,
            _path: Option<&Path>,
            _matcher_id: MatcherId,
        ) -> Result<Option<Vec<u8>>> {
            Ok(Some(b"!".to_vec()))
        }
    }

    #[test]
    fn chain_feeds_output_forward() {
        let mut chain = Chain::new(vec![Box::new(Upper::default()), Box::new(Exclaim)]);
        chain.on_feed(b"hi", 0).unwrap();
        let out = chain.on_end(None, 0).unwrap();
        assert_eq!(out, Some(b"!".to_vec()));
    }

    #[test]
    fn shared_handle_observes_after_move() {
        let shared = Shared::new(Upper::default());
        let mut boxed: Box<dyn Handler> = Box::new(shared.clone());
        boxed.on_feed(b"hi", 0).unwrap();
        boxed.on_end(None, 0).unwrap();
        assert_eq!(shared.0.borrow().0, b"HI".to_vec());
    }
}
