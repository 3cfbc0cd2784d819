//! Converter that substitutes fixed bytes for the whole matched element.

use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::path::Path;

#[derive(Debug, Clone)]
pub struct ReplaceHandler {
    replacement: Vec<u8>,
}

impl ReplaceHandler {
    pub fn new(replacement: impl Into<Vec<u8>>) -> Self {
        Self {
            replacement: replacement.into(),
        }
    }
}

impl Handler for ReplaceHandler {
    fn is_converter(&self) -> bool {
        true
    }

    fn use_path(&self) -> bool {
        false
    }

    fn on_end(&mut self, _path: Option<&Path>, _matcher_id: MatcherId) -> Result<Option<Vec<u8>>> {
        Ok(Some(self.replacement.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_returns_fixed_bytes() {
        let mut h = ReplaceHandler::new(&b"\"***\""[..]);
        assert_eq!(h.on_end(None, 0).unwrap(), Some(b"\"***\"".to_vec()));
    }
}
