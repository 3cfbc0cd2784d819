//! Converter that applies an ordered list of regex replacements to an
//! element's bytes.

use crate::error::{Result, StreamsonError};
use crate::handler::{Handler, MatcherId};
use crate::path::Path;
use regex::Regex;

#[derive(Debug)]
pub struct RegexHandler {
    patterns: Vec<(Regex, String)>,
    current: Vec<u8>,
}

impl RegexHandler {
    pub fn new(patterns: Vec<(String, String)>) -> Result<Self> {
        let compiled = patterns
            .into_iter()
            .map(|(pattern, replacement)| {
                Regex::new(&pattern)
                    .map(|re| (re, replacement))
                    .map_err(|source| StreamsonError::InvalidRegex { pattern, source })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns: compiled,
            current: Vec::new(),
        })
    }
}

impl Handler for RegexHandler {
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
        let mut text = String::from_utf8_lossy(&self.current).into_owned();
        for (re, replacement) in &self.patterns {
            text = re.replace_all(&text, replacement.as_str()).into_owned();
        }
        Ok(Some(text.into_bytes()))
    }
}
