//! Observer that counts how many elements were seen at each
//! *normalized* path — array indices collapsed to `[]` — and reports
//! the sorted tally at `terminate()`. Mirrors the `all` strategy's
//! `AnalyserHandler` in the upstream bindings (spec.md §8 scenario S5).

use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::path::{Path, PathElement};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct AnalyserHandler {
    counts: BTreeMap<String, usize>,
}

impl AnalyserHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted `(normalized_path, count)` pairs, the shape printed on
    /// stderr by the CLI's `all` subcommand.
    pub fn report(&self) -> Vec<(String, usize)> {
        self.counts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

fn normalize(path: &Path) -> String {
    let mut out = String::new();
    for el in path.elements() {
        match el {
            PathElement::Key(k) => {
                out.push('{');
                out.push('"');
                out.push_str(k);
                out.push('"');
                out.push('}');
            }
            PathElement::Index(_) => out.push_str("[]"),
        }
    }
    out
}

impl Handler for AnalyserHandler {
    fn on_start(&mut self, path: Option<&Path>, _matcher_id: MatcherId) -> Result<()> {
        if let Some(path) = path {
            *self.counts.entry(normalize(path)).or_insert(0) += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_indices_and_sorts() {
        let mut h = AnalyserHandler::new();
        let mut users = Path::new();
        users.push_key("users".to_string());
        for i in 0..3 {
            let mut p = users.clone();
            p.push_index(i);
            h.on_start(Some(&p), 0).unwrap();
        }
        h.on_start(Some(&users), 0).unwrap();

        let mut groups = Path::new();
        groups.push_key("groups".to_string());
        for i in 0..2 {
            let mut p = groups.clone();
            p.push_index(i);
            h.on_start(Some(&p), 0).unwrap();
        }
        h.on_start(Some(&groups), 0).unwrap();
        h.on_start(Some(&Path::new()), 0).unwrap();

        assert_eq!(
            h.report(),
            vec![
                ("".to_string(), 1),
                ("{\"groups\"}".to_string(), 1),
                ("{\"groups\"}[]".to_string(), 2),
                ("{\"users\"}".to_string(), 1),
                ("{\"users\"}[]".to_string(), 3),
            ]
        );
    }
}
