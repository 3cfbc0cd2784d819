//! Engine-wide configuration (spec.md §6, §11) and the optional match
//! trace exposed behind the `logging` feature, the direct analogue of
//! the teacher's `Options::logging`/`RepairLogEntry` pair for a matching
//! engine instead of a repair tool.

use crate::handler::MatcherId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    /// Chunk size a CLI reader should use when pulling bytes from its
    /// input source. The engine itself accepts chunks of any size; this
    /// only governs the CLI's own read loop (spec.md §6's `-b`/
    /// `--buffer-size`, default 2^20 bytes).
    pub buffer_size: usize,
    /// Whether `Extract` attaches the matched `Path` to each emitted
    /// record by default (`Extract::require_path`'s starting value).
    pub require_path: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            buffer_size: 1 << 20,
            require_path: true,
        }
    }
}

/// One matcher firing against one element, recorded when the `logging`
/// feature is enabled. Mirrors `RepairLogEntry`'s role: a debugging trail
/// a caller can inspect after the fact, not part of the engine's output.
#[cfg(feature = "logging")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub matcher_id: MatcherId,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_buffer_size_is_one_mebibyte() {
        assert_eq!(EngineOptions::default().buffer_size, 1 << 20);
        assert!(EngineOptions::default().require_path);
    }
}
