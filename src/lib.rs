//! `streamson`: a streaming JSON path-matching engine. Feeds a document
//! through byte-at-a-time in arbitrarily sized chunks, never materializing
//! it as a tree, and dispatches matched sub-values to user handlers via
//! one of five strategies — [`Extract`], [`Filter`], [`Convert`],
//! [`Trigger`] or [`All`].
//!
//! # Examples
//!
//! Pull every element of a `"users"` array out as its own record:
//!
//! ```
//! use streamson::{Extract, Matcher, Strategy};
//! use streamson::handlers::buffer::BufferHandler;
//!
//! let mut extract = Extract::new();
//! extract.add_binding(
//!     Matcher::parse_simple(r#"{"users"}[]"#).unwrap(),
//!     Box::new(BufferHandler::new()),
//! );
//! let mut records = extract.process(br#"{"users": ["a", "b"]}"#).unwrap();
//! records.extend(extract.terminate().unwrap());
//! assert_eq!(records.len(), 2);
//! ```
//!
//! Replace one array element in place, leaving the rest of the document
//! untouched:
//!
//! ```
//! use streamson::{Convert, Matcher, OutputRecord, Strategy};
//! use streamson::handlers::replace::ReplaceHandler;
//!
//! let mut convert = Convert::new();
//! convert.add_binding(
//!     Matcher::parse_simple(r#"{"a"}[1]"#).unwrap(),
//!     Box::new(ReplaceHandler::new(&b"0"[..])),
//! );
//! let mut out = Vec::new();
//! for record in convert.process(br#"{"a":[1,2,3]}"#).unwrap() {
//!     if let OutputRecord::Bytes(bytes) = record {
//!         out.extend(bytes);
//!     }
//! }
//! assert_eq!(out, br#"{"a":[1,0,3]}"#.to_vec());
//! ```

pub mod cli;
pub mod emitter;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod lexer;
pub mod matcher;
pub mod options;
pub mod path;
pub mod strategy;

pub use emitter::{Emitter, EmitterSink};
pub use error::{Result, StreamsonError};
pub use handler::{Chain, Handler, MatcherId, Shared};
pub use matcher::Matcher;
pub use options::EngineOptions;
pub use path::{Path, PathElement};
pub use strategy::{All, Convert, Extract, Filter, OutputRecord, Strategy, Trigger};
