//! Byte-level pushdown automaton that recognizes JSON structure without
//! ever buffering more than the current partial token. Mirrors the state
//! list enumerated in the design notes for this engine; state names below
//! follow that list directly so the automaton can be checked against it
//! transition by transition.
//!
//! The lexer does not know about paths or handlers. It hands the
//! [`crate::emitter::Emitter`] a small vocabulary of [`LexEvent`]s and lets
//! the emitter decide what they mean for the path stack and the output
//! byte stream. Keys are the one exception: since a key never becomes an
//! element of its own, the lexer accumulates the key's raw bytes directly
//! and hands back a finished `String` on `KeyEnd` rather than exposing the
//! bytes as a stream of separate events.

use crate::error::{Result, StreamsonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    Object,
    Array,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Object,
    Array,
    String,
    Number,
    True,
    False,
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Number,
    True,
    False,
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StringRole {
    Key,
    Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NumStage {
    Sign,
    IntZero,
    IntDigits,
    FracFirst,
    FracDigits,
    ExpSign,
    ExpFirst,
    ExpDigits,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum LexState {
    /// Expecting the first byte of a value: object/array/string/number/
    /// literal, in any context (top level, object member, array element).
    Value,
    InString {
        role: StringRole,
    },
    InStringEscape {
        role: StringRole,
    },
    InUnicodeEscape {
        role: StringRole,
        remaining: u8,
    },
    InNumber(NumStage),
    InLiteral {
        kind: ScalarKind,
        pos: u8,
    },
    /// Expecting `,`, a closing bracket, or (when the container stack is
    /// empty) whitespace/EOF/the start of the next concatenated value.
    /// Stands in for the spec's `AfterValue`/`ObjectAfterValue`/
    /// `ArrayAfterValue` trio: the container stack top (or its absence)
    /// supplies the context those three names would otherwise encode.
    AfterValue,
    /// `allow_close` is true only when this state was entered straight
    /// from `{` (an empty object may close here); after a comma a member
    /// is mandatory, so `}` is rejected there instead.
    ObjectExpectKey {
        allow_close: bool,
    },
    ObjectExpectColon,
    ArrayExpectValue,
}

/// What happened as a result of feeding one byte to the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexEvent {
    /// Insignificant whitespace outside of any open element.
    TopLevelWhitespace,
    /// A `:` consumed between an object key and its value.
    Colon,
    /// A `,` consumed between members/elements; `kind` names the
    /// container it was found in.
    Comma(ContainerKind),
    /// The first byte of a new value has just been consumed.
    ValueStart(ValueKind),
    /// A `}`/`]` byte has just closed the innermost container.
    ContainerEnd(ContainerKind),
    /// A scalar value (string/number/literal) has ended. When
    /// `reprocess` is true, the current byte does not belong to the
    /// scalar and must be fed again after the state transition (this is
    /// how number/literal lexing, which has no closing delimiter of its
    /// own, detects its own end).
    ScalarEnd { kind: ScalarKind, reprocess: bool },
    /// The opening quote of an object key has just been consumed.
    KeyStart,
    /// The closing quote of an object key has just been consumed; call
    /// [`Lexer::take_key`] to retrieve its raw bytes.
    KeyEnd,
}

/// Resumable, byte-driven recognizer for JSON grammar.
///
/// `step` consumes at most one byte per call and returns whether that
/// byte was actually consumed (an `false` return means the byte must be
/// fed again after the caller acts on the returned event — used when a
/// token has no closing delimiter, e.g. a number followed by `,`).
#[derive(Clone, Debug)]
pub struct Lexer {
    state: LexState,
    stack: Vec<ContainerKind>,
    key_buf: Vec<u8>,
    offset: u64,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        Self {
            state: LexState::Value,
            stack: Vec::new(),
            key_buf: Vec::new(),
            offset: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The container kind currently enclosing whatever is being lexed
    /// right now, if any.
    pub fn top_container(&self) -> Option<ContainerKind> {
        self.stack.last().copied()
    }

    /// True while positioned inside the content of a string, number, or
    /// literal token (including escape sub-states). Used by handlers
    /// that reformat raw element bytes (e.g. the Indenter) to tell
    /// "insignificant whitespace between tokens" apart from "byte that
    /// is part of a token's content" when the lexer reports no event for
    /// either.
    pub fn in_scalar_content(&self) -> bool {
        matches!(
            self.state,
            LexState::InString { .. }
                | LexState::InStringEscape { .. }
                | LexState::InUnicodeEscape { .. }
                | LexState::InNumber(_)
                | LexState::InLiteral { .. }
        )
    }

    /// Byte offset of the next byte to be fed, for error reporting.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True once the top-level value (or stream of concatenated values)
    /// is between values and could legally end here.
    pub fn at_value_boundary(&self) -> bool {
        self.stack.is_empty() && matches!(self.state, LexState::Value | LexState::AfterValue)
    }

    pub fn take_key(&mut self) -> String {
        let bytes = std::mem::take(&mut self.key_buf);
        // Key bytes are themselves a JSON string's raw content, which is
        // always valid UTF-8 (JSON strings are defined over Unicode
        // scalar values and the escapes that denote them).
        String::from_utf8(bytes).expect("object keys are valid UTF-8 by lexer construction")
    }

    /// Feed one byte. Returns `(consumed, event)`; when `consumed` is
    /// false the same byte must be fed again (the event describes what
    /// just closed, not what the byte itself means).
    pub fn step(&mut self, byte: u8) -> Result<(bool, Option<LexEvent>)> {
        let result = self.step_inner(byte)?;
        if result.0 {
            self.offset += 1;
        }
        Ok(result)
    }

    fn err(&self, message: impl Into<String>) -> StreamsonError {
        StreamsonError::syntax(self.offset, message)
    }

    fn step_inner(&mut self, byte: u8) -> Result<(bool, Option<LexEvent>)> {
        match self.state {
            LexState::Value => self.step_value(byte),
            LexState::InString { role } => self.step_in_string(byte, role),
            LexState::InStringEscape { role } => self.step_string_escape(byte, role),
            LexState::InUnicodeEscape { role, remaining } => {
                self.step_unicode_escape(byte, role, remaining)
            }
            LexState::InNumber(stage) => self.step_number(byte, stage),
            LexState::InLiteral { kind, pos } => self.step_literal(byte, kind, pos),
            LexState::AfterValue => self.step_after_value(byte),
            LexState::ObjectExpectKey { allow_close } => {
                self.step_object_expect_key(byte, allow_close)
            }
            LexState::ObjectExpectColon => self.step_object_expect_colon(byte),
            LexState::ArrayExpectValue => self.step_array_expect_value(byte),
        }
    }

    fn step_value(&mut self, byte: u8) -> Result<(bool, Option<LexEvent>)> {
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' if self.stack.is_empty() => {
                Ok((true, Some(LexEvent::TopLevelWhitespace)))
            }
            b'{' => {
                self.stack.push(ContainerKind::Object);
                self.state = LexState::ObjectExpectKey { allow_close: true };
                Ok((true, Some(LexEvent::ValueStart(ValueKind::Object))))
            }
            b'[' => {
                self.stack.push(ContainerKind::Array);
                self.state = LexState::ArrayExpectValue;
                Ok((true, Some(LexEvent::ValueStart(ValueKind::Array))))
            }
            b'"' => {
                self.state = LexState::InString {
                    role: StringRole::Value,
                };
                Ok((true, Some(LexEvent::ValueStart(ValueKind::String))))
            }
            b'-' => {
                self.state = LexState::InNumber(NumStage::Sign);
                Ok((true, Some(LexEvent::ValueStart(ValueKind::Number))))
            }
            b'0' => {
                self.state = LexState::InNumber(NumStage::IntZero);
                Ok((true, Some(LexEvent::ValueStart(ValueKind::Number))))
            }
            b'1'..=b'9' => {
                self.state = LexState::InNumber(NumStage::IntDigits);
                Ok((true, Some(LexEvent::ValueStart(ValueKind::Number))))
            }
            b't' => {
                self.state = LexState::InLiteral {
                    kind: ScalarKind::True,
                    pos: 1,
                };
                Ok((true, Some(LexEvent::ValueStart(ValueKind::True))))
            }
            b'f' => {
                self.state = LexState::InLiteral {
                    kind: ScalarKind::False,
                    pos: 1,
                };
                Ok((true, Some(LexEvent::ValueStart(ValueKind::False))))
            }
            b'n' => {
                self.state = LexState::InLiteral {
                    kind: ScalarKind::Null,
                    pos: 1,
                };
                Ok((true, Some(LexEvent::ValueStart(ValueKind::Null))))
            }
            _ => Err(self.err(format!("byte {byte:#04x} is not a valid value start"))),
        }
    }

    fn step_in_string(&mut self, byte: u8, role: StringRole) -> Result<(bool, Option<LexEvent>)> {
        match byte {
            b'"' => {
                self.state = LexState::AfterValue;
                let event = match role {
                    StringRole::Key => Some(LexEvent::KeyEnd),
                    StringRole::Value => Some(LexEvent::ScalarEnd {
                        kind: ScalarKind::String,
                        reprocess: false,
                    }),
                };
                Ok((true, event))
            }
            b'\\' => {
                self.state = LexState::InStringEscape { role };
                Ok((true, None))
            }
            0x00..=0x1f => Err(self.err("control character in string literal")),
            _ => {
                if role == StringRole::Key {
                    self.key_buf.push(byte);
                }
                Ok((true, None))
            }
        }
    }

    fn step_string_escape(
        &mut self,
        byte: u8,
        role: StringRole,
    ) -> Result<(bool, Option<LexEvent>)> {
        match byte {
            b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => {
                if role == StringRole::Key {
                    self.key_buf.push(b'\\');
                    self.key_buf.push(byte);
                }
                self.state = LexState::InString { role };
                Ok((true, None))
            }
            b'u' => {
                if role == StringRole::Key {
                    self.key_buf.push(b'\\');
                    self.key_buf.push(b'u');
                }
                self.state = LexState::InUnicodeEscape { role, remaining: 4 };
                Ok((true, None))
            }
            _ => Err(self.err(format!("invalid escape sequence '\\{}'", byte as char))),
        }
    }

    fn step_unicode_escape(
        &mut self,
        byte: u8,
        role: StringRole,
        remaining: u8,
    ) -> Result<(bool, Option<LexEvent>)> {
        if !byte.is_ascii_hexdigit() {
            return Err(self.err("invalid hex digit in \\u escape"));
        }
        if role == StringRole::Key {
            self.key_buf.push(byte);
        }
        if remaining > 1 {
            self.state = LexState::InUnicodeEscape {
                role,
                remaining: remaining - 1,
            };
        } else {
            self.state = LexState::InString { role };
        }
        Ok((true, None))
    }

    fn step_number(&mut self, byte: u8, stage: NumStage) -> Result<(bool, Option<LexEvent>)> {
        use NumStage::*;
        match (stage, byte) {
            (Sign, b'0') => {
                self.state = LexState::InNumber(IntZero);
                Ok((true, None))
            }
            (Sign, b'1'..=b'9') => {
                self.state = LexState::InNumber(IntDigits);
                Ok((true, None))
            }
            (Sign, _) => Err(self.err("expected digit after '-'")),

            (IntZero, b'.') => {
                self.state = LexState::InNumber(FracFirst);
                Ok((true, None))
            }
            (IntZero, b'e' | b'E') => {
                self.state = LexState::InNumber(ExpSign);
                Ok((true, None))
            }
            (IntZero, b'0'..=b'9') => Err(self.err("leading zero followed by a digit")),
            (IntZero, _) => self.end_number(),

            (IntDigits, b'0'..=b'9') => Ok((true, None)),
            (IntDigits, b'.') => {
                self.state = LexState::InNumber(FracFirst);
                Ok((true, None))
            }
            (IntDigits, b'e' | b'E') => {
                self.state = LexState::InNumber(ExpSign);
                Ok((true, None))
            }
            (IntDigits, _) => self.end_number(),

            (FracFirst, b'0'..=b'9') => {
                self.state = LexState::InNumber(FracDigits);
                Ok((true, None))
            }
            (FracFirst, _) => Err(self.err("expected digit after decimal point")),

            (FracDigits, b'0'..=b'9') => Ok((true, None)),
            (FracDigits, b'e' | b'E') => {
                self.state = LexState::InNumber(ExpSign);
                Ok((true, None))
            }
            (FracDigits, _) => self.end_number(),

            (ExpSign, b'+' | b'-') => {
                self.state = LexState::InNumber(ExpFirst);
                Ok((true, None))
            }
            (ExpSign, b'0'..=b'9') => {
                self.state = LexState::InNumber(ExpDigits);
                Ok((true, None))
            }
            (ExpSign, _) => Err(self.err("expected digit or sign after exponent marker")),

            (ExpFirst, b'0'..=b'9') => {
                self.state = LexState::InNumber(ExpDigits);
                Ok((true, None))
            }
            (ExpFirst, _) => Err(self.err("expected digit after exponent sign")),

            (ExpDigits, b'0'..=b'9') => Ok((true, None)),
            (ExpDigits, _) => self.end_number(),
        }
    }

    fn end_number(&mut self) -> Result<(bool, Option<LexEvent>)> {
        self.state = LexState::AfterValue;
        Ok((
            false,
            Some(LexEvent::ScalarEnd {
                kind: ScalarKind::Number,
                reprocess: true,
            }),
        ))
    }

    fn step_literal(
        &mut self,
        byte: u8,
        kind: ScalarKind,
        pos: u8,
    ) -> Result<(bool, Option<LexEvent>)> {
        let word: &[u8] = match kind {
            ScalarKind::True => b"true",
            ScalarKind::False => b"false",
            ScalarKind::Null => b"null",
            ScalarKind::String | ScalarKind::Number => unreachable!("not a literal kind"),
        };
        if word[pos as usize] != byte {
            return Err(self.err(format!(
                "unexpected byte {byte:#04x} while matching literal {:?}",
                std::str::from_utf8(word).unwrap()
            )));
        }
        let next_pos = pos + 1;
        if (next_pos as usize) == word.len() {
            self.state = LexState::AfterValue;
            Ok((
                true,
                Some(LexEvent::ScalarEnd {
                    kind,
                    reprocess: false,
                }),
            ))
        } else {
            self.state = LexState::InLiteral {
                kind,
                pos: next_pos,
            };
            Ok((true, None))
        }
    }

    fn step_after_value(&mut self, byte: u8) -> Result<(bool, Option<LexEvent>)> {
        match self.stack.last().copied() {
            None => match byte {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.state = LexState::Value;
                    Ok((true, Some(LexEvent::TopLevelWhitespace)))
                }
                _ => {
                    self.state = LexState::Value;
                    Ok((false, None))
                }
            },
            Some(ContainerKind::Object) => match byte {
                b' ' | b'\t' | b'\n' | b'\r' => Ok((true, None)),
                b',' => {
                    self.state = LexState::ObjectExpectKey { allow_close: false };
                    Ok((true, Some(LexEvent::Comma(ContainerKind::Object))))
                }
                b'}' => {
                    self.stack.pop();
                    self.state = LexState::AfterValue;
                    Ok((true, Some(LexEvent::ContainerEnd(ContainerKind::Object))))
                }
                _ => Err(self.err("expected ',' or '}' after object member")),
            },
            Some(ContainerKind::Array) => match byte {
                b' ' | b'\t' | b'\n' | b'\r' => Ok((true, None)),
                b',' => {
                    self.state = LexState::ArrayExpectValue;
                    Ok((true, Some(LexEvent::Comma(ContainerKind::Array))))
                }
                b']' => {
                    self.stack.pop();
                    self.state = LexState::AfterValue;
                    Ok((true, Some(LexEvent::ContainerEnd(ContainerKind::Array))))
                }
                _ => Err(self.err("expected ',' or ']' after array element")),
            },
        }
    }

    fn step_object_expect_key(
        &mut self,
        byte: u8,
        allow_close: bool,
    ) -> Result<(bool, Option<LexEvent>)> {
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' => Ok((true, None)),
            b'"' => {
                self.state = LexState::InString {
                    role: StringRole::Key,
                };
                Ok((true, Some(LexEvent::KeyStart)))
            }
            b'}' if allow_close => {
                self.stack.pop();
                self.state = LexState::AfterValue;
                Ok((true, Some(LexEvent::ContainerEnd(ContainerKind::Object))))
            }
            b'}' => Err(self.err("trailing comma before '}' is not allowed")),
            _ => Err(self.err("expected an object key or '}'")),
        }
    }

    fn step_object_expect_colon(&mut self, byte: u8) -> Result<(bool, Option<LexEvent>)> {
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' => Ok((true, None)),
            b':' => {
                self.state = LexState::Value;
                Ok((true, Some(LexEvent::Colon)))
            }
            _ => Err(self.err("expected ':' after object key")),
        }
    }

    fn step_array_expect_value(&mut self, byte: u8) -> Result<(bool, Option<LexEvent>)> {
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' => Ok((true, None)),
            _ => {
                self.state = LexState::Value;
                Ok((false, None))
            }
        }
    }

    /// Called by the emitter right after a `KeyEnd` event: the key string
    /// has closed, now a colon is expected.
    pub fn enter_expect_colon(&mut self) {
        self.state = LexState::ObjectExpectColon;
    }

    /// `true` if the automaton is in a state where input may legally end
    /// (outside any open container and not mid-token).
    pub fn can_end(&self) -> bool {
        self.stack.is_empty() && matches!(self.state, LexState::Value | LexState::AfterValue)
    }

    /// Called once, at end of input, before [`Lexer::can_end`]. A number
    /// has no closing delimiter of its own — it only ends when a
    /// following non-digit byte arrives and triggers [`Lexer::end_number`].
    /// If the input simply stops right after a top-level number, that
    /// byte never comes; this finalizes the number as if it had, so
    /// `terminate` sees a clean `AfterValue` state instead of a
    /// permanently open `InNumber`. Returns `true` if a pending number
    /// was finalized.
    pub fn finish(&mut self) -> bool {
        if self.stack.is_empty() {
            if let LexState::InNumber(stage) = self.state {
                use NumStage::*;
                if matches!(stage, IntZero | IntDigits | FracDigits | ExpDigits) {
                    self.state = LexState::AfterValue;
                    return true;
                }
            }
        }
        false
    }

    pub fn truncated_message(&self) -> String {
        if !self.stack.is_empty() {
            format!("{} unclosed container(s) at end of input", self.stack.len())
        } else {
            "input ended mid-token".to_string()
        }
    }
}
