//! Converter that re-emits an element in pretty-printed or compact form.
//! Reformats using the crate's own lexer rather than a generic JSON
//! value tree, consistent with the rest of the engine never
//! materializing a parsed document.

use crate::error::Result;
use crate::handler::{Handler, MatcherId};
use crate::lexer::{ContainerKind, LexEvent, Lexer, ValueKind};
use crate::path::Path;

#[derive(Debug)]
pub struct IndenterHandler {
    spaces: Option<usize>,
    current: Vec<u8>,
}

impl IndenterHandler {
    pub fn new(spaces: Option<usize>) -> Self {
        Self {
            spaces,
            current: Vec::new(),
        }
    }
}

impl Handler for IndenterHandler {
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
        Ok(Some(reformat(&self.current, self.spaces)?))
    }
}

fn reformat(input: &[u8], indent: Option<usize>) -> Result<Vec<u8>> {
    let compact = indent.is_none();
    let unit = indent.unwrap_or(0);
    let mut lexer = Lexer::new();
    let mut out = Vec::with_capacity(input.len());
    let mut depth = 0usize;
    // Top of stack: true while no member/element has been written yet
    // for the container at that depth.
    let mut first_stack: Vec<bool> = Vec::new();

    let write_break = |out: &mut Vec<u8>, depth: usize| {
        if !compact {
            out.push(b'\n');
            out.extend(std::iter::repeat(b' ').take(depth * unit));
        }
    };

    let mut i = 0;
    while i < input.len() {
        let byte = input[i];
        let was_in_scalar = lexer.in_scalar_content();
        let enclosing = lexer.top_container();
        let (consumed, event) = lexer.step(byte)?;
        match event {
            None => {
                if was_in_scalar {
                    out.push(byte);
                }
            }
            Some(LexEvent::TopLevelWhitespace) => {}
            Some(LexEvent::ValueStart(kind)) => {
                if enclosing == Some(ContainerKind::Array) {
                    write_break(&mut out, depth);
                    *first_stack.last_mut().expect("inside an array frame") = false;
                }
                match kind {
                    ValueKind::Object | ValueKind::Array => {
                        out.push(byte);
                        first_stack.push(true);
                        depth += 1;
                    }
                    _ => out.push(byte),
                }
            }
            Some(LexEvent::Colon) => {
                out.push(b':');
                if !compact {
                    out.push(b' ');
                }
            }
            Some(LexEvent::Comma(_)) => out.push(b','),
            Some(LexEvent::KeyStart) => {
                write_break(&mut out, depth);
                if let Some(first) = first_stack.last_mut() {
                    *first = false;
                }
                out.push(byte);
            }
            Some(LexEvent::KeyEnd) => out.push(byte),
            Some(LexEvent::ContainerEnd(_)) => {
                let was_empty = first_stack.pop().unwrap_or(true);
                depth -= 1;
                if !was_empty {
                    write_break(&mut out, depth);
                }
                out.push(byte);
            }
            Some(LexEvent::ScalarEnd { reprocess, .. }) => {
                if !reprocess {
                    out.push(byte);
                }
            }
        }
        if consumed {
            i += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_strips_whitespace() {
        let out = reformat(b"{ \"a\" : 1 , \"b\" : [1, 2] }", None).unwrap();
        assert_eq!(out, b"{\"a\":1,\"b\":[1,2]}".to_vec());
    }

    #[test]
    fn pretty_indents_nested_structure() {
        let out = reformat(b"{\"a\":[1,2]}", Some(2)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\n  \"a\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn empty_containers_stay_compact() {
        let out = reformat(b"{\"a\":{},\"b\":[]}", Some(2)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\n  \"a\": {},\n  \"b\": []\n}"
        );
    }
}
