//! Hand-rolled argument parsing for the subcommand surface in spec.md §6,
//! following the teacher's `cli.rs` style (no `clap`: the `-m`/`-h` grammar
//! with grouped, chained definitions is easier to parse by hand than to
//! coerce into a derive macro) and
//! `original_source/streamson/__main__.py`'s `parse_element` grammar and
//! per-strategy handler allow-list.

use crate::error::{Result, StreamsonError};
use crate::handler::{Chain, Handler, Shared};
use crate::handlers::analyser::AnalyserHandler;
use crate::handlers::buffer::BufferHandler;
use crate::handlers::file::FileHandler;
use crate::handlers::indenter::IndenterHandler;
use crate::handlers::regex::RegexHandler;
use crate::handlers::replace::ReplaceHandler;
use crate::handlers::shorten::ShortenHandler;
use crate::handlers::unstringify::UnstringifyHandler;
use crate::matcher::Matcher;
use crate::options::EngineOptions;
use crate::strategy::{All, Convert, Extract, Filter, OutputRecord, Strategy, Trigger};
use std::io::{self, Read, Write};

/// Which of the five subcommands we're binding handlers for; governs the
/// handler allow-list (spec.md §6, `original_source`'s `Strategy.check_handler`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyKind {
    All,
    Convert,
    Filter,
    Extract,
    Trigger,
}

impl StrategyKind {
    fn name(&self) -> &'static str {
        match self {
            StrategyKind::All => "all",
            StrategyKind::Convert => "convert",
            StrategyKind::Filter => "filter",
            StrategyKind::Extract => "extract",
            StrategyKind::Trigger => "trigger",
        }
    }

    fn allows_handler(&self, name: &str) -> bool {
        match self {
            StrategyKind::All => matches!(name, "d" | "indenter" | "a" | "analyser"),
            StrategyKind::Convert => matches!(
                name,
                "f" | "file" | "x" | "regex" | "r" | "replace" | "s" | "shorten" | "u" | "unstringify"
            ),
            StrategyKind::Filter | StrategyKind::Extract | StrategyKind::Trigger => matches!(
                name,
                "f" | "file" | "x" | "regex" | "s" | "shorten" | "u" | "unstringify"
            ),
        }
    }
}

/// The parsed pieces of one `-m`/`-h` flag value:
/// `NAME[.GROUP][,OPTION,...][:DEFINITION]`.
struct ElementSpec<'a> {
    name: &'a str,
    group: Option<&'a str>,
    options: Vec<&'a str>,
    definition: Option<&'a str>,
}

fn parse_element(value: &str) -> ElementSpec<'_> {
    let (head, definition) = match value.split_once(':') {
        Some((h, d)) => (h, Some(d)),
        None => (value, None),
    };
    let mut parts = head.split(',');
    let first = parts.next().unwrap_or("");
    let options: Vec<&str> = parts.collect();
    let (name, group) = match first.split_once('.') {
        Some((n, g)) => (n, Some(g)),
        None => (first, None),
    };
    ElementSpec {
        name,
        group,
        options,
        definition,
    }
}

fn build_matcher(spec: &ElementSpec) -> Result<Matcher> {
    let def = spec.definition.ok_or_else(|| {
        StreamsonError::matcher_parse(spec.name, "matcher definition is required")
    })?;
    match spec.name {
        "s" | "simple" => Matcher::parse_simple(def),
        "d" | "depth" => Matcher::parse_depth(def),
        "x" | "regex" => Matcher::regex(def),
        other => Err(StreamsonError::matcher_parse(
            other,
            format!("unknown matcher name {other:?}"),
        )),
    }
}

fn build_handler(spec: &ElementSpec, strategy: StrategyKind) -> Result<Box<dyn Handler>> {
    if !strategy.allows_handler(spec.name) {
        return Err(StreamsonError::handler_config(
            spec.name,
            format!(
                "handler `{}` can not be used in the `{}` strategy",
                spec.name,
                strategy.name()
            ),
        ));
    }
    let no_args = || -> Result<()> {
        if spec.definition.is_some() || !spec.options.is_empty() {
            return Err(StreamsonError::handler_config(
                spec.name,
                "this handler has no definition nor options",
            ));
        }
        Ok(())
    };
    match spec.name {
        "a" | "analyser" => {
            no_args()?;
            Ok(Box::new(AnalyserHandler::new()))
        }
        "f" | "file" => {
            let path = spec.definition.ok_or_else(|| {
                StreamsonError::handler_config(spec.name, "file handler requires a path")
            })?;
            let write_path = spec
                .options
                .first()
                .map(|o| o.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            Ok(Box::new(FileHandler::new(path, write_path)?))
        }
        "d" | "indenter" => {
            if !spec.options.is_empty() {
                return Err(StreamsonError::handler_config(
                    spec.name,
                    "indenter handler has no options",
                ));
            }
            let spaces = spec
                .definition
                .map(|d| {
                    d.parse::<usize>().map_err(|_| {
                        StreamsonError::handler_config(spec.name, "can't parse number of spaces")
                    })
                })
                .transpose()?;
            Ok(Box::new(IndenterHandler::new(spaces)))
        }
        "x" | "regex" => {
            // DEFINITION carries the pattern; the first OPTION (if any)
            // carries the replacement. original_source's CLI definition
            // format leaves the replacement implicit in the native
            // RegexHandler; this CLI makes it an explicit option instead.
            let pattern = spec.definition.ok_or_else(|| {
                StreamsonError::handler_config(spec.name, "regex handler requires a pattern")
            })?;
            let replacement = spec.options.first().copied().unwrap_or("");
            Ok(Box::new(RegexHandler::new(vec![(
                pattern.to_string(),
                replacement.to_string(),
            )])?))
        }
        "r" | "replace" => {
            if !spec.options.is_empty() {
                return Err(StreamsonError::handler_config(
                    spec.name,
                    "replace handler has no options",
                ));
            }
            let replacement = spec.definition.ok_or_else(|| {
                StreamsonError::handler_config(spec.name, "replace handler requires a definition")
            })?;
            Ok(Box::new(ReplaceHandler::new(replacement.as_bytes())))
        }
        "s" | "shorten" => {
            if !spec.options.is_empty() {
                return Err(StreamsonError::handler_config(
                    spec.name,
                    "shorten handler has no options",
                ));
            }
            let def = spec.definition.ok_or_else(|| {
                StreamsonError::handler_config(spec.name, "shorten handler requires a definition")
            })?;
            let (size, terminator) = def.split_once(',').ok_or_else(|| {
                StreamsonError::handler_config(
                    spec.name,
                    "shorten handler definition must be SIZE,TERMINATOR",
                )
            })?;
            let size: usize = size.parse().map_err(|_| {
                StreamsonError::handler_config(spec.name, "shorten handler SIZE must be a number")
            })?;
            Ok(Box::new(ShortenHandler::new(size, terminator.as_bytes())))
        }
        "u" | "unstringify" => {
            no_args()?;
            Ok(Box::new(UnstringifyHandler::new()))
        }
        other => Err(StreamsonError::handler_config(
            other,
            format!("unknown handler name {other:?}"),
        )),
    }
}

/// Groups built from repeated `-m`/`-h` flags: same-GROUP matchers combine
/// by OR, same-GROUP handlers chain, in registration order. Flags without
/// an explicit GROUP share the implicit `None` group, which is why two
/// ungrouped `-m` flags OR together too (matches
/// `original_source/streamson/__main__.py`'s `groups` dict keyed by
/// `Optional[str]`).
#[derive(Default)]
struct Groups {
    matcher_order: Vec<Option<String>>,
    matchers: Vec<(Option<String>, Matcher)>,
    handler_order: Vec<Option<String>>,
    handlers: Vec<(Option<String>, Vec<Box<dyn Handler>>)>,
}

impl Groups {
    fn add_matcher(&mut self, group: Option<String>, matcher: Matcher) {
        if let Some((_, existing)) = self.matchers.iter_mut().find(|(g, _)| *g == group) {
            *existing = existing.clone() | matcher;
        } else {
            self.matcher_order.push(group.clone());
            self.matchers.push((group, matcher));
        }
    }

    fn add_handler(&mut self, group: Option<String>, handler: Box<dyn Handler>) {
        if let Some((_, existing)) = self.handlers.iter_mut().find(|(g, _)| *g == group) {
            existing.push(handler);
        } else {
            self.handler_order.push(group.clone());
            self.handlers.push((group, vec![handler]));
        }
    }

    fn take_matcher(&mut self, group: &Option<String>) -> Option<Matcher> {
        let idx = self.matchers.iter().position(|(g, _)| g == group)?;
        Some(self.matchers.remove(idx).1)
    }

    fn take_handler(&mut self, group: &Option<String>) -> Option<Box<dyn Handler>> {
        let idx = self.handlers.iter().position(|(g, _)| g == group)?;
        let mut handlers = self.handlers.remove(idx).1;
        Some(if handlers.len() == 1 {
            handlers.pop().unwrap()
        } else {
            Box::new(Chain::new(handlers))
        })
    }

    /// Every group that defined at least a matcher or a handler, in the
    /// order its first flag was seen.
    fn all_groups(&self) -> Vec<Option<String>> {
        let mut seen = Vec::new();
        for g in self.matcher_order.iter().chain(self.handler_order.iter()) {
            if !seen.contains(g) {
                seen.push(g.clone());
            }
        }
        seen
    }
}

fn parse_matcher_flag(groups: &mut Groups, value: &str) -> Result<()> {
    let spec = parse_element(value);
    let matcher = build_matcher(&spec)?;
    groups.add_matcher(spec.group.map(str::to_string), matcher);
    Ok(())
}

fn parse_handler_flag(groups: &mut Groups, value: &str, strategy: StrategyKind) -> Result<()> {
    let spec = parse_element(value);
    let handler = build_handler(&spec, strategy)?;
    groups.add_handler(spec.group.map(str::to_string), handler);
    Ok(())
}

/// Binds every group collected from `-m`/`-h` flags onto `strategy`: a
/// group's matcher and handler pair up into one binding; a group missing
/// a matcher defaults to `Matcher::All`, and a group missing a handler
/// defaults to a [`BufferHandler`] (an inert observer) so the binding is
/// still valid.
fn bind_groups(strategy: &mut dyn Strategy, mut groups: Groups) {
    for group in groups.all_groups() {
        let matcher = groups.take_matcher(&group).unwrap_or(Matcher::All);
        let handler = groups
            .take_handler(&group)
            .unwrap_or_else(|| Box::new(BufferHandler::new()));
        strategy.add_binding(matcher, handler);
    }
}

fn print_help() {
    eprintln!(
        "Usage: streamson [-b BYTES] <extract|filter|convert|trigger|all> [OPTIONS]\n\
         \n\
         Reads JSON from stdin, writes to stdout.\n\
         \n\
         Global options:\n\
         \x20 -b, --buffer-size N        Read chunk size (default 1048576)\n\
         \x20     --version              Print the version and exit\n\
         \x20 -h, --help                 Show this help\n\
         \n\
         extract/filter/convert/trigger options:\n\
         \x20 -m NAME[.GROUP][:DEFINITION]               Register a matcher (s|simple, d|depth, x|regex)\n\
         \x20 -h NAME[.GROUP][,OPT,...][:DEFINITION]     Register a handler\n\
         \n\
         extract-only options:\n\
         \x20 -b BEFORE       Printed before all output\n\
         \x20 -a AFTER        Printed after all output\n\
         \x20 -S SEPARATOR    Printed between adjacent matched elements\n\
         \n\
         all options:\n\
         \x20 -h NAME[.GROUP][:DEFINITION]     Register a handler (a|analyser, d|indenter)\n"
    );
}

struct SubArgs<'a> {
    matchers: Vec<&'a str>,
    handlers: Vec<&'a str>,
    before: String,
    after: String,
    separator: String,
}

fn parse_sub_args(args: &[String], extract_flags: bool) -> Result<SubArgs<'_>> {
    let mut matchers = Vec::new();
    let mut handlers = Vec::new();
    let mut before = String::new();
    let mut after = String::new();
    let mut separator = String::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-m" | "--matcher" => {
                i += 1;
                matchers.push(args.get(i).map(String::as_str).unwrap_or_default());
            }
            "-h" | "--handler" => {
                i += 1;
                handlers.push(args.get(i).map(String::as_str).unwrap_or_default());
            }
            "-b" | "--before" if extract_flags => {
                i += 1;
                before = args.get(i).cloned().unwrap_or_default();
            }
            "-a" | "--after" if extract_flags => {
                i += 1;
                after = args.get(i).cloned().unwrap_or_default();
            }
            "-S" | "--separator" if extract_flags => {
                i += 1;
                separator = args.get(i).cloned().unwrap_or_default();
            }
            other => {
                return Err(StreamsonError::handler_config(
                    "cli",
                    format!("unknown argument {other:?}"),
                ));
            }
        }
        i += 1;
    }
    Ok(SubArgs {
        matchers,
        handlers,
        before,
        after,
        separator,
    })
}

/// Reads `reader` in `buffer_size` chunks, calling `step(Some(chunk))` for
/// each one and finally `step(None)` once input is exhausted. A single
/// closure (rather than one for "chunk" and another for "terminate") so
/// callers only need one mutable capture of their strategy/writer instead
/// of two live at once.
fn read_loop<R: Read>(
    reader: &mut R,
    buffer_size: usize,
    mut step: impl FnMut(Option<&[u8]>) -> Result<()>,
) -> Result<()> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        step(Some(&buf[..n]))?;
    }
    step(None)
}

fn write_bytes_records(out: &mut impl Write, records: Vec<OutputRecord>) -> Result<()> {
    for record in records {
        if let OutputRecord::Bytes(bytes) = record {
            out.write_all(&bytes)?;
        }
    }
    Ok(())
}

fn run_pass_through(
    mut strategy: impl Strategy,
    buffer_size: usize,
) -> Result<()> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    read_loop(&mut reader, buffer_size, |chunk| {
        let records = match chunk {
            Some(c) => strategy.process(c)?,
            None => strategy.terminate()?,
        };
        write_bytes_records(&mut out, records)
    })?;
    out.flush()?;
    Ok(())
}

fn run_filter(args: &[String], buffer_size: usize) -> Result<()> {
    let sub = parse_sub_args(args, false)?;
    let mut groups = Groups::default();
    for m in &sub.matchers {
        parse_matcher_flag(&mut groups, m)?;
    }
    for h in &sub.handlers {
        parse_handler_flag(&mut groups, h, StrategyKind::Filter)?;
    }
    let mut strategy = Filter::new();
    bind_groups(&mut strategy, groups);
    run_pass_through(strategy, buffer_size)
}

fn run_convert(args: &[String], buffer_size: usize) -> Result<()> {
    let sub = parse_sub_args(args, false)?;
    let mut groups = Groups::default();
    for m in &sub.matchers {
        parse_matcher_flag(&mut groups, m)?;
    }
    for h in &sub.handlers {
        parse_handler_flag(&mut groups, h, StrategyKind::Convert)?;
    }
    let mut strategy = Convert::new();
    bind_groups(&mut strategy, groups);
    run_pass_through(strategy, buffer_size)
}

fn run_trigger(args: &[String], buffer_size: usize) -> Result<()> {
    let sub = parse_sub_args(args, false)?;
    let mut groups = Groups::default();
    for m in &sub.matchers {
        parse_matcher_flag(&mut groups, m)?;
    }
    for h in &sub.handlers {
        parse_handler_flag(&mut groups, h, StrategyKind::Trigger)?;
    }
    let mut strategy = Trigger::new();
    bind_groups(&mut strategy, groups);
    run_pass_through(strategy, buffer_size)
}

fn run_extract(args: &[String], buffer_size: usize) -> Result<()> {
    let sub = parse_sub_args(args, true)?;
    let mut groups = Groups::default();
    for m in &sub.matchers {
        parse_matcher_flag(&mut groups, m)?;
    }
    for h in &sub.handlers {
        parse_handler_flag(&mut groups, h, StrategyKind::Extract)?;
    }
    let mut strategy = Extract::new();
    bind_groups(&mut strategy, groups);

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    out.write_all(sub.before.as_bytes())?;
    let mut first = true;
    read_loop(&mut reader, buffer_size, |chunk| {
        let records = match chunk {
            Some(c) => strategy.process(c)?,
            None => strategy.terminate()?,
        };
        for record in records {
            if let OutputRecord::Element { data, .. } = record {
                if !first {
                    out.write_all(sub.separator.as_bytes())?;
                }
                first = false;
                out.write_all(&data)?;
            }
        }
        Ok(())
    })?;
    out.write_all(sub.after.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn run_all(args: &[String], buffer_size: usize) -> Result<()> {
    // `all` has no matcher flags (spec.md §4.6: the matcher is implicit
    // `All`); only handlers, so the generic `Groups` machinery is
    // overkill here — each `-h` becomes its own binding, chained with any
    // sibling in the same GROUP, exactly like the other strategies.
    let sub = parse_sub_args(args, false)?;
    let mut groups = Groups::default();
    for h in &sub.handlers {
        parse_handler_flag(&mut groups, h, StrategyKind::All)?;
    }
    let analyser = Shared::new(AnalyserHandler::new());
    let mut strategy = All::new();
    for group in groups.all_groups() {
        let handler = groups
            .take_handler(&group)
            .expect("all-strategy groups only ever come from -h flags");
        strategy.add_handler(handler);
    }
    // Run the analyser too, so `-h a` (or no handler at all) still
    // produces the stderr structure report S5 describes.
    strategy.add_handler(Box::new(analyser.clone()));

    run_pass_through(strategy, buffer_size)?;

    eprintln!("JSON structure:");
    for (path, count) in analyser.0.borrow().report() {
        eprintln!("  {path}: {count}");
    }
    Ok(())
}

/// Entry point for the `streamson` binary.
pub fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut buffer_size = EngineOptions::default().buffer_size;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--version" => {
                println!("streamson {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-b" | "--buffer-size" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or("missing BYTES value for --buffer-size")?;
                buffer_size = value.parse()?;
            }
            "extract" | "filter" | "convert" | "trigger" | "all" => break,
            other => return Err(format!("unknown option {other:?}").into()),
        }
        i += 1;
    }
    let Some(subcommand) = args.get(i) else {
        print_help();
        return Err("missing subcommand".into());
    };
    let rest = &args[i + 1..];
    match subcommand.as_str() {
        "extract" => run_extract(rest, buffer_size)?,
        "filter" => run_filter(rest, buffer_size)?,
        "convert" => run_convert(rest, buffer_size)?,
        "trigger" => run_trigger(rest, buffer_size)?,
        "all" => run_all(rest, buffer_size)?,
        other => return Err(format!("unknown subcommand {other:?}").into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_group_options_definition() {
        let spec = parse_element("f.g1,true:/tmp/out.txt");
        assert_eq!(spec.name, "f");
        assert_eq!(spec.group, Some("g1"));
        assert_eq!(spec.options, vec!["true"]);
        assert_eq!(spec.definition, Some("/tmp/out.txt"));
    }

    #[test]
    fn parses_bare_name() {
        let spec = parse_element("a");
        assert_eq!(spec.name, "a");
        assert_eq!(spec.group, None);
        assert!(spec.options.is_empty());
        assert_eq!(spec.definition, None);
    }

    #[test]
    fn ungrouped_matchers_or_together() {
        let mut groups = Groups::default();
        parse_matcher_flag(&mut groups, r#"s:{"users"}[0]"#).unwrap();
        parse_matcher_flag(&mut groups, r#"s:{"users"}[2]"#).unwrap();
        assert_eq!(groups.matchers.len(), 1);
    }

    #[test]
    fn same_group_handlers_chain() {
        let mut groups = Groups::default();
        parse_handler_flag(&mut groups, "r.g1:AAA", StrategyKind::Convert).unwrap();
        parse_handler_flag(&mut groups, "r.g1:BBB", StrategyKind::Convert).unwrap();
        assert_eq!(groups.handlers.len(), 1);
        assert_eq!(groups.handlers[0].1.len(), 2);
    }

    #[test]
    fn rejects_handler_not_allowed_in_strategy() {
        let spec = parse_element("r:AAA");
        assert!(build_handler(&spec, StrategyKind::Filter).is_err());
    }

    #[test]
    fn shorten_definition_splits_size_and_terminator() {
        let spec = parse_element("s:5,...");
        let handler = build_handler(&spec, StrategyKind::Convert);
        assert!(handler.is_ok());
    }
}
