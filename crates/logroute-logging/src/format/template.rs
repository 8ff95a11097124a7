//! Format templates
//!
//! A template is parsed once when a sink is opened and rendered for every
//! record. Parsing errors surface at setup, never at emission time.

use super::ansi::{level_code, tag_code, RESET};
use crate::record::Record;
use logroute_errors::{template_error, Result};
use std::borrow::Cow;
use std::fmt::Write as _;

const DEFAULT_TIME_FORMAT: &str = "YYYY-MM-DD HH:mm:ss.SSS";

// Longest tokens first so that `YYYY` wins over `YY`
const TIME_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("SSSSSS", "%6f"),
    ("MMMM", "%B"),
    ("dddd", "%A"),
    ("MMM", "%b"),
    ("ddd", "%a"),
    ("SSS", "%3f"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("ZZ", "%z"),
    ("Z", "%:z"),
    ("A", "%p"),
    ("X", "%s"),
];

#[derive(Debug, Clone, PartialEq)]
enum Field {
    /// strftime pattern
    Time(String),
    Level,
    Name,
    Module,
    Function,
    File,
    Line,
    Thread,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pad {
    fill: char,
    align: Align,
    width: usize,
}

impl Pad {
    fn apply(&self, value: &str, out: &mut String) {
        let len = value.chars().count();
        if len >= self.width {
            out.push_str(value);
            return;
        }
        let total = self.width - len;
        let (before, after) = match self.align {
            Align::Left => (0, total),
            Align::Right => (total, 0),
            Align::Center => (total / 2, total - total / 2),
        };
        out.extend(std::iter::repeat(self.fill).take(before));
        out.push_str(value);
        out.extend(std::iter::repeat(self.fill).take(after));
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Style {
    Code(&'static str),
    Level,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field { field: Field, pad: Option<Pad> },
    Open(Style),
    Close,
}

/// A parsed format template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut open_tags: Vec<&str> = Vec::new();
        let mut chars = source.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }
                    let rest = &source[i + 1..];
                    let end = rest
                        .find('}')
                        .ok_or_else(|| template_error(source, "unclosed '{'"))?;
                    let body = &rest[..end];
                    flush_literal(&mut literal, &mut segments);
                    segments.push(parse_field(source, body)?);
                    skip(&mut chars, body.chars().count() + 1);
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(template_error(source, "unmatched '}'"));
                    }
                }
                '\\' if matches!(chars.peek(), Some((_, '<'))) => {
                    chars.next();
                    literal.push('<');
                }
                '<' => {
                    let rest = &source[i + 1..];
                    let Some(end) = rest.find('>') else {
                        literal.push('<');
                        continue;
                    };
                    let tag = &rest[..end];

                    if let Some(name) = tag.strip_prefix('/') {
                        if name.is_empty() || is_known_tag(name) {
                            let open = open_tags.pop().ok_or_else(|| {
                                template_error(source, format!("closing tag </{}> was never opened", name))
                            })?;
                            if !name.is_empty() && name != open {
                                return Err(template_error(
                                    source,
                                    format!("closing tag </{}> does not match <{}>", name, open),
                                ));
                            }
                            flush_literal(&mut literal, &mut segments);
                            segments.push(Segment::Close);
                            skip(&mut chars, tag.chars().count() + 1);
                            continue;
                        }
                    } else if let Some(style) = style_for(tag) {
                        flush_literal(&mut literal, &mut segments);
                        segments.push(Segment::Open(style));
                        open_tags.push(tag);
                        skip(&mut chars, tag.chars().count() + 1);
                        continue;
                    }
                    // Unknown tag: keep it as text
                    literal.push('<');
                }
                _ => literal.push(c),
            }
        }

        if let Some(tag) = open_tags.pop() {
            return Err(template_error(source, format!("tag <{}> is never closed", tag)));
        }
        flush_literal(&mut literal, &mut segments);

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render one record; markup becomes ANSI escapes or is dropped
    pub fn render(&self, record: &Record, colorize: bool) -> String {
        let mut out = String::with_capacity(self.source.len() + record.message.len());
        let mut active: Vec<&'static str> = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { field, pad } => {
                    let value = field_value(field, record);
                    match pad {
                        Some(pad) => pad.apply(&value, &mut out),
                        None => out.push_str(&value),
                    }
                }
                Segment::Open(style) if colorize => {
                    let code = match style {
                        Style::Code(code) => code,
                        Style::Level => level_code(record.level, record.success),
                    };
                    active.push(code);
                    out.push_str(code);
                }
                Segment::Close if colorize => {
                    active.pop();
                    out.push_str(RESET);
                    for code in &active {
                        out.push_str(code);
                    }
                }
                Segment::Open(_) | Segment::Close => {}
            }
        }
        out
    }
}

fn skip<I: Iterator>(iter: &mut I, n: usize) {
    for _ in 0..n {
        iter.next();
    }
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn is_known_tag(name: &str) -> bool {
    name == "level" || tag_code(name).is_some()
}

fn style_for(tag: &str) -> Option<Style> {
    if tag == "level" {
        return Some(Style::Level);
    }
    tag_code(tag).map(Style::Code)
}

fn parse_field(source: &str, body: &str) -> Result<Segment> {
    let (name, spec) = match body.split_once(':') {
        Some((name, spec)) => (name.trim(), Some(spec)),
        None => (body.trim(), None),
    };

    let field = match name {
        "time" => {
            let pattern = spec.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_TIME_FORMAT);
            return Ok(Segment::Field {
                field: Field::Time(translate_time(pattern)),
                pad: None,
            });
        }
        "level" => Field::Level,
        "name" => Field::Name,
        "module" => Field::Module,
        "function" => Field::Function,
        "file" => Field::File,
        "line" => Field::Line,
        "thread" => Field::Thread,
        "message" => Field::Message,
        other => return Err(template_error(source, format!("unknown field '{}'", other))),
    };

    let pad = match spec {
        Some(spec) if !spec.is_empty() => Some(parse_pad(source, spec)?),
        _ => None,
    };
    Ok(Segment::Field { field, pad })
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    }
}

// `[[fill]align][width]`
fn parse_pad(source: &str, spec: &str) -> Result<Pad> {
    let chars: Vec<char> = spec.chars().collect();
    let (fill, align, rest) = match (chars.first(), chars.get(1)) {
        (Some(&fill), Some(&second)) if align_of(second).is_some() => {
            (fill, align_of(second), &chars[2..])
        }
        (Some(&first), _) if align_of(first).is_some() => (' ', align_of(first), &chars[1..]),
        _ => (' ', Some(Align::Left), &chars[..]),
    };

    let width: String = rest.iter().collect();
    let width = if width.is_empty() {
        0
    } else {
        width
            .parse()
            .map_err(|_| template_error(source, format!("invalid format spec '{}'", spec)))?
    };

    Ok(Pad {
        fill,
        align: align.unwrap_or(Align::Left),
        width,
    })
}

/// Translate `YYYY-MM-DD HH:mm:ss` style tokens into a strftime pattern
fn translate_time(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest.find(']') {
                out.push_str(&rest[1..end].replace('%', "%%"));
                rest = &rest[end + 1..];
                continue;
            }
        }
        if let Some((token, spec)) = TIME_TOKENS.iter().find(|(token, _)| rest.starts_with(token)) {
            out.push_str(spec);
            rest = &rest[token.len()..];
            continue;
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn field_value<'a>(field: &Field, record: &'a Record) -> Cow<'a, str> {
    match field {
        Field::Time(pattern) => {
            let mut out = String::new();
            let _ = write!(out, "{}", record.time.format(pattern));
            Cow::Owned(out)
        }
        Field::Level => Cow::Borrowed(record.label()),
        Field::Name => Cow::Borrowed(record.name()),
        Field::Module => Cow::Borrowed(record.caller.module),
        Field::Function => Cow::Borrowed(record.caller.function),
        Field::File => Cow::Borrowed(record.caller.file),
        Field::Line => Cow::Owned(record.caller.line.to_string()),
        Field::Thread => Cow::Borrowed(&record.thread),
        Field::Message => Cow::Borrowed(&record.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Caller;
    use chrono::{Local, TimeZone};
    use logroute_core_types::Level;

    fn record(level: Level) -> Record {
        let mut record = Record::new(level, "hello", Caller::new("app::db", "connect", "src/db.rs", 42));
        record.time = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        record
    }

    #[test]
    fn test_plain_fields() {
        let template = Template::parse("{level} {name}:{function}:{line} - {message}").unwrap();
        assert_eq!(
            template.render(&record(Level::Info), false),
            "INFO app::db:connect:42 - hello"
        );
    }

    #[test]
    fn test_time_tokens() {
        let template = Template::parse("{time:YYYY-MM-DD HH:mm:ss}|{time:[at] HH[h]}").unwrap();
        assert_eq!(
            template.render(&record(Level::Info), false),
            "2024-03-09 07:05:01|at 07h"
        );
    }

    #[test]
    fn test_padding_and_alignment() {
        let template = Template::parse("[{level: <8}][{level:>8}][{level:*^9}]").unwrap();
        assert_eq!(
            template.render(&record(Level::Info), false),
            "[INFO    ][    INFO][**INFO***]"
        );
    }

    #[test]
    fn test_markup_is_stripped_without_color() {
        let template = Template::parse("<green>{message}</green> <level>{level}</level>").unwrap();
        assert_eq!(template.render(&record(Level::Error), false), "hello ERROR");
    }

    #[test]
    fn test_markup_becomes_ansi_with_color() {
        let template = Template::parse("<green>{message}</> <level>{level}</level>").unwrap();
        let rendered = template.render(&record(Level::Error), true);
        assert!(rendered.starts_with("\x1b[32mhello\x1b[0m"));
        assert!(rendered.contains("\x1b[31m\x1b[1mERROR\x1b[0m"));
    }

    #[test]
    fn test_nested_tags_restore_outer_style() {
        let template = Template::parse("<bold>a<red>b</red>c</bold>").unwrap();
        let rendered = template.render(&record(Level::Info), true);
        assert_eq!(rendered, "\x1b[1ma\x1b[31mb\x1b[0m\x1b[1mc\x1b[0m");
    }

    #[test]
    fn test_escapes_and_unknown_tags_are_literal() {
        let template = Template::parse("{{x}} \\<green> <unknown> a<b").unwrap();
        assert_eq!(
            template.render(&record(Level::Info), true),
            "{x} <green> <unknown> a<b"
        );
    }

    #[test]
    fn test_invalid_templates() {
        for bad in [
            "{message",
            "message}",
            "{nope}",
            "{level:<x}",
            "<red>{message}",
            "{message}</red>",
            "<red>{message}</green>",
        ] {
            let err = Template::parse(bad).unwrap_err();
            assert_eq!(err.code(), "ERR_INVALID_TEMPLATE", "template {:?}", bad);
        }
    }

    #[test]
    fn test_default_format_parses() {
        let template = Template::parse(logroute_config::DEFAULT_FORMAT).unwrap();
        let rendered = template.render(&record(Level::Warning), false);
        assert_eq!(rendered, "2024-03-09 07:05:01 | WARNING  | app::db:connect:42 - hello");
    }
}
