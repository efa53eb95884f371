//! Grammar for the body of `pub struct Model { ... }`
//!
//! ```text
//! body      := segment*
//! segment   := unit | orphan | verbatim
//! unit      := leading* field
//! leading   := doc-comment | annotation | comment | blank
//! field     := "pub" ... ("," at depth 0 | end of field)
//! ```
//!
//! An annotation may be followed by its field on the same line. A field without
//! a trailing comma ends when the next significant line starts another unit or
//! the body runs out. Annotations followed by a line without `pub` take that
//! line as a loose field, but only when the unit is dropped as a relationship.
//! When the body ends inside an annotation or a field, or a unit is otherwise
//! interrupted before its field, every line collected for that unit is handed
//! back as a verbatim segment.

use crate::entity::{Annotation, FieldAction, FieldUnit, Leading, Segment};
use crate::lexer::{self, classify, DepthScanner, LineKind};

/// Split a Model body into segments, preserving every input line.
pub fn parse_body<S: AsRef<str>>(lines: &[S]) -> Vec<Segment> {
    let lines: Vec<&str> = lines.iter().map(AsRef::as_ref).collect();
    BodyParser { lines: &lines, pos: 0 }.parse()
}

struct BodyParser<'a> {
    lines: &'a [&'a str],
    pos: usize,
}

impl<'a> BodyParser<'a> {
    fn parse(mut self) -> Vec<Segment> {
        let mut segments = Vec::new();

        while let Some(line) = self.peek() {
            let kind = classify(line);
            if kind.starts_unit() {
                segments.push(self.unit());
            } else if kind == LineKind::OrphanRelation {
                segments.push(Segment::Orphan(line.to_string()));
                self.pos += 1;
            } else {
                segments.push(Segment::Verbatim(vec![line.to_string()]));
                self.pos += 1;
            }
        }

        segments
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn unit(&mut self) -> Segment {
        let start = self.pos;
        let mut leading = Vec::new();

        let inline_field = loop {
            let Some(line) = self.peek() else {
                return self.abandon(start);
            };
            match classify(line) {
                LineKind::Attribute => match self.annotation() {
                    Some((annotation, rest)) => {
                        leading.push(Leading::Annotation(annotation));
                        if rest.is_some() {
                            break rest;
                        }
                    }
                    None => return self.abandon(start),
                },
                LineKind::DocComment | LineKind::Comment | LineKind::Blank => {
                    leading.push(Leading::Line(line.to_string()));
                    self.pos += 1;
                }
                LineKind::Field => break None,
                LineKind::OrphanRelation | LineKind::Other => {
                    return self.loose_field(start, leading)
                }
            }
        };

        let inline = inline_field.is_some();
        match self.field(inline_field) {
            Some(field) => Segment::Field(FieldUnit {
                leading,
                field,
                inline,
            }),
            None => self.abandon(start),
        }
    }

    /// Consume one annotation; `None` if the body ends before it closes.
    ///
    /// When a field follows on the annotation's last line, that remainder is
    /// split off and returned alongside.
    fn annotation(&mut self) -> Option<(Annotation, Option<String>)> {
        let mut scanner = DepthScanner::for_attribute();
        let mut lines = Vec::new();

        while let Some(line) = self.peek() {
            let scan = scanner.feed(line);
            self.pos += 1;
            if !scanner.is_balanced() {
                lines.push(line.to_string());
                continue;
            }

            let close = scan.closed_at.unwrap_or(line.len());
            let rest = &line[close..];
            if classify(rest) == LineKind::Field {
                lines.push(line[..close].to_string());
                return Some((Annotation::new(lines), Some(rest.to_string())));
            }
            lines.push(line.to_string());
            return Some((Annotation::new(lines), None));
        }

        None
    }

    /// Consume one field, starting with `inline` if the previous annotation's
    /// line already opened it; `None` if the body ends with brackets still open.
    fn field(&mut self, inline: Option<String>) -> Option<Vec<String>> {
        let mut scanner = DepthScanner::for_field();
        let mut lines = Vec::new();

        if let Some(first) = inline {
            let scan = scanner.feed(&first);
            lines.push(first);
            if self.field_complete(&scanner, scan.top_comma.is_some()) {
                return Some(lines);
            }
        }

        while let Some(line) = self.peek() {
            let scan = scanner.feed(line);
            lines.push(line.to_string());
            self.pos += 1;

            if self.field_complete(&scanner, scan.top_comma.is_some()) {
                return Some(lines);
            }
        }

        None
    }

    /// A field that lost its `pub` prefix, or a bare relationship type left
    /// under its annotations. It joins the unit only when the whole unit is
    /// dropped; otherwise every line from `start` comes back verbatim.
    fn loose_field(&mut self, start: usize, leading: Vec<Leading>) -> Segment {
        let resume = self.pos;
        let mut scanner = DepthScanner::for_field();
        let mut field: Vec<String> = Vec::new();

        while let Some(line) = self.peek() {
            let kind = classify(line);
            if !field.is_empty()
                && scanner.is_balanced()
                && !matches!(kind, LineKind::OrphanRelation | LineKind::Other)
            {
                break;
            }

            let scan = scanner.feed(line);
            field.push(line.to_string());
            self.pos += 1;

            let typed = classify(&field[0]) == LineKind::OrphanRelation
                || lexer::field_type(&field).is_some();
            if scan.top_comma.is_some() || (scanner.is_balanced() && typed) {
                break;
            }
        }

        let unit = FieldUnit {
            leading,
            field,
            inline: false,
        };
        if scanner.is_balanced() && unit.action() == FieldAction::Drop {
            return Segment::Field(unit);
        }

        self.pos = resume;
        self.abandon(start)
    }

    fn field_complete(&self, scanner: &DepthScanner, saw_top_comma: bool) -> bool {
        saw_top_comma || (scanner.is_balanced() && self.next_significant_starts_unit())
    }

    /// Skips blank and comment lines; the end of the body counts as a new unit.
    fn next_significant_starts_unit(&self) -> bool {
        self.lines[self.pos..]
            .iter()
            .map(|line| classify(line))
            .find(|kind| !matches!(kind, LineKind::Blank | LineKind::Comment))
            .map_or(true, LineKind::starts_unit)
    }

    fn abandon(&self, start: usize) -> Segment {
        Segment::Verbatim(
            self.lines[start..self.pos]
                .iter()
                .map(|line| line.to_string())
                .collect(),
        )
    }
}
