//! Line-level lexing for entity source text
//!
//! The Model body is never handed to a full Rust parser: generated files can be
//! half-edited and still need repairing. Instead each line is classified by what
//! it opens, and a small bracket-depth scanner decides where an annotation or a
//! field ends. String and char literals and line comments are skipped so that
//! directives like `column_type = "Decimal(Some((10, 2)))"` do not unbalance it.

/// Type names SeaORM uses for relationship-only fields.
pub const RELATION_CONTAINERS: [&str; 2] = ["HasMany", "HasOne"];

/// What a single line of a Model body opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment,
    DocComment,
    Attribute,
    /// Starts with the `pub` visibility keyword
    Field,
    /// A bare `HasMany<..>` / `HasOne<..>` fragment with no visibility prefix
    OrphanRelation,
    Other,
}

impl LineKind {
    /// Whether a line of this kind begins a new field unit.
    pub fn starts_unit(self) -> bool {
        matches!(self, LineKind::DocComment | LineKind::Attribute | LineKind::Field)
    }
}

pub fn classify(line: &str) -> LineKind {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.starts_with("///") && !trimmed.starts_with("////") {
        LineKind::DocComment
    } else if trimmed.starts_with("//") {
        LineKind::Comment
    } else if trimmed.starts_with("#[") {
        LineKind::Attribute
    } else if trimmed.starts_with("pub ") || trimmed.starts_with("pub(") {
        LineKind::Field
    } else if starts_with_relation_container(trimmed) {
        LineKind::OrphanRelation
    } else {
        LineKind::Other
    }
}

fn starts_with_relation_container(text: &str) -> bool {
    RELATION_CONTAINERS.iter().any(|container| {
        text.strip_prefix(container)
            .is_some_and(|rest| rest.trim_start().starts_with('<'))
    })
}

/// Result of scanning one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineScan {
    /// Byte offset of the first comma seen at depth zero
    pub top_comma: Option<usize>,
    /// Byte offset where code ends and a trailing line comment begins
    pub code_end: usize,
    /// Byte offset just past the bracket that brought the depth back to zero
    pub closed_at: Option<usize>,
}

/// Tracks bracket nesting across the lines of one annotation or field.
#[derive(Debug, Default, Clone)]
pub struct DepthScanner {
    depth: usize,
    angles: bool,
    in_string: bool,
}

impl DepthScanner {
    /// Counts `()`, `[]` and `{}`.
    pub fn for_attribute() -> Self {
        Self::default()
    }

    /// Counts `<>` as well, so commas inside generic arguments do not end the field.
    pub fn for_field() -> Self {
        Self {
            angles: true,
            ..Self::default()
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// No bracket or string literal is left open.
    pub fn is_balanced(&self) -> bool {
        self.depth == 0 && !self.in_string
    }

    pub fn feed(&mut self, line: &str) -> LineScan {
        let bytes = line.as_bytes();
        let mut top_comma = None;
        let mut code_end = bytes.len();
        let mut closed_at = None;
        let mut i = 0;

        while i < bytes.len() {
            let byte = bytes[i];

            if self.in_string {
                match byte {
                    b'\\' => i += 1,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                i += 1;
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'\'' => {
                    if let Some(len) = char_literal_len(&line[i + 1..]) {
                        i += len;
                    }
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    code_end = i;
                    break;
                }
                b'(' | b'[' | b'{' => self.depth += 1,
                b')' | b']' | b'}' => {
                    if self.depth == 1 && closed_at.is_none() {
                        closed_at = Some(i + 1);
                    }
                    self.depth = self.depth.saturating_sub(1)
                }
                b'<' if self.angles => self.depth += 1,
                // `->` in fn pointer types is not a closing angle
                b'>' if self.angles && (i == 0 || bytes[i - 1] != b'-') => {
                    self.depth = self.depth.saturating_sub(1)
                }
                b',' if self.depth == 0 && top_comma.is_none() => top_comma = Some(i),
                _ => {}
            }
            i += 1;
        }

        LineScan {
            top_comma,
            code_end,
            closed_at,
        }
    }
}

/// Length of a char literal body plus its closing quote, given the text right
/// after the opening quote. `None` for lifetimes such as `'static`.
fn char_literal_len(rest: &str) -> Option<usize> {
    let first = rest.chars().next()?;
    if first == '\\' {
        return rest[1..].find('\'').map(|pos| pos + 2);
    }
    let width = first.len_utf8();
    rest[width..].starts_with('\'').then_some(width + 1)
}

/// Extracts the declared type of a field from its source lines.
///
/// Returns the text between the field's `:` and its terminating comma (or the
/// end of the field), with line comments removed.
pub fn field_type<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    let mut scanner = DepthScanner::for_field();
    let mut code = String::new();

    for line in lines {
        let line = line.as_ref();
        let scan = scanner.feed(line);
        let end = scan.top_comma.unwrap_or(scan.code_end);
        code.push_str(&line[..end]);
        code.push(' ');
        if scan.top_comma.is_some() {
            break;
        }
    }

    let colon = find_field_colon(&code)?;
    let ty = code[colon + 1..].trim();
    (!ty.is_empty()).then(|| ty.to_string())
}

/// First single `:` outside parentheses, skipping `::` path separators.
fn find_field_colon(code: &str) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut depth = 0usize;

    for (i, &byte) in bytes.iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b':' if depth == 0
                && bytes.get(i + 1) != Some(&b':')
                && (i == 0 || bytes[i - 1] != b':') =>
            {
                return Some(i)
            }
            _ => {}
        }
    }
    None
}

/// Leading whitespace of a line.
pub fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_lines() {
        assert_eq!(classify("   "), LineKind::Blank);
        assert_eq!(classify("    // generated"), LineKind::Comment);
        assert_eq!(classify("    //// banner"), LineKind::Comment);
        assert_eq!(classify("    /// The artist id"), LineKind::DocComment);
        assert_eq!(classify("    #[sea_orm(primary_key)]"), LineKind::Attribute);
        assert_eq!(classify("    pub id: i32,"), LineKind::Field);
        assert_eq!(classify("    pub(crate) id: i32,"), LineKind::Field);
        assert_eq!(
            classify("        HasMany<super::track::Entity>,"),
            LineKind::OrphanRelation
        );
        assert_eq!(classify("    HasOneThing,"), LineKind::Other);
        assert_eq!(classify("        Option<i32>,"), LineKind::Other);
    }

    #[test]
    fn test_attribute_closes_on_last_bracket() {
        let mut scanner = DepthScanner::for_attribute();
        scanner.feed("    #[sea_orm(");
        assert!(!scanner.is_balanced());
        scanner.feed("        belongs_to = \"super::area::Entity\",");
        assert!(!scanner.is_balanced());
        let scan = scanner.feed("    )]");
        assert!(scanner.is_balanced());
        assert_eq!(scan.closed_at, Some(6));
    }

    #[test]
    fn test_closed_at_marks_end_of_inline_attribute() {
        let line = "    #[sea_orm(has_many)] pub children: HasMany<Child>,";
        let scan = DepthScanner::for_attribute().feed(line);
        assert_eq!(&line[..scan.closed_at.unwrap()], "    #[sea_orm(has_many)]");
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let mut scanner = DepthScanner::for_attribute();
        scanner.feed(r#"    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]"#);
        assert!(scanner.is_balanced());

        let mut scanner = DepthScanner::for_attribute();
        scanner.feed(r#"    #[sea_orm(default_value = "\")(")]"#);
        assert!(scanner.is_balanced());
    }

    #[test]
    fn test_commas_inside_generics_are_not_top_level() {
        let mut scanner = DepthScanner::for_field();
        let scan = scanner.feed("    pub tags: HashMap<String, Vec<i32>>,");
        assert_eq!(scan.top_comma, Some(39));
        assert!(scanner.is_balanced());

        let mut scanner = DepthScanner::for_field();
        let scan = scanner.feed("    pub callback: fn(i32, i32) -> bool,");
        assert!(scan.top_comma.is_some());
        assert!(scanner.is_balanced());
    }

    #[test]
    fn test_line_comment_stops_scan() {
        let mut scanner = DepthScanner::for_field();
        let scan = scanner.feed("    pub id: i32 // note, with comma");
        assert_eq!(scan.top_comma, None);
        assert_eq!(scan.code_end, 16);
    }

    #[test]
    fn test_char_literals_and_lifetimes() {
        let mut scanner = DepthScanner::for_field();
        scanner.feed("    pub name: &'static str,");
        assert!(scanner.is_balanced());

        let mut scanner = DepthScanner::for_attribute();
        scanner.feed("    #[doc = ']']");
        assert!(scanner.is_balanced());
    }

    #[test]
    fn test_field_type_single_line() {
        assert_eq!(
            field_type(&["    pub children: HasMany<super::child::Entity>,"]).as_deref(),
            Some("HasMany<super::child::Entity>")
        );
        assert_eq!(
            field_type(&["    pub r#type: Option<i32>, // nullable"]).as_deref(),
            Some("Option<i32>")
        );
    }

    #[test]
    fn test_field_type_multi_line() {
        let lines = [
            "    pub releases:",
            "        HasMany<super::release::Entity>,",
        ];
        assert_eq!(
            field_type(&lines).as_deref(),
            Some("HasMany<super::release::Entity>")
        );
    }

    #[test]
    fn test_field_type_restricted_visibility() {
        assert_eq!(
            field_type(&["    pub(crate) id: i32,"]).as_deref(),
            Some("i32")
        );
    }

    #[test]
    fn test_indent_of() {
        assert_eq!(indent_of("    #[sea_orm]"), "    ");
        assert_eq!(indent_of("\t#[sea_orm]"), "\t");
        assert_eq!(indent_of("x"), "");
    }
}
