//! Whole-file rewrite of one generated entity

use crate::entity::{FieldAction, Segment};
use crate::parser::parse_body;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static MODEL_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*#\[sea_orm::model\][ \t]*(?:\r?\n|\z)").expect("valid marker regex")
});

static MODEL_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pub\s+struct\s+Model\s*\{").expect("valid model regex"));

static RELATION_ENUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bpub\s+enum\s+Relation\b").expect("valid relation regex"));

static BEHAVIOR_IMPL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"impl\s+ActiveModelBehavior\s+for\s+ActiveModel\b").expect("valid impl regex")
});

/// Declaration inserted when an entity has no `Relation` enum.
pub const EMPTY_RELATION: &str =
    "#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]\npub enum Relation {}\n\n";

/// What a rewrite did to one file
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    pub model_markers_removed: usize,
    pub fields_dropped: usize,
    pub annotations_reduced: usize,
    pub orphan_lines_dropped: usize,
    pub relation_inserted: bool,
}

/// Output of [`rewrite_entity`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// The text differs from the input and should replace the file
    pub changed: bool,
    pub stats: RewriteStats,
}

/// Repair the source of one entity file.
///
/// Removes `#[sea_orm::model]` lines, purges relationship fields and
/// relationship-only annotations from `Model`, and adds an empty `Relation`
/// enum ahead of `impl ActiveModelBehavior for ActiveModel` when the file has
/// none. Applying it to its own output changes nothing.
pub fn rewrite_entity(source: &str) -> Rewrite {
    let mut stats = RewriteStats::default();

    let text = remove_model_markers(source, &mut stats);
    let text = rewrite_model_body(&text, &mut stats);
    let text = ensure_relation_enum(&text, &mut stats);

    let changed = text != source;
    Rewrite {
        text,
        changed,
        stats,
    }
}

fn remove_model_markers(text: &str, stats: &mut RewriteStats) -> String {
    stats.model_markers_removed = MODEL_MARKER.find_iter(text).count();
    MODEL_MARKER.replace_all(text, "").into_owned()
}

/// Byte range of the Model body: after its `{`, up to the newline before the
/// first line that is only `}`.
fn model_body_span(text: &str) -> Option<(usize, usize)> {
    let open = MODEL_OPEN.find(text)?.end();
    let rest = &text[open..];

    // `pub struct Model {}` on one line has no body to walk
    if rest.split('\n').next().is_some_and(|line| line.contains('}')) {
        return None;
    }

    let close = rest.match_indices('\n').map(|(i, _)| i).find(|&i| {
        rest[i + 1..]
            .split('\n')
            .next()
            .is_some_and(|line| line.trim_end() == "}")
    })?;

    Some((open, open + close))
}

fn rewrite_model_body(text: &str, stats: &mut RewriteStats) -> String {
    let Some((start, end)) = model_body_span(text) else {
        log::debug!("no complete `pub struct Model` body found");
        return text.to_string();
    };

    let lines: Vec<&str> = text[start..end].split('\n').collect();
    let mut out = Vec::with_capacity(lines.len());

    for segment in parse_body(&lines) {
        match segment {
            Segment::Field(unit) => {
                let action = unit.action();
                if action == FieldAction::Drop {
                    stats.fields_dropped += 1;
                    log::debug!("dropping relationship field: {}", unit.field[0].trim());
                }
                stats.annotations_reduced += unit.render_into(action, &mut out);
            }
            Segment::Orphan(line) => {
                stats.orphan_lines_dropped += 1;
                log::debug!("dropping orphan relationship line: {}", line.trim());
            }
            Segment::Verbatim(lines) => out.extend(lines),
        }
    }

    let mut result = String::with_capacity(text.len());
    result.push_str(&text[..start]);
    result.push_str(&out.join("\n"));
    result.push_str(&text[end..]);
    result
}

fn ensure_relation_enum(text: &str, stats: &mut RewriteStats) -> String {
    if RELATION_ENUM.is_match(text) {
        return text.to_string();
    }
    let Some(marker) = BEHAVIOR_IMPL.find(text) else {
        return text.to_string();
    };

    let before = &text[..marker.start()];
    let gap = if before.is_empty() || before.ends_with("\n\n") || before.ends_with("\r\n\r\n") {
        ""
    } else if before.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    };

    let mut declaration = format!("{gap}{EMPTY_RELATION}");
    if text.contains("\r\n") {
        declaration = declaration.replace('\n', "\r\n");
    }

    stats.relation_inserted = true;

    let mut result = String::with_capacity(text.len() + declaration.len());
    result.push_str(before);
    result.push_str(&declaration);
    result.push_str(&text[marker.start()..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIST: &str = r#"use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(schema_name = "musicbrainz", table_name = "artist")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(belongs_to = "super::area::Entity", from = "area", to = "id")]
    pub area: Option<i32>,
    #[sea_orm(has_many = "super::release::Entity")]
    pub releases: HasMany<super::release::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
"#;

    #[test]
    fn test_rewrite_artist() {
        let rewrite = rewrite_entity(ARTIST);

        let expected = r#"use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(schema_name = "musicbrainz", table_name = "artist")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub area: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
"#;
        assert_eq!(rewrite.text, expected);
        assert!(rewrite.changed);
        assert_eq!(
            rewrite.stats,
            RewriteStats {
                model_markers_removed: 1,
                fields_dropped: 1,
                annotations_reduced: 1,
                orphan_lines_dropped: 0,
                relation_inserted: true,
            }
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let once = rewrite_entity(ARTIST);
        let twice = rewrite_entity(&once.text);

        assert_eq!(twice.text, once.text);
        assert!(!twice.changed);
        assert_eq!(twice.stats, RewriteStats::default());
    }

    #[test]
    fn test_existing_relation_enum_is_kept() {
        let source = "pub struct Model {\n    pub id: i32,\n}\n\n#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]\npub enum Relation {\n    Area,\n}\n\nimpl ActiveModelBehavior for ActiveModel {}\n";
        let rewrite = rewrite_entity(source);

        assert_eq!(rewrite.text, source);
        assert!(!rewrite.changed);
    }

    #[test]
    fn test_no_behavior_impl_means_no_insertion() {
        let source = "pub struct Model {\n    pub id: i32,\n}\n";
        let rewrite = rewrite_entity(source);

        assert!(!rewrite.changed);
        assert!(!rewrite.stats.relation_inserted);
    }

    #[test]
    fn test_insertion_adds_blank_line_when_missing() {
        let source = "pub struct Model {\n    pub id: i32,\n}\nimpl ActiveModelBehavior for ActiveModel {}\n";
        let rewrite = rewrite_entity(source);

        assert_eq!(
            rewrite.text,
            "pub struct Model {\n    pub id: i32,\n}\n\n#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]\npub enum Relation {}\n\nimpl ActiveModelBehavior for ActiveModel {}\n"
        );
    }

    #[test]
    fn test_crlf_line_endings_are_preserved() {
        let source = "pub struct Model {\r\n    #[sea_orm(belongs_to = \"super::a::Entity\", primary_key)]\r\n    pub a_id: i32,\r\n}\r\n\r\nimpl ActiveModelBehavior for ActiveModel {}\r\n";
        let rewrite = rewrite_entity(source);

        assert_eq!(
            rewrite.text,
            "pub struct Model {\r\n    #[sea_orm(primary_key)]\r\n    pub a_id: i32,\r\n}\r\n\r\n#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]\r\npub enum Relation {}\r\n\r\nimpl ActiveModelBehavior for ActiveModel {}\r\n"
        );
    }

    #[test]
    fn test_missing_closing_brace_leaves_body_alone() {
        let source = "pub struct Model {\n    #[sea_orm(has_many)]\n    pub children: HasMany<Child>,\n";
        let rewrite = rewrite_entity(source);

        assert_eq!(rewrite.text, source);
    }

    #[test]
    fn test_single_line_model_is_not_walked() {
        let source = "pub struct Model {}\n\npub struct Other {\n    pub children: HasMany<Child>,\n}\n";
        let rewrite = rewrite_entity(source);

        assert_eq!(rewrite.text, source);
    }

    #[test]
    fn test_marker_only_removed_as_whole_line() {
        let source = "#[sea_orm::model]\n#[derive(Debug)]\n// see #[sea_orm::model] docs\npub struct Model {\n}\n";
        let rewrite = rewrite_entity(source);

        assert_eq!(
            rewrite.text,
            "#[derive(Debug)]\n// see #[sea_orm::model] docs\npub struct Model {\n}\n"
        );
        assert_eq!(rewrite.stats.model_markers_removed, 1);
    }
}
