//! Typed pieces of a SeaORM `Model` body

use crate::lexer::{self, LineKind, RELATION_CONTAINERS};
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ExprLit, Lit, Meta, Token};

/// Directives carried by one `#[sea_orm(...)]` attribute that matter to the rewrite
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeaOrmDirectives {
    pub primary_key: bool,
    /// `auto_increment = false`
    pub auto_increment_disabled: bool,
    pub has_many: bool,
    pub has_one: bool,
    pub self_ref: bool,
    pub belongs_to: bool,
}

impl SeaOrmDirectives {
    /// Parse the source text of one attribute.
    ///
    /// Returns `None` when the attribute is not `#[sea_orm(...)]` or cannot be
    /// parsed; such attributes are carried through untouched.
    pub fn parse(text: &str) -> Option<Self> {
        let attrs = Attribute::parse_outer.parse_str(text).ok()?;
        let attr = attrs.first()?;
        if !attr.path().is_ident("sea_orm") {
            return None;
        }

        let metas = attr
            .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
            .ok()?;

        let mut directives = Self::default();
        for meta in &metas {
            let Some(ident) = meta.path().get_ident() else {
                continue;
            };
            match ident.to_string().as_str() {
                "primary_key" => directives.primary_key = true,
                "auto_increment" => {
                    if let Meta::NameValue(nv) = meta {
                        if let Expr::Lit(ExprLit {
                            lit: Lit::Bool(enabled),
                            ..
                        }) = &nv.value
                        {
                            directives.auto_increment_disabled = !enabled.value;
                        }
                    }
                }
                "has_many" => directives.has_many = true,
                "has_one" => directives.has_one = true,
                "self_ref" => directives.self_ref = true,
                "belongs_to" => directives.belongs_to = true,
                _ => {}
            }
        }

        Some(directives)
    }

    /// The attribute sits on the inverse side of an association.
    pub fn declares_relation(&self) -> bool {
        self.has_many || self.has_one || self.self_ref
    }

    /// Minimal replacement for a `belongs_to` attribute, keeping only the key flags.
    pub fn key_flags_attribute(&self, indent: &str) -> Option<String> {
        let mut parts = Vec::new();
        if self.primary_key {
            parts.push("primary_key");
        }
        if self.auto_increment_disabled {
            parts.push("auto_increment = false");
        }

        if parts.is_empty() {
            None
        } else {
            Some(format!("{}#[sea_orm({})]", indent, parts.join(", ")))
        }
    }
}

/// One `#[...]` block preceding a field, possibly wrapped over several lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub lines: Vec<String>,
    pub sea_orm: Option<SeaOrmDirectives>,
}

impl Annotation {
    pub fn new(lines: Vec<String>) -> Self {
        let sea_orm = SeaOrmDirectives::parse(&lines.join("\n"));
        Self { lines, sea_orm }
    }

    fn belongs_to(&self) -> Option<&SeaOrmDirectives> {
        self.sea_orm.as_ref().filter(|d| d.belongs_to)
    }

    /// Replacement lines for a `belongs_to` annotation.
    fn reduced(&self, directives: &SeaOrmDirectives) -> Option<String> {
        let first = self.lines.first()?;
        let mut line = directives.key_flags_attribute(lexer::indent_of(first))?;
        if self.lines.last().is_some_and(|last| last.ends_with('\r')) {
            line.push('\r');
        }
        Some(line)
    }
}

/// Anything that can precede a field inside its unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leading {
    Annotation(Annotation),
    /// Doc comments, plain comments and blank lines between annotations
    Line(String),
}

/// What happens to a field unit on rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAction {
    Keep,
    Drop,
    /// Keep the field, reduce its `belongs_to` annotations to key flags
    StripBelongsTo,
}

/// A field declaration together with everything attached to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUnit {
    pub leading: Vec<Leading>,
    /// Field lines, starting at the `pub` line
    pub field: Vec<String>,
    /// The first field line continues the physical line of the last annotation,
    /// as in `#[sea_orm(has_many)] pub children: HasMany<Child>,`
    pub inline: bool,
}

impl FieldUnit {
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.leading.iter().filter_map(|leading| match leading {
            Leading::Annotation(annotation) => Some(annotation),
            Leading::Line(_) => None,
        })
    }

    pub fn declared_type(&self) -> Option<String> {
        lexer::field_type(&self.field)
    }

    /// The field's type is a relationship container such as `HasMany<..>`,
    /// or the field is only a bare container left from an earlier edit.
    pub fn is_relation_field(&self) -> bool {
        let orphan = self
            .field
            .first()
            .is_some_and(|line| lexer::classify(line) == LineKind::OrphanRelation);
        orphan
            || self
                .declared_type()
                .is_some_and(|ty| is_relation_type(&ty))
    }

    pub fn action(&self) -> FieldAction {
        let directives: Vec<&SeaOrmDirectives> = self
            .annotations()
            .filter_map(|a| a.sea_orm.as_ref())
            .collect();

        if self.is_relation_field() || directives.iter().any(|d| d.declares_relation()) {
            FieldAction::Drop
        } else if directives.iter().any(|d| d.belongs_to) {
            FieldAction::StripBelongsTo
        } else {
            FieldAction::Keep
        }
    }

    /// Emit the unit's surviving lines for the given action.
    ///
    /// Returns the number of annotations that were reduced or removed.
    pub fn render_into(&self, action: FieldAction, out: &mut Vec<String>) -> usize {
        if action == FieldAction::Drop {
            return 0;
        }

        let mut reduced = 0;
        // The last emitted line still belongs to the annotation the field follows inline
        let mut glue = false;
        for leading in &self.leading {
            match leading {
                Leading::Annotation(annotation) => {
                    let belongs_to = annotation
                        .belongs_to()
                        .filter(|_| action == FieldAction::StripBelongsTo);
                    let before = out.len();
                    match belongs_to {
                        Some(directives) => {
                            reduced += 1;
                            out.extend(annotation.reduced(directives));
                        }
                        None => out.extend(annotation.lines.iter().cloned()),
                    }
                    glue = out.len() > before;
                }
                Leading::Line(line) => {
                    out.push(line.clone());
                    glue = false;
                }
            }
        }

        let mut field = self.field.iter();
        if self.inline {
            if let Some(first) = field.next() {
                match out.last_mut().filter(|_| glue) {
                    Some(last) => last.push_str(first),
                    None => out.push(format!("{}{}", self.indent(), first.trim_start())),
                }
            }
        }
        out.extend(field.cloned());
        reduced
    }

    /// Indentation of the unit's first line.
    fn indent(&self) -> &str {
        let first = self.leading.iter().find_map(|leading| match leading {
            Leading::Annotation(annotation) => annotation.lines.first(),
            Leading::Line(line) => Some(line),
        });
        first.map_or("", |line| lexer::indent_of(line))
    }
}

/// Outermost type is `HasMany<..>` or `HasOne<..>`, by any path.
pub fn is_relation_type(ty: &str) -> bool {
    match syn::parse_str::<syn::Type>(ty) {
        Ok(syn::Type::Path(type_path)) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| RELATION_CONTAINERS.iter().any(|c| segment.ident == *c)),
        Ok(_) => false,
        // Unparseable text still counts when it plainly starts with a container
        Err(_) => RELATION_CONTAINERS.iter().any(|container| {
            ty.trim_start()
                .strip_prefix(container)
                .is_some_and(|rest| rest.trim_start().starts_with('<'))
        }),
    }
}

/// One piece of a parsed Model body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(FieldUnit),
    /// Leftover `HasMany<..>` line with its prefix already gone
    Orphan(String),
    /// Passed through unchanged, including incomplete units
    Verbatim(Vec<String>),
}
