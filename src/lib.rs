//! # entity-fixer
//!
//! Post-processing pass for SeaORM entity files produced by a code generator.
//!
//! The generator leaves `#[sea_orm::model]` markers, relationship fields
//! (`HasMany<..>` / `HasOne<..>`) and `belongs_to` directives inside
//! `pub struct Model`, and sometimes omits `pub enum Relation`. This crate
//! rewrites such files into a shape that compiles, touching only files whose
//! content actually changes.

pub mod batch;
pub mod config;
pub mod entity;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod rewrite;

pub use crate::batch::{fix_directory, fix_directory_with, FixEvent, FixOptions, FixReport};
pub use crate::config::FixConfig;
pub use crate::error::{FixError, Result};
pub use crate::rewrite::{rewrite_entity, Rewrite, RewriteStats};
