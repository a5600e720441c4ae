//! Oribe - the parsing core of a template-to-Java compiler
//!
//! Oribe templates mix literal markup with an `@`-prefixed mini-language:
//! value expressions, if/for/with/switch blocks, and closures. This crate
//! parses one template into a [`TemplateModel`] — an ordered sequence of
//! template units plus header metadata — that an external source generator
//! turns into Java. Code generation, compilation, and hot reload live
//! outside this crate.
//!
//! Every unit carries the exact span of source it came from, so diagnostics
//! and generated position markers always point back at real template
//! coordinates.
//!
//! # Example
//!
//! ```rust
//! use oribe::UnitKind;
//!
//! let model = oribe::parse_str(
//!     "@args (String name)\n<h1>Hello, @name!</h1>",
//!     "hello.ori.html",
//! ).unwrap();
//!
//! assert_eq!(model.arguments[0].variable.name, "name");
//! let greeting = model.find_unit(UnitKind::ValueExpression, 0).unwrap();
//! assert_eq!(greeting.span().begin.line, 2);
//! ```

// Public modules - part of the API
pub mod content_type;
pub mod error;
pub mod loader;
pub mod model;
pub mod options;
pub mod source;
pub mod stmt;
pub mod unit;

// Internal implementation modules
mod builder;
mod lexer;
mod normalize;
mod token;

pub use content_type::ContentType;
pub use error::{OribeError, Result};
pub use loader::{parse_file, parse_file_with_root};
pub use model::{Argument, PlainTextGroup, TemplateMeta, TemplateModel, BODY_TYPE_NAME};
pub use options::{JavaVersion, Options};
pub use source::{SourcePosition, SourceRef};
pub use stmt::{ForForm, ForStatement, JavaVariable, WithStatement};
pub use unit::{PlainText, TemplateUnit, UnitKind};

use builder::ModelBuilder;
use lexer::Lexer;

/// Parse template source into a [`TemplateModel`].
///
/// The pipeline runs tokenization, model building, then the normalization
/// passes selected by the (possibly `@option`-overridden) options. Any
/// failure is returned wrapped with the template's path.
pub fn parse(source: &str, meta: TemplateMeta, options: Options) -> Result<TemplateModel> {
    let path = meta.path.clone();
    parse_pipeline(source, meta, options).map_err(|e| e.with_template(&path))
}

fn parse_pipeline(source: &str, meta: TemplateMeta, options: Options) -> Result<TemplateModel> {
    let tokens = Lexer::new(source).tokenize()?;
    let built = ModelBuilder::new(options).build(tokens)?;
    let mut model = TemplateModel::new(meta, built);

    if model.options.combine_adjacent_plain_text {
        normalize::combine_adjacent_plain_text(&mut model.units)?;
    }
    let discard = model
        .options
        .discard_logic_whitespace
        .unwrap_or_else(|| model.content_type.discard_logic_whitespace_default());
    if discard {
        normalize::discard_logic_whitespace(&mut model.units);
    }
    Ok(model)
}

/// Parse a template from a string, inferring the content type from the
/// template file name. Convenient for tests and embedding.
pub fn parse_str(source: &str, template_name: &str) -> Result<TemplateModel> {
    let extension = template_name.rsplit('.').next().unwrap_or_default();
    let meta = TemplateMeta::new("", template_name, ContentType::from_extension(extension));
    parse(source, meta, Options::default())
}
