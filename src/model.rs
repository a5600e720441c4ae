//! The finished template model: header metadata plus the ordered unit
//! sequence, with the query surface the source generator works from.

use std::time::SystemTime;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::builder::BuiltTemplate;
use crate::content_type::ContentType;
use crate::source::SourceRef;
use crate::stmt::JavaVariable;
use crate::unit::{PlainText, TemplateUnit, UnitKind};

/// The sentinel argument type for injected template content. An argument of
/// this type may only appear once, in last place.
pub const BODY_TYPE_NAME: &str = "OribeBody";

/// One declared template argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub variable: JavaVariable,
    /// Span of the `@args` statement that declared it.
    pub span: SourceRef,
}

impl Argument {
    pub fn is_body(&self) -> bool {
        self.variable.type_name.as_deref() == Some(BODY_TYPE_NAME)
    }
}

/// Identity of the template being parsed, resolved by the caller (or by
/// [`crate::loader::parse_file`]) before parsing starts.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateMeta {
    /// Package of the generated type, from the directory path.
    pub package_name: String,
    /// File name, e.g. `index.ori.html`.
    pub template_name: String,
    pub content_type: ContentType,
    pub modified_at: Option<SystemTime>,
    /// Path used in error messages; defaults to the template name.
    pub path: String,
}

impl TemplateMeta {
    pub fn new(
        package_name: impl Into<String>,
        template_name: impl Into<String>,
        content_type: ContentType,
    ) -> Self {
        let template_name = template_name.into();
        Self {
            package_name: package_name.into(),
            path: template_name.clone(),
            template_name,
            content_type,
            modified_at: None,
        }
    }
}

/// A group of identical plain-text literals, so the generator can emit each
/// distinct literal once. Groups appear in order of first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainTextGroup {
    pub text: String,
    /// The text split into pieces of at most the requested length, for
    /// targets with a maximum literal size.
    pub chunks: Vec<String>,
    /// Unit indices of every occurrence, in render order.
    pub unit_indices: Vec<usize>,
}

/// The parse result for one template file. Built unit by unit, normalized
/// in place, then treated as frozen by the generator.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateModel {
    pub package_name: String,
    pub template_name: String,
    /// Template name with the `.ori.<ext>` suffix removed.
    pub name: String,
    pub content_type: ContentType,
    pub modified_at: Option<SystemTime>,
    pub imports: Vec<String>,
    pub arguments: Vec<Argument>,
    pub options: crate::options::Options,
    pub units: Vec<TemplateUnit>,
}

impl TemplateModel {
    pub(crate) fn new(meta: TemplateMeta, built: BuiltTemplate) -> Self {
        let name = meta
            .template_name
            .split('.')
            .next()
            .unwrap_or(&meta.template_name)
            .to_string();
        Self {
            package_name: meta.package_name,
            template_name: meta.template_name,
            name,
            content_type: meta.content_type,
            modified_at: meta.modified_at,
            imports: built.imports,
            arguments: built.arguments,
            options: built.options,
            units: built.units,
        }
    }

    pub fn units(&self) -> &[TemplateUnit] {
        &self.units
    }

    /// The unit at `idx`.
    ///
    /// # Panics
    ///
    /// Panics when `idx` is out of bounds; indices come from iterating the
    /// model itself, so that is a caller bug.
    pub fn unit(&self, idx: usize) -> &TemplateUnit {
        &self.units[idx]
    }

    /// The plain-text unit at `idx`.
    ///
    /// # Panics
    ///
    /// Panics when the unit at `idx` is not plain text.
    pub fn plain_text(&self, idx: usize) -> &PlainText {
        match &self.units[idx] {
            TemplateUnit::PlainText(text) => text,
            other => panic!("unit {} is {:?}, not plain text", idx, other.kind()),
        }
    }

    /// The `nth` (0-based) unit of the given kind, in render order.
    pub fn find_unit(&self, kind: UnitKind, nth: usize) -> Option<&TemplateUnit> {
        self.units.iter().filter(|u| u.kind() == kind).nth(nth)
    }

    /// Group identical plain-text literals, each split into chunks of at
    /// most `max_len` characters. Render order is untouched; the groups
    /// only tell the generator which units can share a literal.
    pub fn plain_text_map(&self, max_len: usize) -> Vec<PlainTextGroup> {
        let mut groups: Vec<PlainTextGroup> = Vec::new();
        for (i, unit) in self.units.iter().enumerate() {
            let Some(text) = unit.as_plain_text() else {
                continue;
            };
            match groups.iter_mut().find(|g| g.text == text.text) {
                Some(group) => group.unit_indices.push(i),
                None => groups.push(PlainTextGroup {
                    text: text.text.clone(),
                    chunks: chunk_text(&text.text, max_len),
                    unit_indices: vec![i],
                }),
            }
        }
        groups
    }

    /// Hash of the template's public shape: content type plus the ordered
    /// argument types and names. External reload logic compares this across
    /// recompiles to decide whether dependents must also be rebuilt.
    pub fn header_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content_type.to_string().as_bytes());
        for argument in &self.arguments {
            hasher.update(b"|");
            if let Some(type_name) = &argument.variable.type_name {
                hasher.update(type_name.as_bytes());
            }
            hasher.update(b" ");
            hasher.update(argument.variable.name.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// The trailing body-sentinel argument, when declared.
    pub fn body_argument(&self) -> Option<&Argument> {
        self.arguments.last().filter(|a| a.is_body())
    }

    /// The declared arguments minus the body sentinel.
    pub fn arguments_without_body(&self) -> &[Argument] {
        match self.body_argument() {
            Some(_) => &self.arguments[..self.arguments.len() - 1],
            None => &self.arguments,
        }
    }
}

fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_len)
        .map(|piece| piece.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    fn model(source: &str) -> TemplateModel {
        parse_str(source, "page.ori.html").unwrap()
    }

    #[test]
    fn test_name_derivation() {
        let m = model("x");
        assert_eq!(m.template_name, "page.ori.html");
        assert_eq!(m.name, "page");
        assert_eq!(m.content_type, ContentType::Html);
    }

    #[test]
    fn test_find_unit_counts_occurrences() {
        let m = model("@a one @b two @c");
        let second = m.find_unit(UnitKind::ValueExpression, 1).unwrap();
        match second {
            TemplateUnit::ValueExpression { expression, .. } => assert_eq!(expression, "b"),
            other => panic!("expected value expression, got {:?}", other),
        }
        assert!(m.find_unit(UnitKind::ValueExpression, 3).is_none());
    }

    #[test]
    #[should_panic(expected = "not plain text")]
    fn test_plain_text_accessor_panics_on_mismatch() {
        let m = model("@val");
        m.plain_text(0);
    }

    #[test]
    fn test_plain_text_map_groups_identical_literals() {
        let m = model("@a-@b-@c");
        let groups = m.plain_text_map(1024);
        // Both "-" separators share one group; each keeps its own unit.
        let dash = groups.iter().find(|g| g.text == "-").unwrap();
        assert_eq!(dash.unit_indices.len(), 2);
        for &idx in &dash.unit_indices {
            assert_eq!(m.units[idx].as_plain_text().unwrap().text, "-");
        }
        let spans: Vec<usize> = dash
            .unit_indices
            .iter()
            .map(|&idx| m.units[idx].span().begin.pos_in_file)
            .collect();
        assert_ne!(spans[0], spans[1]);
    }

    #[test]
    fn test_plain_text_map_chunks_long_literals() {
        let m = model("abcdefgh");
        let groups = m.plain_text_map(3);
        assert_eq!(groups[0].chunks, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_header_hash_tracks_shape() {
        let a = parse_str("@args (String name)\n@name", "a.ori.html").unwrap();
        let same = parse_str("@args (String name)\nDIFFERENT BODY @name", "b.ori.html").unwrap();
        assert_eq!(a.header_hash(), same.header_hash());

        let renamed = parse_str("@args (String title)\n@title", "a.ori.html").unwrap();
        assert_ne!(a.header_hash(), renamed.header_hash());

        let retyped = parse_str("@args (int name)\n@name", "a.ori.html").unwrap();
        assert_ne!(a.header_hash(), retyped.header_hash());

        let raw = parse_str("@args (String name)\n@name", "a.ori.txt").unwrap();
        assert_ne!(a.header_hash(), raw.header_hash());
    }

    #[test]
    fn test_body_argument_queries() {
        let m = parse_str("@args (String a, OribeBody body)\nx", "a.ori.html").unwrap();
        assert_eq!(m.body_argument().unwrap().variable.name, "body");
        assert_eq!(m.arguments_without_body().len(), 1);

        let none = parse_str("@args (String a)\nx", "a.ori.html").unwrap();
        assert!(none.body_argument().is_none());
        assert_eq!(none.arguments_without_body().len(), 1);
    }
}
