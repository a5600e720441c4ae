use serde::Serialize;

use crate::source::SourceRef;
use crate::stmt::{ForStatement, WithStatement};

/// A run of literal template text.
///
/// `text` is what the template renders; `span.text` is the exact source it
/// came from. The two differ once escape sequences (`@@`, `@{`, `@}`) are
/// merged in, so the chomp operations keep both in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainText {
    pub text: String,
    pub span: SourceRef,
}

impl PlainText {
    pub fn new(text: String, span: SourceRef) -> Self {
        Self { text, span }
    }

    pub fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters of the whitespace run that ends the text,
    /// measured back to the start of its final line. `None` when that line
    /// carries non-whitespace content.
    pub fn trailing_whitespace_to_line_start(&self) -> Option<usize> {
        let tail: &str = match self.text.rfind('\n') {
            Some(i) => &self.text[i + 1..],
            None => &self.text,
        };
        if tail.chars().all(|c| c == ' ' || c == '\t' || c == '\r') {
            Some(tail.chars().count())
        } else {
            None
        }
    }

    /// Length in characters of the whitespace run that opens the text,
    /// measured forward to the end of its first line and including the
    /// newline itself. `None` when that line carries non-whitespace content.
    pub fn leading_whitespace_to_line_end(&self) -> Option<usize> {
        match self.text.find('\n') {
            Some(i) => {
                let head = &self.text[..i];
                if head.chars().all(|c| c == ' ' || c == '\t' || c == '\r') {
                    Some(head.chars().count() + 1)
                } else {
                    None
                }
            }
            None => {
                if self.text.chars().all(char::is_whitespace) {
                    Some(self.text.chars().count())
                } else {
                    None
                }
            }
        }
    }

    /// Remove the first line when it is entirely whitespace, newline
    /// included. A first line with content is left untouched, so a header
    /// statement followed by literal text on the same line keeps its text.
    pub fn chomp_leading_whitespace_to_end_of_line(&mut self) {
        if let Some(i) = self.text.find('\n') {
            if self.text[..i]
                .chars()
                .all(|c| c == ' ' || c == '\t' || c == '\r')
            {
                self.chomp_front(self.text[..i].chars().count() + 1);
            }
        }
    }

    /// Drop the first `n` characters from both the rendered text and the
    /// covered span. Only ever applied to whitespace runs, where the two
    /// are guaranteed to coincide.
    pub fn chomp_front(&mut self, n: usize) {
        self.text = self.text.chars().skip(n).collect();
        self.span.chomp_front(n);
    }

    /// Drop the last `n` characters from both the rendered text and the
    /// covered span.
    pub fn chomp_back(&mut self, n: usize) {
        let keep = self.text.chars().count().saturating_sub(n);
        self.text = self.text.chars().take(keep).collect();
        self.span.chomp_back(n);
    }
}

/// Discriminant for [`TemplateUnit`] queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitKind {
    Comment,
    PlainText,
    ValueExpression,
    NullTernaryExpression,
    EvalExpression,
    ValueClosureBegin,
    ValueClosureEnd,
    ContentClosureBegin,
    ContentClosureEnd,
    IfBlockBegin,
    IfBlockElseIf,
    IfBlockElse,
    IfBlockEnd,
    ForBlockBegin,
    ForBlockEnd,
    WithBlockBegin,
    WithBlockElse,
    WithBlockEnd,
    SwitchBlockBegin,
    SwitchBlockEnd,
    SwitchCaseBlockBegin,
    SwitchCaseBlockEnd,
    SwitchDefaultBlockBegin,
    SwitchDefaultBlockEnd,
    BreakStatement,
    ContinueStatement,
}

/// One node in the ordered intermediate representation of a parsed
/// template. Unit order is render order; the generator walks the sequence
/// front to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TemplateUnit {
    Comment {
        text: String,
        span: SourceRef,
    },
    PlainText(PlainText),
    ValueExpression {
        expression: String,
        null_safe: bool,
        span: SourceRef,
    },
    NullTernaryExpression {
        left: String,
        right: String,
        span: SourceRef,
    },
    EvalExpression {
        expression: String,
        span: SourceRef,
    },
    ValueClosureBegin {
        expression: String,
        span: SourceRef,
    },
    ValueClosureEnd {
        span: SourceRef,
    },
    ContentClosureBegin {
        identifier: String,
        span: SourceRef,
    },
    ContentClosureEnd {
        span: SourceRef,
    },
    IfBlockBegin {
        expression: String,
        span: SourceRef,
    },
    IfBlockElseIf {
        expression: String,
        span: SourceRef,
    },
    IfBlockElse {
        span: SourceRef,
    },
    IfBlockEnd {
        span: SourceRef,
    },
    ForBlockBegin {
        raw: String,
        statement: ForStatement,
        span: SourceRef,
    },
    ForBlockEnd {
        span: SourceRef,
    },
    WithBlockBegin {
        raw: String,
        statement: WithStatement,
        span: SourceRef,
    },
    WithBlockElse {
        span: SourceRef,
    },
    WithBlockEnd {
        span: SourceRef,
    },
    SwitchBlockBegin {
        expression: String,
        span: SourceRef,
    },
    SwitchBlockEnd {
        span: SourceRef,
    },
    SwitchCaseBlockBegin {
        expression: String,
        span: SourceRef,
    },
    SwitchCaseBlockEnd {
        span: SourceRef,
    },
    SwitchDefaultBlockBegin {
        span: SourceRef,
    },
    SwitchDefaultBlockEnd {
        span: SourceRef,
    },
    BreakStatement {
        span: SourceRef,
    },
    ContinueStatement {
        span: SourceRef,
    },
}

impl TemplateUnit {
    pub fn kind(&self) -> UnitKind {
        match self {
            TemplateUnit::Comment { .. } => UnitKind::Comment,
            TemplateUnit::PlainText(_) => UnitKind::PlainText,
            TemplateUnit::ValueExpression { .. } => UnitKind::ValueExpression,
            TemplateUnit::NullTernaryExpression { .. } => UnitKind::NullTernaryExpression,
            TemplateUnit::EvalExpression { .. } => UnitKind::EvalExpression,
            TemplateUnit::ValueClosureBegin { .. } => UnitKind::ValueClosureBegin,
            TemplateUnit::ValueClosureEnd { .. } => UnitKind::ValueClosureEnd,
            TemplateUnit::ContentClosureBegin { .. } => UnitKind::ContentClosureBegin,
            TemplateUnit::ContentClosureEnd { .. } => UnitKind::ContentClosureEnd,
            TemplateUnit::IfBlockBegin { .. } => UnitKind::IfBlockBegin,
            TemplateUnit::IfBlockElseIf { .. } => UnitKind::IfBlockElseIf,
            TemplateUnit::IfBlockElse { .. } => UnitKind::IfBlockElse,
            TemplateUnit::IfBlockEnd { .. } => UnitKind::IfBlockEnd,
            TemplateUnit::ForBlockBegin { .. } => UnitKind::ForBlockBegin,
            TemplateUnit::ForBlockEnd { .. } => UnitKind::ForBlockEnd,
            TemplateUnit::WithBlockBegin { .. } => UnitKind::WithBlockBegin,
            TemplateUnit::WithBlockElse { .. } => UnitKind::WithBlockElse,
            TemplateUnit::WithBlockEnd { .. } => UnitKind::WithBlockEnd,
            TemplateUnit::SwitchBlockBegin { .. } => UnitKind::SwitchBlockBegin,
            TemplateUnit::SwitchBlockEnd { .. } => UnitKind::SwitchBlockEnd,
            TemplateUnit::SwitchCaseBlockBegin { .. } => UnitKind::SwitchCaseBlockBegin,
            TemplateUnit::SwitchCaseBlockEnd { .. } => UnitKind::SwitchCaseBlockEnd,
            TemplateUnit::SwitchDefaultBlockBegin { .. } => UnitKind::SwitchDefaultBlockBegin,
            TemplateUnit::SwitchDefaultBlockEnd { .. } => UnitKind::SwitchDefaultBlockEnd,
            TemplateUnit::BreakStatement { .. } => UnitKind::BreakStatement,
            TemplateUnit::ContinueStatement { .. } => UnitKind::ContinueStatement,
        }
    }

    /// True for control-structure markers; false for content-bearing units
    /// (plain text, expressions, comments).
    pub fn is_block_level(&self) -> bool {
        !matches!(
            self,
            TemplateUnit::Comment { .. }
                | TemplateUnit::PlainText(_)
                | TemplateUnit::ValueExpression { .. }
                | TemplateUnit::NullTernaryExpression { .. }
                | TemplateUnit::EvalExpression { .. }
        )
    }

    pub fn span(&self) -> &SourceRef {
        match self {
            TemplateUnit::Comment { span, .. }
            | TemplateUnit::ValueExpression { span, .. }
            | TemplateUnit::NullTernaryExpression { span, .. }
            | TemplateUnit::EvalExpression { span, .. }
            | TemplateUnit::ValueClosureBegin { span, .. }
            | TemplateUnit::ValueClosureEnd { span }
            | TemplateUnit::ContentClosureBegin { span, .. }
            | TemplateUnit::ContentClosureEnd { span }
            | TemplateUnit::IfBlockBegin { span, .. }
            | TemplateUnit::IfBlockElseIf { span, .. }
            | TemplateUnit::IfBlockElse { span }
            | TemplateUnit::IfBlockEnd { span }
            | TemplateUnit::ForBlockBegin { span, .. }
            | TemplateUnit::ForBlockEnd { span }
            | TemplateUnit::WithBlockBegin { span, .. }
            | TemplateUnit::WithBlockElse { span }
            | TemplateUnit::WithBlockEnd { span }
            | TemplateUnit::SwitchBlockBegin { span, .. }
            | TemplateUnit::SwitchBlockEnd { span }
            | TemplateUnit::SwitchCaseBlockBegin { span, .. }
            | TemplateUnit::SwitchCaseBlockEnd { span }
            | TemplateUnit::SwitchDefaultBlockBegin { span }
            | TemplateUnit::SwitchDefaultBlockEnd { span }
            | TemplateUnit::BreakStatement { span }
            | TemplateUnit::ContinueStatement { span } => span,
            TemplateUnit::PlainText(text) => &text.span,
        }
    }

    /// Borrow this unit as plain text, if it is one.
    pub fn as_plain_text(&self) -> Option<&PlainText> {
        match self {
            TemplateUnit::PlainText(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_plain_text_mut(&mut self) -> Option<&mut PlainText> {
        match self {
            TemplateUnit::PlainText(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourcePosition;

    fn plain(text: &str) -> PlainText {
        PlainText::new(
            text.to_string(),
            SourceRef::new(SourcePosition::new(1, 1, 0), text.to_string()),
        )
    }

    #[test]
    fn test_trailing_whitespace_to_line_start() {
        assert_eq!(plain("text\n  ").trailing_whitespace_to_line_start(), Some(2));
        assert_eq!(plain("text\n").trailing_whitespace_to_line_start(), Some(0));
        assert_eq!(plain("text\n  x ").trailing_whitespace_to_line_start(), None);
        assert_eq!(plain("   ").trailing_whitespace_to_line_start(), Some(3));
        assert_eq!(plain("text").trailing_whitespace_to_line_start(), None);
    }

    #[test]
    fn test_leading_whitespace_to_line_end() {
        assert_eq!(plain("  \nrest").leading_whitespace_to_line_end(), Some(3));
        assert_eq!(plain("\nrest").leading_whitespace_to_line_end(), Some(1));
        assert_eq!(plain("  x\nrest").leading_whitespace_to_line_end(), None);
        assert_eq!(plain("   ").leading_whitespace_to_line_end(), Some(3));
        assert_eq!(plain("x").leading_whitespace_to_line_end(), None);
    }

    #[test]
    fn test_chomp_leading_whitespace_to_end_of_line() {
        let mut p = plain("  \n  <html>");
        p.chomp_leading_whitespace_to_end_of_line();
        assert_eq!(p.text, "  <html>");
        assert_eq!(p.span.begin.line, 2);

        let mut same_line = plain("content\nmore");
        same_line.chomp_leading_whitespace_to_end_of_line();
        assert_eq!(same_line.text, "content\nmore");
    }

    #[test]
    fn test_chomp_keeps_span_in_step() {
        let mut p = plain("  tail  ");
        p.chomp_front(2);
        p.chomp_back(2);
        assert_eq!(p.text, "tail");
        assert_eq!(p.span.text, "tail");
        assert_eq!(p.span.begin.pos_in_file, 2);
        assert_eq!(p.span.char_length, 4);
    }

    #[test]
    fn test_block_level_flags() {
        let span = SourceRef::new(SourcePosition::new(1, 1, 0), "@break".to_string());
        assert!(TemplateUnit::BreakStatement { span: span.clone() }.is_block_level());
        assert!(TemplateUnit::IfBlockEnd { span: span.clone() }.is_block_level());
        assert!(TemplateUnit::ValueClosureBegin {
            expression: "f()".to_string(),
            span: span.clone()
        }
        .is_block_level());
        assert!(!TemplateUnit::ValueExpression {
            expression: "name".to_string(),
            null_safe: false,
            span: span.clone()
        }
        .is_block_level());
        assert!(!TemplateUnit::PlainText(plain("x")).is_block_level());
        assert!(!TemplateUnit::Comment {
            text: "note".to_string(),
            span
        }
        .is_block_level());
    }
}
