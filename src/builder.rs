//! Turns the token stream into the ordered template unit sequence,
//! enforcing the language rules the lexer cannot express: header ordering,
//! break/continue scoping, with/else legality and switch body shape.

use crate::error::{OribeError, Result};
use crate::model::{Argument, BODY_TYPE_NAME};
use crate::options::Options;
use crate::source::{SourcePosition, SourceRef};
use crate::stmt::{self, ForStatement, JavaVariable, WithStatement};
use crate::token::{Token, TokenKind};
use crate::unit::{PlainText, TemplateUnit};

/// A block the builder has entered and not yet closed. The lexer's generic
/// `}` token closes whichever of these is innermost.
#[derive(Debug)]
enum OpenBlock {
    If,
    For,
    With(WithStatement),
    Switch,
    Case,
    Default,
    ValueClosure,
    ContentClosure,
}

/// What the builder hands back: everything the model needs beyond the
/// template's identity metadata.
#[derive(Debug)]
pub struct BuiltTemplate {
    pub units: Vec<TemplateUnit>,
    pub imports: Vec<String>,
    pub arguments: Vec<Argument>,
    /// The caller's options with in-template `@option` overrides applied.
    pub options: Options,
}

/// Builds the unit sequence for one template.
///
/// Scope questions (am I inside a for loop, which with statement does this
/// else belong to) are answered from stacks maintained as units are
/// appended, never by re-scanning the unit list.
pub struct ModelBuilder {
    options: Options,
    units: Vec<TemplateUnit>,
    imports: Vec<String>,
    arguments: Vec<Argument>,
    args_declared: bool,
    blocks: Vec<OpenBlock>,
    for_depth: usize,
    switch_depth: usize,
}

impl ModelBuilder {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            units: Vec::new(),
            imports: Vec::new(),
            arguments: Vec::new(),
            args_declared: false,
            blocks: Vec::new(),
            for_depth: 0,
            switch_depth: 0,
        }
    }

    pub fn build(mut self, tokens: Vec<Token>) -> Result<BuiltTemplate> {
        for token in tokens {
            self.consume(token)?;
        }
        if !self.blocks.is_empty() {
            return Err(self.structural("block is never closed", last_position(&self.units)));
        }
        Ok(BuiltTemplate {
            units: self.units,
            imports: self.imports,
            arguments: self.arguments,
            options: self.options,
        })
    }

    fn consume(&mut self, token: Token) -> Result<()> {
        let Token { kind, span } = token;
        let position = span.begin;
        match kind {
            TokenKind::Text(text) => {
                self.push_plain_text(PlainText::new(text, span))?;
            }
            TokenKind::Escape(c) => {
                self.push_plain_text(PlainText::new(c.to_string(), span))?;
            }
            TokenKind::Comment(text) => {
                self.units.push(TemplateUnit::Comment { text, span });
            }

            TokenKind::Import(statement) => {
                self.enforce_header("@import")?;
                self.imports.push(statement);
            }
            TokenKind::OptionDecl(statement) => {
                self.enforce_header("@option")?;
                self.options
                    .set_statement(&statement)
                    .map_err(|message| OribeError::Token { message, position })?;
            }
            TokenKind::Args(raw) => {
                self.enforce_header("@args")?;
                if self.args_declared {
                    return Err(self.structural("template arguments are already declared", position));
                }
                self.args_declared = true;
                self.parse_arguments(&raw, &span)?;
            }

            TokenKind::ValueExpr(raw) => {
                let null_safe = raw.starts_with('?');
                let expression = raw.trim_start_matches('?').to_string();
                self.units.push(TemplateUnit::ValueExpression {
                    expression,
                    null_safe,
                    span,
                });
            }
            TokenKind::NullTernary { left, right } => {
                self.units
                    .push(TemplateUnit::NullTernaryExpression { left, right, span });
            }
            TokenKind::EvalExpr(raw) => {
                let expression = stmt::strip_outer_parens(&raw).to_string();
                self.units.push(TemplateUnit::EvalExpression { expression, span });
            }

            TokenKind::IfBegin(raw) => {
                let expression = stmt::strip_outer_parens(&raw).to_string();
                self.blocks.push(OpenBlock::If);
                self.units.push(TemplateUnit::IfBlockBegin { expression, span });
            }
            TokenKind::ElseIf => {
                if !matches!(self.blocks.last(), Some(OpenBlock::If)) {
                    return Err(self.structural("'else if' outside of an if block", position));
                }
                let expression = extract_condition(&span.text)
                    .ok_or_else(|| self.structural("'else if' is missing its condition", position))?;
                self.units.push(TemplateUnit::IfBlockElseIf { expression, span });
            }
            TokenKind::Else => match self.blocks.last() {
                Some(OpenBlock::If) => {
                    self.units.push(TemplateUnit::IfBlockElse { span });
                }
                Some(OpenBlock::With(with)) => {
                    if !(with.null_safe && with.variables.len() == 1) {
                        return Err(self.structural(
                            "an else branch after @with requires a single null-safe binding",
                            position,
                        ));
                    }
                    self.units.push(TemplateUnit::WithBlockElse { span });
                }
                _ => {
                    return Err(self.structural("'else' outside of an if or with block", position));
                }
            },

            TokenKind::ForBegin(raw) => {
                let statement = ForStatement::parse(&raw, self.options.java_version, position)?;
                self.blocks.push(OpenBlock::For);
                self.for_depth += 1;
                self.units.push(TemplateUnit::ForBlockBegin { raw, statement, span });
            }
            TokenKind::WithBegin { raw, null_safe } => {
                let statement =
                    WithStatement::parse(&raw, null_safe, self.options.java_version, position)?;
                self.blocks.push(OpenBlock::With(statement.clone()));
                self.units.push(TemplateUnit::WithBlockBegin { raw, statement, span });
            }
            TokenKind::SwitchBegin(raw) => {
                let expression = stmt::strip_outer_parens(&raw).to_string();
                self.blocks.push(OpenBlock::Switch);
                self.switch_depth += 1;
                self.units.push(TemplateUnit::SwitchBlockBegin { expression, span });
            }
            TokenKind::CaseBegin(raw) => {
                let expression = stmt::strip_outer_parens(&raw).to_string();
                self.blocks.push(OpenBlock::Case);
                self.units
                    .push(TemplateUnit::SwitchCaseBlockBegin { expression, span });
            }
            TokenKind::DefaultBegin => {
                self.blocks.push(OpenBlock::Default);
                self.units.push(TemplateUnit::SwitchDefaultBlockBegin { span });
            }

            TokenKind::ValueClosureBegin(raw) => {
                let expression = chomp_closure_marker(&raw, "->");
                self.blocks.push(OpenBlock::ValueClosure);
                self.units.push(TemplateUnit::ValueClosureBegin { expression, span });
            }
            TokenKind::ContentClosureBegin(raw) => {
                let identifier = chomp_closure_marker(&raw, "=>");
                self.blocks.push(OpenBlock::ContentClosure);
                self.units
                    .push(TemplateUnit::ContentClosureBegin { identifier, span });
            }

            TokenKind::RBrace => {
                let Some(block) = self.blocks.pop() else {
                    return Err(self.structural("unmatched '}'", position));
                };
                let end = match block {
                    OpenBlock::If => TemplateUnit::IfBlockEnd { span },
                    OpenBlock::For => {
                        self.for_depth -= 1;
                        TemplateUnit::ForBlockEnd { span }
                    }
                    OpenBlock::With(_) => TemplateUnit::WithBlockEnd { span },
                    OpenBlock::Switch => {
                        self.switch_depth -= 1;
                        TemplateUnit::SwitchBlockEnd { span }
                    }
                    OpenBlock::Case => TemplateUnit::SwitchCaseBlockEnd { span },
                    OpenBlock::Default => TemplateUnit::SwitchDefaultBlockEnd { span },
                    OpenBlock::ValueClosure => TemplateUnit::ValueClosureEnd { span },
                    OpenBlock::ContentClosure => TemplateUnit::ContentClosureEnd { span },
                };
                self.units.push(end);
            }

            TokenKind::Break => {
                if self.for_depth == 0 && self.switch_depth == 0 {
                    return Err(self.structural(
                        "@break is only allowed inside a for or switch block",
                        position,
                    ));
                }
                self.units.push(TemplateUnit::BreakStatement { span });
            }
            TokenKind::Continue => {
                if self.for_depth == 0 {
                    return Err(
                        self.structural("@continue is only allowed inside a for block", position)
                    );
                }
                self.units.push(TemplateUnit::ContinueStatement { span });
            }

            TokenKind::Eof => {}
        }
        Ok(())
    }

    /// Plain text directly inside a switch body (outside any case/default)
    /// must be whitespace, and whitespace there is dropped.
    fn push_plain_text(&mut self, text: PlainText) -> Result<()> {
        if matches!(self.blocks.last(), Some(OpenBlock::Switch)) {
            if text.is_whitespace() {
                return Ok(());
            }
            return Err(self.structural(
                "only 'case' and 'default' may appear directly inside a switch block",
                text.span.begin,
            ));
        }
        self.units.push(TemplateUnit::PlainText(text));
        Ok(())
    }

    /// Header statements must come before any template content. Comments and
    /// whitespace-only text are tolerated; the whitespace is dropped so the
    /// model starts clean.
    fn enforce_header(&mut self, what: &str) -> Result<()> {
        for unit in &self.units {
            let tolerated = match unit {
                TemplateUnit::Comment { .. } => true,
                TemplateUnit::PlainText(text) => text.is_whitespace(),
                _ => false,
            };
            if !tolerated {
                return Err(self.structural(
                    &format!("{} must appear before any template content", what),
                    unit.span().begin,
                ));
            }
        }
        self.units
            .retain(|u| u.as_plain_text().map_or(true, |text| !text.is_whitespace()));
        Ok(())
    }

    fn parse_arguments(&mut self, raw: &str, span: &SourceRef) -> Result<()> {
        let position = span.begin;
        let inner = stmt::strip_outer_parens(raw);
        if inner.trim().is_empty() {
            return Ok(());
        }
        let mut arguments = Vec::new();
        for part in stmt::split_top_level(inner, ',') {
            let variable = JavaVariable::parse(part, position)?;
            if variable.type_name.is_none() {
                return Err(OribeError::Token {
                    message: format!("template argument '{}' must declare a type", variable.name),
                    position,
                });
            }
            arguments.push(Argument {
                variable,
                span: span.clone(),
            });
        }
        if let Some(i) = arguments.iter().position(Argument::is_body) {
            if i + 1 != arguments.len() {
                return Err(self.structural(
                    &format!(
                        "{} argument '{}' must be the last argument",
                        BODY_TYPE_NAME, arguments[i].variable.name
                    ),
                    position,
                ));
            }
        }
        self.arguments = arguments;
        Ok(())
    }

    fn structural(&self, message: &str, position: SourcePosition) -> OribeError {
        OribeError::Structural {
            message: message.to_string(),
            position,
        }
    }
}

/// Condition of a raw `} else if (...) {` span: the text between the first
/// `(` and the last `)`, with that outer pair removed. Found by position,
/// not prefix stripping, since the whitespace around the keywords varies.
fn extract_condition(text: &str) -> Option<String> {
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    if close < open {
        return None;
    }
    Some(stmt::strip_outer_parens(&text[open..=close]).to_string())
}

/// Strip the trailing `-> {` / `=> {` marker from a closure begin payload.
fn chomp_closure_marker(raw: &str, marker: &str) -> String {
    let mut s = raw.trim_end();
    if let Some(rest) = s.strip_suffix('{') {
        s = rest.trim_end();
    }
    if let Some(rest) = s.strip_suffix(marker) {
        s = rest.trim_end();
    }
    s.to_string()
}

fn last_position(units: &[TemplateUnit]) -> SourcePosition {
    units
        .last()
        .map(|u| u.span().begin)
        .unwrap_or(SourcePosition::new(1, 1, 0))
}
