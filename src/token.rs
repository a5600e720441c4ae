use crate::source::SourceRef;

/// Token kinds produced by the Oribe lexer.
///
/// Tokens are construct-shaped: the lexer resolves where each `@` construct
/// begins and ends (the context-sensitive part), while the model builder
/// does the remaining sub-expression work on the raw payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Raw template text, rendered exactly as written.
    Text(String),
    /// An escape sequence (`@@`, `@{`, `@}`); the payload is the rendered
    /// character, the span covers the two-character source sequence.
    Escape(char),
    /// Contents of a `@* ... *@` comment.
    Comment(String),

    /// Rest-of-line payload of an `@import` statement, trimmed.
    Import(String),
    /// Rest-of-line payload of an `@option` statement, trimmed.
    OptionDecl(String),
    /// Parenthesized argument list of an `@args` statement, outer parens kept.
    Args(String),

    /// A value expression. A leading `?` (null-safe marker) is preserved for
    /// the builder to strip.
    ValueExpr(String),
    /// A `left?:right` null-ternary expression. The two sides are carried
    /// separately; the left side may itself contain `?:` inside a string
    /// literal, so the marker position is only known here.
    NullTernary { left: String, right: String },
    /// A parenthesized `@(...)` eval expression, outer parens kept.
    EvalExpr(String),

    /// `@if (...) {` with the parenthesized condition as payload.
    IfBegin(String),
    /// `} else if (...) {`; the condition lives in the span text and is
    /// extracted by the builder.
    ElseIf,
    /// `} else {`, following either an if or a with block.
    Else,
    /// `@for (...) {`, raw parenthesized header.
    ForBegin(String),
    /// `@with (...) {` or `@with? (...) {`, raw parenthesized header.
    WithBegin { raw: String, null_safe: bool },
    /// `@switch (...) {`, raw parenthesized selector.
    SwitchBegin(String),
    /// `case (...) {` directly inside a switch body.
    CaseBegin(String),
    /// `default {` directly inside a switch body.
    DefaultBegin,

    /// `@expr(...) -> {`; payload keeps the trailing arrow marker and brace
    /// for the builder to chomp.
    ValueClosureBegin(String),
    /// `@name => {`; payload keeps the trailing marker for the builder.
    ContentClosureBegin(String),

    /// A `}` that closes the innermost open block.
    RBrace,

    /// `@break`
    Break,
    /// `@continue`
    Continue,

    /// End of template.
    Eof,
}

/// A token with its covered source span.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceRef,
}

impl Token {
    pub fn new(kind: TokenKind, span: SourceRef) -> Self {
        Self { kind, span }
    }
}
