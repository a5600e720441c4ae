use crate::error::{OribeError, Result};
use crate::source::{SourcePosition, SourceRef};
use crate::token::{Token, TokenKind};

/// Block kinds the lexer tracks while scanning, so it can tell a `}` that
/// closes a logic block from a `}` that is plain text inside markup or a
/// script body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexBlockKind {
    If,
    For,
    With,
    Switch,
    Case,
    Default,
    ValueClosure,
    ContentClosure,
}

#[derive(Debug)]
struct LexBlock {
    kind: LexBlockKind,
    begin: SourcePosition,
    /// Unmatched `{` characters seen as plain text inside this block. The
    /// block's own closing `}` only counts once these are balanced again.
    pending_braces: usize,
}

/// Lexer for tokenizing Oribe template source.
///
/// Plain text and `@` constructs interleave freely; the lexer resolves each
/// construct's full extent (including its opening `{` where it has one) and
/// leaves sub-expression parsing to the model builder.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    blocks: Vec<LexBlock>,
    text: String,
    text_start: SourcePosition,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            blocks: Vec::new(),
            text: String::new(),
            text_start: SourcePosition::new(1, 1, 0),
        }
    }

    /// Tokenize the source and return the token stream.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(c) = self.current_char() {
            match c {
                '@' => {
                    self.flush_text(&mut tokens);
                    self.lex_at(&mut tokens)?;
                }
                '{' => {
                    if let Some(block) = self.blocks.last_mut() {
                        block.pending_braces += 1;
                    }
                    self.push_text_char();
                }
                '}' => match self.blocks.last_mut() {
                    Some(block) if block.pending_braces > 0 => {
                        block.pending_braces -= 1;
                        self.push_text_char();
                    }
                    Some(block) => {
                        let top = block.kind;
                        self.flush_text(&mut tokens);
                        self.lex_block_close(top, &mut tokens)?;
                    }
                    None => self.push_text_char(),
                },
                _ => {
                    if self.at_switch_label() {
                        self.flush_text(&mut tokens);
                        self.lex_switch_label(&mut tokens)?;
                    } else {
                        self.push_text_char();
                    }
                }
            }
        }

        if let Some(block) = self.blocks.last() {
            return Err(self.err_at(
                block.begin,
                "block is never closed, expected '}' before end of template",
            ));
        }

        self.flush_text(&mut tokens);
        let end = self.current_pos();
        tokens.push(Token::new(TokenKind::Eof, SourceRef::new(end, String::new())));
        Ok(tokens)
    }

    // ---- `@` constructs ----------------------------------------------------

    fn lex_at(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        let start = self.current_pos();
        self.advance(); // @

        match self.current_char() {
            Some('@') | Some('{') | Some('}') => {
                let c = self.advance();
                tokens.push(Token::new(TokenKind::Escape(c), self.span_from(start)));
                Ok(())
            }
            Some('*') => self.lex_comment(start, tokens),
            Some('(') => {
                let raw = self.scan_parenthesized(start)?;
                tokens.push(Token::new(TokenKind::EvalExpr(raw), self.span_from(start)));
                Ok(())
            }
            Some('?') => {
                self.advance(); // ?
                let mut expr = String::from("?");
                expr.push_str(&self.scan_expression(start)?);
                tokens.push(Token::new(TokenKind::ValueExpr(expr), self.span_from(start)));
                Ok(())
            }
            Some(c) if is_ident_start(c) => self.lex_at_word(start, tokens),
            Some(c) => Err(self.err_at(
                start,
                &format!("invalid character '{}' after '@'", c),
            )),
            None => Err(self.err_at(start, "template ends with a dangling '@'")),
        }
    }

    fn lex_at_word(&mut self, start: SourcePosition, tokens: &mut Vec<Token>) -> Result<()> {
        if self.match_word("if") {
            self.advance_n(2);
            let cond = self.scan_block_head(start)?;
            self.open_block(LexBlockKind::If, start);
            tokens.push(Token::new(TokenKind::IfBegin(cond), self.span_from(start)));
            return Ok(());
        }
        if self.match_word("for") {
            self.advance_n(3);
            let raw = self.scan_block_head(start)?;
            self.open_block(LexBlockKind::For, start);
            tokens.push(Token::new(TokenKind::ForBegin(raw), self.span_from(start)));
            return Ok(());
        }
        if self.match_word("with") {
            self.advance_n(4);
            let null_safe = self.current_char() == Some('?');
            if null_safe {
                self.advance();
            }
            let raw = self.scan_block_head(start)?;
            self.open_block(LexBlockKind::With, start);
            tokens.push(Token::new(
                TokenKind::WithBegin { raw, null_safe },
                self.span_from(start),
            ));
            return Ok(());
        }
        if self.match_word("switch") {
            self.advance_n(6);
            let raw = self.scan_block_head(start)?;
            self.open_block(LexBlockKind::Switch, start);
            tokens.push(Token::new(TokenKind::SwitchBegin(raw), self.span_from(start)));
            return Ok(());
        }
        if self.match_word("break") {
            self.advance_n(5);
            tokens.push(Token::new(TokenKind::Break, self.span_from(start)));
            return Ok(());
        }
        if self.match_word("continue") {
            self.advance_n(8);
            tokens.push(Token::new(TokenKind::Continue, self.span_from(start)));
            return Ok(());
        }
        if self.match_word("import") {
            self.advance_n(6);
            let rest = self.scan_rest_of_line();
            tokens.push(Token::new(TokenKind::Import(rest), self.span_from(start)));
            return Ok(());
        }
        if self.match_word("option") {
            self.advance_n(6);
            let rest = self.scan_rest_of_line();
            tokens.push(Token::new(TokenKind::OptionDecl(rest), self.span_from(start)));
            return Ok(());
        }
        if self.match_word("args") {
            self.advance_n(4);
            self.skip_whitespace();
            if self.current_char() != Some('(') {
                return Err(self.err_at(start, "expected '(' after @args"));
            }
            let raw = self.scan_parenthesized(start)?;
            tokens.push(Token::new(TokenKind::Args(raw), self.span_from(start)));
            return Ok(());
        }

        // Not a keyword: a value expression, possibly a closure begin.
        let expr = self.scan_expression(start)?;

        if self.match_str("?:") {
            self.advance_n(2);
            let right = self.scan_ternary_fallback(start)?;
            tokens.push(Token::new(
                TokenKind::NullTernary { left: expr, right },
                self.span_from(start),
            ));
            return Ok(());
        }

        if let Some(token) = self.try_closure_marker(start)? {
            tokens.push(token);
            return Ok(());
        }

        tokens.push(Token::new(TokenKind::ValueExpr(expr), self.span_from(start)));
        Ok(())
    }

    /// After a value expression, look for `-> {` or `=> {`. Only commits when
    /// the whole marker including the brace is present; otherwise the
    /// following text is left untouched.
    fn try_closure_marker(&mut self, start: SourcePosition) -> Result<Option<Token>> {
        let saved = self.save();
        self.skip_whitespace();

        let arrow = if self.match_str("->") {
            Some(LexBlockKind::ValueClosure)
        } else if self.match_str("=>") {
            Some(LexBlockKind::ContentClosure)
        } else {
            None
        };
        let Some(kind) = arrow else {
            self.restore(saved);
            return Ok(None);
        };

        self.advance_n(2);
        self.skip_whitespace();
        if self.current_char() != Some('{') {
            self.restore(saved);
            return Ok(None);
        }
        self.advance(); // {
        self.open_block(kind, start);

        // Raw payload keeps the marker and brace; the builder chomps them.
        let span = self.span_from(start);
        let raw = span.text.trim_start_matches('@').to_string();
        let token_kind = match kind {
            LexBlockKind::ValueClosure => TokenKind::ValueClosureBegin(raw),
            _ => TokenKind::ContentClosureBegin(raw),
        };
        Ok(Some(Token::new(token_kind, span)))
    }

    fn lex_comment(&mut self, start: SourcePosition, tokens: &mut Vec<Token>) -> Result<()> {
        self.advance(); // *
        let body_start = self.pos;
        while !self.match_str("*@") {
            if self.current_char().is_none() {
                return Err(self.err_at(start, "comment is never closed, expected '*@'"));
            }
            self.advance();
        }
        let body: String = self.chars[body_start..self.pos].iter().collect();
        self.advance_n(2); // *@
        tokens.push(Token::new(TokenKind::Comment(body), self.span_from(start)));
        Ok(())
    }

    // ---- block close, else, else-if ---------------------------------------

    /// `top` is the kind of the innermost open block, whose `}` this is.
    fn lex_block_close(&mut self, top: LexBlockKind, tokens: &mut Vec<Token>) -> Result<()> {
        let start = self.current_pos();
        self.advance(); // }

        if matches!(top, LexBlockKind::If | LexBlockKind::With) {
            let saved = self.save();
            self.skip_whitespace();
            if self.match_word("else") {
                self.advance_n(4);
                self.skip_whitespace();

                if top == LexBlockKind::If && self.match_word("if") {
                    self.advance_n(2);
                    self.skip_whitespace();
                    if self.current_char() != Some('(') {
                        return Err(self.err_at(start, "expected '(' after 'else if'"));
                    }
                    self.scan_parenthesized(start)?;
                    self.skip_whitespace();
                    if self.current_char() != Some('{') {
                        return Err(self.err_at(start, "expected '{' after 'else if (...)'"));
                    }
                    self.advance(); // {
                    tokens.push(Token::new(TokenKind::ElseIf, self.span_from(start)));
                    return Ok(());
                }

                if self.current_char() == Some('{') {
                    self.advance(); // {
                    tokens.push(Token::new(TokenKind::Else, self.span_from(start)));
                    return Ok(());
                }
            }
            self.restore(saved);
        }

        self.blocks.pop();
        tokens.push(Token::new(TokenKind::RBrace, self.span_from(start)));
        Ok(())
    }

    // ---- switch labels -----------------------------------------------------

    fn at_switch_label(&self) -> bool {
        if self.blocks.last().map(|b| b.kind) != Some(LexBlockKind::Switch) {
            return false;
        }
        if self.pos > 0 && is_ident_continue(self.chars[self.pos - 1]) {
            return false;
        }
        self.match_word("case") || self.match_word("default")
    }

    fn lex_switch_label(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        let start = self.current_pos();
        if self.match_word("case") {
            self.advance_n(4);
            self.skip_whitespace();
            if self.current_char() != Some('(') {
                return Err(self.err_at(start, "expected '(' after 'case'"));
            }
            let raw = self.scan_parenthesized(start)?;
            self.skip_whitespace();
            if self.current_char() != Some('{') {
                return Err(self.err_at(start, "expected '{' after 'case (...)'"));
            }
            self.advance(); // {
            self.open_block(LexBlockKind::Case, start);
            tokens.push(Token::new(TokenKind::CaseBegin(raw), self.span_from(start)));
        } else {
            self.advance_n(7); // default
            self.skip_whitespace();
            if self.current_char() != Some('{') {
                return Err(self.err_at(start, "expected '{' after 'default'"));
            }
            self.advance(); // {
            self.open_block(LexBlockKind::Default, start);
            tokens.push(Token::new(TokenKind::DefaultBegin, self.span_from(start)));
        }
        Ok(())
    }

    // ---- scanning helpers --------------------------------------------------

    /// `(...)` header followed by whitespace and `{`, shared by if/for/with/
    /// switch. Returns the raw parenthesized text, outer parens kept.
    fn scan_block_head(&mut self, start: SourcePosition) -> Result<String> {
        self.skip_whitespace();
        if self.current_char() != Some('(') {
            return Err(self.err_at(start, "expected '(' after block keyword"));
        }
        let raw = self.scan_parenthesized(start)?;
        self.skip_whitespace();
        if self.current_char() != Some('{') {
            return Err(self.err_at(start, "expected '{' to open the block body"));
        }
        self.advance(); // {
        Ok(raw)
    }

    /// Balanced `(...)`, string-literal aware, outer parens included.
    fn scan_parenthesized(&mut self, err_pos: SourcePosition) -> Result<String> {
        let from = self.pos;
        let mut depth = 0usize;
        loop {
            match self.current_char() {
                Some('(') => {
                    depth += 1;
                    self.advance();
                }
                Some(')') => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        break;
                    }
                }
                Some('"') | Some('\'') => self.scan_string_literal(err_pos)?,
                Some(_) => {
                    self.advance();
                }
                None => {
                    return Err(self.err_at(err_pos, "unbalanced '(' before end of template"));
                }
            }
        }
        Ok(self.chars[from..self.pos].iter().collect())
    }

    fn scan_string_literal(&mut self, err_pos: SourcePosition) -> Result<()> {
        let quote = self.advance();
        loop {
            match self.current_char() {
                Some('\\') => {
                    self.advance();
                    if self.current_char().is_some() {
                        self.advance();
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {
                    self.advance();
                }
                None => {
                    return Err(
                        self.err_at(err_pos, "unterminated string literal before end of template")
                    );
                }
            }
        }
    }

    /// An identifier chain: `ident`, `.member`, balanced call and indexer
    /// groups. Stops at the first character that cannot continue the chain.
    fn scan_expression(&mut self, err_pos: SourcePosition) -> Result<String> {
        let from = self.pos;
        match self.current_char() {
            Some(c) if is_ident_start(c) => {}
            _ => return Err(self.err_at(err_pos, "expected an expression after '@'")),
        }
        while matches!(self.current_char(), Some(c) if is_ident_continue(c)) {
            self.advance();
        }
        loop {
            match self.current_char() {
                Some('.') => {
                    // Only a member access when an identifier follows; a
                    // sentence period stays plain text.
                    if matches!(self.peek_char(), Some(c) if is_ident_start(c)) {
                        self.advance();
                        while matches!(self.current_char(), Some(c) if is_ident_continue(c)) {
                            self.advance();
                        }
                    } else {
                        break;
                    }
                }
                Some('(') => {
                    self.scan_parenthesized(err_pos)?;
                }
                Some('[') => {
                    self.scan_bracketed(err_pos)?;
                }
                _ => break,
            }
        }
        Ok(self.chars[from..self.pos].iter().collect())
    }

    fn scan_bracketed(&mut self, err_pos: SourcePosition) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.current_char() {
                Some('[') => {
                    depth += 1;
                    self.advance();
                }
                Some(']') => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('"') | Some('\'') => self.scan_string_literal(err_pos)?,
                Some(_) => {
                    self.advance();
                }
                None => {
                    return Err(self.err_at(err_pos, "unbalanced '[' before end of template"));
                }
            }
        }
    }

    /// Right-hand side of `?:`: an expression chain, or a string/char/number
    /// literal.
    fn scan_ternary_fallback(&mut self, err_pos: SourcePosition) -> Result<String> {
        match self.current_char() {
            Some('"') | Some('\'') => {
                let from = self.pos;
                self.scan_string_literal(err_pos)?;
                Ok(self.chars[from..self.pos].iter().collect())
            }
            Some(c) if c.is_ascii_digit() => {
                let from = self.pos;
                while matches!(self.current_char(), Some(c) if c.is_ascii_alphanumeric() || c == '.' || c == '_')
                {
                    self.advance();
                }
                Ok(self.chars[from..self.pos].iter().collect())
            }
            _ => self.scan_expression(err_pos),
        }
    }

    fn scan_rest_of_line(&mut self) -> String {
        let from = self.pos;
        while !matches!(self.current_char(), Some('\n') | None) {
            self.advance();
        }
        let raw: String = self.chars[from..self.pos].iter().collect();
        raw.trim().to_string()
    }

    // ---- cursor ------------------------------------------------------------

    fn open_block(&mut self, kind: LexBlockKind, begin: SourcePosition) {
        self.blocks.push(LexBlock {
            kind,
            begin,
            pending_braces: 0,
        });
    }

    fn push_text_char(&mut self) {
        if self.text.is_empty() {
            self.text_start = self.current_pos();
        }
        let c = self.advance();
        self.text.push(c);
    }

    fn flush_text(&mut self, tokens: &mut Vec<Token>) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let span = SourceRef::new(self.text_start, text.clone());
        tokens.push(Token::new(TokenKind::Text(text), span));
    }

    fn current_pos(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.col, self.pos)
    }

    fn span_from(&self, start: SourcePosition) -> SourceRef {
        let text: String = self.chars[start.pos_in_file..self.pos].iter().collect();
        SourceRef::new(start, text)
    }

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        c
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current_char(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn match_str(&self, s: &str) -> bool {
        let remaining = &self.chars[self.pos..];
        let mut it = remaining.iter();
        s.chars().all(|a| it.next().is_some_and(|b| a == *b))
    }

    fn match_word(&self, w: &str) -> bool {
        if !self.match_str(w) {
            return false;
        }
        match self.chars.get(self.pos + w.chars().count()) {
            Some(&c) => !is_ident_continue(c),
            None => true,
        }
    }

    fn save(&self) -> (usize, u32, u32) {
        (self.pos, self.line, self.col)
    }

    fn restore(&mut self, saved: (usize, u32, u32)) {
        self.pos = saved.0;
        self.line = saved.1;
        self.col = saved.2;
    }

    fn err_at(&self, position: SourcePosition, message: &str) -> OribeError {
        OribeError::Lexer {
            message: message.to_string(),
            position,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
