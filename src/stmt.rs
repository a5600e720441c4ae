//! Mini-parsers for the Java-flavored headers embedded in Oribe constructs:
//! argument declarations, `@for` headers and `@with` headers. These operate
//! on the raw parenthesized text captured by the lexer; any failure is a
//! token-format error at the enclosing construct's position.

use serde::Serialize;

use crate::error::{OribeError, Result};
use crate::options::JavaVersion;
use crate::source::SourcePosition;

/// A Java variable declaration, typed or inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JavaVariable {
    /// Declared type, `None` when the binding relies on inference.
    pub type_name: Option<String>,
    pub name: String,
}

impl JavaVariable {
    /// Parse `Map<String, Integer> byName`, `String[] parts`, or a bare
    /// `name`. Splitting type from name balances angle and square brackets.
    pub fn parse(decl: &str, position: SourcePosition) -> Result<Self> {
        let decl = decl.trim();
        if decl.is_empty() {
            return Err(token_err("empty variable declaration", position));
        }

        let mut angle = 0i32;
        let mut square = 0i32;
        let mut split_at = None;
        for (i, c) in decl.char_indices() {
            match c {
                '<' => angle += 1,
                '>' => angle -= 1,
                '[' => square += 1,
                ']' => square -= 1,
                c if c.is_whitespace() && angle == 0 && square == 0 => {
                    split_at = Some(i);
                }
                _ => {}
            }
        }
        if angle != 0 || square != 0 {
            return Err(token_err(
                &format!("unbalanced brackets in variable declaration '{}'", decl),
                position,
            ));
        }

        let (type_name, name) = match split_at {
            Some(i) => (Some(decl[..i].trim().to_string()), decl[i..].trim()),
            None => (None, decl),
        };

        if !is_valid_java_identifier(name) {
            return Err(token_err(
                &format!("invalid variable name '{}'", name),
                position,
            ));
        }

        Ok(Self {
            type_name,
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for JavaVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.type_name {
            Some(t) => write!(f, "{} {}", t, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The two Java `for` header shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForForm {
    /// `init; test; increment` — carried through verbatim.
    General,
    /// `bindings : expression` with 1 to 3 bindings.
    Enhanced,
}

/// Parsed `@for (...)` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForStatement {
    pub form: ForForm,
    pub arguments: Vec<JavaVariable>,
    pub value_expression: String,
}

impl ForStatement {
    /// Parse the raw parenthesized header of a `@for` block.
    pub fn parse(raw: &str, java_version: JavaVersion, position: SourcePosition) -> Result<Self> {
        let inner = strip_outer_parens(raw);

        if find_top_level(inner, ';').is_some() {
            return Ok(Self {
                form: ForForm::General,
                arguments: Vec::new(),
                value_expression: inner.trim().to_string(),
            });
        }

        let Some(colon) = find_enhanced_separator(inner) else {
            return Err(token_err(
                &format!("for statement '{}' is neither general (;) nor enhanced (:) form", inner.trim()),
                position,
            ));
        };

        let left = strip_outer_parens(inner[..colon].trim());
        let value_expression = inner[colon + 1..].trim().to_string();
        if value_expression.is_empty() {
            return Err(token_err("for statement has no value expression", position));
        }

        let mut arguments = Vec::new();
        for part in split_top_level(left, ',') {
            arguments.push(JavaVariable::parse(part, position)?);
        }
        if arguments.is_empty() || arguments.len() > 3 {
            return Err(token_err(
                &format!(
                    "enhanced for supports 1 to 3 arguments, found {}",
                    arguments.len()
                ),
                position,
            ));
        }
        check_untyped(&arguments, java_version, "for", position)?;

        Ok(Self {
            form: ForForm::Enhanced,
            arguments,
            value_expression,
        })
    }
}

/// Parsed `@with (...)` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithStatement {
    /// Ordered `(variable, value expression)` bindings.
    pub variables: Vec<(JavaVariable, String)>,
    pub null_safe: bool,
}

impl WithStatement {
    /// Parse the raw parenthesized header of a `@with` / `@with?` block.
    pub fn parse(
        raw: &str,
        null_safe: bool,
        java_version: JavaVersion,
        position: SourcePosition,
    ) -> Result<Self> {
        let inner = strip_outer_parens(raw);

        let mut variables = Vec::new();
        for binding in split_top_level(inner, ',') {
            let Some(eq) = find_assignment(binding) else {
                return Err(token_err(
                    &format!("with binding '{}' is missing '='", binding.trim()),
                    position,
                ));
            };
            let var = JavaVariable::parse(&binding[..eq], position)?;
            let value = binding[eq + 1..].trim().to_string();
            if value.is_empty() {
                return Err(token_err(
                    &format!("with binding '{}' has no value expression", var.name),
                    position,
                ));
            }
            variables.push((var, value));
        }

        if variables.is_empty() {
            return Err(token_err("with statement has no bindings", position));
        }
        if null_safe && variables.len() != 1 {
            return Err(token_err(
                &format!(
                    "null-safe with requires exactly one binding, found {}",
                    variables.len()
                ),
                position,
            ));
        }
        let untyped: Vec<JavaVariable> = variables.iter().map(|(v, _)| v.clone()).collect();
        check_untyped(&untyped, java_version, "with", position)?;

        Ok(Self {
            variables,
            null_safe,
        })
    }
}

fn check_untyped(
    vars: &[JavaVariable],
    java_version: JavaVersion,
    construct: &str,
    position: SourcePosition,
) -> Result<()> {
    if java_version.supports_untyped_bindings() {
        return Ok(());
    }
    if let Some(var) = vars.iter().find(|v| v.type_name.is_none()) {
        return Err(token_err(
            &format!(
                "untyped {} binding '{}' requires Java 8 or later",
                construct, var.name
            ),
            position,
        ));
    }
    Ok(())
}

fn token_err(message: &str, position: SourcePosition) -> OribeError {
    OribeError::Token {
        message: message.to_string(),
        position,
    }
}

fn is_valid_java_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Strip one pair of parentheses when they wrap the whole string.
pub(crate) fn strip_outer_parens(s: &str) -> &str {
    let s = s.trim();
    if !(s.starts_with('(') && s.ends_with(')')) {
        return s;
    }
    // The first paren must match the last one, not an earlier close.
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != s.len() - 1 {
                    return s;
                }
            }
            _ => {}
        }
    }
    s[1..s.len() - 1].trim()
}

/// Depth tracker over parens, angle brackets, square brackets and string
/// literals. Angle depth is unreliable when the text contains comparison
/// operators, so scans that come up unbalanced retry without it.
struct DepthScan {
    paren: i32,
    angle: i32,
    square: i32,
    track_angles: bool,
    in_string: Option<char>,
    escaped: bool,
}

impl DepthScan {
    fn new(track_angles: bool) -> Self {
        Self {
            paren: 0,
            angle: 0,
            square: 0,
            track_angles,
            in_string: None,
            escaped: false,
        }
    }

    fn step(&mut self, c: char) {
        if let Some(quote) = self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == quote {
                self.in_string = None;
            }
            return;
        }
        match c {
            '"' | '\'' => self.in_string = Some(c),
            '(' => self.paren += 1,
            ')' => self.paren -= 1,
            '[' => self.square += 1,
            ']' => self.square -= 1,
            '<' if self.track_angles => self.angle += 1,
            '>' if self.track_angles => self.angle -= 1,
            _ => {}
        }
    }

    fn at_top_level(&self) -> bool {
        self.paren == 0 && self.angle == 0 && self.square == 0 && self.in_string.is_none()
    }
}

pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    for track_angles in [true, false] {
        let mut parts = Vec::new();
        let mut scan = DepthScan::new(track_angles);
        let mut start = 0;
        for (i, c) in s.char_indices() {
            if c == sep && scan.at_top_level() {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            } else {
                scan.step(c);
            }
        }
        if scan.at_top_level() {
            parts.push(&s[start..]);
            return parts;
        }
    }
    vec![s]
}

fn find_top_level(s: &str, target: char) -> Option<usize> {
    for track_angles in [true, false] {
        let mut scan = DepthScan::new(track_angles);
        let mut found = None;
        for (i, c) in s.char_indices() {
            if c == target && scan.at_top_level() && found.is_none() {
                found = Some(i);
            }
            scan.step(c);
        }
        if scan.at_top_level() {
            return found;
        }
    }
    None
}

/// First top-level `:` that is not half of a `::` method reference.
fn find_enhanced_separator(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut scan = DepthScan::new(true);
    for (i, c) in s.char_indices() {
        if c == ':' && scan.at_top_level() {
            let part_of_double = (i > 0 && bytes[i - 1] == b':')
                || bytes.get(i + 1).copied() == Some(b':');
            if !part_of_double {
                return Some(i);
            }
        }
        scan.step(c);
    }
    None
}

/// First top-level `=` that is an assignment, not `==`, `<=`, `>=`, `!=` or
/// `=>`.
fn find_assignment(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut scan = DepthScan::new(false);
    for (i, c) in s.char_indices() {
        if c == '=' && scan.at_top_level() {
            let prev = i.checked_sub(1).map(|p| bytes[p]);
            let next = bytes.get(i + 1).copied();
            let comparison = matches!(prev, Some(b'=') | Some(b'!') | Some(b'<') | Some(b'>'))
                || matches!(next, Some(b'=') | Some(b'>'));
            if !comparison {
                return Some(i);
            }
        }
        scan.step(c);
    }
    None
}
