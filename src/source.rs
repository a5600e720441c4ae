use serde::Serialize;

use crate::error::{OribeError, Result};

/// A position in the original template source.
///
/// Lines and columns are 1-based to match what editors show; `pos_in_file`
/// is a 0-based character offset (the lexer walks characters, not bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourcePosition {
    pub line: u32,
    pub pos_in_line: u32,
    pub pos_in_file: usize,
}

impl SourcePosition {
    pub fn new(line: u32, pos_in_line: u32, pos_in_file: usize) -> Self {
        Self {
            line,
            pos_in_line,
            pos_in_file,
        }
    }

    /// Advance this position over one character.
    pub fn advanced(self, c: char) -> Self {
        if c == '\n' {
            Self::new(self.line + 1, 1, self.pos_in_file + 1)
        } else {
            Self::new(self.line, self.pos_in_line + 1, self.pos_in_file + 1)
        }
    }
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.pos_in_line)
    }
}

/// The exact span of source text a syntactic construct covers.
///
/// `text` is the covered substring itself, so diagnostics and generated
/// position markers never have to re-read the template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub begin: SourcePosition,
    pub char_length: usize,
    pub text: String,
}

impl SourceRef {
    pub fn new(begin: SourcePosition, text: String) -> Self {
        let char_length = text.chars().count();
        Self {
            begin,
            char_length,
            text,
        }
    }

    /// Character offset one past the end of this span.
    pub fn end_pos_in_file(&self) -> usize {
        self.begin.pos_in_file + self.char_length
    }

    /// Span from the start of `self` to the end of `other`, covering the
    /// concatenated text. The two refs must be contiguous in source order.
    pub fn combine_adjacent(&self, other: &SourceRef) -> Result<SourceRef> {
        if self.end_pos_in_file() != other.begin.pos_in_file {
            return Err(OribeError::Structural {
                message: format!(
                    "cannot combine non-contiguous source spans (offset {} then {})",
                    self.begin.pos_in_file, other.begin.pos_in_file
                ),
                position: other.begin,
            });
        }
        let mut text = String::with_capacity(self.text.len() + other.text.len());
        text.push_str(&self.text);
        text.push_str(&other.text);
        Ok(SourceRef {
            begin: self.begin,
            char_length: self.char_length + other.char_length,
            text,
        })
    }

    /// Drop the first `n` characters, moving `begin` forward over them.
    pub fn chomp_front(&mut self, n: usize) {
        let mut begin = self.begin;
        let mut chars = self.text.chars();
        for _ in 0..n {
            if let Some(c) = chars.next() {
                begin = begin.advanced(c);
            }
        }
        self.text = chars.collect();
        self.begin = begin;
        self.char_length = self.char_length.saturating_sub(n);
    }

    /// Drop the last `n` characters.
    pub fn chomp_back(&mut self, n: usize) {
        let keep = self.char_length.saturating_sub(n);
        self.text = self.text.chars().take(keep).collect();
        self.char_length = keep;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(offset: usize, text: &str) -> SourceRef {
        SourceRef::new(SourcePosition::new(1, offset as u32 + 1, offset), text.to_string())
    }

    #[test]
    fn test_combine_adjacent_spans() {
        let combined = span(0, "hello ").combine_adjacent(&span(6, "world")).unwrap();
        assert_eq!(combined.text, "hello world");
        assert_eq!(combined.char_length, 11);
        assert_eq!(combined.begin.pos_in_file, 0);
    }

    #[test]
    fn test_combine_rejects_gap() {
        let result = span(0, "hello").combine_adjacent(&span(7, "world"));
        assert!(matches!(result, Err(OribeError::Structural { .. })));
    }

    #[test]
    fn test_chomp_front_tracks_lines() {
        let mut s = SourceRef::new(SourcePosition::new(1, 1, 0), "  \n  x".to_string());
        s.chomp_front(3);
        assert_eq!(s.text, "  x");
        assert_eq!(s.begin.line, 2);
        assert_eq!(s.begin.pos_in_line, 1);
        assert_eq!(s.begin.pos_in_file, 3);
        assert_eq!(s.char_length, 3);
    }

    #[test]
    fn test_chomp_back() {
        let mut s = span(0, "abc  ");
        s.chomp_back(2);
        assert_eq!(s.text, "abc");
        assert_eq!(s.char_length, 3);
    }

    #[test]
    fn test_advanced_over_newline() {
        let p = SourcePosition::new(3, 9, 40).advanced('\n');
        assert_eq!(p, SourcePosition::new(4, 1, 41));
    }
}
