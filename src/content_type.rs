use serde::Serialize;

/// Content class of a template, inferred from the trailing extension of
/// `<name>.ori.<ext>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentType {
    /// Markup-like output (html, xhtml, xml).
    Html,
    /// Raw text output, whitespace-significant.
    Raw,
}

impl ContentType {
    /// Map a trailing file extension to a content type.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" | "xhtml" | "xml" => ContentType::Html,
            _ => ContentType::Raw,
        }
    }

    /// Whether logic-only source lines are dropped from the output by
    /// default. Markup tolerates it; raw text must stay byte-faithful.
    pub fn discard_logic_whitespace_default(self) -> bool {
        match self {
            ContentType::Html => true,
            ContentType::Raw => false,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Html => write!(f, "HTML"),
            ContentType::Raw => write!(f, "RAW"),
        }
    }
}
