use serde::Serialize;

/// Minimum Java language level the generated code may rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum JavaVersion {
    Java7,
    Java8,
    Java11,
    Java17,
}

impl JavaVersion {
    /// Untyped `for`/`with` bindings lean on inference helpers that need
    /// Java 8 or later.
    pub fn supports_untyped_bindings(self) -> bool {
        self >= JavaVersion::Java8
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "7" | "1.7" => Some(JavaVersion::Java7),
            "8" | "1.8" => Some(JavaVersion::Java8),
            "11" => Some(JavaVersion::Java11),
            "17" => Some(JavaVersion::Java17),
            _ => None,
        }
    }
}

impl Default for JavaVersion {
    fn default() -> Self {
        JavaVersion::Java8
    }
}

/// Resolved parser options for one template.
///
/// The embedding build layer merges project configuration before calling the
/// parser; in-template `@option` statements then override on a per-parse
/// copy via [`Options::set`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Options {
    /// Remove source lines that contain nothing but control-flow syntax.
    /// `None` defers to the content type's default.
    pub discard_logic_whitespace: Option<bool>,
    /// Merge adjacent plain-text units after building the model.
    pub combine_adjacent_plain_text: bool,
    pub java_version: JavaVersion,
    /// Charset the generated source declares for its literals.
    pub target_charset: String,
    /// Class the generated template type extends, when overridden.
    pub extends_class: Option<String>,
    /// Class the generated model type extends, when overridden.
    pub extends_model_class: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            discard_logic_whitespace: None,
            combine_adjacent_plain_text: true,
            java_version: JavaVersion::default(),
            target_charset: "UTF-8".to_string(),
            extends_class: None,
            extends_model_class: None,
        }
    }
}

impl Options {
    /// Apply one `@option name=value` statement. Returns a message on
    /// unknown keys or malformed values; the builder turns that into a
    /// token-format error at the statement's position.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        match name.trim() {
            "discardLogicWhitespace" => {
                self.discard_logic_whitespace = Some(parse_bool(value)?);
            }
            "combineAdjacentPlainText" => {
                self.combine_adjacent_plain_text = parse_bool(value)?;
            }
            "javaVersion" => {
                self.java_version = JavaVersion::parse(value)
                    .ok_or_else(|| format!("unsupported javaVersion '{}'", value))?;
            }
            "targetCharset" => {
                if value.is_empty() {
                    return Err("targetCharset must not be empty".to_string());
                }
                self.target_charset = value.to_string();
            }
            "extendsClass" => {
                if value.is_empty() {
                    return Err("extendsClass must not be empty".to_string());
                }
                self.extends_class = Some(value.to_string());
            }
            "extendsModelClass" => {
                if value.is_empty() {
                    return Err("extendsModelClass must not be empty".to_string());
                }
                self.extends_model_class = Some(value.to_string());
            }
            other => {
                return Err(format!("unknown option '{}'", other));
            }
        }
        Ok(())
    }

    /// Split a raw `name=value` statement body and apply it.
    pub fn set_statement(&mut self, statement: &str) -> Result<(), String> {
        match statement.split_once('=') {
            Some((name, value)) => self.set(name, value),
            None => Err(format!("option statement '{}' is missing '='", statement.trim())),
        }
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected 'true' or 'false', got '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(opts.discard_logic_whitespace, None);
        assert!(opts.combine_adjacent_plain_text);
        assert_eq!(opts.java_version, JavaVersion::Java8);
        assert_eq!(opts.target_charset, "UTF-8");
    }

    #[test]
    fn test_set_every_supported_key() {
        let mut opts = Options::default();
        opts.set("discardLogicWhitespace", "true").unwrap();
        opts.set("combineAdjacentPlainText", "false").unwrap();
        opts.set("javaVersion", "11").unwrap();
        opts.set("targetCharset", "ISO-8859-1").unwrap();
        opts.set("extendsClass", "com.acme.PageTemplate").unwrap();
        opts.set("extendsModelClass", "com.acme.PageModel").unwrap();

        assert_eq!(opts.discard_logic_whitespace, Some(true));
        assert!(!opts.combine_adjacent_plain_text);
        assert_eq!(opts.java_version, JavaVersion::Java11);
        assert_eq!(opts.target_charset, "ISO-8859-1");
        assert_eq!(opts.extends_class.as_deref(), Some("com.acme.PageTemplate"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut opts = Options::default();
        assert!(opts.set("optimise", "true").is_err());
    }

    #[test]
    fn test_malformed_bool_rejected() {
        let mut opts = Options::default();
        assert!(opts.set("discardLogicWhitespace", "yes").is_err());
    }

    #[test]
    fn test_empty_class_names_rejected() {
        let mut opts = Options::default();
        assert!(opts.set("extendsClass", "").is_err());
        assert!(opts.set("extendsModelClass", "").is_err());
        assert!(opts.set_statement("extendsClass=").is_err());
        assert_eq!(opts.extends_class, None);
        assert_eq!(opts.extends_model_class, None);
    }

    #[test]
    fn test_set_statement_splits_on_equals() {
        let mut opts = Options::default();
        opts.set_statement("javaVersion=1.8").unwrap();
        assert_eq!(opts.java_version, JavaVersion::Java8);
        assert!(opts.set_statement("javaVersion").is_err());
    }

    #[test]
    fn test_java_version_ordering() {
        assert!(JavaVersion::Java7 < JavaVersion::Java8);
        assert!(!JavaVersion::Java7.supports_untyped_bindings());
        assert!(JavaVersion::Java17.supports_untyped_bindings());
    }
}
