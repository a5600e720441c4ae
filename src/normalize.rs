//! The two in-place passes that run over the unit sequence after building:
//! merging adjacent plain text and discarding logic-only whitespace.

use crate::error::Result;
use crate::unit::{PlainText, TemplateUnit, UnitKind};

/// Merge every pair of adjacent plain-text units into one, combining their
/// spans. After a merge the same index is re-checked, so a run of any
/// length collapses in a single scan; a second run is a no-op.
pub fn combine_adjacent_plain_text(units: &mut Vec<TemplateUnit>) -> Result<()> {
    let mut i = 0;
    while i + 1 < units.len() {
        if units[i].as_plain_text().is_some() && units[i + 1].as_plain_text().is_some() {
            if let TemplateUnit::PlainText(next) = units.remove(i + 1) {
                if let Some(current) = units[i].as_plain_text_mut() {
                    current.span = current.span.combine_adjacent(&next.span)?;
                    current.text.push_str(&next.text);
                }
            }
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Remove whitespace that exists only to lay out control-flow syntax, so
/// rendered output is not riddled with blank lines where the logic was.
///
/// Phase one trims whitespace-only text from the front of the template and
/// chomps the leading whitespace line off the first real content. Text
/// inside a content closure is left alone, since that content renders
/// wherever the closure is invoked.
///
/// Phase two elides source lines holding nothing but a block marker: when a
/// block-level unit's predecessor ends in whitespace back to its line start
/// and its successor (if any) starts with whitespace through its line end,
/// both runs are chomped. Only the immediate neighbors are inspected, so a
/// line carrying several markers separated by text is left as written.
pub fn discard_logic_whitespace(units: &mut Vec<TemplateUnit>) {
    chomp_leading(units);
    elide_block_lines(units);
    units.retain(|u| u.as_plain_text().map_or(true, |text| !text.is_empty()));
}

fn chomp_leading(units: &mut Vec<TemplateUnit>) {
    let mut inside_content_closure = false;
    let mut i = 0;
    while i < units.len() {
        let kind = units[i].kind();
        if kind == UnitKind::ContentClosureBegin {
            inside_content_closure = true;
            i += 1;
            continue;
        }
        if kind == UnitKind::ContentClosureEnd {
            inside_content_closure = false;
            i += 1;
            continue;
        }
        if units[i].is_block_level() || kind == UnitKind::Comment {
            i += 1;
            continue;
        }
        if kind != UnitKind::PlainText {
            // An expression is real content; leading cleanup ends here.
            break;
        }
        if inside_content_closure {
            i += 1;
            continue;
        }
        if units[i].as_plain_text().is_some_and(PlainText::is_whitespace) {
            units.remove(i);
        } else {
            if let Some(text) = units[i].as_plain_text_mut() {
                text.chomp_leading_whitespace_to_end_of_line();
            }
            break;
        }
    }
}

fn elide_block_lines(units: &mut [TemplateUnit]) {
    let mut i = 0;
    while i < units.len() {
        if !units[i].is_block_level() {
            i += 1;
            continue;
        }

        let trailing = i
            .checked_sub(1)
            .and_then(|p| units[p].as_plain_text())
            .and_then(|text| text.trailing_whitespace_to_line_start());
        let Some(trailing) = trailing else {
            i += 1;
            continue;
        };

        let leading = if i + 1 == units.len() {
            Some(0)
        } else {
            units[i + 1]
                .as_plain_text()
                .and_then(|text| text.leading_whitespace_to_line_end())
        };
        let Some(leading) = leading else {
            i += 1;
            continue;
        };

        if let Some(text) = units[i - 1].as_plain_text_mut() {
            text.chomp_back(trailing);
        }
        if leading > 0 {
            if let Some(text) = units[i + 1].as_plain_text_mut() {
                text.chomp_front(leading);
            }
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourcePosition, SourceRef};
    use crate::unit::{PlainText, UnitKind};

    fn plain_at(offset: usize, text: &str) -> TemplateUnit {
        TemplateUnit::PlainText(PlainText::new(
            text.to_string(),
            SourceRef::new(
                SourcePosition::new(1, offset as u32 + 1, offset),
                text.to_string(),
            ),
        ))
    }

    fn marker_at(offset: usize, text: &str) -> TemplateUnit {
        TemplateUnit::IfBlockEnd {
            span: SourceRef::new(
                SourcePosition::new(1, offset as u32 + 1, offset),
                text.to_string(),
            ),
        }
    }

    fn texts(units: &[TemplateUnit]) -> Vec<&str> {
        units
            .iter()
            .filter_map(|u| u.as_plain_text())
            .map(|t| t.text.as_str())
            .collect()
    }

    #[test]
    fn test_combine_merges_runs() {
        let mut units = vec![plain_at(0, "a"), plain_at(1, "b"), plain_at(2, "c")];
        combine_adjacent_plain_text(&mut units).unwrap();
        assert_eq!(units.len(), 1);
        let merged = units[0].as_plain_text().unwrap();
        assert_eq!(merged.text, "abc");
        assert_eq!(merged.span.char_length, 3);
    }

    #[test]
    fn test_combine_is_idempotent() {
        let mut units = vec![plain_at(0, "ab"), plain_at(2, "cd")];
        combine_adjacent_plain_text(&mut units).unwrap();
        let once = units.clone();
        combine_adjacent_plain_text(&mut units).unwrap();
        assert_eq!(units, once);
    }

    #[test]
    fn test_combine_stops_at_other_units() {
        let mut units = vec![plain_at(0, "a"), marker_at(1, "}"), plain_at(2, "b")];
        combine_adjacent_plain_text(&mut units).unwrap();
        assert_eq!(units.len(), 3);
    }

    #[test]
    fn test_combine_rejects_gap() {
        let mut units = vec![plain_at(0, "a"), plain_at(5, "b")];
        assert!(combine_adjacent_plain_text(&mut units).is_err());
    }

    #[test]
    fn test_leading_whitespace_trimmed() {
        // "   \n" then content whose first line is whitespace.
        let mut units = vec![plain_at(0, "   \n"), plain_at(4, "  \n<html>")];
        discard_logic_whitespace(&mut units);
        assert_eq!(texts(&units), vec!["<html>"]);
    }

    #[test]
    fn test_block_only_line_elided() {
        // Text ending in "\n", a marker, then "\nrest": the marker sits on
        // a line of its own, which disappears entirely.
        let mut units = vec![plain_at(0, "a\n"), marker_at(2, "}"), plain_at(3, "\nrest")];
        discard_logic_whitespace(&mut units);
        assert_eq!(texts(&units), vec!["a\n", "rest"]);
    }

    #[test]
    fn test_marker_at_end_of_sequence() {
        let mut units = vec![plain_at(0, "a\n  "), marker_at(4, "}")];
        discard_logic_whitespace(&mut units);
        assert_eq!(texts(&units), vec!["a\n"]);
    }

    #[test]
    fn test_mixed_line_left_alone() {
        // Predecessor line carries content before the marker, nothing to do.
        let mut units = vec![plain_at(0, "a "), marker_at(2, "}"), plain_at(3, " b")];
        discard_logic_whitespace(&mut units);
        assert_eq!(texts(&units), vec!["a ", " b"]);
    }

    #[test]
    fn test_empty_plain_text_cleaned_up() {
        let mut units = vec![plain_at(0, "a\n"), marker_at(2, "}"), plain_at(3, "\n")];
        discard_logic_whitespace(&mut units);
        assert_eq!(units.iter().filter(|u| u.as_plain_text().is_some()).count(), 1);
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn test_content_closure_body_exempt_from_leading_trim() {
        let begin = TemplateUnit::ContentClosureBegin {
            identifier: "body".to_string(),
            span: SourceRef::new(SourcePosition::new(1, 1, 0), "@body => {".to_string()),
        };
        let inner = plain_at(10, "   ");
        let end = TemplateUnit::ContentClosureEnd {
            span: SourceRef::new(SourcePosition::new(1, 14, 13), "}".to_string()),
        };
        let mut units = vec![begin, inner, end, plain_at(14, "  \nx")];
        discard_logic_whitespace(&mut units);
        // The closure's whitespace body survives phase one.
        assert_eq!(units[1].as_plain_text().unwrap().text, "   ");
        assert_eq!(units[0].kind(), UnitKind::ContentClosureBegin);
    }
}
