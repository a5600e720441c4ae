//! End-to-end parse tests: template source in, unit sequence and header
//! metadata out.

use pretty_assertions::assert_eq;

use oribe::{parse_str, ForForm, TemplateModel, TemplateUnit, UnitKind};

fn kinds(model: &TemplateModel) -> Vec<UnitKind> {
    model.units().iter().map(|u| u.kind()).collect()
}

/// Every unit's span must cover exactly the source it claims to.
fn assert_round_trip(source: &str, model: &TemplateModel) {
    let chars: Vec<char> = source.chars().collect();
    for unit in model.units() {
        let span = unit.span();
        let begin = span.begin.pos_in_file;
        let covered: String = chars[begin..begin + span.char_length].iter().collect();
        assert_eq!(span.text, covered, "span drifted for {:?}", unit.kind());
    }
}

#[test]
fn basic_substitution() {
    let model = parse_str("<h1>no header with @val</h1>", "t.ori.html").unwrap();
    assert_eq!(
        kinds(&model),
        vec![UnitKind::PlainText, UnitKind::ValueExpression, UnitKind::PlainText]
    );
    assert_eq!(model.plain_text(0).text, "<h1>no header with ");
    assert_eq!(model.plain_text(2).text, "</h1>");
}

#[test]
fn escapes_unescape_but_spans_cover_source() {
    let source = "100% @@twitter and a @}brace@{";
    let model = parse_str(source, "t.ori.txt").unwrap();
    // Adjacent plain texts merge by default, escapes included.
    assert_eq!(kinds(&model), vec![UnitKind::PlainText]);
    assert_eq!(model.plain_text(0).text, "100% @twitter and a }brace{");
    assert_eq!(model.plain_text(0).span.text, source);
    assert_round_trip(source, &model);
}

#[test]
fn combine_can_be_disabled_per_template() {
    let model = parse_str("@option combineAdjacentPlainText=false\na@@b", "t.ori.txt").unwrap();
    let texts: Vec<&str> = model
        .units()
        .iter()
        .filter_map(|u| u.as_plain_text())
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(texts, vec!["\na", "@", "b"]);
}

#[test]
fn full_header_and_body() {
    let source = "\
@import java.util.List
@import static java.util.Locale.ROOT
@option javaVersion=11
@args (String title, List<String> items, OribeBody body)
<ul>
@for (String item : items) {
<li>@item</li>
}
</ul>";
    let model = parse_str(source, "listing.ori.html").unwrap();

    assert_eq!(
        model.imports,
        vec!["java.util.List", "static java.util.Locale.ROOT"]
    );
    assert_eq!(model.options.java_version, oribe::JavaVersion::Java11);
    assert_eq!(model.arguments.len(), 3);
    assert_eq!(model.body_argument().unwrap().variable.name, "body");
    assert_eq!(model.arguments_without_body().len(), 2);

    let for_begin = model.find_unit(UnitKind::ForBlockBegin, 0).unwrap();
    match for_begin {
        TemplateUnit::ForBlockBegin { statement, .. } => {
            assert_eq!(statement.form, ForForm::Enhanced);
            assert_eq!(statement.value_expression, "items");
        }
        other => panic!("expected for begin, got {:?}", other),
    }
    assert_round_trip(source, &model);
}

#[test]
fn for_statement_arities() {
    let two = parse_str("@for (String k, String v : map) {@k=@v}", "t.ori.txt").unwrap();
    match two.find_unit(UnitKind::ForBlockBegin, 0).unwrap() {
        TemplateUnit::ForBlockBegin { statement, .. } => {
            assert_eq!(statement.arguments.len(), 2);
            assert_eq!(statement.arguments[0].to_string(), "String k");
            assert_eq!(statement.arguments[1].to_string(), "String v");
        }
        other => panic!("expected for begin, got {:?}", other),
    }

    let three = parse_str(
        "@for (ForIterator i, String k, String v : map) {x}",
        "t.ori.txt",
    )
    .unwrap();
    match three.find_unit(UnitKind::ForBlockBegin, 0).unwrap() {
        TemplateUnit::ForBlockBegin { statement, .. } => {
            assert_eq!(statement.arguments.len(), 3);
            assert_eq!(statement.arguments[0].type_name.as_deref(), Some("ForIterator"));
        }
        other => panic!("expected for begin, got {:?}", other),
    }
}

#[test]
fn null_safety_and_ternary_sugar() {
    let model = parse_str("@?user.name / @nickname?:\"anon\" / @(count + 1)", "t.ori.txt").unwrap();
    match model.find_unit(UnitKind::ValueExpression, 0).unwrap() {
        TemplateUnit::ValueExpression { expression, null_safe, .. } => {
            assert_eq!(expression, "user.name");
            assert!(*null_safe);
        }
        other => panic!("expected value expression, got {:?}", other),
    }
    match model.find_unit(UnitKind::NullTernaryExpression, 0).unwrap() {
        TemplateUnit::NullTernaryExpression { left, right, .. } => {
            assert_eq!(left, "nickname");
            assert_eq!(right, "\"anon\"");
        }
        other => panic!("expected null ternary, got {:?}", other),
    }
    match model.find_unit(UnitKind::EvalExpression, 0).unwrap() {
        TemplateUnit::EvalExpression { expression, .. } => assert_eq!(expression, "count + 1"),
        other => panic!("expected eval expression, got {:?}", other),
    }
}

#[test]
fn switch_with_break() {
    let source = "@switch (kind) { case (\"a\") {alpha@break} default {other} }";
    let model = parse_str(source, "t.ori.txt").unwrap();
    assert_eq!(
        kinds(&model),
        vec![
            UnitKind::SwitchBlockBegin,
            UnitKind::SwitchCaseBlockBegin,
            UnitKind::PlainText,
            UnitKind::BreakStatement,
            UnitKind::SwitchCaseBlockEnd,
            UnitKind::SwitchDefaultBlockBegin,
            UnitKind::PlainText,
            UnitKind::SwitchDefaultBlockEnd,
            UnitKind::SwitchBlockEnd,
        ]
    );
    assert_round_trip(source, &model);
}

#[test]
fn closures_round_trip() {
    let source = "@frame(\"main\") -> {@content => {inner}}";
    let model = parse_str(source, "t.ori.txt").unwrap();
    assert_eq!(
        kinds(&model),
        vec![
            UnitKind::ValueClosureBegin,
            UnitKind::ContentClosureBegin,
            UnitKind::PlainText,
            UnitKind::ContentClosureEnd,
            UnitKind::ValueClosureEnd,
        ]
    );
    assert_round_trip(source, &model);
}

#[test]
fn header_after_content_fails_with_template_coordinates() {
    let err = parse_str("real content\n@args (String s)\n", "broken.ori.html").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("broken.ori.html"), "got: {}", text);
    assert!(text.contains("line 1"), "got: {}", text);
    let position = err.position().unwrap();
    assert_eq!(position.line, 1);
    assert_eq!(position.pos_in_line, 1);
}

#[test]
fn break_outside_loop_fails_at_its_own_line() {
    let err = parse_str("line one\n@break\n", "t.ori.html").unwrap_err();
    assert_eq!(err.position().unwrap().line, 2);
}

#[test]
fn continue_outside_for_fails() {
    let err = parse_str("@switch(s){ case(1) {@continue} }", "t.ori.html").unwrap_err();
    assert!(err.to_string().contains("@continue"));
}

#[test]
fn with_else_legality() {
    assert!(parse_str("@with? (u = find(id)) {x} else {y}", "t.ori.html").is_ok());
    assert!(parse_str("@with (u = find(id)) {x} else {y}", "t.ori.html").is_err());
    assert!(parse_str("@with (a = x, b = y) {x} else {y}", "t.ori.html").is_err());
}

#[test]
fn parse_is_deterministic() {
    let source = "@args (String s)\n@if(s.isEmpty()){empty} else {@s}\n";
    let a = parse_str(source, "t.ori.html").unwrap();
    let b = parse_str(source, "t.ori.html").unwrap();
    assert_eq!(a.units(), b.units());
    assert_eq!(a.header_hash(), b.header_hash());
}

#[test]
fn model_serializes_for_the_generator() {
    let model = parse_str("@args (String name)\nHello @name", "t.ori.html").unwrap();
    let dump = serde_json::to_value(&model).unwrap();
    assert_eq!(dump["name"], "t");
    assert_eq!(dump["content_type"], serde_json::to_value(oribe::ContentType::Html).unwrap());
    assert!(dump["units"].as_array().unwrap().len() >= 2);
}
