use calc_lang::{ReportStyle, Session, Value};

fn printed(session: &mut Session, line: &str) -> Option<String> {
    session.eval_line(line).printed()
}

#[test]
fn assigned_integers_read_back() {
    let mut session = Session::default();
    for n in [0_i64, 1, 42, -7, i64::MAX] {
        // negative literals go through the non-negating unary minus
        let line = format!("a = {n}");
        let outcome = session.eval_line(&line);
        assert!(outcome.diagnostics.is_empty(), "{line}");
        assert_eq!(printed(&mut session, "a"), Some(n.abs().to_string()));
    }
}

#[test]
fn precedence() {
    let mut session = Session::default();
    assert_eq!(printed(&mut session, "2+3*4").as_deref(), Some("14"));
    assert_eq!(printed(&mut session, "(2+3)*4").as_deref(), Some("20"));
}

#[test]
fn associativity() {
    let mut session = Session::default();
    assert_eq!(printed(&mut session, "10-3-2").as_deref(), Some("5"));
    assert_eq!(printed(&mut session, "20/2/5").as_deref(), Some("2"));
    assert_eq!(printed(&mut session, "7/2").as_deref(), Some("3.5"));
}

#[test]
fn undefined_variable_is_reported_and_session_continues() {
    let mut session = Session::default();
    let outcome = session.eval_line("x");
    assert_eq!(outcome.messages(), vec!["Undefined variable 'x' found!"]);
    assert_eq!(outcome.printed().as_deref(), Some("0"));

    assert_eq!(printed(&mut session, "1 + 1").as_deref(), Some("2"));
}

#[test]
fn assignment_prints_nothing() {
    let mut session = Session::default();
    let outcome = session.eval_line("a = 5");
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.value, Some(Value::Text("a".to_string())));
    assert_eq!(outcome.printed(), None);
}

#[test]
fn strings_round_trip() {
    let mut session = Session::default();
    assert_eq!(printed(&mut session, r#"a = "hi""#), None);
    assert_eq!(printed(&mut session, "a").as_deref(), Some(r#""hi""#));
    assert_eq!(printed(&mut session, "b = a"), None);
    assert_eq!(printed(&mut session, "b").as_deref(), Some(r#""hi""#));
}

#[test]
fn one_illegal_character_gives_one_diagnostic() {
    let mut session = Session::default();
    let outcome = session.eval_line("a = 5 # 3");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.messages(), vec!["Illegal character '#'"]);

    assert_eq!(printed(&mut session, "a = 5"), None);
    assert_eq!(printed(&mut session, "a * 2").as_deref(), Some("10"));
}

#[test]
fn unary_minus_does_not_negate() {
    let mut session = Session::default();
    assert_eq!(printed(&mut session, "-5").as_deref(), Some("5"));
    assert_eq!(printed(&mut session, "-(2 - 7)").as_deref(), Some("-5"));
}

#[test]
fn runtime_errors_do_not_end_the_session() {
    let mut session = Session::default();
    session.eval_line(r#"s = "text""#);

    let outcome = session.eval_line("s * 2");
    assert_eq!(
        outcome.messages(),
        vec!["Cannot apply '*' to text and integer"]
    );
    assert_eq!(outcome.printed(), None);

    let outcome = session.eval_line("1 / 0");
    assert_eq!(outcome.messages(), vec!["Division by zero"]);

    assert_eq!(printed(&mut session, "s").as_deref(), Some(r#""text""#));
}

#[test]
fn syntax_errors_abandon_only_their_line() {
    let mut session = Session::default();
    let outcome = session.eval_line("a = (1 + 2");
    assert_eq!(outcome.messages(), vec!["Unclosed '('"]);
    assert!(session.environment().get("a").is_none());

    let outcome = session.eval_line("1 +");
    assert_eq!(outcome.messages(), vec!["Syntax error at end of input"]);

    assert_eq!(printed(&mut session, "a = 3"), None);
    assert_eq!(session.environment().get("a"), Some(&Value::Integer(3)));
}

#[test]
fn comments_and_blank_lines() {
    let mut session = Session::default();
    let outcome = session.eval_line("// nothing to see");
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.value, None);
    assert_eq!(printed(&mut session, "2 * 3 // six").as_deref(), Some("6"));
}

#[test]
fn scripted_run_writes_results_in_order() {
    let script = "a = 7\na = 3+4*8\na\nb = (4+7)*5\nb / 11\nc\n";
    let mut out = Vec::new();
    let mut err = Vec::new();
    Session::new(ReportStyle::Plain)
        .run(script.as_bytes(), &mut out, &mut err)
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "35\n5\n0\n");
    let err = String::from_utf8(err).unwrap();
    assert_eq!(err, "Undefined variable 'c' found!\n");
}
