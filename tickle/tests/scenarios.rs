//! End-to-end behavior of the interpreter, driven through scripts.

use pretty_assertions::assert_eq;
use tickle::builder::{Builder, Substitutor};
use tickle::list::{list_to_string, parse_list};
use tickle::*;

fn eval(interp: &mut Interp<()>, script: &str) -> Result<String, Exception> {
    interp
        .eval(script, &mut ())
        .map(|value| value.as_str().into_owned())
}

/// A substitutor for scripts that must not substitute anything.
struct NoSubst;

impl Substitutor for NoSubst {
    fn resolve(&mut self, name: &str) -> TickleResult {
        panic!("unexpected variable reference ${}", name)
    }

    fn execute(&mut self, script: &str) -> TickleResult {
        panic!("unexpected command substitution [{}]", script)
    }
}

fn build(script: &str) -> Vec<Vec<String>> {
    let mut builder = Builder::new(script);
    let mut commands = Vec::new();
    while let Some(command) = builder.next_command(&mut NoSubst).unwrap() {
        commands.push(
            command
                .words
                .iter()
                .map(|word| word.as_str().into_owned())
                .collect(),
        );
    }
    commands
}

#[test]
fn plain_commands_split_on_whitespace_and_semicolons() {
    let script = "set a 1; puts  hello\nlist x y z\n\n  incr a";
    let naive: Vec<Vec<String>> = script
        .split(['\n', ';'])
        .map(|line| line.split_whitespace().map(String::from).collect::<Vec<_>>())
        .filter(|words| !words.is_empty())
        .collect();
    assert_eq!(build(script), naive);
}

#[test]
fn while_loop_counts_to_three() {
    let mut interp = Interp::new();
    let script = "set n 0; set x 0; while {$x < 3} { set x [expr {$x + 1}]; incr n }; set x";
    assert_eq!(eval(&mut interp, script).unwrap(), "3");
    assert_eq!(eval(&mut interp, "set n").unwrap(), "3");
}

#[test]
fn procedure_adds_its_arguments() {
    let mut interp = Interp::new();
    let script = "proc add {a b} { expr {$a + $b} }; add 2 3";
    assert_eq!(eval(&mut interp, script).unwrap(), "5");
}

#[test]
fn safe_child_refuses_unsafe_commands() {
    let mut interp = Interp::new();
    eval(&mut interp, "interp create child -safe").unwrap();
    assert_eq!(
        eval(&mut interp, "interp eval child {expr {1+1}}").unwrap(),
        "2"
    );

    let exception = eval(&mut interp, "interp eval child {exec ls}").unwrap_err();
    assert_eq!(exception.error_kind(), Some(ErrorKind::UnsafeCommand));

    // The same command is only refused for safety in the child.
    let result = eval(&mut interp, "catch {exec ls} msg; set msg").unwrap();
    assert!(!result.contains("safe interpreter"));
}

#[test]
fn upvar_alias_outlives_the_procedure() {
    let mut interp = Interp::new();
    eval(&mut interp, "proc setter {} { upvar 1 x y; set y assigned }").unwrap();
    eval(&mut interp, "proc caller {} { set x before; setter; return $x }").unwrap();
    assert_eq!(eval(&mut interp, "caller").unwrap(), "assigned");

    eval(&mut interp, "setter").unwrap();
    assert_eq!(eval(&mut interp, "set x").unwrap(), "assigned");
}

#[test]
fn locals_vanish_when_their_frame_pops() {
    let mut interp = Interp::new();
    eval(&mut interp, "proc p {} { set fresh 1 }").unwrap();
    eval(&mut interp, "p").unwrap();
    let exception = eval(&mut interp, "set fresh").unwrap_err();
    assert_eq!(exception.error_kind(), Some(ErrorKind::UndefinedVariable));
}

#[test]
fn integer_division_and_modulo_agree() {
    let mut interp = Interp::new();
    for (a, b) in [(7, 2), (-7, 2), (7, -2), (-7, -2), (0, 5), (12, 4)] {
        let script = format!("expr {{{a} / {b} * {b} + {a} % {b}}}");
        assert_eq!(eval(&mut interp, &script).unwrap(), a.to_string(), "{script}");
    }
}

#[test]
fn lists_survive_reformatting() {
    let text = "a {b c} {} \"d e\" {f {g h}}";
    let list = parse_list(text).unwrap();
    assert_eq!(list.len(), 5);

    let joined = list_to_string(&list);
    assert_eq!(parse_list(&joined).unwrap(), list);
}

#[test]
fn deferred_scripts_run_last_in_first_out() {
    let mut interp = Interp::new();
    let script = "
        set log {}
        proc p {} {
            defer { lappend ::log first }
            defer { lappend ::log second }
            lappend ::log body
        }
        p
        set log";
    assert_eq!(eval(&mut interp, script).unwrap(), "body second first");
}

#[test]
fn deferred_scripts_run_on_error() {
    let mut interp = Interp::new();
    eval(
        &mut interp,
        "set cleaned 0; proc p {} { defer { set ::cleaned 1 }; error boom }",
    )
    .unwrap();
    let exception = eval(&mut interp, "p").unwrap_err();
    assert_eq!(exception.value().as_str(), "boom");
    assert_eq!(eval(&mut interp, "set cleaned").unwrap(), "1");
}

#[test]
fn uplevel_restores_the_frame_stack() {
    let mut interp = Interp::new();
    let script = "
        proc inner {} { uplevel 1 { set seen [info level] }; info level }
        proc outer {} { set depth [inner]; list $depth $seen }
        outer";
    assert_eq!(eval(&mut interp, script).unwrap(), "2 1");
    assert_eq!(interp.depth(), 0);
}

#[test]
fn errors_carry_a_stack_trace() {
    let mut interp = Interp::new();
    eval(&mut interp, "proc fail {} { error oops }").unwrap();
    assert!(eval(&mut interp, "fail").is_err());
    let info = eval(&mut interp, "set errorInfo").unwrap();
    assert!(info.starts_with("oops\n"), "{info}");
    assert!(info.contains("\"fail\""), "{info}");
}
