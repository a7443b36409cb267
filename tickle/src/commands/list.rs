//! List commands.

use super::{concat_values, parse_index};
use crate::interp::Interp;
use crate::types::*;
use crate::{check_args, tickle_opt_ok};
use alloc::string::String;

/// # list ?*arg* ...?
///
/// Returns a list whose elements are the arguments.
pub fn cmd_list<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    tickle_opt_ok!(&argv[1..])
}

/// # llength *list*
pub fn cmd_llength<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 2, "list")?;
    tickle_opt_ok!(argv[1].to_list()?.len())
}

/// # lindex *list* ?*index* ...?
///
/// Each index selects an element of the list selected by the previous one.  An index out
/// of range yields the empty string.
pub fn cmd_lindex<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 0, "list ?index ...?")?;

    let mut value = argv[1].clone();
    for index in &argv[2..] {
        let list = value.to_list()?;
        let i = parse_index(index, list.len())?;
        value = match usize::try_from(i).ok().and_then(|i| list.get(i)) {
            Some(element) => element.clone(),
            None => return tickle_opt_ok!(),
        };
    }

    Ok(Some(value))
}

/// # lappend *varName* ?*value* ...?
///
/// Appends the values to the list in the variable, creating it if need be.
pub fn cmd_lappend<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 0, "varName ?value ...?")?;

    let mut list: TickleList = if interp.var_exists(&argv[1]) {
        interp.var(&argv[1])?.to_list()?.to_vec()
    } else {
        TickleList::new()
    };
    list.extend(argv[2..].iter().cloned());

    interp.set_var_return(&argv[1], Value::from(list)).map(Some)
}

/// # join *list* ?*joinString*?
pub fn cmd_join<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 3, "list ?joinString?")?;

    let list = argv[1].to_list()?;
    let separator = match argv.get(2) {
        Some(separator) => separator.as_str().into_owned(),
        None => String::from(" "),
    };

    let words: alloc::vec::Vec<_> = list.iter().map(|value| value.as_str()).collect();
    tickle_opt_ok!(words.join(&separator))
}

/// # concat ?*arg* ...?
pub fn cmd_concat<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    tickle_opt_ok!(concat_values(&argv[1..]))
}

#[cfg(test)]
mod tests {
    use crate::Interp;
    use pretty_assertions::assert_eq;

    fn eval(interp: &mut Interp<()>, script: &str) -> String {
        match interp.eval(script, &mut ()) {
            Ok(value) => value.as_str().into_owned(),
            Err(exception) => format!("error: {}", exception.value()),
        }
    }

    #[test]
    fn test_list() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "list a {b c} {}"), "a {b c} {}");
        assert_eq!(eval(&mut interp, "llength [list a {b c} {}]"), "3");
        assert_eq!(eval(&mut interp, "llength {}"), "0");
    }

    #[test]
    fn test_lindex() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "lindex {a b c} 1"), "b");
        assert_eq!(eval(&mut interp, "lindex {a b c} end"), "c");
        assert_eq!(eval(&mut interp, "lindex {a b c} 5"), "");
        assert_eq!(eval(&mut interp, "lindex {a b c} -1"), "");
        assert_eq!(eval(&mut interp, "lindex {a {b c}} 1 0"), "b");
        assert_eq!(eval(&mut interp, "lindex {a b}"), "a b");
    }

    #[test]
    fn test_lappend() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "lappend l a; lappend l {b c}"), "a {b c}");
        assert_eq!(eval(&mut interp, "llength $l"), "2");
    }

    #[test]
    fn test_join_and_concat() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "join {a b c} ,"), "a,b,c");
        assert_eq!(eval(&mut interp, "join {a b c}"), "a b c");
        assert_eq!(eval(&mut interp, "concat {a b} { c } {}"), "a b c");
    }

    #[test]
    fn test_round_trip() {
        let mut interp = Interp::new();
        eval(&mut interp, "set l [list {a b} {c\"d} {} x]");
        assert_eq!(eval(&mut interp, "llength $l"), "4");
        assert_eq!(eval(&mut interp, "lindex $l 0"), "a b");
        assert_eq!(eval(&mut interp, "lindex $l 1"), "c\"d");
        assert_eq!(eval(&mut interp, "llength [lindex [list $l] 0]"), "4");
    }
}
