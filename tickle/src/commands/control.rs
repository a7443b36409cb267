//! Variables, control flow, and procedures.

use super::{concat_values, script_arg};
use crate::interp::Interp;
use crate::types::*;
use crate::util::{is_level, parse_level};
use crate::{check_args, tickle_err, tickle_opt_ok};
use alloc::string::String;
use alloc::vec;

/// # set *varName* ?*newValue*?
///
/// Sets variable *varName* to *newValue*, returning the value.  If *newValue* is omitted,
/// returns the variable's current value, or an error if the variable doesn't exist.
pub fn cmd_set<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 3, "varName ?newValue?")?;

    if argv.len() == 3 {
        interp.set_var_return(&argv[1], argv[2].clone()).map(Some)
    } else {
        interp.var(&argv[1]).map(Some)
    }
}

/// # unset ?-nocomplain? ?--? ?*varName* ...?
pub fn cmd_unset<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 1, 0, "?-nocomplain? ?--? ?varName varName ...?")?;

    let mut names = &argv[1..];
    let mut complain = true;

    if names.first().is_some_and(|arg| arg.as_str() == "-nocomplain") {
        complain = false;
        names = &names[1..];
    }
    if names.first().is_some_and(|arg| arg.as_str() == "--") {
        names = &names[1..];
    }

    for name in names {
        if let Err(exception) = interp.unset_var(name) {
            if complain {
                return Err(exception);
            }
        }
    }

    tickle_opt_ok!()
}

/// # incr *varName* ?*increment*?
///
/// Increments an integer variable, creating it with the value of the increment if it
/// doesn't exist.
pub fn cmd_incr<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 3, "varName ?increment?")?;

    let increment = match argv.get(2) {
        Some(value) => value.to_int()?,
        None => 1,
    };

    let current = if interp.var_exists(&argv[1]) {
        interp.var(&argv[1])?.to_int()?
    } else {
        0
    };

    match current.checked_add(increment) {
        Some(sum) => interp.set_var_return(&argv[1], Value::from(sum)).map(Some),
        None => tickle_err!("integer overflow"),
    }
}

/// # append *varName* ?*value* ...?
pub fn cmd_append<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 0, "varName ?value value ...?")?;

    let mut text = if interp.var_exists(&argv[1]) {
        interp.var(&argv[1])?.as_str().into_owned()
    } else {
        String::new()
    };

    for value in &argv[2..] {
        text.push_str(&value.as_str());
    }

    interp.set_var_return(&argv[1], Value::from(text)).map(Some)
}

/// # eval *arg* ?*arg* ...?
///
/// Concatenates the arguments and evaluates the result as a script in the current frame.
pub fn cmd_eval<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 0, "arg ?arg ...?")?;
    interp.eval_value(&script_arg(&argv[1..]), ctx).map(Some)
}

/// # expr *arg* ?*arg* ...?
#[cfg(feature = "expr")]
pub fn cmd_expr<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 0, "arg ?arg ...?")?;
    interp.expr(&script_arg(&argv[1..]), ctx).map(Some)
}

/// # if *expr1* ?then? *body1* elseif *expr2* ?then? *body2* ... ?else? ?*bodyN*?
pub fn cmd_if<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    let mut argi = 1;

    loop {
        let condition = match argv.get(argi) {
            Some(condition) => condition,
            None => {
                return tickle_err!(
                    "wrong # args: no expression after \"{}\" argument",
                    argv[argi - 1]
                )
            }
        };
        argi += 1;

        if argv.get(argi).is_some_and(|word| word.as_str() == "then") {
            argi += 1;
        }

        let body = match argv.get(argi) {
            Some(body) => body,
            None => {
                return tickle_err!(
                    "wrong # args: no script following \"{}\" argument",
                    argv[argi - 1]
                )
            }
        };

        if interp.expr_bool(condition, ctx)? {
            return interp.eval_value(body, ctx).map(Some);
        }
        argi += 1;

        match argv.get(argi).map(|word| word.as_str()) {
            None => return tickle_opt_ok!(),
            Some(word) if word == "elseif" => argi += 1,
            Some(word) => {
                if word == "else" {
                    argi += 1;
                }
                return match &argv[argi..] {
                    [body] => interp.eval_value(body, ctx).map(Some),
                    [] => tickle_err!("wrong # args: no script following \"else\" argument"),
                    _ => tickle_err!(
                        "wrong # args: extra words after \"else\" clause in \"if\" command"
                    ),
                };
            }
        }
    }
}

/// Runs one iteration of a loop body.  Returns false if the loop should stop.
fn loop_body<Ctx>(interp: &mut Interp<Ctx>, body: &Value, ctx: &mut Ctx) -> Result<bool, Exception> {
    match interp.eval_value(body, ctx) {
        Ok(_) => Ok(true),
        Err(exception) => match exception.code() {
            ResultCode::Break => Ok(false),
            ResultCode::Continue => Ok(true),
            _ => Err(exception),
        },
    }
}

/// # while *test* *command*
pub fn cmd_while<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 3, 3, "test command")?;

    while interp.expr_bool(&argv[1], ctx)? {
        if !loop_body(interp, &argv[2], ctx)? {
            break;
        }
    }

    tickle_opt_ok!()
}

/// # for *start* *test* *next* *command*
pub fn cmd_for<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 5, 5, "start test next command")?;

    interp.eval_value(&argv[1], ctx)?;

    while interp.expr_bool(&argv[2], ctx)? {
        if !loop_body(interp, &argv[4], ctx)? {
            break;
        }
        interp.eval_value(&argv[3], ctx)?;
    }

    tickle_opt_ok!()
}

/// # foreach *varList* *list* *body*
///
/// Each iteration assigns the next elements of *list* to the variables in *varList*.
/// Variables left over at the end of the list are set to the empty string.
pub fn cmd_foreach<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    ctx: &mut Ctx,
) -> TickleOptResult {
    check_args(1, argv, 4, 4, "varList list body")?;

    let var_list = argv[1].to_list()?;
    let list = argv[2].to_list()?;

    if var_list.is_empty() {
        return tickle_err!("foreach varlist is empty");
    }

    for chunk in list.chunks(var_list.len()) {
        for (i, var_name) in var_list.iter().enumerate() {
            let value = chunk.get(i).cloned().unwrap_or_default();
            interp.set_var(var_name, value)?;
        }

        if !loop_body(interp, &argv[3], ctx)? {
            break;
        }
    }

    tickle_opt_ok!()
}

/// # break
pub fn cmd_break<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 1, 1, "")?;
    Err(Exception::tickle_break())
}

/// # continue
pub fn cmd_continue<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 1, 1, "")?;
    Err(Exception::tickle_continue())
}

/// # return ?-code *code*? ?-level *level*? ?-errorcode *code*? ?-errorinfo *info*? ?*value*?
///
/// Returns from the enclosing procedure.  `-level` says how many procedures up the return
/// takes effect, and `-code` what result code it has there.
pub fn cmd_return<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    let args = &argv[1..];
    let (options, value) = match args.len() % 2 {
        1 => (&args[..args.len() - 1], args[args.len() - 1].clone()),
        _ => (args, Value::empty()),
    };

    let mut code = ResultCode::Okay;
    let mut level: usize = 1;
    let mut error_code = None;
    let mut error_info = None;

    for pair in options.chunks(2) {
        match &*pair[0].as_str() {
            "-code" => code = ResultCode::from_value(&pair[1])?,
            "-level" => {
                level = match usize::try_from(pair[1].to_int()?) {
                    Ok(level) => level,
                    Err(_) => {
                        return tickle_err!(
                            "bad -level value: expected non-negative integer but got \"{}\"",
                            pair[1]
                        )
                    }
                }
            }
            "-errorcode" => error_code = Some(pair[1].clone()),
            "-errorinfo" => error_info = Some(pair[1].clone()),
            option => {
                return tickle_err!(
                    "bad option \"{}\": must be -code, -errorcode, -errorinfo, or -level",
                    option
                )
            }
        }
    }

    if code == ResultCode::Error {
        return Err(Exception::tickle_return_err(value, level, error_code, error_info));
    }

    if level == 0 {
        return match code {
            ResultCode::Okay => Ok(Some(value)),
            ResultCode::Break => Err(Exception::tickle_break()),
            ResultCode::Continue => Err(Exception::tickle_continue()),
            ResultCode::Return => Err(Exception::tickle_return(value)),
            // Takes effect in the caller.
            _ => Err(Exception::tickle_return_ext(value, 1, code)),
        };
    }

    Err(Exception::tickle_return_ext(value, level, code))
}

/// # error *message* ?*errorInfo*? ?*errorCode*?
pub fn cmd_error<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 4, "message ?errorInfo? ?errorCode?")?;

    let error_info = argv.get(2).filter(|info| !info.is_empty()).cloned();
    let error_code = argv.get(3).cloned();

    Err(Exception::tickle_return_err(
        argv[1].clone(),
        0,
        error_code,
        error_info,
    ))
}

/// # catch *script* ?*resultVarName*? ?*optionsVarName*?
///
/// Evaluates the script and returns its result code: 0 for success, 1 for an error, and
/// so on.  The result and the return options go in the named variables.  An `exit` is not
/// caught.
pub fn cmd_catch<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 4, "script ?resultVarName? ?optionsVarName?")?;

    let (code, value, options) = match interp.eval_value(&argv[1], ctx) {
        Ok(value) => (0, value, return_options(None)),
        Err(exception) if matches!(exception.code(), ResultCode::Exit(_)) => {
            return Err(exception)
        }
        Err(exception) => (
            exception.code().as_int(),
            exception.value(),
            return_options(Some(&exception)),
        ),
    };

    if let Some(var_name) = argv.get(2) {
        interp.set_var(var_name, value)?;
    }
    if let Some(var_name) = argv.get(3) {
        interp.set_var(var_name, options)?;
    }

    tickle_opt_ok!(code)
}

/// The return options dictionary for a caught result.
fn return_options(exception: Option<&Exception>) -> Value {
    let (code, level) = match exception {
        None => (0, 0),
        Some(exception) if exception.code() == ResultCode::Return => {
            (exception.next_code().as_int(), exception.level())
        }
        Some(exception) => (exception.code().as_int(), 0),
    };

    let mut options = vec![
        Value::from("-code"),
        Value::from(code),
        Value::from("-level"),
        Value::from(level),
    ];

    if let Some(data) = exception.and_then(|exception| exception.error_data()) {
        options.push(Value::from("-errorcode"));
        options.push(data.error_code());
        options.push(Value::from("-errorinfo"));
        options.push(data.error_info());
    }

    Value::from(options)
}

/// # proc *name* *args* *body*
pub fn cmd_proc<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 4, 4, "name args body")?;
    interp.add_proc(&argv[1].as_str(), &argv[2], &argv[3])?;
    tickle_opt_ok!()
}

/// # rename *oldName* *newName*
pub fn cmd_rename<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 3, 3, "oldName newName")?;
    interp.rename_command(&argv[1].as_str(), &argv[2].as_str())?;
    tickle_opt_ok!()
}

/// # global ?*varName* ...?
pub fn cmd_global<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    for name in &argv[1..] {
        interp.global_var(&name.as_str())?;
    }
    tickle_opt_ok!()
}

/// # upvar ?*level*? *otherVar* *myVar* ?*otherVar* *myVar* ...?
///
/// Makes each *myVar* an alias for *otherVar* in the frame at *level*, which defaults
/// to the caller's frame.
pub fn cmd_upvar<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    const ARGSIG: &str = "?level? otherVar localVar ?otherVar localVar ...?";
    check_args(1, argv, 3, 0, ARGSIG)?;

    let depth = interp.depth();
    let first = argv[1].as_str();
    let (level, pairs) = if is_level(&first) && argv.len() % 2 == 0 {
        (parse_level(&first, depth)?, &argv[2..])
    } else {
        (depth.saturating_sub(1), &argv[1..])
    };

    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(super::wrong_args(argv, 1, ARGSIG));
    }

    for pair in pairs.chunks(2) {
        interp.link_var(level, &pair[0].as_str(), &pair[1].as_str())?;
    }

    tickle_opt_ok!()
}

/// # uplevel ?*level*? *arg* ?*arg* ...?
///
/// Evaluates the concatenated arguments in the frame at *level*, which defaults to the
/// caller's frame.
pub fn cmd_uplevel<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    ctx: &mut Ctx,
) -> TickleOptResult {
    check_args(1, argv, 2, 0, "?level? command ?arg ...?")?;

    let depth = interp.depth();
    let first = argv[1].as_str();
    let (level, args) = if argv.len() > 2 && is_level(&first) {
        (parse_level(&first, depth)?, &argv[2..])
    } else {
        (parse_level("1", depth)?, &argv[1..])
    };

    interp.uplevel(level, &script_arg(args), ctx).map(Some)
}

/// # defer *script*
///
/// Schedules the script to run when the current frame is popped.
pub fn cmd_defer<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 0, "script ?arg ...?")?;
    interp.defer(Value::from(concat_values(&argv[1..])));
    tickle_opt_ok!()
}

/// # exit ?*returnCode*?
pub fn cmd_exit<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 1, 2, "?returnCode?")?;

    let status = match argv.get(1) {
        Some(code) => match i32::try_from(code.to_int()?) {
            Ok(status) => status,
            Err(_) => return tickle_err!("exit code out of range: \"{}\"", code),
        },
        None => 0,
    };

    Err(Exception::tickle_exit(status))
}

/// # time *script* ?*count*?
///
/// Evaluates the script *count* times and reports the mean time per iteration.
pub fn cmd_time<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 3, "script ?count?")?;

    let count = match argv.get(2) {
        Some(count) => count.to_int()?.max(0),
        None => 1,
    };

    let start = std::time::Instant::now();
    for _ in 0..count {
        interp.eval_value(&argv[1], ctx)?;
    }
    let elapsed = start.elapsed().as_micros();

    let average = if count > 0 {
        elapsed / count as u128
    } else {
        0
    };

    tickle_opt_ok!("{} microseconds per iteration", average)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(interp: &mut Interp<()>, script: &str) -> String {
        match interp.eval(script, &mut ()) {
            Ok(value) => value.as_str().into_owned(),
            Err(exception) => format!("error: {}", exception.value()),
        }
    }

    #[test]
    fn test_set_and_unset() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "set a 1"), "1");
        assert_eq!(eval(&mut interp, "set a"), "1");
        assert_eq!(eval(&mut interp, "unset a; info exists a"), "0");
        assert_eq!(
            eval(&mut interp, "unset a"),
            "error: can't unset \"a\": no such variable"
        );
        assert_eq!(eval(&mut interp, "unset -nocomplain a"), "");
        assert_eq!(
            eval(&mut interp, "set"),
            "error: wrong # args: should be \"set varName ?newValue?\""
        );
    }

    #[test]
    fn test_incr_and_append() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "incr n"), "1");
        assert_eq!(eval(&mut interp, "incr n 5"), "6");
        assert_eq!(eval(&mut interp, "incr n -10"), "-4");
        assert_eq!(eval(&mut interp, "append s a b; append s c"), "abc");
        assert!(eval(&mut interp, "set x 1.5; incr x").starts_with("error:"));
    }

    #[test]
    fn test_if() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "if {1} {set a yes}"), "yes");
        assert_eq!(eval(&mut interp, "if {0} {set a yes}"), "");
        assert_eq!(eval(&mut interp, "if {0} then {set a yes} else {set a no}"), "no");
        assert_eq!(
            eval(&mut interp, "if {0} {set a 1} elseif {1} {set a 2} else {set a 3}"),
            "2"
        );
        assert_eq!(eval(&mut interp, "if {0} {set a 1} {set a 4}"), "4");
        assert!(eval(&mut interp, "if {1}").starts_with("error: wrong # args"));
    }

    #[test]
    fn test_loops() {
        let mut interp = Interp::new();
        assert_eq!(
            eval(&mut interp, "set x 0; while {$x < 3} { set x [expr {$x + 1}] }; set x"),
            "3"
        );
        assert_eq!(
            eval(
                &mut interp,
                "set out {}; for {set i 0} {$i < 10} {incr i} {
                    if {$i == 2} continue
                    if {$i == 5} break
                    lappend out $i
                 }; set out"
            ),
            "0 1 3 4"
        );
        assert_eq!(
            eval(&mut interp, "set out {}; foreach {a b} {1 2 3} { lappend out $a-$b }; set out"),
            "1-2 3-"
        );
        assert_eq!(eval(&mut interp, "foreach {} {1} {}"), "error: foreach varlist is empty");
    }

    #[test]
    fn test_return_levels() {
        let mut interp = Interp::new();
        eval(&mut interp, "proc inner {} { return -level 2 deep }");
        eval(&mut interp, "proc outer {} { inner; return shallow }");
        assert_eq!(eval(&mut interp, "outer"), "deep");

        eval(&mut interp, "proc fail {} { return -code error -errorcode {MY CODE} bad }");
        assert_eq!(eval(&mut interp, "fail"), "error: bad");
        assert_eq!(eval(&mut interp, "set errorCode"), "MY CODE");

        assert_eq!(eval(&mut interp, "return -level 0 now"), "now");
        assert!(eval(&mut interp, "return -bogus 1 x").starts_with("error: bad option"));
    }

    #[test]
    fn test_catch() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "catch {set a 1} r"), "0");
        assert_eq!(eval(&mut interp, "set r"), "1");
        assert_eq!(eval(&mut interp, "catch {error boom} r"), "1");
        assert_eq!(eval(&mut interp, "set r"), "boom");
        assert_eq!(eval(&mut interp, "catch {return x} r"), "2");
        assert_eq!(eval(&mut interp, "catch break"), "3");
        assert_eq!(eval(&mut interp, "catch continue"), "4");
        assert_eq!(eval(&mut interp, "catch {error boom info CODE} r opts"), "1");
        assert_eq!(
            eval(&mut interp, "lindex $opts 5"),
            "CODE"
        );

        let result = interp.eval("catch {exit 2}", &mut ());
        assert_eq!(result.unwrap_err().code(), ResultCode::Exit(2));
    }

    #[test]
    fn test_procs() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "proc add {a b} { expr {$a + $b} }; add 2 3"), "5");
        assert_eq!(
            eval(&mut interp, "add 1"),
            "error: wrong # args: should be \"add a b\""
        );
        assert_eq!(eval(&mut interp, "rename add plus; plus 1 1"), "2");
        assert_eq!(
            eval(&mut interp, "proc loop {} { break }; loop"),
            "error: invoked \"break\" outside of a loop"
        );
    }

    #[test]
    fn test_upvar_and_uplevel() {
        let mut interp = Interp::new();
        eval(&mut interp, "proc setter {name} { upvar $name v; set v set }");
        assert_eq!(eval(&mut interp, "setter x; set x"), "set");

        eval(&mut interp, "proc deep {} { upvar #0 top t; set t 1 }");
        eval(&mut interp, "proc caller {} { deep }");
        assert_eq!(eval(&mut interp, "caller; set top"), "1");

        eval(&mut interp, "proc up {} { uplevel { set from_up 1 } }");
        assert_eq!(eval(&mut interp, "up; set from_up"), "1");
        assert!(eval(&mut interp, "uplevel 1 {set a 1}").starts_with("error: bad level"));
        assert!(eval(&mut interp, "proc bad {} { upvar a }; bad").starts_with("error: wrong # args"));
    }

    #[test]
    fn test_global() {
        let mut interp = Interp::new();
        eval(&mut interp, "set counter 0");
        eval(&mut interp, "proc bump {} { global counter; incr counter }");
        assert_eq!(eval(&mut interp, "bump; bump; set counter"), "2");
    }

    #[test]
    fn test_defer() {
        let mut interp = Interp::new();
        eval(&mut interp, "set log {}");
        eval(
            &mut interp,
            "proc work {} { defer lappend ::log first; defer lappend ::log second; return ok }",
        );
        assert_eq!(eval(&mut interp, "work"), "ok");
        assert_eq!(eval(&mut interp, "set log"), "second first");
    }

    #[test]
    fn test_exit() {
        let mut interp = Interp::new();
        let result = interp.eval("exit 4", &mut ());
        assert_eq!(result.unwrap_err().code(), ResultCode::Exit(4));
        assert!(eval(&mut interp, "exit x").starts_with("error:"));
    }

    #[test]
    fn test_time() {
        let mut interp = Interp::new();
        assert!(eval(&mut interp, "time {set a 1} 3").ends_with("microseconds per iteration"));
        assert_eq!(eval(&mut interp, "set a"), "1");
    }

    #[test]
    fn test_eval() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "eval set a 5"), "5");
        assert_eq!(eval(&mut interp, "eval {set b 6}"), "6");
    }
}
