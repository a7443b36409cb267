//! The `info` ensemble: introspection of commands, procedures, variables, and frames.

use crate::interp::Interp;
use crate::types::*;
use crate::{check_args, tickle_err, tickle_opt_ok};

/// # info *subcommand* ?*arg* ...?
pub fn cmd_info<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    interp.call_subcommand(
        argv,
        1,
        &[
            Subcommand("args", cmd_info_args),
            Subcommand("body", cmd_info_body),
            Subcommand("cmdcount", cmd_info_cmdcount),
            Subcommand("commands", cmd_info_commands),
            Subcommand("complete", cmd_info_complete),
            Subcommand("default", cmd_info_default),
            Subcommand("exists", cmd_info_exists),
            Subcommand("globals", cmd_info_globals),
            Subcommand("level", cmd_info_level),
            Subcommand("locals", cmd_info_locals),
            Subcommand("procs", cmd_info_procs),
            Subcommand("vars", cmd_info_vars),
        ],
        ctx,
    )
}

/// # info args *procname*
pub fn cmd_info_args<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 3, 3, "procname")?;
    interp.proc_args(&argv[2].as_str()).map(Some)
}

/// # info body *procname*
pub fn cmd_info_body<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 3, 3, "procname")?;
    interp.proc_body(&argv[2].as_str()).map(Some)
}

/// # info cmdcount
pub fn cmd_info_cmdcount<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 2, "")?;
    tickle_opt_ok!(interp.cmd_count())
}

/// # info commands
pub fn cmd_info_commands<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 2, "")?;
    tickle_opt_ok!(interp.command_names())
}

/// # info complete *command*
pub fn cmd_info_complete<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 3, 3, "command")?;
    tickle_opt_ok!(interp.complete(&argv[2].as_str()))
}

/// # info default *procname* *arg* *varname*
///
/// Stores the parameter's default in the variable and returns 1, or returns 0 if the
/// parameter has no default.
pub fn cmd_info_default<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 5, 5, "procname arg varname")?;

    match interp.proc_default(&argv[2].as_str(), &argv[3].as_str())? {
        Some(default) => {
            interp.set_var(&argv[4], default)?;
            tickle_opt_ok!(true)
        }
        None => {
            interp.set_var(&argv[4], Value::empty())?;
            tickle_opt_ok!(false)
        }
    }
}

/// # info exists *varName*
pub fn cmd_info_exists<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 3, 3, "varName")?;
    tickle_opt_ok!(interp.var_exists(&argv[2]))
}

/// # info globals
pub fn cmd_info_globals<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 2, "")?;
    tickle_opt_ok!(interp.vars_in_global_scope())
}

/// # info level ?*number*?
///
/// With no argument, returns the current frame depth.  Otherwise returns the command
/// that created frame *number*; zero or a negative number counts back from the current
/// frame.
pub fn cmd_info_level<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 2, 3, "?number?")?;

    let depth = interp.depth();
    let number = match argv.get(2) {
        Some(number) => number.to_int()?,
        None => return tickle_opt_ok!(depth),
    };

    let level = if number > 0 {
        usize::try_from(number).ok()
    } else {
        usize::try_from(-number).ok().and_then(|back| depth.checked_sub(back))
    };

    match level.and_then(|level| interp.level_command(level)) {
        Some(command) => Ok(Some(command)),
        None => tickle_err!("bad level \"{}\"", argv[2]),
    }
}

/// # info locals
pub fn cmd_info_locals<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 2, "")?;
    tickle_opt_ok!(interp.vars_in_local_scope())
}

/// # info procs
pub fn cmd_info_procs<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 2, 2, "")?;
    tickle_opt_ok!(interp.proc_names())
}

/// # info vars
pub fn cmd_info_vars<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 2, 2, "")?;
    tickle_opt_ok!(interp.vars_in_scope())
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
    fn test_info_procs() {
        let mut interp = Interp::new();
        eval(&mut interp, "proc p {a {b two}} { return $a }");
        assert_eq!(eval(&mut interp, "info args p"), "a b");
        assert_eq!(eval(&mut interp, "info body p"), " return $a ");
        assert_eq!(eval(&mut interp, "info default p b d"), "1");
        assert_eq!(eval(&mut interp, "set d"), "two");
        assert_eq!(eval(&mut interp, "info default p a d"), "0");
        assert_eq!(eval(&mut interp, "info procs"), "p");
        assert_eq!(eval(&mut interp, "info body set"), "error: \"set\" isn't a procedure");
    }

    #[test]
    fn test_info_vars() {
        let mut interp = Interp::new();
        eval(&mut interp, "set a 1; set b 2");
        assert_eq!(eval(&mut interp, "info exists a"), "1");
        assert_eq!(eval(&mut interp, "info exists zz"), "0");
        assert_eq!(eval(&mut interp, "info locals"), "");
        eval(&mut interp, "proc p {x} { global a; set y 1; info locals }");
        assert_eq!(eval(&mut interp, "p 0"), "x y");
        eval(&mut interp, "proc q {x} { info vars }");
        assert_eq!(eval(&mut interp, "q 0"), "x");
        assert!(eval(&mut interp, "info globals").contains("errorInfo"));
    }

    #[test]
    fn test_info_level() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "info level"), "0");
        eval(&mut interp, "proc p {args} { info level 0 }");
        assert_eq!(eval(&mut interp, "p a b"), "p a b");
        eval(&mut interp, "proc outer {} { inner }; proc inner {} { info level 1 }");
        assert_eq!(eval(&mut interp, "outer"), "outer");
        assert_eq!(eval(&mut interp, "info level 5"), "error: bad level \"5\"");
    }

    #[test]
    fn test_info_commands() {
        let mut interp = Interp::new();
        let before: usize = eval(&mut interp, "info cmdcount").parse().unwrap();
        eval(&mut interp, "set a 1");
        let after: usize = eval(&mut interp, "info cmdcount").parse().unwrap();
        assert_eq!(after - before, 2);

        assert!(eval(&mut interp, "info commands").split(' ').any(|name| name == "while"));
        assert_eq!(eval(&mut interp, "info complete \"set a \\{\""), "0");
        assert_eq!(eval(&mut interp, "info complete {set a b}"), "1");
    }
}
