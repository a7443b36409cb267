//! The `interp` ensemble: creating and driving child interpreters.
//!
//! Paths name descendants of the current interpreter, either as a list (`{a b}`) or with
//! `::` or `.` separators (`a::b`, `a.b`).  The empty path is the current interpreter.

use super::script_arg;
use crate::interp::{parse_child_path, Interp};
use crate::types::*;
use crate::{check_args, tickle_err, tickle_opt_ok};
use alloc::format;
use alloc::string::String;

/// # interp *subcommand* ?*arg* ...?
pub fn cmd_interp<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    interp.call_subcommand(
        argv,
        1,
        &[
            Subcommand("children", cmd_interp_children),
            Subcommand("create", cmd_interp_create),
            Subcommand("delete", cmd_interp_delete),
            Subcommand("eval", cmd_interp_eval),
            Subcommand("exists", cmd_interp_exists),
            Subcommand("issafe", cmd_interp_issafe),
        ],
        ctx,
    )
}

/// The path argument at `argv[i]`, or the empty path if there isn't one.
fn path_arg(argv: &[Value], i: usize) -> Result<alloc::vec::Vec<String>, Exception> {
    match argv.get(i) {
        Some(path) => parse_child_path(path),
        None => Ok(alloc::vec::Vec::new()),
    }
}

/// # interp children ?*path*?
pub fn cmd_interp_children<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 3, "?path?")?;
    let path = path_arg(argv, 2)?;
    match interp.child(&path) {
        Some(child) => tickle_opt_ok!(child.child_names()),
        None => tickle_err!("could not find interpreter \"{}\"", path.join(" ")),
    }
}

/// # interp create ?-safe? ?--? ?*path*?
///
/// Creates a child interpreter and returns its path.  Without a path, the child gets a
/// fresh name of the form `interpN`.
pub fn cmd_interp_create<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 5, "?-safe? ?--? ?path?")?;

    let mut safe = false;
    let mut path_word: Option<&Value> = None;
    let mut args = argv[2..].iter();

    while let Some(arg) = args.next() {
        match &*arg.as_str() {
            "-safe" => safe = true,
            "--" => {
                path_word = args.next().or(path_word);
                break;
            }
            opt if opt.starts_with('-') => {
                return tickle_err!("bad option \"{}\": must be -safe or --", opt)
            }
            _ if path_word.is_none() => path_word = Some(arg),
            _ => return Err(super::wrong_args(argv, 2, "?-safe? ?--? ?path?")),
        }
    }

    if args.next().is_some() {
        return Err(super::wrong_args(argv, 2, "?-safe? ?--? ?path?"));
    }

    let (path, name) = match path_word {
        Some(word) => (parse_child_path(word)?, word.clone()),
        None => {
            let taken = interp.child_names();
            let name = (0..)
                .map(|n| format!("interp{}", n))
                .find(|name| !taken.contains(&Value::from(name)))
                .unwrap_or_default();
            (alloc::vec![name.clone()], Value::from(name))
        }
    };

    interp.create_child(&path, safe)?;
    Ok(Some(name))
}

/// # interp delete ?*path* ...?
pub fn cmd_interp_delete<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    for path in &argv[2..] {
        interp.delete_child(&parse_child_path(path)?)?;
    }
    tickle_opt_ok!()
}

/// # interp eval *path* *arg* ?*arg* ...?
///
/// Evaluates the concatenated arguments in the child interpreter.
pub fn cmd_interp_eval<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    ctx: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 4, 0, "path arg ?arg ...?")?;
    let path = parse_child_path(&argv[2])?;
    interp
        .eval_in(&path, &script_arg(&argv[3..]), ctx)
        .map(Some)
}

/// # interp exists *path*
pub fn cmd_interp_exists<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 3, 3, "path")?;
    let path = parse_child_path(&argv[2])?;
    tickle_opt_ok!(interp.child(&path).is_some())
}

/// # interp issafe ?*path*?
pub fn cmd_interp_issafe<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 3, "?path?")?;
    let path = path_arg(argv, 2)?;
    match interp.child(&path) {
        Some(child) => tickle_opt_ok!(child.is_safe()),
        None => tickle_err!("could not find interpreter \"{}\"", path.join(" ")),
    }
}
