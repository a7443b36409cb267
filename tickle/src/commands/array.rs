//! The `array` ensemble.

use crate::interp::Interp;
use crate::types::*;
use crate::{check_args, tickle_opt_ok};

/// # array *subcommand* ?*arg* ...?
pub fn cmd_array<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    interp.call_subcommand(
        argv,
        1,
        &[
            Subcommand("exists", cmd_array_exists),
            Subcommand("get", cmd_array_get),
            Subcommand("names", cmd_array_names),
            Subcommand("set", cmd_array_set),
            Subcommand("size", cmd_array_size),
            Subcommand("unset", cmd_array_unset),
        ],
        ctx,
    )
}

/// # array exists *arrayName*
pub fn cmd_array_exists<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 3, 3, "arrayName")?;
    tickle_opt_ok!(interp.array_exists(&argv[2].as_str()))
}

/// # array get *arrayName*
pub fn cmd_array_get<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 3, 3, "arrayName")?;
    tickle_opt_ok!(interp.array_get(&argv[2].as_str()))
}

/// # array names *arrayName*
pub fn cmd_array_names<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 3, 3, "arrayName")?;
    tickle_opt_ok!(interp.array_names(&argv[2].as_str()))
}

/// # array set *arrayName* *list*
///
/// Merges the key/value pairs in *list* into the array, creating it if need be.
pub fn cmd_array_set<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 4, 4, "arrayName list")?;
    let list = argv[3].to_list()?;
    interp.array_set(&argv[2].as_str(), &list)?;
    tickle_opt_ok!()
}

/// # array size *arrayName*
pub fn cmd_array_size<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 3, 3, "arrayName")?;
    tickle_opt_ok!(interp.array_size(&argv[2].as_str()))
}

/// # array unset *arrayName* ?*index*?
pub fn cmd_array_unset<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 3, 4, "arrayName ?index?")?;

    let name = argv[2].as_str();
    match argv.get(3) {
        Some(index) => {
            let element = Value::from(format!("{}({})", name, index));
            if interp.var_exists(&element) {
                interp.unset_var(&element)?;
            }
        }
        None => interp.array_unset(&name),
    }

    tickle_opt_ok!()
}
