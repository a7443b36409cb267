//! The `namespace` ensemble and the `variable` command.

use super::script_arg;
use crate::interp::Interp;
use crate::types::*;
use crate::util::split_qualified;
use crate::{check_args, tickle_opt_ok};

/// # namespace *subcommand* ?*arg* ...?
pub fn cmd_namespace<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    ctx: &mut Ctx,
) -> TickleOptResult {
    interp.call_subcommand(
        argv,
        1,
        &[
            Subcommand("children", cmd_namespace_children),
            Subcommand("current", cmd_namespace_current),
            Subcommand("delete", cmd_namespace_delete),
            Subcommand("eval", cmd_namespace_eval),
            Subcommand("exists", cmd_namespace_exists),
            Subcommand("parent", cmd_namespace_parent),
            Subcommand("qualifiers", cmd_namespace_qualifiers),
            Subcommand("tail", cmd_namespace_tail),
        ],
        ctx,
    )
}

/// # namespace children ?*namespace*?
pub fn cmd_namespace_children<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 3, "?name?")?;
    let path = argv.get(2).map(|name| name.as_str()).unwrap_or_default();
    tickle_opt_ok!(interp.namespace_children(&path)?)
}

/// # namespace current
pub fn cmd_namespace_current<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 2, "")?;
    tickle_opt_ok!(interp.current_namespace_name())
}

/// # namespace delete ?*namespace* ...?
pub fn cmd_namespace_delete<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    for path in &argv[2..] {
        interp.namespace_delete(&path.as_str())?;
    }
    tickle_opt_ok!()
}

/// # namespace eval *namespace* *arg* ?*arg* ...?
///
/// Evaluates the concatenated arguments in the namespace, creating it if need be.
pub fn cmd_namespace_eval<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    ctx: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 4, 0, "name arg ?arg ...?")?;
    interp
        .namespace_eval(&argv[2].as_str(), &script_arg(&argv[3..]), ctx)
        .map(Some)
}

/// # namespace exists *namespace*
pub fn cmd_namespace_exists<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 3, 3, "name")?;
    tickle_opt_ok!(interp.namespace_exists(&argv[2].as_str()))
}

/// # namespace parent ?*namespace*?
pub fn cmd_namespace_parent<Ctx>(
    interp: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 2, 3, "?name?")?;
    let path = argv.get(2).map(|name| name.as_str()).unwrap_or_default();
    interp.namespace_parent(&path).map(Some)
}

/// # namespace qualifiers *string*
///
/// Returns everything before the last `::` in the name.
pub fn cmd_namespace_qualifiers<Ctx>(
    _: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 3, 3, "string")?;
    let name = argv[2].as_str();
    let (qualifiers, _) = split_qualified(&name);
    tickle_opt_ok!(qualifiers.unwrap_or_default())
}

/// # namespace tail *string*
pub fn cmd_namespace_tail<Ctx>(
    _: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    check_args(2, argv, 3, 3, "string")?;
    let name = argv[2].as_str();
    let (_, tail) = split_qualified(&name);
    tickle_opt_ok!(tail)
}

/// # variable ?*name* *value* ...? *name* ?*value*?
///
/// Declares namespace variables.  In a procedure body each name becomes a link to the
/// variable of the same name in the current namespace.
pub fn cmd_variable<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 0, "?name value...? name ?value?")?;

    for pair in argv[1..].chunks(2) {
        let value = pair.get(1).cloned();
        interp.declare_variable(&pair[0].as_str(), value)?;
    }

    tickle_opt_ok!()
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
    fn test_namespace_tree() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "namespace current"), "::");
        assert_eq!(eval(&mut interp, "namespace eval a { namespace current }"), "::a");
        assert_eq!(eval(&mut interp, "namespace eval a::b { namespace current }"), "::a::b");
        eval(&mut interp, "namespace eval c {}");

        assert_eq!(eval(&mut interp, "namespace children"), "::a ::c");
        assert_eq!(eval(&mut interp, "namespace children a"), "::a::b");
        assert_eq!(eval(&mut interp, "namespace parent a::b"), "::a");
        assert_eq!(eval(&mut interp, "namespace parent"), "");
        assert_eq!(eval(&mut interp, "namespace exists a::b"), "1");
        assert_eq!(eval(&mut interp, "namespace exists nope"), "0");

        eval(&mut interp, "namespace delete a");
        assert_eq!(eval(&mut interp, "namespace exists a"), "0");
        assert_eq!(eval(&mut interp, "namespace children"), "::c");
        assert_eq!(
            eval(&mut interp, "namespace delete nope"),
            "error: namespace \"nope\" not found"
        );
    }

    #[test]
    fn test_qualifiers_and_tail() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "namespace qualifiers ::a::b::c"), "::a::b");
        assert_eq!(eval(&mut interp, "namespace qualifiers c"), "");
        assert_eq!(eval(&mut interp, "namespace tail ::a::b::c"), "c");
        assert_eq!(eval(&mut interp, "namespace tail c"), "c");
    }

    #[test]
    fn test_variable() {
        let mut interp = Interp::new();
        eval(
            &mut interp,
            "namespace eval counter {
                variable count 0
                proc next {} { variable count; incr count }
             }",
        );
        assert_eq!(eval(&mut interp, "counter::next"), "1");
        assert_eq!(eval(&mut interp, "counter::next"), "2");
        assert_eq!(eval(&mut interp, "set counter::count"), "2");
        assert_eq!(eval(&mut interp, "info exists count"), "0");
    }

    #[test]
    fn test_unknown_falls_back_to_root() {
        let mut interp = Interp::new();
        eval(&mut interp, "proc helper {} { return root }");
        assert_eq!(
            eval(&mut interp, "namespace eval n { proc f {} { helper } }; n::f"),
            "root"
        );
    }
}
