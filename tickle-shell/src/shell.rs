//! Tickle Shell
//!
//! An interactive REPL and a script runner for applications that embed a Tickle
//! interpreter.  Both return the process exit status the application should use, so
//! that a script's `exit 3` becomes the application's status 3.

use rustyline::{error::ReadlineError, history::MemHistory, Config, Editor};
use std::fs;
use tickle::{Exception, Interp, ResultCode, TickleList, Value};
use tracing::debug;

/// Invokes an interactive REPL for the given interpreter, using `rustyline` line editing.
///
/// The REPL reads commands until `^C`, end of input, or the `exit` command, and returns
/// the exit status.  Input that ends inside an unterminated brace, quote, or bracket is
/// continued on the next line.
///
/// The prompt is the result of evaluating the `tcl_prompt1` variable, if it is set; the
/// continuation prompt likewise comes from `tcl_prompt2`.
///
/// # Example
///
/// ```no_run
/// use tickle::Interp;
///
/// let mut ctx = ();
/// let mut interp = Interp::new();
///
/// // NOTE: commands can be added to the interpreter here.
///
/// let status = tickle_shell::repl(&mut interp, &mut ctx);
/// std::process::exit(status);
/// ```
pub fn repl<Ctx>(interp: &mut Interp<Ctx>, ctx: &mut Ctx) -> i32 {
    let mut rl = match Editor::<(), MemHistory>::with_history(Config::default(), MemHistory::new())
    {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("failed to initialise line editing: {}", err);
            return 1;
        }
    };

    let mut pending = String::new();

    loop {
        let shown = if pending.is_empty() {
            prompt(interp, ctx, "tcl_prompt1", "% ")
        } else {
            prompt(interp, ctx, "tcl_prompt2", "> ")
        };

        let line = match rl.readline(&shown) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                return 0;
            }
            Err(ReadlineError::Eof) => return 0,
            Err(err) => {
                eprintln!("I/O error: {:?}", err);
                return 1;
            }
        };

        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(&line);

        if !interp.complete(&pending) {
            continue;
        }

        let command = std::mem::take(&mut pending);
        let command = command.trim();
        if command.is_empty() {
            continue;
        }

        if let Err(err) = rl.add_history_entry(command) {
            eprintln!("history error: {}", err);
        }

        match interp.eval(command, ctx) {
            Ok(value) => {
                // Don't output empty values.
                if !value.as_str().is_empty() {
                    println!("{}", value);
                }
            }
            Err(exception) => {
                if let Some(status) = exit_status(&exception) {
                    debug!(status, "exiting REPL");
                    return status;
                }
                println!("{}", exception.value());
            }
        }
    }
}

/// The prompt produced by the script in variable `var`, or `default`.
fn prompt<Ctx>(interp: &mut Interp<Ctx>, ctx: &mut Ctx, var: &str, default: &str) -> String {
    let script = match interp.var(&Value::from(var)) {
        Ok(script) => script,
        Err(_) => return default.to_string(),
    };

    match interp.eval_value(&script, ctx) {
        Ok(prompt) => prompt.as_str().into_owned(),
        Err(exception) => {
            println!("{}", exception.value());
            default.to_string()
        }
    }
}

fn exit_status(exception: &Exception) -> Option<i32> {
    match exception.code() {
        ResultCode::Exit(status) => Some(status),
        _ => None,
    }
}

/// Executes a script from a set of command line arguments, returning the exit status.
///
/// `args[0]` is presumed to be the name of a script file, with any subsequent arguments
/// being arguments to pass to the script.
///
/// # Script Variables
///
/// * `arg0` is set to the name of the script file.
/// * `argv` is set to a list of the remaining arguments.
///
/// An error in the script is written to standard error and yields status 1; `exit`
/// yields its own status.
///
/// # Example
///
/// ```no_run
/// use tickle::Interp;
/// use std::env;
///
/// let args: Vec<String> = env::args().collect();
///
/// let mut ctx = ();
/// let mut interp = Interp::new();
///
/// if args.len() > 1 {
///     let status = tickle_shell::script(&mut interp, &args[1..], &mut ctx);
///     std::process::exit(status);
/// } else {
///     eprintln!("Usage: myshell *filename.tcl");
/// }
/// ```
pub fn script<Ctx>(interp: &mut Interp<Ctx>, args: &[String], ctx: &mut Ctx) -> i32 {
    let Some((arg0, argv)) = args.split_first() else {
        eprintln!("no script file given");
        return 1;
    };

    match fs::read_to_string(arg0) {
        Ok(script) => execute_script(interp, &script, arg0, argv, ctx),
        Err(err) => {
            eprintln!("couldn't read file \"{}\": {}", arg0, err);
            1
        }
    }
}

/// Executes the text of a script file with its command-line arguments.
fn execute_script<Ctx>(
    interp: &mut Interp<Ctx>,
    script: &str,
    arg0: &str,
    argv: &[String],
    ctx: &mut Ctx,
) -> i32 {
    let argv: TickleList = argv.iter().map(Value::from).collect();
    let setup = interp
        .set_var(&Value::from("arg0"), Value::from(arg0))
        .and_then(|_| interp.set_var(&Value::from("argv"), Value::from(argv)));
    if let Err(exception) = setup {
        eprintln!("{}", exception.value());
        return 1;
    }

    debug!(script = arg0, "running script");

    match interp.eval(script, ctx) {
        Ok(_) => 0,
        Err(exception) => match exit_status(&exception) {
            Some(status) => status,
            None => {
                eprintln!("{}", exception.value());
                1
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_script(tag: &str, text: &str) -> String {
        let mut path = std::env::temp_dir();
        path.push(format!("tickle-shell-{}-{}.tcl", tag, std::process::id()));
        fs::write(&path, text).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_script_arguments() {
        let path = temp_script("args", "set seen [list $arg0 [llength $argv] [lindex $argv 1]]");
        let mut interp = Interp::new();
        let args = [path.clone(), "a".into(), "b c".into()];

        assert_eq!(script(&mut interp, &args, &mut ()), 0);
        let seen = interp.var(&Value::from("seen")).unwrap();
        assert_eq!(seen.to_list().unwrap()[1].as_str(), "2");
        assert_eq!(seen.to_list().unwrap()[2].as_str(), "b c");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_script_status() {
        let failing = temp_script("fail", "error boom");
        let exiting = temp_script("exit", "exit 3");
        let mut interp = Interp::new();

        assert_eq!(script(&mut interp, &[failing.clone()], &mut ()), 1);
        assert_eq!(script(&mut interp, &[exiting.clone()], &mut ()), 3);
        assert_eq!(script(&mut interp, &[String::from("/no/such/script.tcl")], &mut ()), 1);
        assert_eq!(script(&mut interp, &[], &mut ()), 1);

        let _ = fs::remove_file(&failing);
        let _ = fs::remove_file(&exiting);
    }

    #[test]
    fn test_prompt() {
        let mut interp = Interp::new();
        assert_eq!(prompt(&mut interp, &mut (), "tcl_prompt1", "% "), "% ");
        interp.eval("set tcl_prompt1 {return {tickle> }}", &mut ()).unwrap();
        assert_eq!(prompt(&mut interp, &mut (), "tcl_prompt1", "% "), "tickle> ");
    }
}
