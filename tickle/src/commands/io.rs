//! Channel I/O and host access: `puts`, `gets`, `read`, `eof`, `seek`, `tell`, `flush`,
//! `open`, `close`, `exec`, and `source`.
//!
//! The channel commands work through the interpreter's [`ChannelTable`]; see
//! [`Interp::channels`].
//!
//! [`ChannelTable`]: crate::channel::ChannelTable

use crate::interp::Interp;
use crate::types::*;
use crate::{check_args, tickle_err, tickle_opt_ok};
use alloc::format;
use alloc::string::String;
use std::process::Command;

/// # puts ?-nonewline? ?*channelId*? *string*
///
/// Writes the string to the channel, `stdout` by default, followed by a newline unless
/// `-nonewline` is given.
pub fn cmd_puts<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 4, "?-nonewline? ?channelId? string")?;

    let mut args = &argv[1..];
    let mut newline = true;
    if args.len() > 1 && args[0].as_str() == "-nonewline" {
        newline = false;
        args = &args[1..];
    }

    let (channel, text) = match args {
        [text] => (String::from("stdout"), text.as_str()),
        [channel, text] => (channel.as_str().into_owned(), text.as_str()),
        _ => return Err(super::wrong_args(argv, 1, "?-nonewline? ?channelId? string")),
    };

    if newline {
        interp.channels().print(&channel, &format!("{}\n", text))?;
    } else {
        interp.channels().print(&channel, &text)?;
    }
    tickle_opt_ok!()
}

/// # gets *channelId* ?*varName*?
///
/// Reads a line from the channel.  With a variable, stores the line there and returns
/// its length, or -1 at end of file.
pub fn cmd_gets<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 3, "channelId ?varName?")?;

    let line = interp.channels().gets(&argv[1].as_str())?;

    match argv.get(2) {
        Some(var_name) => {
            let count: TickleInt = match &line {
                Some(line) => line.chars().count() as TickleInt,
                None => -1,
            };
            interp.set_var(var_name, Value::from(line.unwrap_or_default()))?;
            tickle_opt_ok!(count)
        }
        None => tickle_opt_ok!(line.unwrap_or_default()),
    }
}

/// # read ?-nonewline? *channelId*
pub fn cmd_read<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 3, "?-nonewline? channelId")?;

    let (nonewline, channel) = match argv {
        [_, flag, channel] if flag.as_str() == "-nonewline" => (true, channel),
        [_, channel] => (false, channel),
        _ => return Err(super::wrong_args(argv, 1, "?-nonewline? channelId")),
    };

    let mut text = interp.channels().read_all(&channel.as_str())?;
    if nonewline && text.ends_with('\n') {
        text.pop();
    }
    tickle_opt_ok!(text)
}

/// # eof *channelId*
pub fn cmd_eof<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 2, "channelId")?;
    tickle_opt_ok!(interp.channels().eof(&argv[1].as_str())?)
}

/// # seek *channelId* *offset* ?*origin*?
pub fn cmd_seek<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 3, 4, "channelId offset ?origin?")?;

    let offset = argv[2].to_int()?;
    let origin = argv
        .get(3)
        .map(|origin| origin.as_str().into_owned())
        .unwrap_or_else(|| String::from("start"));
    interp
        .channels()
        .seek(&argv[1].as_str(), offset, &origin)?;
    tickle_opt_ok!()
}

/// # tell *channelId*
pub fn cmd_tell<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 2, "channelId")?;
    tickle_opt_ok!(interp.channels().tell(&argv[1].as_str())?)
}

/// # flush *channelId*
pub fn cmd_flush<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 2, "channelId")?;
    interp.channels().flush(&argv[1].as_str())?;
    tickle_opt_ok!()
}

/// # open *fileName* ?*access*?
///
/// Opens a file and returns the new channel's name.  The access mode defaults to `r`.
pub fn cmd_open<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 3, "fileName ?access?")?;

    let mode = argv
        .get(2)
        .map(|mode| mode.as_str().into_owned())
        .unwrap_or_else(|| String::from("r"));
    let name = interp.channels().open(&argv[1].as_str(), &mode)?;
    tickle_opt_ok!(name)
}

/// # close *channelId*
pub fn cmd_close<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 2, "channelId")?;
    interp.channels().close(&argv[1].as_str())?;
    tickle_opt_ok!()
}

/// # exec *program* ?*arg* ...?
///
/// Runs the program and returns its standard output, less a trailing newline.  A program
/// that exits with a nonzero status raises an error carrying its standard error.
pub fn cmd_exec<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 0, "program ?arg ...?")?;

    let program = argv[1].as_str();
    let output = Command::new(&*program)
        .args(argv[2..].iter().map(|arg| arg.as_str().into_owned()))
        .output();

    let output = match output {
        Ok(output) => output,
        Err(err) => return tickle_err!("couldn't execute \"{}\": {}", program, err),
    };

    tracing::debug!(program = %program, status = ?output.status, "exec finished");

    let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.ends_with('\n') {
        stdout.pop();
    }

    if output.status.success() {
        tickle_opt_ok!(stdout)
    } else {
        let mut message = String::from_utf8_lossy(&output.stderr).into_owned();
        if message.ends_with('\n') {
            message.pop();
        }
        if message.is_empty() {
            message = format!("child process exited abnormally ({})", output.status);
        }
        tickle_err!("{}", message)
    }
}

/// # source *fileName*
///
/// Evaluates the file's contents as a script in the current frame.  A `return` at the top
/// of the file ends the script and supplies its result.
pub fn cmd_source<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    check_args(1, argv, 2, 2, "fileName")?;

    let path = argv[1].as_str();
    let script = match std::fs::read_to_string(&*path) {
        Ok(script) => script,
        Err(err) => return tickle_err!("couldn't read file \"{}\": {}", path, err),
    };

    tracing::debug!(path = %path, "sourcing script");

    match interp.eval_value(&Value::from(script), ctx) {
        Ok(value) => Ok(Some(value)),
        Err(mut exception) if exception.code() == ResultCode::Return => {
            exception.decrement_level();
            if exception.code() == ResultCode::Okay {
                Ok(Some(exception.value()))
            } else {
                Err(exception)
            }
        }
        Err(exception) => Err(exception),
    }
}

#[cfg(test)]
mod tests {
    use crate::types::*;
    use crate::Interp;
    use pretty_assertions::assert_eq;

    fn eval(interp: &mut Interp<()>, script: &str) -> String {
        match interp.eval(script, &mut ()) {
            Ok(value) => value.as_str().into_owned(),
            Err(exception) => format!("error: {}", exception.value()),
        }
    }

    fn temp_path(tag: &str) -> String {
        let mut path = std::env::temp_dir();
        path.push(format!("tickle-io-{}-{}.txt", tag, std::process::id()));
        path.to_string_lossy().replace('\\', "/")
    }

    #[test]
    fn test_file_round_trip() {
        let path = temp_path("files");
        let mut interp = Interp::new();
        interp.set_var(&Value::from("path"), Value::from(&path)).unwrap();

        let chan = eval(&mut interp, "set f [open $path w]");
        assert!(chan.starts_with("file"));
        eval(&mut interp, "puts $f alpha; puts -nonewline $f beta; close $f");

        eval(&mut interp, "set f [open $path]");
        assert_eq!(eval(&mut interp, "gets $f line"), "5");
        assert_eq!(eval(&mut interp, "set line"), "alpha");
        assert_eq!(eval(&mut interp, "tell $f"), "6");
        assert_eq!(eval(&mut interp, "gets $f"), "beta");
        assert_eq!(eval(&mut interp, "eof $f"), "1");
        assert_eq!(eval(&mut interp, "gets $f line"), "-1");

        eval(&mut interp, "seek $f 0");
        assert_eq!(eval(&mut interp, "read $f"), "alpha\nbeta");
        eval(&mut interp, "close $f");
        assert!(eval(&mut interp, "close $f").starts_with("error: can not find channel"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_puts_arguments() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "puts -nonewline stdout {}"), "");
        assert_eq!(eval(&mut interp, "flush stdout"), "");
        assert_eq!(
            eval(&mut interp, "puts a b c d"),
            "error: wrong # args: should be \"puts ?-nonewline? ?channelId? string\""
        );
        assert_eq!(
            eval(&mut interp, "puts nosuch text"),
            "error: can not find channel named \"nosuch\""
        );
    }

    #[test]
    fn test_source() {
        let path = temp_path("source");
        std::fs::write(&path, "set sourced yes\nreturn done\nset sourced no\n").unwrap();

        let mut interp = Interp::new();
        interp.set_var(&Value::from("path"), Value::from(&path)).unwrap();
        assert_eq!(eval(&mut interp, "source $path"), "done");
        assert_eq!(eval(&mut interp, "set sourced"), "yes");

        eval(&mut interp, "proc load {p} { source $p; return after }");
        assert_eq!(eval(&mut interp, "load $path"), "after");

        let _ = std::fs::remove_file(&path);
        assert!(eval(&mut interp, "source $path").starts_with("error: couldn't read file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec() {
        let mut interp = Interp::new();
        assert_eq!(eval(&mut interp, "exec echo hello world"), "hello world");
        assert!(eval(&mut interp, "exec false").starts_with("error: child process exited"));
        assert!(eval(&mut interp, "exec /no/such/program").starts_with("error: couldn't execute"));
    }

    #[test]
    fn test_host_commands_are_unsafe() {
        let mut interp = Interp::new();
        eval(&mut interp, "interp create -safe jail");
        for script in ["open x", "source x", "exec ls", "exit"] {
            let result = interp
                .eval_in(&[String::from("jail")], &Value::from(script), &mut ())
                .unwrap_err();
            assert_eq!(result.error_kind(), Some(ErrorKind::UnsafeCommand));
        }
        assert_eq!(
            eval(&mut interp, "interp eval jail {puts -nonewline stdout {}}"),
            ""
        );
    }
}
