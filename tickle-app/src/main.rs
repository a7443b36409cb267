//! `ticklesh`: runs the Tickle REPL, or a script file given on the command line.
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=tickle=debug`) to see the interpreter's tracing output
//! on standard error.

use std::env;
use std::process;
use std::sync::Once;
use tickle::{Interp, TickleList, Value};

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

/// Copies the process environment into the global `env` array.
fn load_env(interp: &mut Interp) {
    let pairs: TickleList = env::vars()
        .flat_map(|(name, value)| [Value::from(name), Value::from(value)])
        .collect();

    if let Err(exception) = interp.array_set("env", &pairs) {
        eprintln!("{}", exception.value());
    }
}

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut ctx = ();
    let mut interp = Interp::new();
    load_env(&mut interp);

    let status = if args.len() > 1 {
        tickle_shell::script(&mut interp, &args[1..], &mut ctx)
    } else {
        tickle_shell::repl(&mut interp, &mut ctx)
    };

    process::exit(status);
}
