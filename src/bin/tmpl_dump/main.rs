mod check;
mod common;
mod decode;
mod describe;

use std::process::exit;

use clap::{Arg, ArgAction, Command};
use indoc::indoc;
use log::Level;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

fn cli() -> Command {
    Command::new("tmpl_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Decode, describe and round-trip check binary records with TMPL templates")
        .long_about(indoc!(r#"
            Decode, describe and round-trip check binary records with TMPL templates.

            A template is a sequence of (four-byte type code, Pascal string label) pairs,
            exactly as stored in a TMPL resource. Record files are raw resource data.
        "#))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("-v - info, -vv - debug, -vvv - trace. Logs go to stderr."),
        )
        .subcommand(decode::command())
        .subcommand(describe::command())
        .subcommand(check::command())
}

fn init_logging(occurrences: u8) {
    let level = match occurrences {
        0 => return,
        1 => Level::Info,
        2 => Level::Debug,
        3 => Level::Trace,
        _ => {
            eprintln!("using more than -vvv does not affect verbosity level");
            Level::Trace
        }
    };

    if let Err(e) = TermLogger::init(
        level.to_level_filter(),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn main() {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let result = match matches.subcommand() {
        Some(("decode", m)) => decode::run(m),
        Some(("describe", m)) => describe::run(m),
        Some(("check", m)) => check::run(m),
        _ => {
            eprintln!("{}", cli().render_help());
            exit(2)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}
