use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgMatches, Command};
use indoc::indoc;
use log::warn;

use restmpl::output::render;
use restmpl::{CodecSettings, OutputFormat, RecordContext, Session, Template, hexdump_around};

use crate::common;

pub fn command() -> Command {
    let cmd = Command::new("decode")
        .about("Decode record files and print their element trees")
        .long_about(indoc!(r#"
            Decode record files and print their element trees.

            Output formats:
              "text"  - one line per element, indented by nesting depth.
              "json"  - an indented JSON document per record.
              "jsonl" - one JSON document per line.
              "xml"   - an XML document per record.
        "#))
        .arg(
            Arg::new("format")
                .short('o')
                .long("format")
                .value_parser(|s: &str| s.parse::<OutputFormat>())
                .default_value("text")
                .help("Sets the output format (text, json, jsonl, xml)."),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .value_name("PATH")
                .help(
                    "Writes output to the file specified instead of stdout, errors will still be printed to stderr. \
                     Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`. \
                     Will create parent directories if needed.",
                ),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation."),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .action(ArgAction::SetTrue)
                .help("Re-encode every record after decoding and warn when the bytes differ."),
        )
        .arg(
            Arg::new("num-threads")
                .long("threads")
                .value_parser(clap::value_parser!(usize))
                .default_value("0")
                .help("Sets the number of worker threads, defaults to number of CPU cores."),
        );

    common::input_args(common::template_args(cmd))
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    let settings = common::settings(matches)?.verify_round_trip(matches.get_flag("verify"));
    let template = common::load_template(matches, &settings)?;
    let context = common::record_context(matches);
    let inputs = common::inputs(matches)?;
    let format = *matches.get_one::<OutputFormat>("format").expect("has default");

    configure_threads(*matches.get_one::<usize>("num-threads").expect("has default"));

    let mut output: Box<dyn Write> = match matches.get_one::<String>("output-target") {
        Some(path) => Box::new(common::create_output_file(
            path,
            !matches.get_flag("no-confirm-overwrite"),
        )?),
        None => Box::new(io::stdout().lock()),
    };

    let rendered = decode_all(&template, &settings, context, &inputs, format);

    let mut failures = 0;
    for (path, result) in inputs.iter().zip(rendered) {
        match result {
            Ok(s) => {
                if inputs.len() > 1 && format == OutputFormat::Text {
                    writeln!(output, "==> {} <==", path.display())?;
                }
                writeln!(output, "{}", s.trim_end())?;
            }
            Err(e) => {
                failures += 1;
                eprintln!("{e:#}");
            }
        }
    }
    output.flush()?;

    if failures > 0 {
        bail!("{failures} of {} records failed to decode", inputs.len());
    }
    Ok(())
}

#[cfg(feature = "multithreading")]
fn configure_threads(num_threads: usize) {
    if num_threads == 0 {
        return;
    }
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        warn!("failed to configure the thread pool: {e}");
    }
}

#[cfg(not(feature = "multithreading"))]
fn configure_threads(num_threads: usize) {
    if num_threads > 1 {
        warn!("turned on threads, but the binary was compiled without the `multithreading` feature; decoding sequentially");
    }
}

#[cfg(feature = "multithreading")]
fn decode_all(
    template: &Template,
    settings: &CodecSettings,
    context: RecordContext,
    inputs: &[PathBuf],
    format: OutputFormat,
) -> Vec<Result<String>> {
    use rayon::prelude::*;

    inputs
        .par_iter()
        .map(|path| decode_one(template, settings, context, path, format))
        .collect()
}

#[cfg(not(feature = "multithreading"))]
fn decode_all(
    template: &Template,
    settings: &CodecSettings,
    context: RecordContext,
    inputs: &[PathBuf],
    format: OutputFormat,
) -> Vec<Result<String>> {
    inputs
        .iter()
        .map(|path| decode_one(template, settings, context, path, format))
        .collect()
}

fn decode_one(
    template: &Template,
    settings: &CodecSettings,
    context: RecordContext,
    path: &Path,
    format: OutputFormat,
) -> Result<String> {
    let data = fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;

    let mut session = Session::new(template.clone(), settings.clone());
    let tree = match session.decode(&data, context) {
        Ok(tree) => tree,
        Err(e) => {
            let dump = e
                .decode_error()
                .and_then(|d| d.offset())
                .map(|offset| hexdump_around(&data, offset as usize, 32))
                .unwrap_or_default();
            return Err(format_err!(
                "failed to decode `{}`: {e}\n{dump}",
                path.display()
            ));
        }
    };

    render(tree, format).with_context(|| format!("failed to render `{}`", path.display()))
}
