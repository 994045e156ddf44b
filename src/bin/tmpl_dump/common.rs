use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use encoding::all::{MAC_ROMAN, encodings};
use encoding::types::{Encoding, EncodingRef};

use restmpl::{CodecSettings, Endian, RecordContext, Registry, Template, TypeCode};

/// Arguments shared by every subcommand that loads a template.
pub fn template_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("template")
            .long("template")
            .short('t')
            .required(true)
            .value_name("PATH")
            .help("Template definition file (raw TMPL resource data)."),
    )
    .arg(
        Arg::new("little-endian")
            .long("little-endian")
            .action(ArgAction::SetTrue)
            .help("Read multi-byte values little-endian instead of big-endian."),
    )
    .arg(
        Arg::new("text-codec")
            .long("text-codec")
            .value_name("NAME")
            .value_parser(
                encodings()
                    .iter()
                    .filter(|e| e.raw_decoder().is_ascii_compatible())
                    .map(|e| e.name())
                    .collect::<Vec<&'static str>>(),
            )
            .default_value(MAC_ROMAN.name())
            .help("Encoding of labels and string elements."),
    )
}

/// Record inputs: positional paths plus `--glob` patterns.
pub fn input_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("input")
            .action(ArgAction::Append)
            .value_name("INPUT")
            .help("Record data files."),
    )
    .arg(
        Arg::new("glob")
            .long("glob")
            .action(ArgAction::Append)
            .value_name("PATTERN")
            .help("Glob pattern to expand into record files (cross-platform). Can be passed multiple times."),
    )
    .arg(
        Arg::new("record-id")
            .long("record-id")
            .value_parser(clap::value_parser!(i64))
            .default_value("128")
            .value_name("ID")
            .help("Record id, used by keyed elements that switch on it and by relative references."),
    )
    .arg(
        Arg::new("record-type")
            .long("record-type")
            .value_parser(|s: &str| s.parse::<TypeCode>())
            .value_name("TYPE")
            .help("Four-character type of the records."),
    )
}

pub fn settings(matches: &ArgMatches) -> Result<CodecSettings> {
    let name = matches
        .get_one::<String>("text-codec")
        .expect("has default");
    let codec: EncodingRef = *encodings()
        .iter()
        .find(|c| c.name() == name)
        .context("possible values are derived from `encodings()`")?;

    let endian = if matches.get_flag("little-endian") {
        Endian::Little
    } else {
        Endian::Big
    };

    Ok(CodecSettings::new().endian(endian).text_codec(codec))
}

pub fn load_template(matches: &ArgMatches, settings: &CodecSettings) -> Result<Template> {
    let path = Path::new(
        matches
            .get_one::<String>("template")
            .expect("required argument"),
    );
    let data = fs::read(path).with_context(|| format!("failed to read template `{}`", path.display()))?;
    Template::parse(&data, &Registry::standard(), settings)
        .with_context(|| format!("failed to load template `{}`", path.display()))
}

pub fn record_context(matches: &ArgMatches) -> RecordContext {
    let id = *matches.get_one::<i64>("record-id").expect("has default");
    let context = RecordContext::new(id);
    match matches.get_one::<TypeCode>("record-type") {
        Some(&record_type) => context.with_type(record_type),
        None => context,
    }
}

pub fn inputs(matches: &ArgMatches) -> Result<Vec<PathBuf>> {
    let mut inputs: Vec<PathBuf> = vec![];

    if let Some(paths) = matches.get_many::<String>("input") {
        inputs.extend(paths.map(PathBuf::from));
    }

    if let Some(patterns) = matches.get_many::<String>("glob") {
        for pat in patterns {
            for entry in glob::glob(pat).with_context(|| format!("invalid glob pattern `{pat}`"))? {
                match entry {
                    Ok(p) if p.is_file() => inputs.push(p),
                    Ok(_) => {}
                    Err(e) => eprintln!("glob entry error: {e}"),
                }
            }
        }
    }

    if inputs.is_empty() {
        bail!("No inputs provided. Pass record files and/or --glob.");
    }
    Ok(inputs)
}

/// If `prompt` is passed, will display a confirmation prompt before overwriting files.
pub fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
    let p = path.as_ref();

    if p.is_dir() {
        bail!("There is a directory at {}, refusing to overwrite", p.display());
    }

    if p.exists() && prompt {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Are you sure you want to override output file at {}",
                p.display()
            ))
            .default(false)
            .interact()
            .context("Failed to write confirmation prompt to term")?;
        if !confirmed {
            bail!("Cancelled");
        }
    }

    if let Some(parent) = p.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    File::create(p).with_context(|| format!("failed to create `{}`", p.display()))
}
