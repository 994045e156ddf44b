use std::fs;

use anyhow::{Context, Result, bail};
use clap::{ArgMatches, Command};
use indoc::indoc;

use restmpl::{Session, hexdump_around};

use crate::common;

pub fn command() -> Command {
    let cmd = Command::new("check")
        .about("Decode and re-encode record files, reporting any that do not round-trip")
        .long_about(indoc!(r#"
            Decode and re-encode record files, reporting any that do not round-trip.

            Every input is decoded with the template and encoded again without changes.
            Records that fail to decode, or whose bytes differ after encoding, are reported
            with a hexdump around the offending offset. The exit code is 1 if any failed.
        "#));
    common::input_args(common::template_args(cmd))
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    let settings = common::settings(matches)?;
    let template = common::load_template(matches, &settings)?;
    let context = common::record_context(matches);
    let inputs = common::inputs(matches)?;

    let mut session = Session::new(template, settings);
    let mut failures = 0;

    for path in &inputs {
        let data = fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;

        let tree = match session.decode(&data, context) {
            Ok(tree) => tree,
            Err(e) => {
                failures += 1;
                println!("FAIL {}: {e}", path.display());
                if let Some(offset) = e.decode_error().and_then(|d| d.offset()) {
                    print!("{}", hexdump_around(&data, offset as usize, 32));
                }
                continue;
            }
        };
        let elements = tree.len();

        let encoded = session.encode()?;
        match first_difference(&data, &encoded) {
            None => println!("ok   {} ({} bytes, {elements} elements)", path.display(), data.len()),
            Some(offset) => {
                failures += 1;
                println!(
                    "DIFF {}: first difference at offset 0x{offset:x} ({} bytes in, {} bytes out)",
                    path.display(),
                    data.len(),
                    encoded.len()
                );
                println!("input:");
                print!("{}", hexdump_around(&data, offset, 32));
                println!("encoded:");
                print!("{}", hexdump_around(&encoded, offset, 32));
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} records do not round-trip", inputs.len());
    }
    Ok(())
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    match a.iter().zip(b).position(|(x, y)| x != y) {
        Some(offset) => Some(offset),
        None if a.len() != b.len() => Some(a.len().min(b.len())),
        None => None,
    }
}
