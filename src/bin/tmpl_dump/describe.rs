use anyhow::{Result, bail};
use clap::{Arg, ArgMatches, Command};

use restmpl::output::describe_template;

use crate::common;

pub fn command() -> Command {
    let cmd = Command::new("describe")
        .about("Load a template and print its structure")
        .arg(
            Arg::new("format")
                .short('o')
                .long("format")
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Sets the output format."),
        );
    common::template_args(cmd)
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    let settings = common::settings(matches)?;
    let template = common::load_template(matches, &settings)?;

    match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => println!("{}", serde_json::to_string_pretty(template.items())?),
        Some("text") => print!("{}", describe_template(&template)),
        other => bail!("unsupported format {other:?}"),
    }
    Ok(())
}
