use crate::CLAP_STYLING;
use clap::{ArgAction, arg, command};
use std::path::PathBuf;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("logomatch")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("logomatch")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("group")
                .about("Fetch a logo for every domain in a list and group lookalikes")
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("Path to a newline-delimited file of domains")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save the report to a file (default: print to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: json, text, markdown")
                        .value_parser(["json", "text", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-t --"threshold" <BITS>)
                        .required(false)
                        .help("Largest Hamming distance at which two logos are grouped (0-64, default 10)")
                        .value_parser(clap::value_parser!(u32).range(0..=64)),
                )
                .arg(
                    arg!(-c --"concurrency" <NUM_WORKERS>)
                        .required(false)
                        .help("Maximum number of domains fetched at once (default 32)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Timeout for each image download in seconds (default 8)")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                )
                .arg(
                    arg!(--"homepage-timeout" <SECONDS>)
                        .required(false)
                        .help("Timeout for homepage requests in seconds (default 5)")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                )
                .arg(
                    arg!(--"preview" <COUNT>)
                        .required(false)
                        .help("Save the first COUNT fetched logos as PNG files")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"preview-dir" <PATH>)
                        .required(false)
                        .help("Directory for preview images")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value("logomatch-previews"),
                )
                .arg(
                    arg!(--"failed-output" <PATH>)
                        .required(false)
                        .help("Write domains without a usable logo to this file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"config" <PATH>)
                        .required(false)
                        .help("JSON file with grouping options; flags override it")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("probe")
                .about("Run the logo source chain for one domain and show every attempt")
                .arg(arg!(<DOMAIN>).required(true).help("The domain to probe"))
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Timeout for each image download in seconds (default 8)")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                )
                .arg(
                    arg!(--"save" <PATH>)
                        .required(false)
                        .help("Save the chosen logo as a PNG file")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("compare")
                .about("Print the Hamming distance between two fingerprints")
                .arg(arg!(<FIRST>).required(true).help("16 hex digit fingerprint"))
                .arg(arg!(<SECOND>).required(true).help("16 hex digit fingerprint"))
                .arg(
                    arg!(-t --"threshold" <BITS>)
                        .required(false)
                        .help("Threshold to judge the pair against")
                        .value_parser(clap::value_parser!(u32).range(0..=64))
                        .default_value("10"),
                ),
        )
}
