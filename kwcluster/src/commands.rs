use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

/// Flags shared by every subcommand that clusters or ingests.
fn tuning_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-c --"config" <PATH>)
            .required(false)
            .help("Config file (default: ~/.config/kwcluster/config.json if present)")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        arg!(-t --"max-in-flight" <N>)
            .required(false)
            .help("Maximum number of ranked lists fetched concurrently")
            .value_parser(clap::value_parser!(usize)),
    )
    .arg(
        arg!(--"strict")
            .required(false)
            .help("Fail if any ranked list could not be loaded")
            .action(clap::ArgAction::SetTrue),
    )
}

fn cluster_args(cmd: clap::Command) -> clap::Command {
    tuning_args(cmd)
        .arg(
            arg!(-p --"rbo-p" <P>)
                .required(false)
                .help("RBO persistence probability, in (0, 1]")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            arg!(--"power" <N>)
                .required(false)
                .help("Markov clustering expansion power")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            arg!(--"inflation" <N>)
                .required(false)
                .help("Markov clustering inflation exponent")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            arg!(--"max-iterations" <N>)
                .required(false)
                .help("Upper bound on Markov clustering iterations")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help("Save report to file (default: print to stdout)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Report format: text, json, csv, markdown")
                .value_parser(["text", "json", "csv", "markdown", "md"])
                .default_value("text"),
        )
}

fn store_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-d --"domain-id" <ID>)
            .required(true)
            .help("Domain whose keywords are read or written")
            .value_parser(clap::value_parser!(i64)),
    )
    .arg(
        arg!(--"database" <PATH>)
            .required(false)
            .help("Ranking store to use instead of the one named in the config")
            .value_parser(clap::value_parser!(PathBuf)),
    )
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("kwcluster")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("kwcluster")
        .about("Groups search keywords whose result pages share competitors")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner, progress bars and status output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Creates the kwcluster config directory, config file and ranking store")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location of the config directory")
                        .default_value("~/.config/kwcluster/"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing config file and ranking store")
                        .required(false),
                ),
        )
        .subcommand(cluster_args(
            command!("disk")
                .about("Clusters the ranked-list files found in a directory")
                .arg(
                    arg!(<DIR>)
                        .help("Directory of JSON ranked-list files")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        ))
        .subcommand(cluster_args(store_args(
            command!("db").about("Clusters every keyword of a domain from the ranking store"),
        )))
        .subcommand(tuning_args(store_args(
            command!("import")
                .about("Copies a directory of ranked-list files into the ranking store")
                .arg(
                    arg!(<DIR>)
                        .help("Directory of JSON ranked-list files")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )))
}
