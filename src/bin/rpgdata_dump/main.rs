use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::process::exit;

mod archive;
mod decrypt;
mod output;
mod project;

fn verbosity(matches: &ArgMatches) -> Option<LevelFilter> {
    match matches.get_count("verbose") {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        3 => Some(LevelFilter::Trace),
        _ => {
            eprintln!("using more than -vvv does not affect verbosity level");
            Some(LevelFilter::Trace)
        }
    }
}

fn try_to_initialize_logging(level: Option<LevelFilter>) {
    if let Some(level) = level {
        // Logs go to stderr so they never mix with JSON on stdout.
        if let Err(e) = TermLogger::init(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ) {
            eprintln!("Failed to initialize logging: {}", e);
        }
    }
}

fn cli() -> Command {
    Command::new("rpgdata_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to inspect RPG Maker project data")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace."),
        )
        .subcommand(archive::command())
        .subcommand(project::load_command())
        .subcommand(project::map_tree_command())
        .subcommand(project::events_command())
        .subcommand(project::encyclopedia_command())
        .subcommand(project::export_command())
        .subcommand(decrypt::command())
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("archive", sub)) => archive::run(sub),
        Some(("load", sub)) => project::run_load(sub),
        Some(("map-tree", sub)) => project::run_map_tree(sub),
        Some(("events", sub)) => project::run_events(sub),
        Some(("encyclopedia", sub)) => project::run_encyclopedia(sub),
        Some(("export", sub)) => project::run_export(sub),
        Some(("decrypt-resources", sub)) => decrypt::run(sub),
        _ => unreachable!("a subcommand is required"),
    }
}

fn main() {
    let matches = cli().get_matches();
    try_to_initialize_logging(verbosity(&matches));

    if let Err(e) = run(&matches) {
        eprintln!("{:?}", e);
        exit(1);
    }
}
