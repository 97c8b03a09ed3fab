use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use indoc::indoc;
use rpgdata::{Engine, MapExporter, ProjectSession, ProjectSettings, build_encyclopedia};

use crate::output::{Output, output_args};

fn project_args(cmd: Command) -> Command {
    let cmd = cmd
        .arg(
            Arg::new("data")
                .long("data")
                .short('d')
                .required(true)
                .value_name("DIR")
                .help("The project's data directory (`data`, `www/data` or `Data`)."),
        )
        .arg(
            Arg::new("engine")
                .long("engine")
                .short('e')
                .default_value("mv")
                .value_parser(["mv", "mz", "vx", "vxace", "ace"])
                .help("Which engine produced the data files."),
        )
        .arg(
            Arg::new("archive")
                .long("archive")
                .value_name("ARCHIVE")
                .help("Read missing data files from this archive instead of looking for `Game.rgss*` next to the data directory."),
        )
        .arg(
            Arg::new("no-archive")
                .long("no-archive")
                .action(ArgAction::SetTrue)
                .conflicts_with("archive")
                .help("Only read loose data files."),
        );
    output_args(cmd)
}

fn open_session(matches: &ArgMatches) -> Result<ProjectSession> {
    let data = matches
        .get_one::<String>("data")
        .context("missing data directory")?;
    let engine = match matches.get_one::<String>("engine") {
        Some(name) => name.parse::<Engine>().map_err(anyhow::Error::msg)?,
        None => Engine::default(),
    };

    let settings = ProjectSettings::new()
        .engine(engine)
        .archive(matches.get_one::<String>("archive"))
        .detect_archive(!matches.get_flag("no-archive"));

    ProjectSession::open(data, &settings)
        .with_context(|| format!("Failed to open project data at `{}`", data))
}

fn map_id(matches: &ArgMatches) -> Option<i64> {
    matches.get_one::<i64>("map-id").copied()
}

pub fn load_command() -> Command {
    project_args(
        Command::new("load")
            .about("Print one data table as canonical JSON")
            .long_about(indoc!(r#"
                Print one data table as canonical JSON.

                The same logical name works for every engine: `Items.json` is read from
                `Items.json` for MV/MZ projects and from `Items.rvdata2`/`Items.rvdata`
                (on disk or inside the archive) for VX Ace/VX projects.
            "#))
            .arg(Arg::new("name").required(true).value_name("NAME")),
    )
}

pub fn run_load(matches: &ArgMatches) -> Result<()> {
    let session = open_session(matches)?;
    let name = matches
        .get_one::<String>("name")
        .context("missing table name")?;
    let Some(value) = session.loader().try_load(name)? else {
        bail!("`{}` was not found", name);
    };
    Output::from_matches(matches)?.json(&value)
}

pub fn map_tree_command() -> Command {
    project_args(Command::new("map-tree").about("Print the map hierarchy as JSON"))
}

pub fn run_map_tree(matches: &ArgMatches) -> Result<()> {
    let session = open_session(matches)?;
    Output::from_matches(matches)?.json(&session.database().map_tree())
}

pub fn events_command() -> Command {
    project_args(
        Command::new("events")
            .about("Print the interpreted events of one map as JSON")
            .arg(
                Arg::new("map-id")
                    .required(true)
                    .value_name("MAP_ID")
                    .value_parser(clap::value_parser!(i64)),
            ),
    )
}

pub fn run_events(matches: &ArgMatches) -> Result<()> {
    let session = open_session(matches)?;
    let map_id = map_id(matches).context("missing map id")?;
    let Some(events) = session.interpret_map(map_id) else {
        bail!("map {} was not found", map_id);
    };
    Output::from_matches(matches)?.json(&events)
}

pub fn encyclopedia_command() -> Command {
    project_args(
        Command::new("encyclopedia")
            .about("Print weapons, armors, items, enemies and skills with readable traits"),
    )
}

pub fn run_encyclopedia(matches: &ArgMatches) -> Result<()> {
    let session = open_session(matches)?;
    Output::from_matches(matches)?.json(&build_encyclopedia(session.database()))
}

pub fn export_command() -> Command {
    project_args(
        Command::new("export")
            .about("Render a Markdown walkthrough of one map, or of every map in tree order")
            .arg(
                Arg::new("map-id")
                    .value_name("MAP_ID")
                    .value_parser(clap::value_parser!(i64)),
            )
            .arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .requires("map-id")
                    .help("Print the structured export of the map instead of Markdown."),
            ),
    )
}

pub fn run_export(matches: &ArgMatches) -> Result<()> {
    let session = open_session(matches)?;
    let exporter = MapExporter::for_session(&session);
    let mut output = Output::from_matches(matches)?;

    match map_id(matches) {
        Some(map_id) if matches.get_flag("json") => {
            let Some(export) = exporter.build_map_export(map_id) else {
                bail!("map {} was not found", map_id);
            };
            output.json(&export)
        }
        Some(map_id) => output.text(&exporter.export_markdown(&[map_id])),
        None => output.text(&exporter.export_all_markdown()),
    }
}
