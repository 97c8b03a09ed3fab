use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use indoc::indoc;
use log::info;
use rpgdata::RgssArchive;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use crate::output::confirm;

pub fn command() -> Command {
    Command::new("archive")
        .about("List or extract the contents of an RGSSAD archive")
        .long_about(indoc!(r#"
            List or extract the contents of an RGSSAD archive
            (`Game.rgssad`, `Game.rgss2a` or `Game.rgss3a`).

            Entry names use `\` as separator inside the archive; extracted files are
            written with the platform separator below the output directory.
        "#))
        .subcommand_required(true)
        .subcommand(
            Command::new("list")
                .about("Print every entry with its size")
                .arg(Arg::new("archive").required(true).value_name("ARCHIVE")),
        )
        .subcommand(
            Command::new("extract")
                .about("Decrypt every entry into a directory")
                .arg(Arg::new("archive").required(true).value_name("ARCHIVE"))
                .arg(
                    Arg::new("output-dir")
                        .long("output-dir")
                        .short('o')
                        .required(true)
                        .value_name("DIR")
                        .help("Directory to write extracted entries into."),
                )
                .arg(
                    Arg::new("no-confirm-overwrite")
                        .long("no-confirm-overwrite")
                        .action(ArgAction::SetTrue)
                        .help("When set, will not ask for confirmation before writing into a non-empty directory."),
                ),
        )
}

fn open(matches: &ArgMatches) -> Result<RgssArchive> {
    let path = matches
        .get_one::<String>("archive")
        .context("missing archive path")?;
    RgssArchive::open(path).with_context(|| format!("Failed to open archive `{}`", path))
}

/// Maps `Data\Map001.rvdata2` below `root`, dropping any component that would escape it.
fn entry_path(root: &Path, name: &str) -> PathBuf {
    let relative: PathBuf = Path::new(&name.replace('\\', "/"))
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    root.join(relative)
}

fn list(matches: &ArgMatches) -> Result<()> {
    let archive = open(matches)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "# {:?}, {} entries", archive.version(), archive.len())?;
    for entry in archive.entries() {
        writeln!(out, "{}\t{}", entry.name, entry.size)?;
    }
    Ok(())
}

fn extract(matches: &ArgMatches) -> Result<()> {
    let archive = open(matches)?;
    let output_dir = PathBuf::from(
        matches
            .get_one::<String>("output-dir")
            .context("missing output directory")?,
    );

    let non_empty = fs::read_dir(&output_dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if non_empty {
        confirm(
            !matches.get_flag("no-confirm-overwrite"),
            &format!(
                "{} is not empty, existing files may be overwritten. Continue?",
                output_dir.display()
            ),
        )?;
    }

    for entry in archive.entries() {
        let target = entry_path(&output_dir, &entry.name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create `{}`", parent.display()))?;
        }
        let data = archive
            .read(entry)
            .with_context(|| format!("Failed to read entry `{}`", entry.name))?;
        fs::write(&target, data).with_context(|| format!("cannot write `{}`", target.display()))?;
    }

    info!(
        "extracted {} entries into `{}`",
        archive.len(),
        output_dir.display()
    );
    Ok(())
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("list", sub)) => list(sub),
        Some(("extract", sub)) => extract(sub),
        _ => unreachable!("a subcommand is required"),
    }
}
