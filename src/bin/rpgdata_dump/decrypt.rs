use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use indoc::indoc;
use rpgdata::resource::PrepareStatus;
use rpgdata::{ExternalDecrypter, JavaDecrypter, ResourceSettings, prepare_resources};
use std::path::{Path, PathBuf};

use crate::output::{Output, output_args};

pub fn command() -> Command {
    output_args(
        Command::new("decrypt-resources")
            .about("Decrypt the obscured images and audio of a project into a cache directory")
            .long_about(indoc!(r#"
                Decrypt the obscured images and audio of a project into a cache directory.

                Every `.rpgmvp`, `.rpgmvo`, `.rpgmvm`, `.png_`, `.ogg_` and `.m4a_` file below
                the game root is decrypted with the `encryptionKey` of `System.json` into
                `<cache>/decrypted`, keeping the relative layout and restoring the real
                extension. The JSON report is printed when done.

                With `--java`, the Java RPG Maker MV Decrypter is used when the key is missing
                or some files fail. Its jar is taken from `RPGMV_JAVA_DECRYPTER_JAR`, or searched
                below the game root and the current directory.
            "#))
            .arg(
                Arg::new("root")
                    .long("root")
                    .short('r')
                    .required(true)
                    .value_name("DIR")
                    .help("The game root directory."),
            )
            .arg(
                Arg::new("data")
                    .long("data")
                    .short('d')
                    .value_name("DIR")
                    .help("The data directory holding System.json (default: <root>/www/data, else <root>/data)."),
            )
            .arg(
                Arg::new("cache")
                    .long("cache")
                    .short('c')
                    .value_name("DIR")
                    .help("Where decrypted files are written (default: <root>/data_cache)."),
            )
            .arg(
                Arg::new("num-threads")
                    .long("threads")
                    .short('t')
                    .default_value("0")
                    .value_parser(clap::value_parser!(usize))
                    .help("Sets the number of worker threads, defaults to number of CPU cores."),
            )
            .arg(
                Arg::new("no-verify-header")
                    .long("no-verify-header")
                    .action(ArgAction::SetTrue)
                    .help("Decrypt files even when their fake header does not carry the usual signature."),
            )
            .arg(
                Arg::new("java")
                    .long("java")
                    .action(ArgAction::SetTrue)
                    .help("Fall back to the Java decrypter when built-in decryption is not enough."),
            ),
    )
}

fn default_data_dir(root: &Path) -> PathBuf {
    let www = root.join("www").join("data");
    if www.is_dir() { www } else { root.join("data") }
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    let root = PathBuf::from(
        matches
            .get_one::<String>("root")
            .context("missing game root")?,
    );
    if !root.is_dir() {
        bail!("`{}` is not a directory", root.display());
    }
    let data = matches
        .get_one::<String>("data")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_data_dir(&root));
    let cache = matches
        .get_one::<String>("cache")
        .map(PathBuf::from)
        .unwrap_or_else(|| root.join("data_cache"));

    let num_threads = matches.get_one::<usize>("num-threads").copied().unwrap_or(0);
    let num_threads = match (cfg!(feature = "multithreading"), num_threads) {
        (true, number) => number,
        (false, 0 | 1) => 1,
        (false, _) => {
            eprintln!(
                "turned on threads, but library was compiled without `multithreading` feature! using fallback sync iterator"
            );
            1
        }
    };

    let settings = ResourceSettings::new()
        .num_threads(num_threads)
        .verify_header(!matches.get_flag("no-verify-header"));

    let java = matches.get_flag("java").then(|| {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        JavaDecrypter::discover(&[root.as_path(), cwd.as_path()])
    });
    let external = java.as_ref().map(|j| j as &dyn ExternalDecrypter);

    let report = prepare_resources(&root, &data, &cache, &settings, external);
    Output::from_matches(matches)?.json(&report)?;

    match report.status {
        PrepareStatus::Failed | PrepareStatus::KeyUnavailable => bail!("{}", report.message),
        _ => Ok(()),
    }
}
