use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// `--output`, `--no-confirm-overwrite` and `--no-indent`.
pub fn output_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("output-target")
            .long("output")
            .short('f')
            .value_name("FILE")
            .help("Writes output to the file specified instead of stdout, errors will still be printed to stderr. \
                   Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`. \
                   Will create parent directories if needed."),
    )
    .arg(
        Arg::new("no-confirm-overwrite")
            .long("no-confirm-overwrite")
            .action(ArgAction::SetTrue)
            .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
    )
    .arg(
        Arg::new("no-indent")
            .long("no-indent")
            .action(ArgAction::SetTrue)
            .help("When set, JSON output will not be indented."),
    )
}

/// Asks before touching `what`, unless prompting is disabled.
pub fn confirm(prompt: bool, what: &str) -> Result<()> {
    if !prompt {
        return Ok(());
    }
    let accepted = Confirm::new()
        .with_prompt(what)
        .default(false)
        .interact()
        .context("Failed to write confirmation prompt to term")?;
    if !accepted {
        bail!("Cancelled");
    }
    Ok(())
}

/// If `prompt` is passed, will display a confirmation prompt before overwriting files.
pub fn create_output_file(path: &Path, prompt: bool) -> Result<File> {
    if path.is_dir() {
        bail!(
            "There is a directory at {}, refusing to overwrite",
            path.display()
        );
    }

    if path.exists() {
        confirm(
            prompt,
            &format!(
                "Are you sure you want to override output file at {}",
                path.display()
            ),
        )?;
    } else if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create `{}`", parent.display()))?;
    }

    File::create(path).with_context(|| format!("cannot create `{}`", path.display()))
}

/// Where a subcommand writes its result.
pub struct Output {
    target: Box<dyn Write>,
    indent: bool,
}

impl Output {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let target: Box<dyn Write> = match matches.get_one::<String>("output-target") {
            Some(path) => Box::new(create_output_file(
                Path::new(path),
                !matches.get_flag("no-confirm-overwrite"),
            )?),
            None => Box::new(io::stdout()),
        };
        Ok(Output {
            target,
            indent: !matches.get_flag("no-indent"),
        })
    }

    pub fn json(&mut self, value: &impl Serialize) -> Result<()> {
        let text = if self.indent {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        self.text(&text)
    }

    pub fn text(&mut self, text: &str) -> Result<()> {
        writeln!(self.target, "{}", text.trim_end_matches('\n'))?;
        self.target.flush()?;
        Ok(())
    }
}
