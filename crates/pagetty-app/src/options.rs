use std::path::PathBuf;

use anyhow::{Result, bail};

pub const USAGE: &str = "\
usage: pagetty [--config FILE] [--script FILE] [--history-dir DIR] [--root DIR]

  --config FILE       terminal config (TOML)
  --script FILE       welcome script played before the first prompt
  --history-dir DIR   persist history under DIR
  --root DIR          directory that play/json/load read from (default: .)";

/// Command-line options.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub history_dir: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub help: bool,
}

/// Parse arguments (without the program name).
pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Options> {
    let mut opts = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "-h" | "--help" => {
                opts.help = true;
                continue;
            },
            "--config" => &mut opts.config,
            "--script" => &mut opts.script,
            "--history-dir" => &mut opts.history_dir,
            "--root" => &mut opts.root,
            other => bail!("unknown argument: {other}"),
        };
        match args.next() {
            Some(value) => *slot = Some(PathBuf::from(value)),
            None => bail!("{arg} needs a value"),
        }
    }
    Ok(opts)
}
