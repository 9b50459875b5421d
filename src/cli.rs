use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every configured author's publications and write one HTML file per year
    Build {
        #[command(flatten)]
        config: ConfigArgs,
        /// Do not draw a progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Resolve the configured names to provider identities and print them
    Resolve {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Options shared by every command. Anything given here overrides the value
/// loaded from `--config`, which in turn overrides the built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Person to look up; repeat to build a list (replaces the configured list)
    #[arg(short, long = "person", value_name = "NAME")]
    pub people: Vec<String>,

    /// Institutional qualifier appended to every author query
    #[arg(long, value_name = "TEXT")]
    pub affiliation: Option<String>,

    /// Directory the year files are written into
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Publications from this year or earlier are discarded
    #[arg(long, value_name = "YEAR")]
    pub min_year: Option<i32>,

    /// Root URL of the provider (e.g. a mirror)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Proxy for all provider requests (http://, socks5://)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip repeated publications (same title and year) within one run
    #[arg(long)]
    pub dedupe: bool,
}

impl ConfigArgs {
    /// Layer the command line over the file (or default) configuration.
    pub fn load(&self) -> anyhow::Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if !self.people.is_empty() {
            cfg.people = self.people.clone();
        }
        if let Some(affiliation) = &self.affiliation {
            cfg.affiliation = affiliation.clone();
        }
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if let Some(year) = self.min_year {
            cfg.min_year = year;
        }
        if let Some(base) = &self.base_url {
            cfg.base_url = base.clone();
        }
        if self.proxy.is_some() {
            cfg.proxy = self.proxy.clone();
        }
        if self.timeout.is_some() {
            cfg.timeout_secs = self.timeout;
        }
        if self.dedupe {
            cfg.dedupe = true;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pubpages").chain(args.iter().copied()))
            .expect("args should parse")
    }

    fn config_args(cli: Cli) -> ConfigArgs {
        match cli.command {
            Command::Build { config, .. } | Command::Resolve { config } | Command::Config { config } => {
                config
            }
        }
    }

    #[test]
    fn repeated_person_flags_keep_order() {
        let cli = parse(&["build", "-p", "Alex Saywell", "--person", "Peter Beton"]);
        let cfg = config_args(cli).load().expect("config");
        assert_eq!(cfg.people, vec!["Alex Saywell", "Peter Beton"]);
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = NamedTempFile::new().expect("tmp file");
        write!(
            file,
            r#"{{"people": ["Someone Else"], "min_year": 2000, "affiliation": "Leeds"}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&["config", "--config", &path, "--min-year", "2016"]);
        let cfg = config_args(cli).load().expect("config");
        assert_eq!(cfg.min_year, 2016);
        assert_eq!(cfg.affiliation, "Leeds");
        assert_eq!(cfg.people, vec!["Someone Else"]);
    }

    #[test]
    fn verbosity_counts() {
        let cli = parse(&["-vv", "resolve"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn non_numeric_min_year_is_rejected() {
        let res = Cli::try_parse_from(["pubpages", "build", "--min-year", "soon"]);
        assert!(res.is_err());
    }

    #[test]
    fn blank_person_fails_validation() {
        let cli = parse(&["build", "--person", "  "]);
        assert!(config_args(cli).load().is_err());
    }
}
