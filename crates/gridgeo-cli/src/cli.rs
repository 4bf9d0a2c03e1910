use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gridgeo", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides the config file)
    #[arg(long)]
    pub log_level: Option<tracing::Level>,

    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve substation positions
    Substations(QueryArgs),
    /// Resolve line paths
    Lines(QueryArgs),
    /// Save known positions into a store snapshot
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Neighbor graph statistics
    Graph {
        /// Network snapshot (JSON)
        #[arg(long)]
        network: Option<PathBuf>,
        /// Restrict to substations of these countries
        #[arg(long = "country", value_delimiter = ',')]
        countries: Vec<String>,
    },
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("scope").required(true).args(["countries", "ids"])))]
pub struct QueryArgs {
    /// Network snapshot (JSON); defaults to `[data] network`
    #[arg(long)]
    pub network: Option<PathBuf>,
    /// Store snapshot; defaults to `[data] store`
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Countries to resolve (ISO alpha-2, repeatable or comma separated)
    #[arg(long = "country", value_delimiter = ',')]
    pub countries: Vec<String>,
    /// Ids to resolve (repeatable or comma separated)
    #[arg(long = "id", value_delimiter = ',')]
    pub ids: Vec<String>,
    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Import substation positions from a JSON array
    Substations {
        /// Store snapshot to update; defaults to `[data] store`
        #[arg(long)]
        store: Option<PathBuf>,
        /// Input file
        file: PathBuf,
    },
    /// Import line pylons from a JSON array
    Lines {
        /// Store snapshot to update; defaults to `[data] store`
        #[arg(long)]
        store: Option<PathBuf>,
        /// Input file
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn country_and_id_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "gridgeo", "substations", "--network", "n.json", "--country", "FR", "--id", "S1",
        ]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["gridgeo", "lines", "--network", "n.json"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn countries_accept_comma_lists() {
        let cli = Cli::try_parse_from([
            "gridgeo", "substations", "--network", "n.json", "--country", "FR,BE",
        ])
        .unwrap();
        match cli.command {
            Commands::Substations(args) => assert_eq!(args.countries, vec!["FR", "BE"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
