//! Command-line interface definition.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use titledb_model::{ContentId, Sha1Hex, TitleId, TuId};

#[derive(Parser)]
#[command(name = "titledb")]
#[command(about = "Edit the OG Xbox title id database and browse its icons", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database file (defaults to the configured one, then ./id_database.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Icon cache folder (defaults to data/icons next to the database)
    #[arg(long, global = true, value_name = "DIR")]
    pub icon_dir: Option<PathBuf>,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List titles
    List {
        /// Only titles whose name or id contains this (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show everything recorded for one title
    Show {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
    },

    /// Add a new title
    New {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Change a title's id; its cached icon follows
    Rename {
        #[arg(value_parser = parse_id::<TitleId>)]
        old: TitleId,
        #[arg(value_parser = parse_id::<TitleId>)]
        new: TitleId,
    },

    /// Change a title's name
    SetName {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        name: String,
    },

    /// Downloadable content
    Dlc {
        #[command(subcommand)]
        command: DlcCommands,
    },

    /// Title updates
    Tu {
        #[command(subcommand)]
        command: TuCommands,
    },

    /// Labels for known title-update files, keyed by SHA1
    Known {
        #[command(subcommand)]
        command: KnownCommands,
    },

    /// Report content ids outside their title's namespace and orphaned
    /// archive entries
    Validate,

    /// Fetch (or read from cache) a title's icon
    Icon {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        /// Also copy the icon here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download every icon missing from the cache
    Prefetch,

    /// Print the SHA1 of a file
    Sha1 { file: PathBuf },
}

#[derive(Subcommand)]
pub enum DlcCommands {
    /// Add a content id (the next free one in the title's namespace if omitted)
    Add {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<ContentId>)]
        content_id: Option<ContentId>,
    },
    /// Remove a content id and its archive entry
    Remove {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<ContentId>)]
        content_id: ContentId,
    },
    /// Replace one content id with another
    Replace {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<ContentId>)]
        old: ContentId,
        #[arg(value_parser = parse_id::<ContentId>)]
        new: ContentId,
    },
    /// Mark a content id as archived
    Archive {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<ContentId>)]
        content_id: ContentId,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Remove the archived mark from a content id
    Unarchive {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<ContentId>)]
        content_id: ContentId,
    },
}

#[derive(Subcommand)]
pub enum TuCommands {
    Add {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<TuId>)]
        tu_id: TuId,
    },
    Remove {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<TuId>)]
        tu_id: TuId,
    },
    Replace {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<TuId>)]
        old: TuId,
        #[arg(value_parser = parse_id::<TuId>)]
        new: TuId,
    },
}

#[derive(Subcommand)]
pub enum KnownCommands {
    /// Label a known update. Without --sha or --file a placeholder SHA1 is
    /// used, to be renamed once the real one is known.
    Set {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        label: String,
        #[arg(long, value_parser = parse_id::<Sha1Hex>, conflicts_with = "file")]
        sha: Option<Sha1Hex>,
        /// Hash this file and use its SHA1
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Remove {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<Sha1Hex>)]
        sha: Sha1Hex,
    },
    Rename {
        #[arg(value_parser = parse_id::<TitleId>)]
        title_id: TitleId,
        #[arg(value_parser = parse_id::<Sha1Hex>)]
        old: Sha1Hex,
        #[arg(value_parser = parse_id::<Sha1Hex>)]
        new: Sha1Hex,
    },
}

/// Strict id parsing for clap, which wants an error it can print.
fn parse_id<T>(value: &str) -> Result<T, String>
where
    T: FromStr<Err = titledb_model::error::Error>,
{
    value.parse().map_err(|e: titledb_model::error::Error| (*e).to_string())
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
    fn test_parse_ids() {
        let cli = Cli::try_parse_from(["titledb", "--db", "db.json", "dlc", "add", "0x4541000D"]).unwrap();
        let Commands::Dlc {
            command: DlcCommands::Add { title_id, content_id },
        } = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(title_id.as_str(), "4541000d");
        assert!(content_id.is_none());
        assert_eq!(cli.db, Some(PathBuf::from("db.json")));
    }

    #[test]
    fn test_rejects_short_ids() {
        assert!(Cli::try_parse_from(["titledb", "show", "ab"]).is_err());
        assert!(Cli::try_parse_from(["titledb", "tu", "add", "4541000d", "1"]).is_err());
    }

    #[test]
    fn test_known_set_sources_conflict() {
        let sha = "a9993e364706816aba3e25717850c26c9cd0d89d";
        let args = ["titledb", "known", "set", "4541000d", "v1", "--sha", sha, "--file", "x.xbe"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["titledb", "-vv", "validate"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
