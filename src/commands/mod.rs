//! Command implementations.
//!
//! Read-only commands open the database and print. Mutating commands open
//! it, apply one edit and save, which backs up the previous file first.

mod dlc;
mod hash;
mod icons;
mod known;
mod titles;
mod tu;

use crate::cli::{Cli, Commands};
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use titledb_config::Config;
use titledb_model::TitleId;
use titledb_store::{Database, default_icon_dir};

pub async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load().or_raise(|| ErrorKind::Config)?;
    let ctx = Context {
        config,
        db: cli.db,
        icon_dir: cli.icon_dir,
    };

    match cli.command {
        Commands::List { search } => titles::list(&ctx, search.as_deref()),
        Commands::Show { title_id } => titles::show(&ctx, &title_id),
        Commands::New { title_id, name } => titles::new(&ctx, title_id, &name),
        Commands::Rename { old, new } => titles::rename(&ctx, &old, new).await,
        Commands::SetName { title_id, name } => titles::set_name(&ctx, &title_id, &name),
        Commands::Dlc { command } => dlc::execute(&ctx, command),
        Commands::Tu { command } => tu::execute(&ctx, command),
        Commands::Known { command } => known::execute(&ctx, command).await,
        Commands::Validate => titles::validate(&ctx),
        Commands::Icon { title_id, output } => icons::icon(&ctx, &title_id, output.as_deref()).await,
        Commands::Prefetch => icons::prefetch(&ctx).await,
        Commands::Sha1 { file } => {
            println!("{}  {}", hash::sha1_file(&file).await?, file.display());
            Ok(())
        },
    }
}

pub(crate) struct Context {
    pub config: Config,
    db: Option<PathBuf>,
    icon_dir: Option<PathBuf>,
}

impl Context {
    pub fn database_path(&self) -> Result<PathBuf> {
        let working_dir = std::env::current_dir().or_raise(|| ErrorKind::Io(PathBuf::from(".")))?;
        self.config.database_path(self.db.as_deref(), &working_dir).ok_or_raise(|| ErrorKind::NoDatabase)
    }

    pub fn open(&self) -> Result<Database> {
        Database::open(self.database_path()?).or_raise(|| ErrorKind::Database)
    }

    /// Open, apply `edit`, and save if anything changed.
    pub fn edit<R>(&self, edit: impl FnOnce(&mut Database) -> Result<R>) -> Result<R> {
        let mut db = self.open()?;
        let result = edit(&mut db)?;
        if db.is_dirty() {
            let saved = db.save(None).or_raise(|| ErrorKind::Database)?;
            if let Some(backup) = saved.backup {
                tracing::info!(backup = %backup.display(), "Previous database backed up");
            }
        }
        Ok(result)
    }

    /// `--icon-dir`, then `icons.cache_dir`, then `data/icons` next to the
    /// database.
    pub fn icon_dir(&self, database: &Path) -> PathBuf {
        self.icon_dir
            .clone()
            .or_else(|| self.config.icons.cache_dir.clone())
            .unwrap_or_else(|| default_icon_dir(database))
    }
}

/// Apply a record edit, turning an unknown title into a readable error.
pub(crate) fn update<R>(
    db: &mut Database,
    title_id: &TitleId,
    edit: impl FnOnce(&mut titledb_model::TitleRecord) -> R,
) -> Result<R> {
    if db.title(title_id).is_none() {
        exn::bail!(ErrorKind::NotFound {
            kind: "TitleID",
            value: title_id.to_string(),
        });
    }
    db.update(title_id, edit).or_raise(|| ErrorKind::Database)
}
