//! The OG Xbox id database as a whole: loading, saving (with a timestamped
//! backup of whatever was there before) and the operations that need to see
//! every title at once, such as renaming a title id.

mod backup;
mod db;
pub mod error;

pub use crate::backup::backup_path;
pub use crate::db::{Database, Saved, default_icon_dir};
