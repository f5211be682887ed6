//! Title records for the OG Xbox `id_database.json`.
//!
//! The file maps 8-hex title ids to a title name, DLC content ids, title-update
//! ids, labels for known title-update hashes and names of archived DLC. This
//! crate provides:
//! - [`hex`]: normalization of whatever the file (or the user) supplies into
//!   canonical fixed-width lowercase hex,
//! - [`TitleId`], [`ContentId`], [`TuId`] and [`Sha1Hex`]: identifiers that
//!   can only hold canonical text,
//! - [`TitleRecord`]: the in-memory model and its conversion to and from the
//!   on-disk shape in [`raw`].

pub mod error;
pub mod hex;
mod ids;
mod issue;
pub mod raw;
mod record;

pub use crate::ids::{ContentId, Sha1Hex, TitleId, TuId};
pub use crate::issue::Issue;
pub use crate::record::TitleRecord;
