use crate::ids::ContentId;
use derive_more::Display;

/// A soft-invariant violation found by validation.
///
/// Issues are reported, never enforced: the database loads and saves fine
/// with any number of them.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Issue {
    /// DLC content id not prefixed by its owning title id.
    #[display("ContentID does not start with TitleID: {_0}")]
    ContentIdPrefix(ContentId),
    /// Archived entry for a content id that isn't in the DLC list.
    #[display("Archived entry not in Content IDs: {_0}")]
    ArchivedNotInContentIds(ContentId),
}
