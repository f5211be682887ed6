use crate::error::{ErrorKind, Result};
use crate::ids::{ContentId, Sha1Hex, TitleId, TuId};
use crate::issue::Issue;
use crate::raw::{
    KEY_ARCHIVED, KEY_CONTENT_IDS, KEY_KNOWN_UPDATES, KEY_TITLE_NAME, KEY_TITLE_UPDATES, RawTitle, list_field,
    unwrap_singleton, wrap_singleton,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Upper bound on candidates tried by [`TitleRecord::next_free_known_sha`].
const MAX_KNOWN_PLACEHOLDERS: u64 = 9999;

/// One title and everything attached to it: DLC content ids, title-update
/// ids, labels for known update hashes and names of archived DLC.
///
/// Every identifier is canonical by construction, and the collections are
/// ordered so that serialization is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRecord {
    pub title_id: TitleId,
    pub title_name: String,
    pub content_ids: BTreeSet<ContentId>,
    pub title_updates: BTreeSet<TuId>,
    /// SHA1 of a title-update file → label (usually `<tuid>:<description>`).
    pub known_updates: BTreeMap<Sha1Hex, String>,
    /// Archived DLC → display name. Keys are expected to be in `content_ids`.
    pub archived: BTreeMap<ContentId, String>,
}

impl TitleRecord {
    /// An empty record.
    pub fn new(title_id: TitleId, title_name: impl Into<String>) -> Self {
        Self {
            title_id,
            title_name: title_name.into(),
            content_ids: BTreeSet::new(),
            title_updates: BTreeSet::new(),
            known_updates: BTreeMap::new(),
            archived: BTreeMap::new(),
        }
    }

    /// Build a record from one entry of the `Titles` object.
    ///
    /// Normalization is lenient: malformed ids are dropped one by one, a
    /// non-object entry gives an empty record. Returns `None` only when the
    /// title id itself has nothing hex-like in it.
    pub fn from_raw(title_id: &str, raw: &Value) -> Option<Self> {
        let title_id = TitleId::normalize(title_id)?;
        let empty = Map::new();
        let object = raw.as_object().unwrap_or(&empty);

        let title_name = match object.get(KEY_TITLE_NAME) {
            Some(Value::String(name)) => name.clone(),
            _ => String::new(),
        };
        let content_ids = list_field(object, KEY_CONTENT_IDS).iter().filter_map(ContentId::normalize_value).collect();
        let title_updates = list_field(object, KEY_TITLE_UPDATES).iter().filter_map(TuId::normalize_value).collect();
        let known_updates = unwrap_singleton(object.get(KEY_KNOWN_UPDATES))
            .into_iter()
            .filter_map(|(sha, label)| Some((Sha1Hex::normalize(sha)?, label)))
            .collect();
        let archived = unwrap_singleton(object.get(KEY_ARCHIVED))
            .into_iter()
            .filter_map(|(cid, name)| Some((ContentId::normalize(cid)?, name)))
            .collect();

        Some(Self {
            title_id,
            title_name,
            content_ids,
            title_updates,
            known_updates,
            archived,
        })
    }

    /// The on-disk shape of this record.
    pub fn to_raw(&self) -> RawTitle {
        RawTitle {
            title_name: self.title_name.clone(),
            content_ids: self.content_ids.iter().map(ToString::to_string).collect(),
            title_updates: self.title_updates.iter().map(ToString::to_string).collect(),
            known_updates: wrap_singleton(strings_of(&self.known_updates)),
            archived: wrap_singleton(strings_of(&self.archived)),
        }
    }

    /// `"<name> (<id>)"`, or only the id for unnamed titles.
    pub fn display_name(&self) -> String {
        match self.title_name.is_empty() {
            true => self.title_id.to_string(),
            false => format!("{} ({})", self.title_name, self.title_id),
        }
    }

    /// Case-insensitive match on the display name (which includes the id).
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty() || self.display_name().to_lowercase().contains(&query)
    }

    pub fn set_name(&mut self, name: impl AsRef<str>) {
        self.title_name = name.as_ref().trim().to_string();
    }

    // =========================================================================
    // DLC
    // =========================================================================

    /// First `<title id><n:08x>` content id not already in use.
    pub fn next_free_content_id(&self) -> Option<ContentId> {
        (0..=u32::MAX).map(|n| self.title_id.content_id(n)).find(|cid| !self.content_ids.contains(cid))
    }

    /// Returns `false` if the id was already present.
    pub fn add_content_id(&mut self, content_id: ContentId) -> bool {
        self.content_ids.insert(content_id)
    }

    /// Removes the id and any archived name for it.
    pub fn remove_content_id(&mut self, content_id: &ContentId) -> bool {
        self.archived.remove(content_id);
        self.content_ids.remove(content_id)
    }

    /// Swap one content id for another. An archived name follows the id
    /// unless the new id already has one, in which case the old entry is
    /// discarded.
    pub fn replace_content_id(&mut self, old: &ContentId, new: ContentId) {
        if old == &new {
            return;
        }
        self.content_ids.remove(old);
        if let Some(name) = self.archived.remove(old) {
            self.archived.entry(new.clone()).or_insert(name);
        }
        self.content_ids.insert(new);
    }

    /// Archive a DLC under a display name, or unarchive it with `None`.
    pub fn set_archived(&mut self, content_id: &ContentId, name: Option<String>) {
        match name {
            Some(name) => {
                self.archived.insert(content_id.clone(), name.trim().to_string());
            },
            None => {
                self.archived.remove(content_id);
            },
        }
    }

    // =========================================================================
    // Title updates
    // =========================================================================

    pub fn add_title_update(&mut self, tu_id: TuId) -> bool {
        self.title_updates.insert(tu_id)
    }

    pub fn remove_title_update(&mut self, tu_id: &TuId) -> bool {
        self.title_updates.remove(tu_id)
    }

    pub fn replace_title_update(&mut self, old: &TuId, new: TuId) {
        self.title_updates.remove(old);
        self.title_updates.insert(new);
    }

    // =========================================================================
    // Known updates
    // =========================================================================

    /// A placeholder SHA1 (all zeroes, then `..01`, `..02`, ...) for a new
    /// known-update entry that the user fills in afterwards.
    pub fn next_free_known_sha(&self) -> Option<Sha1Hex> {
        (0..=MAX_KNOWN_PLACEHOLDERS).map(Sha1Hex::from_int).find(|sha| !self.known_updates.contains_key(sha))
    }

    pub fn set_known(&mut self, sha: Sha1Hex, label: impl AsRef<str>) {
        self.known_updates.insert(sha, label.as_ref().trim().to_string());
    }

    pub fn remove_known(&mut self, sha: &Sha1Hex) -> Option<String> {
        self.known_updates.remove(sha)
    }

    /// Re-key a known update. Refuses to overwrite an existing entry.
    pub fn rename_known(&mut self, old: &Sha1Hex, new: Sha1Hex) -> Result<()> {
        if old == &new {
            return Ok(());
        }
        if self.known_updates.contains_key(&new) {
            exn::bail!(ErrorKind::Conflict {
                kind: Sha1Hex::KIND,
                value: new.to_string(),
            });
        }
        if let Some(label) = self.known_updates.remove(old) {
            self.known_updates.insert(new, label);
        }
        Ok(())
    }

    /// Known updates in display order: by label (case-insensitive), then SHA1.
    pub fn known_sorted(&self) -> Vec<(&Sha1Hex, &str)> {
        let mut known: Vec<_> = self.known_updates.iter().map(|(sha, label)| (sha, label.as_str())).collect();
        known.sort_by(|a, b| a.1.to_lowercase().cmp(&b.1.to_lowercase()).then_with(|| a.0.cmp(b.0)));
        known
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Soft-invariant violations worth reporting. Never fatal.
    pub fn issues(&self) -> Vec<Issue> {
        let prefix = self
            .content_ids
            .iter()
            .filter(|cid| !cid.belongs_to(&self.title_id))
            .map(|cid| Issue::ContentIdPrefix(cid.clone()));
        let orphaned = self
            .archived
            .keys()
            .filter(|cid| !self.content_ids.contains(*cid))
            .map(|cid| Issue::ArchivedNotInContentIds(cid.clone()));
        prefix.chain(orphaned).collect()
    }
}

fn strings_of<K: ToString>(map: &BTreeMap<K, String>) -> BTreeMap<String, String> {
    map.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

impl From<&TitleRecord> for RawTitle {
    fn from(record: &TitleRecord) -> Self {
        record.to_raw()
    }
}
