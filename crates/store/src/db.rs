use crate::backup::backup;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use titledb_model::raw::{KEY_TITLES, RawDatabase};
use titledb_model::{Issue, TitleId, TitleRecord};
use tracing::instrument;

/// Outcome of a successful [`Database::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    /// Where the database was written.
    pub path: PathBuf,
    /// Copy of the previous file, if there was one and copying worked.
    pub backup: Option<PathBuf>,
}

/// The whole id database, keyed by title id.
///
/// Owns every [`TitleRecord`]; records are only reachable through their key,
/// which is why renaming a title is an operation on the database rather than
/// on the record. Mutations made through the database mark it dirty until the
/// next successful [`load()`](Self::load) or [`save()`](Self::save).
#[derive(Debug, Default)]
pub struct Database {
    path: Option<PathBuf>,
    dirty: bool,
    titles: BTreeMap<TitleId, TitleRecord>,
}

impl Database {
    /// An empty database with no path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a database from `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut db = Self::new();
        db.load(path)?;
        Ok(db)
    }

    /// Replace the in-memory titles with the contents of `path`.
    ///
    /// Aborts (leaving the current state untouched) if the file can't be read,
    /// isn't JSON, or has no top-level `Titles` object. Inside that object
    /// loading is forgiving: entries whose id has no hex digits are skipped
    /// and malformed ids inside an entry are dropped.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = fs::read(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        let document: Value = serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Format)?;
        let Some(Value::Object(raw_titles)) = document.get(KEY_TITLES) else {
            exn::bail!(ErrorKind::Format);
        };

        let mut titles = BTreeMap::new();
        let mut skipped = 0usize;
        for (title_id, raw) in raw_titles {
            match TitleRecord::from_raw(title_id, raw) {
                // Two spellings of the same id (e.g. different case): the later one in the file wins.
                Some(record) => {
                    titles.insert(record.title_id.clone(), record);
                },
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "Skipped entries without a usable TitleID");
        }
        tracing::info!(titles = titles.len(), "Loaded id database");

        self.titles = titles;
        self.path = Some(path.to_path_buf());
        self.dirty = false;
        Ok(())
    }

    /// Write the database to `path`, or to the last loaded/saved path.
    ///
    /// An existing file is first copied to `<path>.bak-<YYYYMMDD-HHMMSS>`; if
    /// that copy fails the failure is logged and the save goes ahead anyway.
    #[instrument(skip_all)]
    pub fn save(&mut self, path: Option<&Path>) -> Result<Saved> {
        let Some(path) = path.map(Path::to_path_buf).or_else(|| self.path.clone()) else {
            exn::bail!(ErrorKind::NoPath);
        };

        let backup = match path.exists() {
            true => match backup(&path) {
                Ok(backup) => Some(backup),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = ?e, "Backup failed; saving anyway");
                    None
                },
            },
            false => None,
        };

        let document = RawDatabase {
            titles: self.titles.iter().map(|(title_id, record)| (title_id.to_string(), record.to_raw())).collect(),
        };
        let json = serde_json::to_string_pretty(&document).or_raise(|| ErrorKind::Serialize)?;
        fs::write(&path, json).or_raise(|| ErrorKind::Io(path.clone()))?;
        tracing::info!(path = %path.display(), titles = self.titles.len(), "Saved id database");

        self.path = Some(path.clone());
        self.dirty = false;
        Ok(Saved { path, backup })
    }

    /// Last loaded or saved location.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether there are changes since the last load or save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn title(&self, title_id: &TitleId) -> Option<&TitleRecord> {
        self.titles.get(title_id)
    }

    /// All titles, ordered by id.
    pub fn titles(&self) -> impl Iterator<Item = &TitleRecord> {
        self.titles.values()
    }

    /// All title ids, ordered.
    pub fn title_ids(&self) -> Vec<TitleId> {
        self.titles.keys().cloned().collect()
    }

    /// Titles whose display name (`"<name> (<id>)"`) contains `query`,
    /// ignoring case. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&TitleRecord> {
        self.titles.values().filter(|record| record.matches(query)).collect()
    }

    /// Get a title, creating an empty one if it doesn't exist yet.
    ///
    /// The id is normalized leniently (`"ab"` becomes `000000ab`); an id with
    /// no hex digits at all is rejected.
    pub fn ensure_title(&mut self, title_id: &str) -> Result<&TitleRecord> {
        let Some(normalized) = TitleId::normalize(title_id) else {
            exn::bail!(ErrorKind::InvalidTitleId(title_id.to_string()));
        };
        let record = match self.titles.entry(normalized) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let record = TitleRecord::new(entry.key().clone(), "");
                self.dirty = true;
                entry.insert(record)
            },
        };
        Ok(record)
    }

    /// Add a brand new title. Fails if the id is taken.
    pub fn create_title(&mut self, title_id: TitleId, title_name: &str) -> Result<&TitleRecord> {
        match self.titles.entry(title_id) {
            Entry::Occupied(entry) => exn::bail!(ErrorKind::TitleExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                let record = TitleRecord::new(entry.key().clone(), title_name.trim());
                self.dirty = true;
                Ok(entry.insert(record))
            },
        }
    }

    /// Move a title to a new id, leaving everything else about it untouched.
    pub fn rename_title(&mut self, old: &TitleId, new: TitleId) -> Result<()> {
        if !self.titles.contains_key(old) {
            exn::bail!(ErrorKind::TitleNotFound(old.clone()));
        }
        if old == &new {
            return Ok(());
        }
        if self.titles.contains_key(&new) {
            exn::bail!(ErrorKind::TitleExists(new));
        }
        if let Some(mut record) = self.titles.remove(old) {
            record.title_id = new.clone();
            self.titles.insert(new, record);
            self.dirty = true;
        }
        Ok(())
    }

    /// Apply an edit to one title and mark the database dirty.
    ///
    /// ```
    /// # use titledb_store::Database;
    /// # use titledb_model::TitleId;
    /// let mut db = Database::new();
    /// let title_id: TitleId = "4541000d".parse().unwrap();
    /// db.create_title(title_id.clone(), "Halo").unwrap();
    /// let content_id = db.update(&title_id, |record| {
    ///     let content_id = record.next_free_content_id().unwrap();
    ///     record.add_content_id(content_id.clone());
    ///     content_id
    /// }).unwrap();
    /// assert_eq!(content_id.as_str(), "4541000d00000000");
    /// ```
    pub fn update<R>(&mut self, title_id: &TitleId, edit: impl FnOnce(&mut TitleRecord) -> R) -> Result<R> {
        let Some(record) = self.titles.get_mut(title_id) else {
            exn::bail!(ErrorKind::TitleNotFound(title_id.clone()));
        };
        let result = edit(record);
        self.dirty = true;
        Ok(result)
    }

    /// Every soft-invariant violation in the database, by title.
    pub fn validate(&self) -> Vec<(&TitleRecord, Issue)> {
        self.titles.values().flat_map(|record| record.issues().into_iter().map(move |issue| (record, issue))).collect()
    }

    /// Default icon cache location: `<dir-of-database>/data/icons`.
    pub fn default_icon_dir(&self) -> Option<PathBuf> {
        self.path.as_deref().map(default_icon_dir)
    }
}

/// `<dir-of-database>/data/icons`, resolving a relative database path against
/// the working directory.
pub fn default_icon_dir(database: &Path) -> PathBuf {
    let absolute = std::path::absolute(database).unwrap_or_else(|_| database.to_path_buf());
    let base = absolute.parent().map(Path::to_path_buf).unwrap_or_default();
    base.join("data").join("icons")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use titledb_model::ContentId;

    const SAMPLE: &str = r#"{
  "Titles": {
    "4541000D": {
      "Title Name": "Halo: Combat Evolved",
      "Content IDs": ["4541000D00000001", "4541000d00000001"],
      "Title Updates": ["0000000000000001"],
      "Title Updates Known": [{"0000000000000000000000000000000000000abc": "0000000000000001:v1.01"}],
      "Archived": []
    },
    "nothing": {"Title Name": "Skipped"},
    "4d530004": {"Title Name": "Pokémon"}
  }
}"#;

    fn tid(s: &str) -> TitleId {
        s.parse().unwrap()
    }

    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("id_database.json");
        fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn test_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_sample(temp_dir.path());
        let db = Database::open(&path).unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.path(), Some(path.as_path()));
        assert!(!db.is_dirty());
        let halo = db.title(&tid("4541000d")).unwrap();
        assert_eq!(halo.title_name, "Halo: Combat Evolved");
        assert_eq!(halo.content_ids.len(), 1);
        assert_eq!(db.title(&tid("4d530004")).unwrap().title_name, "Pokémon");
    }

    #[rstest]
    #[case::wrong_key(r#"{"titles": {}}"#)]
    #[case::titles_list(r#"{"Titles": []}"#)]
    #[case::top_level_array("[1, 2, 3]")]
    #[case::garbage("this is not json")]
    fn test_load_rejects_wrong_shape(#[case] contents: &str) {
        let temp_dir = tempfile::tempdir().unwrap();
        let good = write_sample(temp_dir.path());
        let mut db = Database::open(&good).unwrap();

        let path = temp_dir.path().join("bad.json");
        fs::write(&path, contents).unwrap();
        let err = db.load(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Format));
        // A failed load leaves the previous state alone.
        assert_eq!(db.len(), 2);
        assert_eq!(db.path(), Some(good.as_path()));
    }

    #[rstest]
    #[case::lower_first(r#"{"Titles": {"4541000d": {"Title Name": "B"}, "4541000D": {"Title Name": "A"}}}"#, "A")]
    #[case::upper_first(r#"{"Titles": {"4541000D": {"Title Name": "A"}, "4541000d": {"Title Name": "B"}}}"#, "B")]
    fn test_load_title_collision_keeps_file_order(#[case] contents: &str, #[case] expected: &str) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("id_database.json");
        fs::write(&path, contents).unwrap();
        let db = Database::open(&path).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.title(&tid("4541000d")).unwrap().title_name, expected);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = Database::open(temp_dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }

    #[test]
    fn test_save_without_path() {
        let mut db = Database::new();
        let err = db.save(None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoPath));
    }

    #[test]
    fn test_save_creates_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_sample(temp_dir.path());
        let mut db = Database::open(&path).unwrap();
        db.update(&tid("4541000d"), |record| record.set_name("Halo")).unwrap();
        let saved = db.save(None).unwrap();

        let backup = saved.backup.unwrap();
        assert!(backup.file_name().unwrap().to_string_lossy().starts_with("id_database.json.bak-"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), SAMPLE);
        assert_ne!(fs::read_to_string(&path).unwrap(), SAMPLE);
        assert!(!db.is_dirty());
    }

    #[test]
    fn test_save_new_file_has_no_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut db = Database::new();
        db.ensure_title("4541000d").unwrap();
        let path = temp_dir.path().join("fresh.json");
        let saved = db.save(Some(&path)).unwrap();
        assert_eq!(saved.backup, None);
        assert_eq!(db.path(), Some(path.as_path()));
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_output_shape() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_sample(temp_dir.path());
        let mut db = Database::open(&path).unwrap();
        db.save(None).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        // Pretty printed, two-space indent, Unicode left alone.
        assert!(text.starts_with("{\n  \"Titles\": {\n    \"4541000d\": {\n      \"Title Name\""));
        assert!(text.contains("Pokémon"));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value["Titles"]["4d530004"],
            json!({
                "Title Name": "Pokémon",
                "Content IDs": [],
                "Title Updates": [],
                "Title Updates Known": [],
                "Archived": [],
            })
        );
        // Keys sorted.
        let keys: Vec<_> = value["Titles"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["4541000d", "4d530004"]);
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_sample(temp_dir.path());
        let mut db = Database::open(&path).unwrap();
        db.update(&tid("4541000d"), |record| {
            let cid = ContentId::normalize("4541000d00000001").unwrap();
            record.set_archived(&cid, Some("Map Pack".to_string()));
        })
        .unwrap();
        db.save(None).unwrap();
        let reloaded = Database::open(&path).unwrap();
        assert_eq!(reloaded.titles().collect::<Vec<_>>(), db.titles().collect::<Vec<_>>());
    }

    #[test]
    fn test_ensure_title() {
        let mut db = Database::new();
        assert_eq!(db.ensure_title("ab").unwrap().title_id, tid("000000ab"));
        assert!(db.is_dirty());
        assert_eq!(db.len(), 1);
        // Existing title comes back as-is.
        db.ensure_title("0x000000AB").unwrap();
        assert_eq!(db.len(), 1);
        let err = db.ensure_title("zzz").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidTitleId(_)));
        assert!(err.is_validation());
    }

    #[test]
    fn test_ensure_existing_title_stays_clean() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(write_sample(temp_dir.path())).unwrap();
        db.ensure_title("4541000d").unwrap();
        assert!(!db.is_dirty());
    }

    #[test]
    fn test_create_title() {
        let mut db = Database::new();
        db.create_title(tid("4541000d"), "  Halo ").unwrap();
        assert_eq!(db.title(&tid("4541000d")).unwrap().title_name, "Halo");
        let err = db.create_title(tid("4541000d"), "Again").unwrap_err();
        assert!(matches!(&*err, ErrorKind::TitleExists(_)));
    }

    #[test]
    fn test_rename_title() {
        let mut db = Database::new();
        db.create_title(tid("4541000d"), "Halo").unwrap();
        db.create_title(tid("4d530004"), "Other").unwrap();
        db.update(&tid("4541000d"), |record| record.add_content_id(tid("4541000d").content_id(1))).unwrap();

        db.rename_title(&tid("4541000d"), tid("4541000e")).unwrap();
        assert!(db.title(&tid("4541000d")).is_none());
        let renamed = db.title(&tid("4541000e")).unwrap();
        assert_eq!(renamed.title_id, tid("4541000e"));
        assert_eq!(renamed.title_name, "Halo");
        // Content ids are not rewritten.
        assert!(renamed.content_ids.contains(&tid("4541000d").content_id(1)));

        let err = db.rename_title(&tid("4541000e"), tid("4d530004")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::TitleExists(_)));
        let err = db.rename_title(&tid("4541000d"), tid("12345678")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::TitleNotFound(_)));
        assert_eq!(db.len(), 2);
    }

    #[test]
    fn test_update_unknown_title() {
        let mut db = Database::new();
        let err = db.update(&tid("4541000d"), |_| ()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::TitleNotFound(_)));
        assert!(!db.is_dirty());
    }

    #[test]
    fn test_search() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Database::open(write_sample(temp_dir.path())).unwrap();
        assert_eq!(db.search("").len(), 2);
        assert_eq!(db.search("HALO")[0].title_id, tid("4541000d"));
        assert_eq!(db.search("4d53")[0].title_name, "Pokémon");
        assert!(db.search("fable").is_empty());
    }

    #[test]
    fn test_validate() {
        let mut db = Database::new();
        db.create_title(tid("4541000d"), "Halo").unwrap();
        db.update(&tid("4541000d"), |record| {
            record.add_content_id(ContentId::normalize("4d53000100000001").unwrap());
        })
        .unwrap();
        let issues = db.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0.title_id, tid("4541000d"));
        assert!(matches!(issues[0].1, Issue::ContentIdPrefix(_)));
    }

    #[test]
    fn test_default_icon_dir() {
        assert_eq!(default_icon_dir(Path::new("/games/id_database.json")), PathBuf::from("/games/data/icons"));
        assert!(Database::new().default_icon_dir().is_none());
    }
}
