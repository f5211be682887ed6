use super::{Context, update};
use crate::cli::DlcCommands;
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use titledb_model::ContentId;

pub fn execute(ctx: &Context, command: DlcCommands) -> Result<()> {
    ctx.edit(|db| match command {
        DlcCommands::Add { title_id, content_id } => {
            let added = update(db, &title_id, |record| {
                let content_id = content_id.or_else(|| record.next_free_content_id())?;
                record.add_content_id(content_id.clone()).then_some(content_id)
            })?;
            let added = added.ok_or_raise(|| ErrorKind::Edit)?;
            println!("Added {added}");
            Ok(())
        },
        DlcCommands::Remove { title_id, content_id } => {
            let removed = update(db, &title_id, |record| record.remove_content_id(&content_id))?;
            require(removed, &content_id)
        },
        DlcCommands::Replace { title_id, old, new } => {
            let found = update(db, &title_id, |record| {
                let found = record.content_ids.contains(&old);
                if found {
                    record.replace_content_id(&old, new);
                }
                found
            })?;
            require(found, &old)
        },
        DlcCommands::Archive {
            title_id,
            content_id,
            name,
        } => {
            let found = update(db, &title_id, |record| {
                let found = record.content_ids.contains(&content_id);
                if found {
                    record.set_archived(&content_id, Some(name));
                }
                found
            })?;
            require(found, &content_id)
        },
        DlcCommands::Unarchive { title_id, content_id } => {
            let found = update(db, &title_id, |record| {
                let found = record.archived.contains_key(&content_id);
                record.set_archived(&content_id, None);
                found
            })?;
            require(found, &content_id)
        },
    })
}

fn require(found: bool, content_id: &ContentId) -> Result<()> {
    match found {
        true => Ok(()),
        false => exn::bail!(ErrorKind::NotFound {
            kind: "ContentID",
            value: content_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{context, tid};

    fn cid(s: &str) -> ContentId {
        s.parse().unwrap()
    }

    #[test]
    fn test_add_next_free() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = context(temp_dir.path());
        for _ in 0..2 {
            let command = DlcCommands::Add {
                title_id: tid("4541000d"),
                content_id: None,
            };
            execute(&ctx, command).unwrap();
        }
        let db = ctx.open().unwrap();
        let ids: Vec<_> = db.title(&tid("4541000d")).unwrap().content_ids.iter().map(|c| c.to_string()).collect();
        assert_eq!(ids, vec!["4541000d00000000", "4541000d00000001", "4541000d00000002"]);
    }

    #[test]
    fn test_add_duplicate() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = context(temp_dir.path());
        let command = DlcCommands::Add {
            title_id: tid("4541000d"),
            content_id: Some(cid("4541000d00000001")),
        };
        let err = execute(&ctx, command).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Edit));
    }

    #[test]
    fn test_archive_and_unarchive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = context(temp_dir.path());
        let archive = DlcCommands::Archive {
            title_id: tid("4541000d"),
            content_id: cid("4541000d00000001"),
            name: "Map Pack".to_string(),
        };
        execute(&ctx, archive).unwrap();
        let db = ctx.open().unwrap();
        assert_eq!(db.title(&tid("4541000d")).unwrap().archived[&cid("4541000d00000001")], "Map Pack");

        let unarchive = DlcCommands::Unarchive {
            title_id: tid("4541000d"),
            content_id: cid("4541000d00000001"),
        };
        execute(&ctx, unarchive).unwrap();
        assert!(ctx.open().unwrap().title(&tid("4541000d")).unwrap().archived.is_empty());
    }

    #[test]
    fn test_missing_content_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = context(temp_dir.path());
        let command = DlcCommands::Remove {
            title_id: tid("4541000d"),
            content_id: cid("4541000d000000ff"),
        };
        let err = execute(&ctx, command).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound { kind: "ContentID", .. }));
    }

    #[test]
    fn test_replace_keeps_archive_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = context(temp_dir.path());
        let (old, new) = (cid("4541000d00000001"), cid("4541000d00000009"));
        execute(&ctx, DlcCommands::Archive {
            title_id: tid("4541000d"),
            content_id: old.clone(),
            name: "Map Pack".to_string(),
        })
        .unwrap();
        execute(&ctx, DlcCommands::Replace {
            title_id: tid("4541000d"),
            old,
            new: new.clone(),
        })
        .unwrap();
        let db = ctx.open().unwrap();
        let record = db.title(&tid("4541000d")).unwrap();
        assert_eq!(record.content_ids.iter().collect::<Vec<_>>(), vec![&new]);
        assert_eq!(record.archived[&new], "Map Pack");
    }
}
