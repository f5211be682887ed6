use super::{Context, hash, update};
use crate::cli::KnownCommands;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use titledb_model::Sha1Hex;

pub async fn execute(ctx: &Context, command: KnownCommands) -> Result<()> {
    match command {
        KnownCommands::Set {
            title_id,
            label,
            sha,
            file,
        } => {
            // Hash before opening the database; it can take a while.
            let sha = match (sha, file) {
                (Some(sha), _) => Some(sha),
                (None, Some(file)) => Some(hash::sha1_file(&file).await?),
                (None, None) => None,
            };
            ctx.edit(|db| {
                let sha = update(db, &title_id, |record| {
                    let sha = sha.or_else(|| record.next_free_known_sha())?;
                    record.set_known(sha.clone(), &label);
                    Some(sha)
                })?;
                let sha = sha.ok_or_raise(|| ErrorKind::Edit)?;
                println!("{sha}  {}", label.trim());
                Ok(())
            })
        },
        KnownCommands::Remove { title_id, sha } => ctx.edit(|db| {
            let removed = update(db, &title_id, |record| record.remove_known(&sha))?;
            match removed {
                Some(_) => Ok(()),
                None => exn::bail!(not_found(&sha)),
            }
        }),
        KnownCommands::Rename { title_id, old, new } => ctx.edit(|db| {
            let renamed = update(db, &title_id, |record| {
                match record.known_updates.contains_key(&old) {
                    true => Some(record.rename_known(&old, new)),
                    false => None,
                }
            })?;
            match renamed {
                Some(result) => result.or_raise(|| ErrorKind::Edit),
                None => exn::bail!(not_found(&old)),
            }
        }),
    }
}

fn not_found(sha: &Sha1Hex) -> ErrorKind {
    ErrorKind::NotFound {
        kind: "SHA1",
        value: sha.to_string(),
    }
}
