use super::{Context, update};
use crate::cli::TuCommands;
use crate::error::{ErrorKind, Result};

pub fn execute(ctx: &Context, command: TuCommands) -> Result<()> {
    ctx.edit(|db| {
        let (changed, tu_id) = match command {
            TuCommands::Add { title_id, tu_id } => {
                let added = update(db, &title_id, |record| record.add_title_update(tu_id.clone()))?;
                if !added {
                    exn::bail!(ErrorKind::Edit);
                }
                (added, tu_id)
            },
            TuCommands::Remove { title_id, tu_id } => {
                (update(db, &title_id, |record| record.remove_title_update(&tu_id))?, tu_id)
            },
            TuCommands::Replace { title_id, old, new } => {
                let found = update(db, &title_id, |record| {
                    let found = record.title_updates.contains(&old);
                    if found {
                        record.replace_title_update(&old, new);
                    }
                    found
                })?;
                (found, old)
            },
        };
        match changed {
            true => Ok(()),
            false => exn::bail!(ErrorKind::NotFound {
                kind: "Title Update ID",
                value: tu_id.to_string(),
            }),
        }
    })
}
