use super::{Context, update};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::sync::Arc;
use titledb_model::{TitleId, TitleRecord};
use titledb_storage::backend::LocalBackend;

pub fn list(ctx: &Context, search: Option<&str>) -> Result<()> {
    let db = ctx.open()?;
    let titles = db.search(search.unwrap_or_default());
    for record in &titles {
        println!(
            "{}  {:>3} DLC  {:>3} TU",
            record.display_name(),
            record.content_ids.len(),
            record.title_updates.len()
        );
    }
    println!("{} of {} titles", titles.len(), db.len());
    Ok(())
}

pub fn show(ctx: &Context, title_id: &TitleId) -> Result<()> {
    let db = ctx.open()?;
    let Some(record) = db.title(title_id) else {
        exn::bail!(ErrorKind::NotFound {
            kind: "TitleID",
            value: title_id.to_string(),
        });
    };
    print!("{}", describe(record));
    Ok(())
}

pub fn new(ctx: &Context, title_id: TitleId, name: &str) -> Result<()> {
    ctx.edit(|db| {
        let record = db.create_title(title_id, name).or_raise(|| ErrorKind::Edit)?;
        println!("Created {}", record.display_name());
        Ok(())
    })
}

pub fn set_name(ctx: &Context, title_id: &TitleId, name: &str) -> Result<()> {
    ctx.edit(|db| update(db, title_id, |record| record.set_name(name)))
}

/// Re-key a title, then move its cached icon along with it.
pub async fn rename(ctx: &Context, old: &TitleId, new: TitleId) -> Result<()> {
    let database = ctx.database_path()?;
    ctx.edit(|db| db.rename_title(old, new.clone()).or_raise(|| ErrorKind::Edit))?;
    println!("Renamed {old} to {new}");

    // Only the disk tier exists between runs; no network involved.
    let icon_dir = std::path::absolute(ctx.icon_dir(&database)).or_raise(|| ErrorKind::Io(database.clone()))?;
    if icon_dir.is_dir() {
        let disk = Arc::new(LocalBackend::new("icons", &icon_dir).or_raise(|| ErrorKind::Icons)?);
        let (cache, _events) = super::icons::cache(ctx, disk)?;
        cache.rename(old, &new).await;
    }
    Ok(())
}

pub fn validate(ctx: &Context) -> Result<()> {
    let db = ctx.open()?;
    let issues = db.validate();
    for (record, issue) in &issues {
        println!("{}: {issue}", record.display_name());
    }
    match issues.len() {
        0 => println!("No issues found in {} titles", db.len()),
        n => println!("{n} issue(s) found"),
    }
    Ok(())
}

/// Multi-line description of a title, as printed by `show`.
fn describe(record: &TitleRecord) -> String {
    let mut out = format!("{}\n", record.display_name());
    out.push_str(&format!("Content IDs ({}):\n", record.content_ids.len()));
    for content_id in &record.content_ids {
        match record.archived.get(content_id) {
            Some(name) if name.is_empty() => out.push_str(&format!("  {content_id}  [archived]\n")),
            Some(name) => out.push_str(&format!("  {content_id}  [archived: {name}]\n")),
            None => out.push_str(&format!("  {content_id}\n")),
        }
    }
    out.push_str(&format!("Title Updates ({}):\n", record.title_updates.len()));
    for tu_id in &record.title_updates {
        out.push_str(&format!("  {tu_id}\n"));
    }
    out.push_str(&format!("Known Updates ({}):\n", record.known_updates.len()));
    for (sha, label) in record.known_sorted() {
        out.push_str(&format!("  {sha}  {label}\n"));
    }
    for issue in record.issues() {
        out.push_str(&format!("! {issue}\n"));
    }
    out
}
