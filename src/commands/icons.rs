use super::Context;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::TryStreamExt;
use std::path::Path;
use std::sync::Arc;
use titledb_icons::{HttpSource, IconBytes, IconCache, IconEvents, Lookup, Options, Outcome, PrefetchEvent};
use titledb_model::TitleId;
use titledb_storage::BackendHandle;
use titledb_storage::backend::LocalBackend;

/// An icon cache over `disk`, fetching from the configured host.
pub(crate) fn cache(ctx: &Context, disk: BackendHandle) -> Result<(IconCache, IconEvents)> {
    let icons = &ctx.config.icons;
    let source = HttpSource::new(&icons.base_url, &icons.user_agent).or_raise(|| ErrorKind::Icons)?;
    let options = Options {
        timeout: icons.timeout(),
        prefetch_concurrency: icons.prefetch_concurrency,
    };
    Ok(IconCache::new(disk, Arc::new(source), options))
}

fn local_cache(ctx: &Context, database: &Path) -> Result<(IconCache, IconEvents)> {
    let dir = std::path::absolute(ctx.icon_dir(database)).or_raise(|| ErrorKind::Io(database.to_path_buf()))?;
    let disk = LocalBackend::new("icons", &dir).or_raise(|| ErrorKind::Icons)?;
    tracing::debug!(dir = %dir.display(), "Icon cache");
    cache(ctx, Arc::new(disk))
}

/// Wait for the background fetch of `title_id` to report back.
async fn wait_for(events: &mut IconEvents, title_id: &TitleId) -> Option<IconBytes> {
    while let Some(event) = events.recv().await {
        if &event.title_id != title_id {
            continue;
        }
        return match event.outcome {
            Outcome::Fetched(bytes) => Some(bytes),
            Outcome::Missing(e) => {
                tracing::info!(%title_id, error = ?e, "Icon unavailable");
                None
            },
        };
    }
    None
}

pub async fn icon(ctx: &Context, title_id: &TitleId, output: Option<&Path>) -> Result<()> {
    let database = ctx.database_path()?;
    let (cache, mut events) = local_cache(ctx, &database)?;

    let (bytes, tier) = match cache.load(title_id).await {
        Lookup::Memory(bytes) => (Some(bytes), "memory"),
        Lookup::Disk(bytes) => (Some(bytes), "cache"),
        Lookup::FetchStarted | Lookup::FetchInProgress => (wait_for(&mut events, title_id).await, "network"),
    };
    let Some(bytes) = bytes else {
        println!("No icon available for {title_id}");
        return Ok(());
    };
    println!("{title_id}: {} bytes from {tier}", bytes.len());

    if let Some(output) = output {
        tokio::fs::write(output, &bytes).await.or_raise(|| ErrorKind::Io(output.to_path_buf()))?;
        println!("Written to {}", output.display());
    }
    Ok(())
}

pub async fn prefetch(ctx: &Context) -> Result<()> {
    let database = ctx.database_path()?;
    let db = ctx.open()?;
    let (cache, _events) = local_cache(ctx, &database)?;

    let sweep = cache.prefetch(db.title_ids());
    futures::pin_mut!(sweep);
    while let Some(event) = sweep.try_next().await.or_raise(|| ErrorKind::Icons)? {
        match event {
            PrefetchEvent::Started => eprintln!("Checking {} titles...", db.len()),
            PrefetchEvent::Progress(p) => {
                eprint!("\rscanned {}/{}  missing {}  fetched {}", p.scanned, p.total, p.missing, p.fetched);
            },
            PrefetchEvent::Complete(p) => {
                eprintln!();
                println!("Fetched {} of {} missing icons ({} titles)", p.fetched, p.missing, p.total);
            },
        }
    }
    Ok(())
}
