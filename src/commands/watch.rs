//! Keeps the local library in step with the cloud folder.
//!
//! One task owns the [`Library`]. Each tick pulls the key-value cloud and
//! scans the documents directory on blocking threads, then applies what
//! changed back on the owning task.

use clap::Args;
use std::error::Error;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::MissedTickBehavior;

use mealmate_core::{ChangeCause, DocumentUpdate, Library, StoreEvent};

use super::CommandResult;

/// Watch the cloud folder and apply changes from other devices
#[derive(Args)]
pub struct WatchCommand {
    /// Seconds between sync passes (overrides the config file)
    #[arg(long, short)]
    interval: Option<u64>,

    /// Run a single sync pass and exit
    #[arg(long)]
    once: bool,
}

impl WatchCommand {
    pub async fn run(&self, library: &mut Library, default_interval: u64) -> CommandResult {
        if library.cloud().is_none() && library.documents().is_none() {
            return Err("No cloud folder configured. Set cloud_dir in the config file \
                        or MEALMATE_CLOUD_DIR."
                .into());
        }

        let mut events = subscribe_all(library);

        if self.once {
            sync_pass(library).await?;
            report(&mut events);
            return Ok(());
        }

        let seconds = self.interval.unwrap_or(default_interval);
        if seconds == 0 {
            return Err("Interval must be at least 1 second".into());
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        println!("Watching for changes every {}s (Ctrl-C to stop)", seconds);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    println!("Stopped watching");
                    return Ok(());
                }
            }

            match sync_pass(library).await {
                Ok(true) => report(&mut events),
                Ok(false) => {}
                // A failed pass is retried on the next tick
                Err(e) => tracing::warn!("Sync pass failed: {}", e),
            }
        }
    }
}

/// One sync pass. Returns true if any store changed.
pub async fn sync_pass(library: &mut Library) -> Result<bool, Box<dyn Error>> {
    if let Some(cloud) = library.cloud().cloned() {
        let reachable = tokio::task::spawn_blocking(move || cloud.synchronize()).await?;
        if !reachable {
            tracing::debug!("Cloud unavailable, skipping key-value sync");
        }
    }
    let mut changed = library.process_cloud_changes();

    if let Some(documents) = library.documents().cloned() {
        let update = tokio::task::spawn_blocking(move || DocumentUpdate::scan(&documents)).await?;
        if !update.is_empty() {
            changed |= library.apply_document_update(update);
        }
    }

    tracing::debug!("Sync pass finished, changed: {}", changed);
    Ok(changed)
}

fn subscribe_all(library: &Library) -> Vec<broadcast::Receiver<StoreEvent>> {
    vec![
        library.recipes().subscribe(),
        library.books().subscribe(),
        library.ingredients().subscribe(),
        library.kitchenware().subscribe(),
        library.shopping().subscribe(),
    ]
}

/// Prints one line per store that reloaded from the cloud.
fn report(events: &mut [broadcast::Receiver<StoreEvent>]) {
    for receiver in events.iter_mut() {
        let mut reloaded = None;
        loop {
            match receiver.try_recv() {
                Ok(event) if event.cause == ChangeCause::Cloud => reloaded = Some(event.store),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Missed {} store event(s)", skipped);
                }
                Err(_) => break,
            }
        }
        if let Some(store) = reloaded {
            println!("Updated {} from the cloud", store);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealmate_core::{DocumentCloud, FolderCloud, Recipe, ShoppingItem, StoreKind, Unit};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open_device(root: &Path, device: &str) -> Library {
        let cloud_dir = root.join("cloud");
        let cloud = Arc::new(FolderCloud::new(&cloud_dir));
        let documents = Arc::new(DocumentCloud::new(cloud_dir.join("Documents")));
        Library::open(root.join(device), Some(cloud), Some(documents))
    }

    #[tokio::test]
    async fn test_sync_pass_picks_up_other_device() {
        let temp = TempDir::new().unwrap();
        let mut laptop = open_device(temp.path(), "laptop");
        let mut desktop = open_device(temp.path(), "desktop");
        let mut events = desktop.recipes().subscribe();

        let recipe = Recipe::new("Risotto", 40, 4);
        laptop.recipes_mut().add(recipe.clone()).unwrap();
        laptop
            .shopping_mut()
            .add_item(ShoppingItem::new("Arborio Rice", 500.0, Unit::Gram));

        assert!(sync_pass(&mut desktop).await.unwrap());
        assert!(desktop.recipes().contains(recipe.id));
        assert_eq!(desktop.shopping().items().len(), 1);

        let event = events.try_recv().unwrap();
        assert_eq!(event.store, StoreKind::Recipes);
        assert_eq!(event.cause, ChangeCause::Cloud);

        assert!(!sync_pass(&mut desktop).await.unwrap());
    }

    #[tokio::test]
    async fn test_sync_pass_without_cloud_changes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut library = Library::open(temp.path(), None, None);
        assert!(!sync_pass(&mut library).await.unwrap());
    }

    #[tokio::test]
    async fn test_watch_requires_cloud() {
        let temp = TempDir::new().unwrap();
        let mut library = Library::open(temp.path(), None, None);
        let command = WatchCommand {
            interval: None,
            once: true,
        };
        let err = command.run(&mut library, 5).await.unwrap_err();
        assert!(err.to_string().contains("No cloud folder configured"));
    }
}
