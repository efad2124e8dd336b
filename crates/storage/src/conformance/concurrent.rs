use std::future::Future;
use std::sync::Arc;

use super::{make_asset, make_status_change, seed_asset, CaseOutcome};
use crate::{AssetRecord, AssetStorage, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseOutcome::new(
        "concurrent",
        "concurrent_updates_exactly_one_wins",
        concurrent_updates_exactly_one_wins(factory).await,
    ));
    results.push(CaseOutcome::new(
        "concurrent",
        "concurrent_updates_different_assets_all_succeed",
        concurrent_updates_different_assets_all_succeed(factory).await,
    ));
    results.push(CaseOutcome::new(
        "concurrent",
        "concurrent_inserts_get_distinct_ids",
        concurrent_inserts_get_distinct_ids(factory).await,
    ));

    results
}

/// Try to move `base` to `status` in a fresh snapshot. `Ok(true)` if this
/// task committed, `Ok(false)` if it lost the race.
async fn race_update<S: AssetStorage>(
    s: Arc<S>,
    base: AssetRecord,
    status: String,
) -> Result<bool, StorageError> {
    let mut snap = s.begin_snapshot().await?;
    let mut next = base;
    let old = std::mem::replace(&mut next.status, status.clone());
    if let Err(e) = s.update_asset(&mut snap, &next).await {
        let _ = s.abort_snapshot(snap).await;
        return match e {
            StorageError::ConcurrentConflict { .. } => Ok(false),
            other => Err(other),
        };
    }
    if let Err(e) = s
        .insert_change(&mut snap, make_status_change(next.id, &old, &status))
        .await
    {
        let _ = s.abort_snapshot(snap).await;
        return Err(e);
    }
    match s.commit_snapshot(snap).await {
        Ok(()) => Ok(true),
        Err(StorageError::ConcurrentConflict { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// N tasks race to update the same asset from version 0. Exactly one
/// commits; the rest see ConcurrentConflict and leave no change records.
async fn concurrent_updates_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let id = seed_asset(&*storage, "Laptop", "new").await?;
    let base = storage.get_asset(id).await.map_err(|e| e.to_string())?;

    let mut handles = Vec::new();
    for i in 0..N {
        let status = if i % 2 == 0 { "allocated" } else { "in-use" };
        handles.push(tokio::spawn(race_update(
            storage.clone(),
            base.clone(),
            status.to_string(),
        )));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }

    let rec = storage.get_asset(id).await.map_err(|e| e.to_string())?;
    if rec.version != 1 {
        return Err(format!("expected version 1, got {}", rec.version));
    }
    let changes = storage.list_changes(id).await.map_err(|e| e.to_string())?;
    // One create plus the winner's status change.
    if changes.len() != 2 {
        return Err(format!("expected 2 change records, got {}", changes.len()));
    }
    Ok(())
}

async fn concurrent_updates_different_assets_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let mut bases = Vec::new();
    for i in 0..N {
        let id = seed_asset(&*storage, &format!("asset-{i}"), "new").await?;
        bases.push(storage.get_asset(id).await.map_err(|e| e.to_string())?);
    }

    let handles: Vec<_> = bases
        .into_iter()
        .map(|base| tokio::spawn(race_update(storage.clone(), base, "allocated".to_string())))
        .collect();

    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
        if !won {
            return Err("update of an uncontended asset conflicted".to_string());
        }
    }

    let allocated = storage
        .list_assets(None, Some("allocated"))
        .await
        .map_err(|e| e.to_string())?;
    if allocated.len() != N {
        return Err(format!("expected {N} allocated assets, got {}", allocated.len()));
    }
    Ok(())
}

async fn concurrent_inserts_get_distinct_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let mut snap = s.begin_snapshot().await?;
            let rec = s
                .insert_asset(&mut snap, make_asset(&format!("asset-{i}"), 1, "new"))
                .await?;
            s.commit_snapshot(snap).await?;
            Ok::<i64, StorageError>(rec.id)
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(
            handle
                .await
                .map_err(|e| format!("task panic: {e}"))?
                .map_err(|e| format!("storage error: {e}"))?,
        );
    }
    ids.sort_unstable();
    ids.dedup();
    if ids.len() != N {
        return Err(format!("expected {N} distinct ids, got {}", ids.len()));
    }
    Ok(())
}
