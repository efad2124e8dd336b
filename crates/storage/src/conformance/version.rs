use std::future::Future;

use super::{move_status, seed_asset, CaseOutcome};
use crate::{AssetStorage, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseOutcome::new(
        "version",
        "version_increments_sequentially",
        version_increments_sequentially(factory).await,
    ));
    results.push(CaseOutcome::new(
        "version",
        "update_with_stale_version_returns_conflict",
        update_with_stale_version_returns_conflict(factory).await,
    ));
    results.push(CaseOutcome::new(
        "version",
        "two_snapshots_race_one_wins",
        two_snapshots_race_one_wins(factory).await,
    ));
    results.push(CaseOutcome::new(
        "version",
        "conflict_does_not_change_state",
        conflict_does_not_change_state(factory).await,
    ));
    results.push(CaseOutcome::new(
        "version",
        "version_per_asset_independent",
        version_per_asset_independent(factory).await,
    ));

    results
}

async fn version_increments_sequentially<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let mut versions = Vec::new();
    for status in ["allocated", "in-use", "allocated"] {
        versions.push(move_status(&s, id, status).await?);
    }
    if versions != [1, 2, 3] {
        return Err(format!("expected versions [1, 2, 3], got {:?}", versions));
    }
    Ok(())
}

async fn update_with_stale_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let stale = s.get_asset(id).await.map_err(|e| e.to_string())?;
    move_status(&s, id, "allocated").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.update_asset(&mut snap, &stale).await;
    let _ = s.abort_snapshot(snap).await;
    match result {
        Err(StorageError::ConcurrentConflict {
            asset_id,
            expected_version: 0,
        }) if asset_id == id => Ok(()),
        other => Err(format!("expected ConcurrentConflict at version 0, got {:?}", other)),
    }
}

/// Two snapshots read version 0 and both update. Whichever commits second
/// must fail, either at `update_asset` or at `commit_snapshot`.
async fn two_snapshots_race_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;

    let mut snap_a = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut a = s
        .get_asset_for_update(&mut snap_a, id)
        .await
        .map_err(|e| e.to_string())?;
    a.status = "allocated".to_string();
    s.update_asset(&mut snap_a, &a)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap_a).await.map_err(|e| e.to_string())?;

    let mut snap_b = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut b = a.clone();
    b.version = 0;
    b.status = "in-use".to_string();
    let outcome = match s.update_asset(&mut snap_b, &b).await {
        Ok(_) => s.commit_snapshot(snap_b).await,
        Err(e) => {
            let _ = s.abort_snapshot(snap_b).await;
            Err(e)
        }
    };
    match outcome {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        other => return Err(format!("expected loser to conflict, got {:?}", other)),
    }

    let rec = s.get_asset(id).await.map_err(|e| e.to_string())?;
    if rec.status != "allocated" || rec.version != 1 {
        return Err(format!("expected winner's state, got {:?}", rec));
    }
    Ok(())
}

async fn conflict_does_not_change_state<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let mut stale = s.get_asset(id).await.map_err(|e| e.to_string())?;
    move_status(&s, id, "allocated").await?;

    stale.status = "stolen".to_string();
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let _ = s.update_asset(&mut snap, &stale).await;
    let _ = s.commit_snapshot(snap).await;

    let rec = s.get_asset(id).await.map_err(|e| e.to_string())?;
    if rec.status != "allocated" || rec.version != 1 {
        return Err(format!("conflict mutated state: {:?}", rec));
    }
    Ok(())
}

async fn version_per_asset_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let a = seed_asset(&s, "A", "new").await?;
    let b = seed_asset(&s, "B", "new").await?;
    move_status(&s, a, "allocated").await?;
    move_status(&s, a, "in-use").await?;
    let rec_b = s.get_asset(b).await.map_err(|e| e.to_string())?;
    if rec_b.version != 0 {
        return Err(format!("asset B version moved to {}", rec_b.version));
    }
    Ok(())
}
