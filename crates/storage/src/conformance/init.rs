use std::future::Future;

use super::{make_asset, seed_asset, CaseOutcome};
use crate::AssetStorage;

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseOutcome::new(
        "init",
        "insert_starts_at_version_0",
        insert_starts_at_version_0(factory).await,
    ));
    results.push(CaseOutcome::new(
        "init",
        "insert_preserves_columns",
        insert_preserves_columns(factory).await,
    ));
    results.push(CaseOutcome::new(
        "init",
        "insert_sets_last_updated_from_creator",
        insert_sets_last_updated_from_creator(factory).await,
    ));
    results.push(CaseOutcome::new(
        "init",
        "ids_are_positive_and_increasing",
        ids_are_positive_and_increasing(factory).await,
    ));
    results.push(CaseOutcome::new(
        "init",
        "inserted_asset_readable_for_update",
        inserted_asset_readable_for_update(factory).await,
    ));
    results.push(CaseOutcome::new(
        "init",
        "inserted_asset_updatable_in_same_snapshot",
        inserted_asset_updatable_in_same_snapshot(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// After insert + commit, the asset version must be 0.
async fn insert_starts_at_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let rec = s.get_asset(id).await.map_err(|e| e.to_string())?;
    if rec.version != 0 {
        return Err(format!("expected version 0, got {}", rec.version));
    }
    Ok(())
}

async fn insert_preserves_columns<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let inserted = s
        .insert_asset(&mut snap, make_asset("Printer", 3, "in-use"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_asset(inserted.id).await.map_err(|e| e.to_string())?;
    if rec.name != "Printer" || rec.catalog != 3 || rec.status != "in-use" {
        return Err(format!("columns not preserved: {:?}", rec));
    }
    if rec.description != "Printer description" || rec.creator != "test-user" {
        return Err(format!("columns not preserved: {:?}", rec));
    }
    if rec != inserted {
        return Err("committed record differs from the one insert returned".to_string());
    }
    Ok(())
}

async fn insert_sets_last_updated_from_creator<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let rec = s.get_asset(id).await.map_err(|e| e.to_string())?;
    if rec.last_updated_by != rec.creator || rec.last_updated != rec.created {
        return Err(format!(
            "expected last_updated columns to mirror creation, got {:?}",
            rec
        ));
    }
    Ok(())
}

async fn ids_are_positive_and_increasing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let a = seed_asset(&s, "A", "new").await?;
    let b = seed_asset(&s, "B", "new").await?;
    if a <= 0 || b <= a {
        return Err(format!("expected 0 < {} < {}", a, b));
    }
    Ok(())
}

async fn inserted_asset_readable_for_update<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec = s
        .get_asset_for_update(&mut snap, id)
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    if rec.id != id || rec.status != "new" {
        return Err(format!("unexpected record {:?}", rec));
    }
    Ok(())
}

/// An asset inserted and updated in one snapshot commits at version 1.
async fn inserted_asset_updatable_in_same_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut rec = s
        .insert_asset(&mut snap, make_asset("Laptop", 1, "new"))
        .await
        .map_err(|e| e.to_string())?;
    rec.status = "in-use".to_string();
    let v = s
        .update_asset(&mut snap, &rec)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let stored = s.get_asset(rec.id).await.map_err(|e| e.to_string())?;
    if v != 1 || stored.version != 1 || stored.status != "in-use" {
        return Err(format!("expected in-use at version 1, got {:?}", stored));
    }
    Ok(())
}
