//! Staged writes belong to their snapshot until commit. Abort and drop
//! both throw them away.

use std::future::Future;

use assets_core::Principal;

use super::{make_asset, make_create_change, seed_asset, CaseOutcome};
use crate::{AssetStorage, StorageError};

pub(super) async fn run_snapshot_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseOutcome::new(
        "snapshot",
        "uncommitted_asset_invisible_to_get",
        uncommitted_asset_invisible_to_get(factory).await,
    ));
    results.push(CaseOutcome::new(
        "snapshot",
        "uncommitted_asset_invisible_to_list",
        uncommitted_asset_invisible_to_list(factory).await,
    ));
    results.push(CaseOutcome::new(
        "snapshot",
        "uncommitted_update_invisible",
        uncommitted_update_invisible(factory).await,
    ));
    results.push(CaseOutcome::new(
        "snapshot",
        "uncommitted_roles_invisible",
        uncommitted_roles_invisible(factory).await,
    ));
    results.push(CaseOutcome::new(
        "snapshot",
        "abort_discards_everything",
        abort_discards_everything(factory).await,
    ));
    results.push(CaseOutcome::new(
        "snapshot",
        "drop_without_commit_discards",
        drop_without_commit_discards(factory).await,
    ));
    results.push(CaseOutcome::new(
        "snapshot",
        "snapshot_sees_own_custom_field_writes",
        snapshot_sees_own_custom_field_writes(factory).await,
    ));

    results
}

async fn uncommitted_asset_invisible_to_get<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec = s
        .insert_asset(&mut snap, make_asset("Laptop", 1, "new"))
        .await
        .map_err(|e| e.to_string())?;

    let seen = s.get_asset(rec.id).await;
    let _ = s.abort_snapshot(snap).await;
    match seen {
        Err(StorageError::AssetNotFound { .. }) => Ok(()),
        other => Err(format!("uncommitted asset visible: {:?}", other)),
    }
}

async fn uncommitted_asset_invisible_to_list<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_asset(&mut snap, make_asset("Laptop", 1, "new"))
        .await
        .map_err(|e| e.to_string())?;

    let listed = s.list_assets(None, None).await.map_err(|e| e.to_string())?;
    let _ = s.abort_snapshot(snap).await;
    if !listed.is_empty() {
        return Err(format!("expected empty list, got {} assets", listed.len()));
    }
    Ok(())
}

async fn uncommitted_update_invisible<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut rec = s
        .get_asset_for_update(&mut snap, id)
        .await
        .map_err(|e| e.to_string())?;
    rec.status = "in-use".to_string();
    s.update_asset(&mut snap, &rec)
        .await
        .map_err(|e| e.to_string())?;

    let outside = s.get_asset(id).await.map_err(|e| e.to_string())?;
    let inside = s
        .get_asset_for_update(&mut snap, id)
        .await
        .map_err(|e| e.to_string())?;
    let _ = s.abort_snapshot(snap).await;

    if outside.status != "new" || outside.version != 0 {
        return Err(format!("uncommitted update leaked: {:?}", outside));
    }
    if inside.status != "in-use" || inside.version != 1 {
        return Err(format!("snapshot does not see its own update: {:?}", inside));
    }
    Ok(())
}

async fn uncommitted_roles_invisible<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.set_role_members(&mut snap, id, "HeldBy", vec![Principal::user("bob")])
        .await
        .map_err(|e| e.to_string())?;
    let outside = s.get_role_members(id).await.map_err(|e| e.to_string())?;
    let _ = s.abort_snapshot(snap).await;

    if !outside.is_empty() {
        return Err(format!("uncommitted role members leaked: {:?}", outside));
    }
    Ok(())
}

async fn abort_discards_everything<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec = s
        .insert_asset(&mut snap, make_asset("Laptop", 1, "new"))
        .await
        .map_err(|e| e.to_string())?;
    s.set_custom_field_values(&mut snap, rec.id, "Serial", vec!["X1".to_string()])
        .await
        .map_err(|e| e.to_string())?;
    s.insert_change(&mut snap, make_create_change(rec.id))
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if s.get_asset(rec.id).await.is_ok() {
        return Err("aborted asset is visible".to_string());
    }
    let changes = s.list_changes(rec.id).await.map_err(|e| e.to_string())?;
    let fields = s
        .get_custom_field_values(rec.id)
        .await
        .map_err(|e| e.to_string())?;
    if !changes.is_empty() || !fields.is_empty() {
        return Err("aborted snapshot left records behind".to_string());
    }
    Ok(())
}

async fn drop_without_commit_discards<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = {
        let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
        s.insert_asset(&mut snap, make_asset("Laptop", 1, "new"))
            .await
            .map_err(|e| e.to_string())?
            .id
    };
    if s.get_asset(id).await.is_ok() {
        return Err("dropped snapshot's asset is visible".to_string());
    }
    Ok(())
}

async fn snapshot_sees_own_custom_field_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.set_custom_field_values(&mut snap, id, "Serial", vec!["X1".to_string()])
        .await
        .map_err(|e| e.to_string())?;
    let values = s
        .custom_field_values_in(&mut snap, id, "Serial")
        .await
        .map_err(|e| e.to_string())?;
    let _ = s.abort_snapshot(snap).await;
    if values != ["X1"] {
        return Err(format!("expected [\"X1\"], got {:?}", values));
    }
    Ok(())
}
