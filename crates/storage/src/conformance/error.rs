use std::future::Future;

use super::{make_asset, make_status_change, CaseOutcome};
use crate::{AssetStorage, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseOutcome::new(
        "error",
        "get_asset_nonexistent",
        get_asset_nonexistent(factory).await,
    ));
    results.push(CaseOutcome::new(
        "error",
        "get_asset_for_update_nonexistent",
        get_asset_for_update_nonexistent(factory).await,
    ));
    results.push(CaseOutcome::new(
        "error",
        "update_asset_nonexistent",
        update_asset_nonexistent(factory).await,
    ));
    results.push(CaseOutcome::new(
        "error",
        "set_role_members_nonexistent",
        set_role_members_nonexistent(factory).await,
    ));
    results.push(CaseOutcome::new(
        "error",
        "insert_change_nonexistent",
        insert_change_nonexistent(factory).await,
    ));
    results.push(CaseOutcome::new(
        "error",
        "queries_empty_for_nonexistent",
        queries_empty_for_nonexistent(factory).await,
    ));

    results
}

fn expect_not_found<T: std::fmt::Debug>(
    result: Result<T, StorageError>,
    asset_id: i64,
) -> Result<(), String> {
    match result {
        Err(StorageError::AssetNotFound { asset_id: got }) if got == asset_id => Ok(()),
        other => Err(format!(
            "expected AssetNotFound {{ asset_id: {} }}, got {:?}",
            asset_id, other
        )),
    }
}

async fn get_asset_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    expect_not_found(s.get_asset(999).await, 999)
}

async fn get_asset_for_update_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.get_asset_for_update(&mut snap, 999).await;
    let _ = s.abort_snapshot(snap).await;
    expect_not_found(result, 999)
}

async fn update_asset_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    // Insert and abort so we hold a well-formed record that was never committed.
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let ghost = s
        .insert_asset(&mut snap, make_asset("Ghost", 1, "new"))
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.update_asset(&mut snap, &ghost).await;
    let _ = s.abort_snapshot(snap).await;
    expect_not_found(result, ghost.id)
}

async fn set_role_members_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .set_role_members(
            &mut snap,
            999,
            "Owner",
            vec![assets_core::Principal::user("alice")],
        )
        .await;
    let _ = s.abort_snapshot(snap).await;
    expect_not_found(result, 999)
}

async fn insert_change_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .insert_change(&mut snap, make_status_change(999, "new", "in-use"))
        .await;
    let _ = s.abort_snapshot(snap).await;
    expect_not_found(result, 999)
}

async fn queries_empty_for_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let changes = s.list_changes(999).await.map_err(|e| e.to_string())?;
    let roles = s.get_role_members(999).await.map_err(|e| e.to_string())?;
    let fields = s
        .get_custom_field_values(999)
        .await
        .map_err(|e| e.to_string())?;
    let assets = s.list_assets(Some(999), None).await.map_err(|e| e.to_string())?;
    if !changes.is_empty() || !roles.is_empty() || !fields.is_empty() || !assets.is_empty() {
        return Err("expected empty results for unknown asset".to_string());
    }
    Ok(())
}
