//! Change records are history: they must appear exactly when the mutation
//! that produced them commits, keep insertion order, and carry increasing ids.

use std::future::Future;

use super::{make_status_change, move_status, seed_asset, CaseOutcome};
use crate::record::ChangeKind;
use crate::AssetStorage;

pub(super) async fn run_change_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseOutcome::new(
        "changes",
        "change_ids_increase",
        change_ids_increase(factory).await,
    ));
    results.push(CaseOutcome::new(
        "changes",
        "changes_listed_in_order",
        changes_listed_in_order(factory).await,
    ));
    results.push(CaseOutcome::new(
        "changes",
        "change_invisible_until_commit",
        change_invisible_until_commit(factory).await,
    ));
    results.push(CaseOutcome::new(
        "changes",
        "aborted_change_discarded",
        aborted_change_discarded(factory).await,
    ));
    results.push(CaseOutcome::new(
        "changes",
        "changes_scoped_to_asset",
        changes_scoped_to_asset(factory).await,
    ));
    results.push(CaseOutcome::new(
        "changes",
        "change_preserves_fields",
        change_preserves_fields(factory).await,
    ));

    results
}

async fn change_ids_increase<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    move_status(&s, id, "allocated").await?;
    move_status(&s, id, "in-use").await?;
    let changes = s.list_changes(id).await.map_err(|e| e.to_string())?;
    let ids: Vec<i64> = changes.iter().map(|c| c.id).collect();
    if ids.len() != 3 || ids.windows(2).any(|w| w[0] >= w[1]) || ids[0] <= 0 {
        return Err(format!("expected three positive increasing ids, got {:?}", ids));
    }
    Ok(())
}

async fn changes_listed_in_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    move_status(&s, id, "allocated").await?;
    move_status(&s, id, "in-use").await?;
    let changes = s.list_changes(id).await.map_err(|e| e.to_string())?;
    let kinds: Vec<ChangeKind> = changes.iter().map(|c| c.kind).collect();
    let targets: Vec<Option<&str>> = changes.iter().map(|c| c.new_value.as_deref()).collect();
    if kinds != [ChangeKind::Create, ChangeKind::Status, ChangeKind::Status] {
        return Err(format!("unexpected kinds {:?}", kinds));
    }
    if targets != [None, Some("allocated"), Some("in-use")] {
        return Err(format!("unexpected new values {:?}", targets));
    }
    Ok(())
}

async fn change_invisible_until_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_change(&mut snap, make_status_change(id, "new", "stolen"))
        .await
        .map_err(|e| e.to_string())?;
    let before = s.list_changes(id).await.map_err(|e| e.to_string())?.len();
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    let after = s.list_changes(id).await.map_err(|e| e.to_string())?.len();
    if before != 1 || after != 2 {
        return Err(format!(
            "expected 1 change before commit and 2 after, got {before} and {after}"
        ));
    }
    Ok(())
}

async fn aborted_change_discarded<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_change(&mut snap, make_status_change(id, "new", "stolen"))
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    let changes = s.list_changes(id).await.map_err(|e| e.to_string())?;
    if changes.len() != 1 {
        return Err(format!("expected only the create record, got {}", changes.len()));
    }
    Ok(())
}

async fn changes_scoped_to_asset<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let a = seed_asset(&s, "A", "new").await?;
    let b = seed_asset(&s, "B", "new").await?;
    move_status(&s, a, "allocated").await?;
    let for_b = s.list_changes(b).await.map_err(|e| e.to_string())?;
    if for_b.len() != 1 || for_b.iter().any(|c| c.asset_id != b) {
        return Err(format!("asset B history polluted: {:?}", for_b));
    }
    Ok(())
}

async fn change_preserves_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let change_id = s
        .insert_change(&mut snap, make_status_change(id, "new", "recycled"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let changes = s.list_changes(id).await.map_err(|e| e.to_string())?;
    let change = changes
        .iter()
        .find(|c| c.id == change_id)
        .ok_or_else(|| format!("change {change_id} missing"))?;
    if change.field.as_deref() != Some("Status")
        || change.old_value.as_deref() != Some("new")
        || change.new_value.as_deref() != Some("recycled")
        || change.creator != "test-user"
        || change.created != "2025-01-01T00:01:00Z"
    {
        return Err(format!("change fields not preserved: {:?}", change));
    }
    Ok(())
}
