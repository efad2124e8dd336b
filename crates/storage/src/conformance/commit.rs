//! A snapshot that writes an asset, its roles, its custom-field values and
//! its change records must publish all of them together.

use std::future::Future;

use assets_core::Principal;

use super::{make_asset, make_create_change, move_status, seed_asset, CaseOutcome};
use crate::AssetStorage;

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseOutcome::new(
        "commit",
        "full_creation_visible_after_commit",
        full_creation_visible_after_commit(factory).await,
    ));
    results.push(CaseOutcome::new(
        "commit",
        "multiple_assets_in_one_snapshot",
        multiple_assets_in_one_snapshot(factory).await,
    ));
    results.push(CaseOutcome::new(
        "commit",
        "commit_empty_snapshot",
        commit_empty_snapshot(factory).await,
    ));
    results.push(CaseOutcome::new(
        "commit",
        "list_assets_with_filters",
        list_assets_with_filters(factory).await,
    ));
    results.push(CaseOutcome::new(
        "commit",
        "empty_role_is_not_listed",
        empty_role_is_not_listed(factory).await,
    ));
    results.push(CaseOutcome::new(
        "commit",
        "custom_field_values_keep_order",
        custom_field_values_keep_order(factory).await,
    ));

    results
}

async fn full_creation_visible_after_commit<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.set_role_members(&mut snap, rec.id, "Owner", vec![Principal::user("alice")])
        .await
        .map_err(|e| e.to_string())?;
    s.set_custom_field_values(&mut snap, rec.id, "Serial", vec!["X1".to_string()])
        .await
        .map_err(|e| e.to_string())?;
    s.insert_change(&mut snap, make_create_change(rec.id))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    s.get_asset(rec.id).await.map_err(|e| e.to_string())?;
    let roles = s.get_role_members(rec.id).await.map_err(|e| e.to_string())?;
    let fields = s
        .get_custom_field_values(rec.id)
        .await
        .map_err(|e| e.to_string())?;
    let changes = s.list_changes(rec.id).await.map_err(|e| e.to_string())?;
    if roles.len() != 1 || roles[0].role != "Owner" {
        return Err(format!("expected one Owner role, got {:?}", roles));
    }
    if fields.len() != 1 || fields[0].values != ["X1"] {
        return Err(format!("expected Serial = X1, got {:?}", fields));
    }
    if changes.len() != 1 {
        return Err(format!("expected one change record, got {}", changes.len()));
    }
    Ok(())
}

async fn multiple_assets_in_one_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    for name in ["A", "B", "C"] {
        s.insert_asset(&mut snap, make_asset(name, 1, "new"))
            .await
            .map_err(|e| e.to_string())?;
    }
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    let all = s.list_assets(None, None).await.map_err(|e| e.to_string())?;
    let names: Vec<_> = all.iter().map(|a| a.name.as_str()).collect();
    if names != ["A", "B", "C"] {
        return Err(format!("expected [A, B, C] in id order, got {:?}", names));
    }
    Ok(())
}

async fn commit_empty_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())
}

async fn list_assets_with_filters<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_asset(&mut snap, make_asset("A", 1, "new"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_asset(&mut snap, make_asset("B", 2, "new"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    let c = seed_asset(&s, "C", "new").await?;
    move_status(&s, c, "stolen").await?;

    let in_one = s.list_assets(Some(1), None).await.map_err(|e| e.to_string())?;
    let stolen = s
        .list_assets(None, Some("stolen"))
        .await
        .map_err(|e| e.to_string())?;
    let new_in_two = s
        .list_assets(Some(2), Some("new"))
        .await
        .map_err(|e| e.to_string())?;
    if in_one.len() != 2 || stolen.len() != 1 || new_in_two.len() != 1 {
        return Err(format!(
            "filter counts wrong: catalog=1 -> {}, stolen -> {}, catalog=2&new -> {}",
            in_one.len(),
            stolen.len(),
            new_in_two.len()
        ));
    }
    Ok(())
}

async fn empty_role_is_not_listed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.set_role_members(&mut snap, id, "Contact", vec![Principal::user("carol")])
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.set_role_members(&mut snap, id, "Contact", Vec::new())
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let roles = s.get_role_members(id).await.map_err(|e| e.to_string())?;
    if !roles.is_empty() {
        return Err(format!("expected no roles, got {:?}", roles));
    }
    Ok(())
}

async fn custom_field_values_keep_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = seed_asset(&s, "Laptop", "new").await?;
    let values = vec!["zeta".to_string(), "alpha".to_string(), "mu".to_string()];
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.set_custom_field_values(&mut snap, id, "Tags", values.clone())
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let stored = s
        .get_custom_field_values(id)
        .await
        .map_err(|e| e.to_string())?;
    if stored.len() != 1 || stored[0].values != values {
        return Err(format!("expected {:?}, got {:?}", values, stored));
    }
    Ok(())
}
