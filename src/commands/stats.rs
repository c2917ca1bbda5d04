use crate::models::stat::{StatCreateInput, StatDefinition, StatSummary, StatUpdateInput};

use super::{run_blocking, Actor, AppState, CommandResult};

/// Definitions of `for_user` (the actor when omitted) with trend and streak.
/// `include_all` widens the listing to every owner for admins only.
pub async fn stats_list(
    state: &AppState,
    actor: Actor,
    for_user: Option<String>,
    include_all: bool,
) -> CommandResult<Vec<StatSummary>> {
    let app_state = state.clone();
    run_blocking(move || {
        let for_user = for_user.unwrap_or_else(|| actor.user_id.clone());
        app_state
            .stats()
            .list_definitions(&for_user, actor.is_admin, include_all)
    })
    .await
}

pub async fn stats_get(state: &AppState, stat_id: String) -> CommandResult<StatDefinition> {
    let app_state = state.clone();
    run_blocking(move || app_state.stats().get_definition(&stat_id)).await
}

pub async fn stats_create(
    state: &AppState,
    actor: Actor,
    mut payload: StatCreateInput,
) -> CommandResult<StatDefinition> {
    let app_state = state.clone();
    run_blocking(move || {
        if payload.user_id.trim().is_empty() {
            payload.user_id = actor.user_id.clone();
        }
        if payload.created_by.trim().is_empty() {
            payload.created_by = actor.user_id.clone();
        }
        app_state.authorize(&actor, payload.user_id.trim())?;
        app_state.stats().create_definition(payload)
    })
    .await
}

pub async fn stats_update(
    state: &AppState,
    actor: Actor,
    stat_id: String,
    payload: StatUpdateInput,
) -> CommandResult<StatDefinition> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.authorize_for_stat(&actor, &stat_id)?;
        if let Some(new_owner) = payload.user_id.as_deref() {
            app_state.authorize(&actor, new_owner.trim())?;
        }
        app_state.stats().update_definition(&stat_id, payload)
    })
    .await
}

pub async fn stats_delete(state: &AppState, actor: Actor, stat_id: String) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.authorize_for_stat(&actor, &stat_id)?;
        app_state.stats().delete_definition(&stat_id)
    })
    .await
}
