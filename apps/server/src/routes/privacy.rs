use std::collections::BTreeMap;

use actix_web::web::{Data, Json, Path, ServiceConfig};
use actix_web::{HttpResponse, get, put};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trustmesh::IdentityId;
use trustmesh::privacy::{ConnectionTier, DisclosureLevel, PrivacySettings, ProfileField};

use crate::error::AppError;
use crate::identity::Caller;
use crate::state::AppState;

pub fn routes(cfg: &mut ServiceConfig) {
    cfg.service(get_settings)
        .service(put_field_levels)
        .service(put_field_level)
        .service(get_connection)
        .service(put_connection);
}

#[derive(Deserialize)]
struct LevelBody {
    level: DisclosureLevel,
}

#[derive(Deserialize)]
struct TierBody {
    tier: ConnectionTier,
}

#[derive(Serialize)]
struct ConnectionView {
    owner: IdentityId,
    connection: IdentityId,
    tier: ConnectionTier,
}

/// Settings are private to their owner.
fn ensure_self(caller: &Caller, owner: &IdentityId) -> Result<(), AppError> {
    if &caller.0 != owner {
        return Err(trustmesh::Error::NotOwner { actor: caller.0.clone(), resource: format!("privacy settings of {owner}") }.into());
    }
    Ok(())
}

/// Settings changes alter what opportunity creators see, so rescore.
async fn rescore(state: &AppState, owner: &IdentityId) {
    if let Err(e) = state.matches.on_profile_update(owner).await {
        tracing::debug!(owner = %owner, error = %e, "Skipped rescoring after settings change");
    }
}

#[get("/privacy/{owner}")]
async fn get_settings(state: Data<AppState>, caller: Caller, owner: Path<String>) -> Result<Json<PrivacySettings>, AppError> {
    let owner = IdentityId::new(owner.into_inner());
    ensure_self(&caller, &owner)?;
    Ok(Json(state.privacy.settings(&owner)))
}

#[put("/privacy/{owner}/fields/{field}")]
async fn put_field_level(
    state: Data<AppState>,
    caller: Caller,
    path: Path<(String, String)>,
    body: Json<LevelBody>,
) -> Result<HttpResponse, AppError> {
    let (owner, field) = path.into_inner();
    let owner = IdentityId::new(owner);
    let field: ProfileField = field.parse()?;

    state.privacy.set_field_level(&caller.0, &owner, field, body.level)?;
    rescore(&state, &owner).await;
    Ok(HttpResponse::NoContent().finish())
}

/// Batch update, e.g. `{"email": "close", "skills": 1}`. Nothing is applied
/// unless every entry parses.
#[put("/privacy/{owner}/fields")]
async fn put_field_levels(
    state: Data<AppState>,
    caller: Caller,
    owner: Path<String>,
    body: Json<BTreeMap<String, Value>>,
) -> Result<HttpResponse, AppError> {
    let owner = IdentityId::new(owner.into_inner());
    let raw = body
        .into_inner()
        .into_iter()
        .map(|(field, level)| match level {
            Value::String(name) => Ok((field, name)),
            Value::Number(n) => Ok((field, n.to_string())),
            other => Err(AppError::BadRequest(format!("level for {field} must be a number or name, got {other}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    state
        .privacy
        .set_field_levels_raw(&caller.0, &owner, raw.iter().map(|(f, l)| (f.as_str(), l.as_str())))?;
    rescore(&state, &owner).await;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/privacy/{owner}/connections/{connection}")]
async fn get_connection(
    state: Data<AppState>,
    caller: Caller,
    path: Path<(String, String)>,
) -> Result<Json<ConnectionView>, AppError> {
    let (owner, connection) = path.into_inner();
    let (owner, connection) = (IdentityId::new(owner), IdentityId::new(connection));
    ensure_self(&caller, &owner)?;
    let tier = state.privacy.connection_tier(&owner, &connection);
    Ok(Json(ConnectionView { owner, connection, tier }))
}

#[put("/privacy/{owner}/connections/{connection}")]
async fn put_connection(
    state: Data<AppState>,
    caller: Caller,
    path: Path<(String, String)>,
    body: Json<TierBody>,
) -> Result<HttpResponse, AppError> {
    let (owner, connection) = path.into_inner();
    let (owner, connection) = (IdentityId::new(owner), IdentityId::new(connection));

    state.privacy.set_connection_tier(&caller.0, &owner, &connection, body.tier)?;
    // The graph is undirected: an edge stands while either side still
    // declares a tier.
    let reverse = state.privacy.connection_tier(&connection, &owner);
    if body.tier == ConnectionTier::Unconnected && reverse == ConnectionTier::Unconnected {
        state.graph.disconnect(&owner, &connection);
    } else {
        state.graph.connect(&owner, &connection);
    }
    rescore(&state, &owner).await;
    rescore(&state, &connection).await;
    Ok(HttpResponse::NoContent().finish())
}
