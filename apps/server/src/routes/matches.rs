use actix_web::web::{Data, Json, Path, Query, ServiceConfig};
use actix_web::get;
use serde::Deserialize;
use trustmesh::matching::MatchResult;
use trustmesh::IdentityId;

use crate::error::AppError;
use crate::identity::Caller;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

pub fn routes(cfg: &mut ServiceConfig) {
    cfg.service(get_matches).service(get_match_detail);
}

#[derive(Deserialize)]
struct MatchQuery {
    limit: Option<usize>,
}

/// Match results are private to the candidate.
fn candidate_of(caller: &Caller, candidate: String) -> Result<IdentityId, AppError> {
    let candidate = IdentityId::new(candidate);
    if caller.0 != candidate {
        return Err(trustmesh::Error::NotOwner { actor: caller.0.clone(), resource: format!("matches of {candidate}") }.into());
    }
    Ok(candidate)
}

#[get("/matches/{candidate}")]
async fn get_matches(
    state: Data<AppState>,
    caller: Caller,
    candidate: Path<String>,
    query: Query<MatchQuery>,
) -> Result<Json<Vec<MatchResult>>, AppError> {
    let candidate = candidate_of(&caller, candidate.into_inner())?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    Ok(Json(state.matches.get_matches(&candidate, limit).await?))
}

#[get("/matches/{candidate}/{opportunity}")]
async fn get_match_detail(
    state: Data<AppState>,
    caller: Caller,
    path: Path<(String, String)>,
) -> Result<Json<MatchResult>, AppError> {
    let (candidate, opportunity) = path.into_inner();
    let candidate = candidate_of(&caller, candidate)?;
    Ok(Json(state.matches.get_match_detail(&candidate, &opportunity).await?))
}
