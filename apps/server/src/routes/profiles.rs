use std::collections::BTreeMap;

use actix_web::web::{Data, Json, Path, ServiceConfig};
use actix_web::{HttpResponse, get, put};
use serde::Deserialize;
use trustmesh::IdentityId;
use trustmesh::privacy::{FieldValue, PartialProfile, Profile, ProfileField};

use crate::error::AppError;
use crate::identity::Caller;
use crate::state::AppState;

pub fn routes(cfg: &mut ServiceConfig) {
    cfg.service(put_profile).service(get_profile);
}

#[derive(Deserialize)]
struct ProfileBody {
    #[serde(default)]
    fields: BTreeMap<ProfileField, FieldValue>,
}

/// Replace the caller's own profile.
#[put("/profiles/{owner}")]
async fn put_profile(
    state: Data<AppState>,
    caller: Caller,
    owner: Path<String>,
    body: Json<ProfileBody>,
) -> Result<HttpResponse, AppError> {
    let owner = IdentityId::new(owner.into_inner());
    let mut profile = Profile::new(owner.clone());
    for (field, value) in body.into_inner().fields {
        profile.set(field, value)?;
    }

    state.privacy.put_profile(&caller.0, profile)?;
    if let Err(e) = state.matches.on_profile_update(&owner).await {
        tracing::debug!(owner = %owner, error = %e, "Skipped rescoring after profile update");
    }
    Ok(HttpResponse::NoContent().finish())
}

/// The profile as the caller is entitled to see it.
#[get("/profiles/{owner}")]
async fn get_profile(state: Data<AppState>, caller: Caller, owner: Path<String>) -> Result<Json<PartialProfile>, AppError> {
    let owner = IdentityId::new(owner.into_inner());
    Ok(Json(state.privacy.view(&owner, &caller.0)?))
}
