use actix_web::web::{Data, Json, Path, ServiceConfig};
use actix_web::{HttpResponse, get, patch, post, put};
use serde::Deserialize;
use trustmesh::matching::{Opportunity, OpportunityStatus, OpportunityUpdate};
use trustmesh::privacy::AvailabilityWindow;

use crate::error::AppError;
use crate::identity::Caller;
use crate::state::AppState;

pub fn routes(cfg: &mut ServiceConfig) {
    cfg.service(create).service(get_one).service(update).service(set_status);
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOpportunity {
    id: String,
    category: String,
    #[serde(default)]
    required_skills: Vec<String>,
    #[serde(default)]
    required_resources: Vec<String>,
    timeline: AvailabilityWindow,
    #[serde(default)]
    budget: Option<u64>,
}

#[derive(Deserialize)]
struct StatusBody {
    status: OpportunityStatus,
}

/// Publish an opportunity created by the caller. It starts out open.
#[post("/opportunities")]
async fn create(state: Data<AppState>, caller: Caller, body: Json<NewOpportunity>) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let timeline = AvailabilityWindow::new(body.timeline.start, body.timeline.end)?;
    let mut opportunity = Opportunity::new(body.id, caller.0.clone(), body.category, timeline)
        .with_skills(body.required_skills)
        .with_resources(body.required_resources);
    opportunity.budget = body.budget;

    state.opportunities.publish(&caller.0, opportunity.clone()).await?;
    Ok(HttpResponse::Created().json(opportunity))
}

#[get("/opportunities/{id}")]
async fn get_one(state: Data<AppState>, id: Path<String>) -> Result<Json<Opportunity>, AppError> {
    Ok(Json(state.opportunities.get(&id).await?))
}

#[patch("/opportunities/{id}")]
async fn update(
    state: Data<AppState>,
    caller: Caller,
    id: Path<String>,
    body: Json<OpportunityUpdate>,
) -> Result<Json<Opportunity>, AppError> {
    state.opportunities.update(&caller.0, &id, body.into_inner()).await?;
    Ok(Json(state.opportunities.get(&id).await?))
}

#[put("/opportunities/{id}/status")]
async fn set_status(
    state: Data<AppState>,
    caller: Caller,
    id: Path<String>,
    body: Json<StatusBody>,
) -> Result<HttpResponse, AppError> {
    state.opportunities.transition(&caller.0, &id, body.status).await?;
    Ok(HttpResponse::NoContent().finish())
}
