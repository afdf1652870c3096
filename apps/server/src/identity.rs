use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use trustmesh::IdentityId;

use crate::error::AppError;

pub const IDENTITY_HEADER: &str = "X-Identity";

/// The authenticated caller, as asserted by the upstream gateway.
pub struct Caller(pub IdentityId);

impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identity = req
            .headers()
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(IdentityId::new);
        ready(identity.map(Caller).ok_or(AppError::MissingIdentity))
    }
}
