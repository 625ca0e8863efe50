use super::error::*;
use super::handler;
use crate::application_impl::RevocationGate;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.credential_verifier.clone()))
        .and(with(server.rotation_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.rotation_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_revocation_gate(server.revocation_gate.clone()))
        .and(warp::body::json())
        .and(with(server.rotation_service.clone()))
        .and_then(handler::logout);

    login.or(refresh).or(logout)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Early exit for bearer tokens that are positively known to be revoked.
/// Requests without a bearer token, or with one the gate cannot decode or
/// does not know, continue to whatever authentication the route itself
/// performs; the gate is never the authority on validity.
fn with_revocation_gate(
    gate: Arc<RevocationGate>,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_ref())
        .and_then(move |header: Option<String>| {
            let gate = gate.clone();
            async move {
                if let Some(token) = header.as_deref().and_then(|h| h.strip_prefix("Bearer ")) {
                    let decision = gate
                        .check(token)
                        .await
                        .map_err(ApiErrorCode::from)
                        .map_err(reject::custom)?;
                    if decision.is_rejected() {
                        return Err(reject::custom(ApiErrorCode::TokenRevoked));
                    }
                }
                Ok::<(), warp::Rejection>(())
            }
        })
        .untuple_one()
}
