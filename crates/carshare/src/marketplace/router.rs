use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, CarFilter, CarId, CarUpdate, NewCar, NewOffer, NewRent, OfferId, OfferUpdate, RentId,
    UserId,
};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::service::{MarketplaceError, MarketplaceService};
use crate::clock::Clock;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

type SharedService<R, C> = Arc<MarketplaceService<R, C>>;

/// Router builder exposing the car, offer and rent endpoints.
pub fn marketplace_router<R, C>(service: SharedService<R, C>) -> Router
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route(
            "/api/v1/cars",
            post(create_car_handler::<R, C>).get(list_cars_handler::<R, C>),
        )
        .route(
            "/api/v1/cars/:car_id",
            get(get_car_handler::<R, C>)
                .put(update_car_handler::<R, C>)
                .delete(delete_car_handler::<R, C>),
        )
        .route(
            "/api/v1/offers",
            post(create_offer_handler::<R, C>).get(list_offers_handler::<R, C>),
        )
        .route(
            "/api/v1/offers/:offer_id",
            get(get_offer_handler::<R, C>)
                .put(update_offer_handler::<R, C>)
                .delete(delete_offer_handler::<R, C>),
        )
        .route(
            "/api/v1/rents",
            post(create_rent_handler::<R, C>).get(list_rents_handler::<R, C>),
        )
        .route("/api/v1/rents/:rent_id", get(get_rent_handler::<R, C>))
        .route(
            "/api/v1/rents/:rent_id/close",
            post(close_rent_handler::<R, C>),
        )
        .route(
            "/api/v1/maintenance/refresh-rents",
            post(refresh_handler::<R, C>),
        )
        .with_state(service)
}

/// Identity forwarded by the authenticating proxy in front of the API.
///
/// `x-user-id` carries the numeric account id; `x-user-role: admin` grants staff rights.
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                let payload = json!({ "error": "authentication required" });
                (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
            })?;

        let is_admin = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));

        Ok(Actor {
            user_id: UserId(user_id),
            is_admin,
        })
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        match self {
            MarketplaceError::Validation(errors) => {
                let payload = json!({
                    "error": errors.to_string(),
                    "fields": errors.messages(),
                });
                (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
            }
            MarketplaceError::BusinessRule(rule) => {
                let payload = json!({ "error": rule.to_string() });
                (StatusCode::CONFLICT, axum::Json(payload)).into_response()
            }
            MarketplaceError::NotFound(entity) => {
                let payload = json!({ "error": format!("{entity} not found") });
                (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
            }
            MarketplaceError::Repository(RepositoryError::NotFound) => {
                let payload = json!({ "error": "record not found" });
                (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
            }
            MarketplaceError::Forbidden(_) => {
                let payload = json!({ "error": "you are not allowed to do that" });
                (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
            }
            other => {
                tracing::error!(error = %other, "marketplace request failed");
                let payload = json!({ "error": other.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
            }
        }
    }
}

fn respond<T: serde::Serialize>(status: StatusCode, outcome: Result<T, MarketplaceError>) -> Response {
    match outcome {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_car_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    axum::Json(submission): axum::Json<NewCar>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::CREATED, service.create_car(&actor, submission))
}

pub(crate) async fn list_cars_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    Query(filter): Query<CarFilter>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::OK, service.list_cars(&actor, &filter))
}

pub(crate) async fn get_car_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    Path(car_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::OK, service.get_car(&actor, CarId(car_id)))
}

pub(crate) async fn update_car_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    Path(car_id): Path<u64>,
    axum::Json(update): axum::Json<CarUpdate>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(
        StatusCode::OK,
        service.update_car(&actor, CarId(car_id), update),
    )
}

pub(crate) async fn delete_car_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    Path(car_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    match service.delete_car(&actor, CarId(car_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_offer_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    axum::Json(submission): axum::Json<NewOffer>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::CREATED, service.create_offer(&actor, submission))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OfferListQuery {
    #[serde(default)]
    mine: bool,
}

pub(crate) async fn list_offers_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    Query(query): Query<OfferListQuery>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::OK, service.list_offers(&actor, query.mine))
}

pub(crate) async fn get_offer_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    _actor: Actor,
    Path(offer_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::OK, service.get_offer(OfferId(offer_id)))
}

pub(crate) async fn update_offer_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    Path(offer_id): Path<u64>,
    axum::Json(update): axum::Json<OfferUpdate>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(
        StatusCode::OK,
        service.update_offer(&actor, OfferId(offer_id), update),
    )
}

pub(crate) async fn delete_offer_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    Path(offer_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    match service.delete_offer(&actor, OfferId(offer_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_rent_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    axum::Json(booking): axum::Json<NewRent>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::CREATED, service.create_rent(&actor, booking))
}

pub(crate) async fn list_rents_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::OK, service.list_rents(&actor))
}

pub(crate) async fn get_rent_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    Path(rent_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::OK, service.get_rent(&actor, RentId(rent_id)))
}

pub(crate) async fn close_rent_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
    Path(rent_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    respond(StatusCode::OK, service.close_rent(&actor, RentId(rent_id)))
}

/// Staff trigger for the status sweep; the scheduler runs the same sweep daily.
pub(crate) async fn refresh_handler<R, C>(
    State(service): State<SharedService<R, C>>,
    actor: Actor,
) -> Response
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    if !actor.is_admin {
        return MarketplaceError::Forbidden(actor.user_id).into_response();
    }
    respond(StatusCode::OK, service.refresh_statuses())
}
