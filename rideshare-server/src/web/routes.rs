//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, warn};

use crate::domain::{
    BookingId, Coordinates, DomainError, InvalidCoordinates, NewStation, RequesterContext, RideId,
    Station, StationId, UserId,
};
use crate::search::{QuickSearchCriteria, RideSearchCriteria, SearchError};
use crate::stations::{InvalidQuery, MatchError, SearchText, StationRepository};
use crate::store::{BookingError, RideError, StoreError};

use super::dto::*;
use super::state::AppState;

/// Header carrying the caller's user id, set by the authentication layer.
pub const USER_HEADER: &str = "x-user-id";

/// Header carrying the caller's role, set by the authentication layer.
pub const ROLE_HEADER: &str = "x-user-role";

/// Role allowed to manage the station gazetteer.
const ADMIN_ROLE: &str = "admin";

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stations", post(create_station))
        .route("/api/stations/search", get(search_stations))
        .route("/api/stations/nearby", get(nearby_stations))
        .route("/api/stations/city/:city", get(city_stations))
        .route("/api/stations/university/:id", get(university_stations))
        .route("/api/stations/:id/select", post(select_station))
        .route("/api/stations/:id/status", post(update_station_status))
        .route("/api/stations/:id/favorite", post(add_favorite))
        .route("/api/rides", post(publish_ride))
        .route("/api/rides/search", get(search_rides))
        .route("/api/rides/quick-search", get(quick_search))
        .route("/api/rides/suggestions", get(suggestions))
        .route("/api/rides/:id/status", post(update_ride_status))
        .route("/api/routes/popular", get(popular_routes))
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/:id/confirm", post(confirm_booking))
        .route("/api/bookings/:id/cancel", post(cancel_booking))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Who is calling, from the identity header. No header means anonymous.
fn requester(headers: &HeaderMap) -> Result<RequesterContext, AppError> {
    let Some(value) = headers.get(USER_HEADER) else {
        return Ok(RequesterContext::anonymous());
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|id| RequesterContext::user(UserId::new(id)))
        .ok_or_else(|| AppError::BadRequest {
            message: format!("invalid {USER_HEADER} header"),
        })
}

/// The signed-in caller, for endpoints that act on their behalf.
fn signed_in(headers: &HeaderMap) -> Result<UserId, AppError> {
    requester(headers)?.user.ok_or_else(|| AppError::Unauthorized {
        message: "sign in required".to_string(),
    })
}

/// A signed-in caller holding the admin role.
fn admin(headers: &HeaderMap) -> Result<UserId, AppError> {
    let user = signed_in(headers)?;
    let is_admin = headers
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.trim().eq_ignore_ascii_case(ADMIN_ROLE));
    if !is_admin {
        return Err(AppError::Forbidden {
            message: "admin role required".to_string(),
        });
    }
    Ok(user)
}

/// Add a station to the gazetteer.
async fn create_station(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewStation>,
) -> Result<(StatusCode, Json<Station>), AppError> {
    let added_by = admin(&headers)?;
    if let Some(university) = req.university
        && state.store.get(university).await?.is_none()
    {
        return Err(AppError::bad_request(format!(
            "unknown university station {university}"
        )));
    }

    let station = state.store.create_station(&req).await?;
    state.stations.repository().invalidate_all();
    info!(admin = %added_by, station = %station.id, "Station added by admin");
    Ok((StatusCode::CREATED, Json(station)))
}

async fn update_station_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<StationStatusRequest>,
) -> Result<Json<Station>, AppError> {
    admin(&headers)?;
    let id = StationId::new(id);
    let station = state
        .store
        .set_station_status(id, req.status)
        .await?
        .ok_or_else(|| AppError::not_found(MatchError::UnknownStation(id)))?;

    // Cached candidate lists may still hold the station under its old status
    state.stations.repository().invalidate_all();
    Ok(Json(station))
}

/// Mark a station as one of the caller's favourites.
async fn add_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user = signed_in(&headers)?;
    let id = StationId::new(id);
    if state.store.get(id).await?.is_none() {
        return Err(AppError::not_found(MatchError::UnknownStation(id)));
    }

    state.store.add_favorite(user, id).await?;
    state.stations.repository().invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}

/// Autocomplete stations from free text.
async fn search_stations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(req): Query<StationSearchRequest>,
) -> Result<Json<StationSearchResponse>, AppError> {
    let text = SearchText::parse(&req.q)?;
    let limit = state.config.autocomplete_limit(req.limit);

    let stations = state
        .stations
        .autocomplete(&text, limit, requester(&headers)?)
        .await?;

    Ok(Json(StationSearchResponse { stations }))
}

/// Stations around a point, nearest first.
async fn nearby_stations(
    State(state): State<AppState>,
    Query(req): Query<NearbyRequest>,
) -> Result<Json<NearbyResponse>, AppError> {
    let center = Coordinates::new(req.lat, req.lng)?;
    let radius_km = req.radius_km.unwrap_or(state.config.nearby_radius_km);
    let limit = state.config.autocomplete_limit(req.limit);

    let stations = state.stations.nearby(center, radius_km, limit).await?;
    Ok(Json(NearbyResponse { stations }))
}

async fn city_stations(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<StationListResponse>, AppError> {
    let stations = state.stations.by_city(&city).await?;
    Ok(Json(StationListResponse { stations }))
}

async fn university_stations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StationListResponse>, AppError> {
    let stations = state.stations.by_university(StationId::new(id)).await?;
    Ok(Json(StationListResponse { stations }))
}

/// The user picked a suggested station; count it towards its popularity.
async fn select_station(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Station>, AppError> {
    let station = state.stations.accept(StationId::new(id)).await?;
    Ok(Json(station))
}

/// Publish a ride as the calling driver. The ride starts pending.
async fn publish_ride(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PublishRideRequest>,
) -> Result<(StatusCode, Json<RideResponse>), AppError> {
    let driver = signed_in(&headers)?;
    let ride = state.store.create_ride(&req.into_new_ride(driver)).await?;
    Ok((StatusCode::CREATED, Json(RideResponse { ride })))
}

async fn update_ride_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<RideStatusRequest>,
) -> Result<Json<RideResponse>, AppError> {
    let driver = signed_in(&headers)?;
    let ride = state
        .store
        .transition_ride(RideId::new(id), driver, req.status)
        .await?;
    Ok(Json(RideResponse { ride }))
}

/// Search rides between station ids picked in the UI.
async fn search_rides(
    State(state): State<AppState>,
    Query(req): Query<RideSearchRequest>,
) -> Result<Json<RideSearchResponse>, AppError> {
    let criteria = RideSearchCriteria::from(req);
    let outcome = state.search.search(&criteria, today()).await?;
    Ok(Json(outcome.into()))
}

/// Search rides from free text on both sides.
async fn quick_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(req): Query<QuickSearchRequest>,
) -> Result<Json<RideSearchResponse>, AppError> {
    let criteria = QuickSearchCriteria {
        from: SearchText::parse(&req.from)?,
        to: SearchText::parse(&req.to)?,
        date: req.date,
    };

    let outcome = state
        .search
        .quick_search(&criteria, today(), requester(&headers)?)
        .await?;
    Ok(Json(outcome.into()))
}

/// Rides to show before the user has searched anything.
async fn suggestions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(req): Query<LimitRequest>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    let limit = state.config.suggestion_limit(req.limit);
    let rides = state
        .search
        .suggestions(requester(&headers)?, today(), limit)
        .await?;
    Ok(Json(SuggestionsResponse { rides }))
}

async fn popular_routes(
    State(state): State<AppState>,
    Query(req): Query<LimitRequest>,
) -> Result<Json<PopularRoutesResponse>, AppError> {
    let limit = req.limit.unwrap_or(10).clamp(1, 50);
    let routes = state.store.popular_routes(limit).await?;
    Ok(Json(PopularRoutesResponse { routes }))
}

/// Book seats on a ride as the calling passenger.
async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let passenger = signed_in(&headers)?;
    let booking = state
        .store
        .create_booking(req.ride_id, passenger, req.seats)
        .await?;

    // The booking stands even if the preference cannot be updated
    if let Err(e) = state.store.record_booked_route(passenger, booking.ride).await {
        warn!(error = %e, booking = %booking.id, "Failed to record route preference");
    }
    Ok((StatusCode::CREATED, Json(BookingResponse { booking })))
}

/// Confirm a pending booking as the ride's driver.
async fn confirm_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<BookingResponse>, AppError> {
    let driver = signed_in(&headers)?;
    let booking = state
        .store
        .confirm_booking(BookingId::new(id), driver)
        .await?;
    Ok(Json(BookingResponse { booking }))
}

async fn cancel_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<BookingResponse>, AppError> {
    let passenger = signed_in(&headers)?;
    let booking = state
        .store
        .cancel_booking(BookingId::new(id), passenger)
        .await?;
    Ok(Json(BookingResponse { booking }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Unauthorized { message: String },
    Forbidden { message: String },
    NotFound { message: String },
    /// A business rule refused the request
    Conflict { message: String },
    Internal { message: String },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn bad_request(e: impl ToString) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }

    fn not_found(e: impl ToString) -> Self {
        AppError::NotFound {
            message: e.to_string(),
        }
    }

    fn conflict(e: impl ToString) -> Self {
        AppError::Conflict {
            message: e.to_string(),
        }
    }
}

impl From<InvalidQuery> for AppError {
    fn from(e: InvalidQuery) -> Self {
        AppError::bad_request(e)
    }
}

impl From<InvalidCoordinates> for AppError {
    fn from(e: InvalidCoordinates) -> Self {
        AppError::bad_request(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Invalid(_) => AppError::bad_request(e),
            _ => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<MatchError> for AppError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::InvalidQuery(_) | MatchError::InvalidRadius(_) => AppError::bad_request(e),
            MatchError::UnknownStation(_) => AppError::not_found(e),
            MatchError::Store(e) => e.into(),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidRequest(message) => AppError::bad_request(message),
            SearchError::Stations(e) => e.into(),
            SearchError::Store(e) => e.into(),
        }
    }
}

impl From<RideError> for AppError {
    fn from(e: RideError) -> Self {
        match e {
            RideError::RideNotFound(_) | RideError::UnknownStation(_) => AppError::not_found(e),
            RideError::NotDriver(_) => AppError::Forbidden {
                message: e.to_string(),
            },
            RideError::HasActiveBookings(_)
            | RideError::Invalid(DomainError::InvalidTransition { .. }) => AppError::conflict(e),
            RideError::Invalid(_) => AppError::bad_request(e),
            RideError::Store(e) => e.into(),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::RideNotFound(_) | BookingError::BookingNotFound(_) => {
                AppError::not_found(e)
            }
            BookingError::InvalidSeats(_) => AppError::bad_request(e),
            BookingError::NotDriver(_) => AppError::Forbidden {
                message: e.to_string(),
            },
            BookingError::Store(e) => e.into(),
            _ => AppError::conflict(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match self {
            AppError::Internal { message } => {
                error!(%message, "Request failed");
                "internal server error".to_string()
            }
            AppError::BadRequest { message }
            | AppError::Unauthorized { message }
            | AppError::Forbidden { message }
            | AppError::NotFound { message }
            | AppError::Conflict { message } => {
                debug!(status = status.as_u16(), %message, "Request rejected");
                message
            }
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
