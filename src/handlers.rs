use axum::extract::{Path, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use axum_extra::extract::TypedHeader;
use tracing::warn;

use crate::identity::{XMemberId, require_member};
use crate::models::{
    ClassDetails, ClassFields, ClassId, ClassView, MemberId, ToggleResponse, UpdateClassRequest,
};
use crate::store::ClassCatalog;
use crate::validation::validate_class_fields;
use crate::{AppState, error::ApiError};

#[utoipa::path(get, path = "/", tag = "booking")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Gym Booking API",
        "endpoints": {
            "/classes": "List and manage gym classes",
            "/classes/{id}/toggle": "Book or release a seat in a class",
            "/members/me/classes": "Classes the current member attends",
            "/members/me/classes.ical": "Download booked classes as iCal file"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "booking")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/healthz/ready",
    responses(
        (status = 200, description = "Database reachable"),
        (status = 503, description = "Database unreachable")
    ),
    tag = "booking"
)]
pub async fn healthz_ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))),
        Err(err) => {
            warn!(error = %err, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "unavailable"})),
            )
        }
    }
}

#[utoipa::path(
    get,
    path = "/classes",
    responses((status = 200, description = "Classes ordered by start time", body = [ClassView])),
    tag = "classes"
)]
pub async fn list_classes(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let classes = state.store.list_classes().await?;
    let views: Vec<ClassView> = classes.into_iter().map(ClassView::from).collect();
    Ok(Json(views))
}

#[utoipa::path(
    post,
    path = "/classes",
    request_body = ClassFields,
    responses(
        (status = 201, description = "Class created", body = ClassView),
        (status = 422, description = "Validation failed", body = [crate::validation::FieldError])
    ),
    tag = "classes"
)]
pub async fn create_class(
    State(state): State<AppState>,
    Json(fields): Json<ClassFields>,
) -> Result<impl IntoResponse, ApiError> {
    let class = validate_class_fields(fields, &state.settings.duration_bounds())
        .map_err(ApiError::Validation)?;
    let created = state.store.create_class(&class).await?;
    Ok((StatusCode::CREATED, Json(ClassView::from(created))))
}

#[utoipa::path(
    get,
    path = "/classes/{id}",
    params(("id" = i64, Path, description = "Class identifier")),
    responses(
        (status = 200, description = "Class with attendees", body = ClassDetails),
        (status = 404, description = "Class not found")
    ),
    tag = "classes"
)]
pub async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ClassId(id);
    let class = state
        .store
        .find_class(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Class not found".into()))?;
    let attendees = state.store.attendees(id).await?;
    let end_time = class.end_time();
    Ok(Json(ClassDetails {
        class,
        end_time,
        attendees,
    }))
}

#[utoipa::path(
    put,
    path = "/classes/{id}",
    params(("id" = i64, Path, description = "Class identifier")),
    request_body = UpdateClassRequest,
    responses(
        (status = 200, description = "Class updated", body = ClassView),
        (status = 404, description = "Class not found"),
        (status = 409, description = "Stale version"),
        (status = 422, description = "Validation failed", body = [crate::validation::FieldError])
    ),
    tag = "classes"
)]
pub async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateClassRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let class = validate_class_fields(req.fields, &state.settings.duration_bounds())
        .map_err(ApiError::Validation)?;
    let updated = state
        .store
        .update_class(ClassId(id), req.version, &class)
        .await?;
    Ok(Json(ClassView::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/classes/{id}",
    params(("id" = i64, Path, description = "Class identifier")),
    responses(
        (status = 204, description = "Class and its bookings deleted"),
        (status = 404, description = "Class not found")
    ),
    tag = "classes"
)]
pub async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.delete_class(ClassId(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Class not found".into()))
    }
}

#[utoipa::path(
    post,
    path = "/classes/{id}/toggle",
    params(("id" = i64, Path, description = "Class identifier")),
    responses(
        (status = 200, description = "Booking state after the toggle", body = ToggleResponse),
        (status = 401, description = "Missing member identity"),
        (status = 404, description = "Class or member not found"),
        (status = 409, description = "Class is full"),
        (status = 503, description = "Storage unavailable, safe to retry")
    ),
    security(("member_id" = [])),
    tag = "booking"
)]
pub async fn toggle_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    member: Option<TypedHeader<XMemberId>>,
) -> Result<impl IntoResponse, ApiError> {
    let member = require_member(member.map(|TypedHeader(m)| m))?;
    let outcome = state.toggle.toggle(&member, ClassId(id)).await?;
    Ok(Json(ToggleResponse { outcome }))
}

#[utoipa::path(
    put,
    path = "/members/{id}",
    params(("id" = String, Path, description = "Member identifier issued by the identity system")),
    responses((status = 204, description = "Member known to the booking service")),
    tag = "members"
)]
pub async fn register_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::BadRequest("member id must not be empty".into()));
    }
    state.store.register_member(&MemberId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/members/me/classes",
    responses(
        (status = 200, description = "Classes the member attends", body = [ClassView]),
        (status = 401, description = "Missing member identity")
    ),
    security(("member_id" = [])),
    tag = "members"
)]
pub async fn my_classes(
    State(state): State<AppState>,
    member: Option<TypedHeader<XMemberId>>,
) -> Result<impl IntoResponse, ApiError> {
    let member = require_member(member.map(|TypedHeader(m)| m))?;
    let classes = state.store.classes_for_member(&member).await?;
    let views: Vec<ClassView> = classes.into_iter().map(ClassView::from).collect();
    Ok(Json(views))
}

#[utoipa::path(
    get,
    path = "/members/me/classes.ical",
    responses(
        (status = 200, description = "iCal file", content_type = "text/calendar"),
        (status = 401, description = "Missing member identity"),
        (status = 404, description = "No classes booked")
    ),
    security(("member_id" = [])),
    tag = "members"
)]
pub async fn my_classes_ical(
    State(state): State<AppState>,
    member: Option<TypedHeader<XMemberId>>,
) -> Result<impl IntoResponse, ApiError> {
    let member = require_member(member.map(|TypedHeader(m)| m))?;
    let classes = state.store.classes_for_member(&member).await?;

    if classes.is_empty() {
        return Err(ApiError::NotFound("No classes booked".into()));
    }

    let body = state.exporter.generate(&member, &classes);
    Ok((
        StatusCode::OK,
        [
            ("content-type", "text/calendar"),
            (
                "content-disposition",
                "attachment; filename=gym_bookings.ics",
            ),
        ],
        body,
    ))
}
