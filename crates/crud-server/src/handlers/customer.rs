//! Customer handlers

use super::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crud_core::{Customer, EntityId};
use tracing::info;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = state.customer_service.read_all().await?;
    Ok(Json(customers))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> Result<Response, ApiError> {
    match state.customer_service.read(id).await? {
        Some(customer) => Ok(Json(customer).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(customer): Json<Customer>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let created = state.customer_service.create(customer).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Json(customer): Json<Customer>,
) -> Result<Json<Customer>, ApiError> {
    info!("Updating customer {:?}", customer.customer_id);
    let updated = state.customer_service.update(customer).await?;
    Ok(Json(updated))
}

pub async fn update_address(
    State(state): State<AppState>,
    Path((customer_id, address_id)): Path<(EntityId, EntityId)>,
) -> Result<Json<Customer>, ApiError> {
    let updated = state
        .customer_service
        .update_customer_address(customer_id, address_id)
        .await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> Result<StatusCode, ApiError> {
    state.customer_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
