//! Address handlers

use super::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crud_core::{Address, EntityId};
use tracing::info;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Address>>, ApiError> {
    let addresses = state.address_service.read_all().await?;
    Ok(Json(addresses))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> Result<Response, ApiError> {
    match state.address_service.read(id).await? {
        Some(address) => Ok(Json(address).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(address): Json<Address>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    let created = state.address_service.create(address).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Json(address): Json<Address>,
) -> Result<Json<Address>, ApiError> {
    info!("Updating address {:?}", address.address_id);
    let updated = state.address_service.update(address).await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> Result<StatusCode, ApiError> {
    state.address_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{build_router, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `oneshot`

    async fn test_app() -> Router {
        build_router(AppState::in_memory().await.unwrap())
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn lake_street() -> Value {
        json!({
            "streetName": "Lake",
            "city": "Takapuna",
            "country": "New Zealand",
            "streetNumber": "33a",
            "streetType": "street"
        })
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let app = test_app().await;

        let (status, body) = send(&app, Method::POST, "/address", Some(lake_street())).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Value = serde_json::from_slice(&body).unwrap();
        let id = created["addressId"].as_i64().expect("addressId assigned");
        for field in ["streetName", "city", "country", "streetNumber", "streetType"] {
            assert_eq!(created[field], lake_street()[field]);
        }

        let (status, body) = send(&app, Method::GET, &format!("/address/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_list() {
        let app = test_app().await;

        let (status, body) = send(&app, Method::GET, "/address", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!([]));

        send(&app, Method::POST, "/address", Some(lake_street())).await;
        let (_, body) = send(&app, Method::GET, "/address", None).await;
        let list: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_get_missing_is_404_with_empty_body() {
        let app = test_app().await;

        let (status, body) = send(&app, Method::GET, "/address/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_create_with_id_conflicts() {
        let app = test_app().await;

        let mut address = lake_street();
        address["addressId"] = json!(12);
        let (status, _) = send(&app, Method::POST, "/address", Some(address)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = send(&app, Method::GET, "/address", None).await;
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_update() {
        let app = test_app().await;
        let (_, body) = send(&app, Method::POST, "/address", Some(lake_street())).await;
        let mut address: Value = serde_json::from_slice(&body).unwrap();

        address["suburb"] = json!("Hauraki");
        let (status, body) = send(&app, Method::PUT, "/address", Some(address.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), address);

        let mut ghost = address.clone();
        ghost["addressId"] = json!(9999);
        let (status, _) = send(&app, Method::PUT, "/address", Some(ghost)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_delete() {
        let app = test_app().await;
        let (_, body) = send(&app, Method::POST, "/address", Some(lake_street())).await;
        let id = serde_json::from_slice::<Value>(&body).unwrap()["addressId"]
            .as_i64()
            .unwrap();

        let (status, body) = send(&app, Method::DELETE, &format!("/address/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());

        let (status, _) = send(&app, Method::GET, &format!("/address/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_referenced_address_is_server_error() {
        let app = test_app().await;
        let (_, body) = send(&app, Method::POST, "/address", Some(lake_street())).await;
        let address: Value = serde_json::from_slice(&body).unwrap();
        let id = address["addressId"].as_i64().unwrap();

        let customer = json!({ "name": "Aroha", "address": { "addressId": id } });
        let (status, _) = send(&app, Method::POST, "/customer", Some(customer)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, Method::DELETE, &format!("/address/{id}"), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"], "integrity_violation");
        assert_eq!(error["cause"]["constraint"], "fk_customer_address");
        assert_eq!(error["cause"]["operation"], format!("delete address {id}"));

        let (status, body) = send(&app, Method::GET, &format!("/address/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), address);
    }
}
