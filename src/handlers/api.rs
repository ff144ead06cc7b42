use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::models::{
    AddFoodEatenRequest, FoodDto, FoodEatenDto, FoodOutcomeResponse, RepositoryError,
    ServiceError, UpdateFoodEatenRequest, Validate,
};
use crate::services::FoodService;

/// Shared state for the public API
#[derive(Clone)]
pub struct ApiState {
    pub food_service: Arc<FoodService>,
}

/// `?date=YYYY-MM-DD`, defaulting to today (UTC)
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

impl DateQuery {
    fn date_or_today(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

/// Response for logging a food
#[derive(Debug, Serialize, Deserialize)]
pub struct AddFoodEatenResponse {
    pub created: bool,
    pub message: String,
}

type ApiError = (StatusCode, Json<Value>);

/// Create API router with all public endpoints
pub fn create_api_router(food_service: Arc<FoodService>) -> Router {
    Router::new()
        .route(
            "/api/users/:user_id/foods-eaten",
            get(find_eaten_on_date).post(add_food_eaten),
        )
        .route(
            "/api/users/:user_id/foods-eaten/recent",
            get(find_eaten_recently),
        )
        .route(
            "/api/foods-eaten/:id",
            get(get_food_eaten)
                .put(update_food_eaten)
                .delete(delete_food_eaten),
        )
        .route(
            "/api/users/:user_id/foods",
            get(search_foods).post(create_food),
        )
        .route("/api/users/:user_id/foods/:food_id", put(update_food))
        .route("/api/foods/:food_id", get(get_food))
        .with_state(ApiState { food_service })
}

// =============================================================================
// FOOD EATEN ENDPOINTS
// =============================================================================

#[instrument(name = "find_eaten_on_date", skip(state), fields(user_id = %user_id))]
pub async fn find_eaten_on_date(
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<FoodEatenDto>>, ApiError> {
    let date = query.date_or_today();

    state
        .food_service
        .find_eaten_on_date(user_id, date)
        .await
        .map(Json)
        .map_err(|err| {
            error!("Failed to list foods eaten on {}: {}", date, err);
            service_error_to_response(err)
        })
}

#[instrument(name = "find_eaten_recently", skip(state), fields(user_id = %user_id))]
pub async fn find_eaten_recently(
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<FoodDto>>, ApiError> {
    state
        .food_service
        .find_eaten_recently(user_id, query.date_or_today())
        .await
        .map(Json)
        .map_err(|err| {
            error!("Failed to list recently eaten foods: {}", err);
            service_error_to_response(err)
        })
}

/// Log a food for a date; 201 when created, 200 when it was already logged
#[instrument(name = "add_food_eaten", skip(state, request), fields(
    user_id = %user_id,
    food_id = %request.food_id,
    date = %request.date,
))]
pub async fn add_food_eaten(
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AddFoodEatenRequest>,
) -> Result<(StatusCode, Json<AddFoodEatenResponse>), ApiError> {
    match state
        .food_service
        .add_food_eaten(user_id, request.food_id, request.date)
        .await
    {
        Ok(true) => Ok((
            StatusCode::CREATED,
            Json(AddFoodEatenResponse {
                created: true,
                message: "Food logged".to_string(),
            }),
        )),
        Ok(false) => Ok((
            StatusCode::OK,
            Json(AddFoodEatenResponse {
                created: false,
                message: "Food already logged for this date".to_string(),
            }),
        )),
        Err(err) => {
            error!("Failed to log food: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "get_food_eaten", skip(state), fields(id = %id))]
pub async fn get_food_eaten(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FoodEatenDto>, ApiError> {
    match state.food_service.find_food_eaten_by_id(id).await {
        Ok(Some(food_eaten)) => Ok(Json(food_eaten)),
        Ok(None) => Err(service_error_to_response(ServiceError::FoodEatenNotFound {
            id,
        })),
        Err(err) => {
            error!("Failed to get food eaten {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_food_eaten", skip(state, request), fields(
    id = %id,
    serving_qty = %request.serving_qty,
    serving_type = %request.serving_type,
))]
pub async fn update_food_eaten(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateFoodEatenRequest>,
) -> Result<Json<FoodEatenDto>, ApiError> {
    request
        .validate()
        .map_err(|err| service_error_to_response(err.into()))?;

    state
        .food_service
        .update_food_eaten(id, request.serving_qty, request.serving_type)
        .await
        .map(Json)
        .map_err(|err| {
            error!("Failed to update food eaten {}: {}", id, err);
            service_error_to_response(err)
        })
}

#[instrument(name = "delete_food_eaten", skip(state), fields(id = %id))]
pub async fn delete_food_eaten(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.food_service.delete_food_eaten(id).await {
        Ok(()) => {
            info!("Deleted food eaten {}", id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(err) => {
            error!("Failed to delete food eaten {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

// =============================================================================
// FOOD ENDPOINTS
// =============================================================================

#[instrument(name = "search_foods", skip(state), fields(user_id = %user_id, search = %query.search))]
pub async fn search_foods(
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FoodDto>>, ApiError> {
    state
        .food_service
        .search_foods(user_id, &query.search)
        .await
        .map(Json)
        .map_err(|err| {
            error!("Failed to search foods: {}", err);
            service_error_to_response(err)
        })
}

#[instrument(name = "get_food", skip(state), fields(food_id = %food_id))]
pub async fn get_food(
    State(state): State<ApiState>,
    Path(food_id): Path<Uuid>,
) -> Result<Json<FoodDto>, ApiError> {
    match state.food_service.get_food_by_id(food_id).await {
        Ok(Some(food)) => Ok(Json(food)),
        Ok(None) => Err(service_error_to_response(ServiceError::FoodNotFound {
            id: food_id,
        })),
        Err(err) => {
            error!("Failed to get food {}: {}", food_id, err);
            Err(service_error_to_response(err))
        }
    }
}

/// Create a food owned by the user. Name collisions come back as `success: false`.
#[instrument(name = "create_food", skip(state, dto), fields(user_id = %user_id, name = %dto.name))]
pub async fn create_food(
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
    Json(dto): Json<FoodDto>,
) -> Result<Json<FoodOutcomeResponse>, ApiError> {
    crate::info_with_trace!("Creating food {} for user {}", dto.name, user_id);

    state
        .food_service
        .create_food(&dto, user_id)
        .await
        .map(|outcome| Json(outcome.into()))
        .map_err(|err| {
            error!("Failed to create food: {}", err);
            service_error_to_response(err)
        })
}

#[instrument(name = "update_food", skip(state, dto), fields(user_id = %user_id, food_id = %food_id))]
pub async fn update_food(
    State(state): State<ApiState>,
    Path((user_id, food_id)): Path<(Uuid, Uuid)>,
    Json(mut dto): Json<FoodDto>,
) -> Result<Json<FoodOutcomeResponse>, ApiError> {
    // The path names the food being edited
    dto.id = Some(food_id);

    state
        .food_service
        .update_food(&dto, user_id)
        .await
        .map(|outcome| Json(outcome.into()))
        .map_err(|err| {
            error!("Failed to update food {}: {}", food_id, err);
            service_error_to_response(err)
        })
}

/// Convert ServiceError to HTTP response
pub(crate) fn service_error_to_response(err: ServiceError) -> ApiError {
    let (status, message) = match err {
        ServiceError::FoodNotFound { .. }
        | ServiceError::FoodEatenNotFound { .. }
        | ServiceError::UserNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::ValidationError { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::Repository { source } => match source {
            RepositoryError::ConnectionFailed => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Database connection failed".to_string(),
            ),
            RepositoryError::Timeout => {
                (StatusCode::REQUEST_TIMEOUT, "Request timeout".to_string())
            }
            RepositoryError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        },
    };

    (
        status,
        Json(json!({
            "error": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodOwner, NutritionFacts, ServingType, User};
    use crate::repositories::{FoodRepository, InMemoryStore, UserRepository};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    async fn setup() -> (Router, Arc<InMemoryStore>, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        let user = UserRepository::save(store.as_ref(), User::new("api@example.com"))
            .await
            .unwrap();
        let service = Arc::new(FoodService::new(store.clone(), store.clone(), store.clone()));
        (create_api_router(service), store, user.id)
    }

    fn food_json(name: &str) -> Value {
        json!({
            "name": name,
            "default_serving_type": "ounce",
            "serving_type_qty": "4",
            "nutrition": { "calories": "95" }
        })
    }

    fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_service_error_status_mapping() {
        let cases = vec![
            (
                ServiceError::FoodNotFound { id: Uuid::nil() },
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::UserNotFound { id: Uuid::nil() },
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::ValidationError {
                    message: "bad".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Repository {
                    source: RepositoryError::ConnectionFailed,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServiceError::Repository {
                    source: RepositoryError::Timeout,
                },
                StatusCode::REQUEST_TIMEOUT,
            ),
            (
                ServiceError::Repository {
                    source: RepositoryError::AwsSdk {
                        message: "boom".to_string(),
                    },
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, Json(body)) = service_error_to_response(err);
            assert_eq!(status, expected);
            assert!(body.get("error").is_some());
            assert!(body.get("timestamp").is_some());
        }
    }

    #[tokio::test]
    async fn test_create_food_outcomes() {
        let (app, _store, user_id) = setup().await;
        let uri = format!("/api/users/{}/foods", user_id);

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, &uri, &food_json("Apple")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Success!");

        let response = app
            .oneshot(json_request(Method::POST, &uri, &food_json("Apple")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_update_food_of_other_user() {
        let (app, store, user_id) = setup().await;
        let dto = FoodDto {
            id: None,
            owner: FoodOwner::Global,
            name: "Stew".to_string(),
            default_serving_type: ServingType::Cup,
            serving_type_qty: dec!(1),
            nutrition: NutritionFacts::default(),
        };
        let theirs = crate::models::Food::from_dto(
            Uuid::new_v4(),
            FoodOwner::OwnedBy(Uuid::new_v4()),
            &dto,
        );
        FoodRepository::save(store.as_ref(), theirs.clone())
            .await
            .unwrap();

        let uri = format!("/api/users/{}/foods/{}", user_id, theirs.id);
        let response = app
            .oneshot(json_request(Method::PUT, &uri, &food_json("My Stew")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Error:  You are attempting to modify another user's customized food."
        );
    }

    #[tokio::test]
    async fn test_missing_resources_return_404() {
        let (app, _store, _) = setup().await;

        for uri in [
            format!("/api/foods/{}", Uuid::new_v4()),
            format!("/api/foods-eaten/{}", Uuid::new_v4()),
        ] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let (app, _store, user_id) = setup().await;

        let request = Request::builder()
            .uri(format!("/api/users/{}/foods", user_id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
