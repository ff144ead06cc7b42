use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::repositories::{FoodRepository, TableManager, UserRepository};
use crate::services::seed_sample_data;

/// Admin state containing the stores and the table manager.
///
/// `table_manager` is `None` when running on the in-memory store.
#[derive(Clone)]
pub struct AdminState {
    pub users: Arc<dyn UserRepository>,
    pub foods: Arc<dyn FoodRepository>,
    pub table_manager: Option<Arc<TableManager>>,
    pub users_table_name: String,
    pub foods_table_name: String,
    pub foods_eaten_table_name: String,
}

/// Response for seeding operations
#[derive(Debug, Serialize, Deserialize)]
pub struct SeedResponse {
    pub message: String,
    pub demo_user_id: Uuid,
    pub foods_created: usize,
    pub timestamp: String,
}

/// Response for table setup operations
#[derive(Debug, Serialize, Deserialize)]
pub struct SetupTablesResponse {
    pub message: String,
    pub tables_created: Vec<String>,
    pub timestamp: String,
}

/// Create admin router with database management endpoints
pub fn create_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/api/admin/setup-tables", post(setup_tables))
        .route("/api/admin/seed", post(seed_database))
        .with_state(state)
}

/// Set up the required DynamoDB tables
#[instrument(name = "setup_tables", skip(state), fields(
    users_table = %state.users_table_name,
    foods_table = %state.foods_table_name,
    foods_eaten_table = %state.foods_eaten_table_name,
))]
pub async fn setup_tables(
    State(state): State<AdminState>,
) -> Result<Json<SetupTablesResponse>, (StatusCode, Json<Value>)> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    let Some(table_manager) = &state.table_manager else {
        info!("In-memory storage selected, no tables to create");
        return Ok(Json(SetupTablesResponse {
            message: "In-memory storage needs no tables".to_string(),
            tables_created: Vec::new(),
            timestamp,
        }));
    };

    info!("Setting up DynamoDB tables");

    match table_manager
        .create_all_tables(
            &state.users_table_name,
            &state.foods_table_name,
            &state.foods_eaten_table_name,
        )
        .await
    {
        Ok(()) => {
            let tables_created = vec![
                state.users_table_name.clone(),
                state.foods_table_name.clone(),
                state.foods_eaten_table_name.clone(),
            ];

            info!("Successfully created tables: {:?}", tables_created);

            Ok(Json(SetupTablesResponse {
                message: format!("Successfully created {} tables", tables_created.len()),
                tables_created,
                timestamp,
            }))
        }
        Err(err) => {
            error!("Failed to create tables: {}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to create tables",
                    "message": err.to_string(),
                    "timestamp": timestamp,
                })),
            ))
        }
    }
}

/// Seed a demo user and the shared global foods
#[instrument(name = "seed_database", skip(state), fields(
    foods_table = %state.foods_table_name,
))]
pub async fn seed_database(
    State(state): State<AdminState>,
) -> Result<Json<SeedResponse>, (StatusCode, Json<Value>)> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    info!("Seeding database with sample data");

    let summary = match seed_sample_data(state.users.as_ref(), state.foods.as_ref()).await {
        Ok(summary) => summary,
        Err(err) => {
            error!("Failed to seed database: {}", err);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to seed database",
                    "message": err.to_string(),
                    "timestamp": timestamp,
                })),
            ));
        }
    };

    if summary.failures.is_empty() {
        info!(
            "Successfully seeded database with {} foods",
            summary.foods_seeded
        );
        return Ok(Json(SeedResponse {
            message: format!(
                "Database seeded successfully with {} foods",
                summary.foods_seeded
            ),
            demo_user_id: summary.user_id,
            foods_created: summary.foods_seeded,
            timestamp,
        }));
    }

    warn!(
        "Database seeding completed with {} errors",
        summary.failures.len()
    );

    if summary.foods_seeded > 0 {
        Ok(Json(SeedResponse {
            message: format!(
                "Database seeded with {} foods, {} errors occurred",
                summary.foods_seeded,
                summary.failures.len()
            ),
            demo_user_id: summary.user_id,
            foods_created: summary.foods_seeded,
            timestamp,
        }))
    } else {
        Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to seed database",
                "details": summary.failures,
                "timestamp": timestamp,
            })),
        ))
    }
}
