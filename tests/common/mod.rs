#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use foodlog_rs::handlers::{create_app, AdminState, DEFAULT_MAX_REQUEST_SIZE};
use foodlog_rs::models::User;
use foodlog_rs::observability::Metrics;
use foodlog_rs::repositories::{InMemoryStore, UserRepository};
use foodlog_rs::FoodService;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

/// The real router served on an ephemeral port, backed by the in-memory store
pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub store: Arc<InMemoryStore>,
    pub metrics: Arc<Metrics>,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));

        let food_service = Arc::new(FoodService::new_with_metrics(
            store.clone(),
            store.clone(),
            store.clone(),
            metrics.clone(),
        ));
        let admin_state = AdminState {
            users: store.clone(),
            foods: store.clone(),
            table_manager: None,
            users_table_name: "FoodlogUsers".to_string(),
            foods_table_name: "FoodlogFoods".to_string(),
            foods_eaten_table_name: "FoodlogFoodsEaten".to_string(),
        };
        let app = create_app(
            metrics.clone(),
            food_service,
            admin_state,
            DEFAULT_MAX_REQUEST_SIZE,
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: format!("http://{}", addr),
            store,
            metrics,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Store a new user directly and return its id
    pub async fn create_user(&self, email: &str) -> Uuid {
        UserRepository::save(self.store.as_ref(), User::new(email))
            .await
            .expect("Failed to save user")
            .id
    }

    pub async fn seed(&self) -> Value {
        let response = self
            .client
            .post(self.url("/api/admin/seed"))
            .send()
            .await
            .expect("Failed to send seed request");
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Failed to parse seed response")
    }
}

pub fn food_body(name: &str, calories: &str) -> Value {
    json!({
        "name": name,
        "default_serving_type": "ounce",
        "serving_type_qty": "4",
        "nutrition": {
            "calories": calories,
            "carbs": "25",
            "protein": "1"
        }
    })
}
