use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use foodlog_rs::{
    create_app,
    handlers::AdminState,
    init_observability,
    observability::Metrics,
    repositories::{
        DynamoDbFoodEatenRepository, DynamoDbFoodRepository, DynamoDbUserRepository,
        FoodEatenRepository, FoodRepository, InMemoryStore, TableManager, UserRepository,
    },
    shutdown_observability, Config, FoodService, StorageBackend,
};

/// The three store ports plus the table manager when backed by DynamoDB
struct Stores {
    users: Arc<dyn UserRepository>,
    foods: Arc<dyn FoodRepository>,
    foods_eaten: Arc<dyn FoodEatenRepository>,
    table_manager: Option<Arc<TableManager>>,
}

fn build_stores(config: &Config, metrics: &Arc<Metrics>) -> anyhow::Result<Stores> {
    match config.database.storage_backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            let store = Arc::new(InMemoryStore::new());
            Ok(Stores {
                users: store.clone(),
                foods: store.clone(),
                foods_eaten: store,
                table_manager: None,
            })
        }
        StorageBackend::DynamoDb => {
            let aws = config
                .aws
                .as_ref()
                .context("DynamoDB storage selected but AWS configuration is missing")?;
            let client = Arc::new(aws.dynamodb_client.clone());
            let database = &config.database;

            Ok(Stores {
                users: Arc::new(
                    DynamoDbUserRepository::new(
                        client.clone(),
                        database.users_table_name.clone(),
                        aws.region.clone(),
                    )
                    .with_metrics(metrics.clone()),
                ),
                foods: Arc::new(
                    DynamoDbFoodRepository::new(
                        client.clone(),
                        database.foods_table_name.clone(),
                        aws.region.clone(),
                    )
                    .with_metrics(metrics.clone()),
                ),
                foods_eaten: Arc::new(
                    DynamoDbFoodEatenRepository::new(
                        client.clone(),
                        database.foods_eaten_table_name.clone(),
                        aws.region.clone(),
                    )
                    .with_metrics(metrics.clone()),
                ),
                table_manager: Some(Arc::new(TableManager::new(client))),
            })
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (basic logging only)
    let config = Config::from_environment()
        .await
        .context("Failed to load configuration")?;

    init_observability(&config.observability)?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!(
        "Storage backend: {}, tables: users={}, foods={}, foods_eaten={}",
        config.database.storage_backend,
        config.database.users_table_name,
        config.database.foods_table_name,
        config.database.foods_eaten_table_name
    );

    let metrics = Arc::new(Metrics::new()?);
    let stores = build_stores(&config, &metrics)?;

    let food_service = Arc::new(FoodService::new_with_metrics(
        stores.users.clone(),
        stores.foods.clone(),
        stores.foods_eaten.clone(),
        metrics.clone(),
    ));
    info!("Services initialized successfully");

    let admin_state = AdminState {
        users: stores.users,
        foods: stores.foods,
        table_manager: stores.table_manager,
        users_table_name: config.database.users_table_name.clone(),
        foods_table_name: config.database.foods_table_name.clone(),
        foods_eaten_table_name: config.database.foods_eaten_table_name.clone(),
    };

    let app = create_app(
        metrics,
        food_service,
        admin_state,
        config.server.max_request_size,
    )
    .layer(TimeoutLayer::new(config.server.request_timeout()));

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("Invalid server host")?,
        config.server.port,
    );
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_observability().await;
    info!("Server shutdown complete");
    Ok(())
}
