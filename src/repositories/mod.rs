// Repositories module - store ports and their DynamoDB / in-memory adapters

mod dynamodb;
pub mod food_eaten_repository;
pub mod food_repository;
pub mod memory;
pub mod table_manager;
pub mod user_repository;

#[cfg(test)]
mod tests;

pub use food_eaten_repository::{DynamoDbFoodEatenRepository, FoodEatenRepository};
pub use food_repository::{DynamoDbFoodRepository, FoodRepository};
pub use memory::InMemoryStore;
pub use table_manager::TableManager;
pub use user_repository::{DynamoDbUserRepository, UserRepository};
