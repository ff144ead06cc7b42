// Services module - business logic layer

pub mod food_service;
pub mod seed;

pub use food_service::{FoodService, RECENT_WINDOW_DAYS};
pub use seed::{sample_foods, seed_sample_data, SeedSummary, DEMO_USER_ID};
