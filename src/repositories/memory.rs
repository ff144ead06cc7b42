use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{FoodEatenRepository, FoodRepository, UserRepository};
use crate::models::{FoodEaten, Food, NamePattern, RepositoryResult, User};

/// Process-local store implementing every repository trait.
///
/// Used for local development (`storage_backend = "memory"`), the HTTP
/// integration tests and benchmarks. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    foods: RwLock<HashMap<Uuid, Food>>,
    foods_eaten: RwLock<HashMap<Uuid, FoodEaten>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn food_count(&self) -> usize {
        self.foods.read().await.len()
    }

    pub async fn food_eaten_count(&self) -> usize {
        self.foods_eaten.read().await.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn save(&self, user: User) -> RepositoryResult<User> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl FoodRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Food>> {
        Ok(self.foods.read().await.get(&id).cloned())
    }

    async fn find_by_owner_and_name(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> RepositoryResult<Option<Food>> {
        Ok(self
            .foods
            .read()
            .await
            .values()
            .find(|food| food.is_owned_by(owner_id) && food.name == name)
            .cloned())
    }

    #[instrument(skip(self), fields(user_id = %user_id, pattern = %pattern))]
    async fn search_visible_to(
        &self,
        user_id: Uuid,
        pattern: &NamePattern,
    ) -> RepositoryResult<Vec<Food>> {
        let foods: Vec<Food> = self
            .foods
            .read()
            .await
            .values()
            .filter(|food| food.is_visible_to(user_id) && pattern.matches(&food.name))
            .cloned()
            .collect();

        debug!("Matched {} foods in memory", foods.len());
        Ok(foods)
    }

    async fn save(&self, food: Food) -> RepositoryResult<Food> {
        self.foods.write().await.insert(food.id, food.clone());
        Ok(food)
    }
}

#[async_trait]
impl FoodEatenRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<FoodEaten>> {
        Ok(self.foods_eaten.read().await.get(&id).cloned())
    }

    async fn find_by_user_and_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<FoodEaten>> {
        self.find_by_user_within_range(user_id, date, date).await
    }

    async fn find_by_user_within_range(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<FoodEaten>> {
        Ok(self
            .foods_eaten
            .read()
            .await
            .values()
            .filter(|record| record.user_id == user_id && record.date >= from && record.date <= to)
            .cloned()
            .collect())
    }

    async fn save(&self, food_eaten: FoodEaten) -> RepositoryResult<FoodEaten> {
        self.foods_eaten
            .write()
            .await
            .insert(food_eaten.id, food_eaten.clone());
        Ok(food_eaten)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        self.foods_eaten.write().await.remove(&id);
        Ok(())
    }
}
