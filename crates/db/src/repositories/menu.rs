use super::{MenuItem, MenuRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMenuRepository {
    pool: DbPool,
}

impl SqlMenuRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MenuRepository for SqlMenuRepository {
    async fn list_available(&self) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows: Vec<MenuItem> = sqlx::query_as(
            "SELECT id, name, category, description, price_cents, available
             FROM menu_item
             WHERE available = 1
             ORDER BY category, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::repositories::{MenuRepository, SqlMenuRepository};
    use crate::{connect_with_settings, fixtures, migrations};

    #[tokio::test]
    async fn unavailable_items_are_filtered_out() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        fixtures::seed_demo(&pool).await.expect("seed");
        let repo = SqlMenuRepository::new(pool);

        let items = repo.list_available().await.expect("list");
        assert!(!items.is_empty());
        assert!(items.iter().all(|item| item.available));
    }
}
