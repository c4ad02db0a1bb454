use crate::repositories::RepositoryError;
use crate::DbPool;

/// Seeds demo data for local development and tests: a small menu, a few
/// knowledge chunks, and one operator lesson. Idempotent.
pub async fn seed_demo(pool: &DbPool) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT OR IGNORE INTO menu_item (id, name, category, description, price_cents, available) VALUES
         ('menu-margherita', 'Margherita', 'pizza', 'Tomato, mozzarella, basil', 4500, 1),
         ('menu-pepperoni', 'Pepperoni', 'pizza', 'Tomato, mozzarella, pepperoni', 5200, 1),
         ('menu-calabrese', 'Calabrese', 'pizza', 'Tomato, mozzarella, calabrese sausage, onion', 4800, 1),
         ('menu-tiramisu', 'Tiramisu', 'dessert', 'House-made, serves two', 2400, 1),
         ('menu-quattro', 'Quattro Formaggi', 'pizza', 'Four-cheese blend', 5600, 0)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO knowledge_chunk (id, source, content) VALUES
         ('kc-hours', 'operations-manual', 'Opening hours: Tuesday to Sunday, 18:00 to 23:30. Closed on Mondays.'),
         ('kc-delivery', 'operations-manual', 'Delivery radius is 6km from the shop. Delivery is free for orders above 80.'),
         ('kc-allergens', 'operations-manual', 'All pizzas contain gluten. Gluten-free base available on request for any pizza.'),
         ('kc-promo', 'marketing', 'Weekday promotion: second pizza at half price, Tuesday through Thursday.')",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO lesson (id, content, active, created_at) VALUES
         ('lesson-address', 'Always confirm the delivery address before creating a payment link.', 1, '2026-01-10T00:00:00Z'),
         ('lesson-discount', 'Never offer discounts above 15 percent without human approval.', 1, '2026-01-12T00:00:00Z')",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::seed_demo;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seeding_twice_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        seed_demo(&pool).await.expect("first seed");
        seed_demo(&pool).await.expect("second seed");

        let count = sqlx::query("SELECT COUNT(*) AS count FROM menu_item")
            .fetch_one(&pool)
            .await
            .expect("count menu items")
            .get::<i64, _>("count");

        assert_eq!(count, 5);
    }
}
