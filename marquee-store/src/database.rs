use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;
use crate::app_config::{BusinessRules, DatabaseConfig};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlay rules stored in the `business_rules` table on top of the
    /// file/env configuration. Unknown keys and unparsable values are skipped.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        Ok(apply_rule_overrides(defaults, rows))
    }
}

fn apply_rule_overrides(mut rules: BusinessRules, rows: Vec<(String, String)>) -> BusinessRules {
    for (key, value) in rows {
        match key.as_str() {
            "seat_hold_seconds" => {
                if let Ok(v) = value.trim().parse() {
                    rules.seat_hold_seconds = v;
                }
            }
            "min_wait_millis" => {
                if let Ok(v) = value.trim().parse() {
                    rules.min_wait_millis = v;
                }
            }
            _ => {}
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_overrides() {
        let defaults = BusinessRules { seat_hold_seconds: 10, min_wait_millis: 1000, intake_capacity: 1024 };
        let rows = vec![
            ("seat_hold_seconds".to_string(), " 45 ".to_string()),
            ("min_wait_millis".to_string(), "not-a-number".to_string()),
            ("tax_rate".to_string(), "0.2".to_string()),
        ];

        let rules = apply_rule_overrides(defaults, rows);
        assert_eq!(rules.seat_hold_seconds, 45);
        assert_eq!(rules.min_wait_millis, 1000);
    }
}
