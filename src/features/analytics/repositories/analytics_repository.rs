use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::analytics::models::FactReport;

/// Aggregate queries over the hot and cold fact tables
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn count_hot(&self) -> Result<i64>;
    async fn count_cold(&self) -> Result<i64>;
    /// `(status, count)` pairs from the hot table
    async fn hot_status_breakdown(&self) -> Result<Vec<(String, i64)>>;
    /// `(category, count)` pairs from the hot table
    async fn hot_category_breakdown(&self) -> Result<Vec<(String, i64)>>;
    async fn hot_average_confidence(&self) -> Result<Option<f64>>;
    async fn count_hot_anonymous(&self) -> Result<i64>;
    /// Most recent hot rows first
    async fn recent_hot(&self, limit: i64) -> Result<Vec<FactReport>>;
    /// Insert or replace the hot row for a report
    async fn record_hot(&self, fact: &FactReport) -> Result<()>;
    async fn update_hot_status(&self, report_id: Uuid, status: &str) -> Result<()>;
    async fn delete_hot(&self, report_id: Uuid) -> Result<()>;
}

pub struct PgAnalyticsRepository {
    pool: PgPool,
}

impl PgAnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count fact rows: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn breakdown(&self, sql: &str) -> Result<Vec<(String, i64)>> {
        sqlx::query_as::<_, (String, i64)>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to group fact rows: {:?}", e);
                AppError::Database(e)
            })
    }
}

#[async_trait]
impl AnalyticsRepository for PgAnalyticsRepository {
    async fn count_hot(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM hot_fact_reports").await
    }

    async fn count_cold(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM cold_fact_reports").await
    }

    async fn hot_status_breakdown(&self) -> Result<Vec<(String, i64)>> {
        self.breakdown("SELECT status, COUNT(*) FROM hot_fact_reports GROUP BY status")
            .await
    }

    async fn hot_category_breakdown(&self) -> Result<Vec<(String, i64)>> {
        self.breakdown("SELECT category_id, COUNT(*) FROM hot_fact_reports GROUP BY category_id")
            .await
    }

    async fn hot_average_confidence(&self) -> Result<Option<f64>> {
        sqlx::query_scalar::<_, Option<f64>>("SELECT AVG(ai_confidence) FROM hot_fact_reports")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to average confidence: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn count_hot_anonymous(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM hot_fact_reports WHERE is_anonymous")
            .await
    }

    async fn recent_hot(&self, limit: i64) -> Result<Vec<FactReport>> {
        sqlx::query_as::<_, FactReport>(
            r#"
            SELECT report_id, status, category_id, ai_confidence, is_anonymous, created_at
            FROM hot_fact_reports
            ORDER BY created_at DESC, report_id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list recent fact rows: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn record_hot(&self, fact: &FactReport) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hot_fact_reports
                (report_id, status, category_id, ai_confidence, is_anonymous, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (report_id) DO UPDATE SET
                status = EXCLUDED.status,
                category_id = EXCLUDED.category_id,
                ai_confidence = EXCLUDED.ai_confidence,
                is_anonymous = EXCLUDED.is_anonymous
            "#,
        )
        .bind(fact.report_id)
        .bind(&fact.status)
        .bind(&fact.category_id)
        .bind(fact.ai_confidence)
        .bind(fact.is_anonymous)
        .bind(fact.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record hot fact row: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(())
    }

    async fn update_hot_status(&self, report_id: Uuid, status: &str) -> Result<()> {
        sqlx::query("UPDATE hot_fact_reports SET status = $2 WHERE report_id = $1")
            .bind(report_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update hot fact status: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(())
    }
    async fn delete_hot(&self, report_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM hot_fact_reports WHERE report_id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete hot fact row: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(())
    }
}
