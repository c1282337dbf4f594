use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{
    Attachment, CreateAttachment, CreateReport, Report, ReportFilter, ReportStatus, User,
};

const REPORT_COLUMNS: &str = "id, title, description_text, category, status, location, \
     latitude, longitude, is_anonymous, hashed_device_id, user_id, status_notes, \
     created_at, updated_at";

const ATTACHMENT_COLUMNS: &str =
    "id, report_id, blob_storage_uri, mime_type, file_type, file_size_bytes, created_at";

/// Persistence for reports, their attachments and the users they reference
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Insert a report and its attachments atomically
    async fn create(
        &self,
        report: CreateReport,
        attachments: Vec<CreateAttachment>,
    ) -> Result<(Report, Vec<Attachment>)>;

    /// A page of reports, newest first, plus the filtered total
    async fn list(&self, filter: ReportFilter, skip: i64, limit: i64)
        -> Result<(Vec<Report>, i64)>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Report>>;

    async fn update_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        notes: Option<String>,
    ) -> Result<Option<Report>>;

    /// Remove a report; returns the attachments that went with it, or `None` if absent
    async fn delete(&self, id: Uuid) -> Result<Option<Vec<Attachment>>>;

    /// Attachments of the given reports, oldest first
    async fn list_attachments(&self, report_ids: &[Uuid]) -> Result<Vec<Attachment>>;

    async fn add_attachment(
        &self,
        report_id: Uuid,
        attachment: CreateAttachment,
    ) -> Result<Attachment>;

    async fn find_attachment(
        &self,
        report_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<Option<Attachment>>;

    async fn delete_attachment(
        &self,
        report_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<Option<Attachment>>;
}

pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        AppError::Database(e)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: ReportFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category);
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, is_anonymous, role, email, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch user"))
    }

    async fn create(
        &self,
        report: CreateReport,
        attachments: Vec<CreateAttachment>,
    ) -> Result<(Report, Vec<Attachment>)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let now = Utc::now();
        let created = sqlx::query_as::<_, Report>(&format!(
            r#"
            INSERT INTO reports (
                id, title, description_text, category, status, location,
                latitude, longitude, is_anonymous, hashed_device_id, user_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(&report.title)
        .bind(&report.description_text)
        .bind(report.category)
        .bind(ReportStatus::Submitted)
        .bind(&report.location)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(report.is_anonymous)
        .bind(&report.hashed_device_id)
        .bind(report.user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to create report"))?;

        let mut stored = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let row = sqlx::query_as::<_, Attachment>(&format!(
                r#"
                INSERT INTO attachments
                    (id, report_id, blob_storage_uri, mime_type, file_type, file_size_bytes, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {}
                "#,
                ATTACHMENT_COLUMNS
            ))
            .bind(Uuid::now_v7())
            .bind(created.id)
            .bind(&attachment.blob_storage_uri)
            .bind(&attachment.mime_type)
            .bind(attachment.file_type)
            .bind(attachment.file_size_bytes)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to create attachment"))?;
            stored.push(row);
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit report"))?;

        Ok((created, stored))
    }

    async fn list(
        &self,
        filter: ReportFilter,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<Report>, i64)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reports");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count reports"))?;

        let mut page_query =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM reports", REPORT_COLUMNS));
        push_filter(&mut page_query, filter);
        page_query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(skip);

        let reports = page_query
            .build_query_as::<Report>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list reports"))?;

        Ok((reports, total))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Report>> {
        sqlx::query_as::<_, Report>(&format!(
            "SELECT {} FROM reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch report"))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        notes: Option<String>,
    ) -> Result<Option<Report>> {
        sqlx::query_as::<_, Report>(&format!(
            r#"
            UPDATE reports
            SET status = $2, status_notes = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REPORT_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update report status"))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Vec<Attachment>>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let attachments = sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {} FROM attachments WHERE report_id = $1",
            ATTACHMENT_COLUMNS
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to fetch attachments"))?;

        let deleted = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete report"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit report deletion"))?;

        Ok((deleted.rows_affected() > 0).then_some(attachments))
    }

    async fn list_attachments(&self, report_ids: &[Uuid]) -> Result<Vec<Attachment>> {
        if report_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {} FROM attachments WHERE report_id = ANY($1) ORDER BY created_at, id",
            ATTACHMENT_COLUMNS
        ))
        .bind(report_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list attachments"))
    }

    async fn add_attachment(
        &self,
        report_id: Uuid,
        attachment: CreateAttachment,
    ) -> Result<Attachment> {
        sqlx::query_as::<_, Attachment>(&format!(
            r#"
            INSERT INTO attachments
                (id, report_id, blob_storage_uri, mime_type, file_type, file_size_bytes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ATTACHMENT_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(report_id)
        .bind(&attachment.blob_storage_uri)
        .bind(&attachment.mime_type)
        .bind(attachment.file_type)
        .bind(attachment.file_size_bytes)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create attachment"))
    }

    async fn find_attachment(
        &self,
        report_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<Option<Attachment>> {
        sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {} FROM attachments WHERE id = $1 AND report_id = $2",
            ATTACHMENT_COLUMNS
        ))
        .bind(attachment_id)
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch attachment"))
    }

    async fn delete_attachment(
        &self,
        report_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<Option<Attachment>> {
        sqlx::query_as::<_, Attachment>(&format!(
            "DELETE FROM attachments WHERE id = $1 AND report_id = $2 RETURNING {}",
            ATTACHMENT_COLUMNS
        ))
        .bind(attachment_id)
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to delete attachment"))
    }
}
