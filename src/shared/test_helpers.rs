//! In-memory stand-ins for the database and blob storage seams

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::analytics::models::FactReport;
use crate::features::analytics::repositories::AnalyticsRepository;
use crate::features::reports::dtos::{AttachmentCreateDto, CreateReportDto, UploadedFile};
use crate::features::reports::models::{
    Attachment, CreateAttachment, CreateReport, FileType, Report, ReportCategory, ReportFilter,
    ReportStatus, User, UserRole,
};
use crate::features::reports::repositories::ReportRepository;
use crate::modules::storage::{BlobMetadata, BlobStorage, StorageError};

/// Anonymous infrastructure report with one pre-uploaded image
pub fn create_report_dto() -> CreateReportDto {
    CreateReportDto {
        title: "Broken streetlight".to_string(),
        description_text: "The streetlight on the corner has been out for a week".to_string(),
        category_id: ReportCategory::Infrastructure,
        location: "Main Street and 5th Avenue".to_string(),
        latitude: Some(40.7128),
        longitude: Some(-74.006),
        is_anonymous: true,
        hashed_device_id: Some("device-hash".to_string()),
        user_id: None,
        attachments: vec![AttachmentCreateDto {
            blob_storage_uri: "https://azure.com/evidence.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            file_type: FileType::Image,
            file_size_bytes: 1024,
        }],
    }
}

pub fn uploaded_file(filename: &str, content_type: &str, data: &[u8]) -> UploadedFile {
    UploadedFile {
        filename: filename.to_string(),
        content_type: content_type.to_string(),
        data: data.to_vec(),
    }
}

pub fn fact(status: &str, category: &str, confidence: Option<f64>, anonymous: bool) -> FactReport {
    FactReport {
        report_id: Uuid::now_v7(),
        status: status.to_string(),
        category_id: category.to_string(),
        ai_confidence: confidence,
        is_anonymous: anonymous,
        created_at: Utc::now(),
    }
}

fn unavailable() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
struct ReportTables {
    users: HashMap<Uuid, User>,
    reports: Vec<Report>,
    attachments: Vec<Attachment>,
}

#[derive(Default)]
pub struct InMemoryReportRepository {
    tables: Mutex<ReportTables>,
}

impl InMemoryReportRepository {
    pub fn add_user(&self, role: UserRole) -> Uuid {
        let id = Uuid::now_v7();
        self.tables.lock().unwrap().users.insert(
            id,
            User {
                id,
                is_anonymous: false,
                role,
                email: Some(format!("{}@example.com", id)),
                created_at: Utc::now(),
            },
        );
        id
    }
}

fn new_attachment(report_id: Uuid, attachment: CreateAttachment) -> Attachment {
    Attachment {
        id: Uuid::now_v7(),
        report_id,
        blob_storage_uri: attachment.blob_storage_uri,
        mime_type: attachment.mime_type,
        file_type: attachment.file_type,
        file_size_bytes: attachment.file_size_bytes,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }

    async fn create(
        &self,
        report: CreateReport,
        attachments: Vec<CreateAttachment>,
    ) -> Result<(Report, Vec<Attachment>)> {
        let now = Utc::now();
        let created = Report {
            id: Uuid::now_v7(),
            title: report.title,
            description_text: report.description_text,
            category: report.category,
            status: ReportStatus::Submitted,
            location: report.location,
            latitude: report.latitude,
            longitude: report.longitude,
            is_anonymous: report.is_anonymous,
            hashed_device_id: report.hashed_device_id,
            user_id: report.user_id,
            status_notes: None,
            created_at: now,
            updated_at: now,
        };
        let attachments: Vec<Attachment> = attachments
            .into_iter()
            .map(|a| new_attachment(created.id, a))
            .collect();

        let mut tables = self.tables.lock().unwrap();
        tables.reports.push(created.clone());
        tables.attachments.extend(attachments.iter().cloned());

        Ok((created, attachments))
    }

    async fn list(
        &self,
        filter: ReportFilter,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<Report>, i64)> {
        let tables = self.tables.lock().unwrap();
        let mut matching: Vec<Report> = tables
            .reports
            .iter()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.category.map_or(true, |c| r.category == c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Report>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.reports.iter().find(|r| r.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        notes: Option<String>,
    ) -> Result<Option<Report>> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.reports.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status;
            r.status_notes = notes;
            r.updated_at = Utc::now();
            r.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Vec<Attachment>>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(index) = tables.reports.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        tables.reports.remove(index);

        let (removed, kept) = std::mem::take(&mut tables.attachments)
            .into_iter()
            .partition(|a| a.report_id == id);
        tables.attachments = kept;

        Ok(Some(removed))
    }

    async fn list_attachments(&self, report_ids: &[Uuid]) -> Result<Vec<Attachment>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attachments
            .iter()
            .filter(|a| report_ids.contains(&a.report_id))
            .cloned()
            .collect())
    }

    async fn add_attachment(
        &self,
        report_id: Uuid,
        attachment: CreateAttachment,
    ) -> Result<Attachment> {
        let created = new_attachment(report_id, attachment);
        self.tables
            .lock()
            .unwrap()
            .attachments
            .push(created.clone());
        Ok(created)
    }

    async fn find_attachment(
        &self,
        report_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<Option<Attachment>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attachments
            .iter()
            .find(|a| a.id == attachment_id && a.report_id == report_id)
            .cloned())
    }

    async fn delete_attachment(
        &self,
        report_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<Option<Attachment>> {
        let mut tables = self.tables.lock().unwrap();
        let index = tables
            .attachments
            .iter()
            .position(|a| a.id == attachment_id && a.report_id == report_id);
        Ok(index.map(|i| tables.attachments.remove(i)))
    }
}

#[derive(Default)]
pub struct InMemoryAnalyticsRepository {
    hot: Mutex<Vec<FactReport>>,
    cold: Mutex<Vec<FactReport>>,
    cold_unavailable: AtomicBool,
    writes_unavailable: AtomicBool,
}

impl InMemoryAnalyticsRepository {
    pub fn push_hot(&self, fact: FactReport) {
        self.hot.lock().unwrap().push(fact);
    }

    pub fn push_cold(&self, fact: FactReport) {
        self.cold.lock().unwrap().push(fact);
    }

    pub fn hot_rows(&self) -> Vec<FactReport> {
        self.hot.lock().unwrap().clone()
    }

    pub fn fail_cold_queries(&self) {
        self.cold_unavailable.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.writes_unavailable.store(true, Ordering::SeqCst);
    }

    fn breakdown(&self, key: impl Fn(&FactReport) -> String) -> Vec<(String, i64)> {
        let mut counts = BTreeMap::new();
        for row in self.hot.lock().unwrap().iter() {
            *counts.entry(key(row)).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }

    fn check_writes(&self) -> Result<()> {
        if self.writes_unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsRepository for InMemoryAnalyticsRepository {
    async fn count_hot(&self) -> Result<i64> {
        Ok(self.hot.lock().unwrap().len() as i64)
    }

    async fn count_cold(&self) -> Result<i64> {
        if self.cold_unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.cold.lock().unwrap().len() as i64)
    }

    async fn hot_status_breakdown(&self) -> Result<Vec<(String, i64)>> {
        Ok(self.breakdown(|row| row.status.clone()))
    }

    async fn hot_category_breakdown(&self) -> Result<Vec<(String, i64)>> {
        Ok(self.breakdown(|row| row.category_id.clone()))
    }

    async fn hot_average_confidence(&self) -> Result<Option<f64>> {
        let scores: Vec<f64> = self
            .hot
            .lock()
            .unwrap()
            .iter()
            .filter_map(|row| row.ai_confidence)
            .collect();
        if scores.is_empty() {
            return Ok(None);
        }
        Ok(Some(scores.iter().sum::<f64>() / scores.len() as f64))
    }

    async fn count_hot_anonymous(&self) -> Result<i64> {
        Ok(self
            .hot
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.is_anonymous)
            .count() as i64)
    }

    async fn recent_hot(&self, limit: i64) -> Result<Vec<FactReport>> {
        let mut rows = self.hot_rows();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn record_hot(&self, fact: &FactReport) -> Result<()> {
        self.check_writes()?;
        let mut hot = self.hot.lock().unwrap();
        hot.retain(|row| row.report_id != fact.report_id);
        hot.push(fact.clone());
        Ok(())
    }

    async fn update_hot_status(&self, report_id: Uuid, status: &str) -> Result<()> {
        self.check_writes()?;
        for row in self.hot.lock().unwrap().iter_mut() {
            if row.report_id == report_id {
                row.status = status.to_string();
            }
        }
        Ok(())
    }

    async fn delete_hot(&self, report_id: Uuid) -> Result<()> {
        self.check_writes()?;
        self.hot
            .lock()
            .unwrap()
            .retain(|row| row.report_id != report_id);
        Ok(())
    }
}

struct StoredBlob {
    size: i64,
    content_type: String,
    filename: String,
}

const FAKE_CONTAINER_URL: &str = "https://blob.test/report-attachments/";

fn own_url(url: &str) -> std::result::Result<&str, StorageError> {
    if url.starts_with(FAKE_CONTAINER_URL) {
        Ok(url)
    } else {
        Err(StorageError::InvalidUrl(url.to_string()))
    }
}

/// Blob storage keyed by URL; download links carry the expiry as a query parameter.
/// URLs outside its container are rejected like the real client does.
#[derive(Default)]
pub struct FakeBlobStorage {
    blobs: Mutex<HashMap<String, StoredBlob>>,
}

impl FakeBlobStorage {
    /// Seed an object directly and return its URL
    pub fn put(&self, filename: &str) -> String {
        let url = format!("{}{}", FAKE_CONTAINER_URL, filename);
        self.blobs.lock().unwrap().insert(
            url.clone(),
            StoredBlob {
                size: 0,
                content_type: "application/octet-stream".to_string(),
                filename: filename.to_string(),
            },
        );
        url
    }

    pub fn contains(&self, url: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStorage for FakeBlobStorage {
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> std::result::Result<String, StorageError> {
        let extension = filename.rsplit_once('.').map_or("bin", |(_, ext)| ext);
        let url = format!("{}{}.{}", FAKE_CONTAINER_URL, Uuid::new_v4(), extension);
        self.blobs.lock().unwrap().insert(
            url.clone(),
            StoredBlob {
                size: data.len() as i64,
                content_type: content_type.to_string(),
                filename: filename.to_string(),
            },
        );
        Ok(url)
    }

    async fn delete(&self, url: &str) -> std::result::Result<(), StorageError> {
        let url = own_url(url)?;
        self.blobs
            .lock()
            .unwrap()
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(url.to_string()))
    }

    async fn generate_download_url(
        &self,
        url: &str,
        expiry_hours: u32,
    ) -> std::result::Result<String, StorageError> {
        let url = own_url(url)?;
        if !self.contains(url) {
            return Err(StorageError::NotFound(url.to_string()));
        }
        Ok(format!("{}?expiry={}", url, expiry_hours))
    }

    async fn get_metadata(&self, url: &str) -> std::result::Result<BlobMetadata, StorageError> {
        let url = own_url(url)?;
        let blobs = self.blobs.lock().unwrap();
        let blob = blobs
            .get(url)
            .ok_or_else(|| StorageError::NotFound(url.to_string()))?;
        let uploaded_at = Utc::now() - Duration::seconds(1);

        Ok(BlobMetadata {
            size: blob.size,
            content_type: Some(blob.content_type.clone()),
            created_on: Some(uploaded_at),
            last_modified: Some(uploaded_at),
            metadata: HashMap::from([("original-filename".to_string(), blob.filename.clone())]),
        })
    }
}
