// Lease-based work queue over a Postgres table.
//
// Dequeue claims the oldest due pending job atomically (FOR UPDATE SKIP
// LOCKED), so concurrent pollers never double-dispatch. A claimed job holds
// a lease; if the worker dies without acking, the lease expires and the job
// becomes eligible for redelivery instead of sticking in running forever.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    AnalyzeContent,
    FetchFeed,
    GenerateDigest,
    SendEmail,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::AnalyzeContent => "analyze_content",
            JobType::FetchFeed => "fetch_feed",
            JobType::GenerateDigest => "generate_digest",
            JobType::SendEmail => "send_email",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "analyze_content" => Some(JobType::AnalyzeContent),
            "fetch_feed" => Some(JobType::FetchFeed),
            "generate_digest" => Some(JobType::GenerateDigest),
            "send_email" => Some(JobType::SendEmail),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn job_type(&self) -> Option<JobType> {
        JobType::parse(&self.job_type)
    }
}

#[derive(Clone)]
pub struct JobQueue {
    pool: PgPool,
}

impl JobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO jobs (job_type, payload, max_attempts)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(job_type.as_str())
        .bind(&payload)
        .bind(max_attempts.max(1))
        .fetch_one(&self.pool)
        .await?;

        debug!(job_id = %id, job_type = job_type.as_str(), "Job enqueued");
        Ok(id)
    }

    /// Claim the oldest due pending job, marking it running with a lease.
    /// Returns None when the queue is empty.
    pub async fn dequeue(&self, lease: Duration) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET
                status = 'running',
                started_at = now(),
                lease_expires_at = now() + make_interval(secs => $1),
                attempts = attempts + 1
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'pending' AND scheduled_at <= now()
                ORDER BY scheduled_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(lease.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Mark a running job completed.
    pub async fn ack(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs SET status = 'completed', completed_at = now(), lease_expires_at = NULL
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Report a failed attempt. The job is rescheduled after `retry_delay`
    /// while attempts remain, and terminally failed otherwise; the error
    /// message is retained either way. Returns the resulting status.
    pub async fn nack(&self, id: Uuid, error: &str, retry_delay: Duration) -> Result<JobStatus> {
        let status = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE jobs SET
                status = CASE WHEN attempts >= max_attempts THEN 'failed' ELSE 'pending' END,
                error = $2,
                completed_at = CASE WHEN attempts >= max_attempts THEN now() ELSE NULL END,
                scheduled_at = CASE WHEN attempts >= max_attempts
                                    THEN scheduled_at
                                    ELSE now() + make_interval(secs => $3) END,
                lease_expires_at = NULL
            WHERE id = $1 AND status = 'running'
            RETURNING status
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(retry_delay.as_secs_f64())
        .fetch_one(&self.pool)
        .await?;

        Ok(JobStatus::parse(&status).unwrap_or(JobStatus::Failed))
    }

    /// Return expired running jobs to the queue (or fail them if their
    /// attempts are spent). Called opportunistically before draining.
    pub async fn reap_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = CASE WHEN attempts >= max_attempts THEN 'failed' ELSE 'pending' END,
                error = COALESCE(error, 'lease expired'),
                lease_expires_at = NULL
            WHERE status = 'running' AND lease_expires_at < now()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(job)
    }
}
