//! Resume upload: multipart intake, S3 storage, candidate creation.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::validation::ProfileField;
use crate::models::candidate::{CandidateRow, CandidateStatus};
use crate::resume::extract::{extract_resume, MAX_RESUME_BYTES};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResumeResponse {
    pub candidate: CandidateRow,
    /// Identity fields the resume did not yield; collected during the
    /// session's collecting-info phase.
    pub missing_fields: Vec<ProfileField>,
}

/// POST /api/v1/candidates (multipart, field name "resume")
pub async fn upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResumeResponse>), AppError> {
    let (filename, bytes) = read_resume_part(&mut multipart).await?;

    if bytes.len() > MAX_RESUME_BYTES {
        return Err(AppError::Validation(format!(
            "Resume exceeds the {} MB limit",
            MAX_RESUME_BYTES / (1024 * 1024)
        )));
    }

    let extracted = extract_resume(&filename, &bytes)?;
    let candidate_id = Uuid::new_v4();
    let s3_key = format!("resumes/{candidate_id}/{}", sanitize_filename(&filename));

    state
        .s3
        .put_object()
        .bucket(&state.config.s3_bucket)
        .key(&s3_key)
        .body(ByteStream::from(bytes.to_vec()))
        .content_type(content_type_for(&filename))
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("Resume upload failed: {e}")))?;

    let candidate = sqlx::query_as::<_, CandidateRow>(
        r#"
        INSERT INTO candidates
            (id, name, email, phone, resume_filename, resume_s3_key, resume_text, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(candidate_id)
    .bind(&extracted.name)
    .bind(&extracted.email)
    .bind(&extracted.phone)
    .bind(&filename)
    .bind(&s3_key)
    .bind(&extracted.text)
    .bind(CandidateStatus::Pending.as_str())
    .fetch_one(&state.db)
    .await?;

    info!("Created candidate {candidate_id} from resume '{filename}'");
    Ok((
        StatusCode::CREATED,
        Json(UploadResumeResponse {
            missing_fields: extracted.missing_fields(),
            candidate,
        }),
    ))
}

async fn read_resume_part(multipart: &mut Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default();
        if name != "resume" && name != "file" {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Resume part is missing a filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read resume upload: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded resume is empty".to_string()));
        }
        return Ok((filename, bytes));
    }
    Err(AppError::Validation(
        "Multipart body must contain a 'resume' file field".to_string(),
    ))
}

fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn content_type_for(filename: &str) -> &'static str {
    if filename.to_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "text/plain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_keeps_safe_chars() {
        assert_eq!(sanitize_filename("jane-doe_cv.pdf"), "jane-doe_cv.pdf");
    }

    #[test]
    fn test_sanitize_filename_replaces_path_separators() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("my resume (final).pdf"), "my_resume__final_.pdf");
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(content_type_for("cv.PDF"), "application/pdf");
        assert_eq!(content_type_for("cv.txt"), "text/plain");
    }
}
