use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    Json,
};
use log::{error, info, warn};
use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::{
    cloudinary::{UploadParams, UploadedMedia},
    state::AppState,
    storage::{self, SpooledFile},
};

const COVER_FIELD: &str = "coverupload";
const PDF_FIELD: &str = "pdfUpload";

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    pub book_name: String,
    pub author_name: String,
    pub cover_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

#[derive(serde::Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub data: UploadData,
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(serde::Serialize)]
pub struct ProbeResponse {
    pub success: bool,
    pub message: String,
    pub result: serde_json::Value,
}

pub async fn health_check() -> &'static str {
    "OK"
}

// Everything the client posted, with files already spooled to disk.
// Whoever holds one of these owes a cleanup() before responding.
#[derive(Default)]
struct UploadRequest {
    book_name: Option<String>,
    author_name: Option<String>,
    use_first_page: bool,
    cover: Option<SpooledFile>,
    pdf: Option<SpooledFile>,
}

impl UploadRequest {
    fn cleanup(&self) {
        for file in [&self.cover, &self.pdf].into_iter().flatten() {
            storage::remove_temp_file(&file.path);
        }
    }
}

pub async fn upload_coverpage(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request = match read_upload_request(multipart).await {
        Ok(request) => request,
        Err(err) => {
            warn!("Rejected malformed upload request: {}", err);
            return Err(failure(
                StatusCode::BAD_REQUEST,
                "Invalid upload request",
                Some(err.to_string()),
            ));
        }
    };

    info!(
        "Upload request: book={:?} author={:?} use_first_page={} cover={} pdf={}",
        request.book_name,
        request.author_name,
        request.use_first_page,
        request.cover.is_some(),
        request.pdf.is_some()
    );

    let Some(cover) = request.cover.as_ref() else {
        // A stray PDF may already be on disk
        request.cleanup();
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "No cover image uploaded",
            None,
        ));
    };

    let outcome = relay_to_media_host(&state, cover, request.pdf.as_ref()).await;
    request.cleanup();

    match outcome {
        Ok((cover_media, pdf_media)) => {
            info!("Upload complete: cover={}", cover_media.secure_url);
            Ok(Json(UploadResponse {
                success: true,
                message: "Files uploaded successfully".to_string(),
                data: UploadData {
                    book_name: request.book_name.unwrap_or_default(),
                    author_name: request.author_name.unwrap_or_default(),
                    cover_url: cover_media.secure_url,
                    pdf_url: pdf_media.map(|media| media.secure_url),
                },
            }))
        }
        Err(err) => {
            error!("Upload failed: {:#}", err);
            Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upload failed",
                Some(err.to_string()),
            ))
        }
    }
}

pub async fn test_media_host(
    State(state): State<AppState>,
) -> Result<Json<ProbeResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!("Testing media host connection...");
    match state.media.ping().await {
        Ok(result) => Ok(Json(ProbeResponse {
            success: true,
            message: "Media host connected".to_string(),
            result,
        })),
        Err(err) => {
            error!("Media host connection failed: {:#}", err);
            Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Media host connection failed",
                Some(err.to_string()),
            ))
        }
    }
}

fn failure(
    status: StatusCode,
    message: &str,
    error: Option<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.to_string(),
            error,
        }),
    )
}

async fn read_upload_request(mut multipart: Multipart) -> anyhow::Result<UploadRequest> {
    let mut request = UploadRequest::default();
    if let Err(err) = fill_upload_request(&mut request, &mut multipart).await {
        request.cleanup();
        return Err(err);
    }
    Ok(request)
}

async fn fill_upload_request(
    request: &mut UploadRequest,
    multipart: &mut Multipart,
) -> anyhow::Result<()> {
    let request_id = unique_suffix();
    while let Some(mut field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "bookName" => request.book_name = Some(field.text().await?),
            "authorName" => request.author_name = Some(field.text().await?),
            "useFirstPage" => request.use_first_page = parse_flag(&field.text().await?),
            COVER_FIELD => request.cover = Some(spool_field(&request_id, &name, &mut field).await?),
            PDF_FIELD => request.pdf = Some(spool_field(&request_id, &name, &mut field).await?),
            other => warn!("Ignoring unexpected field {:?}", other),
        }
    }
    Ok(())
}

async fn spool_field(
    request_id: &str,
    field_name: &str,
    field: &mut Field<'_>,
) -> anyhow::Result<SpooledFile> {
    let original_name = field
        .file_name()
        .unwrap_or("upload.bin")
        .to_string();
    let path = storage::temp_path(request_id, field_name);

    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|err| anyhow::anyhow!("Failed to create {}: {}", path.display(), err))?;

    let written = async {
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        anyhow::Ok(())
    }
    .await;

    if let Err(err) = written {
        // Do not leave a partial spool behind
        storage::remove_temp_file(&path);
        return Err(err);
    }

    info!(
        "Spooled {} ({}) to {}",
        field_name,
        original_name,
        path.display()
    );
    Ok(SpooledFile {
        path,
        original_name,
    })
}

async fn relay_to_media_host(
    state: &AppState,
    cover: &SpooledFile,
    pdf: Option<&SpooledFile>,
) -> anyhow::Result<(UploadedMedia, Option<UploadedMedia>)> {
    let key = upload_key();

    let cover_media = state
        .media
        .upload(
            &cover.path,
            UploadParams {
                folder: "book_covers",
                resource_type: "auto",
                public_id: format!("book_{}", key),
            },
        )
        .await?;

    let pdf_media = match pdf {
        Some(file) => Some(
            state
                .media
                .upload(
                    &file.path,
                    UploadParams {
                        folder: "book_pdfs",
                        resource_type: "raw",
                        public_id: format!("book_{}_pdf", key),
                    },
                )
                .await?,
        ),
        None => None,
    };

    Ok((cover_media, pdf_media))
}

// Request-time key plus a random suffix, so two uploads landing in the
// same millisecond still get distinct object names.
fn upload_key() -> String {
    format!(
        "{}_{}",
        chrono::Utc::now().timestamp_millis(),
        unique_suffix()
    )
}

fn unique_suffix() -> String {
    let mut rng = rand::rng();
    let token: u32 = rng.random_range(100000..999999);
    token.to_string()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "on" | "1")
}
