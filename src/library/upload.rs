use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::info;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::library::BookRecord;

/// Where a submission currently stands. Presentation (spinner labels,
/// final line) is derived from this, not toggled ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Uploading,
    Succeeded,
    Failed,
}

impl UploadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            UploadStatus::Idle => "Add Book",
            UploadStatus::Uploading => "Uploading...",
            UploadStatus::Succeeded => "Added Successfully!",
            UploadStatus::Failed => "Upload failed",
        }
    }
}

pub struct BookSubmission {
    pub name: String,
    pub author: String,
    pub use_first_page: bool,
    pub cover: PathBuf,
    pub pdf: Option<PathBuf>,
}

#[derive(Deserialize)]
struct UploadReply {
    success: bool,
    message: Option<String>,
    data: Option<UploadData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadData {
    cover_url: String,
    #[serde(default)]
    pdf_url: Option<String>,
}

/// Validate, post the multipart payload, and turn the relay's reply
/// into a BookRecord. No network traffic before validation passes; one
/// attempt only, a failure is terminal.
pub fn submit(server: &str, submission: &BookSubmission) -> Result<BookRecord> {
    validate(submission)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(UploadStatus::Uploading.label());
    spinner.enable_steady_tick(Duration::from_millis(120));

    match post_submission(server, submission) {
        Ok(data) => {
            spinner.finish_with_message(UploadStatus::Succeeded.label());
            info!("Hosted cover: {}", data.cover_url);
            Ok(BookRecord {
                name: submission.name.trim().to_string(),
                author: submission.author.trim().to_string(),
                // Exactly as the relay returned them
                cover_url: data.cover_url,
                pdf_url: data.pdf_url,
                uploaded_at: chrono::Utc::now(),
            })
        }
        Err(err) => {
            spinner.abandon_with_message(UploadStatus::Failed.label());
            Err(err)
        }
    }
}

/// Probe the relay's own connectivity to the media host.
pub fn probe(server: &str) -> Result<()> {
    let client = reqwest::blocking::Client::new();
    let url = format!("{}/coverpage/test", normalize_server(server));
    let response = client
        .get(&url)
        .send()
        .context("Failed to reach the relay server")?;

    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .context("Failed to parse relay response")?;

    if status.is_success() && body["success"].as_bool().unwrap_or(false) {
        println!("Relay can reach the media host");
        Ok(())
    } else {
        anyhow::bail!(
            "Relay cannot reach the media host ({}): {}",
            status,
            body["error"].as_str().unwrap_or("unknown error")
        )
    }
}

fn validate(submission: &BookSubmission) -> Result<()> {
    if submission.name.trim().is_empty() {
        anyhow::bail!("Please enter a book name");
    }
    if !submission.cover.is_file() {
        anyhow::bail!("Please select a book cover image to upload");
    }
    if let Some(pdf) = &submission.pdf {
        if !pdf.is_file() {
            anyhow::bail!("PDF file not found: {}", pdf.display());
        }
    }
    Ok(())
}

fn post_submission(server: &str, submission: &BookSubmission) -> Result<UploadData> {
    let client = reqwest::blocking::Client::new();
    let url = format!("{}/coverpage", normalize_server(server));

    let mut form = reqwest::blocking::multipart::Form::new()
        .text("bookName", submission.name.trim().to_string())
        .text("authorName", submission.author.trim().to_string())
        .text("useFirstPage", submission.use_first_page.to_string())
        .file("coverupload", &submission.cover)
        .context("Failed to read cover image")?;
    if let Some(pdf) = &submission.pdf {
        form = form.file("pdfUpload", pdf).context("Failed to read PDF")?;
    }

    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .context("Failed to reach the relay server")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        anyhow::bail!("Upload failed ({}): {}", status, body);
    }

    let reply: UploadReply = response.json().context("Failed to parse relay response")?;
    if !reply.success {
        anyhow::bail!(
            "Upload failed: {}",
            reply.message.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    reply.data.context("Relay response carried no upload data")
}

fn normalize_server(server: &str) -> &str {
    server.trim_end_matches('/')
}
