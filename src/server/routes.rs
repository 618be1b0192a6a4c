use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use lazy_static::lazy_static;
use log::{error, info, warn};
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use super::config::ServerConfig;
use super::form;
use crate::controller::compress_pdf;
use crate::size::human_size;

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]+").unwrap();
}

/// `report.pdf` -> `report-compressed.pdf`, restricted to header-safe characters.
pub fn download_name(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = UNSAFE_FILENAME_CHARS.replace_all(&stem, "_");
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "document-compressed.pdf".to_string()
    } else {
        format!("{stem}-compressed.pdf")
    }
}

fn parse_target(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|&t| t > 0)
}

fn form_error(config: &ServerConfig, message: &str, target_mb: u32) -> Response {
    form::render(
        Some(message),
        target_mb,
        config.default_target_mb,
        config.max_input_mb,
    )
    .into_response()
}

pub async fn index(State(config): State<Arc<ServerConfig>>) -> Html<String> {
    form::render(
        None,
        config.default_target_mb,
        config.default_target_mb,
        config.max_input_mb,
    )
}

pub async fn compress(
    State(config): State<Arc<ServerConfig>>,
    mut multipart: Multipart,
) -> Response {
    // Removed when the handler returns.
    let workdir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("Failed to create work directory: {}", e);
            return form_error(&config, form::SAVE_FAILED, config.default_target_mb);
        }
    };
    let input_path = workdir.path().join("input.pdf");
    let output_path = workdir.path().join("output.pdf");

    let mut target_raw = None;
    let mut upload_name = None;
    let mut upload_failed = false;

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed upload: {}", e);
                upload_failed = true;
                break;
            }
        };

        match field.name().map(str::to_owned).as_deref() {
            Some("target_mb") => target_raw = field.text().await.ok(),
            Some("pdf") => {
                let name = field.file_name().unwrap_or_default().to_owned();
                if name.is_empty() {
                    continue;
                }
                let stored = async {
                    let mut file = tokio::fs::File::create(&input_path).await?;
                    while let Some(chunk) = field.chunk().await? {
                        file.write_all(&chunk).await?;
                    }
                    file.flush().await?;
                    anyhow::Ok(())
                }
                .await;
                match stored {
                    Ok(()) => upload_name = Some(name),
                    Err(e) => {
                        warn!("Failed to store upload {}: {}", name, e);
                        upload_failed = true;
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    let target_mb = match target_raw.as_deref() {
        None => config.default_target_mb,
        Some(raw) => match parse_target(raw) {
            Some(t) => t,
            None => return form_error(&config, form::INVALID_TARGET, config.default_target_mb),
        },
    };
    if upload_failed {
        return form_error(&config, form::SAVE_FAILED, target_mb);
    }
    let Some(original_name) = upload_name else {
        return form_error(&config, form::MISSING_FILE, target_mb);
    };

    info!("Compressing upload {} to {} MB", original_name, target_mb);
    let max_input_mb = config.max_input_mb;
    let (input, output) = (input_path.clone(), output_path.clone());
    let result = tokio::task::spawn_blocking(move || {
        compress_pdf(&input, &output, f64::from(target_mb), max_input_mb)
    })
    .await;

    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            warn!("Compression of {} failed: {}", original_name, e);
            let message = format!("{}{}", form::COMPRESS_FAILED, e);
            return form_error(&config, &message, target_mb);
        }
        Err(e) => {
            error!("Compression task for {} panicked: {}", original_name, e);
            let message = format!("{}{}", form::COMPRESS_FAILED, e);
            return form_error(&config, &message, target_mb);
        }
    };

    // An open handle keeps the file readable after the work directory is removed.
    let opened = async {
        let file = tokio::fs::File::open(&output_path).await?;
        let len = file.metadata().await?.len();
        Ok::<_, std::io::Error>((file, len))
    }
    .await;
    let (file, output_len) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            error!("Missing output for {}: {}", original_name, e);
            return form_error(&config, form::NO_OUTPUT, target_mb);
        }
    };
    let body = Body::from_stream(ReaderStream::new(file));

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::PARTIAL_CONTENT
    };
    let headers = [
        (CONTENT_TYPE, "application/pdf".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name(&original_name)),
        ),
        (CACHE_CONTROL, "no-cache".to_string()),
        (HeaderName::from_static("x-output-size"), human_size(output_len)),
        (CONTENT_LENGTH, output_len.to_string()),
    ];
    (status, headers, body).into_response()
}
