use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image payload is empty")]
    EmptyPayload,
    #[error("failed to fetch image from {link}")]
    Fetch {
        link: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to resolve current directory: {0}")]
    ResolveCurrentDirectory(std::io::Error),
    #[error("failed to write image to {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Image bytes downloaded from a meme link.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Downloads the image behind `link`.
///
/// # Errors
///
/// Returns [`ImageError::Fetch`] for transport failures and error statuses.
pub fn fetch_image(
    link: &str,
    user_agent: &str,
    timeout: Option<Duration>,
) -> Result<FetchedImage, ImageError> {
    let fetch_error = |source| ImageError::Fetch {
        link: link.to_string(),
        source,
    };

    let mut builder = Client::builder().user_agent(user_agent);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder.build().map_err(fetch_error)?;

    let response = client
        .get(link)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(fetch_error)?;

    let mime_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());
    let bytes = response.bytes().map_err(fetch_error)?.to_vec();

    tracing::debug!(link, size = bytes.len(), ?mime_type, "fetched image");
    Ok(FetchedImage { bytes, mime_type })
}

#[derive(Debug, Default)]
pub struct SaveImageOptions<'a> {
    pub file_stem: Option<&'a str>,
    pub mime_type: Option<&'a str>,
    pub output_dir: Option<&'a Path>,
}

pub fn save_image(bytes: &[u8], options: SaveImageOptions<'_>) -> Result<PathBuf, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyPayload);
    }

    let output_dir = resolve_output_dir(options.output_dir)?;
    fs::create_dir_all(&output_dir).map_err(|source| ImageError::Io {
        path: output_dir.clone(),
        source,
    })?;

    let extension = extension_from_mime(options.mime_type);
    let file_name = match options.file_stem {
        Some(stem) => format!("{stem}.{extension}"),
        None => format!("meme-{}.{}", timestamp_suffix(), extension),
    };

    let path = output_dir.join(file_name);
    fs::write(&path, bytes).map_err(|source| ImageError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

fn resolve_output_dir(dir: Option<&Path>) -> Result<PathBuf, ImageError> {
    match dir {
        Some(path) if !path.as_os_str().is_empty() => Ok(path.to_path_buf()),
        _ => std::env::current_dir().map_err(ImageError::ResolveCurrentDirectory),
    }
}

fn extension_from_mime(mime_type: Option<&str>) -> &'static str {
    match mime_type
        .unwrap_or("image/jpeg")
        .to_ascii_lowercase()
        .as_str()
    {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/png" => "png",
        _ => "bin",
    }
}

fn timestamp_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or_default()
}
