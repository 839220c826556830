//! JSON envelopes exchanged with the Dropbox v2 HTTP API.

use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

pub const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_BASE: &str = "https://content.dropboxapi.com";

pub const DOWNLOAD_PATH: &str = "/2/files/download";
pub const UPLOAD_PATH: &str = "/2/files/upload";
pub const DELETE_PATH: &str = "/2/files/delete_v2";
pub const LIST_FOLDER_PATH: &str = "/2/files/list_folder";
pub const LIST_FOLDER_CONTINUE_PATH: &str = "/2/files/list_folder/continue";

/// Header carrying the JSON arguments of content-host endpoints.
pub const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Status the service uses for requests that were understood but failed.
pub const ENDPOINT_ERROR_STATUS: u16 = 409;

#[derive(Debug, Serialize)]
pub struct PathArg {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct UploadArg {
    pub path: String,
    pub mode: &'static str,
    pub autorename: bool,
    pub mute: bool,
}

impl UploadArg {
    /// Last writer wins, and the account owner gets no change notification.
    pub fn overwrite(path: String) -> Self {
        Self {
            path,
            mode: "overwrite",
            autorename: true,
            mute: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListFolderArg {
    pub path: String,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct ListFolderContinueArg {
    pub cursor: String,
}

#[derive(Debug, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<Metadata>,
    pub cursor: String,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct Metadata {
    #[serde(rename = ".tag", default)]
    pub tag: Option<String>,
    pub name: String,
    // Folders carry no size.
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error_summary: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Wire path of a reference: the service roots everything at "/".
pub fn wire_path(reference: &str) -> String {
    format!("/{}", reference)
}

/// Serializes `value` for the `Dropbox-API-Arg` header. Header values must
/// be ASCII, so every other character is written as a `\uXXXX` escape.
pub fn header_arg<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    if json.is_ascii() {
        return Ok(json);
    }

    let mut escaped = String::with_capacity(json.len() + 16);
    for c in json.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                // Writing to a String cannot fail.
                let _ = write!(escaped, "\\u{:04x}", unit);
            }
        }
    }
    Ok(escaped)
}
