use crate::error::ReportError;
use crate::table::OrgCodeTable;
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::time::Duration;
use tracing::{debug, info};

pub struct TableLoader {
    client: reqwest::Client,
    timeout: Duration,
    code_column: String,
}

impl TableLoader {
    pub fn new(code_column: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
            code_column: code_column.to_string(),
        }
    }

    /// Loads the sheet from an http(s) URL or a local path. Anything that keeps
    /// the bytes from arriving is reported as `ReportError::DataUnavailable`.
    pub async fn load(&self, location: &str) -> Result<OrgCodeTable> {
        let content = if is_remote(location) {
            self.fetch_url(location).await?
        } else {
            self.read_file(location)?
        };

        let table = OrgCodeTable::from_reader(content.as_bytes(), &self.code_column)?;
        info!("Number of organizational codes : {}", table.len());
        Ok(table)
    }

    async fn fetch_url(&self, url: &str) -> Result<String, ReportError> {
        debug!("Fetching organization codes from: {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ReportError::data_unavailable(url, e))?;

        if !response.status().is_success() {
            return Err(ReportError::data_unavailable(
                url,
                format!("HTTP request failed with status: {}", response.status()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| ReportError::data_unavailable(url, e))
    }

    /// Missing or unreadable files count as unavailable data; anything else
    /// (bad encoding, a directory path) is an ordinary error.
    fn read_file(&self, file_path: &str) -> Result<String> {
        debug!("Reading organization codes from: {}", file_path);
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                Err(ReportError::data_unavailable(file_path, e).into())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read file: {}", file_path)),
        }
    }
}

fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
