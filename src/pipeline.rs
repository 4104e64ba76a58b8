use crate::analyzer::{aggregate, resolve_role_members};
use crate::directory::DirectoryService;
use crate::error::ReportError;
use crate::loader::TableLoader;
use crate::table::OrgCodeTable;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub output: PathBuf,
}

/// Load -> resolve role sets -> aggregate -> append -> sort -> write.
/// Nothing touches `output` unless every earlier step succeeded.
pub async fn run<D: DirectoryService>(
    org_url: &str,
    output: &Path,
    loader: &TableLoader,
    directory: &mut D,
) -> Result<RunSummary> {
    let table = load_or_abort(loader, org_url).await?;
    if table.is_empty() {
        warn!("Organization code table at {} has no rows", org_url);
    }
    let org_codes = table.org_codes();

    let roles = resolve_role_members(directory).await?;
    let counts = aggregate(directory, &org_codes, &roles).await?;

    let report = table.with_counts(&counts)?.sorted_by_code();
    report.write_to_path(output)?;
    info!("Wrote {} organization codes to {}", report.len(), output.display());

    Ok(RunSummary {
        rows: report.len(),
        output: output.to_path_buf(),
    })
}

async fn load_or_abort(loader: &TableLoader, org_url: &str) -> Result<OrgCodeTable> {
    match loader.load(org_url).await {
        Ok(table) => Ok(table),
        Err(e) => {
            if let Some(ReportError::DataUnavailable { .. }) = e.downcast_ref::<ReportError>() {
                info!("Unable to retrieve data from URL !");
                info!("Please check your internet connection !");
                info!("org-code-numbers terminating !");
            }
            Err(e)
        }
    }
}
