//! Checks datasets against the AVL dataset convention.
//!
//! [`verify_dataset`] runs every rule over an opened dataset and returns the
//! issues in rule order; [`verify_location`] opens a local or `s3://`
//! dataset first.

pub mod errors;
pub mod report;
pub mod rules;

use avl_core::Dataset;
use avl_zarr::{Location, OpenOptions, S3Options, open_dataset, open_store};
use tracing::info;

pub use errors::{Issue, IssueSeverity, VerifyError};
pub use report::Report;
pub use rules::{RULES, Rule};

/// Run all rules over `dataset`.
pub fn verify_dataset(dataset: &Dataset) -> Vec<Issue> {
    RULES.iter().flat_map(|rule| rule(dataset)).collect()
}

/// Keep issues at or above `level`, preserving order.
pub fn filter_issues(issues: Vec<Issue>, level: IssueSeverity) -> Vec<Issue> {
    issues
        .into_iter()
        .filter(|issue| issue.severity >= level)
        .collect()
}

/// Open the dataset at `location` and verify it.
pub async fn verify_location(
    location: &Location,
    level: IssueSeverity,
    s3: &S3Options,
) -> Result<Vec<Issue>, VerifyError> {
    let store = open_store(location, s3).await?;
    let dataset = open_dataset(store.as_ref(), OpenOptions::default()).await?;
    let issues = filter_issues(verify_dataset(&dataset), level);
    info!(
        event = "dataset_verified",
        location = %location,
        level = %level,
        issues = issues.len()
    );
    Ok(issues)
}
