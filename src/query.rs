// src/query.rs

use crate::error::AppError;
use std::fmt;
use std::path::{Path, PathBuf};

/// A trimmed, filesystem-safe search term. It doubles as the subdirectory
/// name and the file name prefix for its images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_query(raw, "query is empty"));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(AppError::invalid_query(raw, "query cannot be a relative path component"));
        }
        if trimmed.contains(['/', '\\']) {
            return Err(AppError::invalid_query(raw, "query cannot contain path separators"));
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(AppError::invalid_query(raw, "query cannot contain control characters"));
        }
        Ok(Query(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits delimiter-joined input into queries. Blank segments (a trailing
/// delimiter, doubled delimiters) are dropped; any other unsafe segment fails
/// the whole input.
pub fn parse_queries(input: &str, delimiter: &str) -> Result<Vec<Query>, AppError> {
    if delimiter.is_empty() {
        return Err(AppError::Input("delimiter must not be empty".into()));
    }

    let mut queries = Vec::new();
    for segment in input.split(delimiter) {
        if segment.trim().is_empty() {
            log::debug!("Dropping blank query segment");
            continue;
        }
        let query = Query::parse(segment)?;
        if queries.contains(&query) {
            log::warn!("Query {:?} given more than once; processing it once", query.as_str());
            continue;
        }
        queries.push(query);
    }

    if queries.is_empty() {
        return Err(AppError::Input(format!("no queries found in {:?}", input)));
    }
    Ok(queries)
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub query: Query,
    pub output_directory: PathBuf,
    pub image_limit: usize,
}

impl DownloadRequest {
    pub fn new(query: Query, output_directory: &Path, image_limit: usize) -> Self {
        Self {
            query,
            output_directory: output_directory.to_path_buf(),
            image_limit,
        }
    }
}
