use crate::error::AppError;
use crate::query::DownloadRequest;
use async_trait::async_trait;

/// An image search backend. Implementations download up to
/// `request.image_limit` images into `request.output_directory`, which already
/// exists, and return how many files they saved.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search_and_download(&self, request: &DownloadRequest) -> Result<usize, AppError>;
}
