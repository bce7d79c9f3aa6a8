use crate::config::CropSettings;
use crate::error::AppError;
use crate::input::RunInput;
use crate::processor;
use crate::provider::ImageProvider;
use crate::query::{DownloadRequest, Query};
use crate::renamer;
use crate::walker;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct QueryReport {
    pub query: String,
    pub downloaded: usize,
    pub renamed: usize,
    pub cropped: usize,
    pub crop_skipped: usize,
    pub acquisition_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<QueryReport>,
}

impl RunSummary {
    pub fn failed_queries(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| r.acquisition_error.is_some())
            .map(|r| r.query.as_str())
            .collect()
    }

    pub fn total_renamed(&self) -> usize {
        self.reports.iter().map(|r| r.renamed).sum()
    }
}

/// Downloads up to `limit` images for `query` into `destination`, creating it
/// if needed. Returns how many files the provider saved.
pub async fn fetch(
    provider: &dyn ImageProvider,
    query: &Query,
    destination: &Path,
    limit: usize,
) -> Result<usize, AppError> {
    if limit == 0 {
        return Err(AppError::Input("image count must be greater than zero".into()));
    }
    walker::ensure_directory(destination)?;

    let request = DownloadRequest::new(query.clone(), destination, limit);
    log::info!(
        "Fetching up to {} images for {:?} from {}",
        limit,
        query.as_str(),
        provider.name()
    );
    let count = provider.search_and_download(&request).await?;
    log::info!("Fetched {} images for {:?}", count, query.as_str());
    Ok(count)
}

/// Runs every stage for each query in turn. Network and provider failures
/// are logged and the batch moves on to the next query; rename, crop and
/// filesystem failures stop the run.
pub async fn run(
    root: &Path,
    input: &RunInput,
    provider: &dyn ImageProvider,
    crop: Option<CropSettings>,
) -> Result<RunSummary, AppError> {
    walker::ensure_directory(root)?;

    let mut summary = RunSummary::default();
    for query in &input.queries {
        let folder = root.join(query.as_str());
        let mut report = QueryReport {
            query: query.to_string(),
            ..QueryReport::default()
        };

        match fetch(provider, query, &folder, input.image_count).await {
            Ok(count) => report.downloaded = count,
            Err(e) if e.is_acquisition_failure() => {
                log::error!("Acquisition failed for {:?}, moving on: {}", query.as_str(), e);
                report.acquisition_error = Some(e.to_string());
                summary.reports.push(report);
                continue;
            }
            Err(e) => return Err(e),
        }

        report.renamed = renamer::normalize_names(&folder, query)?;

        if let Some(settings) = crop {
            let crops = processor::crop_square(&folder, settings)?;
            report.cropped = crops.cropped;
            report.crop_skipped = crops.too_small + crops.undecodable;
        }

        summary.reports.push(report);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::RgbImage;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Writes `per_query` 400x400 PNGs, or fails for the listed queries.
    struct FakeProvider {
        failing: Vec<&'static str>,
        per_query: usize,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn new(failing: Vec<&'static str>, per_query: usize) -> Self {
            Self {
                failing,
                per_query,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn search_and_download(&self, request: &DownloadRequest) -> Result<usize, AppError> {
            self.calls.lock().unwrap().push(request.query.to_string());
            if self.failing.contains(&request.query.as_str()) {
                return Err(AppError::Provider("rate limited".into()));
            }
            let count = self.per_query.min(request.image_limit);
            for i in 1..=count {
                RgbImage::new(400, 400)
                    .save(request.output_directory.join(format!("Image_{}.png", i)))
                    .unwrap();
            }
            Ok(count)
        }
    }

    fn input(queries: &str, count: usize) -> RunInput {
        RunInput {
            queries: crate::query::parse_queries(queries, ",").unwrap(),
            image_count: count,
        }
    }

    #[tokio::test]
    async fn each_query_fetched_once_and_failures_are_isolated() {
        let root = tempdir().unwrap();
        let provider = FakeProvider::new(vec!["dog"], 2);

        let summary = run(root.path(), &input("cat,dog,owl", 5), &provider, None)
            .await
            .unwrap();

        assert_eq!(*provider.calls.lock().unwrap(), vec!["cat", "dog", "owl"]);
        assert_eq!(summary.failed_queries(), vec!["dog"]);
        assert_eq!(summary.total_renamed(), 4);
        assert!(root.path().join("cat").join("cat_2.jpg").is_file());
        assert!(root.path().join("owl").join("owl_1.jpg").is_file());
    }

    #[tokio::test]
    async fn crop_stage_writes_crops_next_to_renamed_files() {
        let root = tempdir().unwrap();
        let provider = FakeProvider::new(vec![], 2);
        let crop = CropSettings {
            target_pixels: 100,
            scale_percent: 50,
        };

        let summary = run(root.path(), &input("fox", 3), &provider, Some(crop))
            .await
            .unwrap();

        let folder = root.path().join("fox");
        for name in ["fox_1.jpg", "fox_2.jpg", "fox_1_crop.jpg", "fox_2_crop.jpg"] {
            assert!(folder.join(name).is_file(), "missing {name}");
        }
        assert_eq!(summary.reports[0].cropped, 2);
        assert_eq!(summary.reports[0].crop_skipped, 0);
    }

    #[tokio::test]
    async fn second_cropped_run_keeps_crops_out_of_the_sequence() {
        let root = tempdir().unwrap();
        let provider = FakeProvider::new(vec![], 2);
        let crop = CropSettings {
            target_pixels: 100,
            scale_percent: 50,
        };

        run(root.path(), &input("fox", 2), &provider, Some(crop))
            .await
            .unwrap();
        let summary = run(root.path(), &input("fox", 2), &provider, Some(crop))
            .await
            .unwrap();

        let report = &summary.reports[0];
        assert_eq!(report.renamed, 4);
        assert_eq!(report.cropped, 4);
        assert_eq!(report.crop_skipped, 0);

        let mut names: Vec<String> = std::fs::read_dir(root.path().join("fox"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "fox_1.jpg",
                "fox_1_crop.jpg",
                "fox_2.jpg",
                "fox_2_crop.jpg",
                "fox_3.jpg",
                "fox_3_crop.jpg",
                "fox_4.jpg",
                "fox_4_crop.jpg",
            ]
        );
        // Every renamed original is still a full-size download.
        for k in 1..=4 {
            let dims = image::io::Reader::open(root.path().join("fox").join(format!("fox_{}.jpg", k)))
                .unwrap()
                .with_guessed_format()
                .unwrap()
                .into_dimensions()
                .unwrap();
            assert_eq!(dims, (400, 400));
        }
    }

    #[tokio::test]
    async fn zero_count_is_rejected_before_calling_the_provider() {
        let root = tempdir().unwrap();
        let provider = FakeProvider::new(vec![], 1);
        let query = Query::parse("cat").unwrap();

        let err = fetch(&provider, &query, &root.path().join("cat"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unusable_root_stops_the_run() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("occupied");
        std::fs::write(&root, b"file").unwrap();
        let provider = FakeProvider::new(vec![], 1);

        let err = run(&root, &input("cat", 1), &provider, None).await.unwrap_err();
        assert!(matches!(err, AppError::Filesystem { .. }));
        assert!(provider.calls.lock().unwrap().is_empty());
    }
}
