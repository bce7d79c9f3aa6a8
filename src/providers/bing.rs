use crate::config::ProviderSettings;
use crate::error::AppError;
use crate::provider::ImageProvider;
use crate::query::DownloadRequest;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

lazy_static! {
    // Full-size image URLs sit in the HTML-escaped `m` metadata of each tile.
    static ref MURL_REGEX: Regex = Regex::new(r"murl&quot;:&quot;(.*?)&quot;").unwrap();
}

const KNOWN_EXTENSIONS: [&str; 10] = [
    "jpe", "jpeg", "jfif", "exif", "tiff", "gif", "bmp", "png", "webp", "jpg",
];

/// Downloads images found through Bing's asynchronous image results endpoint.
pub struct BingProvider {
    client: reqwest::Client,
    settings: ProviderSettings,
}

impl BingProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, AppError> {
        log::debug!("Initializing Bing provider against {}", settings.base_url);
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    pub fn page_url(&self, query: &str, first: usize, count: usize) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.settings.base_url)
            .and_then(|base| base.join("images/async"))
            .map_err(|e| AppError::Provider(format!("invalid base url {:?}: {}", self.settings.base_url, e)))?;

        let adult = if self.settings.adult_filter_off { "off" } else { "on" };
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("first", &first.to_string())
            .append_pair("count", &count.to_string())
            .append_pair("adlt", adult)
            .append_pair("qft", filter_parameter(&self.settings.filter));
        Ok(url)
    }

    async fn fetch_page(&self, url: Url) -> Result<String, AppError> {
        log::debug!("Requesting results page: {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Provider(format!("results page returned {}", status)));
        }
        Ok(response.text().await?)
    }

    async fn fetch_image(&self, link: &str) -> Result<Vec<u8>, AppError> {
        let response = self.client.get(link).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Provider(format!("image request returned {}", status)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageProvider for BingProvider {
    fn name(&self) -> &str {
        "bing"
    }

    async fn search_and_download(&self, request: &DownloadRequest) -> Result<usize, AppError> {
        let dest = &request.output_directory;
        if self.settings.force_replace {
            log::info!("Replacing existing downloads in {:?}", dest);
            tokio::fs::remove_dir_all(dest)
                .await
                .map_err(|e| AppError::filesystem(dest, e))?;
            tokio::fs::create_dir_all(dest)
                .await
                .map_err(|e| AppError::filesystem(dest, e))?;
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut hashes: HashSet<String> = HashSet::new();
        let mut saved = 0;
        let mut next_index = 1;
        let mut first = 0;

        for page in 1..=self.settings.max_pages {
            if saved >= request.image_limit {
                break;
            }
            let url = self.page_url(request.query.as_str(), first, request.image_limit)?;
            let html = self.fetch_page(url).await?;
            let links = extract_image_links(&html);
            let fresh: Vec<String> = links.into_iter().filter(|l| seen.insert(l.clone())).collect();
            log::debug!("Page {} for {:?}: {} new links", page, request.query.as_str(), fresh.len());

            if fresh.is_empty() {
                log::info!("No more images available for {:?}", request.query.as_str());
                break;
            }
            first += fresh.len();

            for link in fresh {
                if saved >= request.image_limit {
                    break;
                }
                let bytes = match self.fetch_image(&link).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::warn!("Failed to download {}: {}", link, e);
                        continue;
                    }
                };
                if image::guess_format(&bytes).is_err() {
                    log::debug!("Discarding non-image payload from {}", link);
                    continue;
                }
                let digest = format!("{:x}", Sha256::digest(&bytes));
                if !hashes.insert(digest) {
                    log::debug!("Discarding duplicate image from {}", link);
                    continue;
                }

                let path = next_free_path(dest, &mut next_index, extension_for(&link));
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| AppError::filesystem(&path, e))?;
                saved += 1;
                log::info!("[{}/{}] Saved {} as {:?}", saved, request.image_limit, link, path);
            }
        }

        Ok(saved)
    }
}

fn filter_parameter(filter: &str) -> &'static str {
    match filter {
        "line" => "+filterui:photo-linedrawing",
        "photo" => "+filterui:photo-photo",
        "clipart" => "+filterui:photo-clipart",
        "gif" => "+filterui:photo-animatedgif",
        "transparent" => "+filterui:photo-transparent",
        _ => "",
    }
}

/// Image URLs from one results page, in page order, unescaped.
pub fn extract_image_links(html: &str) -> Vec<String> {
    MURL_REGEX
        .captures_iter(html)
        .map(|c| c[1].replace("&amp;", "&"))
        .collect()
}

/// The URL's own extension when it is a known image type, else `jpg`.
pub fn extension_for(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|url| {
            Path::new(url.path())
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
        })
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "jpg".to_string())
}

fn next_free_path(dest: &Path, next_index: &mut usize, ext: String) -> PathBuf {
    loop {
        let path = dest.join(format!("Image_{}.{}", next_index, ext));
        *next_index += 1;
        if !path.exists() {
            return path;
        }
    }
}
