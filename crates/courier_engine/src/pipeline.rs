use std::sync::Arc;

use courier_core::ArticleRecord;
use courier_logging::{courier_info, courier_warn};
use thiserror::Error;

use crate::decode::decode_html;
use crate::extract::{ArticleExtractor, ExtractOptions, ExtractionError, Extractor};
use crate::fetch::{fetch_images, Fetcher};
use crate::filename::epub_filename;
use crate::package::{package, EpubDocument, PackagingError};
use crate::{FetchError, Stage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub preserve_image_links: bool,
}

#[derive(Debug, Clone)]
pub struct ConvertedArticle {
    pub record: ArticleRecord,
    pub epub: EpubDocument,
    pub filename: String,
    pub embedded_images: usize,
    pub missing_images: usize,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not fetch article: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not extract article: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("could not build book: {0}")]
    Packaging(#[from] PackagingError),
}

impl PipelineError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Fetch(_) => Stage::Fetching,
            PipelineError::Extraction(_) => Stage::Extracting,
            PipelineError::Packaging(_) => Stage::Packaging,
        }
    }
}

/// Fetch → decode → extract → fetch images → package.
///
/// Every call owns its record and image map, so concurrent conversions share
/// nothing but the fetcher.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(ArticleExtractor::default()),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub async fn convert(
        &self,
        url: &str,
        options: &ConvertOptions,
    ) -> Result<ConvertedArticle, PipelineError> {
        courier_info!("Converting {}", url);
        let page = self.fetcher.fetch_page(url).await?;

        // Parsed documents are not Send; keep them out of any await.
        let record = {
            let decoded = decode_html(&page.bytes, page.metadata.content_type.as_deref());
            let extract_options = ExtractOptions {
                preserve_image_links: options.preserve_image_links,
            };
            self.extractor
                .extract(&decoded.html, &page.metadata.final_url, &extract_options)?
        };

        let images = fetch_images(self.fetcher.as_ref(), &record.images).await;
        let epub = package(&record, &images)?;

        let missing_images = epub.missing_images().len();
        let embedded_images = record.images.len() - missing_images;
        if missing_images > 0 {
            courier_warn!(
                "{} of {} images missing from '{}'",
                missing_images,
                record.images.len(),
                record.title
            );
        }
        let filename = epub_filename(&record.title, &record.source_url);
        courier_info!("Converted '{}' into {} ({} bytes)", record.title, filename, epub.len());

        Ok(ConvertedArticle {
            record,
            epub,
            filename,
            embedded_images,
            missing_images,
        })
    }
}
