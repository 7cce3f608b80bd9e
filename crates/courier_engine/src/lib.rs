//! Courier engine: fetch, extract, package and deliver articles.
mod decode;
mod delivery;
mod extract;
mod fetch;
mod filename;
mod package;
mod persist;
mod pipeline;
mod prefs;
mod types;

pub use decode::{decode_html, DecodedHtml};
pub use delivery::{
    build_message, Delivery, DeliveryError, DirectoryDelivery, SmtpDelivery, SmtpSettings, BODY,
    EPUB_CONTENT_TYPE, SUBJECT,
};
pub use extract::{
    detect_strategy, extract, extract_with, ArticleExtractor, ExtractOptions, ExtractionError,
    Extractor, Page, Strategy, READABILITY, SUBSTACK,
};
pub use fetch::{fetch_images, FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::epub_filename;
pub use package::{package, sniff_media_type, EpubDocument, PackagingError};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{ConvertOptions, ConvertedArticle, Pipeline, PipelineError};
pub use prefs::{PreferenceError, PreferenceStore, RonPreferenceStore, UserPreferences};
pub use types::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, FetchedImage, ImageMap, Stage,
};
