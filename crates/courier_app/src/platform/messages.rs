//! User-facing wording for pipeline and delivery failures.
use courier_engine::{
    DeliveryError, ExtractionError, FailureKind, PackagingError, PipelineError,
};

pub fn pipeline_failure(err: &PipelineError) -> String {
    match err {
        PipelineError::Fetch(fetch) => match &fetch.kind {
            FailureKind::InvalidUrl => "That link could not be opened.".to_string(),
            FailureKind::NotFound => "The article could not be found (404).".to_string(),
            FailureKind::HttpStatus(code) => format!("The site answered with HTTP {code}."),
            FailureKind::Timeout => "The site took too long to respond.".to_string(),
            FailureKind::RedirectLimitExceeded => "The link redirects too many times.".to_string(),
            FailureKind::TooLarge { .. } => "The page is too large to convert.".to_string(),
            FailureKind::UnsupportedContentType { content_type } => {
                format!("That link is not a web page ({content_type}).")
            }
            FailureKind::Network => "Could not reach the site.".to_string(),
        },
        PipelineError::Extraction(ExtractionError::UnparseableHtml) => {
            "The page could not be read as HTML.".to_string()
        }
        PipelineError::Extraction(ExtractionError::EmptyBody) => {
            "No article text was found on that page.".to_string()
        }
        PipelineError::Packaging(PackagingError::EmptyBody) => {
            "No article text was found on that page.".to_string()
        }
        PipelineError::Packaging(_) => "Building the e-book failed.".to_string(),
    }
}

pub fn delivery_failure(err: &DeliveryError) -> String {
    match err {
        DeliveryError::InvalidAddress { address, .. } => {
            format!("{address} is not a valid email address. Use /config to change it.")
        }
        DeliveryError::Message(_) | DeliveryError::Transport(_) => {
            "The e-book was built but could not be emailed. Please try again later.".to_string()
        }
        DeliveryError::Persist(_) => "The e-book could not be saved.".to_string(),
    }
}
