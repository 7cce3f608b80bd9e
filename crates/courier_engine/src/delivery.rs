use std::path::PathBuf;
use std::time::Duration;

use courier_logging::courier_info;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::package::EpubDocument;
use crate::persist::{AtomicFileWriter, PersistError};

/// Subject line the Kindle service recognises as a conversion request.
pub const SUBJECT: &str = "convert";
pub const BODY: &str = "Please convert this file.";
pub const EPUB_CONTENT_TYPE: &str = "application/epub+zip";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("could not build message: {0}")]
    Message(String),
    #[error("smtp delivery failed: {0}")]
    Transport(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    /// Hands `document` to `to` under the given attachment name.
    async fn send(
        &self,
        document: &EpubDocument,
        filename: &str,
        to: &str,
    ) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender mailbox; Kindle users must approve this address.
    pub from: String,
    pub timeout: Duration,
}

/// STARTTLS SMTP delivery with the conversion subject and body.
pub struct SmtpDelivery {
    settings: SmtpSettings,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpDelivery {
    pub fn new(settings: SmtpSettings) -> Result<Self, DeliveryError> {
        let credentials = Credentials::new(settings.username.clone(), settings.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|err| DeliveryError::Transport(err.to_string()))?
            .port(settings.port)
            .credentials(credentials)
            .timeout(Some(settings.timeout))
            .build();
        Ok(Self {
            settings,
            transport,
        })
    }

    pub fn sender(&self) -> &str {
        &self.settings.from
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|err| DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: err.to_string(),
        })
}

/// Builds the conversion email with the book attached.
pub fn build_message(
    from: &str,
    to: &str,
    document: &EpubDocument,
    filename: &str,
) -> Result<Message, DeliveryError> {
    let content_type = ContentType::parse(EPUB_CONTENT_TYPE)
        .map_err(|err| DeliveryError::Message(err.to_string()))?;
    let attachment =
        Attachment::new(filename.to_string()).body(document.as_bytes().to_vec(), content_type);

    Message::builder()
        .from(parse_mailbox(from)?)
        .to(parse_mailbox(to)?)
        .subject(SUBJECT)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(BODY.to_string()))
                .singlepart(attachment),
        )
        .map_err(|err| DeliveryError::Message(err.to_string()))
}

#[async_trait::async_trait]
impl Delivery for SmtpDelivery {
    async fn send(
        &self,
        document: &EpubDocument,
        filename: &str,
        to: &str,
    ) -> Result<(), DeliveryError> {
        let message = build_message(&self.settings.from, to, document, filename)?;
        self.transport
            .send(message)
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;
        courier_info!("Sent {} ({} bytes) to {}", filename, document.len(), to);
        Ok(())
    }
}

/// Writes books into a directory instead of mailing them.
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    writer: AtomicFileWriter,
}

impl DirectoryDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }
}

#[async_trait::async_trait]
impl Delivery for DirectoryDelivery {
    async fn send(
        &self,
        document: &EpubDocument,
        filename: &str,
        _to: &str,
    ) -> Result<(), DeliveryError> {
        let path = self.writer.write(filename, document.as_bytes())?;
        courier_info!("Wrote {} ({} bytes)", path.display(), document.len());
        Ok(())
    }
}
