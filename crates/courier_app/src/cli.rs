use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use courier_app::platform::{logging, AppConfig};
use courier_core::{is_kindle_address, parse_article_url};
use courier_engine::{
    ConvertOptions, ConvertedArticle, Delivery, DirectoryDelivery, Pipeline, ReqwestFetcher,
    SmtpDelivery,
};
use courier_logging::{courier_info, courier_warn};
use serde::Serialize;

/// Convert a web article to EPUB and send it to a Kindle.
#[derive(Debug, Parser)]
#[command(name = "courier", version)]
struct Cli {
    /// Article URL (http or https).
    url: String,

    /// Wrap each image in a link to its original source.
    #[arg(long)]
    preserve_image_links: bool,

    /// Kindle address to send to. Defaults to KINDLE_EMAIL.
    #[arg(long, value_name = "EMAIL")]
    to: Option<String>,

    /// Also write the EPUB into this directory.
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Build the EPUB without emailing it.
    #[arg(long)]
    no_send: bool,

    /// Print a machine-readable summary.
    #[arg(long)]
    json: bool,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    title: &'a str,
    author: Option<&'a str>,
    publication: Option<&'a str>,
    source_url: &'a str,
    filename: &'a str,
    words: usize,
    bytes: usize,
    embedded_images: usize,
    missing_images: usize,
    written_to: Option<PathBuf>,
    sent_to: Option<&'a str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    logging::initialize(config.log_file.as_deref(), cli.verbose);

    let Some(url) = parse_article_url(&cli.url) else {
        bail!("{} is not an http(s) URL", cli.url);
    };
    let recipient = if cli.no_send {
        None
    } else {
        let to = cli
            .to
            .clone()
            .or_else(|| config.kindle_email.clone())
            .context("no recipient: pass --to or set KINDLE_EMAIL (or use --no-send)")?;
        if !is_kindle_address(&to) {
            courier_warn!("{} does not look like a Kindle address", to);
        }
        Some(to)
    };

    let pipeline = Pipeline::new(Arc::new(ReqwestFetcher::new(config.fetch_settings())));
    let options = ConvertOptions {
        preserve_image_links: cli.preserve_image_links,
    };
    let converted = pipeline
        .convert(&url, &options)
        .await
        .with_context(|| format!("converting {url}"))?;

    // Without --out and without sending, the book would otherwise be lost.
    let out_dir = match (&cli.out, &recipient) {
        (Some(dir), _) => Some(dir.clone()),
        (None, None) => Some(PathBuf::from(".")),
        (None, Some(_)) => None,
    };
    if let Some(dir) = &out_dir {
        DirectoryDelivery::new(dir.clone())
            .send(&converted.epub, &converted.filename, "")
            .await
            .with_context(|| format!("writing into {}", dir.display()))?;
    }

    if let Some(to) = &recipient {
        let smtp = config.require_smtp()?;
        let delivery = SmtpDelivery::new(smtp.settings(config.fetch_timeout))?;
        delivery
            .send(&converted.epub, &converted.filename, to)
            .await
            .with_context(|| format!("sending to {to}"))?;
        courier_info!("Sent '{}' to {}", converted.record.title, to);
    }

    let written_to = out_dir.map(|dir| dir.join(&converted.filename));
    print_summary(&cli, &converted, written_to, recipient.as_deref())
}

fn print_summary(
    cli: &Cli,
    converted: &ConvertedArticle,
    written_to: Option<PathBuf>,
    sent_to: Option<&str>,
) -> Result<()> {
    let record = &converted.record;
    if cli.json {
        let report = Report {
            title: &record.title,
            author: record.author.as_deref(),
            publication: record.publication.as_deref(),
            source_url: &record.source_url,
            filename: &converted.filename,
            words: record.word_count(),
            bytes: converted.epub.len(),
            embedded_images: converted.embedded_images,
            missing_images: converted.missing_images,
            written_to,
            sent_to,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", record.title);
    if let Some(author) = &record.author {
        println!("By {author}");
    }
    if let Some(publication) = &record.publication {
        println!("From: {publication}");
    }
    println!("{} words", record.word_count());
    if converted.missing_images > 0 {
        println!(
            "{} of {} images could not be downloaded.",
            converted.missing_images,
            record.images.len()
        );
    }
    if let Some(path) = written_to {
        println!("Saved to {}", path.display());
    }
    if sent_to.is_some() {
        println!("Article has been sent to your Kindle!");
    }
    Ok(())
}
