#![forbid(unsafe_code)]

//! Command-line entry point: dumps title, description, publish time and
//! view/like/comment counters of every upload of a channel into
//! `<out>.json`.
//!
//! Quota: the default allocation is 10,000 units a day and a run costs two
//! units per page of up to 50 videos, plus a handful for setup.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use channel_dump::api::ApiEndpoints;
use channel_dump::config::{
    DEFAULT_ENV_PATH, DEFAULT_OUTPUT_NAME, DEFAULT_PAGE_SIZE, SettingsOverrides, clamp_page_size,
    resolve_settings,
};
use channel_dump::gate::Session;
use channel_dump::output::{output_path, write_document};
use channel_dump::pipeline::dump_channel;
use channel_dump::preflight::preflight;
use channel_dump::transport::{ResilientTransport, UreqTransport};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "fetch_channel",
    version,
    about = "Dump metadata of every video on a YouTube channel"
)]
struct FetchArgs {
    /// Channel link, or an already resolved channel id
    #[arg(long)]
    url: String,

    /// YouTube Data API v3 key (or set YOUTUBE_API_KEY)
    #[arg(long)]
    key: Option<String>,

    /// Name of the output file, written as <out>.json
    #[arg(long, default_value = DEFAULT_OUTPUT_NAME)]
    out: String,

    /// Results per request, 1 to 50
    #[arg(long, default_value_t = i64::from(DEFAULT_PAGE_SIZE), allow_negative_numbers = true)]
    maxr: i64,

    /// Settings file
    #[arg(long, default_value = DEFAULT_ENV_PATH)]
    env_file: PathBuf,

    /// Seconds to wait before retrying a failed connection
    #[arg(long)]
    retry_delay: Option<u64>,

    /// Give up after this many attempts per request (default: never)
    #[arg(long)]
    max_retries: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = FetchArgs::parse();

    let (page_size, replaced) = clamp_page_size(args.maxr);
    if replaced {
        log::warn!("-maxr argument changed to default: {page_size}");
    }

    let settings = resolve_settings(SettingsOverrides {
        api_key: args.key.clone(),
        retry_delay_secs: args.retry_delay,
        max_retries: args.max_retries,
        env_path: Some(args.env_file.clone()),
    })?;

    let transport = ResilientTransport::new(UreqTransport::default(), settings.retry);
    let endpoints = ApiEndpoints::new(settings.api_key);

    println!("===================================");
    println!("YouTube Channel Data");
    println!("===================================");
    println!("Channel: {}", args.url);
    println!("Page size: {page_size}");
    println!();

    println!("Arguments validation...");
    preflight(&transport, &endpoints, &args.url, &args.out)?;

    let mut session = Session::new(transport, endpoints);
    println!("Fetching channel id & playlist id...");
    let dump = dump_channel(&mut session, &args.url, page_size)?;

    let path = output_path(&env::current_dir().context("reading working directory")?, &args.out);
    println!("Saving json file...");
    write_document(&path, &dump.document)
        .with_context(|| format!("saving {}", path.display()))?;

    println!();
    println!("===================================");
    if dump.complete {
        println!("Done!");
    } else {
        println!("Done (partial: the API refused further requests)");
    }
    println!("===================================");
    println!(
        "Channel: {}",
        dump.document.channel_title.as_deref().unwrap_or("<unknown>")
    );
    println!("Channel id: {}", dump.channel_id);
    println!(
        "Videos: {} saved of {} declared ({} pages)",
        dump.document.videos.len(),
        dump.document.videos_number,
        dump.pages
    );
    println!("Output: {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(values: &[&str]) -> FetchArgs {
        FetchArgs::try_parse_from(std::iter::once("fetch_channel").chain(values.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_apply() {
        let args = parse(&["--url", "https://www.youtube.com/@chan"]);
        assert_eq!(args.out, DEFAULT_OUTPUT_NAME);
        assert_eq!(args.maxr, 50);
        assert_eq!(args.env_file, PathBuf::from(DEFAULT_ENV_PATH));
        assert!(args.key.is_none());
        assert!(args.max_retries.is_none());
    }

    #[test]
    fn negative_page_size_parses_and_is_replaced() {
        let args = parse(&["--url", "UC1", "--maxr", "-5"]);
        assert_eq!(args.maxr, -5);
        assert_eq!(clamp_page_size(args.maxr), (DEFAULT_PAGE_SIZE, true));
    }

    #[test]
    fn explicit_values_are_kept() {
        let args = parse(&[
            "--url",
            "UC1",
            "--key",
            "abc",
            "--out",
            "dump",
            "--maxr",
            "25",
            "--retry-delay",
            "5",
            "--max-retries",
            "3",
        ]);
        assert_eq!(args.key.as_deref(), Some("abc"));
        assert_eq!(args.out, "dump");
        assert_eq!(clamp_page_size(args.maxr), (25, false));
        assert_eq!(args.retry_delay, Some(5));
        assert_eq!(args.max_retries, Some(3));
    }

    #[test]
    fn url_is_required() {
        assert!(FetchArgs::try_parse_from(["fetch_channel"]).is_err());
    }
}
