//! Build task: zip the extension source tree into a distributable archive.

use anyhow::Context;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ux_recorder::packager::Packager;

fn run() -> anyhow::Result<PathBuf> {
    let packager = Packager::new("extension", "build");
    packager.pack().context("Creating package file error")
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ux_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(path) => tracing::info!("Extension is packed in: {:?}", path),
        Err(err) => {
            tracing::error!("{:#}", err);
            std::process::exit(1);
        }
    }
}
