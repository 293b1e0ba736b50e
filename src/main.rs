use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use hero_slider::config::Configuration;
use hero_slider::loader::{ImageSource, UrlImageSource};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Size limit used by `--check`, where no GPU is queried.
const PREFLIGHT_MAX_DIMENSION: u32 = 8192;

#[derive(Debug, Parser)]
#[command(
    name = "hero-slider",
    about = "Full-window image slider with displacement-map transitions"
)]
struct Args {
    /// Path to YAML config file
    #[arg(value_name = "CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Start with autoplay disabled
    #[arg(long)]
    no_autoplay: bool,

    /// Open the window borderless fullscreen
    #[arg(long)]
    fullscreen: bool,

    /// Load every image and displacement map, report, and exit
    #[arg(long)]
    check: bool,
}

/// Filter used when `RUST_LOG` is unset.
fn default_filter(verbosity: u8) -> String {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    format!("info,hero_slider={level},wgpu=warn,winit=warn")
}

fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    fmt().with_env_filter(filter).with_target(true).init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut cfg = Configuration::from_yaml_file(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?
        .validated()
        .context("invalid configuration")?;
    if args.no_autoplay {
        cfg.autoplay = false;
    }
    if args.fullscreen {
        cfg.window.fullscreen = true;
    }

    if args.check {
        return preflight(&cfg).await;
    }

    info!(
        slides = cfg.slides.len(),
        autoplay = cfg.autoplay,
        "starting hero slider"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received; shutting down");
                cancel.cancel();
            }
        });
    }

    hero_slider::viewer::run_windowed(cfg, cancel).context("viewer failed")?;
    Ok(ExitCode::SUCCESS)
}

/// Every URL the slideshow would load, deduplicated, in load order.
fn preflight_urls(cfg: &Configuration) -> Vec<String> {
    let mut urls: Vec<String> = cfg.slides.iter().map(|s| s.image_url.clone()).collect();
    urls.push(cfg.default_displacement_map.clone());
    urls.extend(
        cfg.slides
            .iter()
            .filter_map(|s| s.effect.as_ref()?.displacement_map.clone()),
    );
    let mut seen = std::collections::HashSet::new();
    urls.retain(|url| seen.insert(url.clone()));
    urls
}

async fn preflight(cfg: &Configuration) -> Result<ExitCode> {
    let asset_root = cfg
        .asset_root
        .clone()
        .unwrap_or_else(|| Path::new(".").to_path_buf());
    let max_dimension = cfg
        .max_texture_dimension
        .unwrap_or(PREFLIGHT_MAX_DIMENSION);
    let source = UrlImageSource::new(asset_root, max_dimension);

    let mut failures = 0usize;
    for url in preflight_urls(cfg) {
        match source.load(&url).await {
            Ok(image) => println!("ok    {url} ({}x{})", image.width, image.height),
            Err(err) => {
                failures += 1;
                println!("FAIL  {url}: {err}");
            }
        }
    }

    if failures > 0 {
        println!("{failures} asset(s) failed to load");
        Ok(ExitCode::FAILURE)
    } else {
        println!("all assets loaded");
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_only_the_slider_level() {
        assert_eq!(
            default_filter(0),
            "info,hero_slider=INFO,wgpu=warn,winit=warn"
        );
        assert!(default_filter(1).contains("hero_slider=DEBUG"));
        assert!(default_filter(5).contains("hero_slider=TRACE"));
        for verbosity in 0..3 {
            assert!(EnvFilter::try_new(default_filter(verbosity)).is_ok());
        }
    }
}
