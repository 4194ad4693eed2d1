use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use cspcrawl_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl};
use cspcrawl_core::report::generate_summary;
use cspcrawl_core::{FixedNonce, GeneratedPolicy, NonceSource, PolicyFormat, RandomNonce};
use cspcrawl_scanner::{FollowMode, StopSignal};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn print_banner() {
    eprintln!(
        "{} {}",
        "cspcrawl".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    eprintln!("{}", "Content-Security-Policy generator".bright_black());
    eprintln!();
}

// Helper functions for the generate handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    // Only accept URLs that carry a host; "localhost:8080" parses with a
    // "localhost" scheme otherwise
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.has_host()
    {
        return Some(with_scheme);
    }

    eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
    None
}

/// Output filename for a crawled URL: first hostname label (without `www.`),
/// then the path with `/` turned into `_`, then the format suffix.
///
/// `https://www.example.com/shop/cart` becomes `example_shop_cart_csp.txt`.
pub fn policy_filename(url: &str, format: PolicyFormat) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let hostname = parsed.host_str()?;
    let hostname = hostname.strip_prefix("www.").unwrap_or(hostname);
    let stem = hostname.split('.').next().filter(|s| !s.is_empty())?;

    let path = parsed.path().trim_matches('/').replace('/', "_");
    if path.is_empty() {
        Some(format!("{}_{}", stem, format.file_suffix()))
    } else {
        Some(format!("{}_{}_{}", stem, path, format.file_suffix()))
    }
}

/// Write a rendered policy into `dir`, creating it if needed.
pub fn write_policy(dir: &Path, filename: &str, contents: &str) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(filename);
    fs::write(&path, contents)
        .with_context(|| format!("Failed to write policy to {}", path.display()))?;
    Ok(path)
}

/// Resolved `generate` arguments.
#[derive(Debug, Clone)]
pub struct GenerateSettings {
    pub follow_mode: FollowMode,
    pub workers: usize,
    pub max_pages: usize,
    pub max_depth: Option<usize>,
    pub fail_on_limit: bool,
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
    pub to_stdout: bool,
    pub format: PolicyFormat,
    pub nonce: Option<FixedNonce>,
}

impl GenerateSettings {
    pub fn from_matches(args: &ArgMatches) -> anyhow::Result<Self> {
        let format_name = args
            .get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("text");
        let format = PolicyFormat::from_str(format_name)
            .ok_or_else(|| anyhow!("Unknown policy format '{}'", format_name))?;

        let output_dir = args
            .get_one::<String>("output-dir")
            .map(String::as_str)
            .unwrap_or("./generated_csps");
        let output_dir = PathBuf::from(shellexpand::tilde(output_dir).as_ref());

        let nonce = args
            .get_one::<String>("nonce")
            .map(|hex| FixedNonce::parse(hex))
            .transpose()?;

        let follow_mode = if args.get_flag("single-page") {
            FollowMode::SinglePage
        } else {
            FollowMode::SameHost
        };

        Ok(Self {
            follow_mode,
            workers: args.get_one::<usize>("threads").copied().unwrap_or(4),
            max_pages: args.get_one::<usize>("max-pages").copied().unwrap_or(500),
            max_depth: args.get_one::<usize>("max-depth").copied(),
            fail_on_limit: args.get_flag("fail-on-limit"),
            timeout_secs: args.get_one::<u64>("timeout").copied().unwrap_or(10),
            output_dir,
            to_stdout: args.get_flag("stdout"),
            format,
            nonce,
        })
    }

    pub fn crawl_options(&self, url: &str, show_progress_bars: bool) -> CrawlOptions {
        CrawlOptions {
            url: url.to_string(),
            follow_mode: self.follow_mode,
            workers: self.workers,
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            fail_on_limit: self.fail_on_limit,
            timeout_secs: self.timeout_secs,
            show_progress_bars,
        }
    }
}

/// Render a generated policy and hand it to the configured sink. Returns the
/// written path, or `None` when printed to stdout.
pub fn emit_policy(
    generated: &GeneratedPolicy,
    settings: &GenerateSettings,
) -> anyhow::Result<Option<PathBuf>> {
    let rendered = generated.render(settings.format)?;

    if settings.to_stdout {
        println!("{}", rendered);
        return Ok(None);
    }

    let filename = policy_filename(&generated.start_url, settings.format)
        .ok_or_else(|| anyhow!("Cannot derive a filename from {}", generated.start_url))?;
    let path = write_policy(&settings.output_dir, &filename, &rendered)?;
    info!("Wrote policy for {} to {}", generated.start_url, path.display());
    Ok(Some(path))
}

pub async fn handle_generate(sub_matches: &ArgMatches, quiet: bool) {
    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");

    // Load URLs from source
    let urls = match load_urls_from_source(url, hosts_file) {
        Ok(urls) => urls,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let settings = match GenerateSettings::from_matches(sub_matches) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let nonce_source: Box<dyn NonceSource> = match settings.nonce.clone() {
        Some(fixed) => Box::new(fixed),
        None => Box::new(RandomNonce),
    };

    // Ctrl-C asks the crawler to wind down; the partial policy is still written
    let stop_signal = StopSignal::new();
    let ctrl_c_signal = stop_signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with the pages crawled so far");
            ctrl_c_signal.stop();
        }
    });

    if !quiet {
        let mode = match settings.follow_mode {
            FollowMode::SinglePage => "single page",
            FollowMode::SameHost => "same host",
        };
        eprintln!("{} Generating policies for {} host(s)", "→".blue(), urls.len());
        eprintln!("  Mode: {}", mode);
        eprintln!("  Workers: {}", settings.workers);
        eprintln!("  Max pages: {}", settings.max_pages);
        if let Some(depth) = settings.max_depth {
            eprintln!("  Max depth: {}", depth);
        }
        eprintln!();
    }

    let progress_callback: CrawlProgressCallback = Arc::new(|msg: String| {
        eprintln!("{}", msg.yellow());
    });

    let mut failures = 0;
    for (idx, url) in urls.iter().enumerate() {
        if stop_signal.is_stopped() {
            eprintln!("{} Skipping {} (interrupted)", "→".yellow(), url);
            failures += 1;
            continue;
        }
        if urls.len() > 1 && !quiet {
            eprintln!("{} Host {}/{}: {}", "→".blue(), idx + 1, urls.len(), url);
        }

        let options = settings.crawl_options(url, !quiet);
        let generated = match execute_crawl(
            options,
            nonce_source.as_ref(),
            stop_signal.clone(),
            Some(progress_callback.clone()),
        )
        .await
        {
            Ok(generated) => generated,
            Err(e) => {
                eprintln!("{} Failed to generate policy for {}: {}", "✗".red().bold(), url, e);
                failures += 1;
                continue;
            }
        };

        match emit_policy(&generated, &settings) {
            Ok(written) => {
                if !quiet {
                    eprint!("{}", generate_summary(&generated));
                    if let Some(path) = written {
                        eprintln!(
                            "\n{} Policy written to {}",
                            "✓".green().bold(),
                            path.display().to_string().bright_white()
                        );
                    }
                    eprintln!();
                }
            }
            Err(e) => {
                eprintln!("{} {:#}", "✗".red().bold(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}
