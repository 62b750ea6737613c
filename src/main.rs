use clap::{Parser, Subcommand};
use folio::categories::{CategoryError, CategoryIndex};
use folio::config::{self, SiteConfig};
use folio::content::{ContentRepository, sorted_listing};
use folio::output::{self, CheckSummary};
use folio::server::{self, AppState};
use folio::sitemap::{STATIC_ROUTES, read_build_date, render_sitemap};
use folio::storage::LocalStorage;
use folio::thumbnail::list_derivatives;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Personal website server for markdown project listings")]
#[command(long_about = "\
Personal website server for markdown project listings

A directory of markdown files is the whole database. Each file carries YAML
front-matter and becomes one article; future-dated files stay hidden until
their date.

Content structure:

  projects/
  ├── categories.json      # {\"rust\": {\"title\": \"Rust\", \"long_description\": \"...\"}}
  ├── hello.md             # ---\\nid: hello\\ntitle: Hello\\ndate: 2024-01-05\\n---
  ├── talk.md              # `link: https://...` redirects instead of rendering
  └── images/
      ├── photo.jpg        # served at /projects/image/photo.jpg?w=640
      └── 640-0-photo.jpg  # derived on first request, kept forever

Run 'folio gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Content directory (overrides content_root from config.toml)
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the site over HTTP
    Serve {
        /// Listen address (overrides [server] bind)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Parse every document and report problems without serving
    Check,
    /// Print sitemap.xml to stdout
    Sitemap {
        /// Absolute site URL, e.g. https://example.com (overrides [site] base_url)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            let (site_config, content_root) = load(&cli)?;
            let addr = match bind {
                Some(addr) => addr,
                None => site_config.server.bind.parse()?,
            };
            log::info!("serving {}", content_root.display());
            let state = AppState::new(
                Arc::new(LocalStorage::new(&content_root)),
                Arc::new(folio::imaging::RustBackend::new()),
                &site_config,
                site_config.build_info_path(&cli.config_dir),
            );
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::run(state, addr))?;
        }
        Command::Check => {
            let (_, content_root) = load(&cli)?;
            println!("==> Checking {}", content_root.display());
            if !check(&content_root)? {
                return Err("content has errors".into());
            }
            println!("==> Content is valid");
        }
        Command::Sitemap { ref base_url } => {
            let (site_config, content_root) = load(&cli)?;
            let base_url = base_url.clone().unwrap_or_else(|| site_config.site.base_url.clone());
            if base_url.is_empty() {
                return Err("no base URL: pass --base-url or set [site] base_url".into());
            }
            print!("{}", sitemap(&site_config, &cli.config_dir, &content_root, &base_url)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `config.toml` and resolve the content root, `--content` winning.
fn load(cli: &Cli) -> Result<(SiteConfig, PathBuf), config::ConfigError> {
    let site_config = config::load_config(&cli.config_dir)?;
    let content_root = cli
        .content
        .clone()
        .unwrap_or_else(|| site_config.content_path(&cli.config_dir));
    Ok((site_config, content_root))
}

/// Print the content report; `false` when anything would fail to serve.
fn check(content_root: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let storage = Arc::new(LocalStorage::new(content_root));
    let report = ContentRepository::new(storage.clone()).load_report()?;
    let categories = match CategoryIndex::load(storage.as_ref()) {
        Ok(categories) => Some(categories),
        Err(CategoryError::ConfigurationMissing) => None,
        Err(e) => return Err(e.into()),
    };
    let derivatives = list_derivatives(storage.as_ref())?;

    let summary = CheckSummary {
        report: &report,
        categories: categories.as_ref(),
        derivatives: &derivatives,
    };
    output::print_check_output(&summary);
    Ok(summary.is_clean())
}

fn sitemap(
    site_config: &SiteConfig,
    config_dir: &Path,
    content_root: &Path,
    base_url: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let repo = ContentRepository::new(Arc::new(LocalStorage::new(content_root)));
    let documents = sorted_listing(repo.list_live()?);
    let build_date = read_build_date(&site_config.build_info_path(config_dir));
    Ok(render_sitemap(base_url, STATIC_ROUTES, &documents, &build_date))
}
