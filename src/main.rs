//! Together - Markdown documents with a live HTML preview.
//!
//! # Usage
//!
//! ```bash
//! together README.md > README.html
//! together --output README.html README.md
//! together --watch README.md
//! together --json notes.md
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use together::app::{App, DEFAULT_DEBOUNCE};
use together::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use together::perf;

/// Render markdown to HTML, once or live
#[derive(Parser, Debug)]
#[command(name = "together", version, about, long_about = None)]
struct Cli {
    /// Markdown file to render
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Write HTML to this file instead of stdout (with --watch: defaults to FILE.html)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Keep running and re-render whenever FILE changes
    #[arg(short, long)]
    watch: bool,

    /// Print the render result (html, ok, error_message) as JSON
    #[arg(long)]
    json: bool,

    /// Title of the HTML document (defaults to the file name)
    #[arg(long)]
    title: Option<String>,

    /// Deepest container or bracket nesting rendered before falling back
    #[arg(long, value_name = "N")]
    max_nesting: Option<usize>,

    /// Quiet period after the last change before re-rendering
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Enable timing logs
    #[arg(long)]
    perf: bool,

    /// Write detailed render/preview debug events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("TOGETHER_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        let path = render_debug_log_path
            .as_ref()
            .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string());
        tracing::warn!(%path, error = %err, "failed to initialize render debug log");
    }

    if !cli.file.exists() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }

    let debounce = effective
        .debounce_ms
        .map_or(DEFAULT_DEBOUNCE, Duration::from_millis);

    App::new(cli.file)
        .with_output(cli.output)
        .with_watch(effective.watch)
        .with_json(effective.json)
        .with_title(effective.title)
        .with_max_nesting(effective.max_nesting)
        .with_debounce(debounce)
        .run()
}
