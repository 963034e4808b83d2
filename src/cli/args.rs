use crate::request::FetchMode;
use clap::Parser;

/// Command-line arguments for subpull
#[derive(Parser, Debug, Clone)]
#[command(name = "subpull")]
#[command(about = "Download a single folder of a GitHub repository")]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Account or organization owning the repository
    #[arg(long, value_name = "OWNER")]
    pub owner: String,

    /// Repository name
    #[arg(long, value_name = "REPO")]
    pub repo: String,

    /// Folder inside the repository, relative to its root
    #[arg(long, value_name = "PATH")]
    pub folder: String,

    /// Branch or other ref to read from [default: main]
    #[arg(long, value_name = "REF")]
    pub branch: Option<String>,

    /// Fetch strategy [default: api]
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<FetchMode>,

    /// Personal access token, only used in API mode
    #[arg(long, env = "GITHUB_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory the folder is materialised under [default: download directory]
    #[arg(long, value_name = "DIR")]
    pub dest: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Base URL of the GitHub REST API
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Prefix the clone URL is built from in sparse mode
    #[arg(long, value_name = "URL")]
    pub git_base_url: Option<String>,

    /// Upper bound on concurrent listing calls and downloads
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_concurrency: Option<u64>,

    /// Deadline in seconds for each network call and git command
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Stop the sparse checkout at the first failed git step
    #[arg(long)]
    pub strict: bool,

    /// Print progress events as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Configuration file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "./subpull.yaml";

impl Args {
    /// Whether `--config` points somewhere other than the default file
    #[must_use]
    pub fn has_explicit_config(&self) -> bool {
        self.config != DEFAULT_CONFIG_FILE
    }
}
