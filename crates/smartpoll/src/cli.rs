//! Clap derive structures for the `smartpoll` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// smartpoll -- watch and control SmartThings devices
#[derive(Debug, Parser)]
#[command(
    name = "smartpoll",
    version,
    about = "Poll and control SmartThings devices from the command line",
    long_about = "Keeps a live, polled view of SmartThings device state.\n\n\
        Subscribed devices are refreshed on a jittered schedule with\n\
        exponential backoff, and commands are reflected immediately.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "SMARTPOLL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Personal access token (overrides profile credentials)
    #[arg(long, env = "SMARTPOLL_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SMARTPOLL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SMARTPOLL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Poll interval in milliseconds, clamped to 1000..=60000
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List devices and read their state
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Subscribe to devices and print state changes until Ctrl-C
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Switch a device on or off
    Power(PowerArgs),

    /// Mute or unmute a device
    Mute(MuteArgs),

    /// Select a media input source
    Input(InputArgs),

    /// Step the volume up or down
    Volume(VolumeArgs),

    /// OAuth authorization helpers
    Auth(AuthArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List all devices on the account
    #[command(alias = "ls")]
    List,

    /// Fetch fresh state for a device
    Status {
        /// Device id or display name
        device: String,
    },
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Device ids or display names
    #[arg(required = true)]
    pub devices: Vec<String>,

    /// Exit after this many state updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── Device control ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Switch {
    On,
    Off,
    Toggle,
}

#[derive(Debug, Args)]
pub struct PowerArgs {
    /// Device id or display name
    pub device: String,
    pub state: Switch,
}

#[derive(Debug, Args)]
pub struct MuteArgs {
    /// Device id or display name
    pub device: String,
    pub state: Switch,
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Device id or display name
    pub device: String,
    /// Input source id or name (e.g. HDMI1)
    pub source: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VolumeStep {
    Up,
    Down,
}

#[derive(Debug, Args)]
pub struct VolumeArgs {
    /// Device id or display name
    pub device: String,
    pub direction: VolumeStep,
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Print the URL to open for granting access
    Url {
        /// Opaque value echoed back to the redirect page
        #[arg(long, default_value = "smartpoll")]
        state: String,
    },

    /// Exchange an authorization code for tokens and save them
    Exchange {
        /// Code shown on the redirect page
        code: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the current configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,

    /// Store the profile's OAuth client secret in the system keyring
    SetSecret {
        secret: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
