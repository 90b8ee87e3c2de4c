use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::filter::StatusFilter;
use crate::icon::IconKey;
use crate::profile::ThemePreference;
use crate::task::RecurrencePattern;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tempo",
    version,
    about = "Tempo: personal task tracking with time analytics",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "temporc", global = true)]
    pub temporc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List tasks, optionally narrowed by category and status.
    Tasks(ListArgs),
    /// Create a task.
    Add(AddArgs),
    /// Change fields of an existing task.
    Edit(EditArgs),
    /// Mark tasks completed.
    Done { ids: Vec<String> },
    /// Mark tasks active again.
    Undone { ids: Vec<String> },
    /// Flip a task between active and completed.
    Toggle { id: String },
    /// Remove a task.
    Delete { id: String },
    /// List categories.
    Categories,
    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Show the analytics dashboard.
    Dashboard,
    /// Print the completion history used for schedule suggestions.
    History {
        #[arg(long, default_value_t = crate::schedule::HISTORY_LIMIT)]
        limit: usize,
    },
    /// Ask for a smart schedule suggestion for a kind of task.
    Schedule(ScheduleArgs),
    /// Print the readable foreground for a background colour.
    Contrast { color: String },
    /// List available category icons.
    Icons,
    /// Show or update the user profile.
    Profile(ProfileArgs),
}

impl Command {
    /// Commands usable as `default.command`.
    pub fn from_default_name(name: &str) -> anyhow::Result<Self> {
        match name.trim() {
            "tasks" | "list" => Ok(Self::Tasks(ListArgs::default())),
            "dashboard" => Ok(Self::Dashboard),
            "categories" => Ok(Self::Categories),
            "history" => Ok(Self::History {
                limit: crate::schedule::HISTORY_LIMIT,
            }),
            other => Err(anyhow!("unsupported default.command: {other}")),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Category name or id prefix.
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long, short = 's')]
    pub status: Option<StatusFilter>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Category name or id prefix; defaults to the protected category.
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Estimated minutes.
    #[arg(long)]
    pub estimate: Option<u32>,

    /// Actual minutes spent.
    #[arg(long)]
    pub actual: Option<u32>,

    #[arg(long)]
    pub due: Option<String>,

    #[arg(long)]
    pub reminder: Option<String>,

    #[arg(long)]
    pub recur: Option<RecurrencePattern>,

    #[arg(long)]
    pub done: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub clear_description: bool,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long, conflicts_with = "clear_estimate")]
    pub estimate: Option<u32>,

    #[arg(long)]
    pub clear_estimate: bool,

    #[arg(long, conflicts_with = "clear_actual")]
    pub actual: Option<u32>,

    #[arg(long)]
    pub clear_actual: bool,

    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,

    #[arg(long)]
    pub clear_due: bool,

    #[arg(long, conflicts_with = "clear_reminder")]
    pub reminder: Option<String>,

    #[arg(long)]
    pub clear_reminder: bool,

    #[arg(long, conflicts_with = "no_recur")]
    pub recur: Option<RecurrencePattern>,

    #[arg(long)]
    pub no_recur: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    Add {
        name: String,

        /// `#RRGGBB`; a palette swatch is picked when omitted.
        #[arg(long)]
        color: Option<String>,

        #[arg(long, value_parser = parse_icon)]
        icon: Option<IconKey>,
    },
    Edit {
        selector: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long, value_parser = parse_icon)]
        icon: Option<IconKey>,
    },
    Delete {
        selector: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    /// The kind of task to schedule, e.g. "workout".
    #[arg(long = "type", short = 't')]
    pub task_type: String,

    /// Read the suggestion from a JSON response file instead of printing the request.
    #[arg(long)]
    pub response: Option<PathBuf>,

    #[arg(long, default_value_t = crate::schedule::HISTORY_LIMIT)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub avatar: Option<String>,

    #[arg(long)]
    pub theme: Option<ThemePreference>,
}

fn parse_icon(s: &str) -> Result<IconKey, String> {
    s.parse::<IconKey>().map_err(|err| err.to_string())
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` (or `rc.key:value`) overrides out of argv.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest
                .split_once('=')
                .or_else(|| rest.split_once(':'))
                .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{CategoryCommand, Command, GlobalCli, preprocess_args};
    use crate::filter::StatusFilter;
    use crate::icon::IconKey;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn extracts_positional_rc_overrides() {
        let pre = preprocess_args(&args(&["tempo", "rc.color=off", "tasks", "rc.user:bob"]))
            .expect("preprocess");
        assert_eq!(pre.cleaned_args, args(&["tempo", "tasks"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.user".to_string(), "bob".to_string()),
            ]
        );
    }

    #[test]
    fn parses_list_filters() {
        let cli = GlobalCli::parse_from(["tempo", "tasks", "--status", "done", "-c", "Work"]);
        let Some(Command::Tasks(list)) = cli.command else {
            panic!("expected tasks command");
        };
        assert_eq!(list.status, Some(StatusFilter::Completed));
        assert_eq!(list.category.as_deref(), Some("Work"));
    }

    #[test]
    fn parses_category_icon_names() {
        let cli = GlobalCli::parse_from([
            "tempo", "category", "add", "Health", "--color", "#00ff00", "--icon", "heart",
        ]);
        let Some(Command::Category(CategoryCommand::Add { icon, .. })) = cli.command else {
            panic!("expected category add");
        };
        assert_eq!(icon, Some(IconKey::Heart));
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = GlobalCli::parse_from(["tempo", "dashboard", "-vv", "--rc", "user=x"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides.len(), 1);
    }

    #[test]
    fn default_command_names() {
        assert!(matches!(
            Command::from_default_name("dashboard").expect("known"),
            Command::Dashboard
        ));
        assert!(Command::from_default_name("explode").is_err());
    }
}
