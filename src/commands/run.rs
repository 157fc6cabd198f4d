use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use crate::actions::{ActionKind, ActionPayloadBuilder, HttpActionClient, ProfileField};
use crate::config::{find_group, load_account_groups, Config};
use crate::models::{Account, AccountStatus, WorkItem};
use crate::runner::{AccountRange, RunConfig, RunSummary, Runner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Follow,
    Unfollow,
    Like,
    Unlike,
    Retweet,
    Unretweet,
    Tweet,
    Comment,
    Vote,
    ChangeProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    Background,
    Birthdate,
    Description,
    Location,
    Name,
    Password,
    ProfilePicture,
    Username,
}

impl From<FieldArg> for ProfileField {
    fn from(field: FieldArg) -> Self {
        match field {
            FieldArg::Background => ProfileField::Background,
            FieldArg::Birthdate => ProfileField::Birthdate,
            FieldArg::Description => ProfileField::Description,
            FieldArg::Location => ProfileField::Location,
            FieldArg::Name => ProfileField::Name,
            FieldArg::Password => ProfileField::Password,
            FieldArg::ProfilePicture => ProfileField::ProfilePicture,
            FieldArg::Username => ProfileField::Username,
        }
    }
}

#[derive(ClapArgs)]
pub struct Args {
    /// Action every account performs
    #[arg(value_enum)]
    pub action: ActionArg,

    /// YAML file with account groups
    #[arg(short, long)]
    pub accounts: PathBuf,

    /// Account group to use (default: first group in the file)
    #[arg(short, long)]
    pub group: Option<String>,

    /// Tweet link or username to act on (repeatable)
    #[arg(short = 'i', long = "item")]
    pub items: Vec<String>,

    /// Tweet content, comment text or new profile value (repeatable)
    #[arg(short = 't', long = "text")]
    pub texts: Vec<String>,

    /// Poll answer for `vote`
    #[arg(long)]
    pub answer: Option<String>,

    /// Profile field for `change-profile`
    #[arg(short, long, value_enum)]
    pub field: Option<FieldArg>,

    /// Accounts processed at the same time (overrides config)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Account index range, e.g. 0-9 (END 0 means the last account)
    #[arg(short, long)]
    pub range: Option<AccountRange>,

    /// Pick texts at random instead of in order
    #[arg(long)]
    pub random: bool,

    /// Extra attempts for retryable failures (overrides config)
    #[arg(long)]
    pub retries: Option<u32>,

    /// Action server base URL (overrides config)
    #[arg(long)]
    pub server: Option<String>,

    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Args {
    fn kind(&self) -> Result<ActionKind> {
        let kind = match self.action {
            ActionArg::Follow => ActionKind::Follow,
            ActionArg::Unfollow => ActionKind::Unfollow,
            ActionArg::Like => ActionKind::Like,
            ActionArg::Unlike => ActionKind::Unlike,
            ActionArg::Retweet => ActionKind::Retweet,
            ActionArg::Unretweet => ActionKind::Unretweet,
            ActionArg::Tweet => ActionKind::Tweet,
            ActionArg::Comment => ActionKind::Comment,
            ActionArg::Vote => ActionKind::Vote,
            ActionArg::ChangeProfile => match self.field {
                Some(field) => ActionKind::ChangeProfile(field.into()),
                None => bail!("change-profile requires --field"),
            },
        };
        Ok(kind)
    }
}

/// Builds the run's work items from the command line inputs.
fn build_items(args: &Args, kind: ActionKind) -> Result<Vec<WorkItem>> {
    let items = match kind {
        ActionKind::Follow
        | ActionKind::Unfollow
        | ActionKind::Like
        | ActionKind::Unlike
        | ActionKind::Retweet
        | ActionKind::Unretweet => args.items.iter().map(WorkItem::target).collect(),
        ActionKind::Tweet | ActionKind::ChangeProfile(_) => {
            args.texts.iter().map(WorkItem::text).collect()
        }
        ActionKind::Comment => {
            if args.texts.is_empty() {
                bail!("comment requires at least one --text");
            }
            args.items
                .iter()
                .map(|link| WorkItem::pool(link.clone(), args.texts.iter().cloned()))
                .collect()
        }
        ActionKind::Vote => {
            let Some(answer) = args.answer.as_deref() else {
                bail!("vote requires --answer");
            };
            args.items
                .iter()
                .map(|link| WorkItem::reply(link.clone(), answer))
                .collect()
        }
    };
    Ok(items)
}

pub async fn execute(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.clone())?;
    if let Some(server) = &args.server {
        config = config.with_server_url(server.clone());
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    if args.random {
        config = config.with_take_data_random(true);
    }

    let kind = args.kind()?;
    let items = build_items(&args, kind)?;

    let groups = load_account_groups(&args.accounts)?;
    let group = find_group(groups, args.group.as_deref())?;

    let mut run_config = RunConfig::from_settings(&config.run)
        .with_range(args.range.unwrap_or_default());
    if let Some(retries) = args.retries {
        run_config = run_config.with_max_retries(retries);
    }

    let client = HttpActionClient::new(&config.server_url, config.timeouts.request())?;
    let runner = Runner::new(Arc::new(client));

    println!(
        "Running {} on group '{}' ({} accounts) against {}",
        kind.name(),
        group.accounts_name,
        group.accounts.len(),
        config.server_url
    );

    runner.select_group(group)?;
    let handle = runner.start(Arc::new(kind), items, run_config)?;
    let mut progress = runner.subscribe();
    let mut stopping = false;

    let wait = handle.wait();
    tokio::pin!(wait);
    let summary = loop {
        tokio::select! {
            result = &mut wait => break result?,
            changed = progress.changed() => {
                if changed.is_ok() {
                    let snapshot = *progress.borrow_and_update();
                    println!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), snapshot);
                }
            }
            signal = tokio::signal::ctrl_c(), if !stopping => {
                signal.context("Failed to listen for Ctrl-C")?;
                println!("Stopping, waiting for in-flight requests...");
                runner.stop();
                stopping = true;
            }
        }
    };

    print_accounts(&runner.snapshot());
    print_summary(&summary);
    Ok(())
}

fn print_accounts(accounts: &[Account]) {
    println!();
    for account in accounts
        .iter()
        .filter(|a| a.status != AccountStatus::Idle)
    {
        let name = if account.label().is_empty() {
            "-"
        } else {
            account.label()
        };
        println!(
            "  {} #{:<4} {:<20} {:<10} {}",
            account.status.symbol(),
            account.index,
            name,
            account.status.as_str(),
            account.logs.join("; ")
        );
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Processed {}/{} accounts in {}s: {} succeeded, {} failed{}",
        summary.processed,
        summary.total,
        summary.duration().num_seconds(),
        summary.success,
        summary.failed,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
}
