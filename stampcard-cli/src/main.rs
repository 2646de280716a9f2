use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use stampcard_core::{HabitDraft, ReferenceDate, build_request, extract_habit_details_on};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod llm;
mod state;

use llm::LlmClient;

#[derive(Parser, Debug)]
#[command(
    name = "stampcard",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("STAMPCARD_BUILD_SHA"), ")"),
    about = "Turn a habit sentence into a stamp card"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Work out stamps and days from a habit condition
    Extract {
        /// e.g. "read 5 books in the next 2 months"
        #[arg(required = true, num_args = 1..)]
        condition: Vec<String>,

        /// Reference date (YYYY-MM-DD); defaults to today in the configured timezone
        #[arg(long)]
        today: Option<NaiveDate>,

        /// IANA timezone overriding [extract].timezone
        #[arg(long)]
        timezone: Option<String>,

        /// Print the {numStamps, timePeriodDays} contract as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the request that would be sent, without calling the service
    Prompt {
        #[arg(required = true, num_args = 1..)]
        condition: Vec<String>,

        #[arg(long)]
        today: Option<NaiveDate>,

        #[arg(long)]
        timezone: Option<String>,

        #[arg(long)]
        json: bool,
    },

    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config.toml if none exists
    Init,
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Store an OpenAI API key
    PasteOpenaiApiKey,
    /// Store an Anthropic API key
    PasteAnthropicKey,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Extract {
            condition,
            today,
            timezone,
            json,
        } => {
            let cfg = config::load_config()?;
            let today = reference_date(today, timezone.as_deref(), &cfg)?;
            let condition = condition.join(" ");

            let auth = auth::load_auth()?;
            let client = LlmClient::from_config(&cfg.llm, &auth)?;
            let result = extract_habit_details_on(&client, &condition, today)
                .await
                .context("could not extract habit details")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }

            let mut draft = HabitDraft::new(today.date()).with_condition(condition);
            draft.apply_extraction(&result);

            println!("Stamps: {}", result.num_stamps);
            println!("Days:   {}", result.time_period_days);
            if let Some(end) = draft.end_date {
                println!("Ends:   {}", end.format("%Y-%m-%d"));
            }
            println!("Card:   {} stamps over {}", draft.num_stamps, draft.subtitle());
            if result.needs_manual_entry() {
                println!("\nSome values could not be worked out; enter them by hand.");
            }
        }

        Command::Prompt {
            condition,
            today,
            timezone,
            json,
        } => {
            let cfg = config::load_config()?;
            let today = reference_date(today, timezone.as_deref(), &cfg)?;
            let request = build_request(&condition.join(" "), today);

            if json {
                println!("{}", serde_json::to_string_pretty(&request)?);
            } else {
                println!("# Instruction\n\n{}\n", request.instruction);
                println!("# User\n\n{}\n", request.user_message());
                println!("# Output schema\n\n{}", serde_json::to_string_pretty(&request.schema)?);
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("# {}", config::config_path()?.display());
                println!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteOpenaiApiKey => auth::openai_paste_api_key()?,
            AuthCommand::PasteAnthropicKey => auth::anthropic_paste_key()?,
        },
    }

    Ok(())
}

/// An explicit `--today` wins; otherwise today is read once in the chosen zone.
fn reference_date(
    today: Option<NaiveDate>,
    timezone: Option<&str>,
    cfg: &config::Config,
) -> Result<ReferenceDate> {
    if let Some(d) = today {
        return Ok(ReferenceDate::from_date(d));
    }
    let tz = match timezone {
        Some(name) => config::parse_timezone(name)?,
        None => cfg.extract.tz()?,
    };
    Ok(ReferenceDate::today_in(tz))
}
