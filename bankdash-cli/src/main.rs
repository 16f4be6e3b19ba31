use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use bankdash_api::{ApiError, BankClient, UnauthorizedGuard};
use bankdash_core::{
    format_balance, paginate, recent_activity_n, validate_transfer, SessionHandle, SortDirection,
    SortField, TableView, TypeFilter,
};

mod auth;
mod config;
mod dashboard;
mod render;
mod state;
mod worker;

#[derive(Parser, Debug)]
#[command(
    name = "bankdash",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BANKDASH_BUILD_SHA"), ")"),
    about = "Terminal client for the banking dashboard API"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session under ~/.bankdash
    Login {
        #[arg(long)]
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create a new account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Print the current balance
    Balance,

    /// Print the account profile
    Profile,

    /// Deposit money into the account
    Deposit {
        #[arg(long)]
        amount: String,
        /// Use the older /user/deposit endpoint
        #[arg(long)]
        legacy: bool,
    },

    /// Withdraw money from the account
    Withdraw {
        #[arg(long)]
        amount: String,
    },

    /// Send money to another account
    Transfer {
        /// Recipient account number
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Latest transactions, newest first
    Recent,

    /// Full transaction history as a table
    History {
        /// all, TRANSFER_SENT, TRANSFER_RECEIVED, DEPOSIT or WITHDRAWAL
        #[arg(long = "type", default_value = "all")]
        filter: TypeFilter,

        /// date, amount or type
        #[arg(long, default_value = "date")]
        sort: SortField,

        /// Sort descending (the default for date)
        #[arg(long)]
        desc: bool,

        /// Sort ascending (the default for amount and type)
        #[arg(long, conflicts_with = "desc")]
        asc: bool,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        per_page: Option<usize>,
    },

    /// Show one transaction
    Show { id: String },

    /// Interactive dashboard (TTY required)
    Dashboard,

    /// Manage ~/.bankdash/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

fn init_tracing(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bankdash=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if to_file {
        // Keep the alternate screen clean.
        let path = state::log_path()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Command::Dashboard))?;

    if let Command::Config { command } = &cli.command {
        return match command {
            ConfigCommand::Init => config::init_config(),
            ConfigCommand::Show => config::show_config(),
        };
    }

    let cfg = config::load_config()?;
    let session = SessionHandle::new(auth::load_session()?);
    let client = BankClient::new(cfg.api.base_url.clone(), session.clone());
    let guard = UnauthorizedGuard::new(session.clone(), auth::on_session_expired);

    match cli.command {
        Command::Login { username, password } => {
            auth::login(&client, &session, username, password).await?;
        }

        Command::Register {
            username,
            email,
            full_name,
            password,
        } => {
            auth::register(&client, username, email, full_name, password).await?;
        }

        Command::Logout => auth::logout(&session)?,

        Command::Balance => {
            auth::require_login(&session)?;
            let balance = guard.check(client.get_balance().await).map_err(|e| fail(e, "Failed to load balance"))?;
            println!("Current Balance: {}", format_balance(Some(balance)));
            if let Some(user) = session.user() {
                println!("Account: {}", user.username);
            }
        }

        Command::Profile => {
            auth::require_login(&session)?;
            let profile = guard.check(client.get_profile().await).map_err(|e| fail(e, "Failed to load profile"))?;
            print!("{}", render::profile(&profile));
        }

        Command::Deposit { amount, legacy } => {
            auth::require_login(&session)?;
            let amount = bankdash_core::transfer::parse_positive_amount(&amount)?;
            if legacy {
                let new_balance = guard
                    .check(client.user_deposit(amount).await)
                    .map_err(|e| fail(e, "Deposit failed. Please try again."))?;
                println!("Deposit completed successfully!");
                if let Some(b) = new_balance {
                    println!("New balance: {}", format_balance(Some(b)));
                }
            } else {
                guard
                    .check(client.deposit(amount).await)
                    .map_err(|e| fail(e, "Deposit failed. Please try again."))?;
                println!("Deposit completed successfully!");
            }
        }

        Command::Withdraw { amount } => {
            auth::require_login(&session)?;
            let amount = bankdash_core::transfer::parse_positive_amount(&amount)?;
            guard
                .check(client.withdraw(amount).await)
                .map_err(|e| fail(e, "Withdrawal failed. Please try again."))?;
            println!("Withdrawal completed successfully!");
        }

        Command::Transfer {
            to,
            amount,
            description,
        } => {
            auth::require_login(&session)?;
            let req = validate_transfer(&to, &amount, &description)?;
            let created = guard
                .check(client.transfer(&req).await)
                .map_err(|e| fail(e, "Transfer failed. Please try again."))?;
            println!("Transfer completed successfully!");
            if let Some(tx) = created {
                print!("{}", render::transaction_detail(&tx));
            }
        }

        Command::Recent => {
            auth::require_login(&session)?;
            let all = guard
                .check(client.get_history().await)
                .map_err(|e| fail(e, bankdash_core::activity::LOAD_FAILED))?;
            let recent = recent_activity_n(&all, cfg.dashboard.recent_limit);
            print!("{}", render::recent_feed(&recent, chrono::Local::now().naive_local()));
        }

        Command::History {
            filter,
            sort,
            desc,
            asc,
            page,
            per_page,
        } => {
            auth::require_login(&session)?;
            if page == 0 {
                bail!("--page starts at 1");
            }
            let all = guard
                .check(client.get_all().await)
                .map_err(|e| fail(e, bankdash_core::activity::LOAD_FAILED))?;

            let direction = if desc || (sort == SortField::Date && !asc) {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            let view = TableView::new(sort, direction, filter);
            let rows = view.rows(&all);
            let per_page = per_page.unwrap_or(cfg.history.per_page);
            print!("{}", render::table(&paginate(&rows, page - 1, per_page), &view));
        }

        Command::Show { id } => {
            auth::require_login(&session)?;
            let tx = guard
                .check(client.get_by_id(&id).await)
                .map_err(|e| fail(e, "Failed to load transaction"))?;
            print!("{}", render::transaction_detail(&tx));
        }

        Command::Dashboard => {
            auth::require_login(&session)?;
            dashboard::run_dashboard(cfg, session).await?;
        }

        Command::Config { .. } => {}
    }

    Ok(())
}

/// Server wording when it sent any, else the command's fallback.
fn fail(e: ApiError, fallback: &str) -> anyhow::Error {
    match e {
        // The guard has already told the user to log in again.
        ApiError::Unauthorized => anyhow::anyhow!("Unauthorized"),
        other => anyhow::anyhow!(other.user_message(fallback)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_version_carries_build_stamp() {
        let version = Cli::command().render_version();
        assert!(version.contains(env!("CARGO_PKG_VERSION")));
        let stamp = env!("BANKDASH_BUILD_SHA");
        assert!(!stamp.is_empty());
        assert!(version.contains(&format!("({stamp})")));
    }

    #[test]
    fn test_history_asc_and_desc_conflict() {
        assert!(Cli::try_parse_from(["bankdash", "history", "--asc", "--desc"]).is_err());
        let cli = Cli::try_parse_from(["bankdash", "history", "--page", "3"]).unwrap();
        assert!(matches!(cli.command, Command::History { page: 3, .. }));
    }
}
