//! `dsci-cli`: run the DSCI auth flows against a live API from a terminal.
//!
//! The session token is kept in a JSON state file (see `state_file`), so
//! `login`, `me` and `logout` can run as separate invocations.

mod state_file;
mod terminal;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dsci_auth::api::http::HttpAuthApi;
use dsci_auth::consent::{ConsentChoices, ConsentOption};
use dsci_auth::flow::{
    DashboardController, DashboardOutcome, FlowContext, LoginController, RegisterController, SubmitOutcome,
    ViewLifetime,
};
use dsci_auth::navigation::TokioTimer;
use dsci_auth::{AuthClient, AuthConfig, AuthError, CurrentUserSlot, SessionStore};
use tracing_subscriber::EnvFilter;

use crate::state_file::FileStorage;
use crate::terminal::{TerminalDashboardView, TerminalFormView, TerminalNavigator};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("missing password; pass --password or set DSCI_PASSWORD")]
    MissingPassword,
    #[error("{command} did not complete: {reason}")]
    Incomplete { command: &'static str, reason: &'static str },
}

#[derive(Parser, Debug)]
#[command(name = "dsci-cli", about = "DSCI account and consent CLI")]
struct Cli {
    /// Auth API base URL.
    #[arg(long, env = "DSCI_API_BASE_URL")]
    base_url: Option<String>,

    /// Where the session token is kept between invocations.
    #[arg(long, env = "DSCI_STATE_FILE", default_value = ".dsci-session.json")]
    state_file: PathBuf,

    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and record consent.
    Register(RegisterArgs),
    /// Sign in, store the session and record consent.
    Login(LoginArgs),
    /// Print the signed-in user; signs out if the session is no longer valid.
    Me,
    /// Sign out and clear the stored session.
    Logout,
    /// Show whether a session is stored, without contacting the API.
    Status,
}

#[derive(Args, Debug)]
struct ConsentArgs {
    /// Consent options to grant, comma separated.
    #[arg(long, value_enum, value_delimiter = ',')]
    consent: Vec<ConsentArg>,
}

impl ConsentArgs {
    fn choices(&self) -> ConsentChoices {
        ConsentChoices::with(self.consent.iter().copied().map(ConsentOption::from))
    }
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "DSCI_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[command(flatten)]
    consent: ConsentArgs,
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "DSCI_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[command(flatten)]
    consent: ConsentArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ConsentArg {
    DataProcessing,
    Research,
    Marketing,
}

impl From<ConsentArg> for ConsentOption {
    fn from(arg: ConsentArg) -> Self {
        match arg {
            ConsentArg::DataProcessing => Self::DataProcessing,
            ConsentArg::Research => Self::Research,
            ConsentArg::Marketing => Self::Marketing,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(base_url: Option<&str>) -> AuthConfig {
    let config = AuthConfig::from_env();
    match base_url {
        Some(url) => config.with_api_base_url(url),
        None => config,
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.base_url.as_deref());
    let session = SessionStore::new(Arc::new(FileStorage::new(&cli.state_file)));

    if let Command::Status = cli.command {
        print_status(&session);
        return Ok(());
    }

    tracing::debug!(api = %config.api_base_url, state_file = %cli.state_file.display(), "starting");
    let api = Arc::new(HttpAuthApi::new(config.clone())?);
    let auth = AuthClient::new(api.clone(), session, CurrentUserSlot::new());
    let ctx = FlowContext::new(auth, api, Arc::new(TerminalNavigator), Arc::new(TokioTimer), &config);
    let lifetime = ViewLifetime::new();

    match cli.command {
        Command::Register(args) => {
            let password = args.password.ok_or(CliError::MissingPassword)?;
            let controller = RegisterController::new(ctx, Arc::new(TerminalFormView), lifetime);
            let choices = args.consent.choices();
            let outcome = controller.submit(&args.name, &args.email, &password, Some(&choices)).await;
            submit_result("register", outcome)
        }
        Command::Login(args) => {
            let password = args.password.ok_or(CliError::MissingPassword)?;
            let controller = LoginController::new(ctx, Arc::new(TerminalFormView), lifetime);
            let choices = args.consent.choices();
            let outcome = controller.submit(&args.email, &password, Some(&choices)).await;
            submit_result("login", outcome)
        }
        Command::Me => {
            let controller = DashboardController::new(ctx, Arc::new(TerminalDashboardView), lifetime);
            match controller.enter().await {
                DashboardOutcome::Ready(_) => Ok(()),
                DashboardOutcome::Redirected | DashboardOutcome::Abandoned => {
                    Err(CliError::Incomplete { command: "me", reason: "not signed in" })
                }
            }
        }
        Command::Logout => {
            let controller = DashboardController::new(ctx, Arc::new(TerminalDashboardView), lifetime);
            controller.logout().await;
            eprintln!("signed out");
            Ok(())
        }
        Command::Status => Ok(()),
    }
}

fn print_status(session: &SessionStore) {
    match session.record() {
        Some(record) if record.expires_at.is_empty() => println!("signed in"),
        Some(record) => println!("signed in (expires {})", record.expires_at),
        None => println!("not signed in"),
    }
}

/// Map a form outcome to the process result. The view has already printed
/// the details.
fn submit_result(command: &'static str, outcome: SubmitOutcome) -> Result<(), CliError> {
    let reason = match outcome {
        SubmitOutcome::Completed(_) => return Ok(()),
        SubmitOutcome::Invalid(_) => "invalid input",
        SubmitOutcome::MissingConsent => "no consent option selected",
        SubmitOutcome::Rejected(_) => "rejected by server",
        SubmitOutcome::ConsentFailed { .. } => "consent submission failed",
        SubmitOutcome::InFlight => "already in progress",
        SubmitOutcome::Abandoned => "abandoned",
    };
    Err(CliError::Incomplete { command, reason })
}
