//! Command-line front end for the Darkwatch client.
//!
//! Restores any persisted session, runs one command and reports the outcome.
//! Log output goes to stderr so command output stays clean.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::process::ExitCode;
use tracing::Level;

use darkwatch::errors::{ClientError, ClientResult, OperationResult};
use darkwatch::models::{ScanRecord, SourceState, SourceUpdate, TermCategory};
use darkwatch::services::scan_orchestrator::ScanUpdate;
use darkwatch::services::search_terms::SearchTermSet;
use darkwatch::{AppContext, Config};

#[derive(Parser, Debug)]
#[command(name = "darkwatch")]
#[command(about = "Monitor dark web sources for leaked personal data")]
struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    /// Print the operation result as JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        email: String,
        #[arg(long, env = "DARKWATCH_PASSWORD")]
        password: String,
    },
    /// Create an account, then sign in
    Register {
        email: String,
        #[arg(long, env = "DARKWATCH_PASSWORD")]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Forget the current session
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// Request a password reset link
    ForgotPassword { email: String },
    /// Set a new password using a reset token
    ResetPassword {
        token: String,
        #[arg(long, env = "DARKWATCH_NEW_PASSWORD")]
        password: String,
    },
    /// Manage monitored sources
    #[command(subcommand)]
    Sources(SourcesCommand),
    /// List past scans, newest first
    History,
    /// Scan enabled sources for the given terms
    Scan {
        #[arg(required = true)]
        terms: Vec<String>,
        #[arg(long, default_value = "custom")]
        category: TermCategory,
    },
}

#[derive(Debug, Subcommand)]
enum SourcesCommand {
    List,
    Add {
        url: String,
        name: String,
    },
    Update {
        id: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        disabled: Option<bool>,
    },
    Remove {
        id: String,
    },
    /// Flip a source between enabled and disabled
    Toggle {
        id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let context = match AppContext::new(config) {
        Ok(context) => context,
        Err(e) => return report(&Err::<(), _>(e), cli.json),
    };

    context.auth.restore().await;
    let result = run(&context, cli.command).await;
    report(&result, cli.json)
}

fn report(result: &ClientResult<()>, json: bool) -> ExitCode {
    let outcome = OperationResult::from(result);
    if json {
        match serde_json::to_string(&outcome) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("failed to encode result: {}", e),
        }
    } else if let Some(message) = &outcome.error {
        eprintln!("error: {}", message);
    }

    if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn require_session(context: &AppContext) -> ClientResult<()> {
    if context.session.is_authenticated() {
        Ok(())
    } else {
        Err(ClientError::auth("Not signed in. Run `darkwatch login` first."))
    }
}

async fn run(context: &AppContext, command: Command) -> ClientResult<()> {
    match command {
        Command::Login { email, password } => {
            let identity = context.auth.sign_in(&email, &password).await?;
            println!("Signed in as {}", identity.email);
        }
        Command::Register {
            email,
            password,
            name,
        } => {
            let identity = context
                .auth
                .sign_up(&email, &password, name.as_deref())
                .await?;
            println!("Registered and signed in as {}", identity.email);
        }
        Command::Logout => {
            context.auth.sign_out();
            println!("Signed out");
        }
        Command::Whoami => {
            require_session(context)?;
            if let Some(identity) = context.session.identity() {
                let name = identity.display_name.as_deref().unwrap_or("-");
                println!("{} ({}) role={} name={}", identity.email, identity.id, role(&identity), name);
            }
        }
        Command::ForgotPassword { email } => {
            context.auth.forgot_password(&email).await?;
            println!("If the account exists, a reset link has been sent");
        }
        Command::ResetPassword { token, password } => {
            context.auth.reset_password(&token, &password).await?;
            println!("Password updated");
        }
        Command::Sources(command) => {
            require_session(context)?;
            run_sources(context, command).await?;
        }
        Command::History => {
            require_session(context)?;
            let records = context.history.refresh().await?;
            if records.is_empty() {
                println!("No scans yet");
            }
            for record in records {
                println!(
                    "{}  {}  {:<8}  {:.1}s  terms: {}  sources: {}",
                    record.started_at.format("%Y-%m-%d %H:%M:%S"),
                    record.id,
                    record.outcome,
                    record.duration_seconds,
                    record.matched_terms.join(", "),
                    record.breached_sources.join(", ")
                );
            }
        }
        Command::Scan { terms, category } => {
            require_session(context)?;
            let mut set = SearchTermSet::new();
            for term in &terms {
                if let Err(e) = set.add(term, category) {
                    eprintln!("skipping '{}': {}", term, e);
                }
            }
            run_scan(context, &set).await?;
        }
    }
    Ok(())
}

fn role(identity: &darkwatch::models::Identity) -> &'static str {
    if identity.is_admin() { "admin" } else { "client" }
}

async fn run_sources(context: &AppContext, command: SourcesCommand) -> ClientResult<()> {
    match command {
        SourcesCommand::List => {
            let sources = context.links.refresh().await?;
            if sources.is_empty() {
                println!("No monitored sources");
            }
            for source in sources {
                println!(
                    "{}  {:<8}  {}  {}",
                    source.id, source.state, source.label, source.address
                );
            }
        }
        SourcesCommand::Add { url, name } => {
            let source = context.links.add(&url, &name).await?;
            println!("Added {} ({})", source.label, source.id);
        }
        SourcesCommand::Update {
            id,
            url,
            name,
            disabled,
        } => {
            let changes = SourceUpdate {
                address: url,
                label: name,
                state: disabled.map(|disabled| {
                    if disabled {
                        SourceState::Disabled
                    } else {
                        SourceState::Enabled
                    }
                }),
            };
            let source = context.links.update(&id, &changes).await?;
            println!("Updated {} ({})", source.label, source.id);
        }
        SourcesCommand::Remove { id } => {
            context.links.remove(&id).await?;
            println!("Removed {}", id);
        }
        SourcesCommand::Toggle { id } => {
            context.links.refresh().await?;
            let source = context.links.toggle(&id).await?;
            println!("{} is now {}", source.label, source.state);
        }
    }
    Ok(())
}

#[derive(Debug)]
enum ScanEnd {
    Finished(ScanRecord),
    Cancelled,
}

/// A scan that stops without a terminal update was cancelled, which is not a
/// failure of the command.
fn scan_end(outcome: Option<ClientResult<ScanRecord>>) -> ClientResult<ScanEnd> {
    match outcome {
        Some(Ok(record)) => Ok(ScanEnd::Finished(record)),
        Some(Err(e)) => Err(e),
        None => Ok(ScanEnd::Cancelled),
    }
}

async fn run_scan(context: &AppContext, terms: &SearchTermSet) -> ClientResult<()> {
    let Some(mut handle) = context.orchestrator.execute_scan(terms.terms()) else {
        return Err(ClientError::validation("Add at least one search term"));
    };

    let mut last_step = None;
    let outcome = loop {
        let update = tokio::select! {
            update = handle.next_update() => update,
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                break None;
            }
        };

        match update {
            Some(ScanUpdate::Progress(frame)) => {
                if last_step != Some(frame.step_index) {
                    if last_step.is_some() {
                        eprintln!();
                    }
                    last_step = Some(frame.step_index);
                }
                eprint!("\r{:>5.1}%  {}", frame.percent, frame.label);
                let _ = std::io::stderr().flush();
            }
            Some(ScanUpdate::Finalizing) => {
                eprintln!();
                eprint!("Finalizing results...");
            }
            Some(ScanUpdate::Complete(record)) => break Some(Ok(record)),
            Some(ScanUpdate::Failed(e)) => break Some(Err(e)),
            None => break None,
        }
    };
    eprintln!();

    let record = match scan_end(outcome)? {
        ScanEnd::Finished(record) => record,
        ScanEnd::Cancelled => {
            println!("Scan cancelled");
            return Ok(());
        }
    };
    handle.finished().await;

    if record.is_breached() {
        println!("BREACHED: found on {} source(s)", record.breached_sources.len());
        for source in &record.breached_sources {
            println!("  source: {}", source);
        }
        println!("  matched terms: {}", record.matched_terms.join(", "));
    } else {
        println!("SAFE: no matches across {} source(s)", record.scanned_sources.len());
    }
    for error in &record.errors {
        println!("  warning: {}", error);
    }
    Ok(())
}
