mod console;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use textbridge::app::BridgeApp;
use textbridge::config::{BRIDGE_URL_ENV, BridgeConfig, default_state_dir, ensure_state_dir};
use textbridge::dispatch::SendReport;
use textbridge::session::SessionStore;
use textbridge::store::{FileStore, KeyValueStore};
use textbridge::{BridgeError, BridgeResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "textbridge", about = "Send text messages through an SMS webhook bridge")]
struct Cli {
    /// Directory holding the session store.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Bridge base URL (overrides $TEXTBRIDGE_URL and the saved URL).
    #[arg(long, global = true)]
    bridge_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with a passphrase, or a webhook secret with --secret.
    Login {
        /// Enter the webhook secret by hand instead of a passphrase.
        #[arg(long)]
        secret: bool,
    },
    /// Forget the session. Draft and history are kept.
    Logout,
    /// Show login state, defaults and draft.
    Status,
    /// Send a message.
    Send {
        /// Message body, or `-` to read it from stdin.
        message: String,
        /// Extra recipients, separated by commas or newlines. Saved as the draft.
        #[arg(long, conflicts_with = "use_draft")]
        to: Option<String>,
        /// Use the saved draft as the extra recipients.
        #[arg(long)]
        use_draft: bool,
        /// Log out without asking if the bridge rejects the secret.
        #[arg(long)]
        yes: bool,
    },
    /// Manage the saved recipient draft.
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
    /// List recently sent messages, newest first.
    History,
    /// Send a message from history again.
    Resend {
        /// Entry number as shown by `history` (1 = newest).
        index: usize,
        /// Extra recipients, separated by commas or newlines. Saved as the draft.
        #[arg(long, conflicts_with = "use_draft")]
        to: Option<String>,
        /// Use the saved draft as the extra recipients.
        #[arg(long)]
        use_draft: bool,
        /// Log out without asking if the bridge rejects the secret.
        #[arg(long)]
        yes: bool,
    },
    /// Erase every stored value.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum DraftAction {
    /// Replace the draft.
    Set { text: String },
    /// Print the draft.
    Show,
    /// Clear the draft.
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration.
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "textbridge=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => default_state_dir()?,
    };
    ensure_state_dir(&state_dir)?;
    tracing::debug!(state_dir = %state_dir.display(), "using state directory");
    let store = SessionStore::new(
        FileStore::load(&state_dir).context("failed to load session store")?,
    );

    let env_url = std::env::var(BRIDGE_URL_ENV).ok();
    let stored_url = store.bridge_url();
    let config = BridgeConfig::load()?.with_overrides(
        cli.bridge_url.as_deref(),
        env_url.as_deref(),
        stored_url.as_deref(),
    )?;

    let mut app = BridgeApp::new(&config, store)?;
    let result = run(&mut app, cli.command, &config, &state_dir).await;
    console::print_activity(&app.activity_mut().drain_chronological());
    result
}

async fn run(
    app: &mut BridgeApp<FileStore>,
    command: Command,
    config: &BridgeConfig,
    state_dir: &std::path::Path,
) -> Result<()> {
    match command {
        Command::Login { secret } => {
            if secret {
                let secret = console::prompt_hidden("Webhook secret: ")?;
                app.login_with_secret(&secret)?;
            } else {
                let passphrase = console::prompt_hidden("Passphrase: ")?;
                app.login_with_passphrase(&passphrase).await?;
            }
            Ok(())
        }
        Command::Logout => {
            app.logout()?;
            Ok(())
        }
        Command::Status => console::print_json(&app.status()?),
        Command::Send {
            message,
            to,
            use_draft,
            yes,
        } => {
            let message = console::read_message(&message)?;
            let additional = additional_recipients(app, to, use_draft)?;
            let result = app.send(&message, &additional).await;
            finish_send(app, result, logout_prompt(yes))
        }
        Command::Draft { action } => {
            match action {
                DraftAction::Set { text } => app.store_mut().set_draft(&text)?,
                DraftAction::Show => println!("{}", app.store().draft()),
                DraftAction::Clear => app.store_mut().clear_draft()?,
            }
            Ok(())
        }
        Command::History => {
            let history = app.history()?;
            if history.is_empty() {
                eprintln!("No messages sent yet.");
            }
            for (i, message) in history.list().enumerate() {
                println!("{:>2}. {}", i + 1, message.replace('\n', "\n    "));
            }
            Ok(())
        }
        Command::Resend {
            index,
            to,
            use_draft,
            yes,
        } => {
            let Some(index) = index.checked_sub(1) else {
                anyhow::bail!("history entries are numbered from 1");
            };
            let additional = additional_recipients(app, to, use_draft)?;
            let result = app.resend(index, &additional).await;
            finish_send(app, result, logout_prompt(yes))
        }
        Command::Reset { yes } => {
            if !yes && !console::confirm("Erase session, draft and history?", false)? {
                eprintln!("Cancelled.");
                return Ok(());
            }
            app.reset()?;
            Ok(())
        }
        Command::Config { action } => match action {
            ConfigAction::Show => console::print_json(&serde_json::json!({
                "config_file": BridgeConfig::config_path(),
                "state_dir": state_dir,
                "bridge_url": config.bridge_url,
                "timeout_secs": config.timeout().as_secs(),
            })),
        },
    }
}

/// Extra recipients for `send` and `resend`: `--to` (which also replaces
/// the draft), the saved draft under `--use-draft`, or none.
fn additional_recipients<S: KeyValueStore>(
    app: &mut BridgeApp<S>,
    to: Option<String>,
    use_draft: bool,
) -> Result<String> {
    Ok(match to {
        Some(to) => {
            app.store_mut().set_draft(&to)?;
            to
        }
        None if use_draft => app.store().draft(),
        None => String::new(),
    })
}

fn logout_prompt(assume_yes: bool) -> impl FnOnce() -> Result<bool> {
    move || {
        if assume_yes {
            return Ok(true);
        }
        console::confirm("Log out now?", false)
    }
}

/// Print the send outcome. A rejected secret asks whether to log out,
/// since the stored session can no longer be used.
fn finish_send<S: KeyValueStore>(
    app: &mut BridgeApp<S>,
    result: BridgeResult<SendReport>,
    confirm_logout: impl FnOnce() -> Result<bool>,
) -> Result<()> {
    match result {
        Ok(report) => console::print_json(&report),
        Err(err) if err.is_auth_rejection() => {
            console::print_activity(&app.activity_mut().drain_chronological());
            if confirm_logout()? {
                app.logout()?;
            }
            Err(err.into())
        }
        Err(BridgeError::NoValidRecipients { .. }) => {
            Err(anyhow::anyhow!("nothing sent: no valid recipients"))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use textbridge::store::MemoryStore;

    fn logged_in_app() -> BridgeApp<MemoryStore> {
        let config = BridgeConfig::default();
        let mut app = BridgeApp::new(&config, SessionStore::new(MemoryStore::new())).unwrap();
        app.login_with_secret("s3cret").unwrap();
        app.store_mut().set_draft("5551234567").unwrap();
        app.store_mut().record_history("hello").unwrap();
        app
    }

    fn rejected() -> BridgeResult<SendReport> {
        Err(BridgeError::AuthenticationRejected { status: 403 })
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_flags_parse() {
        let cli = Cli::try_parse_from([
            "textbridge",
            "--bridge-url",
            "https://bridge.example",
            "send",
            "hello",
            "--to",
            "5551234567,5559876543",
        ])
        .unwrap();
        assert_eq!(cli.bridge_url.as_deref(), Some("https://bridge.example"));
        match cli.command {
            Command::Send { message, to, use_draft, yes } => {
                assert_eq!(message, "hello");
                assert_eq!(to.as_deref(), Some("5551234567,5559876543"));
                assert!(!use_draft);
                assert!(!yes);
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn to_and_use_draft_conflict() {
        assert!(
            Cli::try_parse_from(["textbridge", "send", "hi", "--to", "1", "--use-draft"]).is_err()
        );
    }

    #[tokio::test]
    async fn draft_commands_persist_to_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::default();
        let store = SessionStore::new(FileStore::load(dir.path()).unwrap());
        let mut app = BridgeApp::new(&config, store).unwrap();

        run(
            &mut app,
            Command::Draft {
                action: DraftAction::Set {
                    text: "5551234567".into(),
                },
            },
            &config,
            dir.path(),
        )
        .await
        .unwrap();

        let reloaded = SessionStore::new(FileStore::load(dir.path()).unwrap());
        assert_eq!(reloaded.draft(), "5551234567");
    }

    #[tokio::test]
    async fn resend_index_zero_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::default();
        let store = SessionStore::new(FileStore::load(dir.path()).unwrap());
        let mut app = BridgeApp::new(&config, store).unwrap();
        let err = run(
            &mut app,
            Command::Resend {
                index: 0,
                to: None,
                use_draft: false,
                yes: true,
            },
            &config,
            dir.path(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("numbered from 1"));
    }

    #[test]
    fn confirmed_rejection_logs_out_and_keeps_draft_and_history() {
        let mut app = logged_in_app();
        let err = finish_send(&mut app, rejected(), || Ok(true)).unwrap_err();
        assert!(err.to_string().contains("HTTP 403"));
        assert!(!app.store().has_session());
        assert_eq!(app.store().draft(), "5551234567");
        assert_eq!(app.history().unwrap().to_vec(), vec!["hello"]);
    }

    #[test]
    fn declined_rejection_keeps_session() {
        let mut app = logged_in_app();
        assert!(finish_send(&mut app, rejected(), || Ok(false)).is_err());
        assert!(app.store().has_session());
    }

    #[test]
    fn assume_yes_skips_the_prompt() {
        assert!(logout_prompt(true)().unwrap());
    }

    #[test]
    fn other_failures_never_ask_to_log_out() {
        let mut app = logged_in_app();
        let result = Err(BridgeError::Server {
            status: 500,
            body: "boom".into(),
        });
        let err = finish_send(&mut app, result, || panic!("asked to log out")).unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(app.store().has_session());
    }

    #[test]
    fn send_and_resend_pick_recipients_the_same_way() {
        let mut app = logged_in_app();
        assert_eq!(additional_recipients(&mut app, None, false).unwrap(), "");
        assert_eq!(
            additional_recipients(&mut app, None, true).unwrap(),
            "5551234567"
        );
        assert_eq!(
            additional_recipients(&mut app, Some("5559876543".into()), false).unwrap(),
            "5559876543"
        );
        assert_eq!(app.store().draft(), "5559876543");

        let cli = Cli::try_parse_from(["textbridge", "resend", "2", "--use-draft"]).unwrap();
        match cli.command {
            Command::Resend {
                index,
                to,
                use_draft,
                ..
            } => {
                assert_eq!(index, 2);
                assert!(to.is_none());
                assert!(use_draft);
            }
            _ => panic!("expected resend"),
        }
        assert!(
            Cli::try_parse_from(["textbridge", "resend", "1", "--to", "1", "--use-draft"]).is_err()
        );
    }
}
