mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use studychat_client::{Backend, HistoryMessage, HttpBackend, MockBackend, MockScript};
use studychat_core::config::default_config_path;
use studychat_core::logging::LoggingConfig;
use studychat_core::{Attachment, AuthConfig, Config, PrivacyConfig, SessionContext, Timestamp, init_logging};
use studychat_transcript::{Draft, Outcome, ScrollDirective, Status, TranscriptController};
use tokio::io::{AsyncBufReadExt, BufReader};

/// studychat - chat with the tutor of a study session
#[derive(Parser, Debug)]
#[command(name = "studychat")]
#[command(about = "Terminal client for study-session chat transcripts", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to studychat.toml (default: ./studychat.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Serve requests from a mock script instead of the backend
    #[arg(long, value_name = "PATH")]
    mock: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a session transcript and chat interactively
    Chat {
        /// Study session id
        #[arg(short, long, value_name = "ID")]
        session: String,

        /// Discipline the session belongs to
        #[arg(short, long, value_name = "ID")]
        discipline: String,

        /// Messages per history page (default: config's chat.page_size)
        #[arg(long, value_name = "N")]
        page_size: Option<usize>,
    },
    /// Print one page of a session's history
    History {
        /// Study session id
        #[arg(short, long, value_name = "ID")]
        session: String,

        /// Number of messages (default: config's chat.page_size)
        #[arg(short, long, value_name = "N")]
        limit: Option<usize>,

        /// Only messages older than this timestamp
        #[arg(long, value_name = "TIMESTAMP")]
        before: Option<String>,
    },
    /// Show the resolved configuration
    Config,
}

/// Lines starting with `/` in the chat loop
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatCommand {
    More,
    Attach(PathBuf),
    Detach,
    Help,
    Quit,
    Unknown(String),
}

impl ChatCommand {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let rest = line.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        Some(match name {
            "more" => ChatCommand::More,
            "attach" if !arg.is_empty() => ChatCommand::Attach(PathBuf::from(arg)),
            "detach" => ChatCommand::Detach,
            "help" => ChatCommand::Help,
            "quit" | "exit" => ChatCommand::Quit,
            _ => ChatCommand::Unknown(line.to_string()),
        })
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = load_or_create_config(&config_path)?;

    let mut logging = LoggingConfig::from(config.logging.clone());
    if cli.verbose {
        logging = logging.with_level("info,studychat_client=debug,studychat_transcript=debug");
    }
    let _log_guard = init_logging(Some(logging.clone())).context("Failed to initialise logging")?;

    if cli.verbose {
        println!("{} Using config: {}", "Info:".blue().bold(), config_path.display());
        match &cli.mock {
            Some(path) => println!("{} Mock script: {}", "Info:".blue().bold(), path.display()),
            None => println!("{} Backend: {}", "Info:".blue().bold(), config.api.base_url.cyan()),
        }
    }

    match cli.command {
        Commands::Chat { session, discipline, page_size } => {
            let backend = build_backend(&config, cli.mock.as_deref())?;
            let page_size = page_size.unwrap_or(config.chat.page_size);
            cmd_chat(backend, SessionContext::new(session, discipline), page_size, logging.privacy).await?
        }
        Commands::History { session, limit, before } => {
            let backend = build_backend(&config, cli.mock.as_deref())?;
            let limit = limit.unwrap_or(config.chat.page_size);
            cmd_history(backend.as_ref(), &session, limit, before.as_deref()).await?
        }
        Commands::Config => cmd_config(&config)?,
    }

    Ok(())
}

/// Load config from file or create from example
fn load_or_create_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    } else {
        println!("{} Config not found at {}", "Warning:".yellow().bold(), path.display());
        println!("{} Creating config from example...", "Info:".blue().bold());

        std::fs::write(path, Config::example()).context("Failed to create config")?;

        println!(
            "{} Created config at {}. Please edit it with your settings.",
            "Success:".green().bold(),
            path.display()
        );

        anyhow::bail!("Please edit {} with your settings and run again", path.display())
    }
}

fn build_backend(config: &Config, mock: Option<&Path>) -> Result<Arc<dyn Backend>> {
    match mock {
        Some(path) => {
            let script = MockScript::from_file(path)
                .with_context(|| format!("Failed to load mock script {}", path.display()))?;
            Ok(Arc::new(MockBackend::from_script(script)))
        }
        None => Ok(Arc::new(HttpBackend::from_config(config).context("Failed to set up backend client")?)),
    }
}

/// One-line status for outcomes the transcript alone does not explain
fn report(outcome: &Outcome) {
    match &outcome.status {
        Status::Failed(reason) => println!("{} {}", "Warning:".yellow().bold(), reason),
        Status::Busy => println!("{} Still waiting on the previous request", "Info:".blue().bold()),
        Status::Completed | Status::Skipped | Status::Stale => {}
    }
}

/// Print whatever the operation added, on the side its scroll directive points to
fn show_outcome(controller: &TranscriptController, outcome: &Outcome, before_len: usize) {
    report(outcome);
    let messages = controller.messages();

    match outcome.scroll() {
        Some(ScrollDirective::Preserve) if outcome.added > 0 => {
            println!("{}", "--- older messages ---".dimmed());
            render::print_messages(&messages[..outcome.added.min(messages.len())]);
            println!("{}", "--- end of older messages ---".dimmed());
        }
        Some(ScrollDirective::ToBottom) => {
            render::print_messages(&messages[before_len.min(messages.len())..]);
        }
        _ => {}
    }
}

fn print_chat_help() {
    println!("{}", "Type a message and press Enter to send. End a line with \\ to continue on the next line.".dimmed());
    println!("{}", "Commands: /more  /attach PATH  /detach  /help  /quit".dimmed());
}

async fn cmd_chat(
    backend: Arc<dyn Backend>, session: SessionContext, page_size: usize, privacy: PrivacyConfig,
) -> Result<()> {
    match backend.fetch_session_metadata(&session.session_id).await {
        Ok(metadata) => println!("{}", metadata.headline().bold().underline()),
        Err(e) => println!("{} Could not load session details: {}", "Warning:".yellow().bold(), e),
    }

    let controller = TranscriptController::new(backend).with_privacy(privacy);
    let outcome = controller.load_initial(session, page_size).await;
    show_outcome(&controller, &outcome, 0);
    if controller.has_more() {
        println!("{}", "(older messages available: /more)".dimmed());
    }
    print_chat_help();

    let mut draft = Draft::new();
    let mut staged: Option<Attachment> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        if draft.is_empty()
            && let Some(command) = ChatCommand::parse(&line)
        {
            match command {
                ChatCommand::More => {
                    let outcome = controller.load_more(page_size).await;
                    if outcome.status == Status::Skipped {
                        println!("{} No older messages", "Info:".blue().bold());
                    }
                    show_outcome(&controller, &outcome, 0);
                }
                ChatCommand::Attach(path) => match Attachment::from_path(&path) {
                    Ok(attachment) => {
                        println!("{} Attached {}", "Info:".blue().bold(), attachment.file_name().cyan());
                        staged = Some(attachment);
                    }
                    Err(e) => println!("{} {}", "Warning:".yellow().bold(), e),
                },
                ChatCommand::Detach => staged = None,
                ChatCommand::Help => print_chat_help(),
                ChatCommand::Quit => break,
                ChatCommand::Unknown(line) => println!("{} Unknown command {}", "Warning:".yellow().bold(), line),
            }
            continue;
        }

        let Some(text) = draft.feed_line(&line) else {
            continue;
        };
        if text.trim().is_empty() && staged.is_none() {
            continue;
        }

        let before_len = controller.len();
        let outcome = submit(&controller, &mut draft, &mut staged, text).await;
        show_outcome(&controller, &outcome, before_len);
    }

    controller.close();
    Ok(())
}

/// Send the draft; a refused send keeps both the text and the staged file
async fn submit(
    controller: &TranscriptController, draft: &mut Draft, staged: &mut Option<Attachment>, text: String,
) -> Outcome {
    let outcome = controller.send(&text, staged.clone()).await;
    if outcome.is_busy() {
        draft.restore(text);
    } else {
        *staged = None;
    }
    outcome
}

async fn cmd_history(backend: &dyn Backend, session_id: &str, limit: usize, before: Option<&str>) -> Result<()> {
    let before = before
        .map(|s| Timestamp::parse_str(s).with_context(|| format!("Invalid timestamp '{}'", s)))
        .transpose()?;

    let mut history = backend
        .fetch_history(session_id, limit.max(1), before.as_ref())
        .await
        .with_context(|| format!("Failed to load history for session {}", session_id))?;
    history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    if history.is_empty() {
        println!("{} No messages", "Info:".blue().bold());
        return Ok(());
    }

    let messages = history.into_iter().map(HistoryMessage::into_message).collect::<Vec<_>>();
    render::print_messages(&messages);
    Ok(())
}

/// Show current configuration with secrets masked
fn cmd_config(config: &Config) -> Result<()> {
    let mut shown = config.clone();
    if let AuthConfig::Static { token } = &mut shown.auth {
        *token = "********".to_string();
    }

    println!("{}", "studychat configuration".green().bold().underline());
    println!();
    print!("{}", toml::to_string_pretty(&shown).context("Failed to render config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use studychat_client::RecordedCall;
    use tempfile::TempDir;

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["studychat", "config"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.mock.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::try_parse_from(["studychat", "--config", "/path/to/studychat.toml", "config"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/studychat.toml")));
    }

    #[test]
    fn test_cli_chat_command() {
        let cli = Cli::try_parse_from(["studychat", "-v", "chat", "--session", "12", "--discipline", "3"]).unwrap();
        assert!(cli.verbose);

        if let Commands::Chat { session, discipline, page_size } = cli.command {
            assert_eq!(session, "12");
            assert_eq!(discipline, "3");
            assert_eq!(page_size, None);
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_chat_requires_discipline() {
        assert!(Cli::try_parse_from(["studychat", "chat", "--session", "12"]).is_err());
    }

    #[test]
    fn test_cli_history_command() {
        let cli = Cli::try_parse_from([
            "studychat",
            "--mock",
            "script.toml",
            "history",
            "-s",
            "9",
            "--limit",
            "5",
            "--before",
            "2024-05-01T12:00:00Z",
        ])
        .unwrap();
        assert_eq!(cli.mock, Some(PathBuf::from("script.toml")));

        if let Commands::History { session, limit, before } = cli.command {
            assert_eq!(session, "9");
            assert_eq!(limit, Some(5));
            assert_eq!(before.as_deref(), Some("2024-05-01T12:00:00Z"));
        } else {
            panic!("Expected History command");
        }
    }

    #[test]
    fn test_chat_command_parse() {
        assert_eq!(ChatCommand::parse("/more"), Some(ChatCommand::More));
        assert_eq!(ChatCommand::parse("  /quit "), Some(ChatCommand::Quit));
        assert_eq!(ChatCommand::parse("/exit"), Some(ChatCommand::Quit));
        assert_eq!(ChatCommand::parse("/attach notes/week 3.pdf"), Some(ChatCommand::Attach(PathBuf::from("notes/week 3.pdf"))));
        assert_eq!(ChatCommand::parse("/attach"), Some(ChatCommand::Unknown("/attach".to_string())));
        assert_eq!(ChatCommand::parse("/detach"), Some(ChatCommand::Detach));
        assert_eq!(ChatCommand::parse("hello /more"), None);
        assert_eq!(ChatCommand::parse("what is 2/3?"), None);
    }

    #[test]
    fn test_load_or_create_config_existing() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("studychat.toml");
        std::fs::write(&config_path, Config::example()).unwrap();

        let config = load_or_create_config(&config_path).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.chat.page_size, 10);
    }

    #[test]
    fn test_load_or_create_config_not_existing() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("studychat.toml");

        let result = load_or_create_config(&config_path);
        assert!(result.is_err());
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[api]"));
        assert!(content.contains("page_size"));
    }

    #[test]
    fn test_load_or_create_config_invalid() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("studychat.toml");
        std::fs::write(&config_path, "invalid toml").unwrap();

        assert!(load_or_create_config(&config_path).is_err());
    }

    #[test]
    fn test_build_backend_from_mock_script() {
        let temp = TempDir::new().unwrap();
        let script_path = temp.path().join("script.toml");
        std::fs::write(&script_path, "[[replies]]\ntype = \"body\"\nbody = \"hi\"\n").unwrap();

        let config = Config::from_toml_str(Config::example()).unwrap();
        assert!(build_backend(&config, Some(&script_path)).is_ok());
        assert!(build_backend(&config, Some(&temp.path().join("missing.toml"))).is_err());
        assert!(build_backend(&config, None).is_ok());
    }

    #[tokio::test]
    async fn test_cmd_history_against_mock() {
        let backend = MockBackend::new().with_history(studychat_client::generate_history(4));
        assert!(cmd_history(&backend, "1", 2, None).await.is_ok());
        assert!(cmd_history(&backend, "1", 2, Some("2024-05-01T12:01:00Z")).await.is_ok());
        assert!(cmd_history(&backend, "1", 2, Some("yesterday")).await.is_err());
        assert_eq!(backend.history_calls(), 2);
    }

    #[tokio::test]
    async fn test_busy_submit_keeps_text_and_attachment() {
        let mock = Arc::new(MockBackend::gated());
        mock.release(1);
        let controller = TranscriptController::new(mock.clone());
        controller.load_initial(SessionContext::new("1", "2"), 10).await;

        let mut draft = Draft::new();
        let mut staged = Some(Attachment::from_bytes("notes.pdf", vec![0u8; 8]).unwrap());

        let (first, refused) = tokio::join!(controller.send("first", None), async {
            mock.wait_for_calls(2).await;
            let outcome = submit(&controller, &mut draft, &mut staged, "second".to_string()).await;
            mock.release(1);
            outcome
        });
        assert!(first.is_completed());
        assert!(refused.is_busy());
        assert_eq!(draft.text(), "second");
        assert_eq!(staged.as_ref().map(Attachment::file_name), Some("notes.pdf"));

        mock.release(1);
        let text = draft.feed_line("").unwrap_or_default();
        let sent = submit(&controller, &mut draft, &mut staged, text).await;
        assert!(sent.is_completed());
        assert!(staged.is_none());
        assert!(draft.is_empty());
        assert!(matches!(
            mock.calls().last(),
            Some(RecordedCall::Submit { text, attachment: Some(name), .. }) if text == "second" && name == "notes.pdf"
        ));
    }

    #[test]
    fn test_cmd_config_masks_static_token() {
        let config = Config::from_toml_str(
            r#"
[api]
base_url = "https://tutor.example.edu"

[auth]
source = "static"
token = "secret"
"#,
        )
        .unwrap();

        assert!(cmd_config(&config).is_ok());
    }
}
