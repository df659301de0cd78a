mod command;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use imagent_application::{ImageMagickAgent, RequestOutcome};
use imagent_core::config::Settings;
use imagent_core::secret::SecretService;
use imagent_core::{AuditSink, ExecutionResult, LlmProvider, NoopAuditSink};
use imagent_execution::{CommandExecutor, ExecutorOptions};
use imagent_infrastructure::{
    ConfigService, JsonlAuditLog, LoggingGuard, SecretServiceImpl, init_logging,
};
use imagent_interaction::ProviderClient;
use imagent_interaction::logging::LoggedGenerator;

use command::{KEYWORDS, ReplCommand, is_affirmative};

/// Natural-language front end for ImageMagick.
#[derive(Parser, Debug)]
#[command(name = "imagent", version, about, long_about = None)]
struct Cli {
    /// LLM provider (anthropic, openai, google)
    #[arg(short, long)]
    provider: Option<LlmProvider>,

    /// Model identifier sent to the provider
    #[arg(short, long)]
    model: Option<String>,

    /// Execute generated commands without asking
    #[arg(long)]
    auto_execute: bool,

    /// Conversation exchanges kept in history
    #[arg(long)]
    max_history: Option<usize>,

    /// Directory for log and audit files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Directory commands run in
    #[arg(short = 'C', long, default_value = ".")]
    working_dir: PathBuf,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(provider) = self.provider {
            settings.llm_provider = provider;
        }
        if let Some(model) = &self.model {
            settings.llm_model = Some(model.clone());
        }
        if self.auto_execute {
            settings.auto_execute = true;
        }
        if let Some(max_history) = self.max_history {
            settings.max_history = max_history;
        }
        if let Some(log_dir) = &self.log_dir {
            settings.logging.log_dir = Some(log_dir.clone());
        }
    }
}

/// CLI helper for rustyline that completes and hints the REPL keywords.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<&'static str>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: KEYWORDS.to_vec(),
        }
    }

    fn is_keyword_prefix(line: &str) -> bool {
        !line.is_empty() && !line.contains(char::is_whitespace)
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if Self::is_keyword_prefix(line) {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match ReplCommand::parse(line.trim()) {
            ReplCommand::Request(_) => Borrowed(line),
            _ => Owned(line.bright_cyan().to_string()),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if Self::is_keyword_prefix(line) {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

type Repl = Editor<CliHelper, DefaultHistory>;

/// Everything built at startup that must outlive the REPL.
struct App {
    agent: ImageMagickAgent,
    settings: Settings,
    log_dir: PathBuf,
    _logging: Option<LoggingGuard>,
}

/// Loads configuration and credentials, then wires the agent.
///
/// Any failure here is fatal: the REPL never starts without a working
/// ImageMagick install and an API key for the selected provider.
async fn bootstrap(cli: &Cli) -> Result<App> {
    let config_service = ConfigService::new();
    let mut settings = config_service
        .get_settings()
        .context("Failed to load configuration")?;
    cli.apply(&mut settings);

    let log_dir = config_service.resolve_log_dir(&settings)?;
    let logging = match init_logging(&settings.logging, &log_dir) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!(
                "{}",
                format!("Warning: file logging disabled: {}", err).yellow()
            );
            None
        }
    };

    let audit: Arc<dyn AuditSink> = if settings.logging.enabled {
        match JsonlAuditLog::new(&log_dir, &settings.logging) {
            Ok(log) => Arc::new(log),
            Err(err) => {
                tracing::warn!(error = %err, "Audit log unavailable");
                Arc::new(NoopAuditSink)
            }
        }
    } else {
        Arc::new(NoopAuditSink)
    };

    let secrets = SecretServiceImpl::new()?
        .load_secrets()
        .await
        .context("Failed to load credentials")?;

    let options = ExecutorOptions::default().with_working_dir(cli.working_dir.clone());
    let executor = CommandExecutor::detect(options, Arc::clone(&audit))?;

    let client = ProviderClient::from_settings(&settings, &secrets, executor.imagemagick_command())?;
    let generator = Arc::new(LoggedGenerator::new(client, Arc::clone(&audit)));

    let agent = ImageMagickAgent::new(&settings, generator, executor, audit);

    Ok(App {
        agent,
        settings,
        log_dir,
        _logging: logging,
    })
}

fn print_banner() {
    println!("{}", "=== imagent ===".bright_magenta().bold());
    println!(
        "{}",
        "Describe an image edit in plain language. Type 'help' for commands.".bright_black()
    );
    println!();
}

fn print_help() {
    println!("{}", "Commands:".bold());
    let rows = [
        ("help", "Show this help"),
        ("settings", "Show current settings"),
        ("info <file>", "Show image information"),
        ("open <file>", "Use an existing image as the working image"),
        ("accept", "Use the last output as the next input"),
        ("refine", "Discard the last output and edit the working image again"),
        ("reset", "Clear conversation history and images"),
        ("exit, quit, q", "Exit"),
    ];
    for (name, text) in rows {
        println!("  {:<16}{}", name.bright_cyan(), text);
    }
    println!();
    println!("{}", "Anything else is sent to the agent, e.g.".bright_black());
    println!("{}", "  resize photo.jpg to 800x600 and save as small.png".bright_black());
    println!();
}

fn print_settings(app: &App) {
    let agent = &app.agent;
    let generator = agent.generator();
    let rows = [
        ("Provider", generator.provider().to_string()),
        ("Model", generator.model().to_string()),
        ("ImageMagick", agent.executor().binary().to_string()),
        ("Auto execute", agent.auto_execute().to_string()),
        ("Max history", app.settings.max_history.to_string()),
        (
            "Logging",
            if app.settings.logging.enabled {
                app.log_dir.display().to_string()
            } else {
                "disabled".to_string()
            },
        ),
    ];
    println!("{}", "Settings:".bold());
    for (name, value) in rows {
        println!("  {:<14}{}", name.bright_black(), value.bright_white());
    }
    if let Some(image) = agent.session().working_image() {
        println!("  {:<14}{}", "Working image".bright_black(), image.display());
    }
    println!();
}

fn print_result(result: &ExecutionResult) {
    if result.succeeded() {
        println!("{}", "Command executed successfully!".bright_green());
        if let Some(output) = result.output_file() {
            println!("{}", format!("Output saved to: {}", output.display()).green());
            println!(
                "{}",
                "Type 'accept' to keep editing this output, or 'refine' to try again."
                    .bright_black()
            );
        }
        let stdout = result.stdout().trim();
        if !stdout.is_empty() {
            println!("{}", stdout);
        }
    } else {
        println!(
            "{}",
            format!(
                "Execution failed: {}",
                result.error_message().unwrap_or("unknown error")
            )
            .red()
        );
        let stderr = result.stderr().trim();
        if !stderr.is_empty() {
            println!("{}", stderr.bright_black());
        }
    }
}

/// Asks before running the pending command. Ctrl-C and EOF decline.
async fn confirm_and_execute(rl: &mut Repl, agent: &mut ImageMagickAgent) {
    let answer = match rl.readline("Execute this command? [y/N] ") {
        Ok(answer) => answer,
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => String::new(),
        Err(err) => {
            eprintln!("{}", format!("Error: {:?}", err).red());
            String::new()
        }
    };

    if is_affirmative(&answer) {
        println!("{}", "Executing...".bright_black());
        if let Some(result) = agent.confirm_pending().await {
            print_result(&result);
        }
    } else {
        agent.cancel_pending();
        println!("{}", "Command cancelled.".yellow());
    }
}

async fn handle_request(rl: &mut Repl, agent: &mut ImageMagickAgent, request: &str) {
    println!("{}", "Generating command...".bright_black());

    match agent.process_request(request).await {
        RequestOutcome::Clarification(question) => {
            println!("{} {}", "Agent:".bright_blue().bold(), question.bright_blue());
        }
        RequestOutcome::Command {
            command,
            needs_confirmation,
        } => {
            println!("{}", "Generated command:".bold());
            println!("  {}", command.bright_cyan());
            if needs_confirmation {
                confirm_and_execute(rl, agent).await;
            } else {
                println!("{}", "Executing...".bright_black());
                let result = agent.execute_command(&command).await;
                print_result(&result);
            }
        }
        outcome @ (RequestOutcome::Rejected { .. } | RequestOutcome::ProviderFailed(_)) => {
            if let Some(command) = outcome.command() {
                println!("{}", "Generated command:".bold());
                println!("  {}", command.bright_black());
            }
            if let Some(error) = outcome.error() {
                println!("{}", format!("Error: {}", error).red());
            }
        }
    }
}

async fn show_info(agent: &ImageMagickAgent, file: &str) {
    if !agent.check_file_exists(file) {
        println!("{}", format!("File not found: {}", file).red());
        return;
    }
    match agent.get_image_info(file).await {
        Some(info) => println!("{}", info),
        None => println!("{}", "Could not get image information".red()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut app = match bootstrap(&cli).await {
        Ok(app) => app,
        Err(err) => {
            eprintln!("{}", format!("Configuration error: {:#}", err).red());
            std::process::exit(1);
        }
    };

    print_banner();
    print_settings(&app);

    let mut rl: Repl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match ReplCommand::parse(trimmed) {
                    ReplCommand::Exit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    ReplCommand::Help => print_help(),
                    ReplCommand::Settings => print_settings(&app),
                    ReplCommand::Reset => {
                        app.agent.reset();
                        println!("{}", "Conversation history cleared!".bright_green());
                    }
                    ReplCommand::Info(file) => show_info(&app.agent, file).await,
                    ReplCommand::Open(file) => match app.agent.open_image(file) {
                        Ok(()) => println!("{}", format!("Working image: {}", file).green()),
                        Err(err) => println!("{}", err.to_string().red()),
                    },
                    ReplCommand::Accept => match app.agent.accept_output() {
                        Some(image) => println!(
                            "{}",
                            format!("Working image: {}", image.display()).green()
                        ),
                        None => println!("{}", "No output to accept.".yellow()),
                    },
                    ReplCommand::Refine => {
                        app.agent.refine();
                        match app.agent.session().working_image() {
                            Some(image) => println!(
                                "{}",
                                format!("Output discarded. Still editing {}", image.display())
                                    .yellow()
                            ),
                            None => println!("{}", "Output discarded.".yellow()),
                        }
                    }
                    ReplCommand::Request(request) => {
                        handle_request(&mut rl, &mut app.agent, request).await;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
