use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use ragchat_client::{
    collect_from_paths, collect_upload_files, open_store, Backend, ChatController, HttpGateway,
    Notification, Role, SendOutcome, SessionIdentity,
};
use ragchat_config::{Config, ConfigManager, LoggingConfig, ServerConfig};
use ragchat_core::format_file_size;
use ragchat_observability::{LogManager, LogOptions};
use tracing::debug;

#[derive(Parser)]
#[command(name = "ragchat-cli")]
#[command(about = "Chat with your documents from the command line")]
#[command(version)]
struct Cli {
    /// 后端地址，覆盖配置中的 server.base_url
    #[arg(long)]
    server_url: Option<String>,

    /// 启用调试模式
    #[arg(long, short, default_value = "false")]
    debug: bool,

    /// 配置文件路径
    #[arg(long, env = "RAGCHAT_CONFIG", default_value = "~/.ragchat/config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动交互式聊天
    Chat,
    /// 发送单条消息并输出流式回答
    Send {
        /// 消息内容
        message: String,
    },
    /// 知识库文档管理
    Docs(DocsArgs),
    /// 会话 ID 管理
    Session(SessionArgs),
    /// 配置管理命令
    Config(ConfigArgs),
}

#[derive(Args, Clone)]
struct DocsArgs {
    #[command(subcommand)]
    command: DocsCommands,
}

#[derive(Subcommand, Clone)]
enum DocsCommands {
    /// 列出当前会话的文档
    List,
    /// 上传文件或目录（仅 pdf, txt, md, doc, docx）
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// 删除文档
    Delete {
        /// 文档 ID
        id: String,
    },
}

#[derive(Args, Clone)]
struct SessionArgs {
    #[command(subcommand)]
    command: SessionCommands,
}

#[derive(Subcommand, Clone)]
enum SessionCommands {
    /// 显示当前会话 ID
    Show,
    /// 丢弃会话 ID，下次使用时生成新的
    Reset,
}

#[derive(Args, Clone)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// 获取配置值
    Get {
        /// 配置键 (如: server.base_url, logging.level)
        key: String,
    },
    /// 设置配置值
    Set {
        /// 配置键 (如: server.base_url, logging.level)
        key: String,
        /// 配置值
        value: String,
    },
    /// 初始化默认配置
    Init {
        /// 强制覆盖已有配置
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// 显示当前配置
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 展开配置文件路径
    let config_path =
        ragchat_config::expand_tilde(&cli.config).unwrap_or_else(|| PathBuf::from(&cli.config));

    if cli.debug {
        eprintln!("{}", format!("[DEBUG] Config path: {:?}", config_path).dimmed());
    }

    if let Commands::Config(args) = &cli.command {
        return handle_config(args.clone(), config_path).await;
    }

    let manager = ConfigManager::load(&config_path).await?;
    let config = manager.snapshot().await;
    let mut logging = init_logging(&config.logging, cli.debug)?;

    let server = server_config(&config, cli.server_url.as_deref());
    if cli.debug {
        eprintln!("{}", format!("[DEBUG] Server URL: {}", server.base_url).dimmed());
    }

    match cli.command {
        Commands::Chat => run_interactive_chat(connect(&config, &server)?, &mut logging).await,
        Commands::Send { message } => send_message(&connect(&config, &server)?, &message).await,
        Commands::Docs(args) => handle_docs(args, connect(&config, &server)?).await,
        Commands::Session(args) => handle_session(args, &config),
        Commands::Config(_) => Ok(()),
    }
}

fn init_logging(config: &LoggingConfig, debug: bool) -> anyhow::Result<LogManager> {
    let options = if debug {
        LogOptions::from(config)
            .with_log_level("debug")
            .with_module_level("hyper", "info")
            .without_log_file()
    } else {
        LogOptions::from(config)
    };
    Ok(LogManager::init(options)?)
}

fn server_config(config: &Config, override_url: Option<&str>) -> ServerConfig {
    match override_url {
        Some(url) => ServerConfig {
            base_url: ServerConfig::new(url).base_url,
            ..config.server.clone()
        },
        None => config.server.clone(),
    }
}

fn connect(config: &Config, server: &ServerConfig) -> anyhow::Result<ChatController<HttpGateway>> {
    let store = open_store(&config.storage);
    let session_id = SessionIdentity::get_or_create(store.as_ref());
    let gateway = HttpGateway::new(server)?;
    debug!("Using session {} against {}", session_id, gateway.base_url());
    Ok(ChatController::new(gateway, session_id))
}

fn print_notification(notification: &Notification) {
    let line = format!("{}: {}", notification.title, notification.description);
    if notification.is_error() {
        println!("{}", format!("❌ {}", line).red());
    } else {
        println!("{}", format!("✅ {}", line).green());
    }
}

fn print_notifications<B: Backend>(controller: &ChatController<B>) {
    for notification in controller.take_notifications() {
        print_notification(&notification);
    }
}

/// `content` 中前 `printed` 字节之后的文本
fn unseen(content: &str, printed: usize) -> &str {
    content.get(printed..).unwrap_or("")
}

/// 发送消息，并在回答流式返回时逐段打印
async fn stream_answer<B: Backend>(
    controller: &ChatController<B>,
    message: &str,
) -> anyhow::Result<SendOutcome> {
    let mut changes = controller.subscribe();
    let send = controller.send_message(message);
    tokio::pin!(send);

    let mut printed = 0usize;
    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            Ok(()) = changes.changed() => {
                let state = controller.snapshot();
                if let Some(last) = state.messages.last().filter(|m| m.role == Role::Assistant) {
                    let fresh = unseen(&last.content, printed);
                    if !fresh.is_empty() {
                        print!("{}", fresh);
                        io::stdout().flush()?;
                        printed = last.content.len();
                    }
                }
            }
        }
    };

    if let SendOutcome::Completed { content, .. } = &outcome {
        print!("{}", unseen(content, printed));
        println!();
    }
    Ok(outcome)
}

async fn send_message(controller: &ChatController<HttpGateway>, message: &str) -> anyhow::Result<()> {
    if message.trim().is_empty() {
        anyhow::bail!("Message is empty");
    }

    let outcome = stream_answer(controller, message).await?;
    print_notifications(controller);
    match outcome {
        SendOutcome::Failed(err) => Err(err.into()),
        _ => Ok(()),
    }
}

async fn run_interactive_chat(
    controller: ChatController<HttpGateway>,
    logging: &mut LogManager,
) -> anyhow::Result<()> {
    let count = controller.initialize().await;

    println!("{}", "🤖 RAG Assistant Interactive Chat".cyan().bold());
    println!("{}", format!("Session ID: {}", controller.session_id()).dimmed());
    println!(
        "{}",
        format!("{} document{} loaded", count, if count == 1 { "" } else { "s" }).dimmed()
    );
    println!("{}", "Type /help for commands, 'exit' or 'quit' to leave".dimmed());
    println!();

    loop {
        print!("{} ", "You:".cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("{}", "👋 Goodbye!".cyan());
            break;
        }

        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            if let Err(e) = run_repl_command(&controller, logging, command).await {
                println!("{}", format!("❌ Error: {}", e).red());
            }
            println!();
            continue;
        }

        println!("{}", "Assistant:".green().bold());
        stream_answer(&controller, input).await?;
        print_notifications(&controller);
        println!();
    }

    Ok(())
}

async fn run_repl_command(
    controller: &ChatController<HttpGateway>,
    logging: &mut LogManager,
    command: &str,
) -> anyhow::Result<()> {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "docs" => {
            controller.initialize().await;
            print_documents(&controller.snapshot().documents);
        }
        "upload" if !arg.is_empty() => {
            let selection = collect_upload_files(arg).await?;
            report_skipped(&selection.skipped);
            if !selection.is_empty() {
                controller.handle_file_drop(selection.files).await;
            }
            print_notifications(controller);
        }
        "delete" if !arg.is_empty() => {
            controller.handle_delete_document(arg).await;
            print_notifications(controller);
        }
        "log" if !arg.is_empty() => {
            logging.update_level(arg)?;
            println!("{}", format!("Log level set to {}", logging.options().level).dimmed());
        }
        "suggest" => {
            for (idx, suggestion) in ragchat_core::SUGGESTIONS.iter().enumerate() {
                println!("  {} {}", format!("[{}]", idx + 1).cyan(), suggestion.title.bold());
                println!("      {}", suggestion.query.dimmed());
            }
        }
        _ => {
            if let Some(index) = name.parse::<usize>().ok().filter(|i| *i >= 1) {
                println!("{}", "Assistant:".green().bold());
                stream_suggestion(controller, index - 1).await?;
                print_notifications(controller);
            } else {
                println!("{}", "Commands:".bold());
                println!("  /docs            list documents");
                println!("  /upload <path>   upload a file or directory");
                println!("  /delete <id>     delete a document");
                println!("  /suggest         show suggested questions");
                println!("  /log <level>     change the log level");
                println!("  /<n>             ask suggested question n");
            }
        }
    }
    Ok(())
}

async fn stream_suggestion(
    controller: &ChatController<HttpGateway>,
    index: usize,
) -> anyhow::Result<()> {
    match ragchat_core::SUGGESTIONS.get(index) {
        Some(suggestion) => {
            println!("{}", format!("You: {}", suggestion.query).dimmed());
            stream_answer(controller, suggestion.query).await?;
            Ok(())
        }
        None => anyhow::bail!("No suggestion {}", index + 1),
    }
}

fn print_documents(documents: &[ragchat_client::Document]) {
    if documents.is_empty() {
        println!("{}", "No documents uploaded yet".dimmed());
        return;
    }

    println!("{}", format!("📚 {} document(s):", documents.len()).cyan().bold());
    for doc in documents {
        println!(
            "  {}  {}  {}  {}  {}",
            doc.id.yellow(),
            doc.name.bold(),
            doc.doc_type.as_str().to_uppercase().dimmed(),
            format_file_size(doc.size),
            doc.uploaded_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .dimmed()
        );
    }
}

fn report_skipped(skipped: &[String]) {
    for name in skipped {
        println!("{}", format!("⚠️  Skipping unsupported file: {}", name).yellow());
    }
}

async fn handle_docs(args: DocsArgs, controller: ChatController<HttpGateway>) -> anyhow::Result<()> {
    match args.command {
        DocsCommands::List => {
            let documents = controller
                .backend()
                .list_documents(controller.session_id())
                .await?;
            print_documents(&documents);
        }
        DocsCommands::Upload { paths } => {
            let selection = collect_from_paths(&paths).await?;
            report_skipped(&selection.skipped);
            if selection.is_empty() {
                anyhow::bail!("Nothing to upload");
            }

            println!(
                "{}",
                format!("🚀 Uploading {} file(s)...", selection.files.len()).cyan()
            );
            let outcome = controller.handle_file_drop(selection.files).await;
            for doc in &outcome.uploaded {
                println!("  {} {} ({})", doc.id.yellow(), doc.name, format_file_size(doc.size));
            }
            print_notifications(&controller);
            if !outcome.failed.is_empty() {
                for (name, err) in &outcome.failed {
                    eprintln!("{}", format!("   {}: {}", name, err).dimmed());
                }
                anyhow::bail!("{} upload(s) failed", outcome.failed.len());
            }
        }
        DocsCommands::Delete { id } => {
            let deleted = controller.handle_delete_document(&id).await;
            print_notifications(&controller);
            if !deleted {
                anyhow::bail!("Could not delete document {}", id);
            }
        }
    }
    Ok(())
}

fn handle_session(args: SessionArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.storage);
    match args.command {
        SessionCommands::Show => {
            let session_id = SessionIdentity::get_or_create(store.as_ref());
            println!("{}", session_id);
            if let Some(path) = &config.storage.state_file {
                println!("{}", format!("Stored in {}", path).dimmed());
            }
        }
        SessionCommands::Reset => {
            SessionIdentity::reset(store.as_ref())?;
            let session_id = SessionIdentity::get_or_create(store.as_ref());
            println!("{}", format!("✅ New session: {}", session_id).green());
            println!(
                "{}",
                "Documents uploaded under the old session are no longer listed".dimmed()
            );
        }
    }
    Ok(())
}

async fn handle_config(args: ConfigArgs, config_path: PathBuf) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Get { key } => {
            let manager = ConfigManager::load(&config_path).await?;
            let config = manager.snapshot().await;

            match config.get_value(&key) {
                Some(value) => {
                    println!("{}", format!("{} = {}", key, value).green());
                }
                None => {
                    anyhow::bail!("Key not found: {}", key);
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let manager = ConfigManager::load(&config_path).await?;
            manager.update(|config| config.set_value(&key, &value)).await?;
            println!("{}", format!("✅ Set {} = {}", key, value).green());
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                println!("{}", format!("⚠️  Config already exists at {:?}", config_path).yellow());
                println!("{}", "Use --force to overwrite".dimmed());
                return Ok(());
            }

            // 初始化目录
            ragchat_config::init_ragchat_dirs().await?;

            // 创建默认配置
            let manager = ConfigManager::new(Config::default(), config_path.clone());
            manager.save().await?;

            println!("{}", format!("✅ Config initialized at {:?}", config_path).green());
            println!("{}", "You can edit this file to customize your settings".dimmed());
        }
        ConfigCommands::Show => {
            let manager = ConfigManager::load(&config_path).await?;
            let config = manager.snapshot().await;

            println!("{}", "📋 Current Configuration:".cyan().bold());
            println!();

            // 显示为 JSON
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}
