//! altlens - 图片替代文本生成与评论语气检查
//!
//! 端侧模型优先，云端模型兜底:
//! - Domain: image/, moderation/, task, prompts, heuristics
//! - Application: orchestrator, commands, ports
//! - Infrastructure: adapters (cloud, on_device), credentials, console, events, memory

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};

use altlens::application::{
    CredentialStorePort, DescribeImageCommand, HybridOrchestrator, InferenceCommandHandler,
    ModerateCommentCommand, OnDeviceCapabilityPort, OnDeviceExecutorPort,
};
use altlens::config::{load_config_from_path, print_config, AppConfig};
use altlens::domain::image::ImagePayload;
use altlens::domain::{AvailabilityStatus, InferenceTask};
use altlens::infrastructure::adapters::{
    GeminiExecutor, LocalRuntimeCapability, OnDeviceExecutor,
};
use altlens::infrastructure::credentials::{mask_key, FileCredentialStore};
use altlens::infrastructure::{
    ConsolePresenter, InMemoryCredentialStore, SingleTaskSource, TracingEventSink,
};

/// altlens - alt text and comment checks, on-device first with cloud fallback
#[derive(Parser)]
#[command(name = "altlens")]
#[command(about = "Generate image alt text and screen comments, on-device first with cloud fallback", long_about = None)]
struct Cli {
    /// Path to a configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate alt text for an image
    Describe {
        /// Image file (jpeg, png, webp, heic, heif)
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Check whether a comment is hostile or discouraging
    Moderate {
        /// Comment text
        text: String,

        /// Image the comment was left on
        #[arg(short, long, value_name = "IMAGE")]
        image: Option<PathBuf>,
    },
    /// Store the cloud API key
    SetKey {
        key: String,
    },
    /// Remove the stored cloud API key
    ClearKey,
    /// Show on-device availability and credential status
    Status,
    /// Download the on-device model
    Pull,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    print_config(&config);

    match cli.command {
        Commands::Describe { image } => {
            let image = ImagePayload::from_file(&image, config.image.max_bytes)?;
            run_task(&config, DescribeImageCommand { image }.into_task()).await?;
        }
        Commands::Moderate { text, image } => {
            let image_context = image
                .map(|path| ImagePayload::from_file(&path, config.image.max_bytes))
                .transpose()?;
            let task = ModerateCommentCommand {
                text,
                image_context,
            }
            .into_task()?;
            run_task(&config, task).await?;
        }
        Commands::SetKey { key } => {
            let store = FileCredentialStore::open(&config.credentials.path)?;
            store.save(&key)?;
            println!(
                "API key {} saved to {}",
                mask_key(key.trim()),
                store.path().display()
            );
        }
        Commands::ClearKey => {
            let store = FileCredentialStore::open(&config.credentials.path)?;
            store.clear()?;
            println!("API key removed");
        }
        Commands::Status => status(&config).await?,
        Commands::Pull => pull(&config).await?,
    }

    Ok(())
}

/// 初始化日志（RUST_LOG 优先于配置），输出到 stderr
fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},altlens={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// 环境变量中的 key 优先，否则使用凭证文件
fn credential_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CredentialStorePort>> {
    if let Some(key) = &config.credentials.api_key {
        return Ok(Arc::new(InMemoryCredentialStore::new(Some(key.clone()))));
    }
    Ok(Arc::new(FileCredentialStore::open(&config.credentials.path)?))
}

fn build_handler(
    config: &AppConfig,
) -> anyhow::Result<(InferenceCommandHandler, Arc<HybridOrchestrator>)> {
    let credentials = credential_store(config)?;
    let cloud = Arc::new(GeminiExecutor::new(config.cloud.client_config(), credentials)?);

    let on_device: Option<Arc<dyn OnDeviceExecutorPort>> = if config.on_device.enabled {
        let capability = Arc::new(LocalRuntimeCapability::new(
            config.on_device.runtime_config(),
        )?);
        Some(Arc::new(OnDeviceExecutor::new(
            capability,
            config.on_device.temperature,
        )))
    } else {
        None
    };

    let orchestrator = Arc::new(HybridOrchestrator::new(
        cloud,
        on_device,
        TracingEventSink::new().arc(),
        config.orchestrator_options(),
    ));
    let handler =
        InferenceCommandHandler::new(orchestrator.clone(), Arc::new(ConsolePresenter::new()));

    Ok((handler, orchestrator))
}

/// 执行单个任务；失败时以非零状态退出
async fn run_task(config: &AppConfig, task: InferenceTask) -> anyhow::Result<()> {
    let (handler, orchestrator) = build_handler(config)?;
    let source = SingleTaskSource::new(task);

    let Some(result) = handler.run_from_source(&source).await else {
        bail!("no task to run");
    };

    // 进程退出会中断后台下载，先等它完成
    if orchestrator.download_pending() {
        eprintln!("note: downloading the on-device model before exiting (Ctrl-C to stop)");
        orchestrator.wait_for_download().await;
    }

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn status(config: &AppConfig) -> anyhow::Result<()> {
    match credential_store(config)?.get_credential() {
        Some(key) => println!("api key: {}", mask_key(&key)),
        None => println!("api key: not set"),
    }

    if !config.on_device.enabled {
        println!("on-device: disabled");
        return Ok(());
    }

    let capability = LocalRuntimeCapability::new(config.on_device.runtime_config())?;
    let availability = capability.probe_availability().await;
    println!(
        "on-device: {} ({} at {})",
        availability, config.on_device.model, config.on_device.endpoint
    );
    Ok(())
}

async fn pull(config: &AppConfig) -> anyhow::Result<()> {
    // 显式执行 pull 即视为用户激活
    let mut runtime = config.on_device.runtime_config();
    runtime.allow_download = true;
    let executor = OnDeviceExecutor::new(
        Arc::new(LocalRuntimeCapability::new(runtime)?),
        config.on_device.temperature,
    );

    match executor.availability().await {
        AvailabilityStatus::Ready => {
            println!("{} is already installed", config.on_device.model);
            return Ok(());
        }
        AvailabilityStatus::Unsupported => {
            bail!(
                "no local model runtime reachable at {}",
                config.on_device.endpoint
            );
        }
        _ => {}
    }

    println!("pulling {} ...", config.on_device.model);
    executor.start_download().await?;
    println!("{} is ready", config.on_device.model);
    Ok(())
}
