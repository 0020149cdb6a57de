use anyhow::Context;
use clap::Parser;
use vitibrasil_etl::core::ConfigProvider;
use vitibrasil_etl::utils::error::{EtlError, ErrorSeverity};
use vitibrasil_etl::utils::{logger, validation::Validate};
use vitibrasil_etl::{CliConfig, EtlEngine, HttpFetcher, LocalStorage, ScrapePipeline, TomlConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting vitibrasil-etl");

    let result = match args.config.clone() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let config = TomlConfig::from_file(&path)
                .with_context(|| format!("Failed to load config file '{}'", path))?;
            run(config).await
        }
        None => {
            if args.verbose {
                tracing::debug!("CLI config: {:?}", args);
            }
            run(args).await
        }
    };

    match result {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}

async fn run<C>(config: C) -> Result<String, EtlError>
where
    C: ConfigProvider + Validate + 'static,
{
    config.validate()?;
    tracing::info!(
        "🔧 {} for years {:?} ({} concurrent requests)",
        config.kind(),
        config.years(),
        config.concurrent_requests()
    );

    let fetcher = HttpFetcher::from_config(&config)?;
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = ScrapePipeline::new(fetcher, storage, config)?;

    EtlEngine::new(pipeline).run().await
}
