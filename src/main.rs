use changescope::args::{Args, Command};
use changescope::config::AppConfig;
use changescope::errors::AppError;
use changescope::handlers::analyze::handle_analyze;
use changescope::logging::{init_logging, LoggingConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    if let Err(e) = init_logging(LoggingConfig::for_verbosity(args.verbose)) {
        eprintln!("日志初始化失败: {}", e);
    }

    let config = AppConfig::load()?;

    match args.command {
        Command::Analyze(analyze_args) => handle_analyze(&config, analyze_args).await?,
    }

    Ok(())
}
