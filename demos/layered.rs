use dragon_config::{AppContext, ConfigError, ConfigManager, DotEnv, EnvSource, FileSource};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), dragon_config::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // baseline -> local file -> DEMO_* env vars -> command line
    let manager = ConfigManager::builder("demos/basic.yml")
        .with_source(FileSource::new("demos/local.toml"))
        .with_source(
            EnvSource::new()
                .with_prefix("DEMO_")
                .with_dotenv(DotEnv::Discover),
        )
        .build()?;

    match manager.get_cli_args(std::env::args().skip(1)) {
        Err(ConfigError::Cli(e)) => e.exit(),
        other => other?,
    }
    manager.load()?;

    let ctx = AppContext::builder().with_config(manager).build()?;
    let config = ctx.config();

    for param in config.parameters() {
        let value = param
            .value()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unset>".to_string());
        println!("{:<14} {:<6} {}", param.name(), param.kind(), value);
    }

    let port: u16 = config.get_as("port")?;
    println!("listening on {port}");

    Ok(())
}
