mod analyzer;
mod directory;
mod error;
mod loader;
mod models;
mod pipeline;
mod table;

use anyhow::Result;
use clap::{Arg, Command};
use directory::LdapDirectory;
use loader::TableLoader;
use models::Config;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let matches = Command::new("org-code-numbers")
        .version("0.1")
        .about("Counts members with library privileges per organizational code")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("org_code_numbers.toml"),
        )
        .arg(
            Arg::new("org-url")
                .long("org-url")
                .value_name("URL")
                .help("CSV location of the organization code table (overrides config)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Report output file (overrides config)"),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("org_code_numbers.toml");

    // Load or create configuration
    let mut config = if Path::new(config_file).exists() {
        info!("Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        println!("⚠️  Please edit {} and set org_url and the ldap section, then run the program again.", config_file);
        return Ok(());
    };

    if let Some(url) = matches.get_one::<String>("org-url") {
        config.org_url = url.clone();
    }
    if let Some(output) = matches.get_one::<String>("output") {
        config.output_file = output.clone();
    }
    config.apply_env_overrides();
    config.validate()?;

    let loader = TableLoader::new(
        &config.org_code_column,
        Duration::from_secs(config.fetch_timeout_secs),
    );
    let mut directory = LdapDirectory::connect(&config.ldap, &config.groups).await?;

    let summary = pipeline::run(
        &config.org_url,
        Path::new(&config.output_file),
        &loader,
        &mut directory,
    )
    .await?;
    directory.close().await?;

    println!("✅ Report complete: {} rows → {}", summary.rows, summary.output.display());
    Ok(())
}
