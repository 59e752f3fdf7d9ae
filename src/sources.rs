use anyhow::Result;

use crate::config::Config;

/// Print the configured connectors and a basic health indication.
pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<16} {:<40} HEALTHY", "CONNECTOR", "STATUS");

    match &config.connectors.filesystem {
        Some(fs_config) => {
            if fs_config.root.exists() {
                println!("{:<16} {:<40} true", "filesystem", "OK");
            } else {
                println!(
                    "{:<16} {:<40} false",
                    "filesystem", "NOT CONFIGURED (root does not exist)"
                );
            }
        }
        None => println!("{:<16} {:<40} false", "filesystem", "NOT CONFIGURED"),
    }

    match &config.connectors.confluence {
        Some(_) => {
            let creds = std::env::var("CONFLUENCE_API_USER").is_ok()
                && std::env::var("CONFLUENCE_API_TOKEN").is_ok();
            if creds {
                println!("{:<16} {:<40} true", "confluence", "OK");
            } else {
                println!(
                    "{:<16} {:<40} false",
                    "confluence", "MISSING CREDENTIALS (set CONFLUENCE_API_*)"
                );
            }
        }
        None => println!("{:<16} {:<40} false", "confluence", "NOT CONFIGURED"),
    }

    match &config.connectors.mantis {
        Some(_) => {
            if std::env::var("MANTIS_API_TOKEN").is_ok() {
                println!("{:<16} {:<40} true", "mantis", "OK");
            } else {
                println!(
                    "{:<16} {:<40} false",
                    "mantis", "MISSING CREDENTIALS (set MANTIS_API_TOKEN)"
                );
            }
        }
        None => println!("{:<16} {:<40} false", "mantis", "NOT CONFIGURED"),
    }

    Ok(())
}
