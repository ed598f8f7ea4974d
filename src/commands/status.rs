//! Status command: configuration summary and server reachability.

use fitquest_core::check_server;

use crate::config::Config;

/// Prints the configured server and whether it answers `/health`.
pub async fn show_status(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Server Status");
    println!("=============");
    println!();

    println!("Server:    {}", config.server_url.value);
    match config.api_key_hint() {
        Some(hint) => println!("API Key:   {}", hint),
        None => println!("API Key:   (not set)"),
    }
    println!(
        "Sound:     {}",
        if config.sound.value {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();

    print!("Server status: ");
    if check_server(&config.server_url.value).await {
        println!("✓ reachable");
    } else {
        println!("✗ unreachable");
        println!();
        println!("Set the server in your config file:");
        println!();
        println!("  server_url: \"http://localhost:3000\"");
        println!("  api_key: \"your-api-key\"");
        println!();
        println!("Or set environment variables:");
        println!("  FITQUEST_SERVER_URL");
        println!("  FITQUEST_API_KEY");
    }

    Ok(())
}
