//! Text RPG with an AI narrator.
//!
//! Reads one action per line from stdin and prints the outcome:
//!
//! ```bash
//! cargo run -p rpg -- --name Thorin --provider groq
//! ```
//!
//! Without an API key for the chosen provider the game still runs, using
//! canned narration.

mod headless;

use rpg_core::SessionConfig;
use std::io;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = headless::parse_config_from_args(&args, SessionConfig::from_env()?)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    headless::run_headless(config, stdin.lock(), &mut stdout).await?;
    Ok(())
}

fn print_help() {
    println!("rpg - text adventure with an AI narrator");
    println!();
    println!("USAGE:");
    println!("  rpg [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help             Show this help message");
    println!("  --name <NAME>          Name for a new character (default: Adventurer)");
    println!("  --user <ID>            Save slot to load or create (default: $RPG_USER or player)");
    println!("  --save-dir <DIR>       Directory for save files (default: $RPG_SAVE_DIR or saves)");
    println!("  --provider <PROVIDER>  groq, openrouter or none (default: $RPG_PROVIDER or groq)");
    println!("  --model <MODEL>        Model override for the provider");
    println!("  --seed <N>             Fixed seed for reproducible rolls");
    println!();
    println!("ENVIRONMENT:");
    println!("  GROQ_API_KEY, OPENROUTER_API_KEY   Provider credentials");
    println!("  RUST_LOG                           Log filter, e.g. rpg_core=debug");
    println!();
    println!("INPUT:");
    println!("  Each line is an action followed by details, e.g. `move north`,");
    println!("  `attack goblin`, `use health potion`, `talk innkeeper`.");
    println!("  #status, #reset, #help and #quit are game commands.");
    println!();
    println!("EXAMPLES:");
    println!("  rpg --name Thorin");
    println!("  rpg --user alice --provider none --seed 42");
}
