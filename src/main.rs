use clap::Parser;
use colored::{control::set_override, Colorize};
use is_terminal::IsTerminal;

use skycast::api::WeatherApi;
use skycast::cli::args::{Cli, Commands, CompletionsArgs, OutputFormat};
use skycast::cli::commands::{self, Context};
use skycast::config::{Config, Paths};
use skycast::error::Error;
use skycast::hooks::Hooks;
use skycast::query::{ClientOptions, QueryClient};

#[tokio::main]
async fn main() {
    // Respect NO_COLOR environment variable (https://no-color.org/)
    // Also disable colors when stdout is not a terminal (for piping)
    if std::env::var("NO_COLOR").is_ok() || !std::io::stdout().is_terminal() {
        set_override(false);
    }

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("skycast={}", cli.log_level()).into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    // Handle completions command early (no config or client needed)
    if let Commands::Completions(CompletionsArgs { shell }) = &cli.command {
        Cli::print_completions(*shell);
        return Ok(());
    }

    let paths = Paths::new()?;
    let mut config = Config::load_from(&paths)?;
    let format = cli
        .output
        .unwrap_or_else(|| OutputFormat::from_config(&config.output.format));

    if let Commands::Config(args) = &cli.command {
        let output = commands::config(&mut config, &paths, args, format)?;
        print(&output);
        return Ok(());
    }

    let client = QueryClient::new(ClientOptions {
        retry: config.cache.retry_policy(),
    });
    let api = WeatherApi::new(&config)?;
    let ctx = Context {
        hooks: Hooks::new(client.clone(), api),
        config,
        format,
    };

    let result = match &cli.command {
        Commands::Current(args) => commands::current(&ctx, args).await,
        Commands::Forecast(args) => commands::forecast(&ctx, args).await,
        Commands::History(args) => commands::history(&ctx, args).await,
        Commands::Compare(args) => commands::compare(&ctx, args).await,
        Commands::Marine(args) => commands::marine(&ctx, args).await,
        Commands::Flood(args) => commands::flood(&ctx, args).await,
        Commands::Air(args) => commands::air(&ctx, args).await,
        Commands::Search(args) => commands::search(&ctx, args).await,
        Commands::Config(_) | Commands::Completions(_) => unreachable!(), // Handled above
    };
    client.dispose();

    print(&result?);
    Ok(())
}

fn print(output: &str) {
    if !output.is_empty() {
        println!("{output}");
    }
}
