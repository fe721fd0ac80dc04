use debridstream::config::{Config, ConfigError};
use debridstream::pipeline::Resolver;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  debridstream movie <imdb-id>");
    eprintln!("  debridstream tv <title> <season> <episode>");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            if let ConfigError::NotFound(path) = &e {
                eprintln!("\nCreate a config file at: {}", path.display());
                eprintln!("\nExample config.toml:");
                eprintln!(
                    r#"
[jackett]
url = "http://localhost:9117/api/v2.0/indexers/all/results/torznab"
apikey = "your-api-key"

[debrid]
token = "your-debrid-token"
"#
                );
            }
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let resolver = Resolver::new(&config);

    let result = match args.first().map(String::as_str) {
        Some("movie") if args.len() == 2 => resolver.resolve_movie(&args[1]).await,
        Some("tv") if args.len() == 4 => {
            let (season, episode) = match (args[2].parse(), args[3].parse()) {
                (Ok(s), Ok(e)) => (s, e),
                _ => {
                    eprintln!("season and episode must be numbers");
                    std::process::exit(2);
                }
            };

            match resolver.resolve_series(&args[1]).await {
                Ok(transfer) => resolver.resolve_episode(&transfer, season, episode).await,
                Err(e) => Err(e),
            }
        }
        _ => {
            print_usage();
            std::process::exit(2);
        }
    };

    match result {
        Ok(manifest) => {
            println!("{}", manifest.dash_url);
            println!("duration: {}s", manifest.duration);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
