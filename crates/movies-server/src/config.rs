use std::path::PathBuf;

pub use clap::Parser;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about = "REST API server for the movie catalogue")]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 1234,
        env = "MOVIES_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "MOVIES_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "MOVIES_BASE_URL",
        default_value = "http://localhost:1234",
        help = "Base URL of server, as visible to clients"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "MOVIES_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/movies.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "MOVIES_DATA_DIR",
        help = "Data directory (database), default is system default like ~/.local/share/movies",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "MOVIES_MAX_CONNECTIONS",
        default_value_t = movies_dal::DEFAULT_MAX_CONNECTIONS,
        help = "Maximum number of pooled database connections"
    )]
    pub max_connections: u32,

    #[arg(
        long,
        env = "MOVIES_NO_MIGRATE",
        help = "Do not apply database migrations on start"
    )]
    pub no_migrate: bool,

    #[arg(long, env = "MOVIES_NO_CORS", help = "Disable CORS")]
    pub no_cors: bool,

    #[arg(
        long = "allowed-origin",
        env = "MOVIES_ALLOWED_ORIGINS",
        value_delimiter = ',',
        help = "Origin allowed by CORS, can be used multiple times, if none is given any origin is allowed"
    )]
    pub allowed_origins: Vec<String>,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("movies"))
        .unwrap_or_else(|| PathBuf::from("movies"))
        .to_string_lossy()
        .to_string()
}

impl ServerConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/movies.db", self.data_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config =
            ServerConfig::try_parse_from(["movies-server", "--data-dir", "/tmp/movies-test"])
                .unwrap();
        assert_eq!(config.port, 1234);
        assert_eq!(config.listen_address, "127.0.0.1");
        assert_eq!(config.database_url(), "sqlite:///tmp/movies-test/movies.db");
        assert!(!config.no_cors);
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn test_explicit_values() {
        let config = ServerConfig::try_parse_from([
            "movies-server",
            "--port",
            "8080",
            "--database-url",
            "sqlite::memory:",
            "--allowed-origin",
            "http://localhost:8080,https://movies.com",
            "--allowed-origin",
            "http://localhost:1234",
            "--no-migrate",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(
            config.allowed_origins,
            vec![
                "http://localhost:8080",
                "https://movies.com",
                "http://localhost:1234"
            ]
        );
        assert!(config.no_migrate);
    }
}
