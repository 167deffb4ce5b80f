use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Bond Brightly chat server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "bond-server", version, about = "Paired-friend chat server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "BOND_PORT", default_value = "3000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "BOND_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./bond.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "BOND_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (SQLite database)
    #[arg(long, env = "BOND_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Allowed CORS origins for the web client (comma-separated)
    #[arg(
        long,
        env = "BOND_CORS_ORIGIN",
        value_delimiter = ',',
        default_values_t = default_cors_origins()
    )]
    pub cors_origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:8080".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: "0.0.0.0".to_string(),
            config: "./bond.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (BOND_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("BOND_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Bond Brightly Server Configuration
# Place this file at ./bond.toml or specify with --config <path>
# All settings can be overridden via environment variables (BOND_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 3000)
# port = 3000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite database
# data_dir = "./data"

# Allowed CORS origins for the web client
# cors_origins = ["http://localhost:8080", "http://localhost:5173"]
"#
    .to_string()
}
