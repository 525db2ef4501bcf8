use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Who may cast Round-2 votes, besides the never-for-yourself rule.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Round2VoterPolicy {
    /// Only Round-1 advancers vote in the final.
    FinalistsOnly,
    /// Every non-disqualified entrant votes in the final.
    AllEntrants,
}

/// Engine knobs kept out of the engine itself: group sizing, how many
/// entries advance per group, and the Round-2 electorate policy.
#[derive(Debug, Deserialize, Clone)]
pub struct VotingConfig {
    pub target_group_size: u32,
    pub round1_advancers_per_group: u32,
    pub round2_voter_policy: Round2VoterPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub voting: VotingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("voting.target_group_size", 20)?
            .set_default("voting.round1_advancers_per_group", 3)?
            .set_default("voting.round2_voter_policy", "all_entrants")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., MIXOFF__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("MIXOFF").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
