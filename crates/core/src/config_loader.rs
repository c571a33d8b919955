use crate::config::ForgeConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging TOML and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<ForgeConfig> {
        let config: ForgeConfig = Figment::new()
            .merge(Toml::file("config/Config.toml"))
            .merge(Env::prefixed("QF_"))
            .extract()?;

        Ok(config)
    }

    /// Loads application configuration with a specific profile.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<ForgeConfig> {
        let config: ForgeConfig = Figment::new()
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed("QF_"))
            .extract()?;

        Ok(config)
    }
}
