mod manager;

pub use manager::{
    ConfigFile, ConfigManager, GeneralConfig, ProcessingConfig, ProviderConfig, ResolveOptions,
    ResolvedConfig, resolve_config,
};
