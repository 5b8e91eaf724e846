use serde::Deserialize;

fn default_debug_dump_dir() -> String {
    std::env::temp_dir()
        .join("plan-filter")
        .to_string_lossy()
        .into_owned()
}

fn default_debug_dumps() -> bool {
    true
}

fn default_filter_version() -> String {
    "1.0.0".into()
}

fn default_http_bind() -> String {
    "0.0.0.0".into()
}

fn default_http_port() -> u16 {
    8000
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Directory receiving model output that no parse strategy could handle.
    #[serde(default = "default_debug_dump_dir")]
    pub debug_dump_dir: String,
    #[serde(default = "default_debug_dumps")]
    pub debug_dumps: bool,
    #[serde(default = "default_filter_version")]
    pub filter_version: String,
    #[serde(default = "default_http_bind")]
    pub http_bind: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Comma separated list; empty means permissive CORS.
    #[serde(default)]
    pub cors_origins: String,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "DEBUG_DUMP_DIR",
        "DEBUG_DUMPS",
        "FILTER_VERSION",
        "HTTP_BIND",
        "HTTP_PORT",
        "CORS_ORIGINS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[serial]
    #[test]
    fn defaults_without_env() {
        clear_env();
        let s = Settings::new().unwrap();
        assert!(s.debug_dumps);
        assert_eq!(s.filter_version, "1.0.0");
        assert_eq!(s.http_port, 8000);
        assert!(s.debug_dump_dir.ends_with("plan-filter"));
        assert!(s.cors_origins().is_empty());
    }

    #[serial]
    #[test]
    fn reads_environment() {
        clear_env();
        std::env::set_var("DEBUG_DUMPS", "false");
        std::env::set_var("HTTP_PORT", "8101");
        std::env::set_var("DEBUG_DUMP_DIR", "/var/tmp/dumps");
        std::env::set_var("CORS_ORIGINS", "http://localhost:3000, http://127.0.0.1:3000,");
        let s = Settings::new().unwrap();
        clear_env();

        assert!(!s.debug_dumps);
        assert_eq!(s.http_port, 8101);
        assert_eq!(s.debug_dump_dir, "/var/tmp/dumps");
        assert_eq!(
            s.cors_origins(),
            vec!["http://localhost:3000".to_string(), "http://127.0.0.1:3000".to_string()]
        );
    }
}
