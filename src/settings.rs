//! Connection settings and the `ewiz.toml` config file.
//!
//! ```toml
//! [connection]
//! host = "helpdesk.example.edu/ewws/"
//! port = 443
//! knowledge_base = "helpdesk"
//! login = "svc_ewiz"
//! password = "secret"
//! num_connections = 8
//!
//! [tables.ticket]
//! table = "tickets"
//! fields = [
//!     { name = "id", primary_key = true, editable = false },
//!     { name = "status", nullable = false },
//!     { name = "assigned_to", column = "assignee", prefix = "user:" },
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EwizError, EwizResult};
use crate::schema::{Field, Model};

/// Name of the config file looked up in the working and config directories.
pub const CONFIG_FILE: &str = "ewiz.toml";

/// Parameters shared by every request of one connection.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Host and path prefix, e.g. `helpdesk.example.edu/ewws/`.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub knowledge_base: String,
    pub login: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Width of the per-record read fan-out. Absent or 0 means sequential.
    #[serde(default)]
    pub num_connections: Option<usize>,
}

fn default_port() -> u16 {
    80
}

fn default_language() -> String {
    "en".to_string()
}

impl Settings {
    /// Create settings with the default port and language.
    pub fn new(
        host: impl Into<String>,
        knowledge_base: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            knowledge_base: knowledge_base.into(),
            login: login.into(),
            password: password.into(),
            language: default_language(),
            num_connections: None,
        }
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the fan-out width.
    pub fn num_connections(mut self, n: usize) -> Self {
        self.num_connections = Some(n);
        self
    }

    /// `https://` for port 443, `http://` for anything else.
    pub fn protocol(&self) -> &'static str {
        if self.port == 443 { "https://" } else { "http://" }
    }

    /// Fan-out width, `None` when reads must run one after another.
    pub fn fan_out(&self) -> Option<usize> {
        self.num_connections.filter(|n| *n > 0)
    }

    /// Check that every field a request URL needs is present.
    pub fn validate(&self) -> EwizResult<()> {
        let required = [
            ("host", &self.host),
            ("knowledge_base", &self.knowledge_base),
            ("login", &self.login),
            ("language", &self.language),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(EwizError::Config(format!("missing connection field '{}'", name)));
            }
        }
        Ok(())
    }
}

/// Field declaration as written in the config file.
#[derive(Debug, Clone, Deserialize)]
struct FieldDecl {
    name: String,
    column: Option<String>,
    #[serde(default)]
    prefix: String,
    #[serde(default = "default_true")]
    nullable: bool,
    #[serde(default = "default_true")]
    editable: bool,
    #[serde(default)]
    primary_key: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct ModelDecl {
    table: Option<String>,
    #[serde(default)]
    fields: Vec<FieldDecl>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    connection: Settings,
    #[serde(default)]
    tables: BTreeMap<String, ModelDecl>,
}

/// A parsed `ewiz.toml`.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub models: BTreeMap<String, Model>,
}

impl Config {
    /// Parse a config document.
    pub fn from_toml(content: &str) -> EwizResult<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let models = file
            .tables
            .into_iter()
            .map(|(name, decl)| {
                let table = decl.table.unwrap_or_else(|| name.clone());
                let fields = decl
                    .fields
                    .into_iter()
                    .map(|f| {
                        let mut field = Field::new(&f.name)
                            .prefix(f.prefix)
                            .nullable(f.nullable)
                            .editable(f.editable)
                            .primary_key(f.primary_key);
                        if let Some(column) = f.column {
                            field = field.column(column);
                        }
                        field
                    })
                    .collect();
                (name.clone(), Model::new(name, table, fields))
            })
            .collect();

        Ok(Self {
            settings: file.connection,
            models,
        })
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> EwizResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Find the config file: explicit path, `./ewiz.toml`, then the user config dir.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("ewiz").join(CONFIG_FILE))
            .filter(|p| p.exists())
    }

    /// Declared model for `name`, or an ad hoc one where every field is nullable and editable.
    pub fn model(&self, name: &str) -> Model {
        self.models
            .get(name)
            .cloned()
            .unwrap_or_else(|| Model::adhoc(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [connection]
        host = "helpdesk.example.edu/ewws/"
        port = 443
        knowledge_base = "helpdesk"
        login = "svc"
        password = "pw"
        num_connections = 4

        [tables.ticket]
        table = "tickets"
        fields = [
            { name = "id", primary_key = true, editable = false },
            { name = "status", nullable = false },
            { name = "assigned_to", column = "assignee", prefix = "user:" },
        ]
    "#;

    #[test]
    fn test_parse_config() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.settings.protocol(), "https://");
        assert_eq!(config.settings.language, "en");
        assert_eq!(config.settings.fan_out(), Some(4));

        let model = config.model("ticket");
        assert_eq!(model.table, "tickets");
        assert_eq!(model.pk().unwrap().column, "id");
        let assignee = model.field("assigned_to").unwrap();
        assert_eq!(assignee.column, "assignee");
        assert_eq!(assignee.prefix, "user:");
        assert!(!model.field("status").unwrap().nullable);
    }

    #[test]
    fn test_undeclared_model_is_adhoc() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let model = config.model("problems");
        assert_eq!(model.table, "problems");
        assert!(model.fields.is_empty());
    }

    #[test]
    fn test_protocol_follows_port() {
        let settings = Settings::new("h/", "kb", "me", "pw");
        assert_eq!(settings.protocol(), "http://");
        assert_eq!(settings.port(443).protocol(), "https://");
    }

    #[test]
    fn test_validate_names_missing_field() {
        let settings = Settings::new("h/", "", "me", "pw");
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, EwizError::Config(ref m) if m.contains("knowledge_base")));
    }

    #[test]
    fn test_zero_connections_is_sequential() {
        let settings = Settings::new("h/", "kb", "me", "pw").num_connections(0);
        assert_eq!(settings.fan_out(), None);
    }
}
