use derive_more::{Display, Error};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_USER: &str = "root";

/// Where the MySQL server of a [Database](super::Database) is reachable.
///
/// Selected once from the `source.type` configuration key (`host` by default).
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "RawSource")]
pub enum DatabaseSource {
    /// The `mysql` client of the host connects to `host`.
    Host {
        host: String,
        credentials: Credentials,
    },
    /// The client inside a running container is used.
    Docker {
        container: String,
        credentials: Credentials,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl DatabaseSource {
    pub fn credentials(&self) -> &Credentials {
        match self {
            Self::Host { credentials, .. } | Self::Docker { credentials, .. } => credentials,
        }
    }
}

impl Default for DatabaseSource {
    fn default() -> Self {
        Self::Host {
            host: DEFAULT_HOST.to_string(),
            credentials: Credentials {
                user: DEFAULT_USER.to_string(),
                password: String::new(),
            },
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum SourceType {
    #[default]
    Host,
    Docker,
}

#[derive(Debug, serde::Deserialize)]
struct RawSource {
    #[serde(default, rename = "type")]
    kind: SourceType,
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    container: Option<String>,
}

/// A docker source without container name.
#[derive(Debug, Display, Error)]
#[display("database source of type \"docker\" requires a \"container\"")]
pub struct MissingContainer;

impl TryFrom<RawSource> for DatabaseSource {
    type Error = MissingContainer;

    fn try_from(raw: RawSource) -> Result<Self, Self::Error> {
        let credentials = Credentials {
            user: raw.user.unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: raw.password.unwrap_or_default(),
        };

        match raw.kind {
            SourceType::Host => Ok(Self::Host {
                host: raw.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                credentials,
            }),
            SourceType::Docker => {
                let container = raw
                    .container
                    .filter(|container| !container.is_empty())
                    .ok_or(MissingContainer)?;
                Ok(Self::Docker {
                    container,
                    credentials,
                })
            }
        }
    }
}
