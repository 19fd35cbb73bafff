use std::fs;

use sysbackup_lib::backends::database::DatabaseSource;
use sysbackup_lib::backends::Backup;
use sysbackup_lib::config::{Configuration, ConfigurationError, Mode};

#[test]
fn manager_configuration_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manager.json");
    fs::write(
        &path,
        r#"{
            "mode": "manager",
            "language": "de_DE",
            "target": {"directory": "/var/backups"},
            "sources": {
                "servers": [
                    {
                        "name": "web",
                        "host": "192.168.0.10",
                        "source": "/backup",
                        "target": null,
                        "ssh": {
                            "user": "backupuser",
                            "key": "/root/.ssh/id_rsa",
                            "passphrase": "secret"
                        }
                    },
                    {
                        "name": "mail",
                        "host": "mail.example.org",
                        "source": "/backup",
                        "disabled": "yes",
                        "ssh": {"key": "/root/.ssh/id_rsa"}
                    }
                ]
            }
        }"#,
    )
    .unwrap();

    let config = Configuration::load(&path).unwrap();

    assert_eq!(config.mode, Mode::Manager);
    assert_eq!(config.language.as_deref(), Some("de_DE"));
    let servers = &config.sources.servers;
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0].target, "/");
    assert_eq!(servers[0].ssh.port, 22);
    assert_eq!(servers[1].ssh.user, "root");
    assert!(servers[1].is_disabled());
}

#[test]
fn docker_source_requires_container() {
    let err = Configuration::from_json(
        r#"{"mode": "agent", "target": {"directory": "/b"},
            "sources": {"databases": [{"name": "app", "source": {"type": "docker"}}]}}"#,
    )
    .unwrap_err();

    assert!(matches!(err, ConfigurationError::Json(_)));
}

#[test]
fn database_source_defaults_to_local_host() {
    let config = Configuration::from_json(
        r#"{"mode": "agent", "target": {"directory": "/b"},
            "sources": {"databases": [{"name": "app"}]}}"#,
    )
    .unwrap();

    assert_eq!(config.sources.databases[0].source, DatabaseSource::default());
}

#[test]
fn unsafe_server_values_are_rejected() {
    let config = Configuration::from_json(
        r#"{"mode": "manager", "target": {"directory": "/b"},
            "sources": {"servers": [{"name": "web", "host": "web; rm -rf /", "source": "/backup",
                                     "ssh": {"key": "/root/.ssh/id_rsa"}}]}}"#,
    )
    .unwrap();

    assert!(matches!(
        config.validate(),
        Err(ConfigurationError::InvalidTask { .. })
    ));
}
