//! Builds the `mysql` and `mysqldump` invocations for a [DatabaseSource].
//!
//! Inside a Docker container the credentials may name a variable of the
//! official MySQL image (e.g. `MYSQL_ROOT_PASSWORD`). Those are passed as
//! `"$VARIABLE"` so the shell of the container resolves them.

use std::path::Path;

use super::source::{Credentials, DatabaseSource};
use crate::util::ShellCommand;

/// Schemata of the server itself which are never dumped.
pub const EXCLUDED_SCHEMATA: [&str; 4] =
    ["information_schema", "mysql", "performance_schema", "sys"];

/// Session limit of `GROUP_CONCAT`, the server default of 1024 bytes would
/// silently cut off the schema list.
const GROUP_CONCAT_MAX_LEN: u32 = 1_048_576;

const COMPOSE_USER: &str = "MYSQL_USER";
const COMPOSE_PASSWORDS: [&str; 2] = ["MYSQL_ROOT_PASSWORD", "MYSQL_PASSWORD"];
const COMPOSE_NO_PASSWORD: &str = "MYSQL_ALLOW_EMPTY_PASSWORD";

/// Queries returning all user schemata as one space separated line.
pub fn schemata_query() -> String {
    let excluded = EXCLUDED_SCHEMATA
        .iter()
        .map(|schema| format!("'{schema}'"))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "SET SESSION group_concat_max_len = {GROUP_CONCAT_MAX_LEN}; \
         SELECT GROUP_CONCAT(schema_name SEPARATOR ' ') FROM information_schema.schemata \
         WHERE schema_name NOT IN ({excluded});"
    )
}

/// Command listing all user schemata of `source`.
pub fn list_schemata(source: &DatabaseSource) -> ShellCommand {
    let mysql = credentials(ShellCommand::new("mysql"), source)
        .literal("--skip-column-names")
        .literal("-e")
        .literal(format!("\"{}\"", schemata_query()));

    in_context(mysql, source)
}

/// Command dumping `schema` of `source` into `file`.
pub fn dump_schema(source: &DatabaseSource, schema: &str, file: &Path) -> ShellCommand {
    let mysqldump = credentials(ShellCommand::new("mysqldump"), source)
        .literal("--single-transaction")
        .arg(schema);

    in_context(mysqldump, source)
        .literal(">")
        .arg(file.to_string_lossy())
}

/// Extracts the schema names from the output of [list_schemata].
///
/// The first non-empty line holds the names. `NULL` means there are none.
pub fn parse_schemata(output: &[String]) -> Vec<String> {
    let first = output.iter().map(|line| line.trim()).find(|line| !line.is_empty());
    let Some(line) = first else {
        return Vec::new();
    };
    if line == "NULL" {
        return Vec::new();
    }

    line.split(' ')
        .filter(|schema| !schema.is_empty())
        .map(str::to_string)
        .collect()
}

fn in_context(command: ShellCommand, source: &DatabaseSource) -> ShellCommand {
    match source {
        DatabaseSource::Host { .. } => command,
        DatabaseSource::Docker { container, .. } => ShellCommand::new("docker")
            .literal("exec")
            .arg(container)
            .literal("sh")
            .literal("-c")
            .nested(command),
    }
}

fn credentials(command: ShellCommand, source: &DatabaseSource) -> ShellCommand {
    match source {
        DatabaseSource::Host { host, credentials } => {
            let command = if host.is_empty() {
                command
            } else {
                command.flag("-h", host)
            };
            host_credentials(command, credentials)
        }
        DatabaseSource::Docker { credentials, .. } => docker_credentials(command, credentials),
    }
}

fn host_credentials(command: ShellCommand, credentials: &Credentials) -> ShellCommand {
    let Credentials { user, password } = credentials;
    let command = if user.is_empty() {
        command
    } else {
        command.flag("-u", user)
    };

    if password.is_empty() {
        command
    } else {
        command.secret_flag("-p", password)
    }
}

fn docker_credentials(command: ShellCommand, credentials: &Credentials) -> ShellCommand {
    let Credentials { user, password } = credentials;
    let command = if user == COMPOSE_USER {
        command.literal(format!("-u\"${COMPOSE_USER}\""))
    } else if user.is_empty() {
        command
    } else {
        command.flag("-u", user)
    };

    if let Some(variable) = COMPOSE_PASSWORDS.iter().find(|var| **var == password.as_str()) {
        command.literal(format!("-p\"${variable}\""))
    } else if password.is_empty() || password == COMPOSE_NO_PASSWORD {
        command
    } else {
        command.secret_flag("-p", password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(password: &str) -> DatabaseSource {
        DatabaseSource::Host {
            host: "localhost".to_string(),
            credentials: Credentials {
                user: "root".to_string(),
                password: password.to_string(),
            },
        }
    }

    fn docker(user: &str, password: &str) -> DatabaseSource {
        DatabaseSource::Docker {
            container: "app-db".to_string(),
            credentials: Credentials {
                user: user.to_string(),
                password: password.to_string(),
            },
        }
    }

    #[test]
    fn query_excludes_exactly_the_system_schemata() {
        assert_eq!(
            schemata_query(),
            "SET SESSION group_concat_max_len = 1048576; \
             SELECT GROUP_CONCAT(schema_name SEPARATOR ' ') FROM information_schema.schemata \
             WHERE schema_name NOT IN ('information_schema','mysql','performance_schema','sys');"
        );
    }

    #[test]
    fn host_listing_escapes_credentials() {
        let script = list_schemata(&host("p@ss")).script();

        assert!(script.starts_with(
            "mysql -h'localhost' -u'root' -p'p@ss' --skip-column-names -e \"SET SESSION"
        ));
        for schema in EXCLUDED_SCHEMATA {
            assert!(script.contains(&format!("'{schema}'")));
        }
    }

    #[test]
    fn host_without_password_has_no_password_flag() {
        let script = list_schemata(&host("")).script();
        assert!(script.starts_with("mysql -h'localhost' -u'root' --skip-column-names"));
    }

    #[test]
    fn hostile_password_stays_data() {
        let dump = Path::new("app.shop.sql");
        let script = dump_schema(&host("x'; rm -rf / #"), "shop", dump).script();
        assert_eq!(
            script,
            r"mysqldump -h'localhost' -u'root' -p'x'\''; rm -rf / #' --single-transaction 'shop' > 'app.shop.sql'"
        );
    }

    #[test]
    fn password_is_masked_in_display() {
        let command = list_schemata(&host("p@ss"));
        assert!(!command.to_string().contains("p@ss"));
    }

    #[test]
    fn docker_substitutes_compose_variables() {
        let script = list_schemata(&docker("MYSQL_USER", "MYSQL_PASSWORD")).script();

        assert!(script.starts_with(
            r#"docker exec 'app-db' sh -c 'mysql -u"$MYSQL_USER" -p"$MYSQL_PASSWORD" --skip-column-names"#
        ));
        assert!(!script.contains("'MYSQL_PASSWORD'"));

        let script = list_schemata(&docker("root", "MYSQL_ROOT_PASSWORD")).script();
        assert!(script.contains(r#"-u'\''root'\'' -p"$MYSQL_ROOT_PASSWORD""#));
    }

    #[test]
    fn docker_allow_empty_password_drops_flag() {
        let script = list_schemata(&docker("root", "MYSQL_ALLOW_EMPTY_PASSWORD")).script();
        assert!(!script.contains("-p"));
        assert!(!script.contains("MYSQL_ALLOW_EMPTY_PASSWORD"));
    }

    #[test]
    fn docker_literal_password_is_escaped() {
        let script = list_schemata(&docker("root", "MYSQL_SECRET")).script();
        assert!(script.contains(r"-p'\''MYSQL_SECRET'\''"));
        assert!(!script.contains("$MYSQL_SECRET"));
    }

    #[test]
    fn docker_dump_redirects_on_the_host() {
        let source = docker("MYSQL_USER", "MYSQL_PASSWORD");
        let script = dump_schema(&source, "shop", Path::new("app.shop.sql")).script();
        assert_eq!(
            script,
            r#"docker exec 'app-db' sh -c 'mysqldump -u"$MYSQL_USER" -p"$MYSQL_PASSWORD" --single-transaction '\''shop'\''' > 'app.shop.sql'"#
        );
    }

    #[test]
    fn parses_first_non_empty_line() {
        let output = vec![
            String::new(),
            "shop blog  wiki".to_string(),
            "ignored".to_string(),
        ];
        assert_eq!(parse_schemata(&output), vec!["shop", "blog", "wiki"]);
    }

    #[test]
    fn parses_empty_results() {
        assert!(parse_schemata(&[]).is_empty());
        assert!(parse_schemata(&["NULL".to_string()]).is_empty());
        assert!(parse_schemata(&["   ".to_string()]).is_empty());
    }
}
