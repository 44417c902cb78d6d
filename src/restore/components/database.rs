// restoretool/src/restore/components/database.rs
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::warn;
use url::Url;

use super::{ComponentReport, ComponentRestorer};
use crate::errors::{RestoreError, Result};
use crate::restore::manifest::Component;
use crate::utils::find_executable;

pub const POSTGRES_DUMP: &str = "postgres_dump.sql";
pub const MYSQL_DUMP: &str = "mysql_dump.sql";
pub const MONGO_DUMP_DIR: &str = "mongodb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEngine {
    Postgres,
    MySql,
    MongoDb,
}

impl DatabaseEngine {
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "postgres" | "postgresql" => Some(DatabaseEngine::Postgres),
            "mysql" | "mariadb" => Some(DatabaseEngine::MySql),
            "mongodb" | "mongodb+srv" => Some(DatabaseEngine::MongoDb),
            _ => None,
        }
    }

    /// Resolves the engine from a connection string.
    ///
    /// Absent configuration and unknown schemes are `DatabaseEngine` errors, which callers
    /// treat as a skip rather than a failure.
    pub fn resolve(connection_string: Option<&str>) -> Result<(DatabaseEngine, Url)> {
        let raw = connection_string.ok_or_else(|| {
            RestoreError::DatabaseEngine("DATABASE_URL is not configured".to_string())
        })?;
        let url = Url::parse(raw).map_err(|e| {
            RestoreError::DatabaseEngine(format!("DATABASE_URL is not a valid URL: {}", e))
        })?;
        let engine = DatabaseEngine::from_scheme(url.scheme()).ok_or_else(|| {
            RestoreError::DatabaseEngine(format!("unsupported database scheme '{}'", url.scheme()))
        })?;
        Ok((engine, url))
    }

    fn program(self) -> &'static str {
        match self {
            DatabaseEngine::Postgres => "psql",
            DatabaseEngine::MySql => "mysql",
            DatabaseEngine::MongoDb => "mongorestore",
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatabaseEngine::Postgres => "postgres",
            DatabaseEngine::MySql => "mysql",
            DatabaseEngine::MongoDb => "mongodb",
        };
        f.write_str(name)
    }
}

/// Short description of the configured engine for the restore plan.
pub fn describe_engine(connection_string: Option<&str>) -> String {
    match DatabaseEngine::resolve(connection_string) {
        Ok((engine, url)) => format!("{} at {}", engine, redact_url(&url)),
        Err(e) => format!("will be skipped: {}", e),
    }
}

/// Connection URL with the password masked, safe to print.
pub fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    if redacted.password().is_some() {
        let _ = redacted.set_password(Some("****"));
    }
    redacted.to_string()
}

/// `Url` keeps userinfo and path percent-encoded; command-line clients want them raw.
fn decode(component: &str) -> String {
    percent_decode_str(component).decode_utf8_lossy().into_owned()
}

/// The connection URL without its password, plus the decoded password.
fn split_password(url: &Url) -> (Url, Option<String>) {
    let mut stripped = url.clone();
    let password = url.password().map(decode);
    if password.is_some() {
        let _ = stripped.set_password(None);
    }
    (stripped, password)
}

/// A fully prepared invocation of an engine's command-line client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    pub program: &'static str,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    /// File piped into the tool's stdin.
    pub stdin: Option<PathBuf>,
}

/// Builds the replay command for `engine` against the staged `database/` directory.
pub fn build_command(engine: DatabaseEngine, url: &Url, database_dir: &Path) -> Result<DumpCommand> {
    let require = |path: PathBuf| -> Result<PathBuf> {
        if path.exists() {
            Ok(path)
        } else {
            Err(RestoreError::DatabaseRestore(format!(
                "{} dump not found: {}",
                engine,
                path.display()
            )))
        }
    };

    match engine {
        DatabaseEngine::Postgres => {
            let dump = require(database_dir.join(POSTGRES_DUMP))?;
            let (url, password) = split_password(url);
            Ok(DumpCommand {
                program: engine.program(),
                args: vec![
                    "-X".into(), // Do not read psqlrc
                    "-q".into(),
                    "-v".into(),
                    "ON_ERROR_STOP=1".into(),
                    "-d".into(),
                    url.to_string(),
                    "-f".into(),
                    dump.display().to_string(),
                ],
                envs: password.map(|p| vec![("PGPASSWORD".to_string(), p)]).unwrap_or_default(),
                stdin: None,
            })
        }
        DatabaseEngine::MySql => {
            let dump = require(database_dir.join(MYSQL_DUMP))?;
            let database = decode(url.path().trim_start_matches('/'));
            if database.is_empty() {
                return Err(RestoreError::DatabaseRestore(
                    "MySQL connection string has no database name".to_string(),
                ));
            }
            let mut args = vec![
                format!("--host={}", url.host_str().unwrap_or("localhost")),
                format!("--port={}", url.port().unwrap_or(3306)),
            ];
            if !url.username().is_empty() {
                args.push(format!("--user={}", decode(url.username())));
            }
            args.push(database);
            let envs = split_password(url)
                .1
                .map(|p| vec![("MYSQL_PWD".to_string(), p)])
                .unwrap_or_default();
            Ok(DumpCommand { program: engine.program(), args, envs, stdin: Some(dump) })
        }
        DatabaseEngine::MongoDb => {
            let nested = database_dir.join(MONGO_DUMP_DIR);
            let dump_dir = if nested.is_dir() { nested } else { database_dir.to_path_buf() };
            Ok(DumpCommand {
                program: engine.program(),
                args: vec![
                    format!("--uri={}", url),
                    "--drop".into(),
                    dump_dir.display().to_string(),
                ],
                envs: Vec::new(),
                stdin: None,
            })
        }
    }
}

/// Executes a prepared command, failing on a missing tool or non-zero exit.
fn run_dump_command(dump: &DumpCommand) -> Result<()> {
    let program = find_executable(dump.program)
        .map_err(|e| RestoreError::DatabaseRestore(format!("{:#}", e)))?;

    let mut command = Command::new(program);
    command.args(&dump.args).envs(dump.envs.iter().cloned());
    if let Some(stdin_path) = &dump.stdin {
        let file = File::open(stdin_path).map_err(|e| {
            RestoreError::DatabaseRestore(format!("Failed to open {}: {}", stdin_path.display(), e))
        })?;
        command.stdin(Stdio::from(file));
    }

    let output = command.output().map_err(|e| {
        RestoreError::DatabaseRestore(format!("Failed to execute {}: {}", dump.program, e))
    })?;

    if !output.status.success() {
        return Err(RestoreError::DatabaseRestore(format!(
            "{} exited with {}.\nStdout: {}\nStderr: {}",
            dump.program,
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

pub struct DatabaseRestorer {
    connection_string: Option<String>,
}

impl DatabaseRestorer {
    pub fn new(connection_string: Option<String>) -> Self {
        DatabaseRestorer { connection_string }
    }
}

#[async_trait]
impl ComponentRestorer for DatabaseRestorer {
    fn component(&self) -> Component {
        Component::Database
    }

    fn continues_on_item_failure(&self) -> bool {
        true
    }

    async fn restore(&self, staged_root: &Path) -> Result<ComponentReport> {
        let (engine, url) = match DatabaseEngine::resolve(self.connection_string.as_deref()) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Skipping database restore: {}", e);
                eprintln!("⚠️ Skipping database restore: {}", e);
                return Ok(ComponentReport::skipped(Component::Database, e.to_string()));
            }
        };

        let database_dir = staged_root.join(Component::Database.staged_path());
        let dump = build_command(engine, &url, &database_dir)?;
        println!("Replaying {} dump into {} with {}...", engine, redact_url(&url), dump.program);

        let dump = tokio::task::spawn_blocking(move || run_dump_command(&dump).map(|_| dump))
            .await
            .map_err(|e| RestoreError::DatabaseRestore(format!("Task join error: {}", e)))??;

        println!("✓ {} restore completed with {}", engine, dump.program);
        Ok(ComponentReport { restored: 1, ..ComponentReport::new(Component::Database) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_scheme_dispatch() {
        assert_eq!(DatabaseEngine::from_scheme("postgresql"), Some(DatabaseEngine::Postgres));
        assert_eq!(DatabaseEngine::from_scheme("mysql"), Some(DatabaseEngine::MySql));
        assert_eq!(DatabaseEngine::from_scheme("mongodb+srv"), Some(DatabaseEngine::MongoDb));
        assert_eq!(DatabaseEngine::from_scheme("redis"), None);
    }

    #[test]
    fn test_unconfigured_and_unknown_are_engine_errors() {
        assert!(matches!(DatabaseEngine::resolve(None), Err(RestoreError::DatabaseEngine(_))));
        assert!(matches!(
            DatabaseEngine::resolve(Some("redis://localhost:6379")),
            Err(RestoreError::DatabaseEngine(_))
        ));
        assert!(matches!(
            DatabaseEngine::resolve(Some("not a url")),
            Err(RestoreError::DatabaseEngine(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_connection_string_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let report = DatabaseRestorer::new(None).restore(dir.path()).await.unwrap();
        assert!(report.skipped.is_some());
        assert_eq!(report.restored, 0);
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_skipped() {
        let dir = TempDir::new().unwrap();
        let restorer = DatabaseRestorer::new(Some("cassandra://db:9042/app".into()));
        let report = restorer.restore(dir.path()).await.unwrap();
        assert!(report.skipped.unwrap().contains("cassandra"));
    }

    #[tokio::test]
    async fn test_missing_dump_for_known_engine_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("database")).unwrap();
        let restorer = DatabaseRestorer::new(Some("postgres://app@db/app".into()));

        let err = restorer.restore(dir.path()).await.unwrap_err();
        assert!(matches!(err, RestoreError::DatabaseRestore(_)));
    }

    #[test]
    fn test_postgres_command_uses_psql_file_mode() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(POSTGRES_DUMP), "SELECT 1;").unwrap();

        let cmd = build_command(DatabaseEngine::Postgres, &url("postgres://u:p@db:5432/app"), dir.path()).unwrap();
        assert_eq!(cmd.program, "psql");
        assert!(cmd.args.windows(2).any(|w| w == ["-v", "ON_ERROR_STOP=1"]));
        assert_eq!(cmd.args.last().unwrap(), &dir.path().join(POSTGRES_DUMP).display().to_string());
        assert!(cmd.stdin.is_none());
    }

    #[test]
    fn test_postgres_password_goes_through_environment() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(POSTGRES_DUMP), "SELECT 1;").unwrap();

        let cmd = build_command(DatabaseEngine::Postgres, &url("postgres://u:p%40ss@db:5432/app"), dir.path()).unwrap();
        assert!(cmd.args.windows(2).any(|w| w == ["-d", "postgres://u@db:5432/app"]));
        assert!(cmd.args.iter().all(|a| !a.contains("p%40ss") && !a.contains("p@ss")));
        assert_eq!(cmd.envs, vec![("PGPASSWORD".to_string(), "p@ss".to_string())]);
    }

    #[test]
    fn test_mysql_command_pipes_dump_and_hides_password() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MYSQL_DUMP), "SELECT 1;").unwrap();

        let cmd = build_command(DatabaseEngine::MySql, &url("mysql://root:secret@db/shop"), dir.path()).unwrap();
        assert_eq!(cmd.args, vec!["--host=db", "--port=3306", "--user=root", "shop"]);
        assert_eq!(cmd.envs, vec![("MYSQL_PWD".to_string(), "secret".to_string())]);
        assert_eq!(cmd.stdin, Some(dir.path().join(MYSQL_DUMP)));
    }

    #[test]
    fn test_mysql_credentials_are_percent_decoded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MYSQL_DUMP), "SELECT 1;").unwrap();

        let cmd = build_command(
            DatabaseEngine::MySql,
            &url("mysql://app%40corp:p%40ss%3Aw0rd@db/shop%20eu"),
            dir.path(),
        )
        .unwrap();
        assert_eq!(cmd.args, vec!["--host=db", "--port=3306", "--user=app@corp", "shop eu"]);
        assert_eq!(cmd.envs, vec![("MYSQL_PWD".to_string(), "p@ss:w0rd".to_string())]);
    }

    #[test]
    fn test_mongo_command_drops_existing_data() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(MONGO_DUMP_DIR)).unwrap();

        let cmd = build_command(DatabaseEngine::MongoDb, &url("mongodb://db:27017"), dir.path()).unwrap();
        assert_eq!(cmd.program, "mongorestore");
        assert!(cmd.args.contains(&"--drop".to_string()));
        assert_eq!(cmd.args.last().unwrap(), &dir.path().join(MONGO_DUMP_DIR).display().to_string());
    }

    #[test]
    fn test_redact_url_masks_password() {
        assert_eq!(redact_url(&url("postgres://u:secret@db/app")), "postgres://u:****@db/app");
        assert_eq!(redact_url(&url("postgres://db/app")), "postgres://db/app");
    }
}
