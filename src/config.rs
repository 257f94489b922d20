//! iRODS environment file discovery and the account it describes.

use crate::error::{BatonError, Result};
use crate::paths::clean_path;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_FILE_VAR: &str = "IRODS_ENVIRONMENT_FILE";
pub const ENV_FILE_DEFAULT: &str = "~/.irods/irods_environment.json";

/// Connection identity read from the environment file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub host: String,
    pub port: u16,
    pub zone: String,
    pub user: String,
    pub default_resource: Option<String>,
    pub env_file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct EnvironmentFile {
    irods_host: String,
    irods_port: u16,
    irods_zone_name: String,
    irods_user_name: String,
    #[serde(default)]
    irods_default_resource: Option<String>,
}

/// Environment file path: `$IRODS_ENVIRONMENT_FILE`, else the default under
/// the home directory. A leading `~` expands to `$HOME` (or `.` without one).
pub fn environment_file_path() -> PathBuf {
    let raw = match env::var(ENV_FILE_VAR) {
        Ok(value) if !value.is_empty() => value,
        _ => ENV_FILE_DEFAULT.to_string(),
    };
    let home = env::var("HOME").ok().filter(|home| !home.is_empty());
    expand_home(&raw, home.as_deref())
}

fn expand_home(raw: &str, home: Option<&str>) -> PathBuf {
    let cleaned = clean_path(raw);
    match cleaned.strip_prefix('~') {
        Some(rest) => PathBuf::from(format!("{}{rest}", home.unwrap_or("."))),
        None => PathBuf::from(cleaned),
    }
}

pub fn load_account(path: &Path) -> Result<Account> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(BatonError::MissingArgument(format!(
                "iRODS environment file {} not found; set {ENV_FILE_VAR}",
                path.display()
            )));
        }
        Err(err) => return Err(err.into()),
    };
    if metadata.is_dir() {
        return Err(BatonError::invalid(format!(
            "iRODS environment file {} is a directory",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path)?;
    let parsed: EnvironmentFile = serde_json::from_str(&contents).map_err(|err| {
        BatonError::invalid(format!(
            "iRODS environment file {} is not usable: {err}",
            path.display()
        ))
    })?;

    let account = Account {
        host: parsed.irods_host,
        port: parsed.irods_port,
        zone: parsed.irods_zone_name,
        user: parsed.irods_user_name,
        default_resource: parsed.irods_default_resource.filter(|r| !r.is_empty()),
        env_file: path.to_path_buf(),
    };
    info!(
        host = %account.host,
        port = account.port,
        zone = %account.zone,
        user = %account.user,
        env_file = %path.display(),
        "loaded iRODS environment file"
    );
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn tilde_expands_to_home() {
        assert_eq!(
            expand_home("~/.irods/irods_environment.json", Some("/home/u")),
            PathBuf::from("/home/u/.irods/irods_environment.json")
        );
        assert_eq!(
            expand_home("~/.irods//env.json", None),
            PathBuf::from("./.irods/env.json")
        );
        assert_eq!(
            expand_home("/etc/irods/env.json", Some("/home/u")),
            PathBuf::from("/etc/irods/env.json")
        );
    }

    #[test]
    fn loads_account_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("irods_environment.json");
        fs::write(
            &path,
            r#"{"irods_host": "irods.example", "irods_port": 1247,
                "irods_zone_name": "testZone", "irods_user_name": "alice",
                "irods_default_resource": "", "irods_authentication_scheme": "native"}"#,
        )
        .unwrap();

        let account = load_account(&path).unwrap();
        assert_eq!(account.host, "irods.example");
        assert_eq!(account.port, 1247);
        assert_eq!(account.zone, "testZone");
        assert_eq!(account.user, "alice");
        assert_eq!(account.default_resource, None);
        assert_eq!(account.env_file, path);
    }

    #[test]
    fn missing_file_is_missing_argument() {
        let dir = TempDir::new().unwrap();
        let err = load_account(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
    }

    #[test]
    fn directory_or_garbage_is_invalid() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            load_account(dir.path()).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        let path = dir.path().join("env.json");
        fs::write(&path, r#"{"irods_host": "h"}"#).unwrap();
        assert_eq!(load_account(&path).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}
