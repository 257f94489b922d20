//! Catalog client backed by the iRODS icommands.
//!
//! Every capability is planned as a `CommandSpec` first (pure, testable) and
//! then executed with the account's environment file exported, so the
//! icommands talk to the same zone as the account this crate loaded. Failures
//! are turned into `CatalogError`s carrying the catalog status code parsed
//! from the command output.

use crate::acl::AccessLevel;
use crate::client::{CatalogClient, CatalogConnector, Row, TransferOptions, TransferReport};
use crate::config::{Account, ENV_FILE_VAR};
use crate::error::{CAT_NO_ROWS_FOUND, CatalogError};
use crate::paths::{CatalogPath, LocalPath};
use crate::query::{MetaQueryRequest, metadata_listing};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, trace};

pub const BIN_DIR_VAR: &str = "ICOMMANDS_BIN_DIR";

const COLUMN_SEPARATOR: &str = "\t";

/// Symbolic catalog status names that may appear without a numeric code.
const KNOWN_STATUS_NAMES: &[(&str, i32)] = &[
    ("CAT_NO_ROWS_FOUND", CAT_NO_ROWS_FOUND),
    ("CAT_NO_ACCESS_PERMISSION", -818_000),
    ("CAT_INVALID_USER", -827_000),
    ("USER_FILE_DOES_NOT_EXIST", -510_002),
    ("CAT_UNKNOWN_COLLECTION", -814_000),
    ("CAT_UNKNOWN_FILE", -817_000),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    fn new(program: OsString) -> Self {
        Self {
            program,
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn flag(self, enabled: bool, flag: &str) -> Self {
        if enabled { self.arg(flag) } else { self }
    }

    fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

pub struct IcommandsConnector {
    bin_dir: Option<PathBuf>,
}

impl IcommandsConnector {
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    /// Use `$ICOMMANDS_BIN_DIR` when set, otherwise resolve through `PATH`.
    pub fn from_env() -> Self {
        let bin_dir = env::var_os(BIN_DIR_VAR)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        Self::new(bin_dir)
    }
}

impl CatalogConnector for IcommandsConnector {
    type Client = IcommandsClient;

    fn connect(&self, account: &Account) -> Result<IcommandsClient, CatalogError> {
        if let Some(dir) = &self.bin_dir {
            if !dir.is_dir() {
                return Err(CatalogError::new(
                    None,
                    format!("{BIN_DIR_VAR} {} is not a directory", dir.display()),
                ));
            }
        }
        debug!(
            host = %account.host,
            zone = %account.zone,
            user = %account.user,
            "using icommands client"
        );
        Ok(IcommandsClient {
            bin_dir: self.bin_dir.clone(),
            env_file: account.env_file.clone(),
        })
    }
}

pub struct IcommandsClient {
    bin_dir: Option<PathBuf>,
    env_file: PathBuf,
}

impl IcommandsClient {
    fn program(&self, name: &str) -> OsString {
        match &self.bin_dir {
            Some(dir) => dir.join(name).into_os_string(),
            None => OsString::from(name),
        }
    }

    fn plan_upload(
        &self,
        local: &LocalPath,
        remote: &CatalogPath,
        options: &TransferOptions,
    ) -> CommandSpec {
        CommandSpec::new(self.program("iput"))
            .flag(options.checksum, "-k")
            .flag(options.verify, "-K")
            .flag(options.force, "-f")
            .flag(options.recursive, "-r")
            .arg(path_operand(&local.path))
            .arg(path_operand(&remote.path))
    }

    fn plan_download(
        &self,
        remote: &CatalogPath,
        local: &LocalPath,
        options: &TransferOptions,
    ) -> CommandSpec {
        CommandSpec::new(self.program("iget"))
            .flag(options.verify, "-K")
            .flag(options.force, "-f")
            .flag(options.recursive, "-r")
            .arg(path_operand(&remote.path))
            .arg(path_operand(&local.path))
    }

    /// `imeta add` or `imeta rm` with one exact attribute, value and units.
    fn plan_avu(
        &self,
        subcommand: &str,
        path: &CatalogPath,
        attribute: &str,
        value: &str,
        units: Option<&str>,
    ) -> Result<CommandSpec, CatalogError> {
        let spec = CommandSpec::new(self.program("imeta"))
            .arg(subcommand)
            .arg(entity_flag(path))
            .arg(path_operand(&path.path))
            .arg(plain_operand("attribute", attribute)?)
            .arg(plain_operand("value", value)?);
        Ok(match units.filter(|units| !units.is_empty()) {
            Some(units) => spec.arg(plain_operand("units", units)?),
            None => spec,
        })
    }

    fn plan_chmod(
        &self,
        path: &str,
        level: AccessLevel,
        owner: &str,
        zone: &str,
        recursive: bool,
    ) -> Result<CommandSpec, CatalogError> {
        Ok(CommandSpec::new(self.program("ichmod"))
            .flag(recursive, "-r")
            .arg(level.as_str())
            .arg(format!("{}#{zone}", plain_operand("owner", owner)?))
            .arg(path_operand(path)))
    }

    fn plan_query(&self, request: &MetaQueryRequest) -> CommandSpec {
        let format = vec!["%s"; request.select.len()].join(COLUMN_SEPARATOR);
        let spec = CommandSpec::new(self.program("iquest"));
        let spec = if request.zone.is_empty() {
            spec
        } else {
            spec.arg("-z").arg(&request.zone)
        };
        spec.arg("--no-page")
            .arg(format)
            .arg(request.to_genquery())
    }

    fn run(&self, spec: &CommandSpec) -> Result<String, CatalogError> {
        trace!(command = %spec.display(), "running icommand");
        let output = Command::new(&spec.program)
            .args(&spec.args)
            .env(ENV_FILE_VAR, &self.env_file)
            .output()
            .map_err(|err| {
                CatalogError::new(
                    None,
                    format!("failed to execute {}: {err}", spec.program.to_string_lossy()),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let code = parse_status_code(&detail);
        let message = if detail.is_empty() {
            format!("{} exited with {}", spec.display(), output.status)
        } else {
            format!("{} failed: {detail}", spec.display())
        };
        Err(CatalogError::new(code, message))
    }
}

impl CatalogClient for IcommandsClient {
    fn upload(
        &mut self,
        local: &LocalPath,
        remote: &CatalogPath,
        options: &TransferOptions,
    ) -> Result<TransferReport, CatalogError> {
        self.run(&self.plan_upload(local, remote, options))?;
        Ok(TransferReport {
            local: local.path.clone(),
            remote: remote.path.clone(),
        })
    }

    fn download(
        &mut self,
        remote: &CatalogPath,
        local: &LocalPath,
        options: &TransferOptions,
    ) -> Result<TransferReport, CatalogError> {
        self.run(&self.plan_download(remote, local, options))?;
        Ok(TransferReport {
            local: local.path.clone(),
            remote: remote.path.clone(),
        })
    }

    fn add_metadata(
        &mut self,
        path: &CatalogPath,
        attribute: &str,
        value: &str,
        units: Option<&str>,
    ) -> Result<(), CatalogError> {
        self.run(&self.plan_avu("add", path, attribute, value, units)?)
            .map(drop)
    }

    /// List the AVUs named exactly `attribute`, then remove each one by its
    /// full triple. `imeta rmw` is avoided since it matches by pattern.
    fn delete_metadata(&mut self, path: &CatalogPath, attribute: &str) -> Result<(), CatalogError> {
        let listing = metadata_listing(path, attribute)
            .map_err(|err| CatalogError::new(None, err.to_string()))?;
        let rows = match self.run_query(&listing) {
            Ok(rows) => rows,
            Err(err) if err.is_no_rows() => Vec::new(),
            Err(err) => return Err(err),
        };
        if rows.is_empty() {
            debug!(path = %path, attribute, "no metadata to remove");
        }
        for row in &rows {
            if let [value, units] = row.as_slice() {
                let units = Some(units.as_str()).filter(|units| !units.is_empty());
                self.run(&self.plan_avu("rm", path, attribute, value, units)?)?;
            }
        }
        Ok(())
    }

    fn change_collection_access(
        &mut self,
        path: &str,
        level: AccessLevel,
        owner: &str,
        zone: &str,
        recursive: bool,
    ) -> Result<(), CatalogError> {
        self.run(&self.plan_chmod(path, level, owner, zone, recursive)?)
            .map(drop)
    }

    fn change_data_object_access(
        &mut self,
        path: &str,
        level: AccessLevel,
        owner: &str,
        zone: &str,
    ) -> Result<(), CatalogError> {
        self.run(&self.plan_chmod(path, level, owner, zone, false)?)
            .map(drop)
    }

    fn run_query(&mut self, request: &MetaQueryRequest) -> Result<Vec<Row>, CatalogError> {
        let stdout = self.run(&self.plan_query(request))?;
        parse_query_output(&stdout, request.select.len())
    }
}

fn entity_flag(path: &CatalogPath) -> &'static str {
    if path.is_collection() { "-C" } else { "-d" }
}

/// Relative paths starting with `-` are passed as `./-...`.
fn path_operand(path: &str) -> String {
    if path.starts_with('-') {
        format!("./{path}")
    } else {
        path.to_string()
    }
}

/// The icommands read any argument starting with `-` as an option, so such
/// attributes, values, units and owners cannot be passed at all.
fn plain_operand<'a>(what: &str, text: &'a str) -> Result<&'a str, CatalogError> {
    if text.starts_with('-') {
        return Err(CatalogError::new(
            None,
            format!("{what} '{text}' starts with '-' and would be read as an icommand option"),
        ));
    }
    Ok(text)
}

/// Split iquest output into rows. iquest may report an empty result on
/// stdout with a zero exit status; that is surfaced as `CAT_NO_ROWS_FOUND`.
fn parse_query_output(stdout: &str, columns: usize) -> Result<Vec<Row>, CatalogError> {
    let mut rows = Vec::new();
    for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
        if rows.is_empty() && line.starts_with("CAT_NO_ROWS_FOUND") {
            return Err(CatalogError::no_rows(line.trim()));
        }
        let row: Row = line
            .splitn(columns.max(1), COLUMN_SEPARATOR)
            .map(str::to_string)
            .collect();
        if row.len() != columns {
            return Err(CatalogError::new(
                None,
                format!("malformed query output line: {line}"),
            ));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Recover a catalog status code from icommand output: an explicit
/// `status = -NNN`, any negative integer token, or a known status name.
fn parse_status_code(output: &str) -> Option<i32> {
    let tokens = output
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '[' | ']' | '(' | ')' | '='))
        .filter(|token| !token.is_empty());

    let mut named = None;
    for token in tokens {
        if let Ok(code) = token.parse::<i32>() {
            if code < 0 {
                return Some(code);
            }
        }
        if named.is_none() {
            named = KNOWN_STATUS_NAMES
                .iter()
                .find(|(name, _)| *name == token)
                .map(|(_, code)| *code);
        }
    }
    named
}
