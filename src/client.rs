//! Seam between the operation handlers and the external catalog client.
//!
//! Handlers only see `CatalogClient`; how bytes move and how queries reach
//! the server belongs to the implementation (see `icommands`). A `Session`
//! owns the single connection and hands it out through a scoped lock so a
//! multi-request loop holds it from its first request to its last, on every
//! exit path.

use crate::acl::AccessLevel;
use crate::config::Account;
use crate::error::CatalogError;
use crate::paths::{CatalogPath, LocalPath};
use crate::query::MetaQueryRequest;
use parking_lot::{Mutex, MutexGuard};

/// One result row, cells in select-column order.
pub type Row = Vec<String>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// Compute and register a checksum on the server (upload only).
    pub checksum: bool,
    /// Verify the transferred bytes against the checksum.
    pub verify: bool,
    /// Overwrite an existing target.
    pub force: bool,
    /// Transfer a directory tree or collection rather than one file.
    pub recursive: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReport {
    pub local: String,
    pub remote: String,
}

pub trait CatalogClient {
    fn upload(
        &mut self,
        local: &LocalPath,
        remote: &CatalogPath,
        options: &TransferOptions,
    ) -> Result<TransferReport, CatalogError>;

    fn download(
        &mut self,
        remote: &CatalogPath,
        local: &LocalPath,
        options: &TransferOptions,
    ) -> Result<TransferReport, CatalogError>;

    fn add_metadata(
        &mut self,
        path: &CatalogPath,
        attribute: &str,
        value: &str,
        units: Option<&str>,
    ) -> Result<(), CatalogError>;

    /// Remove every AVU on `path` whose attribute is `attribute`.
    fn delete_metadata(&mut self, path: &CatalogPath, attribute: &str)
    -> Result<(), CatalogError>;

    fn change_collection_access(
        &mut self,
        path: &str,
        level: AccessLevel,
        owner: &str,
        zone: &str,
        recursive: bool,
    ) -> Result<(), CatalogError>;

    fn change_data_object_access(
        &mut self,
        path: &str,
        level: AccessLevel,
        owner: &str,
        zone: &str,
    ) -> Result<(), CatalogError>;

    /// Run a compiled query. A query matching nothing may either return no
    /// rows or fail with a `CAT_NO_ROWS_FOUND` code; callers accept both.
    fn run_query(&mut self, request: &MetaQueryRequest) -> Result<Vec<Row>, CatalogError>;
}

/// Opens a client for an account.
pub trait CatalogConnector {
    type Client: CatalogClient;

    fn connect(&self, account: &Account) -> Result<Self::Client, CatalogError>;
}

pub struct Session<C> {
    account: Account,
    connection: Mutex<C>,
}

impl<C: CatalogClient> Session<C> {
    pub fn new(account: Account, client: C) -> Self {
        Self {
            account,
            connection: Mutex::new(client),
        }
    }

    pub fn open<K>(connector: &K, account: Account) -> Result<Self, CatalogError>
    where
        K: CatalogConnector<Client = C>,
    {
        let client = connector.connect(&account)?;
        Ok(Self::new(account, client))
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Exclusive access to the connection until the guard drops.
    pub fn lock(&self) -> MutexGuard<'_, C> {
        self.connection.lock()
    }

    pub fn into_client(self) -> C {
        self.connection.into_inner()
    }
}
