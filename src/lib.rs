//! JSON-driven front end for iRODS catalog operations.
//!
//! One JSON object read from stdin is turned into typed arguments (catalog
//! and local paths, AVU filters, access entries) and handed to a
//! `CatalogClient`. The `baton` binary wires these handlers to subcommands;
//! the `icommands` module supplies the default client.

pub mod acl;
pub mod avu;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod icommands;
pub mod logging;
pub mod mutation;
pub mod ops;
pub mod paths;
pub mod query;
pub mod schema;

pub use acl::{AccessLevel, AclEntry, compile_acl_entries};
pub use avu::{AvuDescriptor, Operator, parse_avus};
pub use client::{CatalogClient, CatalogConnector, Row, Session, TransferOptions, TransferReport};
pub use config::{Account, environment_file_path, load_account};
pub use document::{FieldKey, RawDocument, ResolvedField};
pub use error::{BatonError, CatalogError, ErrorKind, Result};
pub use icommands::{IcommandsClient, IcommandsConnector};
pub use mutation::{MetaOperation, MutationReport, apply_mutations};
pub use ops::{GetArgs, MetaQueryArgs, PutArgs};
pub use paths::{
    CatalogPath, LocalKind, LocalPath, PathKind, resolve_catalog_path, resolve_local_path,
};
pub use query::{Column, EmptyFilterPolicy, MetaQueryRequest, TargetClass, compile_query};
