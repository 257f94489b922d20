//! One handler per subcommand.
//!
//! Each handler resolves its typed arguments from the document, checks the
//! pairing rules between them, and only then touches the connection. Loops
//! that issue several catalog requests hold the session lock from the first
//! request to the last.

use crate::acl::compile_acl_entries;
use crate::avu::parse_avus;
use crate::client::{CatalogClient, Session, TransferOptions};
use crate::document::RawDocument;
use crate::error::{BatonError, Result};
use crate::mutation::{MetaOperation, MutationReport, apply_mutations};
use crate::paths::{LocalKind, PathKind, resolve_catalog_path, resolve_local_path};
use crate::query::{EmptyFilterPolicy, TargetClass, compile_query};
use serde_json::Value;
use tracing::{debug, info, info_span};

/// Upload flags taken from the command line. `recursive` is derived later.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PutArgs {
    pub checksum: bool,
    pub verify: bool,
    pub force: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GetArgs {
    pub verify: bool,
    pub force: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaQueryArgs {
    pub zone: String,
    pub collections: bool,
    pub objects: bool,
    pub empty_filter: EmptyFilterPolicy,
}

impl MetaQueryArgs {
    /// Target classes in output order. No scope flag means both.
    pub fn targets(&self) -> Vec<TargetClass> {
        let (collections, objects) = if self.collections || self.objects {
            (self.collections, self.objects)
        } else {
            (true, true)
        };
        let mut targets = Vec::with_capacity(2);
        if collections {
            targets.push(TargetClass::Collection);
        }
        if objects {
            targets.push(TargetClass::DataObject);
        }
        targets
    }
}

pub fn put<C: CatalogClient>(
    session: &Session<C>,
    document: &RawDocument,
    args: PutArgs,
) -> Result<()> {
    let _span = info_span!("put").entered();
    let remote = resolve_catalog_path(document)?;
    let local = resolve_local_path(document)?;
    if local.kind == LocalKind::Directory && remote.kind == PathKind::DataObject {
        return Err(BatonError::invalid(format!(
            "a directory may not be uploaded onto a single data-object path ({local} -> {remote})"
        )));
    }

    let options = TransferOptions {
        checksum: args.checksum,
        verify: args.verify,
        force: args.force,
        recursive: local.is_directory(),
    };
    info!(local = %local, remote = %remote, recursive = options.recursive, "uploading");
    let report = session.lock().upload(&local, &remote, &options)?;
    debug!(local = %report.local, remote = %report.remote, "upload finished");
    Ok(())
}

pub fn get<C: CatalogClient>(
    session: &Session<C>,
    document: &RawDocument,
    args: GetArgs,
) -> Result<()> {
    let _span = info_span!("get").entered();
    let remote = resolve_catalog_path(document)?;
    let local = resolve_local_path(document)?;
    if remote.kind == PathKind::Collection && local.kind == LocalKind::File {
        return Err(BatonError::invalid(format!(
            "a collection may not be downloaded into a single local file path ({remote} -> {local})"
        )));
    }

    let options = TransferOptions {
        checksum: false,
        verify: args.verify,
        force: args.force,
        recursive: remote.is_collection(),
    };
    info!(remote = %remote, local = %local, recursive = options.recursive, "downloading");
    let report = session.lock().download(&remote, &local, &options)?;
    debug!(local = %report.local, remote = %report.remote, "download finished");
    Ok(())
}

/// Apply every entry of `access` to the resolved path. `recursive` only
/// reaches the catalog for collections.
pub fn chmod<C: CatalogClient>(
    session: &Session<C>,
    document: &RawDocument,
    recursive: bool,
) -> Result<()> {
    let _span = info_span!("chmod").entered();
    let path = resolve_catalog_path(document)?;
    let entries = compile_acl_entries(document)?;
    let home_zone = session.account().zone.as_str();

    let mut conn = session.lock();
    for entry in &entries {
        let zone = entry.zone_or(home_zone);
        match path.kind {
            PathKind::Collection => conn.change_collection_access(
                &path.path,
                entry.level,
                &entry.owner,
                zone,
                recursive,
            )?,
            PathKind::DataObject => {
                if recursive {
                    debug!(path = %path, "ignoring recursive flag for a data object");
                }
                conn.change_data_object_access(&path.path, entry.level, &entry.owner, zone)?
            }
        }
        info!(path = %path, owner = %entry.owner, zone, level = %entry.level, "changed access");
    }
    Ok(())
}

pub fn metamod<C: CatalogClient>(
    session: &Session<C>,
    document: &RawDocument,
    operation: MetaOperation,
) -> Result<MutationReport> {
    let _span = info_span!("metamod", operation = %operation).entered();
    let path = resolve_catalog_path(document)?;
    let avus = parse_avus(document)?;

    let mut conn = session.lock();
    let report = apply_mutations(&mut *conn, operation, &path, &avus)?;
    info!(path = %path, applied = report.applied, "metadata updated");
    Ok(report)
}

/// Run one query per requested class and concatenate the decoded rows,
/// collections first. A class matching nothing contributes no rows.
pub fn metaquery<C: CatalogClient>(
    session: &Session<C>,
    document: &RawDocument,
    args: &MetaQueryArgs,
) -> Result<Vec<Value>> {
    let _span = info_span!("metaquery", zone = %args.zone).entered();
    if args.zone.trim().is_empty() {
        return Err(BatonError::MissingArgument(
            "metaquery requires a zone (--zone)".to_string(),
        ));
    }
    let avus = parse_avus(document)?;
    let requests = args
        .targets()
        .into_iter()
        .map(|target| compile_query(&avus, target, &args.zone, args.empty_filter))
        .collect::<Result<Vec<_>>>()?;

    let mut results = Vec::new();
    let mut conn = session.lock();
    for request in &requests {
        debug!(target = request.target.label(), query = %request.to_genquery(), "running query");
        let rows = match conn.run_query(request) {
            Ok(rows) => rows,
            Err(err) if err.is_no_rows() => {
                info!(target = request.target.label(), "no rows found");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        if rows.is_empty() {
            info!(target = request.target.label(), "no rows found");
        }
        results.extend(request.rows_to_json(&rows)?);
    }
    Ok(results)
}
