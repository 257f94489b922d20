#![allow(dead_code)]

use baton::{
    AccessLevel, Account, CatalogClient, CatalogError, CatalogPath, LocalPath, MetaQueryRequest,
    RawDocument, Row, Session, TargetClass, TransferOptions, TransferReport,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

/// Every collaborator call, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Upload {
        local: LocalPath,
        remote: CatalogPath,
        options: TransferOptions,
    },
    Download {
        remote: CatalogPath,
        local: LocalPath,
        options: TransferOptions,
    },
    AddMetadata {
        path: String,
        attribute: String,
        value: String,
        units: Option<String>,
    },
    DeleteMetadata {
        path: String,
        attribute: String,
    },
    CollectionAccess {
        path: String,
        level: AccessLevel,
        owner: String,
        zone: String,
        recursive: bool,
    },
    DataObjectAccess {
        path: String,
        level: AccessLevel,
        owner: String,
        zone: String,
    },
    Query(MetaQueryRequest),
}

/// In-memory collaborator that records calls and replays scripted results.
#[derive(Default)]
pub struct RecordingClient {
    pub calls: Vec<Call>,
    pub query_results: HashMap<TargetClass, VecDeque<Result<Vec<Row>, CatalogError>>>,
    /// Fail the n-th catalog mutation (0-based) with this error. Metadata
    /// and access changes share the count.
    pub fail_mutation_at: Option<(usize, CatalogError)>,
    mutations: usize,
    /// Signalled on the first call, which then pauses so the receiver can
    /// start waiting on the session lock.
    first_call: Option<(Sender<()>, Duration)>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_result(
        mut self,
        target: TargetClass,
        result: Result<Vec<Row>, CatalogError>,
    ) -> Self {
        self.query_results.entry(target).or_default().push_back(result);
        self
    }

    pub fn failing_mutation(mut self, index: usize, err: CatalogError) -> Self {
        self.fail_mutation_at = Some((index, err));
        self
    }

    pub fn signalling_first_call(mut self, signal: Sender<()>, pause: Duration) -> Self {
        self.first_call = Some((signal, pause));
        self
    }

    fn observe(&mut self) {
        if let Some((signal, pause)) = self.first_call.take() {
            let _ = signal.send(());
            thread::sleep(pause);
        }
    }

    fn mutation(&mut self, call: Call) -> Result<(), CatalogError> {
        self.observe();
        let index = self.mutations;
        self.mutations += 1;
        if let Some((fail_at, err)) = &self.fail_mutation_at {
            if *fail_at == index {
                return Err(err.clone());
            }
        }
        self.calls.push(call);
        Ok(())
    }
}

impl CatalogClient for RecordingClient {
    fn upload(
        &mut self,
        local: &LocalPath,
        remote: &CatalogPath,
        options: &TransferOptions,
    ) -> Result<TransferReport, CatalogError> {
        self.observe();
        self.calls.push(Call::Upload {
            local: local.clone(),
            remote: remote.clone(),
            options: *options,
        });
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
        self.observe();
        self.calls.push(Call::Download {
            remote: remote.clone(),
            local: local.clone(),
            options: *options,
        });
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
        self.mutation(Call::AddMetadata {
            path: path.path.clone(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            units: units.map(str::to_string),
        })
    }

    fn delete_metadata(&mut self, path: &CatalogPath, attribute: &str) -> Result<(), CatalogError> {
        self.mutation(Call::DeleteMetadata {
            path: path.path.clone(),
            attribute: attribute.to_string(),
        })
    }

    fn change_collection_access(
        &mut self,
        path: &str,
        level: AccessLevel,
        owner: &str,
        zone: &str,
        recursive: bool,
    ) -> Result<(), CatalogError> {
        self.mutation(Call::CollectionAccess {
            path: path.to_string(),
            level,
            owner: owner.to_string(),
            zone: zone.to_string(),
            recursive,
        })
    }

    fn change_data_object_access(
        &mut self,
        path: &str,
        level: AccessLevel,
        owner: &str,
        zone: &str,
    ) -> Result<(), CatalogError> {
        self.mutation(Call::DataObjectAccess {
            path: path.to_string(),
            level,
            owner: owner.to_string(),
            zone: zone.to_string(),
        })
    }

    fn run_query(&mut self, request: &MetaQueryRequest) -> Result<Vec<Row>, CatalogError> {
        self.observe();
        self.calls.push(Call::Query(request.clone()));
        self.query_results
            .get_mut(&request.target)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn sample_account() -> Account {
    Account {
        host: "irods.example".to_string(),
        port: 1247,
        zone: "testZone".to_string(),
        user: "alice".to_string(),
        default_resource: None,
        env_file: PathBuf::from("/nonexistent/irods_environment.json"),
    }
}

pub fn session(client: RecordingClient) -> Session<RecordingClient> {
    Session::new(sample_account(), client)
}

/// Run `handler` against a fresh session while a second thread waits for
/// the session lock, starting once the handler's first catalog call is in
/// flight. Returns the handler's result and the number of recorded calls at
/// the moment the waiter acquired the lock.
pub fn run_with_lock_waiter<R>(
    client: RecordingClient,
    handler: impl FnOnce(&Session<RecordingClient>) -> R,
) -> (R, usize) {
    let (signal, started) = mpsc::channel();
    let session = session(client.signalling_first_call(signal, Duration::from_millis(100)));
    let session = &session;
    thread::scope(|scope| {
        let waiter = scope.spawn(move || {
            let _ = started.recv_timeout(Duration::from_secs(5));
            session.lock().calls.len()
        });
        let result = handler(session);
        let seen = waiter.join().expect("lock waiter panicked");
        (result, seen)
    })
}

pub fn doc(value: Value) -> RawDocument {
    RawDocument::from_value(value).expect("test document is valid")
}

pub fn row(cells: &[&str]) -> Row {
    cells.iter().map(|cell| cell.to_string()).collect()
}
