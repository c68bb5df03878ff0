use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use fileset::{
    Action, FileRecord, FileSet, FileSetRegistry, FilesetConfig, FilesetError, FilterRequest,
    RecordChanges, RecordKey, SidecarTimestamp, Status, TimeBound, Visibility,
};
use tempfile::TempDir;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn write_sidecar(root: &Path, dir: &[&str], filename: &str, body: serde_json::Value) {
    let mut path = root.to_path_buf();
    for segment in dir {
        path.push(segment);
    }
    fs::create_dir_all(&path).unwrap();
    let mut record = body;
    record["filename"] = filename.into();
    record["path"] = serde_json::json!(dir);
    path.push(format!(".{filename}.json"));
    fs::write(path, serde_json::to_vec(&serde_json::json!([record])).unwrap()).unwrap();
}

fn open(temp: &TempDir) -> FileSet {
    FileSet::open(&FilesetConfig::new(temp.path())).unwrap()
}

fn filenames(fileset: &FileSet, request: &FilterRequest) -> Vec<String> {
    let mut names: Vec<String> = fileset
        .query(request)
        .unwrap()
        .into_records()
        .into_iter()
        .map(|versioned| versioned.record.filename)
        .collect();
    names.sort();
    names
}

fn shared_fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let shared = |mut body: serde_json::Value| {
        body["read_group"] = serde_json::json!(["eng"]);
        body["change_group"] = serde_json::json!(["eng"]);
        body["owner"] = "ann".into();
        body
    };
    write_sidecar(
        temp.path(),
        &["a"],
        "one.csv",
        shared(serde_json::json!({"tags": ["x"], "origin": ["http"], "hidden": true})),
    );
    write_sidecar(
        temp.path(),
        &["a", "b"],
        "two.txt",
        shared(serde_json::json!({"tags": ["y"], "processed": true})),
    );
    write_sidecar(
        temp.path(),
        &["c"],
        "three.zip",
        shared(serde_json::json!({"created": "2024-01-01 00:00:00+00:00"})),
    );
    temp
}

#[test]
fn empty_categories_are_vacuously_permissive() {
    let temp = shared_fixture();
    let fileset = open(&temp);
    let baseline = filenames(&fileset, &FilterRequest::new("bob", strings(&["eng"])));
    assert_eq!(baseline.len(), 3);

    let explicit: FilterRequest = serde_json::from_value(serde_json::json!({
        "filenames": [],
        "type": [],
        "origin": [],
        "tags": [],
        "status": [],
        "visibility": [],
        "pattern": "",
        "user": "bob",
        "groups": ["eng"]
    }))
    .unwrap();
    assert_eq!(filenames(&fileset, &explicit), baseline);
}

#[test]
fn owner_is_included_regardless_of_grants() {
    let temp = TempDir::new().unwrap();
    write_sidecar(
        temp.path(),
        &[],
        "private.csv",
        serde_json::json!({"owner": "carol"}),
    );
    let fileset = open(&temp);

    for action in [Action::Read, Action::Change] {
        let mut request = FilterRequest::new("carol", strings(&["nobody"]));
        request.action = action;
        assert_eq!(filenames(&fileset, &request), strings(&["private.csv"]));

        let mut stranger = FilterRequest::new("dave", strings(&["nobody"]));
        stranger.action = action;
        assert!(filenames(&fileset, &stranger).is_empty());
    }
}

#[test]
fn create_twice_upserts() {
    let temp = TempDir::new().unwrap();
    let fileset = open(&temp);

    let mut first = FileRecord::new(strings(&["in"]), "data.csv", "ann");
    first.tags = strings(&["first"]);
    fileset.create(first, "http").unwrap();

    let mut second = FileRecord::new(strings(&["in"]), "data.csv", "ann");
    second.tags = strings(&["second"]);
    fileset.create(second, "import").unwrap();

    assert_eq!(fileset.record_count().unwrap(), 1);
    let selection = fileset
        .query(&FilterRequest::new("ann", strings(&["eng"])))
        .unwrap();
    assert_eq!(selection.len(), 1);
    let record = &selection.records[0].record;
    assert_eq!(record.tags, strings(&["second"]));
    assert_eq!(record.origin, strings(&["import"]));

    fileset.rebuild(&Default::default()).unwrap();
    assert_eq!(fileset.record_count().unwrap(), 1);
}

#[test]
fn empty_update_only_changes_changed_by() {
    let temp = TempDir::new().unwrap();
    let fileset = open(&temp);
    let mut record = FileRecord::new(strings(&["in"]), "data.csv", "ann");
    record.tags = strings(&["x"]);
    record.read_group = strings(&["eng"]);
    fileset.create(record, "http").unwrap();

    let sidecar = temp.path().join("in/.data.csv.json");
    let before: serde_json::Value = serde_json::from_slice(&fs::read(&sidecar).unwrap()).unwrap();

    let selection = fileset
        .query(&FilterRequest::new("ann", strings(&["eng"])))
        .unwrap();
    let report = fileset
        .update(&RecordChanges::default(), "bob", &selection)
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.updated.len(), 1);

    let after: serde_json::Value = serde_json::from_slice(&fs::read(&sidecar).unwrap()).unwrap();
    let mut expected = before;
    expected[0]["changed_by"] = "bob".into();
    assert_eq!(after, expected);
}

#[test]
fn empty_update_keeps_ingested_fields_as_stored() {
    let temp = TempDir::new().unwrap();
    let sidecar = temp.path().join(".data.csv.json");
    let stored = serde_json::json!([{
        "filename": "data.csv",
        "type": "",
        "path": [],
        "origin": ["http"],
        "tags": ["x", "x"],
        "created": "2024-01-01 00:00:00.000000+00:00",
        "removed": "9999-12-31 23:59:59.000000+00:00",
        "hidden": false,
        "processed": false,
        "owner": "ann",
        "changed_by": "ann",
        "read_user": [],
        "read_group": ["eng", "eng"],
        "change_user": [],
        "change_group": []
    }]);
    fs::write(&sidecar, serde_json::to_vec(&stored).unwrap()).unwrap();
    let fileset = open(&temp);

    let request = FilterRequest {
        file_type: strings(&["spreadsheet"]),
        tags: strings(&["x"]),
        ..FilterRequest::new("ann", strings(&["eng"]))
    };
    let selection = fileset.query(&request).unwrap();
    assert_eq!(selection.len(), 1);

    let report = fileset
        .update(&RecordChanges::default(), "bob", &selection)
        .unwrap();
    assert!(report.is_complete());

    let after: serde_json::Value = serde_json::from_slice(&fs::read(&sidecar).unwrap()).unwrap();
    let mut expected = stored;
    expected[0]["changed_by"] = "bob".into();
    assert_eq!(after, expected);
}

#[test]
fn base_path_and_tags_scenario() {
    let temp = shared_fixture();
    let fileset = open(&temp);

    let mut request = FilterRequest::new("bob", strings(&["eng"]));
    request.base_path = strings(&["a"]);
    request.tags = strings(&["x"]);
    assert_eq!(filenames(&fileset, &request), strings(&["one.csv"]));

    request.tags = strings(&["x", "y"]);
    assert_eq!(filenames(&fileset, &request), strings(&["one.csv", "two.txt"]));
}

#[test]
fn group_grant_scenario() {
    let temp = TempDir::new().unwrap();
    write_sidecar(
        temp.path(),
        &[],
        "report.csv",
        serde_json::json!({"owner": "ann", "read_user": [], "read_group": ["eng"]}),
    );
    let fileset = open(&temp);

    let mut request = FilterRequest::new("bob", strings(&["eng"]));
    request.action = Action::Read;
    assert_eq!(filenames(&fileset, &request), strings(&["report.csv"]));

    request.groups = strings(&["ops"]);
    assert!(filenames(&fileset, &request).is_empty());
}

#[test]
fn created_after_scenario() {
    let temp = shared_fixture();
    let fileset = open(&temp);

    let mut request = FilterRequest::new("bob", strings(&["eng"]));
    assert_eq!(request.created_after, TimeBound::NegInfinity);
    assert_eq!(filenames(&fileset, &request).len(), 3);

    request.created_after =
        TimeBound::At(SidecarTimestamp::parse("2024-01-01 00:00:01+00:00").unwrap());
    assert!(!filenames(&fileset, &request).contains(&"three.zip".to_string()));

    request.created_after =
        TimeBound::At(SidecarTimestamp::parse("2023-12-31 23:59:59+00:00").unwrap());
    assert_eq!(filenames(&fileset, &request), strings(&["three.zip"]));
}

#[test]
fn status_and_visibility_are_independent() {
    let temp = shared_fixture();
    let fileset = open(&temp);

    let mut request = FilterRequest::new("bob", strings(&["eng"]));
    request.status = vec![Status::Processed];
    assert_eq!(filenames(&fileset, &request), strings(&["two.txt"]));

    request.status = vec![Status::Unprocessed];
    assert_eq!(filenames(&fileset, &request), strings(&["one.csv", "three.zip"]));

    request.status.clear();
    request.visibility = vec![Visibility::Hidden];
    assert_eq!(filenames(&fileset, &request), strings(&["one.csv"]));

    request.status = vec![Status::Processed];
    assert!(filenames(&fileset, &request).is_empty());
}

#[test]
fn persistence_failure_is_isolated_per_record() {
    let temp = TempDir::new().unwrap();
    let fileset = open(&temp);
    fileset
        .create(FileRecord::new(vec![], "good.csv", "ann"), "")
        .unwrap();
    fileset
        .create(FileRecord::new(vec![], "bad.csv", "ann"), "")
        .unwrap();

    let blocked = fileset.root().join(".bad.csv.json");
    fs::remove_file(&blocked).unwrap();
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("occupied"), "").unwrap();

    let selection = fileset
        .query(&FilterRequest::new("ann", strings(&["eng"])))
        .unwrap();
    let changes = RecordChanges {
        processed: Some(true),
        ..RecordChanges::default()
    };
    let report = fileset.update(&changes, "ann", &selection).unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].record.filename, "good.csv");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].key, RecordKey::new(vec![], "bad.csv"));
    assert!(matches!(
        report.failed[0].error,
        FilesetError::Persistence { .. }
    ));

    let bad = fileset
        .get(&RecordKey::new(vec![], "bad.csv"))
        .unwrap()
        .unwrap();
    assert!(!bad.record.processed);
}

#[test]
fn stale_selection_conflicts() {
    let temp = TempDir::new().unwrap();
    let fileset = open(&temp);
    fileset
        .create(FileRecord::new(vec![], "data.csv", "ann"), "")
        .unwrap();

    let request = FilterRequest::new("ann", strings(&["eng"]));
    let stale = fileset.query(&request).unwrap();

    let hide = RecordChanges {
        hidden: Some(true),
        ..RecordChanges::default()
    };
    let report = fileset.update(&hide, "ann", &stale).unwrap();
    assert!(report.is_complete());

    let tag = RecordChanges {
        tags: Some(strings(&["late"])),
        ..RecordChanges::default()
    };
    let report = fileset.update(&tag, "bob", &stale).unwrap();
    assert!(report.updated.is_empty());
    assert!(matches!(report.failed[0].error, FilesetError::Conflict(_)));

    let current = fileset.query(&request).unwrap();
    assert!(current.records[0].record.hidden);
    assert!(current.records[0].record.tags.is_empty());
}

#[test]
fn concurrent_creates_on_one_key_leave_one_record() {
    let temp = TempDir::new().unwrap();
    let fileset = Arc::new(open(&temp));

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let fileset = fileset.clone();
            thread::spawn(move || {
                let mut record = FileRecord::new(vec![], "shared.csv", "ann");
                record.tags = vec![format!("writer-{index}")];
                fileset.create(record, "").unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fileset.record_count().unwrap(), 1);
    fileset.rebuild(&Default::default()).unwrap();
    assert_eq!(fileset.record_count().unwrap(), 1);
}

#[test]
fn missing_identity_fails_the_request() {
    let temp = shared_fixture();
    let fileset = open(&temp);

    let error = fileset
        .query(&FilterRequest::new("", strings(&["eng"])))
        .unwrap_err();
    assert!(matches!(error, FilesetError::Config(_)));

    let error = fileset
        .query(&FilterRequest::new("bob", vec![]))
        .unwrap_err();
    assert!(matches!(error, FilesetError::Config(_)));
}

#[test]
fn registry_leases_block_eviction() {
    let temp = TempDir::new().unwrap();
    let config = FilesetConfig {
        idle_ttl_secs: 60,
        ..FilesetConfig::new(temp.path())
    };
    let ttl = config.idle_ttl();
    let registry = FileSetRegistry::new(ttl);

    let lease = registry.open("census", &config).unwrap();
    assert_eq!(lease.id(), "census");
    assert_eq!(lease.record_count().unwrap(), 0);

    let later = Instant::now() + ttl * 2;
    assert!(registry.evict_idle(later).is_empty());
    assert_eq!(registry.len(), 1);

    drop(lease);
    assert!(registry.evict_idle(Instant::now()).is_empty());
    let later = Instant::now() + ttl * 2;
    assert_eq!(registry.evict_idle(later), strings(&["census"]));
    assert!(registry.is_empty());
    assert!(matches!(
        registry.acquire("census"),
        Err(FilesetError::NotRegistered(_))
    ));
}
