//! Runner tests against in-memory capability implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use formflow_core::import::{ImportJobStatus, ImportMode, JobProgress, Row};
use formflow_core::records::{RoutedRecord, TargetCollection};
use formflow_core::types::DbId;
use formflow_pipeline::{
    run_import_job, EnhanceError, ImportJobSpec, ImportPorts, ImportSettings, JobStore,
    PipelineError, RecordSink, RowEnhancer, UploadStore,
};

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemorySink {
    records: Mutex<Vec<RoutedRecord>>,
    next_id: AtomicI64,
    /// Inserts of records whose email contains this marker fail.
    reject_marker: Option<&'static str>,
}

impl MemorySink {
    fn rejecting(marker: &'static str) -> Self {
        Self {
            reject_marker: Some(marker),
            ..Default::default()
        }
    }

    fn records(&self) -> Vec<RoutedRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn insert(&self, record: &RoutedRecord) -> Result<DbId, PipelineError> {
        if let (Some(marker), Some(email)) = (self.reject_marker, record.email()) {
            if email.contains(marker) {
                return Err(PipelineError::Store("rejected".into()));
            }
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn delete_by_source_tag(
        &self,
        target: TargetCollection,
        source_tag: &str,
    ) -> Result<u64, PipelineError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !(r.collection() == target && r.meta().source == source_tag));
        Ok((before - records.len()) as u64)
    }
}

#[derive(Default)]
struct MemoryJobs {
    checkpoints: Mutex<Vec<JobProgress>>,
    finals: Mutex<Vec<(ImportJobStatus, JobProgress)>>,
}

impl MemoryJobs {
    fn checkpointed(&self) -> Vec<usize> {
        self.checkpoints
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.processed)
            .collect()
    }
}

#[async_trait]
impl JobStore for MemoryJobs {
    async fn checkpoint(&self, _job_id: DbId, progress: &JobProgress) -> Result<(), PipelineError> {
        self.checkpoints.lock().unwrap().push(progress.clone());
        Ok(())
    }

    async fn finalize(
        &self,
        _job_id: DbId,
        status: ImportJobStatus,
        progress: &JobProgress,
    ) -> Result<(), PipelineError> {
        self.finals.lock().unwrap().push((status, progress.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct MemoryUploads {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryUploads {
    fn with(reference: &str, bytes: &[u8]) -> Self {
        let uploads = Self::default();
        uploads.put(reference, bytes);
        uploads
    }

    fn put(&self, reference: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(reference.to_string(), bytes.to_vec());
    }

    fn contains(&self, reference: &str) -> bool {
        self.files.lock().unwrap().contains_key(reference)
    }
}

#[async_trait]
impl UploadStore for MemoryUploads {
    async fn read(&self, reference: &str) -> Result<Vec<u8>, PipelineError> {
        self.files
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| PipelineError::Store(format!("missing upload {reference}")))
    }

    async fn delete(&self, reference: &str) -> Result<(), PipelineError> {
        self.files.lock().unwrap().remove(reference);
        Ok(())
    }
}

/// Renames `Naam` to `name`; counts how often it was primed.
#[derive(Default)]
struct RenamingEnhancer {
    primed: AtomicUsize,
}

#[async_trait]
impl RowEnhancer for RenamingEnhancer {
    async fn prime(&self, _sample: &[Row], _target: TargetCollection) -> Result<(), EnhanceError> {
        self.primed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn enhance_row(&self, row: &Row, _target: TargetCollection) -> Result<Row, EnhanceError> {
        Ok(row
            .iter()
            .map(|(k, v)| {
                let key = if k == "Naam" { "name".to_string() } else { k.clone() };
                (key, v.clone())
            })
            .collect())
    }
}

struct FailingEnhancer;

#[async_trait]
impl RowEnhancer for FailingEnhancer {
    async fn prime(&self, _sample: &[Row], _target: TargetCollection) -> Result<(), EnhanceError> {
        Err(EnhanceError::Api {
            status: 500,
            body: "down".into(),
        })
    }

    async fn enhance_row(&self, _row: &Row, _target: TargetCollection) -> Result<Row, EnhanceError> {
        Err(EnhanceError::NotPrimed)
    }
}

/// Primes fine, then never answers for rows.
struct SleepingEnhancer;

#[async_trait]
impl RowEnhancer for SleepingEnhancer {
    async fn enhance_row(&self, row: &Row, _target: TargetCollection) -> Result<Row, EnhanceError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(row.clone())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const REF: &str = "upload-1";

fn spec(file_name: &str) -> ImportJobSpec {
    ImportJobSpec {
        job_id: 1,
        file_name: file_name.to_string(),
        source_ref: REF.to_string(),
        target: TargetCollection::Lead,
        mode: ImportMode::Append,
        source_tag: "bulk-import".to_string(),
        enable_ai_mapping: false,
    }
}

fn ports<'a>(
    sink: &'a MemorySink,
    jobs: &'a MemoryJobs,
    uploads: &'a MemoryUploads,
    enhancer: Option<&'a dyn RowEnhancer>,
) -> ImportPorts<'a> {
    ImportPorts {
        records: sink,
        jobs,
        uploads,
        enhancer,
    }
}

fn csv_with_rows(count: usize, reject_every: Option<usize>) -> Vec<u8> {
    let mut csv = String::from("Name,Email\n");
    for i in 1..=count {
        let email = match reject_every {
            Some(n) if i % n == 0 => format!("reject{i}@x.org"),
            _ => format!("person{i}@x.org"),
        };
        csv.push_str(&format!("Person {i},{email}\n"));
    }
    csv.into_bytes()
}

fn lead_scores(records: &[RoutedRecord]) -> Vec<i32> {
    records
        .iter()
        .map(|r| match r {
            RoutedRecord::Lead(lead) => lead.lead_score,
            other => panic!("expected lead, got {other:?}"),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn three_row_csv_completes_and_scores_missing_email_lower() {
    let sink = MemorySink::default();
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(
        REF,
        b"Name,Email,Area\nAsha,asha@x.org,North\nRavi,,North\nMeera,m@x.org,North\n",
    );

    let outcome = run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &ImportSettings::default(),
        &spec("contacts.csv"),
    )
    .await;

    assert_eq!(outcome.status, ImportJobStatus::Completed);
    assert_eq!((outcome.total, outcome.processed), (3, 3));
    assert_eq!((outcome.successful, outcome.failed), (3, 0));
    assert!(outcome.errors.is_empty());

    let records = sink.records();
    let scores = lead_scores(&records);
    assert_eq!(scores[0] - scores[1], 25);
    assert!(records.iter().all(|r| r.meta().source == "bulk-import"));

    // Staged upload is removed once the job is done.
    assert!(!uploads.contains(REF));
    let finals = jobs.finals.lock().unwrap();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].0, ImportJobStatus::Completed);
}

#[tokio::test]
async fn checkpoints_every_ten_records_and_at_the_end() {
    let sink = MemorySink::rejecting("reject");
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(REF, &csv_with_rows(23, Some(4)));

    let outcome = run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &ImportSettings::default(),
        &spec("people.csv"),
    )
    .await;

    assert_eq!(jobs.checkpointed(), vec![0, 10, 20, 23]);
    for progress in jobs.checkpoints.lock().unwrap().iter() {
        assert!(progress.counters_consistent());
        assert_eq!(progress.total, 23);
    }
    assert_eq!(outcome.processed, outcome.successful + outcome.failed);
    assert_eq!(outcome.failed, 5);
}

#[tokio::test]
async fn some_failures_make_a_partial_job() {
    let sink = MemorySink::rejecting("reject");
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(REF, &csv_with_rows(4, Some(2)));

    let outcome = run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &ImportSettings::default(),
        &spec("people.csv"),
    )
    .await;

    assert_eq!(outcome.status, ImportJobStatus::Partial);
    assert_eq!((outcome.successful, outcome.failed), (2, 2));
    assert_eq!(
        outcome.errors,
        vec![
            "Record 2: Storage error: rejected".to_string(),
            "Record 4: Storage error: rejected".to_string(),
        ]
    );
    assert_eq!(sink.records().len(), 2);
}

#[tokio::test]
async fn non_object_json_element_fails_only_its_record() {
    let sink = MemorySink::default();
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(
        REF,
        br#"[{"Name": "A"}, {"Name": "B"}, "oops", {"Name": "C"}]"#,
    );

    let outcome = run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &ImportSettings::default(),
        &spec("people.json"),
    )
    .await;

    assert_eq!(outcome.status, ImportJobStatus::Partial);
    assert_eq!((outcome.total, outcome.processed), (4, 4));
    assert_eq!((outcome.successful, outcome.failed), (3, 1));
    assert_eq!(
        outcome.errors,
        vec!["Record 3: Expected an object, found a string".to_string()]
    );

    let names: Vec<String> = sink
        .records()
        .iter()
        .map(|r| match r {
            RoutedRecord::Lead(lead) => lead.name.clone(),
            other => panic!("expected lead, got {other:?}"),
        })
        .collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn every_record_failing_fails_the_job() {
    let sink = MemorySink::rejecting("reject");
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(REF, &csv_with_rows(3, Some(1)));

    let outcome = run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &ImportSettings::default(),
        &spec("people.csv"),
    )
    .await;

    assert_eq!(outcome.status, ImportJobStatus::Failed);
    assert_eq!(outcome.processed, 3);
    assert_eq!(outcome.failed, 3);
}

#[tokio::test]
async fn unsupported_format_fails_before_any_record() {
    let sink = MemorySink::default();
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(REF, b"%PDF-1.7");

    let outcome = run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &ImportSettings::default(),
        &spec("contacts.pdf"),
    )
    .await;

    assert_eq!(outcome.status, ImportJobStatus::Failed);
    assert_eq!((outcome.total, outcome.processed), (0, 0));
    assert_eq!(outcome.errors, vec!["Unsupported file format: .pdf".to_string()]);
    assert!(sink.records().is_empty());
    assert!(!uploads.contains(REF));
    assert_eq!(jobs.finals.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn header_only_file_fails() {
    let sink = MemorySink::default();
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(REF, b"Name,Email\n");

    let outcome = run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &ImportSettings::default(),
        &spec("contacts.csv"),
    )
    .await;

    assert_eq!(outcome.status, ImportJobStatus::Failed);
    assert_eq!(outcome.errors, vec!["File contains no records".to_string()]);
}

#[tokio::test]
async fn replace_mode_is_idempotent_per_source_tag() {
    let sink = MemorySink::default();
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::default();
    let data = csv_with_rows(3, None);

    // Records from another tag survive.
    let mut other = spec("other.csv");
    other.source_tag = "drive-2023".into();
    uploads.put(REF, &data);
    run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &ImportSettings::default(),
        &other,
    )
    .await;

    let mut replace = spec("people.csv");
    replace.mode = ImportMode::Replace;
    for _ in 0..2 {
        uploads.put(REF, &data);
        let outcome = run_import_job(
            &ports(&sink, &jobs, &uploads, None),
            &ImportSettings::default(),
            &replace,
        )
        .await;
        assert_eq!(outcome.status, ImportJobStatus::Completed);
    }

    let records = sink.records();
    let tagged = records
        .iter()
        .filter(|r| r.meta().source == "bulk-import")
        .count();
    assert_eq!(tagged, 3);
    assert_eq!(records.len(), 6);
}

#[tokio::test]
async fn ai_failure_falls_back_without_losing_records() {
    let data = b"Naam,Email\nAsha,asha@x.org\nRavi,ravi@x.org\n";
    let mut with_ai = spec("people.csv");
    with_ai.enable_ai_mapping = true;

    let renaming = RenamingEnhancer::default();
    let enhancers: [Option<&dyn RowEnhancer>; 3] = [None, Some(&FailingEnhancer), Some(&renaming)];

    let mut successful = Vec::new();
    let mut record_sets = Vec::new();
    for enhancer in enhancers {
        let sink = MemorySink::default();
        let jobs = MemoryJobs::default();
        let uploads = MemoryUploads::with(REF, data);
        let outcome = run_import_job(
            &ports(&sink, &jobs, &uploads, enhancer),
            &ImportSettings::default(),
            &with_ai,
        )
        .await;
        successful.push(outcome.successful);
        record_sets.push(sink.records());
    }

    assert_eq!(successful, vec![2, 2, 2]);
    assert_eq!(renaming.primed.load(Ordering::SeqCst), 1);

    // With the mapping applied, the renamed column became the record name
    // instead of a response entry.
    let raw_labels: Vec<&str> = record_sets[1][0]
        .responses()
        .iter()
        .map(|e| e.field_label.as_str())
        .collect();
    assert_eq!(raw_labels, vec!["Naam"]);
    assert_matches!(&record_sets[2][0], RoutedRecord::Lead(lead) => {
        assert_eq!(lead.name, "Asha");
        assert!(lead.responses.is_empty());
    });
}

#[tokio::test]
async fn ai_mapping_is_skipped_when_disabled_for_the_job() {
    let sink = MemorySink::default();
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(REF, b"Naam\nAsha\n");
    let renaming = RenamingEnhancer::default();

    run_import_job(
        &ports(&sink, &jobs, &uploads, Some(&renaming)),
        &ImportSettings::default(),
        &spec("people.csv"),
    )
    .await;

    assert_eq!(renaming.primed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_ai_calls_time_out_to_the_raw_row() {
    let sink = MemorySink::default();
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(REF, &csv_with_rows(3, None));
    let mut job = spec("people.csv");
    job.enable_ai_mapping = true;
    let settings = ImportSettings {
        ai_timeout: Duration::from_millis(20),
        ..Default::default()
    };

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        run_import_job(&ports(&sink, &jobs, &uploads, Some(&SleepingEnhancer)), &settings, &job),
    )
    .await
    .expect("runner must not block on the assistant");

    assert_eq!(outcome.status, ImportJobStatus::Completed);
    assert_eq!(outcome.successful, 3);
}

#[tokio::test]
async fn error_log_keeps_the_most_recent_entries() {
    let sink = MemorySink::rejecting("reject");
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::with(REF, &csv_with_rows(12, Some(1)));
    let settings = ImportSettings {
        max_error_log: 5,
        ..Default::default()
    };

    let outcome = run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &settings,
        &spec("people.csv"),
    )
    .await;

    assert_eq!(outcome.failed, 12);
    assert_eq!(outcome.errors.len(), 5);
    assert_eq!(outcome.errors[0], "Record 8: Storage error: rejected");
    assert_eq!(outcome.errors[4], "Record 12: Storage error: rejected");
}

#[tokio::test]
async fn missing_upload_fails_the_job() {
    let sink = MemorySink::default();
    let jobs = MemoryJobs::default();
    let uploads = MemoryUploads::default();

    let outcome = run_import_job(
        &ports(&sink, &jobs, &uploads, None),
        &ImportSettings::default(),
        &spec("people.json"),
    )
    .await;

    assert_eq!(outcome.status, ImportJobStatus::Failed);
    assert_eq!(outcome.errors, vec![format!("Storage error: missing upload {REF}")]);
}
