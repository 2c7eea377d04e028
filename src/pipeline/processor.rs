//! Capture pipeline orchestrator.
//!
//! Flow for every artifact:
//! 1. Fetch (emails, Drive files) or accept (brain dumps)
//! 2. Inference suggestion (emails, brain dumps)
//! 3. Score + adapt via [`annotate`]
//! 4. Save to the repository
//!
//! Collaborator failures propagate unchanged; nothing here retries. In a
//! batch, an inference failure only drops that one item into the report's
//! failures. A re-fetched artifact keeps the task link of its stored copy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::capture::model::{
    BrainDump, Capture, CaptureArtifact, DriveFile, EmailCapture, SourceType, dedup_by_id,
};
use crate::config::PipelineConfig;
use crate::error::{CollaboratorError, Error, Result};
use crate::inference::InferenceService;
use crate::pipeline::annotate;
use crate::pipeline::conversion::{self, ConversionSink};
use crate::pipeline::types::AnnotatedCandidate;
use crate::sources::{DriveFetcher, EmailFetcher};
use crate::store::CaptureRepository;

/// An item that could not be annotated in a batch.
#[derive(Debug)]
pub struct BatchFailure {
    pub id: String,
    pub error: CollaboratorError,
}

/// Outcome of one ingest run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub candidates: Vec<AnnotatedCandidate>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Candidates that clear the relevance bar.
    pub fn task_relevant(&self) -> impl Iterator<Item = &AnnotatedCandidate> {
        self.candidates.iter().filter(|c| c.score.is_task_relevant)
    }
}

/// Wires the inference service and repository around the pure scoring core.
pub struct CapturePipeline {
    config: PipelineConfig,
    inference: Arc<dyn InferenceService>,
    repository: Arc<dyn CaptureRepository>,
}

impl CapturePipeline {
    pub fn new(
        config: PipelineConfig,
        inference: Arc<dyn InferenceService>,
        repository: Arc<dyn CaptureRepository>,
    ) -> Self {
        Self {
            config,
            inference,
            repository,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stored copy of an artifact, `None` when it was never saved.
    async fn stored(&self, id: &str) -> Result<Option<CaptureArtifact>> {
        match self.repository.fetch_by_id(id).await {
            Ok(artifact) => Ok(Some(artifact)),
            Err(CollaboratorError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Merge a freshly fetched artifact with whatever is already stored.
    async fn refreshed(&self, fetched: CaptureArtifact) -> Result<CaptureArtifact> {
        Ok(match self.stored(fetched.id()).await? {
            Some(stored) => fetched.with_link_of(&stored),
            None => fetched,
        })
    }

    /// Capture free-form text: validate, ask for suggestions, score, save.
    pub async fn capture_brain_dump(
        &self,
        content: &str,
        tags: Vec<String>,
        mood: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AnnotatedCandidate> {
        let mut dump = BrainDump::new(content, now)?.with_tags(tags);
        if let Some(mood) = mood {
            dump = dump.with_mood(mood);
        }

        let suggestion = self
            .inference
            .suggest(SourceType::BrainDump, dump.content())
            .await?;
        let candidate = annotate(dump.into(), Some(&suggestion), now, &self.config);
        self.repository.save(&candidate.artifact).await?;

        info!(
            id = %candidate.id(),
            items = candidate.signals.line_items.len(),
            high_priority = candidate.score.is_high_priority,
            "Brain dump captured"
        );
        Ok(candidate)
    }

    /// Fetch, enrich, score and save recent emails.
    pub async fn ingest_emails(
        &self,
        fetcher: &dyn EmailFetcher,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<BatchReport> {
        let limit = self.config.fetch_limit(limit);
        let fetched = fetcher.fetch_emails(limit).await?;
        info!(fetcher = fetcher.name(), requested = limit, count = fetched.len(), "Fetched emails");

        let emails: Vec<EmailCapture> = fetched.into_iter().map(EmailCapture::new).collect();
        let suggestions = join_all(emails.iter().map(|email| {
            let text = format!("{}\n\n{}", email.subject, email.body);
            async move { self.inference.suggest(SourceType::Email, &text).await }
        }))
        .await;

        let mut report = BatchReport::default();
        for (email, suggestion) in emails.into_iter().zip(suggestions) {
            match suggestion {
                Ok(bundle) => {
                    let artifact = self.refreshed(email.into()).await?;
                    let candidate = annotate(artifact, Some(&bundle), now, &self.config);
                    self.repository.save(&candidate.artifact).await?;
                    debug!(
                        id = %candidate.id(),
                        confidence = candidate.score.confidence,
                        high_priority = candidate.score.is_high_priority,
                        "Email annotated"
                    );
                    report.candidates.push(candidate);
                }
                Err(error) => {
                    warn!(
                        id = %email.message_id,
                        service = self.inference.name(),
                        error = %error,
                        "Inference failed for email, skipping"
                    );
                    report.failures.push(BatchFailure {
                        id: email.message_id,
                        error,
                    });
                }
            }
        }

        info!(
            annotated = report.candidates.len(),
            failed = report.failures.len(),
            "Email batch complete"
        );
        Ok(report)
    }

    /// Fetch, score and save recent Drive files. Repeated ids keep their
    /// first occurrence.
    pub async fn ingest_drive(
        &self,
        fetcher: &dyn DriveFetcher,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<BatchReport> {
        let limit = self.config.fetch_limit(limit);
        let fetched = fetcher.fetch_files(limit).await?;
        info!(fetcher = fetcher.name(), requested = limit, count = fetched.len(), "Fetched Drive files");

        let files = dedup_by_id(
            fetched
                .into_iter()
                .map(|meta| DriveFile::new(meta, now, self.config.relevance_threshold))
                .collect(),
        );

        let mut report = BatchReport::default();
        for file in files {
            let artifact = self.refreshed(file.into()).await?;
            let candidate = annotate(artifact, None, now, &self.config);
            self.repository.save(&candidate.artifact).await?;
            debug!(
                id = %candidate.id(),
                score = candidate.score.confidence,
                relevant = candidate.score.is_task_relevant,
                "Drive file annotated"
            );
            report.candidates.push(candidate);
        }

        info!(
            annotated = report.candidates.len(),
            relevant = report.task_relevant().count(),
            "Drive batch complete"
        );
        Ok(report)
    }

    /// Re-annotate stored artifacts of one source at `now`, newest first.
    /// Brain dumps are scored with the suggestion stored at capture time.
    pub async fn review_recent(
        &self,
        source: SourceType,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AnnotatedCandidate>> {
        let limit = self.config.fetch_limit(limit);
        let artifacts = self.repository.fetch_recent(source, limit).await?;
        Ok(artifacts
            .into_iter()
            .map(|artifact| annotate(artifact, None, now, &self.config))
            .collect())
    }

    /// Record that a task now exists for a stored artifact.
    pub async fn record_conversion(
        &self,
        id: &str,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CaptureArtifact> {
        let artifact = self.repository.fetch_by_id(id).await?;
        let linked = conversion::link(artifact, task_id, now)?;
        self.repository.save(&linked).await?;
        info!(id = %id, task_id = %task_id, "Capture linked to task");
        Ok(linked)
    }

    /// Hand a candidate's drafts to the task-creation consumer and link the
    /// stored artifact to the first created task. Brain dumps are also marked
    /// processed.
    ///
    /// Works from the stored copy: an artifact linked since the candidate was
    /// annotated converts to nothing. The link is saved as soon as the first
    /// task exists, so a consumer failure on a later draft returns
    /// [`Error::PartialConversion`] with the ids created so far and a retry
    /// creates no duplicates. Returns the created task ids; empty when there
    /// was nothing to convert.
    pub async fn convert_with(
        &self,
        candidate: &AnnotatedCandidate,
        sink: &dyn ConversionSink,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let stored = self.repository.fetch_by_id(candidate.id()).await?;
        if let Some(task_id) = stored.linked_task_id() {
            debug!(id = %candidate.id(), task_id = %task_id, "Capture already linked");
            return Ok(Vec::new());
        }

        let drafts = conversion::task_drafts(candidate);
        let mut drafts = drafts.iter();
        let Some(first_draft) = drafts.next() else {
            debug!(id = %candidate.id(), "Nothing to convert");
            return Ok(Vec::new());
        };

        let first = sink.create_task(first_draft).await?;
        let linked = conversion::link(stored, first.as_str(), now)?;
        let converted = conversion::mark_processed(linked);
        self.repository.save(&converted).await?;

        let mut task_ids = vec![first];
        for draft in drafts {
            match sink.create_task(draft).await {
                Ok(task_id) => task_ids.push(task_id),
                Err(error) => {
                    warn!(
                        id = %candidate.id(),
                        created = task_ids.len(),
                        error = %error,
                        "Task creation failed part way through conversion"
                    );
                    return Err(Error::PartialConversion {
                        id: candidate.id().to_string(),
                        created: task_ids,
                        source: error,
                    });
                }
            }
        }

        info!(
            id = %candidate.id(),
            tasks = task_ids.len(),
            "Capture converted"
        );
        Ok(task_ids)
    }

    /// Mark a stored brain dump processed. Idempotent.
    pub async fn mark_processed(&self, id: &str) -> Result<CaptureArtifact> {
        let artifact = self.repository.fetch_by_id(id).await?;
        let processed = conversion::mark_processed(artifact);
        self.repository.save(&processed).await?;
        debug!(id = %id, "Capture marked processed");
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;
    use tokio::sync::Mutex;

    use super::*;
    use crate::capture::emotional::SuggestedPriority;
    use crate::capture::model::{DriveFileMetadata, EmailMetadata};
    use crate::error::{CaptureError, Error};
    use crate::inference::{StaticInferenceService, SuggestionBundle};
    use crate::pipeline::conversion::{Lifecycle, TaskDraft, state_of};
    use crate::store::InMemoryRepository;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    struct StubEmails(Vec<EmailMetadata>);

    #[async_trait]
    impl EmailFetcher for StubEmails {
        fn name(&self) -> &str {
            "stub-email"
        }
        async fn fetch_emails(&self, limit: usize) -> std::result::Result<Vec<EmailMetadata>, CollaboratorError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    struct StubDrive(Vec<DriveFileMetadata>);

    #[async_trait]
    impl DriveFetcher for StubDrive {
        fn name(&self) -> &str {
            "stub-drive"
        }
        async fn fetch_files(&self, limit: usize) -> std::result::Result<Vec<DriveFileMetadata>, CollaboratorError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    struct DownFetcher;

    #[async_trait]
    impl EmailFetcher for DownFetcher {
        fn name(&self) -> &str {
            "down"
        }
        async fn fetch_emails(&self, _limit: usize) -> std::result::Result<Vec<EmailMetadata>, CollaboratorError> {
            Err(CollaboratorError::unavailable("down", "connection reset"))
        }
    }

    /// Fails for texts containing "flaky".
    struct FlakyInference;

    #[async_trait]
    impl InferenceService for FlakyInference {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn suggest(
            &self,
            _source: SourceType,
            text: &str,
        ) -> std::result::Result<SuggestionBundle, CollaboratorError> {
            if text.contains("flaky") {
                return Err(CollaboratorError::unavailable("flaky", "timeout"));
            }
            Ok(SuggestionBundle {
                title: "Follow up".into(),
                confidence: Some(0.9),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        drafts: Mutex<Vec<TaskDraft>>,
        counter: AtomicUsize,
    }

    #[async_trait]
    impl ConversionSink for RecordingSink {
        async fn create_task(&self, draft: &TaskDraft) -> std::result::Result<String, CollaboratorError> {
            self.drafts.lock().await.push(draft.clone());
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("task-{n}"))
        }
    }

    /// Fails on the given 1-based call.
    struct FailingSink {
        fail_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ConversionSink for FailingSink {
        async fn create_task(&self, _draft: &TaskDraft) -> std::result::Result<String, CollaboratorError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                return Err(CollaboratorError::unavailable("tasks", "quota exceeded"));
            }
            Ok(format!("task-{n}"))
        }
    }

    fn email_meta(id: &str, subject: &str) -> EmailMetadata {
        EmailMetadata {
            message_id: id.into(),
            thread_id: id.into(),
            subject: subject.into(),
            body: "see subject".into(),
            sender: "a@example.com".into(),
            received_at: now() - Duration::hours(2),
            is_unread: true,
            labels: BTreeSet::new(),
        }
    }

    fn drive_meta(id: &str, name: &str) -> DriveFileMetadata {
        DriveFileMetadata {
            id: id.into(),
            name: name.into(),
            mime_type: "application/vnd.google-apps.document".into(),
            created_at: now() - Duration::days(2),
            modified_at: now() - Duration::days(1),
            web_view_link: None,
            icon_link: None,
            size: None,
            is_folder: false,
            owners: vec![],
            is_shared: false,
        }
    }

    fn pipeline(
        inference: Arc<dyn InferenceService>,
    ) -> (CapturePipeline, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let pipeline = CapturePipeline::new(PipelineConfig::default(), inference, repo.clone());
        (pipeline, repo)
    }

    fn canned() -> Arc<dyn InferenceService> {
        Arc::new(StaticInferenceService::new(SuggestionBundle {
            priority: SuggestedPriority::Simple,
            confidence: Some(0.4),
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn brain_dump_is_annotated_and_saved() {
        let (pipeline, repo) = pipeline(canned());
        let candidate = pipeline
            .capture_brain_dump(
                "- buy milk\n- call mom",
                vec!["home".into()],
                Some("tired".into()),
                now(),
            )
            .await
            .unwrap();
        assert_eq!(candidate.signals.title, "buy milk");
        assert_eq!(candidate.signals.line_items.len(), 2);
        assert_eq!(candidate.score.confidence, 0.4);
        let stored = repo.fetch_by_id(candidate.id()).await.unwrap();
        assert_eq!(stored, candidate.artifact);
    }

    #[tokio::test]
    async fn empty_brain_dump_is_rejected() {
        let (pipeline, repo) = pipeline(canned());
        let err = pipeline
            .capture_brain_dump("   ", vec![], None, now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Capture(CaptureError::InvalidCapture { .. })));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn email_batch_records_per_item_failures() {
        let (pipeline, repo) = pipeline(Arc::new(FlakyInference));
        let fetcher = StubEmails(vec![
            email_meta("m1", "Invoice"),
            email_meta("m2", "flaky request"),
            email_meta("m3", "Lunch"),
        ]);
        let report = pipeline.ingest_emails(&fetcher, None, now()).await.unwrap();
        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "m2");
        assert!(report.candidates.iter().all(|c| c.score.is_high_priority));
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn email_fetch_respects_limit() {
        let (pipeline, _repo) = pipeline(canned());
        let fetcher = StubEmails((0..15).map(|i| email_meta(&format!("m{i}"), "Hi")).collect());
        let report = pipeline.ingest_emails(&fetcher, None, now()).await.unwrap();
        assert_eq!(report.candidates.len(), 10);
        let report = pipeline.ingest_emails(&fetcher, Some(3), now()).await.unwrap();
        assert_eq!(report.candidates.len(), 3);
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let (pipeline, _repo) = pipeline(canned());
        let err = pipeline.ingest_emails(&DownFetcher, None, now()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Collaborator(CollaboratorError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn drive_batch_dedups_and_scores() {
        let (pipeline, repo) = pipeline(canned());
        let fetcher = StubDrive(vec![
            drive_meta("f1", "Project plan"),
            drive_meta("f2", "Holiday photos"),
            drive_meta("f1", "Project plan (copy)"),
        ]);
        let report = pipeline.ingest_drive(&fetcher, None, now()).await.unwrap();
        let ids: Vec<&str> = report.candidates.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["f1", "f2"]);
        assert_eq!(report.task_relevant().count(), 1);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn convert_links_and_processes_brain_dump() {
        let (pipeline, repo) = pipeline(canned());
        let candidate = pipeline
            .capture_brain_dump("- buy milk\n- call mom", vec![], None, now())
            .await
            .unwrap();
        let sink = RecordingSink::default();

        let ids = pipeline.convert_with(&candidate, &sink, now()).await.unwrap();
        assert_eq!(ids, vec!["task-1", "task-2"]);
        assert_eq!(sink.drafts.lock().await.len(), 2);

        let stored = repo.fetch_by_id(candidate.id()).await.unwrap();
        let state = state_of(&stored);
        assert_eq!(state.lifecycle, Some(Lifecycle::Processed));
        assert_eq!(stored.linked_task_id(), Some("task-1"));

        let again = pipeline
            .review_recent(SourceType::BrainDump, None, now())
            .await
            .unwrap();
        assert!(pipeline.convert_with(&again[0], &sink, now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_conversion_rejects_relink() {
        let (pipeline, _repo) = pipeline(canned());
        let fetcher = StubEmails(vec![email_meta("m1", "Invoice")]);
        pipeline.ingest_emails(&fetcher, None, now()).await.unwrap();

        let linked = pipeline.record_conversion("m1", "task-7", now()).await.unwrap();
        assert_eq!(linked.linked_task_id(), Some("task-7"));
        pipeline.record_conversion("m1", "task-7", now()).await.unwrap();
        let err = pipeline
            .record_conversion("m1", "task-8", now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Capture(CaptureError::AlreadyLinked { .. })));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (pipeline, _repo) = pipeline(canned());
        assert!(matches!(
            pipeline.mark_processed("missing").await,
            Err(Error::Collaborator(CollaboratorError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn mark_processed_is_idempotent_through_store() {
        let (pipeline, _repo) = pipeline(canned());
        let candidate = pipeline
            .capture_brain_dump("remember keys", vec![], None, now())
            .await
            .unwrap();
        let once = pipeline.mark_processed(candidate.id()).await.unwrap();
        let twice = pipeline.mark_processed(candidate.id()).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn reingest_keeps_existing_links() {
        let (pipeline, repo) = pipeline(canned());
        let emails = StubEmails(vec![email_meta("m1", "Invoice")]);
        let drive = StubDrive(vec![drive_meta("f1", "Project plan")]);
        pipeline.ingest_emails(&emails, None, now()).await.unwrap();
        pipeline.ingest_drive(&drive, None, now()).await.unwrap();
        pipeline.record_conversion("m1", "task-7", now()).await.unwrap();
        pipeline.record_conversion("f1", "task-8", now()).await.unwrap();

        let later = now() + Duration::hours(1);
        pipeline.ingest_emails(&emails, None, later).await.unwrap();
        let report = pipeline.ingest_drive(&drive, None, later).await.unwrap();

        let email = repo.fetch_by_id("m1").await.unwrap();
        assert_eq!(email.linked_task_id(), Some("task-7"));
        assert_eq!(email.task_link().map(|l| l.linked_at), Some(now()));

        let file = repo.fetch_by_id("f1").await.unwrap();
        assert_eq!(file.linked_task_id(), Some("task-8"));
        assert!((report.candidates[0].score.confidence - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stale_candidate_does_not_overwrite_link() {
        let (pipeline, repo) = pipeline(canned());
        let candidate = pipeline
            .capture_brain_dump("- buy milk", vec![], None, now())
            .await
            .unwrap();
        pipeline.record_conversion(candidate.id(), "task-A", now()).await.unwrap();

        let sink = RecordingSink::default();
        let ids = pipeline.convert_with(&candidate, &sink, now()).await.unwrap();
        assert!(ids.is_empty());
        assert!(sink.drafts.lock().await.is_empty());
        let stored = repo.fetch_by_id(candidate.id()).await.unwrap();
        assert_eq!(stored.linked_task_id(), Some("task-A"));
    }

    #[tokio::test]
    async fn failed_draft_keeps_first_link_and_retry_creates_nothing() {
        let (pipeline, repo) = pipeline(canned());
        let candidate = pipeline
            .capture_brain_dump("- buy milk\n- call mom\n- pay rent", vec![], None, now())
            .await
            .unwrap();
        let sink = FailingSink {
            fail_on: 2,
            calls: AtomicUsize::new(0),
        };

        let err = pipeline.convert_with(&candidate, &sink, now()).await.unwrap_err();
        match err {
            Error::PartialConversion { id, created, .. } => {
                assert_eq!(id, candidate.id());
                assert_eq!(created, vec!["task-1"]);
            }
            other => panic!("Expected PartialConversion, got {other:?}"),
        }
        let stored = repo.fetch_by_id(candidate.id()).await.unwrap();
        assert_eq!(stored.linked_task_id(), Some("task-1"));

        let retry = pipeline.convert_with(&candidate, &sink, now()).await.unwrap();
        assert!(retry.is_empty());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn review_scores_brain_dump_like_capture() {
        let (pipeline, _repo) = pipeline(Arc::new(FlakyInference));
        let captured = pipeline
            .capture_brain_dump("remember the dentist", vec![], None, now())
            .await
            .unwrap();
        assert_eq!(captured.signals.title, "Follow up");

        let reviewed = pipeline
            .review_recent(SourceType::BrainDump, None, now())
            .await
            .unwrap();
        assert_eq!(reviewed.len(), 1);
        assert_eq!(reviewed[0].signals, captured.signals);
        assert_eq!(reviewed[0].score, captured.score);
        assert_eq!(reviewed[0].adaptation, captured.adaptation);
    }
}
