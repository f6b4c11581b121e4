//! Report pipeline orchestrator.
//!
//! Drives one request through:
//! validate → store → extract → analyze → [translate] → format → cleanup.
//!
//! Every collaborator is injected behind a trait so the whole pipeline runs
//! against mocks in tests. Any stage failure short-circuits; the stored
//! artifact is removed on every exit path.

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MIN_TEXT_CHARS};
use crate::pipeline::analysis::{
    parse_recommended_specialist, AnalysisError, AnalysisInput, AnalysisMode, InlineImage,
    PromptTemplate, ReportAnalyzer, Specialist,
};
use crate::pipeline::cleanup::CleanupGuard;
use crate::pipeline::extraction::{
    ensure_readable, read_artifact, ExtractedText, ExtractionError, ProgressSink, TextExtractor,
};
use crate::pipeline::formatting::{pass_through, synthesize_fields, FormatStrategy, ReportFields};
use crate::pipeline::translation::{get_language_code, SectionTranslator, TranslationError};
use crate::pipeline::upload::{
    ArtifactStore, UploadArtifact, UploadError, UploadPolicy, UploadedFile, IMAGE_TYPES, MIME_PDF,
};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can end a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Everything that distinguishes one upload endpoint from another.
#[derive(Debug, Clone)]
pub struct PipelineProfile {
    pub name: &'static str,
    pub upload: UploadPolicy,
    pub mode: AnalysisMode,
    pub prompt: PromptTemplate,
    pub format_strategy: FormatStrategy,
}

impl PipelineProfile {
    /// Written report image, LLM analysis, pass-through output.
    pub fn report(max_size_bytes: u64) -> Self {
        Self {
            name: "report",
            upload: UploadPolicy::new(IMAGE_TYPES, max_size_bytes),
            mode: AnalysisMode::Text,
            prompt: PromptTemplate::for_mode(AnalysisMode::Text),
            format_strategy: FormatStrategy::PassThrough,
        }
    }

    /// Radiograph sent straight to a vision model.
    pub fn xray(max_size_bytes: u64) -> Self {
        Self {
            name: "xray",
            upload: UploadPolicy::new(IMAGE_TYPES, max_size_bytes),
            mode: AnalysisMode::Xray,
            prompt: PromptTemplate::for_mode(AnalysisMode::Xray),
            format_strategy: FormatStrategy::PassThrough,
        }
    }

    /// Images or PDFs, pattern-matched fields instead of an LLM.
    pub fn fields(max_size_bytes: u64) -> Self {
        let mut types = IMAGE_TYPES.to_vec();
        types.push(MIME_PDF);
        Self {
            name: "fields",
            upload: UploadPolicy::new(&types, max_size_bytes),
            mode: AnalysisMode::Text,
            prompt: PromptTemplate::for_mode(AnalysisMode::Text),
            format_strategy: FormatStrategy::FieldSynthesis,
        }
    }
}

impl Default for PipelineProfile {
    fn default() -> Self {
        Self::report(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// Pipeline progress, in order. `Translated` is skipped for the default
/// language; `TextExtracted` is skipped in X-ray mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Validated,
    TextExtracted,
    Analyzed,
    Translated,
    Formatted,
    CleanedUp,
}

/// Per-request options besides the file itself.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    /// Target language name (`hindi`, `tamil`, ...). `None` means no translation.
    pub language: Option<String>,
    pub progress: Option<ProgressSink>,
}

impl ProcessRequest {
    pub fn with_language(language: &str) -> Self {
        Self {
            language: Some(language.to_string()),
            progress: None,
        }
    }
}

/// Successful pipeline result.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub formatted_output: String,
    /// OCR text, absent in X-ray mode.
    pub extracted_text: Option<String>,
    /// Field-synthesis record, absent for pass-through.
    pub raw_analysis: Option<ReportFields>,
    pub recommended_specialist: Option<Specialist>,
    pub language_code: &'static str,
    pub stages: Vec<PipelineStage>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs uploads through the report pipeline. Holds no per-request state,
/// so one instance serves all concurrent requests.
pub struct ReportProcessor {
    store: ArtifactStore,
    extractor: TextExtractor,
    analyzer: ReportAnalyzer,
    translator: SectionTranslator,
    min_text_chars: usize,
}

/// Stage bookkeeping for one run.
struct StageLog(Vec<PipelineStage>);

impl StageLog {
    fn enter(&mut self, stage: PipelineStage) {
        tracing::debug!(stage = ?stage, "Stage reached");
        self.0.push(stage);
    }

    fn last(&self) -> PipelineStage {
        self.0.last().copied().unwrap_or(PipelineStage::Received)
    }
}

impl ReportProcessor {
    pub fn new(
        store: ArtifactStore,
        extractor: TextExtractor,
        analyzer: ReportAnalyzer,
        translator: SectionTranslator,
    ) -> Self {
        Self {
            store,
            extractor,
            analyzer,
            translator,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }

    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    /// Full pipeline for one upload.
    pub async fn process(
        &self,
        upload: Option<UploadedFile>,
        profile: &PipelineProfile,
        request: ProcessRequest,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let span = tracing::info_span!(
            "report_pipeline",
            request_id = %Uuid::new_v4(),
            profile = profile.name,
        );

        async {
            let artifact = self.admit_and_store(upload.as_ref(), profile).await?;
            self.process_artifact(artifact, profile, request).await
        }
        .instrument(span)
        .await
    }

    /// Validate against the profile, then write to the artifact store.
    /// Rejected uploads never touch storage.
    pub async fn admit_and_store(
        &self,
        upload: Option<&UploadedFile>,
        profile: &PipelineProfile,
    ) -> Result<UploadArtifact, ProcessingError> {
        let admission = profile.upload.admit(upload).map_err(|e| {
            tracing::info!(reason = %e, "Upload rejected");
            e
        })?;
        // admit() has already rejected a missing upload
        let upload = upload.ok_or(UploadError::NoFile)?;
        Ok(self.store.store(upload, &admission).await?)
    }

    /// Run every stage after storage. The artifact is deleted before this
    /// returns, whatever the outcome.
    pub async fn process_artifact(
        &self,
        artifact: UploadArtifact,
        profile: &PipelineProfile,
        request: ProcessRequest,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let guard = CleanupGuard::new(artifact.path.clone());
        let mut stages = StageLog(vec![PipelineStage::Received, PipelineStage::Validated]);
        let start = std::time::Instant::now();

        let result = self.run_stages(&artifact, profile, &request, &mut stages).await;

        let cleanup = guard.finish().await;
        let failed_at = stages.last();
        stages.enter(PipelineStage::CleanedUp);

        match result {
            Ok(mut outcome) => {
                outcome.stages = stages.0;
                tracing::info!(
                    elapsed_ms = %start.elapsed().as_millis(),
                    output_len = outcome.formatted_output.len(),
                    cleanup = ?cleanup,
                    "Pipeline succeeded"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(
                    after_stage = ?failed_at,
                    error = %e,
                    cleanup = ?cleanup,
                    "Pipeline failed"
                );
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        artifact: &UploadArtifact,
        profile: &PipelineProfile,
        request: &ProcessRequest,
        stages: &mut StageLog,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let language = request.language.as_deref().unwrap_or_default();
        let translate = self.translator.needs_translation(language);

        // X-ray analysis works on the image itself, there is no text to extract.
        let extracted = match profile.mode {
            AnalysisMode::Xray if profile.format_strategy.requires_analysis() => None,
            _ => {
                let raw = self.extractor.extract(artifact, request.progress.as_ref()).await?;
                let text = ExtractedText::new(raw, self.min_text_chars)?;
                stages.enter(PipelineStage::TextExtracted);
                tracing::info!(text_len = text.as_str().len(), "Text extracted");
                Some(text.into_inner())
            }
        };

        let mut outcome = ProcessingOutcome {
            formatted_output: String::new(),
            extracted_text: extracted.clone(),
            raw_analysis: None,
            recommended_specialist: None,
            language_code: get_language_code(language),
            stages: Vec::new(),
        };

        let report = match profile.format_strategy {
            FormatStrategy::PassThrough => {
                let input = match &extracted {
                    Some(text) => AnalysisInput::Text(text),
                    None => {
                        ensure_readable(artifact).await?;
                        let bytes = read_artifact(artifact).await?;
                        AnalysisInput::Image(InlineImage::from_bytes(&artifact.mime_type, &bytes))
                    }
                };
                let analysis = self.analyzer.analyze(input, &profile.prompt, profile.mode).await?;
                stages.enter(PipelineStage::Analyzed);

                // Labels are only recognizable before translation.
                if profile.mode == AnalysisMode::Text {
                    outcome.recommended_specialist = parse_recommended_specialist(&analysis);
                }

                let analysis = if translate {
                    let translated = self.translator.translate_analysis(&analysis, language).await?;
                    stages.enter(PipelineStage::Translated);
                    translated
                } else {
                    analysis
                };
                pass_through(&analysis)
            }
            FormatStrategy::FieldSynthesis => {
                let text = extracted.as_deref().unwrap_or_default();
                let mut report = synthesize_fields(text);
                if translate {
                    report.text = self.translator.translate_analysis(&report.text, language).await?;
                    stages.enter(PipelineStage::Translated);
                }
                report
            }
        };
        stages.enter(PipelineStage::Formatted);

        outcome.formatted_output = report.text;
        outcome.raw_analysis = report.fields;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::pipeline::analysis::{AnalysisProvider, MockAnalysisProvider, SamplingParams};
    use crate::pipeline::extraction::{MockOcrProvider, OcrProvider};
    use crate::pipeline::translation::{
        count_numbered_sections, MockTranslationProvider, TranslationProvider,
    };

    const FIVE_SECTIONS: &str = "1. Symptoms:\nHeadache and nausea\n\n2. Diagnosis:\nMigraine\n\n\
        3. Severity Level:\nModerate\n\n4. Treatment Recommendations:\nRest in a dark room\n\n\
        5. Recommended Specialist:\nNeurologist";

    const BP_REPORT: &str = "Patient vitals recorded.\nBlood Pressure: 138/88 mmHg\nPulse: 76";

    struct Harness {
        _dir: tempfile::TempDir,
        upload_dir: std::path::PathBuf,
        ocr: Arc<MockOcrProvider>,
        analysis: Arc<MockAnalysisProvider>,
        translation: Arc<MockTranslationProvider>,
        processor: ReportProcessor,
    }

    fn harness(ocr_text: &str, analysis: &str) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        let ocr = Arc::new(MockOcrProvider::new(ocr_text));
        let analysis = Arc::new(MockAnalysisProvider::new(analysis));
        let translation = Arc::new(MockTranslationProvider::new());

        let processor = ReportProcessor::new(
            ArtifactStore::new(&upload_dir),
            TextExtractor::new(ocr.clone() as Arc<dyn OcrProvider>, "eng", Duration::from_secs(5)),
            ReportAnalyzer::new(
                analysis.clone() as Arc<dyn AnalysisProvider>,
                SamplingParams::default(),
                Duration::from_secs(5),
            ),
            SectionTranslator::new(
                translation.clone() as Arc<dyn TranslationProvider>,
                "en",
                Duration::from_secs(5),
            ),
        );

        Harness {
            _dir: dir,
            upload_dir,
            ocr,
            analysis,
            translation,
            processor,
        }
    }

    fn png(size: usize) -> UploadedFile {
        UploadedFile::new("scan.png", "image/png", vec![0u8; size])
    }

    fn jpeg(size: usize) -> UploadedFile {
        UploadedFile::new("report.jpg", "image/jpeg", vec![0u8; size])
    }

    fn upload_dir_is_empty(dir: &std::path::Path) -> bool {
        match std::fs::read_dir(dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[tokio::test]
    async fn report_profile_returns_analysis_and_cleans_up() {
        let h = harness("Headache for three days, nausea.", FIVE_SECTIONS);
        let outcome = h
            .processor
            .process(
                Some(png(1024)),
                &PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.formatted_output, FIVE_SECTIONS);
        assert_eq!(
            outcome.extracted_text.as_deref(),
            Some("Headache for three days, nausea.")
        );
        assert_eq!(outcome.recommended_specialist, Some(Specialist::Neurologist));
        assert_eq!(outcome.language_code, "en");
        assert_eq!(
            outcome.stages,
            vec![
                PipelineStage::Received,
                PipelineStage::Validated,
                PipelineStage::TextExtracted,
                PipelineStage::Analyzed,
                PipelineStage::Formatted,
                PipelineStage::CleanedUp,
            ]
        );
        assert_eq!(h.translation.call_count(), 0);
        assert!(upload_dir_is_empty(&h.upload_dir));
    }

    #[tokio::test]
    async fn oversized_png_is_rejected_before_ocr() {
        let h = harness("unused", FIVE_SECTIONS);
        let err = h
            .processor
            .process(
                Some(png(6 * 1024 * 1024)),
                &PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProcessingError::Upload(UploadError::FileTooLarge { .. })
        ));
        assert!(err.to_string().contains("too large"));
        assert_eq!(h.ocr.call_count(), 0);
        assert!(upload_dir_is_empty(&h.upload_dir));
    }

    #[tokio::test]
    async fn missing_file_and_wrong_type_are_rejected() {
        let h = harness("unused", FIVE_SECTIONS);
        let profile = PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES);

        let err = h
            .processor
            .process(None, &profile, ProcessRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Upload(UploadError::NoFile)));

        let pdf = UploadedFile::new("r.pdf", "application/pdf", vec![1; 10]);
        let err = h
            .processor
            .process(Some(pdf), &profile, ProcessRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::Upload(UploadError::UnsupportedType(..))
        ));
        assert_eq!(h.ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn artifact_deleted_before_extraction_is_file_access_error() {
        let h = harness("never read", FIVE_SECTIONS);
        let profile = PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES);

        let artifact = h
            .processor
            .admit_and_store(Some(&png(512)), &profile)
            .await
            .unwrap();
        std::fs::remove_file(&artifact.path).unwrap();

        let err = h
            .processor
            .process_artifact(artifact, &profile, ProcessRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProcessingError::Extraction(ExtractionError::FileNotFound)
        ));
        assert_eq!(h.ocr.call_count(), 0);
        assert_eq!(h.analysis.call_count(), 0);
    }

    #[tokio::test]
    async fn insufficient_text_fails_and_cleans_up() {
        let h = harness("  123456789  ", FIVE_SECTIONS);
        let err = h
            .processor
            .process(
                Some(png(64)),
                &PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProcessingError::Extraction(ExtractionError::InsufficientText {
                found: 9,
                required: 10,
            })
        ));
        assert_eq!(h.analysis.call_count(), 0);
        assert!(upload_dir_is_empty(&h.upload_dir));
    }

    #[tokio::test]
    async fn ten_characters_proceed_to_analysis() {
        let h = harness("1234567890", FIVE_SECTIONS);
        h.processor
            .process(
                Some(png(64)),
                &PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(h.analysis.call_count(), 1);
    }

    #[tokio::test]
    async fn threshold_is_configurable() {
        let mut h = harness("short text", FIVE_SECTIONS);
        h.processor = h.processor.with_min_text_chars(50);
        let err = h
            .processor
            .process(
                Some(png(64)),
                &PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::Extraction(ExtractionError::InsufficientText { required: 50, .. })
        ));
    }

    #[tokio::test]
    async fn blood_pressure_scenario_keeps_digits() {
        let h = harness(BP_REPORT, FIVE_SECTIONS);
        let outcome = h
            .processor
            .process(
                Some(jpeg(2 * 1024 * 1024)),
                &PipelineProfile::fields(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::default(),
            )
            .await
            .unwrap();

        assert!(outcome
            .formatted_output
            .lines()
            .any(|l| l == "- Blood Pressure: 138/88"));
        let fields = outcome.raw_analysis.unwrap();
        assert_eq!(fields.vitals.pulse.as_deref(), Some("76"));
        // Field synthesis does not call the analyzer.
        assert_eq!(h.analysis.call_count(), 0);
        assert!(upload_dir_is_empty(&h.upload_dir));
    }

    #[tokio::test]
    async fn hindi_keeps_five_headers() {
        let h = harness("Headache for three days, nausea.", FIVE_SECTIONS);
        let outcome = h
            .processor
            .process(
                Some(png(1024)),
                &PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::with_language("hindi"),
            )
            .await
            .unwrap();

        let out = &outcome.formatted_output;
        assert_eq!(count_numbered_sections(out), 5);
        for header in [
            "1. Symptoms:\n[hi] ",
            "2. Diagnosis:\n[hi] ",
            "3. Severity Level:\n[hi] ",
            "4. Treatment Recommendations:\n[hi] ",
            "5. Recommended Specialist:\n[hi] ",
        ] {
            assert!(out.contains(header), "missing {header:?} in {out}");
        }
        assert_eq!(h.translation.call_count(), 5);
        assert_eq!(outcome.language_code, "hi");
        assert_eq!(outcome.recommended_specialist, Some(Specialist::Neurologist));
        assert!(outcome.stages.contains(&PipelineStage::Translated));
    }

    #[tokio::test]
    async fn xray_profile_skips_ocr_and_sends_image() {
        let h = harness("unused", "1. Overview: Forearm. 2. Fracture Status: None.");
        let outcome = h
            .processor
            .process(
                Some(png(256)),
                &PipelineProfile::xray(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::default(),
            )
            .await
            .unwrap();

        assert_eq!(h.ocr.call_count(), 0);
        assert!(outcome.extracted_text.is_none());
        assert!(outcome.recommended_specialist.is_none());
        assert_eq!(
            outcome.formatted_output,
            "1. Overview: Forearm.\n2. Fracture Status: None."
        );
        let (system, content) = h.analysis.last_request().unwrap();
        assert!(system.contains("Fracture Status"));
        assert!(matches!(content, crate::pipeline::analysis::UserContent::Image { .. }));
        assert!(!outcome.stages.contains(&PipelineStage::TextExtracted));
    }

    #[tokio::test]
    async fn analysis_failure_still_cleans_up() {
        let mut h = harness("Headache for three days.", FIVE_SECTIONS);
        let failing = Arc::new(MockAnalysisProvider::failing("upstream 500"));
        h.processor.analyzer = ReportAnalyzer::new(
            failing as Arc<dyn AnalysisProvider>,
            SamplingParams::default(),
            Duration::from_secs(5),
        );

        let err = h
            .processor
            .process(
                Some(png(64)),
                &PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Analysis(AnalysisError::Provider { .. })));
        assert!(upload_dir_is_empty(&h.upload_dir));
    }

    #[tokio::test]
    async fn translation_failure_aborts_without_partial_result() {
        let mut h = harness("Headache for three days.", FIVE_SECTIONS);
        h.processor.translator = SectionTranslator::new(
            Arc::new(MockTranslationProvider::failing_on("Migraine")),
            "en",
            Duration::from_secs(5),
        );

        let err = h
            .processor
            .process(
                Some(png(64)),
                &PipelineProfile::report(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::with_language("tamil"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Translation(_)));
        assert!(upload_dir_is_empty(&h.upload_dir));
    }

    #[tokio::test]
    async fn fields_profile_accepts_pdf() {
        let h = harness("unused", FIVE_SECTIONS);
        let pdf = UploadedFile::new("labs.pdf", "application/pdf", b"%PDF-1.4 broken".to_vec());
        let err = h
            .processor
            .process(
                Some(pdf),
                &PipelineProfile::fields(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::default(),
            )
            .await
            .unwrap_err();

        // Admitted and routed to the text layer reader, not OCR.
        assert!(matches!(err, ProcessingError::Extraction(ExtractionError::PdfParsing(_))));
        assert_eq!(h.ocr.call_count(), 0);
        assert!(upload_dir_is_empty(&h.upload_dir));
    }

    #[tokio::test]
    async fn fields_profile_translates_rendered_report() {
        let h = harness(BP_REPORT, FIVE_SECTIONS);
        let outcome = h
            .processor
            .process(
                Some(png(64)),
                &PipelineProfile::fields(DEFAULT_MAX_UPLOAD_BYTES),
                ProcessRequest::with_language("marathi"),
            )
            .await
            .unwrap();
        assert!(outcome.formatted_output.starts_with("[mr] Medical Report Analysis"));
        assert_eq!(h.translation.call_count(), 1);
    }
}
