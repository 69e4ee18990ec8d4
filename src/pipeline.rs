//! Pipeline orchestrator for klar.
//!
//! Coordinates one request from URL validation through audio extraction and
//! analysis to the validated insight. Stages advance strictly forward and a
//! failure in any stage short-circuits the rest.

use crate::analysis::{
    schema, with_retry, CommunicationAnalysis, GeminiClient, InsightService, RetryPolicy,
};
use crate::audio::{Extractor, YtDlpExtractor};
use crate::config::{Prompts, Settings};
use crate::error::KlarError;
use crate::toolchain::{DependencyProbe, SystemToolchain};
use crate::video_url::UrlPolicy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, Span};

/// The stage a pipeline failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    CheckingDependencies,
    Extracting,
    Analyzing,
    ValidatingResponse,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::CheckingDependencies => "checking-dependencies",
            Stage::Extracting => "extracting",
            Stage::Analyzing => "analyzing",
            Stage::ValidatingResponse => "validating-response",
        };
        write!(f, "{name}")
    }
}

/// A pipeline failure: the underlying error plus the stage it came from.
#[derive(Debug)]
pub struct PipelineError {
    pub stage: Stage,
    pub error: KlarError,
}

impl PipelineError {
    /// Stable identifier of the underlying error kind.
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (stage: {})", self.error, self.stage)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// One unit of pipeline work. Created at entry, discarded at exit.
#[derive(Debug)]
struct VideoRequest {
    id: u64,
    raw_url: String,
}

/// The main pipeline for klar.
pub struct Pipeline {
    url_policy: UrlPolicy,
    probe: Arc<dyn DependencyProbe>,
    extractor: Arc<dyn Extractor>,
    service: Arc<dyn InsightService>,
    retry: RetryPolicy,
    next_request_id: AtomicU64,
}

impl Pipeline {
    /// Create a pipeline with the concrete components wired from settings.
    pub fn new(settings: &Settings, api_key: String) -> crate::error::Result<Self> {
        // Load prompts (with optional custom directory and variables)
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let extractor = Arc::new(YtDlpExtractor::new(
            settings.temp_dir(),
            settings.extraction.max_duration_seconds,
            settings.extraction.timeout_seconds,
        ));

        let service = Arc::new(GeminiClient::new(
            &settings.analysis,
            api_key,
            prompts.rendered_analysis(),
        )?);

        Ok(Self {
            url_policy: UrlPolicy::new(&settings.sources.allowed_hosts),
            probe: Arc::new(SystemToolchain),
            extractor,
            service,
            retry: settings.retry.policy(),
            next_request_id: AtomicU64::new(1),
        })
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        url_policy: UrlPolicy,
        probe: Arc<dyn DependencyProbe>,
        extractor: Arc<dyn Extractor>,
        service: Arc<dyn InsightService>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            url_policy,
            probe,
            extractor,
            service,
            retry,
            next_request_id: AtomicU64::new(1),
        }
    }

    fn next_request(&self, raw_url: &str) -> VideoRequest {
        VideoRequest {
            id: self.next_request_id.fetch_add(1, Ordering::Relaxed),
            raw_url: raw_url.to_string(),
        }
    }

    /// Run the full pipeline for one URL.
    ///
    /// Validate URL -> check dependencies -> extract audio -> analyze (with
    /// retry) -> validate response. The scratch audio never survives this
    /// call, whichever way it ends.
    #[instrument(skip(self, raw_url), fields(request_id = tracing::field::Empty, url = %raw_url))]
    pub async fn run(
        &self,
        raw_url: &str,
    ) -> std::result::Result<CommunicationAnalysis, PipelineError> {
        let request = self.next_request(raw_url);
        Span::current().record("request_id", request.id);

        let url = self.url_policy.validate(&request.raw_url).map_err(|error| {
            PipelineError {
                stage: Stage::Validating,
                error,
            }
        })?;

        self.probe.verify().await.map_err(|error| PipelineError {
            stage: Stage::CheckingDependencies,
            error,
        })?;

        let audio = self
            .extractor
            .extract(&url)
            .await
            .map_err(|error| PipelineError {
                stage: Stage::Extracting,
                error,
            })?;

        info!(
            "Audio extracted ({} bytes), starting analysis",
            audio.size_bytes()
        );

        let raw = with_retry(&self.retry, || self.service.analyze(&audio))
            .await
            .map_err(|error| PipelineError {
                stage: Stage::Analyzing,
                error,
            })?;

        // The scratch file is not needed past this point
        drop(audio);

        let analysis = schema::parse_and_validate(&raw).map_err(|error| PipelineError {
            stage: Stage::ValidatingResponse,
            error,
        })?;

        info!("Analysis complete (clarity score {})", analysis.clarity_score);
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ExtractedAudio;
    use crate::video_url::VideoUrl;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    const VALID_RESPONSE: &str = r#"{
        "transcript": "Thanks everyone for joining today.",
        "clarity_score": 82,
        "communication_focus": "A concise project status update."
    }"#;

    const TEST_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    struct MockProbe {
        calls: AtomicUsize,
        missing_tool: Option<String>,
    }

    impl MockProbe {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                missing_tool: None,
            })
        }

        fn missing(tool: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                missing_tool: Some(tool.to_string()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DependencyProbe for MockProbe {
        async fn verify(&self) -> crate::error::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.missing_tool {
                Some(tool) => Err(KlarError::MissingDependency(tool.clone())),
                None => Ok(()),
            }
        }
    }

    struct MockExtractor {
        calls: AtomicUsize,
        fail: bool,
        last_audio_path: Mutex<Option<PathBuf>>,
    }

    impl MockExtractor {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
                last_audio_path: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
                last_audio_path: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_audio_path(&self) -> Option<PathBuf> {
            self.last_audio_path.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Extractor for MockExtractor {
        async fn extract(&self, url: &VideoUrl) -> crate::error::Result<ExtractedAudio> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(KlarError::Extraction("no audio stream".into()));
            }

            let scratch = tempfile::tempdir().unwrap();
            let path = scratch.path().join("audio.mp3");
            std::fs::write(&path, b"pretend mp3").unwrap();
            *self.last_audio_path.lock().unwrap() = Some(path.clone());

            Ok(ExtractedAudio::new(
                scratch,
                path,
                11,
                url.as_str().to_string(),
            ))
        }
    }

    struct ScriptedService {
        calls: AtomicUsize,
        script: Mutex<VecDeque<crate::error::Result<String>>>,
    }

    impl ScriptedService {
        fn with(script: Vec<crate::error::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script.into()),
            })
        }

        fn always_ok() -> Arc<Self> {
            Self::with(Vec::new())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InsightService for ScriptedService {
        async fn analyze(&self, _audio: &ExtractedAudio) -> crate::error::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(VALID_RESPONSE.to_string()))
        }
    }

    fn transient() -> crate::error::Result<String> {
        Err(KlarError::ServiceUnavailable("overloaded".into()))
    }

    fn test_pipeline(
        probe: Arc<MockProbe>,
        extractor: Arc<MockExtractor>,
        service: Arc<ScriptedService>,
    ) -> Pipeline {
        Pipeline::with_components(
            UrlPolicy::default(),
            probe,
            extractor,
            service,
            RetryPolicy {
                max_attempts: 4,
                base_delay: Duration::from_millis(1),
                multiplier: 2.0,
                jitter: 0.0,
            },
        )
    }

    #[tokio::test]
    async fn test_happy_path_returns_service_result_verbatim() {
        let pipeline = test_pipeline(MockProbe::ok(), MockExtractor::ok(), ScriptedService::always_ok());

        let analysis = pipeline.run(TEST_URL).await.unwrap();
        assert_eq!(analysis.clarity_score, 82);
        assert_eq!(
            analysis.communication_focus,
            "A concise project status update."
        );
        assert_eq!(
            analysis.transcript.full_text(),
            "Thanks everyone for joining today."
        );
    }

    #[tokio::test]
    async fn test_rejected_url_stops_before_any_component_runs() {
        let probe = MockProbe::ok();
        let extractor = MockExtractor::ok();
        let service = ScriptedService::always_ok();
        let pipeline = test_pipeline(probe.clone(), extractor.clone(), service.clone());

        let err = pipeline.run("https://evil.example/watch?v=x").await.unwrap_err();
        assert_eq!(err.stage, Stage::Validating);
        assert_eq!(err.kind(), "invalid_url");
        assert_eq!(probe.calls(), 0);
        assert_eq!(extractor.calls(), 0);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_dependency_stops_before_extraction() {
        let extractor = MockExtractor::ok();
        let service = ScriptedService::always_ok();
        let pipeline = test_pipeline(
            MockProbe::missing("yt-dlp"),
            extractor.clone(),
            service.clone(),
        );

        let err = pipeline.run(TEST_URL).await.unwrap_err();
        assert_eq!(err.stage, Stage::CheckingDependencies);
        assert_eq!(err.kind(), "missing_dependency");
        assert!(err.to_string().contains("yt-dlp"));
        assert_eq!(extractor.calls(), 0);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_skips_analysis() {
        let service = ScriptedService::always_ok();
        let pipeline = test_pipeline(MockProbe::ok(), MockExtractor::failing(), service.clone());

        let err = pipeline.run(TEST_URL).await.unwrap_err();
        assert_eq!(err.stage, Stage::Extracting);
        assert_eq!(err.kind(), "extraction_failed");
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_to_success() {
        let service = ScriptedService::with(vec![
            transient(),
            transient(),
            Ok(VALID_RESPONSE.to_string()),
        ]);
        let pipeline = test_pipeline(MockProbe::ok(), MockExtractor::ok(), service.clone());

        let analysis = pipeline.run(TEST_URL).await.unwrap();
        assert_eq!(analysis.clarity_score, 82);
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_service_unavailable() {
        let service = ScriptedService::with(vec![
            transient(),
            transient(),
            transient(),
            transient(),
        ]);
        let pipeline = test_pipeline(MockProbe::ok(), MockExtractor::ok(), service.clone());

        let err = pipeline.run(TEST_URL).await.unwrap_err();
        assert_eq!(err.stage, Stage::Analyzing);
        assert_eq!(err.kind(), "service_unavailable");
        assert_eq!(service.calls(), 4);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let service = ScriptedService::with(vec![Err(KlarError::AnalysisFailed(
            "audio rejected".into(),
        ))]);
        let pipeline = test_pipeline(MockProbe::ok(), MockExtractor::ok(), service.clone());

        let err = pipeline.run(TEST_URL).await.unwrap_err();
        assert_eq!(err.stage, Stage::Analyzing);
        assert_eq!(err.kind(), "analysis_failed");
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_score_fails_response_validation() {
        let service = ScriptedService::with(vec![Ok(r#"{
            "transcript": "Hello.",
            "clarity_score": 150,
            "communication_focus": "A greeting."
        }"#
        .to_string())]);
        let pipeline = test_pipeline(MockProbe::ok(), MockExtractor::ok(), service.clone());

        let err = pipeline.run(TEST_URL).await.unwrap_err();
        assert_eq!(err.stage, Stage::ValidatingResponse);
        assert_eq!(err.kind(), "schema_violation");
        assert!(err.to_string().contains("150"));
    }

    #[tokio::test]
    async fn test_scratch_file_removed_on_success() {
        let extractor = MockExtractor::ok();
        let pipeline = test_pipeline(MockProbe::ok(), extractor.clone(), ScriptedService::always_ok());

        pipeline.run(TEST_URL).await.unwrap();

        let path = extractor.last_audio_path().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_scratch_file_removed_on_analysis_failure() {
        let extractor = MockExtractor::ok();
        let service = ScriptedService::with(vec![Err(KlarError::AnalysisFailed(
            "audio rejected".into(),
        ))]);
        let pipeline = test_pipeline(MockProbe::ok(), extractor.clone(), service);

        pipeline.run(TEST_URL).await.unwrap_err();

        let path = extractor.last_audio_path().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_scratch_file_removed_on_schema_violation() {
        let extractor = MockExtractor::ok();
        let service = ScriptedService::with(vec![Ok("not json at all".to_string())]);
        let pipeline = test_pipeline(MockProbe::ok(), extractor.clone(), service);

        let err = pipeline.run(TEST_URL).await.unwrap_err();
        assert_eq!(err.stage, Stage::ValidatingResponse);

        let path = extractor.last_audio_path().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_request_ids_increase_monotonically() {
        let pipeline = test_pipeline(MockProbe::ok(), MockExtractor::ok(), ScriptedService::always_ok());

        assert_eq!(pipeline.next_request("a").id, 1);
        assert_eq!(pipeline.next_request("b").id, 2);
        assert_eq!(pipeline.next_request("c").id, 3);
    }
}
