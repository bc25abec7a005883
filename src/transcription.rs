// src/transcription.rs
//
// Transcription provider contract and the two interchangeable backends:
// a remote Whisper inference server reached over HTTP and a local
// whisper.cpp binary. The engine only ever sees the contract; selection
// happens in the composition root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;

/// How long the availability probe may take before the provider is
/// reported unreachable.
const AVAILABILITY_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Classified provider failures, surfaced to the caller alongside the
/// (empty) recognized text rather than unwinding through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptionErrorKind {
    /// The provider could not be reached or is not ready; recognition was
    /// never attempted.
    ProviderUnavailable,
    /// The provider did not respond within the agreed time budget.
    TimedOut,
    /// The provider responded but signaled an internal failure.
    RecognitionFailed,
}

impl TranscriptionErrorKind {
    /// Short guidance string for the retry affordance in the UI.
    pub fn user_guidance(&self) -> &'static str {
        match self {
            TranscriptionErrorKind::ProviderUnavailable => {
                "The transcription service is not ready. Check your connection and try again."
            }
            TranscriptionErrorKind::TimedOut => {
                "The transcription service took too long to respond. Try again."
            }
            TranscriptionErrorKind::RecognitionFailed => {
                "The recording could not be transcribed. Record again and retry."
            }
        }
    }
}

/// Result of a transcription request. An empty recognized string is a
/// legitimate low-confidence outcome, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    Recognized { text: String },
    Failed { kind: TranscriptionErrorKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderStatus {
    pub available: bool,
    /// The provider is reachable but may still be initializing (e.g. the
    /// server is downloading its model).
    pub ready: bool,
}

/// The capability the engine requires from its speech-to-text collaborator.
pub trait TranscriptionProvider {
    /// Probe the backend. Bounded; never hangs on an unreachable service.
    fn check_availability(&self) -> impl std::future::Future<Output = ProviderStatus> + Send;

    /// Transcribe the recorded audio within `time_budget`. Must resolve to
    /// `Failed { TimedOut }` rather than exceed the budget.
    fn transcribe(
        &self,
        audio: &Path,
        language_hint: &str,
        time_budget: Duration,
    ) -> impl std::future::Future<Output = TranscriptionOutcome> + Send;
}

// ---------------------------------------------------------------------------
// Remote backend
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    model_loaded: bool,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    text: String,
}

/// Client for the Whisper inference server: `GET /health` for the probe,
/// `POST /transcribe` with a multipart audio upload for recognition.
pub struct RemoteWhisperProvider {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteWhisperProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn classify_request_error(e: &reqwest::Error) -> TranscriptionErrorKind {
        if e.is_timeout() {
            TranscriptionErrorKind::TimedOut
        } else if e.is_connect() {
            TranscriptionErrorKind::ProviderUnavailable
        } else {
            TranscriptionErrorKind::RecognitionFailed
        }
    }
}

impl TranscriptionProvider for RemoteWhisperProvider {
    async fn check_availability(&self) -> ProviderStatus {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(AVAILABILITY_PROBE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<HealthResponse>().await {
                Ok(health) => {
                    log::info!(
                        "[Transcription] Server health: status='{}', model_loaded={}",
                        health.status,
                        health.model_loaded
                    );
                    ProviderStatus { available: true, ready: health.model_loaded }
                }
                Err(e) => {
                    log::warn!("[Transcription] Failed to parse health response: {}", e);
                    ProviderStatus { available: true, ready: false }
                }
            },
            Ok(resp) => {
                log::warn!("[Transcription] Health check returned {}", resp.status());
                ProviderStatus { available: true, ready: false }
            }
            Err(e) => {
                log::warn!("[Transcription] Health check failed: {}", e);
                ProviderStatus { available: false, ready: false }
            }
        }
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language_hint: &str,
        time_budget: Duration,
    ) -> TranscriptionOutcome {
        let bytes = match tokio::fs::read(audio).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!(
                    "[Transcription] Failed to read audio file '{}': {}",
                    audio.display(),
                    e
                );
                return TranscriptionOutcome::Failed {
                    kind: TranscriptionErrorKind::RecognitionFailed,
                };
            }
        };

        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());
        let part = match reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
        {
            Ok(part) => part,
            Err(e) => {
                log::error!("[Transcription] Failed to build multipart body: {}", e);
                return TranscriptionOutcome::Failed {
                    kind: TranscriptionErrorKind::RecognitionFailed,
                };
            }
        };
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!("{}/transcribe", self.base_url);
        log::info!(
            "[Transcription] POST {} (language={}, budget={}s)",
            url,
            language_hint,
            time_budget.as_secs()
        );

        let request = self
            .client
            .post(&url)
            .query(&[("language", language_hint)])
            .multipart(form)
            .send();

        // The budget bounds the whole exchange; a slow server resolves to
        // TimedOut instead of leaving the caller waiting.
        let response = match timeout(time_budget, request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                log::error!("[Transcription] Transcribe request failed: {}", e);
                return TranscriptionOutcome::Failed {
                    kind: Self::classify_request_error(&e),
                };
            }
            Err(_) => {
                log::error!(
                    "[Transcription] Transcribe request exceeded {}s budget",
                    time_budget.as_secs()
                );
                return TranscriptionOutcome::Failed {
                    kind: TranscriptionErrorKind::TimedOut,
                };
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            // The server answers 503 while its model is still loading.
            log::warn!("[Transcription] Server not ready (503)");
            return TranscriptionOutcome::Failed {
                kind: TranscriptionErrorKind::ProviderUnavailable,
            };
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!(
                "[Transcription] Transcribe failed with status {}: {}",
                status,
                error_text
            );
            return TranscriptionOutcome::Failed {
                kind: TranscriptionErrorKind::RecognitionFailed,
            };
        }

        let body = match timeout(time_budget, response.json::<TranscribeResponse>()).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                log::error!("[Transcription] Failed to parse transcribe response: {}", e);
                return TranscriptionOutcome::Failed {
                    kind: TranscriptionErrorKind::RecognitionFailed,
                };
            }
            Err(_) => {
                return TranscriptionOutcome::Failed {
                    kind: TranscriptionErrorKind::TimedOut,
                };
            }
        };

        if !body.success {
            log::error!("[Transcription] Server reported an unsuccessful transcription");
            return TranscriptionOutcome::Failed {
                kind: TranscriptionErrorKind::RecognitionFailed,
            };
        }

        let text = body.text.trim().to_string();
        log::info!(
            "[Transcription] Recognized {} chars",
            text.chars().count()
        );
        TranscriptionOutcome::Recognized { text }
    }
}

// ---------------------------------------------------------------------------
// Local backend
// ---------------------------------------------------------------------------

/// Runs a local whisper.cpp binary against the recorded file. Availability
/// means both the binary and the model file exist on disk.
pub struct LocalWhisperProvider {
    binary_path: PathBuf,
    model_path: PathBuf,
}

impl LocalWhisperProvider {
    pub fn new(binary_path: PathBuf, model_path: PathBuf) -> Self {
        Self { binary_path, model_path }
    }
}

impl TranscriptionProvider for LocalWhisperProvider {
    async fn check_availability(&self) -> ProviderStatus {
        let binary_exists = self.binary_path.exists();
        let model_exists = self.model_path.exists();
        log::info!(
            "[Transcription] Local whisper binary at {}: {}, model at {}: {}",
            self.binary_path.display(),
            binary_exists,
            self.model_path.display(),
            model_exists
        );
        let ok = binary_exists && model_exists;
        ProviderStatus { available: ok, ready: ok }
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language_hint: &str,
        time_budget: Duration,
    ) -> TranscriptionOutcome {
        let mut command = tokio::process::Command::new(&self.binary_path);
        command
            .arg("--model")
            .arg(&self.model_path)
            .arg("--file")
            .arg(audio)
            .arg("--language")
            .arg(language_hint)
            .arg("--output-stdout")
            .kill_on_drop(true);

        let output = match timeout(time_budget, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                log::error!("[Transcription] Failed to execute whisper binary: {}", e);
                let kind = if e.kind() == std::io::ErrorKind::NotFound {
                    TranscriptionErrorKind::ProviderUnavailable
                } else {
                    TranscriptionErrorKind::RecognitionFailed
                };
                return TranscriptionOutcome::Failed { kind };
            }
            Err(_) => {
                log::error!(
                    "[Transcription] Whisper binary exceeded {}s budget, killing",
                    time_budget.as_secs()
                );
                return TranscriptionOutcome::Failed {
                    kind: TranscriptionErrorKind::TimedOut,
                };
            }
        };

        if !output.status.success() {
            let stderr_text = String::from_utf8_lossy(&output.stderr);
            log::error!(
                "[Transcription] Whisper failed with status {}: {}",
                output.status,
                stderr_text
            );
            return TranscriptionOutcome::Failed {
                kind: TranscriptionErrorKind::RecognitionFailed,
            };
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        log::info!(
            "[Transcription] Local whisper recognized {} chars",
            text.chars().count()
        );
        TranscriptionOutcome::Recognized { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_audio_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"RIFF....WAVEfmt ").unwrap();
        file
    }

    #[tokio::test]
    async fn test_health_maps_to_provider_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "healthy",
                "model_loaded": true,
            })))
            .mount(&server)
            .await;

        let provider = RemoteWhisperProvider::new(&server.uri());
        let status = provider.check_availability().await;
        assert!(status.available);
        assert!(status.ready);
    }

    #[tokio::test]
    async fn test_health_degraded_is_not_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "degraded",
                "model_loaded": false,
            })))
            .mount(&server)
            .await;

        let provider = RemoteWhisperProvider::new(&server.uri());
        let status = provider.check_availability().await;
        assert!(status.available);
        assert!(!status.ready);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Nothing listens on this port.
        let provider = RemoteWhisperProvider::new("http://127.0.0.1:9");
        let status = provider.check_availability().await;
        assert!(!status.available);
        assert!(!status.ready);
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .and(query_param("language", "ar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "text": " بسم الله الرحمن الرحيم ",
                "language": "ar",
                "model": "whisper-base-ar-quran",
            })))
            .mount(&server)
            .await;

        let audio = temp_audio_file();
        let provider = RemoteWhisperProvider::new(&server.uri());
        let outcome = provider
            .transcribe(audio.path(), "ar", Duration::from_secs(10))
            .await;
        assert_eq!(
            outcome,
            TranscriptionOutcome::Recognized {
                text: "بسم الله الرحمن الرحيم".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_transcribe_empty_text_is_recognized_not_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "text": "",
            })))
            .mount(&server)
            .await;

        let audio = temp_audio_file();
        let provider = RemoteWhisperProvider::new(&server.uri());
        let outcome = provider
            .transcribe(audio.path(), "ar", Duration::from_secs(10))
            .await;
        assert_eq!(
            outcome,
            TranscriptionOutcome::Recognized { text: String::new() }
        );
    }

    #[tokio::test]
    async fn test_transcribe_503_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let audio = temp_audio_file();
        let provider = RemoteWhisperProvider::new(&server.uri());
        let outcome = provider
            .transcribe(audio.path(), "ar", Duration::from_secs(10))
            .await;
        assert_eq!(
            outcome,
            TranscriptionOutcome::Failed {
                kind: TranscriptionErrorKind::ProviderUnavailable
            }
        );
    }

    #[tokio::test]
    async fn test_transcribe_500_is_recognition_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Transcription failed"))
            .mount(&server)
            .await;

        let audio = temp_audio_file();
        let provider = RemoteWhisperProvider::new(&server.uri());
        let outcome = provider
            .transcribe(audio.path(), "ar", Duration::from_secs(10))
            .await;
        assert_eq!(
            outcome,
            TranscriptionOutcome::Failed {
                kind: TranscriptionErrorKind::RecognitionFailed
            }
        );
    }

    #[tokio::test]
    async fn test_transcribe_honors_time_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "text": "بسم"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let audio = temp_audio_file();
        let provider = RemoteWhisperProvider::new(&server.uri());
        let started = std::time::Instant::now();
        let outcome = provider
            .transcribe(audio.path(), "ar", Duration::from_millis(200))
            .await;
        assert_eq!(
            outcome,
            TranscriptionOutcome::Failed {
                kind: TranscriptionErrorKind::TimedOut
            }
        );
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_transcribe_unreadable_audio_is_recognition_failed() {
        let provider = RemoteWhisperProvider::new("http://127.0.0.1:9");
        let outcome = provider
            .transcribe(
                Path::new("/nonexistent/recording.wav"),
                "ar",
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(
            outcome,
            TranscriptionOutcome::Failed {
                kind: TranscriptionErrorKind::RecognitionFailed
            }
        );
    }

    #[tokio::test]
    async fn test_local_provider_unavailable_when_files_missing() {
        let provider = LocalWhisperProvider::new(
            PathBuf::from("/nonexistent/whisper"),
            PathBuf::from("/nonexistent/model.bin"),
        );
        let status = provider.check_availability().await;
        assert!(!status.available);

        let audio = temp_audio_file();
        let outcome = provider
            .transcribe(audio.path(), "ar", Duration::from_secs(1))
            .await;
        assert_eq!(
            outcome,
            TranscriptionOutcome::Failed {
                kind: TranscriptionErrorKind::ProviderUnavailable
            }
        );
    }
}
