// src/assist.rs
use chrono::{DateTime, Local};
use log::{error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::ai::connector::VisionConnector;
use crate::ai::gemini::GeminiClient;
use crate::ai::prompts::{Feature, Source};
use crate::config::Config;
use crate::error::{AssistError, StartupError, SynthesisError};
use crate::ocr::{OcrEngine, TesseractEngine};
use crate::speech::{AudioArtifact, EspeakSynthesizer, SpeechSynthesizer};
use crate::upload::UploadedImage;

/// What happened to the narration step of a run.
#[derive(Debug)]
pub enum Narration {
    Ready(AudioArtifact),
    Failed(SynthesisError),
    /// No usable text, or narration switched off
    NotAttempted,
}

/// Result of one feature run. Failures are carried, never raised.
#[derive(Debug)]
pub struct Outcome {
    pub feature: Feature,
    pub text: Result<String, AssistError>,
    pub narration: Narration,
    pub finished_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl Outcome {
    /// Text to show in the result area, if the feature produced any
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().ok()
    }

    pub fn error_message(&self) -> Option<String> {
        self.text
            .as_ref()
            .err()
            .map(|e| format!("{}: {}", self.feature.failure_label(), e))
    }

    pub fn audio(&self) -> Option<&AudioArtifact> {
        match &self.narration {
            Narration::Ready(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn audio_error(&self) -> Option<String> {
        match &self.narration {
            Narration::Failed(e) => Some(format!("Audio generation failed: {}", e)),
            _ => None,
        }
    }
}

/// Runs a feature end to end: one OCR or model call, then at most one narration.
pub struct Assistant {
    vision: Box<dyn VisionConnector>,
    ocr: Box<dyn OcrEngine>,
    speech: Box<dyn SpeechSynthesizer>,
    narrate: bool,
}

impl Assistant {
    pub fn new(
        vision: Box<dyn VisionConnector>,
        ocr: Box<dyn OcrEngine>,
        speech: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            vision,
            ocr,
            speech,
            narrate: true,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        Ok(Self::new(
            Box::new(GeminiClient::new(&config.model)?),
            Box::new(TesseractEngine::new(&config.ocr)),
            Box::new(EspeakSynthesizer::new(&config.speech)),
        ))
    }

    pub fn with_narration(mut self, narrate: bool) -> Self {
        self.narrate = narrate;
        self
    }

    pub fn model_name(&self) -> &str {
        self.vision.model_name()
    }

    pub fn run(&self, feature: Feature, image: &UploadedImage) -> Outcome {
        info!("Running {} on {}", feature, image.name);
        let started = Instant::now();

        let text = match feature.source() {
            Source::Ocr => self.ocr.extract_text(&image.decoded).map_err(AssistError::from),
            Source::Vision(prompt) => self
                .vision
                .describe(&image.payload, prompt)
                .map_err(AssistError::from),
        };

        let narration = match &text {
            Err(e) => {
                error!("{}: {}", feature.failure_label(), e);
                Narration::NotAttempted
            }
            Ok(t) if t.trim().is_empty() => {
                info!("{} produced no text, skipping narration", feature);
                Narration::NotAttempted
            }
            Ok(_) if !self.narrate => Narration::NotAttempted,
            Ok(t) => match self.speech.synthesize(t) {
                Ok(artifact) => Narration::Ready(artifact),
                Err(e) => {
                    warn!("Audio generation failed: {}", e);
                    Narration::Failed(e)
                }
            },
        };

        Outcome {
            feature,
            text,
            narration,
            finished_at: Local::now(),
            elapsed: started.elapsed(),
        }
    }

    /// `run` for background workers: a panic in an adapter becomes an error outcome,
    /// so whoever waits on the result always gets one.
    pub fn run_guarded(&self, feature: Feature, image: &UploadedImage) -> Outcome {
        let started = Instant::now();
        match panic::catch_unwind(AssertUnwindSafe(|| self.run(feature, image))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("{} crashed: {}", feature, reason);
                Outcome {
                    feature,
                    text: Err(AssistError::Crashed(reason)),
                    narration: Narration::NotAttempted,
                    finished_at: Local::now(),
                    elapsed: started.elapsed(),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ai::prompts::PromptTemplate;
    use crate::error::{ModelError, OcrError};
    use crate::upload::tests::sample_png;
    use crate::upload::EncodedImagePayload;
    use image::DynamicImage;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub(crate) struct Calls {
        pub vision: AtomicUsize,
        pub ocr: AtomicUsize,
        pub speech: AtomicUsize,
        pub prompts: Mutex<Vec<&'static str>>,
        pub spoken: Mutex<Vec<String>>,
    }

    pub(crate) struct FakeVision {
        pub calls: Arc<Calls>,
        pub reply: Result<&'static str, &'static str>,
    }

    impl VisionConnector for FakeVision {
        fn describe(&self, payload: &EncodedImagePayload, prompt: &PromptTemplate) -> Result<String, ModelError> {
            assert!(!payload.data.is_empty());
            self.calls.vision.fetch_add(1, Ordering::SeqCst);
            self.calls.prompts.lock().unwrap().push(prompt.id);
            self.reply
                .map(str::to_string)
                .map_err(|reason| ModelError::Network(reason.to_string()))
        }

        fn model_name(&self) -> &str {
            "fake-vision"
        }
    }

    pub(crate) struct FakeOcr {
        pub calls: Arc<Calls>,
        pub text: &'static str,
    }

    impl OcrEngine for FakeOcr {
        fn extract_text(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            self.calls.ocr.fetch_add(1, Ordering::SeqCst);
            if self.text == "<missing>" {
                return Err(OcrError::EngineNotFound("language `eng`".to_string()));
            }
            Ok(self.text.to_string())
        }

        fn probe(&self) -> Result<String, OcrError> {
            Ok("fake".to_string())
        }
    }

    pub(crate) struct FakeSpeech {
        pub calls: Arc<Calls>,
        pub fail: bool,
    }

    impl SpeechSynthesizer for FakeSpeech {
        fn synthesize(&self, text: &str) -> Result<AudioArtifact, SynthesisError> {
            self.calls.speech.fetch_add(1, Ordering::SeqCst);
            self.calls.spoken.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(SynthesisError::EngineUnavailable("espeak-ng".to_string()));
            }
            Ok(AudioArtifact {
                path: PathBuf::from("/tmp/narration.wav"),
                mime_type: "audio/wav",
                bytes: text.len() as u64 * 100,
                spoken_chars: text.chars().count(),
            })
        }

        fn probe(&self) -> Result<String, SynthesisError> {
            Ok("fake".to_string())
        }
    }

    pub(crate) fn assistant(
        calls: &Arc<Calls>,
        reply: Result<&'static str, &'static str>,
        ocr_text: &'static str,
        speech_fails: bool,
    ) -> Assistant {
        Assistant::new(
            Box::new(FakeVision { calls: calls.clone(), reply }),
            Box::new(FakeOcr { calls: calls.clone(), text: ocr_text }),
            Box::new(FakeSpeech { calls: calls.clone(), fail: speech_fails }),
        )
    }

    pub(crate) fn image() -> UploadedImage {
        UploadedImage::from_bytes("street.png", sample_png()).unwrap()
    }

    #[test]
    fn each_feature_makes_one_adapter_call_and_one_narration() {
        for feature in Feature::ALL {
            let calls = Arc::new(Calls::default());
            let assistant = assistant(&calls, Ok("A crosswalk ahead."), "EXIT\n", false);

            let outcome = assistant.run(feature, &image());

            let vision = calls.vision.load(Ordering::SeqCst);
            let ocr = calls.ocr.load(Ordering::SeqCst);
            assert_eq!(vision + ocr, 1, "{feature}");
            assert_eq!(ocr == 1, feature == Feature::TextToSpeech, "{feature}");
            assert_eq!(calls.speech.load(Ordering::SeqCst), 1, "{feature}");
            assert!(outcome.audio().is_some());
            assert!(outcome.error_message().is_none());
        }
    }

    #[test]
    fn vision_features_send_their_own_prompt() {
        let calls = Arc::new(Calls::default());
        let assistant = assistant(&calls, Ok("ok"), "", false);
        for feature in [
            Feature::SceneUnderstanding,
            Feature::ObjectDetection,
            Feature::PersonalizedAssistance,
        ] {
            assistant.run(feature, &image());
        }
        assert_eq!(
            *calls.prompts.lock().unwrap(),
            vec!["scene-understanding", "object-detection", "personalized-assistance"]
        );
    }

    #[test]
    fn model_failure_shows_error_and_skips_narration() {
        let calls = Arc::new(Calls::default());
        let assistant = assistant(&calls, Err("connection refused"), "", false);

        let outcome = assistant.run(Feature::ObjectDetection, &image());

        assert!(outcome.text().is_none());
        let message = outcome.error_message().unwrap();
        assert!(message.starts_with("Object detection failed:"));
        assert!(message.contains("connection refused"));
        assert!(matches!(outcome.narration, Narration::NotAttempted));
        assert_eq!(calls.speech.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ocr_failure_skips_narration() {
        let calls = Arc::new(Calls::default());
        let assistant = assistant(&calls, Ok("unused"), "<missing>", false);

        let outcome = assistant.run(Feature::TextToSpeech, &image());

        assert!(outcome.error_message().unwrap().starts_with("Text extraction failed:"));
        assert_eq!(calls.speech.load(Ordering::SeqCst), 0);
        assert_eq!(calls.vision.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blank_ocr_text_is_not_narrated() {
        let calls = Arc::new(Calls::default());
        let assistant = assistant(&calls, Ok("unused"), " \n\x0c", false);

        let outcome = assistant.run(Feature::TextToSpeech, &image());

        assert_eq!(outcome.text(), Some(" \n\x0c"));
        assert!(matches!(outcome.narration, Narration::NotAttempted));
        assert_eq!(calls.speech.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn extracted_text_is_narrated_verbatim() {
        let calls = Arc::new(Calls::default());
        let assistant = assistant(&calls, Ok("unused"), "EXIT\n", false);

        let outcome = assistant.run(Feature::TextToSpeech, &image());

        assert_eq!(outcome.text().map(str::trim), Some("EXIT"));
        assert_eq!(*calls.spoken.lock().unwrap(), vec!["EXIT\n".to_string()]);
        assert_eq!(outcome.audio().unwrap().spoken_chars, 5);
    }

    #[test]
    fn model_reply_is_narrated_as_shown() {
        let reply = "A crosswalk ahead. The signal shows a walking figure.";
        let calls = Arc::new(Calls::default());
        let assistant = assistant(&calls, Ok(reply), "", false);

        let outcome = assistant.run(Feature::SceneUnderstanding, &image());

        let shown = outcome.text().unwrap();
        assert!(!shown.is_empty());
        assert_eq!(*calls.spoken.lock().unwrap(), vec![shown.to_string()]);
        assert_eq!(shown, reply);
        assert_eq!(outcome.audio().unwrap().spoken_chars, reply.chars().count());
    }

    pub(crate) struct PanickingVision;

    impl VisionConnector for PanickingVision {
        fn describe(&self, _: &EncodedImagePayload, _: &PromptTemplate) -> Result<String, ModelError> {
            panic!("decoder blew up")
        }

        fn model_name(&self) -> &str {
            "panicking"
        }
    }

    #[test]
    fn guarded_run_turns_panic_into_error_outcome() {
        let calls = Arc::new(Calls::default());
        let assistant = Assistant::new(
            Box::new(PanickingVision),
            Box::new(FakeOcr { calls: calls.clone(), text: "" }),
            Box::new(FakeSpeech { calls: calls.clone(), fail: false }),
        );

        let outcome = assistant.run_guarded(Feature::ObjectDetection, &image());

        assert!(outcome.text().is_none());
        let message = outcome.error_message().unwrap();
        assert!(message.starts_with("Object detection failed:"));
        assert!(message.contains("decoder blew up"));
        assert!(matches!(outcome.narration, Narration::NotAttempted));
        assert_eq!(calls.speech.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn synthesis_failure_keeps_text() {
        let calls = Arc::new(Calls::default());
        let assistant = assistant(&calls, Ok("A park bench."), "", true);

        let outcome = assistant.run(Feature::SceneUnderstanding, &image());

        assert_eq!(outcome.text(), Some("A park bench."));
        assert!(outcome.audio().is_none());
        assert!(outcome.audio_error().unwrap().starts_with("Audio generation failed:"));
    }

    #[test]
    fn narration_can_be_switched_off() {
        let calls = Arc::new(Calls::default());
        let assistant = assistant(&calls, Ok("A park bench."), "", false).with_narration(false);

        let outcome = assistant.run(Feature::SceneUnderstanding, &image());

        assert_eq!(outcome.text(), Some("A park bench."));
        assert_eq!(calls.speech.load(Ordering::SeqCst), 0);
    }
}
