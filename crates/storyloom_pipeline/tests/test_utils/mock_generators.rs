//! Scripted generator mocks.
//!
//! Every mock counts its calls. Image and speech mocks fail according to a
//! swappable rule; the prompt rewriters apply a swappable transform.

use async_trait::async_trait;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use storyloom_core::Credential;
use storyloom_error::GenerationError;
use storyloom_interface::{
    ImageGenerator, ImageOptions, PromptSanitizer, PromptSimplifier, SpeechGenerator,
    TextGenerator,
};
use storyloom_pipeline::MASTER_PROMPT_INSTRUCTION;

/// Decides whether a call fails, given its prompt and text.
pub type FailureRule = Box<dyn Fn(&str, &str) -> Option<GenerationError> + Send + Sync>;

/// Rewrites a prompt or fails.
pub type RewriteRule = Box<dyn Fn(&str) -> Result<String, GenerationError> + Send + Sync>;

/// Master context returned for image style requests.
pub const MASTER_CONTEXT: &str = "Ink and watercolor, muted palette.";

/// Mono 16-bit 8 kHz WAV of `secs` seconds of silence.
pub fn wav_clip(secs: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for _ in 0..(secs * 8000.0) as usize {
            writer.write_sample(0i16).expect("sample");
        }
        writer.finalize().expect("finalize");
    }
    cursor.into_inner()
}

/// Echoes the source text, or answers style requests with [`MASTER_CONTEXT`].
#[derive(Default)]
pub struct MockText {
    failure: Mutex<Option<GenerationError>>,
    rewrite_calls: AtomicUsize,
    master_calls: AtomicUsize,
}

impl MockText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every rewrite with `error`.
    pub fn fail_with(&self, error: GenerationError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn rewrite_calls(&self) -> usize {
        self.rewrite_calls.load(Ordering::SeqCst)
    }

    pub fn master_calls(&self) -> usize {
        self.master_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for MockText {
    async fn generate(
        &self,
        _credential: &Credential,
        source_text: &str,
        custom_prompt: Option<&str>,
    ) -> Result<String, GenerationError> {
        if custom_prompt.is_some_and(|prompt| prompt.starts_with(MASTER_PROMPT_INSTRUCTION)) {
            self.master_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(MASTER_CONTEXT.to_string());
        }
        self.rewrite_calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(source_text.to_string()),
        }
    }

    fn model_name(&self) -> &str {
        "mock-text"
    }
}

/// Returns the prompt as bytes unless the rule says otherwise.
#[derive(Default)]
pub struct MockImage {
    rule: Mutex<Option<FailureRule>>,
    prompts: Mutex<Vec<String>>,
}

impl MockImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rule(&self, rule: FailureRule) {
        *self.rule.lock().unwrap() = Some(rule);
    }

    pub fn clear_rule(&self) {
        *self.rule.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for MockImage {
    async fn generate(
        &self,
        _credential: &Credential,
        prompt: &str,
        _options: &ImageOptions,
    ) -> Result<Vec<u8>, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(error) = self.rule.lock().unwrap().as_ref().and_then(|rule| rule(prompt, "")) {
            return Err(error);
        }
        Ok(format!("image:{prompt}").into_bytes())
    }

    fn model_name(&self) -> &str {
        "mock-image"
    }
}

/// Returns a one-second clip unless the rule says otherwise.
#[derive(Default)]
pub struct MockSpeech {
    rule: Mutex<Option<FailureRule>>,
    calls: AtomicUsize,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rule(&self, rule: FailureRule) {
        *self.rule.lock().unwrap() = Some(rule);
    }

    pub fn clear_rule(&self) {
        *self.rule.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechGenerator for MockSpeech {
    async fn generate(
        &self,
        _credential: &Credential,
        prompt: &str,
        text: &str,
        _voice: &str,
    ) -> Result<Vec<u8>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.rule.lock().unwrap().as_ref().and_then(|rule| rule(prompt, text));
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(wav_clip(1.0))
    }

    fn model_name(&self) -> &str {
        "mock-speech"
    }
}

/// Replaces "forbidden" with "gentle" unless scripted otherwise.
#[derive(Default)]
pub struct MockSanitizer {
    rule: Mutex<Option<RewriteRule>>,
    calls: AtomicUsize,
}

impl MockSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rule(&self, rule: RewriteRule) {
        *self.rule.lock().unwrap() = Some(rule);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromptSanitizer for MockSanitizer {
    async fn rewrite(
        &self,
        _credential: &Credential,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.rule.lock().unwrap().as_ref() {
            Some(rule) => rule(prompt),
            None => Ok(prompt.replace("forbidden", "gentle")),
        }
    }
}

/// Keeps the first sentence unless scripted otherwise.
#[derive(Default)]
pub struct MockSimplifier {
    rule: Mutex<Option<RewriteRule>>,
    calls: AtomicUsize,
}

impl MockSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rule(&self, rule: RewriteRule) {
        *self.rule.lock().unwrap() = Some(rule);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromptSimplifier for MockSimplifier {
    async fn simplify(
        &self,
        _credential: &Credential,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.rule.lock().unwrap().as_ref() {
            Some(rule) => rule(prompt),
            None => Ok(prompt.split('.').next().unwrap_or(prompt).to_string()),
        }
    }
}
