//! # Speech Commands
//!
//! Text-to-speech commands and the voice profile they share.
//!
//! The active voice is an immutable [`VoiceSettings`] snapshot. `say_test` reads
//! one snapshot for the whole synthesis; the setters publish a replacement and
//! never touch a snapshot an in-flight request is holding.
//!
//! Synthesis itself is delegated to a [`SpeechSynthesizer`] supplied at startup.

use crate::config::{SpeechConfig, VoicePreset, PITCH_RANGE, RATE_RANGE};
use crate::messaging::CommandParams;
use crate::registry::{param_str, param_text, CommandContext, CommandHandler, CommandOutcome};
use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Selector value that restores the configured default
pub const DEFAULT_SELECTOR: &str = "default";

/// One complete, consistent set of voice parameters
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub voice_type: String,
    /// BCP-47 code derived from the voice name, e.g. `en-US`
    pub language_code: String,
    pub pitch: f64,
    pub speaking_rate: f64,
}

impl VoiceSettings {
    pub fn new(voice_type: impl Into<String>, pitch: f64, speaking_rate: f64) -> Self {
        let voice_type = voice_type.into();
        Self {
            language_code: language_code(&voice_type),
            voice_type,
            pitch,
            speaking_rate,
        }
    }

    pub fn with_voice(&self, voice_type: impl Into<String>) -> Self {
        Self::new(voice_type, self.pitch, self.speaking_rate)
    }

    pub fn with_pitch(&self, pitch: f64) -> Self {
        Self {
            pitch,
            ..self.clone()
        }
    }

    pub fn with_speaking_rate(&self, speaking_rate: f64) -> Self {
        Self {
            speaking_rate,
            ..self.clone()
        }
    }
}

impl From<&VoicePreset> for VoiceSettings {
    fn from(preset: &VoicePreset) -> Self {
        Self::new(&preset.voice_type, preset.pitch, preset.speaking_rate)
    }
}

/// Voice names are `<language>-<REGION>-<variant>`
fn language_code(voice_type: &str) -> String {
    voice_type.chars().take(5).collect()
}

/// External speech synthesis service
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` with `voice`, returning encoded audio
    async fn synthesize(&self, text: &str, voice: &VoiceSettings) -> anyhow::Result<Vec<u8>>;

    /// Voices the service offers in addition to the configured ones
    fn available_voices(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Shared, swappable voice settings
#[derive(Debug)]
pub struct VoiceProfile {
    current: RwLock<Arc<VoiceSettings>>,
    defaults: VoiceSettings,
    presets: HashMap<String, VoiceSettings>,
    voices: HashSet<String>,
}

impl VoiceProfile {
    pub fn new(
        defaults: VoiceSettings,
        presets: HashMap<String, VoiceSettings>,
        voices: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            current: RwLock::new(Arc::new(defaults.clone())),
            defaults,
            presets,
            voices: voices.into_iter().collect(),
        }
    }

    /// Build from configuration plus whatever voices the synthesiser reports
    pub fn from_config(config: &SpeechConfig, extra_voices: Vec<String>) -> Self {
        let defaults = VoiceSettings::new(
            &config.default_voice,
            config.default_pitch,
            config.default_rate,
        );
        let presets = config
            .presets
            .iter()
            .map(|(name, preset)| (name.clone(), VoiceSettings::from(preset)))
            .collect();
        let voices = config
            .voices
            .iter()
            .cloned()
            .chain(extra_voices)
            .chain(std::iter::once(config.default_voice.clone()));
        Self::new(defaults, presets, voices)
    }

    /// Current settings; stays valid however the profile changes afterwards
    pub fn snapshot(&self) -> Arc<VoiceSettings> {
        self.current.read().clone()
    }

    pub fn defaults(&self) -> &VoiceSettings {
        &self.defaults
    }

    pub fn preset(&self, name: &str) -> Option<&VoiceSettings> {
        self.presets.get(name)
    }

    pub fn is_known_voice(&self, voice: &str) -> bool {
        self.voices.contains(voice)
    }

    /// Replace the whole profile
    pub fn publish(&self, settings: VoiceSettings) -> Arc<VoiceSettings> {
        let settings = Arc::new(settings);
        *self.current.write() = Arc::clone(&settings);
        settings
    }

    /// Derive and publish a new profile from the current one
    ///
    /// Holds the write lock across read and publish so concurrent setters of
    /// different fields do not overwrite each other.
    pub fn update(&self, change: impl FnOnce(&VoiceSettings) -> VoiceSettings) -> Arc<VoiceSettings> {
        let mut current = self.current.write();
        let next = Arc::new(change(&**current));
        *current = Arc::clone(&next);
        next
    }
}

/// Numeric setting, or `None` when the client asked for the default
fn parse_setting(params: &CommandParams, name: &str) -> anyhow::Result<Option<f64>> {
    let text = param_text(params, name)?;
    if text == DEFAULT_SELECTOR {
        return Ok(None);
    }
    let value = text
        .trim()
        .parse::<f64>()
        .with_context(|| format!("could not convert {name} '{text}' to a number"))?;
    Ok(Some(value))
}

/// `say_test(text)`: synthesise `text` and write the audio file
pub struct SayTest {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    profile: Arc<VoiceProfile>,
    output_path: PathBuf,
}

impl SayTest {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        profile: Arc<VoiceProfile>,
        output_path: PathBuf,
    ) -> Self {
        Self {
            synthesizer,
            profile,
            output_path,
        }
    }
}

#[async_trait]
impl CommandHandler for SayTest {
    fn name(&self) -> &str {
        "say_test"
    }

    fn required_params(&self) -> &[&'static str] {
        &["text"]
    }

    async fn invoke(
        &self,
        params: &CommandParams,
        ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome> {
        let text = param_str(params, "text")?;
        let voice = self.profile.snapshot();

        info!(job_id = %ctx.job_id, voice = %voice.voice_type, "🔊 Requesting speech synthesis");
        let audio = self
            .synthesizer
            .synthesize(text, &voice)
            .await
            .context("speech synthesis failed")?;

        if let Some(parent) = self.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("could not create {}", parent.display()))?;
        }
        tokio::fs::write(&self.output_path, &audio)
            .await
            .with_context(|| format!("could not write {}", self.output_path.display()))?;

        info!(
            job_id = %ctx.job_id,
            bytes = audio.len(),
            path = %self.output_path.display(),
            "✅ Speech audio written"
        );
        Ok(CommandOutcome::completed(""))
    }
}

/// `set_google_preset(preset)`: switch to a saved preset
pub struct SetGooglePreset {
    profile: Arc<VoiceProfile>,
}

impl SetGooglePreset {
    pub fn new(profile: Arc<VoiceProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl CommandHandler for SetGooglePreset {
    fn name(&self) -> &str {
        "set_google_preset"
    }

    fn required_params(&self) -> &[&'static str] {
        &["preset"]
    }

    async fn invoke(
        &self,
        params: &CommandParams,
        _ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome> {
        let preset = param_text(params, "preset")?;
        let settings = match self.profile.preset(&preset) {
            Some(settings) => settings.clone(),
            None if preset == DEFAULT_SELECTOR => self.profile.defaults().clone(),
            None => return Ok(CommandOutcome::rejected("Voice preset does not exist")),
        };

        self.profile.publish(settings);
        Ok(CommandOutcome::completed(format!("Voice set to {preset}")))
    }
}

/// `change_google_voice(voice)`: change only the voice
pub struct ChangeGoogleVoice {
    profile: Arc<VoiceProfile>,
}

impl ChangeGoogleVoice {
    pub fn new(profile: Arc<VoiceProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl CommandHandler for ChangeGoogleVoice {
    fn name(&self) -> &str {
        "change_google_voice"
    }

    fn required_params(&self) -> &[&'static str] {
        &["voice"]
    }

    async fn invoke(
        &self,
        params: &CommandParams,
        ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome> {
        let requested = param_text(params, "voice")?;
        info!(job_id = %ctx.job_id, voice = %requested, "Voice change requested");

        let voice = if requested == DEFAULT_SELECTOR {
            self.profile.defaults().voice_type.clone()
        } else if self.profile.is_known_voice(&requested) {
            requested
        } else {
            return Ok(CommandOutcome::rejected("Invalid voice type"));
        };

        self.profile.update(|current| current.with_voice(&voice));
        Ok(CommandOutcome::completed(format!(
            "Voice successfully changed to {voice}"
        )))
    }
}

/// `change_google_pitch(pitch)`: change only the pitch
pub struct ChangeGooglePitch {
    profile: Arc<VoiceProfile>,
}

impl ChangeGooglePitch {
    pub fn new(profile: Arc<VoiceProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl CommandHandler for ChangeGooglePitch {
    fn name(&self) -> &str {
        "change_google_pitch"
    }

    fn required_params(&self) -> &[&'static str] {
        &["pitch"]
    }

    async fn invoke(
        &self,
        params: &CommandParams,
        ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome> {
        let pitch = match parse_setting(params, "pitch")? {
            None => self.profile.defaults().pitch,
            Some(pitch) if PITCH_RANGE.contains(&pitch) => pitch,
            Some(_) => return Ok(CommandOutcome::rejected("Invalid pitch")),
        };
        info!(job_id = %ctx.job_id, pitch = pitch, "Voice pitch changed");

        self.profile.update(|current| current.with_pitch(pitch));
        Ok(CommandOutcome::completed(format!(
            "Pitch successfully changed to {pitch}"
        )))
    }
}

/// `change_google_rate(rate)`: change only the speaking rate
pub struct ChangeGoogleRate {
    profile: Arc<VoiceProfile>,
}

impl ChangeGoogleRate {
    pub fn new(profile: Arc<VoiceProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl CommandHandler for ChangeGoogleRate {
    fn name(&self) -> &str {
        "change_google_rate"
    }

    fn required_params(&self) -> &[&'static str] {
        &["rate"]
    }

    async fn invoke(
        &self,
        params: &CommandParams,
        ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome> {
        let rate = match parse_setting(params, "rate")? {
            None => self.profile.defaults().speaking_rate,
            Some(rate) if RATE_RANGE.contains(&rate) => rate,
            Some(_) => return Ok(CommandOutcome::rejected("Invalid rate")),
        };
        info!(job_id = %ctx.job_id, speaking_rate = rate, "Speaking rate changed");

        self.profile.update(|current| current.with_speaking_rate(rate));
        Ok(CommandOutcome::completed(format!(
            "Speaking rate successfully changed to {rate}"
        )))
    }
}
