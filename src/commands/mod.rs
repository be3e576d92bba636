//! # Built-in Commands
//!
//! Handlers shipped with the broker. Each is an ordinary [`CommandHandler`];
//! deployments register whichever they need at startup.
//!
//! | command | params | notes |
//! |---|---|---|
//! | `dnd_dice_roll` | `rolls` | always available |
//! | `test_async` | | sleeps, then answers `"slept"` |
//! | `say_test` | `text` | needs a [`SpeechSynthesizer`] |
//! | `set_google_preset` | `preset` | needs a [`SpeechSynthesizer`] |
//! | `change_google_voice` | `voice` | needs a [`SpeechSynthesizer`] |
//! | `change_google_pitch` | `pitch` | needs a [`SpeechSynthesizer`] |
//! | `change_google_rate` | `rate` | needs a [`SpeechSynthesizer`] |
//!
//! [`CommandHandler`]: crate::registry::CommandHandler

pub mod dice;
pub mod sleep;
pub mod speech;

use crate::config::SpeechConfig;
use crate::registry::CommandRegistry;
use std::sync::Arc;

pub use dice::DndDiceRoll;
pub use sleep::TestAsync;
pub use speech::{
    ChangeGooglePitch, ChangeGoogleRate, ChangeGoogleVoice, SayTest, SetGooglePreset,
    SpeechSynthesizer, VoiceProfile, VoiceSettings,
};

/// Register the commands that need no external service
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Arc::new(DndDiceRoll::new()));
    registry.register(Arc::new(TestAsync::default()));
}

/// Register the speech commands around one shared voice profile
pub fn register_speech_commands(
    registry: &mut CommandRegistry,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: &SpeechConfig,
) -> Arc<VoiceProfile> {
    let profile = Arc::new(VoiceProfile::from_config(
        config,
        synthesizer.available_voices(),
    ));

    registry.register(Arc::new(SayTest::new(
        synthesizer,
        Arc::clone(&profile),
        config.output_path.clone(),
    )));
    registry.register(Arc::new(SetGooglePreset::new(Arc::clone(&profile))));
    registry.register(Arc::new(ChangeGoogleVoice::new(Arc::clone(&profile))));
    registry.register(Arc::new(ChangeGooglePitch::new(Arc::clone(&profile))));
    registry.register(Arc::new(ChangeGoogleRate::new(Arc::clone(&profile))));

    profile
}
