mod chime;
mod stream;

pub use chime::TerminalChime;
pub use stream::HttpStream;

use omm_core::config::AudioConfig;
use omm_core::{AudioCoordinator, AudioSettings, ChimePlayer};

/// Build the coordinator from config.
///
/// Chimes that fail to load are left out, so playing them is a no-op. All
/// failures are folded into one message for a single alert.
pub fn setup_audio(
    config: &AudioConfig,
    settings: AudioSettings,
) -> (AudioCoordinator, Option<String>) {
    let mut failures = Vec::new();
    let mut load = |path: &std::path::Path| -> Option<Box<dyn ChimePlayer>> {
        match TerminalChime::load(path) {
            Ok(chime) => Some(Box::new(chime)),
            Err(e) => {
                failures.push(e.to_string());
                None
            }
        }
    };

    let regular = load(config.chime_path.as_path());
    let final_chime = load(config.final_chime_path.as_path());
    let audio = AudioCoordinator::new(regular, final_chime, Box::new(HttpStream::new()), settings);

    let alert = (!failures.is_empty())
        .then(|| format!("Could not setup audio: {}", failures.join("; ")));
    (audio, alert)
}
