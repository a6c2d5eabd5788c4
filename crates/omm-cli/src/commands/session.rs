use std::io::Write;

use clap::Args;
use omm_core::session::format_countdown;
use omm_core::{Command, Config, Event, Runner, SessionConfig};
use tokio::sync::broadcast::error::RecvError;

use crate::players::setup_audio;

#[derive(Args)]
pub struct SessionArgs {
    /// Number of gongs (1-10)
    #[arg(long, short = 'g', value_parser = clap::value_parser!(u32).range(1..=10))]
    gongs: Option<u32>,
    /// Minutes between gongs (1-10)
    #[arg(
        long,
        short = 'i',
        value_parser = clap::value_parser!(u64).range(1..=10),
        conflicts_with = "interval_secs"
    )]
    interval: Option<u64>,
    /// Seconds between gongs, for short sessions
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: Option<u64>,
    /// Play background music during the session
    #[arg(long)]
    stream: bool,
    /// Override the configured stream URL
    #[arg(long, requires = "stream")]
    stream_url: Option<String>,
    /// Fade out and pause the music when the session ends
    #[arg(long)]
    stop_music_after: bool,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

fn session_config(
    args: &SessionArgs,
    config: &Config,
) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let gongs = args.gongs.unwrap_or(config.session.gong_count);
    let session = match (args.interval_secs, args.interval) {
        (Some(secs), _) => SessionConfig::new(gongs, secs)?,
        (None, Some(minutes)) => SessionConfig::from_minutes(gongs, minutes)?,
        (None, None) => SessionConfig::from_minutes(gongs, config.session.interval_minutes)?,
    };
    Ok(session)
}

pub fn run(args: SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let session = session_config(&args, &config)?;

    // Session state is only touched from the runner task.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(args, config, session))
}

async fn drive(
    args: SessionArgs,
    config: Config,
    session: SessionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.audio_settings();
    let (audio, alert) = setup_audio(&config.audio, settings);
    let stop_music = args.stop_music_after || config.audio.stop_music_after_session;

    let (runner, handle) = Runner::new(audio, stop_music);
    let mut events = handle.subscribe();
    let task = tokio::spawn(runner.run());
    let render = Renderer { json: args.json };

    if let Some(message) = alert {
        render.show(&Event::alert(message));
    }
    if args.stream {
        let url = args
            .stream_url
            .clone()
            .unwrap_or_else(|| config.audio.stream_url.clone());
        handle.send(Command::SetStreamUrl(url)).await?;
        handle.send(Command::ToggleStream).await?;
    }
    handle.send(Command::Start(session)).await?;

    let mut interrupted = false;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    render.show(&event);
                    if matches!(event, Event::SessionStopped { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::warn!("dropped {n} events"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                handle.send(Command::Stop).await?;
            }
        }
    }

    if args.stream {
        // Let a pending duck or fade-out finish before exiting.
        let settle = tokio::time::sleep(settings.fade_duration * 2 + settings.restore_delay);
        tokio::pin!(settle);
        loop {
            tokio::select! {
                _ = &mut settle => break,
                event = events.recv() => match event {
                    Ok(event) => render.show(&event),
                    Err(_) => break,
                },
            }
        }
    }

    handle.shutdown();
    task.await?;
    Ok(())
}

struct Renderer {
    json: bool,
}

impl Renderer {
    fn show(&self, event: &Event) {
        if let Event::Alert { message, .. } = event {
            if !self.json {
                eprintln!("Audio Error: {message}");
                return;
            }
        }
        let Some(line) = self.line(event) else {
            return;
        };
        let mut out = std::io::stdout();
        if matches!(event, Event::CountdownTick { .. }) && !self.json {
            let _ = write!(out, "\r{line}");
        } else {
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
    }

    fn line(&self, event: &Event) -> Option<String> {
        if self.json {
            return serde_json::to_string(event).ok();
        }
        match event {
            Event::SessionStarted {
                gong_count,
                interval_secs,
                ..
            } => Some(format!(
                "Session started: {gong_count} gongs, every {}",
                format_countdown(*interval_secs)
            )),
            Event::GongFired {
                gong_index,
                gong_count,
                chime,
                ..
            } => {
                let suffix = match chime {
                    omm_core::ChimeKind::Final => " (final)",
                    omm_core::ChimeKind::Regular => "",
                };
                Some(format!("\nGong {} of {gong_count}{suffix}", gong_index + 1))
            }
            Event::CountdownTick { remaining_secs, .. } => Some(format!(
                "{} until next gong",
                format_countdown(*remaining_secs)
            )),
            Event::SessionStopped { completed, .. } => Some(if *completed {
                "\nSession complete".to_string()
            } else {
                "\nSession stopped".to_string()
            }),
            Event::StreamStarted { .. } => Some("Music playing".into()),
            Event::StreamPaused { .. } => Some("Music paused".into()),
            Event::Alert { message, .. } => Some(format!("Audio Error: {message}")),
            Event::FadeCompleted { .. } | Event::StateSnapshot { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed() -> Event {
        Event::SessionStopped {
            completed: true,
            at: Default::default(),
        }
    }

    fn args(gongs: Option<u32>, interval: Option<u64>, interval_secs: Option<u64>) -> SessionArgs {
        SessionArgs {
            gongs,
            interval,
            interval_secs,
            stream: false,
            stream_url: None,
            stop_music_after: false,
            json: false,
        }
    }

    #[test]
    fn session_config_prefers_flags_over_config() {
        let config = Config::default();
        let s = session_config(&args(Some(5), Some(3), None), &config).unwrap();
        assert_eq!((s.gong_count(), s.interval_secs()), (5, 180));

        let s = session_config(&args(None, None, Some(7)), &config).unwrap();
        assert_eq!((s.gong_count(), s.interval_secs()), (3, 7));

        let s = session_config(&args(None, None, None), &config).unwrap();
        assert_eq!(s.interval_secs(), 120);
    }

    #[test]
    fn human_lines() {
        let render = Renderer { json: false };
        let tick = Event::CountdownTick {
            gong_index: 0,
            remaining_secs: 75,
        };
        assert_eq!(render.line(&tick).as_deref(), Some("01:15 until next gong"));
        assert_eq!(render.line(&completed()).as_deref(), Some("\nSession complete"));
    }

    #[test]
    fn json_lines_are_tagged() {
        let render = Renderer { json: true };
        let line = render.line(&completed()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "SessionStopped");
        assert_eq!(value["completed"], true);
    }
}
