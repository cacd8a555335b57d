//! Audible alert sinks driven by the ring controller.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to load alert sound: {0}")]
    SoundLoad(String),

    #[error("Playback failed: {0}")]
    Playback(String),
}

/// A loop-capable audio resource.
///
/// `start_loop` plays from the beginning and repeats until `stop`, which also
/// rewinds. Errors are reported to the caller, who logs them and carries on.
pub trait AlertSink: Send {
    fn start_loop(&mut self) -> Result<(), AlertError>;

    fn stop(&mut self) -> Result<(), AlertError>;

    /// Name of this sink
    fn name(&self) -> &'static str;
}

/// Sink that only logs. Used when audio is played by the dashboard itself.
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn start_loop(&mut self) -> Result<(), AlertError> {
        info!("Ring started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AlertError> {
        info!("Ring stopped");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(feature = "audio")]
pub use rodio_sink::RodioAlertSink;

#[cfg(feature = "audio")]
mod rodio_sink {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::thread;

    use rodio::{Decoder, OutputStream, Sink, Source};
    use tracing::{debug, warn};

    use super::{AlertError, AlertSink};

    enum PlayerCommand {
        Start,
        Stop,
    }

    /// Loops a sound file on the default output device.
    ///
    /// The output stream is not `Send`, so it lives on a dedicated player thread.
    pub struct RodioAlertSink {
        tx: mpsc::Sender<PlayerCommand>,
    }

    impl RodioAlertSink {
        pub fn new(sound_path: PathBuf) -> Result<Self, AlertError> {
            // Decode once up front so a bad path fails at startup.
            let file = File::open(&sound_path).map_err(|e| AlertError::SoundLoad(e.to_string()))?;
            Decoder::new(BufReader::new(file)).map_err(|e| AlertError::SoundLoad(e.to_string()))?;

            let (tx, rx) = mpsc::channel::<PlayerCommand>();
            thread::Builder::new()
                .name("ring-player".to_string())
                .spawn(move || player_loop(sound_path, rx))
                .map_err(|e| AlertError::DeviceUnavailable(e.to_string()))?;

            Ok(Self { tx })
        }
    }

    fn player_loop(sound_path: PathBuf, rx: mpsc::Receiver<PlayerCommand>) {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(pair) => pair,
            Err(e) => {
                warn!("No audio output device: {}", e);
                return;
            }
        };

        let mut current: Option<Sink> = None;
        while let Ok(cmd) = rx.recv() {
            if let Some(sink) = current.take() {
                sink.stop();
            }
            if let PlayerCommand::Start = cmd {
                let source = File::open(&sound_path)
                    .map_err(|e| e.to_string())
                    .and_then(|f| Decoder::new(BufReader::new(f)).map_err(|e| e.to_string()));
                match (source, Sink::try_new(&handle)) {
                    (Ok(source), Ok(sink)) => {
                        sink.append(source.repeat_infinite());
                        current = Some(sink);
                    }
                    (Err(e), _) => warn!("Failed to decode ring sound: {}", e),
                    (_, Err(e)) => warn!("Failed to open audio sink: {}", e),
                }
            }
        }
        debug!("Ring player thread exiting");
    }

    impl AlertSink for RodioAlertSink {
        fn start_loop(&mut self) -> Result<(), AlertError> {
            self.tx
                .send(PlayerCommand::Start)
                .map_err(|_| AlertError::Playback("player thread stopped".to_string()))
        }

        fn stop(&mut self) -> Result<(), AlertError> {
            self.tx
                .send(PlayerCommand::Stop)
                .map_err(|_| AlertError::Playback("player thread stopped".to_string()))
        }

        fn name(&self) -> &'static str {
            "rodio"
        }
    }
}
