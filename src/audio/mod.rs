pub mod chime;

use anyhow::Result;
use std::sync::Arc;

/// Fire-and-forget notification played when a work session completes.
pub trait AlertCue: Send + Sync {
    fn play(&self) -> Result<()>;
}

/// Used when sound is disabled or no output device support is compiled in.
pub struct LogAlert;

impl AlertCue for LogAlert {
    fn play(&self) -> Result<()> {
        log::info!("session complete (alert sound disabled)");
        Ok(())
    }
}

/// Picks the alert implementation for the current build and settings.
pub fn alert_for(enabled: bool) -> Arc<dyn AlertCue> {
    #[cfg(feature = "audio")]
    {
        if enabled {
            return Arc::new(engine::ChimeAlert::new());
        }
    }
    #[cfg(not(feature = "audio"))]
    {
        if enabled {
            log::info!("built without the `audio` feature; completion chime is logged only");
        }
    }
    Arc::new(LogAlert)
}

#[cfg(feature = "audio")]
pub mod engine {
    use super::{chime::Chime, AlertCue};

    use anyhow::{anyhow, Result};
    use rodio::{OutputStream, Sink};
    use std::sync::{
        mpsc::{self, Sender},
        Mutex,
    };
    use std::thread;

    enum AlertCommand {
        Chime,
    }

    /// Plays the chime on a dedicated thread, since the rodio output stream
    /// cannot leave the thread that opened it.
    pub struct ChimeAlert {
        tx: Mutex<Option<Sender<AlertCommand>>>,
    }

    impl ChimeAlert {
        pub fn new() -> Self {
            Self { tx: Mutex::new(None) }
        }

        fn ensure_thread(&self) -> Result<Sender<AlertCommand>> {
            let mut guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(tx) = guard.as_ref() {
                return Ok(tx.clone());
            }

            let (tx, rx) = mpsc::channel::<AlertCommand>();
            thread::Builder::new()
                .name("alert-audio".to_string())
                .spawn(move || {
                    let mut _stream: Option<OutputStream> = None;
                    let mut sink: Option<Sink> = None;

                    fn ensure_sink(
                        stream: &mut Option<OutputStream>,
                        sink: &mut Option<Sink>,
                    ) -> Result<(), String> {
                        if sink.is_none() {
                            let (s, handle) = OutputStream::try_default()
                                .map_err(|e| format!("Failed to open audio output: {}", e))?;
                            let new_sink = Sink::try_new(&handle)
                                .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                            *stream = Some(s);
                            *sink = Some(new_sink);
                        }
                        Ok(())
                    }

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            AlertCommand::Chime => {
                                if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                    log::warn!("completion chime skipped: {err}");
                                    continue;
                                }
                                if let Some(ref s) = sink {
                                    s.append(Chime::new());
                                }
                            }
                        }
                    }
                })
                .map_err(|e| anyhow!("failed to spawn alert thread: {e}"))?;

            *guard = Some(tx.clone());
            Ok(tx)
        }
    }

    impl AlertCue for ChimeAlert {
        fn play(&self) -> Result<()> {
            let tx = self.ensure_thread()?;
            tx.send(AlertCommand::Chime)
                .map_err(|_| anyhow!("alert thread has exited"))
        }
    }
}
