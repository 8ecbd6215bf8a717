use crate::config::EvolutionConfig;
use crate::engines::generation::{
    ChannelProgressCallback, EvolutionEvent, GenomeDescriptor, ProgressMessage, Transition,
};
use crate::engines::EvolutionSession;
use crate::error::EvolverError;
use crate::types::Image;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A rendered genome as the viewer shows it.
#[derive(Debug, Clone)]
pub struct TileView {
    pub descriptor: GenomeDescriptor,
    pub image: Image,
}

/// Snapshot of the session after a transition.
#[derive(Debug, Clone)]
pub struct PopulationView {
    pub generation: usize,
    pub history_len: usize,
    pub tiles: Vec<TileView>,
}

impl PopulationView {
    /// `None` before the first population exists or if any genome lacks an image.
    pub fn capture(session: &EvolutionSession) -> Option<Self> {
        let generation = session.generation();
        let tiles = session
            .population()?
            .iter()
            .map(|genome| {
                genome.image().map(|image| TileView {
                    descriptor: genome.descriptor(generation),
                    image: image.clone(),
                })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            generation,
            history_len: session.engine().history().len(),
            tiles,
        })
    }
}

pub enum RunnerCommand {
    Event(EvolutionEvent),
    Reconfigure(EvolutionConfig),
}

#[derive(Debug)]
pub enum RunnerUpdate {
    Ready {
        transition: Transition,
        view: PopulationView,
    },
    Reconfigured,
    Failed {
        action: &'static str,
        error: EvolverError,
    },
}

/// Owns the session on a background thread and applies viewer events in order.
pub struct EvolutionRunner {
    commands: Option<Sender<RunnerCommand>>,
    updates: Receiver<RunnerUpdate>,
    progress: Receiver<ProgressMessage>,
    handle: Option<JoinHandle<()>>,
    in_flight: usize,
}

impl EvolutionRunner {
    pub fn start(session: EvolutionSession) -> Result<Self, EvolverError> {
        let (command_tx, command_rx) = channel();
        let (update_tx, update_rx) = channel();
        let (progress_tx, progress_rx) = channel();

        let handle = thread::Builder::new()
            .name("evolution".to_string())
            .spawn(move || Self::run(session, command_rx, update_tx, progress_tx))?;

        Ok(Self {
            commands: Some(command_tx),
            updates: update_rx,
            progress: progress_rx,
            handle: Some(handle),
            in_flight: 0,
        })
    }

    pub fn send(&mut self, event: EvolutionEvent) -> Result<(), EvolverError> {
        self.dispatch(RunnerCommand::Event(event))
    }

    pub fn reconfigure(&mut self, config: EvolutionConfig) -> Result<(), EvolverError> {
        self.dispatch(RunnerCommand::Reconfigure(config))
    }

    fn dispatch(&mut self, command: RunnerCommand) -> Result<(), EvolverError> {
        let sender = self
            .commands
            .as_ref()
            .ok_or_else(|| EvolverError::Configuration("evolution runner is stopped".to_string()))?;
        sender
            .send(command)
            .map_err(|_| EvolverError::Configuration("evolution thread has exited".to_string()))?;
        self.in_flight += 1;
        Ok(())
    }

    /// True while commands are queued or being worked on.
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Poll for progress updates (non-blocking)
    pub fn poll_progress(&mut self) -> Option<ProgressMessage> {
        self.progress.try_recv().ok()
    }

    /// Poll for the outcome of a queued command (non-blocking)
    pub fn poll_update(&mut self) -> Option<RunnerUpdate> {
        match self.updates.try_recv() {
            Ok(update) => Some(self.settle(update)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.in_flight = 0;
                None
            }
        }
    }

    pub fn wait_update(&mut self, timeout: Duration) -> Option<RunnerUpdate> {
        match self.updates.recv_timeout(timeout) {
            Ok(update) => Some(self.settle(update)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.in_flight = 0;
                None
            }
        }
    }

    fn settle(&mut self, update: RunnerUpdate) -> RunnerUpdate {
        self.in_flight = self.in_flight.saturating_sub(1);
        update
    }

    fn run(
        mut session: EvolutionSession,
        commands: Receiver<RunnerCommand>,
        updates: Sender<RunnerUpdate>,
        progress: Sender<ProgressMessage>,
    ) {
        log::debug!("Evolution thread started");
        let mut callback = ChannelProgressCallback::new(progress);

        // Ends when the runner drops its sender.
        while let Ok(command) = commands.recv() {
            let update = match command {
                RunnerCommand::Reconfigure(config) => match session.reconfigure(config) {
                    Ok(()) => RunnerUpdate::Reconfigured,
                    Err(error) => RunnerUpdate::Failed { action: "reconfigure", error },
                },
                RunnerCommand::Event(event) => {
                    let action = event.name();
                    match session.handle(event, &mut callback) {
                        Ok(transition) => match PopulationView::capture(&session) {
                            Some(view) => RunnerUpdate::Ready { transition, view },
                            None => RunnerUpdate::Failed {
                                action,
                                error: EvolverError::NoPopulation,
                            },
                        },
                        Err(error) => {
                            match &error {
                                EvolverError::EmptyHistory => log::info!("Nothing to go back to"),
                                other => log::error!("{} failed: {}", action, other),
                            }
                            RunnerUpdate::Failed { action, error }
                        }
                    }
                }
            };

            if updates.send(update).is_err() {
                break;
            }
        }
        log::debug!("Evolution thread stopped");
    }
}

impl Drop for EvolutionRunner {
    fn drop(&mut self) {
        self.commands.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Evolution thread panicked");
            }
        }
    }
}
