//! The monitor actor.
//!
//! A single task owns [`MonitorState`]. Timer ticks and API requests both
//! arrive on one channel and are handled strictly one after another, so a
//! sampling round always runs to completion before anything else touches
//! the metrics, and two rounds can never overlap.

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};

use crate::config::Config;
use crate::eth::ChainSource;
use crate::models::{Alert, SampleResult, Topology};
use crate::sampler;
use crate::state::{ExportView, InitialView, MonitorState, PerformanceView};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Pushed to every subscriber as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    DaUpdate(Box<SampleResult>),
    Alert(Alert),
    AlertAcknowledged { alert_id: String },
}

#[derive(thiserror::Error, Debug)]
#[error("monitor task has stopped")]
pub struct MonitorStopped;

enum Command {
    RunRound(oneshot::Sender<SampleResult>),
    History {
        limit: usize,
        reply: oneshot::Sender<Vec<SampleResult>>,
    },
    Performance(oneshot::Sender<PerformanceView>),
    Alerts {
        unacknowledged_only: bool,
        limit: usize,
        reply: oneshot::Sender<Vec<Alert>>,
    },
    Acknowledge {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    Topology(oneshot::Sender<Topology>),
    Export(oneshot::Sender<ExportView>),
    Initial(oneshot::Sender<InitialView>),
}

/// Cheap, cloneable access to the monitor task.
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

/// Starts the monitor task. With `periodic` set, a round runs immediately and
/// then every `config.poll_interval`; otherwise rounds only run on request.
/// The task exits once every handle has been dropped.
pub fn spawn<S: ChainSource>(source: S, config: &Config, periodic: bool) -> MonitorHandle {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (events_tx, _) = broadcast::channel(EVENT_BUFFER);

    let monitor = Monitor {
        source,
        state: MonitorState::new(config),
        commands: commands_rx,
        events: events_tx.clone(),
    };
    let ticker = periodic.then(|| {
        let mut ticker = tokio::time::interval(config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    tokio::spawn(monitor.run(ticker));

    MonitorHandle {
        commands: commands_tx,
        events: events_tx,
    }
}

impl MonitorHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, MonitorStopped> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| MonitorStopped)?;
        rx.await.map_err(|_| MonitorStopped)
    }

    /// Runs a round now, queued behind any round already in progress.
    pub async fn run_round(&self) -> Result<SampleResult, MonitorStopped> {
        self.request(Command::RunRound).await
    }

    pub async fn history(&self, limit: usize) -> Result<Vec<SampleResult>, MonitorStopped> {
        self.request(|reply| Command::History { limit, reply }).await
    }

    pub async fn performance(&self) -> Result<PerformanceView, MonitorStopped> {
        self.request(Command::Performance).await
    }

    pub async fn alerts(
        &self,
        unacknowledged_only: bool,
        limit: usize,
    ) -> Result<Vec<Alert>, MonitorStopped> {
        self.request(|reply| Command::Alerts {
            unacknowledged_only,
            limit,
            reply,
        })
        .await
    }

    /// `Ok(false)` when no alert has this id.
    pub async fn acknowledge(&self, id: impl Into<String>) -> Result<bool, MonitorStopped> {
        let id = id.into();
        self.request(|reply| Command::Acknowledge { id, reply }).await
    }

    pub async fn topology(&self) -> Result<Topology, MonitorStopped> {
        self.request(Command::Topology).await
    }

    pub async fn export(&self) -> Result<ExportView, MonitorStopped> {
        self.request(Command::Export).await
    }

    pub async fn initial(&self) -> Result<InitialView, MonitorStopped> {
        self.request(Command::Initial).await
    }
}

struct Monitor<S> {
    source: S,
    state: MonitorState,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<Event>,
}

impl<S: ChainSource> Monitor<S> {
    async fn run(mut self, mut ticker: Option<Interval>) {
        tracing::info!(
            endpoints = self.state.endpoints().len(),
            periodic = ticker.is_some(),
            "monitor started"
        );
        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    self.round().await;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }
        tracing::info!("monitor stopped");
    }

    async fn handle(&mut self, command: Command) {
        // a dropped receiver only means the caller went away
        match command {
            Command::RunRound(reply) => {
                let result = self.round().await;
                let _ = reply.send(result);
            }
            Command::History { limit, reply } => {
                let _ = reply.send(self.state.history(limit));
            }
            Command::Performance(reply) => {
                let _ = reply.send(self.state.performance());
            }
            Command::Alerts {
                unacknowledged_only,
                limit,
                reply,
            } => {
                let _ = reply.send(self.state.alerts.list(unacknowledged_only, limit));
            }
            Command::Acknowledge { id, reply } => {
                let found = self.state.alerts.acknowledge(&id);
                if found {
                    self.publish(Event::AlertAcknowledged { alert_id: id });
                }
                let _ = reply.send(found);
            }
            Command::Topology(reply) => {
                let _ = reply.send(self.state.topology());
            }
            Command::Export(reply) => {
                let _ = reply.send(self.state.export());
            }
            Command::Initial(reply) => {
                let _ = reply.send(self.state.initial_view());
            }
        }
    }

    async fn round(&mut self) -> SampleResult {
        let output = sampler::run_round(&self.source, &mut self.state).await;
        for alert in output.alerts {
            self.publish(Event::Alert(alert));
        }
        self.publish(Event::DaUpdate(Box::new(output.result.clone())));
        output.result
    }

    fn publish(&self, event: Event) {
        // Err only means nobody is listening right now.
        let _ = self.events.send(event);
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
