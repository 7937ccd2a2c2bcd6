//! The engine task: owns the model and the store, and handles one request
//! at a time.
//!
//! Requests arrive over an mpsc channel, each with a oneshot for the
//! answer. Between requests the loop drives the store's save schedule.
//! Deliveries run in their own tasks so a slow send never holds up state
//! handling; the answer is sent once the delivery settles.

use std::sync::Arc;

use ringvc_shared::{ChannelSnapshot, GroupId, RingError, UserId};
use ringvc_store::{DebouncedStore, State, StoreStatus};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::commands::{self, Command, Invoker, Outcome, RingRequest};
use crate::delivery::{Delivery, Notification};
use crate::error::ApiError;
use crate::ring::{auto_ring_targets, plan_join, ring_message, JOINED, WANTS_YOU};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Requests sent *into* the engine task.
#[derive(Debug)]
pub enum EngineCommand {
    /// A user connected to a voice channel.
    Join {
        channel: ChannelSnapshot,
        user: UserId,
        reply: oneshot::Sender<JoinReport>,
    },
    /// A user ran a command.
    Execute {
        invoker: Invoker,
        command: Command,
        reply: oneshot::Sender<String>,
    },
    /// Request the store's persistence status.
    Status(oneshot::Sender<StoreStatus>),
    /// Flush and stop.
    Shutdown(oneshot::Sender<()>),
}

/// What a join event led to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    /// Signed-up users the join announcement mentioned.
    pub users: Vec<UserId>,
    /// Signed-up groups the join announcement mentioned.
    pub groups: Vec<GroupId>,
    /// Default recipients rung by the joiner's auto-ring.
    pub auto_rung: Vec<UserId>,
    /// Reasons something could not be sent.
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cheap, cloneable sender half of the engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T, ApiError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| ApiError::EngineUnavailable)?;
        response.await.map_err(|_| ApiError::EngineUnavailable)
    }

    pub async fn join(&self, channel: ChannelSnapshot, user: UserId) -> Result<JoinReport, ApiError> {
        self.request(|reply| EngineCommand::Join {
            channel,
            user,
            reply,
        })
        .await
    }

    pub async fn execute(&self, invoker: Invoker, command: Command) -> Result<String, ApiError> {
        self.request(|reply| EngineCommand::Execute {
            invoker,
            command,
            reply,
        })
        .await
    }

    pub async fn status(&self) -> Result<StoreStatus, ApiError> {
        self.request(EngineCommand::Status).await
    }

    pub async fn shutdown(&self) -> Result<(), ApiError> {
        self.request(EngineCommand::Shutdown).await
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

pub fn spawn_engine(
    mut state: State,
    mut store: DebouncedStore,
    delivery: Arc<dyn Delivery>,
) -> (EngineHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<EngineCommand>(256);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                // --- Incoming requests ---
                request = rx.recv() => {
                    match request {
                        Some(EngineCommand::Join { channel, user, reply }) => {
                            handle_join(&state, &delivery, channel, user, reply);
                        }
                        Some(EngineCommand::Execute { invoker, command, reply }) => {
                            debug!(user = %invoker.user, ?command, "Executing command");
                            match commands::execute(&mut state, &invoker, command) {
                                Outcome::Reply(text) => {
                                    let _ = reply.send(text);
                                }
                                Outcome::Ring(request) => spawn_ring(&delivery, request, reply),
                            }
                        }
                        Some(EngineCommand::Status(reply)) => {
                            let _ = reply.send(store.status());
                        }
                        Some(EngineCommand::Shutdown(reply)) => {
                            info!("Engine shutdown requested");
                            flush(&mut store, &state).await;
                            let _ = reply.send(());
                            break;
                        }
                        None => {
                            info!("Request channel closed, shutting down engine");
                            flush(&mut store, &state).await;
                            break;
                        }
                    }
                }

                // --- Save schedule ---
                _ = store.tick(&state) => {}
            }
        }
    });

    (EngineHandle { tx }, task)
}

async fn flush(store: &mut DebouncedStore, state: &State) {
    if let Err(e) = store.shutdown(state).await {
        error!(error = %e, "Final save failed");
    }
}

fn handle_join(
    state: &State,
    delivery: &Arc<dyn Delivery>,
    channel: ChannelSnapshot,
    user: UserId,
    reply: oneshot::Sender<JoinReport>,
) {
    let plan = plan_join(state, &channel, &user);
    let mut report = JoinReport::default();
    let mut outgoing: Vec<Notification> = Vec::new();

    if !plan.is_empty() {
        info!(
            user = %user,
            channel = %channel.id,
            users = plan.users.len(),
            groups = plan.groups.len(),
            "Announcing join"
        );
        report.users = plan.users.clone();
        report.groups = plan.groups.clone();
        outgoing.push(ring_message(&channel, &user, JOINED, plan.users, plan.groups));
    }

    match auto_ring_targets(state, &channel, &user) {
        None => {}
        Some(Ok(targets)) => {
            info!(user = %user, channel = %channel.id, recipients = targets.len(), "Auto-ringing");
            report.auto_rung = targets.clone();
            outgoing.push(ring_message(&channel, &user, WANTS_YOU, targets, Vec::new()));
        }
        Some(Err(e)) => {
            debug!(user = %user, reason = %e, "Auto-ring skipped");
            report.errors.push(format!("auto-ring: {e}"));
        }
    }

    let delivery = Arc::clone(delivery);
    tokio::spawn(async move {
        for notification in &outgoing {
            if let Err(e) = delivery.send(notification).await {
                warn!(channel = %notification.channel, error = %e, "Delivery failed");
                report.errors.push(RingError::from(e).to_string());
            }
        }
        let _ = reply.send(report);
    });
}

fn spawn_ring(delivery: &Arc<dyn Delivery>, request: RingRequest, reply: oneshot::Sender<String>) {
    let delivery = Arc::clone(delivery);
    tokio::spawn(async move {
        let RingRequest {
            notification,
            target,
        } = request;
        let text = match delivery.send(&notification).await {
            Ok(()) => format!("Notified {target}"),
            Err(e) => {
                warn!(channel = %notification.channel, error = %e, "Ring delivery failed");
                format!("Can't notify {target} because {}", RingError::from(e))
            }
        };
        let _ = reply.send(text);
    });
}
