//! Serialized event loop for the policy controller.
//!
//! Resolver updates and transport notifications may arrive from any task;
//! they are queued on one unbounded channel and applied in arrival order by
//! a single consumer, so the ring, the backend set and the published picker
//! always agree with each other.

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::loader::ConfigError;
use crate::config::schema::PolicyConfig;
use crate::health::state::ConnectivityState;
use crate::load_balancer::policy::{PolicyUpdate, RingHashPolicy, UpdateOutcome};
use crate::net::transport::{BackendId, ConnectivityEvent};

/// Input to the policy event loop.
#[derive(Debug)]
pub enum PolicyEvent {
    /// A resolver/config update; the result is sent on `reply` if present.
    Update {
        update: PolicyUpdate,
        reply: Option<oneshot::Sender<Result<UpdateOutcome, ConfigError>>>,
    },
    /// A connectivity change reported by the transport.
    StateChanged(ConnectivityEvent),
}

/// Errors returned to callers of [`PolicySender::update`].
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("policy event loop has stopped")]
    Closed,
}

/// Cloneable handle for feeding the event loop.
#[derive(Debug, Clone)]
pub struct PolicySender {
    tx: mpsc::UnboundedSender<PolicyEvent>,
}

/// Create the event channel.
pub fn policy_channel() -> (PolicySender, mpsc::UnboundedReceiver<PolicyEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PolicySender { tx }, rx)
}

impl PolicySender {
    /// Apply an update and wait for its synchronous result.
    pub async fn update(&self, update: PolicyUpdate) -> Result<UpdateOutcome, PolicyError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PolicyEvent::Update {
                update,
                reply: Some(reply),
            })
            .map_err(|_| PolicyError::Closed)?;
        Ok(rx.await.map_err(|_| PolicyError::Closed)??)
    }

    /// Queue an update without waiting for the result.
    pub fn send_update(&self, update: PolicyUpdate) -> bool {
        self.tx
            .send(PolicyEvent::Update { update, reply: None })
            .is_ok()
    }

    /// Report a backend state change. Returns false once the loop has stopped.
    pub fn report(&self, id: BackendId, state: ConnectivityState) -> bool {
        self.tx
            .send(PolicyEvent::StateChanged(ConnectivityEvent { id, state }))
            .is_ok()
    }
}

/// Consume events until every sender is dropped or shutdown fires, then close the policy.
pub async fn run_policy(
    mut policy: RingHashPolicy,
    mut events: mpsc::UnboundedReceiver<PolicyEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!("Policy event loop starting");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => handle_event(&mut policy, event),
                None => {
                    tracing::debug!("All policy senders dropped");
                    break;
                }
            },
            _ = shutdown.recv() => {
                tracing::info!("Policy event loop received shutdown signal, exiting loop");
                break;
            }
        }
    }

    policy.close();
}

fn handle_event(policy: &mut RingHashPolicy, event: PolicyEvent) {
    match event {
        PolicyEvent::Update { update, reply } => {
            let result = policy.update(update);
            if let Some(reply) = reply {
                // The requester may have given up; the update stands either way.
                let _ = reply.send(result);
            }
        }
        PolicyEvent::StateChanged(ConnectivityEvent { id, state }) => {
            policy.on_state_change(id, state);
        }
    }
}

/// Forward reloaded file configs to the event loop until either side closes.
pub async fn forward_config_updates(
    mut configs: mpsc::UnboundedReceiver<PolicyConfig>,
    sender: PolicySender,
) {
    while let Some(config) = configs.recv().await {
        tracing::info!(endpoints = config.endpoints.len(), "Applying reloaded configuration");
        if !sender.send_update(config.to_update()) {
            break;
        }
    }
}
