use crate::domain::WithdrawalEvent;
use error_ext::StdErrorExt;
use serde::Deserialize;
use std::{error::Error as StdError, num::NonZeroUsize};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, error, instrument, warn};

/// Transport for withdrawal events, e.g. a pub/sub topic.
#[trait_variant::make(Send)]
pub trait EventPublisher
where
    Self: Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    async fn publish(&self, event: &WithdrawalEvent) -> Result<(), Self::Error>;
}

const DEFAULT_BUFFER_SIZE: NonZeroUsize = match NonZeroUsize::new(1_024) {
    Some(buffer_size) => buffer_size,
    None => panic!("buffer size must not be zero"),
};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotifierConfig {
    #[serde(default = "default_buffer_size")]
    buffer_size: NonZeroUsize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_buffer_size() -> NonZeroUsize {
    DEFAULT_BUFFER_SIZE
}

/// Fire-and-forget handle for withdrawal events: events are queued and published by a background
/// dispatcher at most once; failures are only logged.
#[derive(Debug, Clone)]
pub struct Notifier {
    events: mpsc::Sender<WithdrawalEvent>,
}

impl Notifier {
    /// Spawn the dispatcher publishing via the given [EventPublisher]. The dispatcher completes
    /// once all [Notifier] clones are dropped and the queued events are handled.
    pub fn spawn<P>(publisher: P, config: NotifierConfig) -> (Self, JoinHandle<()>)
    where
        P: EventPublisher,
    {
        let (events, rx) = mpsc::channel(config.buffer_size.get());
        let dispatcher = tokio::spawn(dispatch(publisher, rx));
        (Self { events }, dispatcher)
    }

    /// Queue the given event without waiting; drops it if the queue is full or closed.
    pub fn notify(&self, event: WithdrawalEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}

            Err(TrySendError::Full(event)) => {
                warn!(?event, "notification queue full, dropping withdrawal event")
            }

            Err(TrySendError::Closed(event)) => {
                warn!(?event, "notification dispatcher gone, dropping withdrawal event")
            }
        }
    }
}

#[instrument(skip_all)]
async fn dispatch<P>(publisher: P, mut events: mpsc::Receiver<WithdrawalEvent>)
where
    P: EventPublisher,
{
    while let Some(event) = events.recv().await {
        match publisher.publish(&event).await {
            Ok(()) => debug!(?event, "published withdrawal event"),

            Err(error) => error!(
                error = error.as_chain(),
                ?event,
                "cannot publish withdrawal event"
            ),
        }
    }

    debug!("notification dispatcher completed");
}
