//! WebSocket fan-out of game events.
//!
//! Game operations return their events; routes hand them to [`EventHub::dispatch`],
//! which forwards each one to the sockets subscribed to that game.

use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use minesweeper_common::protocol::GameEvent;
use rocket::futures::{SinkExt, future::join_all, stream::SplitSink};
use rocket_ws::{Message, stream::DuplexStream};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::data::BoardId;

type Sink = SplitSink<DuplexStream, Message>;
type Subscribers = Arc<Mutex<HashMap<Uuid, Sink>>>;

#[derive(Clone, Default)]
pub struct EventHub {
    boards: Arc<DashMap<BoardId, Subscribers>>,
}

async fn send(stream: &mut Sink, message: &str) {
    if let Err(e) = stream.send(Message::Text(message.to_string())).await {
        debug!("Dropping event for closed stream: {}", e);
    }
}

async fn broadcast(streams: &mut HashMap<Uuid, Sink>, message: &str) {
    let futures: Vec<_> = streams
        .iter_mut()
        .map(|(_, stream)| send(stream, message))
        .collect();

    join_all(futures).await;
}

impl EventHub {
    fn subscribers(&self, board_id: BoardId) -> Option<Subscribers> {
        self.boards.get(&board_id).map(|entry| entry.value().clone())
    }

    #[instrument(level = "trace", skip(self, stream))]
    pub async fn subscribe(&self, board_id: BoardId, stream: Sink) -> Uuid {
        let id = Uuid::new_v4();
        let subscribers = self.boards.entry(board_id).or_default().clone();

        let mut streams = subscribers.lock().await;
        streams.insert(id, stream);
        info!(
            "Stream {} subscribed to game {}, total subscribers: {}",
            id,
            board_id,
            streams.len()
        );
        id
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn unsubscribe(&self, board_id: BoardId, id: &Uuid) {
        let Some(subscribers) = self.subscribers(board_id) else {
            return;
        };

        let mut streams = subscribers.lock().await;
        if streams.remove(id).is_some() {
            info!(
                "Stream {} unsubscribed from game {}, remaining: {}",
                id,
                board_id,
                streams.len()
            );
        } else {
            warn!("Attempted to remove non-existent stream: {}", id);
        }

        if streams.is_empty() {
            drop(streams);
            self.boards.remove_if(&board_id, |_, subscribers| {
                subscribers.try_lock().is_ok_and(|streams| streams.is_empty())
            });
        }
    }

    pub async fn subscriber_count(&self, board_id: BoardId) -> usize {
        match self.subscribers(board_id) {
            Some(subscribers) => subscribers.lock().await.len(),
            None => 0,
        }
    }

    /// Sends every event to the subscribers of its game.
    ///
    /// Subscribers of a deleted game are dropped after the deletion is announced.
    pub async fn dispatch(&self, events: &[GameEvent]) {
        for event in events {
            let board_id = event.board_id();

            if let Some(subscribers) = self.subscribers(board_id) {
                match serde_json::to_string(event) {
                    Ok(message) => {
                        let mut streams = subscribers.lock().await;
                        broadcast(&mut streams, &message).await;
                        debug!(
                            "Dispatched event for game {} to {} subscribers",
                            board_id,
                            streams.len()
                        );
                    }
                    Err(e) => warn!("Failed to serialize event for game {}: {}", board_id, e),
                }
            }

            if matches!(event, GameEvent::GameDeleted { .. }) {
                self.boards.remove(&board_id);
            }
        }
    }
}
