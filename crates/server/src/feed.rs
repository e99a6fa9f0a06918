use crate::ServerState;
use futures::{Sink, SinkExt, Stream, StreamExt};
use netmon_monitor::{ChannelListener, ListenerId, Publisher};
use poem::{
    handler,
    web::{
        websocket::{Message, WebSocket},
        Data,
    },
    IntoResponse,
};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info};

/// `GET /ws` — upgrade to the live sample feed.
#[handler]
pub fn live(ws: WebSocket, Data(state): Data<&Arc<ServerState>>) -> impl IntoResponse {
    let state = Arc::clone(state);
    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = socket.split();
        pump(sink, stream, state.monitor.publisher(), state.listener_buffer).await;
    })
}

/// Register a listener for one connection and forward every published record
/// to `sink` until either side goes away.
///
/// Inbound messages are not part of the protocol; they are logged and
/// dropped without closing the connection.
pub(crate) async fn pump<S, R>(mut sink: S, mut inbound: R, publisher: &Publisher, buffer: usize)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = std::io::Result<Message>> + Unpin,
{
    let (listener, mut outbound) = ChannelListener::channel(buffer);
    let id = ListenerId::next();
    publisher.register(id, Arc::new(listener));
    info!("Client {id} connected to live feed");

    loop {
        tokio::select! {
            payload = outbound.recv() => {
                let Some(payload) = payload else { break };
                if let Err(e) = sink.send(Message::Text(payload.to_string())).await {
                    debug!("Send to {id} failed: {e}");
                    break;
                }
            }
            message = inbound.next() => match message {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Text(text))) => {
                    debug!("Discarding message from {id}: {text}");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Read from {id} failed: {e}");
                    break;
                }
            },
        }
    }

    publisher.deregister(id);
    info!("Client {id} disconnected from live feed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use netmon_core::Sample;
    use std::time::Duration;

    async fn wait_for_listeners(publisher: &Publisher, n: usize) {
        while publisher.listener_count() != n {
            tokio::task::yield_now().await;
        }
    }

    fn text(message: Message) -> String {
        match message {
            Message::Text(text) => text,
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn forwards_samples_and_ignores_client_chatter() {
        let publisher = Arc::new(Publisher::new());
        let (out_tx, mut out_rx) = mpsc::unbounded::<Message>();
        let (in_tx, in_rx) = mpsc::unbounded::<std::io::Result<Message>>();

        let task = tokio::spawn({
            let publisher = Arc::clone(&publisher);
            async move { pump(out_tx, in_rx, &publisher, 8).await }
        });
        wait_for_listeners(&publisher, 1).await;

        publisher.publish(&Sample::zeroed(11)).unwrap();
        let first = text(out_rx.next().await.unwrap());
        assert!(first.contains("\"timestamp\":11"));

        in_tx.unbounded_send(Ok(Message::Text("hello?".into()))).unwrap();
        publisher.publish(&Sample::zeroed(12)).unwrap();
        let second = text(out_rx.next().await.unwrap());
        assert!(second.contains("\"timestamp\":12"));
        assert_eq!(publisher.listener_count(), 1);

        in_tx.unbounded_send(Ok(Message::Close(None))).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(publisher.listener_count(), 0);
    }

    #[tokio::test]
    async fn client_hangup_deregisters() {
        let publisher = Arc::new(Publisher::new());
        let (out_tx, _out_rx) = mpsc::unbounded::<Message>();
        let (in_tx, in_rx) = mpsc::unbounded::<std::io::Result<Message>>();

        let task = tokio::spawn({
            let publisher = Arc::clone(&publisher);
            async move { pump(out_tx, in_rx, &publisher, 8).await }
        });
        wait_for_listeners(&publisher, 1).await;

        drop(in_tx);
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(publisher.listener_count(), 0);
    }
}
