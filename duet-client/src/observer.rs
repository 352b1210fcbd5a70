use async_trait::async_trait;

/// Connection lifecycle as seen by the embedding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Joining,
    RoomFull,
    Connected,
    Disconnected,
}

/// Which side of the session produced a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    Local,
    Remote,
}

/// The boundary to the embedding UI: it renders what arrives here and
/// never reaches into the controller's state.
#[async_trait]
pub trait RoomObserver: Send + Sync + 'static {
    async fn on_status(&self, status: Status);

    async fn on_message(&self, from: MessageSource, text: String);
}
