use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::{Event, Session};
use crate::error::{invalid_input_error, Error};
use crate::realtime::{Channel, SubscriberId, Subscription};

/// What a client may send over the socket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    JoinSession { session_id: Uuid },
    LeaveSession { session_id: Uuid },
    JoinUser,
    LeaveUser,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Event { event: Event },
    Joined { session: Session },
    Subscribed { channel: Channel, changed: bool },
    Unsubscribed { channel: Channel, changed: bool },
    Error { error: Error },
}

pub async fn connect(
    ws: WebSocketUpgrade,
    Extension(api): Extension<DynAPI>,
    user: User,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run(socket, api, user))
}

#[tracing::instrument(skip(socket, api), fields(user_id = %user.id))]
async fn run(socket: WebSocket, api: DynAPI, user: User) {
    let (mut sink, mut stream) = socket.split();
    let Subscription { id, mut inbox } = api.connect();

    tracing::info!(subscriber_id = %id, "realtime client connected");

    loop {
        let reply = tokio::select! {
            event = inbox.recv() => match event {
                Some(event) => Reply::Event { event },
                None => break,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => handle(&api, &user, id, &text).await,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
        };

        let text = match serde_json::to_string(&reply) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!("failed to encode reply: {}", err);
                continue;
            }
        };

        if sink.send(Message::Text(text)).await.is_err() {
            break;
        }
    }

    api.disconnect(id);

    tracing::info!(subscriber_id = %id, "realtime client disconnected");
}

pub async fn handle(api: &DynAPI, user: &User, subscriber: SubscriberId, text: &str) -> Reply {
    let command = match serde_json::from_str::<Command>(text) {
        Ok(command) => command,
        Err(err) => {
            tracing::info!("unreadable command: {}", err);
            return Reply::Error {
                error: invalid_input_error(),
            };
        }
    };

    match command {
        Command::JoinSession { session_id } => {
            match api.join_session(user.clone(), subscriber, session_id).await {
                Ok(session) => Reply::Joined { session },
                Err(error) => Reply::Error { error },
            }
        }
        Command::LeaveSession { session_id } => Reply::Unsubscribed {
            channel: Channel::Session(session_id),
            changed: api.leave_session(subscriber, session_id),
        },
        Command::JoinUser => Reply::Subscribed {
            channel: Channel::User(user.id),
            changed: api.join_user(user, subscriber),
        },
        Command::LeaveUser => Reply::Unsubscribed {
            channel: Channel::User(user.id),
            changed: api.leave_user(user, subscriber),
        },
    }
}
