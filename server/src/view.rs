//! The WebSocket endpoint that frames connect to.

use super::State;
use futures::StreamExt;
use model::validate_name;
use tide::Request;
use tide_websockets::{Message, WebSocketConnection};

/// Handle a frame connection.
///
/// The frame is registered for as long as the connection is open. If the request has a `name`
/// query parameter with a valid name, the frame is registered under that name; an invalid name is
/// logged and the frame is registered unnamed. Every message the frame sends is echoed back
/// to it.
pub async fn view(req: Request<State>, mut stream: WebSocketConnection) -> tide::Result<()> {
    let frames = &req.state().frames;

    // Settle the name first, so the frame is never listed without it.
    let name = req
        .url()
        .query_pairs()
        .find(|(key, _)| key == "name")
        .and_then(|(_, name)| match validate_name(&name) {
            Ok(name) => Some(name.to_owned()),
            Err(err) => {
                tracing::warn!("ignoring name for new frame: {err}");
                None
            }
        });
    let id = match name {
        Some(name) => frames.register_named(stream.clone(), &name).await?,
        None => frames.register(stream.clone()).await,
    };

    let res = echo(&mut stream).await;
    frames.deregister(id).await;
    res
}

async fn echo(stream: &mut WebSocketConnection) -> tide::Result<()> {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => stream.send_string(text).await?,
            Ok(Message::Binary(bytes)) => stream.send_bytes(bytes).await?,
            Ok(Message::Close(_)) => break,
            // Pings are answered by the WebSocket layer.
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("frame connection failed: {err}");
                break;
            }
        }
    }
    Ok(())
}
