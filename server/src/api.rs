//! HTTP API for inspecting and controlling connected frames.

use super::State;
use async_trait::async_trait;
use model::{FrameId, Registry, RegistryError};
use tide::{Body, Request, Response, StatusCode};
use tide_websockets::WebSocketConnection;

/// A connection to a frame which text can be pushed to.
#[async_trait]
pub trait Push: Clone + Send + Sync {
    async fn push(&self, text: String) -> tide::Result<()>;
}

#[async_trait]
impl Push for WebSocketConnection {
    async fn push(&self, text: String) -> tide::Result<()> {
        Ok(self.send_string(text).await?)
    }
}

pub async fn healthcheck(_req: Request<State>) -> tide::Result {
    Ok("OK".into())
}

/// `GET /frames`: list all connected frames.
pub async fn list_frames(req: Request<State>) -> tide::Result {
    let frames = req.state().frames.list().await;
    Ok(Body::from_json(&frames)?.into())
}

/// `GET /frames/:id`
pub async fn get_frame(req: Request<State>) -> tide::Result {
    let id = frame_id(&req)?;
    match req.state().frames.info(id).await {
        Some(info) => Ok(Body::from_json(&info)?.into()),
        None => Err(registry_error(RegistryError::UnknownFrame(id))),
    }
}

/// `PUT /frames/:id/name`: rename a frame. The body is the new name.
pub async fn set_name(mut req: Request<State>) -> tide::Result {
    let id = frame_id(&req)?;
    let name = body_text(&mut req).await?;
    req.state()
        .frames
        .set_name(id, &name)
        .await
        .map_err(registry_error)?;
    Ok(Response::new(StatusCode::NoContent))
}

/// `POST /frames/:id/send`: push the body to a frame as a text message.
pub async fn send(mut req: Request<State>) -> tide::Result {
    let id = frame_id(&req)?;
    let text = body_text(&mut req).await?;
    push(&req.state().frames, id, text).await?;
    Ok(Response::new(StatusCode::NoContent))
}

/// Push `text` to the frame `id`.
///
/// A frame whose connection fails is dropped from the registry and reported as unknown.
async fn push<C: Push>(frames: &Registry<C>, id: FrameId, text: String) -> tide::Result<()> {
    let conn = frames
        .connection(id)
        .await
        .ok_or_else(|| registry_error(RegistryError::UnknownFrame(id)))?;
    if let Err(err) = conn.push(text).await {
        tracing::warn!("dropping unreachable frame {id}: {err}");
        frames.deregister(id).await;
        return Err(registry_error(RegistryError::UnknownFrame(id)));
    }
    tracing::debug!("pushed message to frame {id}");
    Ok(())
}

async fn body_text(req: &mut Request<State>) -> tide::Result<String> {
    req.body_string().await.map_err(|err| {
        tide::Error::from_str(StatusCode::BadRequest, format!("invalid body: {err}"))
    })
}

fn frame_id(req: &Request<State>) -> tide::Result<FrameId> {
    req.param("id")?.parse().map_err(|err| {
        tide::Error::from_str(StatusCode::BadRequest, format!("invalid frame ID: {err}"))
    })
}

fn registry_error(err: RegistryError) -> tide::Error {
    let status = match &err {
        RegistryError::UnknownFrame(_) => StatusCode::NotFound,
        RegistryError::InvalidName(_) => StatusCode::BadRequest,
    };
    tide::Error::new(status, err)
}

#[cfg(test)]
mod test {
    use super::*;
    use async_std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Push for Recorder {
        async fn push(&self, text: String) -> tide::Result<()> {
            self.0.lock().await.push(text);
            Ok(())
        }
    }

    #[derive(Clone)]
    struct Closed;

    #[async_trait]
    impl Push for Closed {
        async fn push(&self, _text: String) -> tide::Result<()> {
            Err(tide::Error::from_str(
                StatusCode::InternalServerError,
                "connection closed",
            ))
        }
    }

    #[async_std::test]
    async fn test_push() {
        let frames = Registry::new();
        let conn = Recorder::default();
        let id = frames.register(conn.clone()).await;

        push(&frames, id, "one".into()).await.unwrap();
        push(&frames, id, "two".into()).await.unwrap();
        assert_eq!(*conn.0.lock().await, ["one", "two"]);

        let err = push(&frames, FrameId::random(), "lost".into())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NotFound);
        assert_eq!(conn.0.lock().await.len(), 2);
    }

    #[async_std::test]
    async fn test_push_to_closed_frame() {
        let frames = Registry::new();
        let id = frames.register(Closed).await;
        let other = frames.register(Closed).await;

        let err = push(&frames, id, "hello".into()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NotFound);
        assert!(frames.info(id).await.is_none());
        // Other frames are unaffected.
        assert!(frames.info(other).await.is_some());
    }
}
