#![cfg(test)]

//! End-to-end tests which start a server on an unused port and drive it over HTTP and WebSockets.

use super::Options;
use anyhow::Error;
use async_std::task::{sleep, spawn};
use async_tungstenite::{
    async_std::{connect_async, ConnectStream},
    tungstenite::Message,
    WebSocketStream,
};
use futures::{SinkExt, StreamExt};
use model::{init_logging, FrameId, FrameInfo, MAX_NAME_LEN};
use portpicker::pick_unused_port;
use std::net::Ipv4Addr;
use std::time::Duration;
use surf::{http::StatusCode, Client};

type Socket = WebSocketStream<ConnectStream>;

struct TestServer {
    port: u16,
    client: Client,
}

impl TestServer {
    async fn start() -> Result<Self, Error> {
        init_logging();

        let port = pick_unused_port().ok_or_else(|| Error::msg("no free ports"))?;
        let opt = Options {
            host: Ipv4Addr::LOCALHOST.into(),
            port,
        };
        spawn(async move {
            opt.serve().await.unwrap();
            tracing::warn!("server exited");
        });

        let client = Client::try_from(
            surf::Config::default().set_base_url(format!("http://localhost:{port}").parse()?),
        )
        .map_err(Error::msg)?;
        wait_for_server(&client).await?;
        Ok(Self { port, client })
    }

    async fn connect(&self, query: &str) -> Result<Socket, Error> {
        let (socket, _) = connect_async(format!("ws://localhost:{}/view{query}", self.port)).await?;
        Ok(socket)
    }

    async fn frames(&self) -> Result<Vec<FrameInfo>, Error> {
        self.client
            .get("/frames")
            .recv_json()
            .await
            .map_err(Error::msg)
    }

    async fn status(&self, req: surf::RequestBuilder) -> Result<StatusCode, Error> {
        let res = req.await.map_err(Error::msg)?;
        Ok(res.status())
    }

    /// Wait until the number of connected frames is `n`.
    async fn wait_for_frames(&self, n: usize) -> Result<Vec<FrameInfo>, Error> {
        for _ in 0..50 {
            let frames = self.frames().await?;
            if frames.len() == n {
                return Ok(frames);
            }
            sleep(Duration::from_millis(100)).await;
        }
        Err(Error::msg(format!("timed out waiting for {n} frames")))
    }
}

async fn wait_for_server(client: &Client) -> Result<(), Error> {
    const MAX_CONNECT_RETRIES: usize = 60;

    for _ in 0..MAX_CONNECT_RETRIES {
        match client.get("/healthcheck").await {
            Ok(res) if res.status() == StatusCode::Ok => return Ok(()),
            Ok(res) => tracing::warn!("waiting for server to start: status {}", res.status()),
            Err(err) => tracing::warn!("waiting for server to start: {err}"),
        }
        sleep(Duration::from_secs(1)).await;
    }

    Err(Error::msg("timed out waiting for server"))
}

async fn recv(socket: &mut Socket) -> Result<Message, Error> {
    socket
        .next()
        .await
        .ok_or_else(|| Error::msg("connection closed"))?
        .map_err(Error::from)
}

#[async_std::test]
async fn test_echo() -> Result<(), Error> {
    let server = TestServer::start().await?;
    let mut socket = server.connect("").await?;

    socket.send(Message::Text("hello".into())).await?;
    assert_eq!(recv(&mut socket).await?, Message::Text("hello".into()));

    socket.send(Message::Binary(vec![0, 1, 2, 255])).await?;
    assert_eq!(recv(&mut socket).await?, Message::Binary(vec![0, 1, 2, 255]));

    // Messages come back in the order they were sent.
    for i in 0..10 {
        socket.send(Message::Text(i.to_string())).await?;
    }
    for i in 0..10 {
        assert_eq!(recv(&mut socket).await?, Message::Text(i.to_string()));
    }

    Ok(())
}

#[async_std::test]
async fn test_frames_registered_while_connected() -> Result<(), Error> {
    let server = TestServer::start().await?;
    assert!(server.frames().await?.is_empty());

    let mut named = server.connect("?name=kitchen").await?;
    let mut unnamed = server.connect("").await?;
    // Names which are only whitespace or are too long are ignored.
    let mut blank = server.connect("?name=%20%20").await?;
    let mut long = server
        .connect(&format!("?name={}", "x".repeat(MAX_NAME_LEN + 1)))
        .await?;
    for socket in [&mut named, &mut unnamed, &mut blank, &mut long] {
        socket.send(Message::Text("ping".into())).await?;
        recv(socket).await?;
    }

    let frames = server.wait_for_frames(4).await?;
    assert_eq!(frames[0].name.as_deref(), Some("kitchen"));
    assert!(frames[1..].iter().all(|frame| frame.name.is_none()));

    // Each frame can be looked up individually.
    for frame in &frames {
        let info: FrameInfo = server
            .client
            .get(format!("/frames/{}", frame.id))
            .recv_json()
            .await
            .map_err(Error::msg)?;
        assert_eq!(&info, frame);
    }

    // Frames disappear when they disconnect.
    named.close(None).await?;
    let frames = server.wait_for_frames(3).await?;
    assert!(frames.iter().all(|frame| frame.name.is_none()));

    drop(unnamed);
    drop(blank);
    drop(long);
    server.wait_for_frames(0).await?;

    Ok(())
}

#[async_std::test]
async fn test_rename() -> Result<(), Error> {
    let server = TestServer::start().await?;
    let mut socket = server.connect("").await?;
    socket.send(Message::Text("ping".into())).await?;
    recv(&mut socket).await?;
    let id = server.wait_for_frames(1).await?[0].id;

    let status = server
        .status(
            server
                .client
                .put(format!("/frames/{id}/name"))
                .body_string("porch".into()),
        )
        .await?;
    assert_eq!(status, StatusCode::NoContent);
    assert_eq!(
        server.frames().await?,
        vec![FrameInfo {
            id,
            name: Some("porch".into()),
        }]
    );

    // Invalid names are rejected and leave the frame unchanged.
    let status = server
        .status(
            server
                .client
                .put(format!("/frames/{id}/name"))
                .body_string("   ".into()),
        )
        .await?;
    assert_eq!(status, StatusCode::BadRequest);
    let status = server
        .status(
            server
                .client
                .put(format!("/frames/{id}/name"))
                .body_string("x".repeat(MAX_NAME_LEN + 1)),
        )
        .await?;
    assert_eq!(status, StatusCode::BadRequest);
    let status = server
        .status(
            server
                .client
                .put(format!("/frames/{id}/name"))
                .body_bytes([0xff, 0xfe]),
        )
        .await?;
    assert_eq!(status, StatusCode::BadRequest);
    assert_eq!(server.frames().await?[0].name.as_deref(), Some("porch"));

    Ok(())
}

#[async_std::test]
async fn test_send() -> Result<(), Error> {
    let server = TestServer::start().await?;
    let mut socket = server.connect("?name=hall").await?;
    socket.send(Message::Text("ping".into())).await?;
    recv(&mut socket).await?;
    let id = server.wait_for_frames(1).await?[0].id;

    let status = server
        .status(
            server
                .client
                .post(format!("/frames/{id}/send"))
                .body_string("show this".into()),
        )
        .await?;
    assert_eq!(status, StatusCode::NoContent);
    assert_eq!(recv(&mut socket).await?, Message::Text("show this".into()));

    // Echo still works after a push.
    socket.send(Message::Text("pong".into())).await?;
    assert_eq!(recv(&mut socket).await?, Message::Text("pong".into()));

    Ok(())
}

#[async_std::test]
async fn test_bad_frame_ids() -> Result<(), Error> {
    let server = TestServer::start().await?;
    let unknown = FrameId::random();

    assert_eq!(
        server
            .status(server.client.get(format!("/frames/{unknown}")))
            .await?,
        StatusCode::NotFound
    );
    assert_eq!(
        server.status(server.client.get("/frames/not-a-uuid")).await?,
        StatusCode::BadRequest
    );
    assert_eq!(
        server
            .status(
                server
                    .client
                    .put(format!("/frames/{unknown}/name"))
                    .body_string("porch".into())
            )
            .await?,
        StatusCode::NotFound
    );
    assert_eq!(
        server
            .status(
                server
                    .client
                    .post(format!("/frames/{unknown}/send"))
                    .body_string("hello".into())
            )
            .await?,
        StatusCode::NotFound
    );
    assert_eq!(
        server
            .status(
                server
                    .client
                    .put("/frames/not-a-uuid/name")
                    .body_string("porch".into())
            )
            .await?,
        StatusCode::BadRequest
    );
    assert_eq!(
        server
            .status(
                server
                    .client
                    .post("/frames/not-a-uuid/send")
                    .body_string("hello".into())
            )
            .await?,
        StatusCode::BadRequest
    );

    // Plain HTTP requests to the frame endpoint are refused.
    assert_eq!(
        server.status(server.client.get("/view")).await?,
        StatusCode::UpgradeRequired
    );

    Ok(())
}
