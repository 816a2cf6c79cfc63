use clap::Parser;
use model::{init_logging, Registry};
use std::net::{IpAddr, SocketAddr};
use tide_websockets::{WebSocket, WebSocketConnection};

mod api;
mod test_runner;
mod view;

/// The frames connected to this server, with handles for pushing messages to them.
pub type Frames = Registry<WebSocketConnection>;

/// State shared by all request handlers.
#[derive(Clone, Default)]
pub struct State {
    pub frames: Frames,
}

/// Start the framous server.
#[derive(Clone, Debug, Parser)]
struct Options {
    /// The interface on which to listen.
    #[clap(long, env = "FRAMOUS_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// The port where the app should be served.
    #[clap(short, long, env = "FRAMOUS_PORT", default_value = "5000")]
    port: u16,
}

impl Options {
    async fn serve(self) -> Result<(), anyhow::Error> {
        let addr = SocketAddr::new(self.host, self.port);
        tracing::info!("serving on {addr}");
        app(State::default()).listen(addr).await?;
        Ok(())
    }
}

/// Build the HTTP application.
fn app(state: State) -> tide::Server<State> {
    let mut app = tide::with_state(state);
    app.at("/view").get(WebSocket::new(view::view));
    app.at("/frames").get(api::list_frames);
    app.at("/frames/:id").get(api::get_frame);
    app.at("/frames/:id/name").put(api::set_name);
    app.at("/frames/:id/send").post(api::send);
    app.at("/healthcheck").get(api::healthcheck);
    app
}

#[async_std::main]
async fn main() -> Result<(), anyhow::Error> {
    init_logging();
    Options::parse().serve().await
}
