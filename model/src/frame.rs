//! Frames: display clients connected to the server.

use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a frame.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    FromStr,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
)]
#[serde(transparent)]
pub struct FrameId(Uuid);

impl FrameId {
    /// Generate a new random ID.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for FrameId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A connected frame.
///
/// `C` is a handle to the frame's connection, which can be used to push messages to the client.
#[derive(Clone, Debug)]
pub struct Frame<C> {
    id: FrameId,
    name: Option<String>,
    connection: C,
}

impl<C> Frame<C> {
    /// Create a new, unnamed frame with a fresh ID.
    pub fn new(connection: C) -> Self {
        Self {
            id: FrameId::random(),
            name: None,
            connection,
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Whether this frame has a non-empty name.
    pub fn has_name(&self) -> bool {
        self.name.as_ref().is_some_and(|name| !name.is_empty())
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// A snapshot of this frame's public information.
    pub fn info(&self) -> FrameInfo {
        FrameInfo {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Public information about a frame, as reported over the HTTP API.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FrameInfo {
    pub id: FrameId,
    pub name: Option<String>,
}
