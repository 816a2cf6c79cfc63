//! The table of connected frames.

use super::frame::{Frame, FrameId, FrameInfo};
use async_std::sync::{Arc, RwLock};
use derive_more::Display;
use std::collections::HashMap;

/// The maximum length of a frame name, in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Errors from operations on the [`Registry`].
#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum RegistryError {
    #[display(fmt = "no frame with ID {}", _0)]
    UnknownFrame(FrameId),
    #[display(fmt = "invalid frame name {:?}", _0)]
    InvalidName(String),
}

impl std::error::Error for RegistryError {}

/// Check that `name` is usable as a frame name, returning it with surrounding whitespace removed.
///
/// The trimmed name must be non-empty and at most [`MAX_NAME_LEN`] characters.
pub fn validate_name(name: &str) -> Result<&str, RegistryError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(RegistryError::InvalidName(name.into()));
    }
    Ok(name)
}

/// Shared table of all connected frames.
///
/// Cloning a registry yields another handle to the same table.
#[derive(Debug)]
pub struct Registry<C> {
    frames: Arc<RwLock<HashMap<FrameId, Frame<C>>>>,
}

impl<C> Clone for Registry<C> {
    fn clone(&self) -> Self {
        Self {
            frames: self.frames.clone(),
        }
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            frames: Default::default(),
        }
    }
}

impl<C> Registry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new frame for `connection`, returning its ID.
    pub async fn register(&self, connection: C) -> FrameId {
        self.insert(Frame::new(connection)).await
    }

    /// Add a new frame which is named from the start.
    ///
    /// If `name` is invalid, nothing is registered.
    pub async fn register_named(
        &self,
        connection: C,
        name: &str,
    ) -> Result<FrameId, RegistryError> {
        let name = validate_name(name)?;
        let mut frame = Frame::new(connection);
        frame.set_name(name);
        Ok(self.insert(frame).await)
    }

    async fn insert(&self, frame: Frame<C>) -> FrameId {
        let id = frame.id();
        match frame.name() {
            Some(name) => tracing::info!("registered frame {id} named {name:?}"),
            None => tracing::info!("registered frame {id}"),
        }
        self.frames.write().await.insert(id, frame);
        id
    }

    /// Remove a frame, returning it if it was registered.
    pub async fn deregister(&self, id: FrameId) -> Option<Frame<C>> {
        let frame = self.frames.write().await.remove(&id);
        if frame.is_some() {
            tracing::info!("deregistered frame {id}");
        }
        frame
    }

    /// Change the name of a frame. See [`validate_name`] for what is accepted.
    pub async fn set_name(&self, id: FrameId, name: &str) -> Result<(), RegistryError> {
        let name = validate_name(name)?;
        let mut frames = self.frames.write().await;
        let frame = frames
            .get_mut(&id)
            .ok_or(RegistryError::UnknownFrame(id))?;
        tracing::info!("frame {id} is now named {name:?}");
        frame.set_name(name);
        Ok(())
    }

    pub async fn info(&self, id: FrameId) -> Option<FrameInfo> {
        self.frames.read().await.get(&id).map(Frame::info)
    }

    /// Information about all registered frames.
    ///
    /// Named frames come first, ordered by name; ties and unnamed frames are ordered by ID.
    pub async fn list(&self) -> Vec<FrameInfo> {
        let mut frames = self
            .frames
            .read()
            .await
            .values()
            .map(Frame::info)
            .collect::<Vec<_>>();
        frames.sort_by(|a, b| {
            (a.name.is_none(), &a.name, a.id).cmp(&(b.name.is_none(), &b.name, b.id))
        });
        frames
    }

    /// The IDs of all frames named exactly `name`.
    pub async fn find_by_name(&self, name: &str) -> Vec<FrameId> {
        let mut ids = self
            .frames
            .read()
            .await
            .values()
            .filter(|frame| frame.name() == Some(name))
            .map(Frame::id)
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.frames.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<C: Clone> Registry<C> {
    /// Get a handle to the connection of a frame.
    pub async fn connection(&self, id: FrameId) -> Option<C> {
        self.frames
            .read()
            .await
            .get(&id)
            .map(|frame| frame.connection().clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[async_std::test]
    async fn test_register_deregister() {
        let registry = Registry::new();
        assert!(registry.is_empty().await);

        let a = registry.register("a").await;
        let b = registry.register("b").await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.connection(a).await, Some("a"));

        let removed = registry.deregister(a).await.unwrap();
        assert_eq!(removed.id(), a);
        assert_eq!(*removed.connection(), "a");
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.connection(a).await, None);

        // Removing again is a no-op.
        assert!(registry.deregister(a).await.is_none());
        assert_eq!(registry.info(b).await.unwrap().id, b);
    }

    #[async_std::test]
    async fn test_clones_share_frames() {
        let registry = Registry::new();
        let other = registry.clone();
        let id = registry.register(()).await;
        assert!(other.info(id).await.is_some());
        other.deregister(id).await;
        assert!(registry.is_empty().await);
    }

    #[async_std::test]
    async fn test_set_name() {
        let registry = Registry::new();
        let id = registry.register(()).await;
        assert_eq!(registry.info(id).await.unwrap().name, None);

        registry.set_name(id, "  porch ").await.unwrap();
        assert_eq!(registry.info(id).await.unwrap().name.as_deref(), Some("porch"));
        assert_eq!(registry.find_by_name("porch").await, vec![id]);
        assert!(registry.find_by_name("  porch ").await.is_empty());

        assert_eq!(
            registry.set_name(id, "   ").await,
            Err(RegistryError::InvalidName("".into()))
        );
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert_eq!(
            registry.set_name(id, &long).await,
            Err(RegistryError::InvalidName(long))
        );
        registry
            .set_name(id, &"y".repeat(MAX_NAME_LEN))
            .await
            .unwrap();

        // Failed renames leave the previous name in place.
        assert_eq!(
            registry.info(id).await.unwrap().name,
            Some("y".repeat(MAX_NAME_LEN))
        );

        let unknown = FrameId::random();
        assert_eq!(
            registry.set_name(unknown, "porch").await,
            Err(RegistryError::UnknownFrame(unknown))
        );
    }

    #[async_std::test]
    async fn test_register_named() {
        let registry = Registry::new();
        let id = registry.register_named((), " attic ").await.unwrap();
        assert_eq!(
            registry.info(id).await,
            Some(FrameInfo {
                id,
                name: Some("attic".into()),
            })
        );

        // Invalid names register nothing.
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert_eq!(
            registry.register_named((), &long).await,
            Err(RegistryError::InvalidName(long))
        );
        assert_eq!(
            registry.register_named((), "").await,
            Err(RegistryError::InvalidName("".into()))
        );
        assert_eq!(registry.len().await, 1);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("\tden\n"), Ok("den"));
        // Length is counted in characters, not bytes.
        let wide = "é".repeat(MAX_NAME_LEN);
        assert_eq!(validate_name(&wide), Ok(wide.as_str()));
        assert!(validate_name(&"é".repeat(MAX_NAME_LEN + 1)).is_err());
        assert!(validate_name(" ").is_err());
    }

    #[async_std::test]
    async fn test_list_order() {
        let registry = Registry::new();
        let unnamed1 = registry.register(()).await;
        let unnamed2 = registry.register(()).await;
        let zed = registry.register(()).await;
        let alpha = registry.register(()).await;
        registry.set_name(zed, "zed").await.unwrap();
        registry.set_name(alpha, "alpha").await.unwrap();

        let ids = registry
            .list()
            .await
            .into_iter()
            .map(|info| info.id)
            .collect::<Vec<_>>();
        let mut unnamed = [unnamed1, unnamed2];
        unnamed.sort();
        assert_eq!(ids, [alpha, zed, unnamed[0], unnamed[1]]);
    }
}
