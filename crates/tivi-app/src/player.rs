//! The external player collaborator contract.
//!
//! The core never decodes media; it hands a resolved descriptor to whatever
//! implements `Player`. Player errors are reported to the user and are
//! non-fatal to navigation.

use tracing::info;

use crate::resolver::StreamDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("player rejected source: {0}")]
    Rejected(String),
    #[error("player backend unavailable: {0}")]
    Unavailable(String),
}

pub trait Player: Send {
    fn set_source(&mut self, descriptor: &StreamDescriptor);
    fn prepare(&mut self) -> Result<(), PlayerError>;
    fn play(&mut self) -> Result<(), PlayerError>;
    fn release(&mut self);
}

/// Headless player used by the binary: logs what a real pipeline would do.
#[derive(Default)]
pub struct LogPlayer {
    current: Option<StreamDescriptor>,
}

impl Player for LogPlayer {
    fn set_source(&mut self, descriptor: &StreamDescriptor) {
        info!(
            url = %descriptor.url,
            mime = descriptor.mime_hint.map(|m| m.content_type()).unwrap_or("-"),
            drm = descriptor.drm.is_some(),
            "player source set"
        );
        self.current = Some(descriptor.clone());
    }

    fn prepare(&mut self) -> Result<(), PlayerError> {
        match &self.current {
            Some(_) => Ok(()),
            None => Err(PlayerError::Rejected("no source set".to_string())),
        }
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        match &self.current {
            Some(d) => {
                info!(url = %d.url, "playing");
                Ok(())
            }
            None => Err(PlayerError::Rejected("no source set".to_string())),
        }
    }

    fn release(&mut self) {
        self.current = None;
    }
}
