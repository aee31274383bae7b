use std::path::PathBuf;
use tracing::info;

use crate::core::error::HookError;

/// Best-effort side effect fired alongside "on review" and "graded" notices.
pub trait Celebration: Send + Sync {
    fn celebrate(&self) -> Result<(), HookError>;
}

/// Opens an image with the desktop's default viewer.
#[derive(Debug, Clone)]
pub struct ImageCelebration {
    path: PathBuf,
}

impl ImageCelebration {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Celebration for ImageCelebration {
    fn celebrate(&self) -> Result<(), HookError> {
        open::that_detached(&self.path).map_err(|e| HookError::Launch {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        info!("Opened {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCelebration;

impl Celebration for NoCelebration {
    fn celebrate(&self) -> Result<(), HookError> {
        Ok(())
    }
}
