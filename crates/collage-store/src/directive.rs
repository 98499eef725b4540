//! Overlay directives
//!
//! Instructions telling the media store how to draw one stored artifact atop
//! the base canvas. Computed per batch, consumed by a single compose call,
//! never stored.

use crate::artifact::ArtifactId;
use serde::{Deserialize, Serialize};

/// How the overlay is fitted into its tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Stretch to exactly the tile size
    Scale,
}

/// Which corner of the overlay the offset refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    /// Offset is measured from the canvas's top-left to the overlay's top-left
    #[serde(rename = "top-left")]
    TopLeft,
}

/// Placement of one overlay on the base canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayDirective {
    /// Artifact drawn as the overlay
    pub reference_id: ArtifactId,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Fit mode
    pub scale_mode: ScaleMode,
    /// Offset anchor
    pub anchor: Anchor,
    /// Horizontal offset in pixels
    pub x: u32,
    /// Vertical offset in pixels
    pub y: u32,
}

impl OverlayDirective {
    /// Scale-to-tile overlay anchored at the top-left corner
    #[inline]
    #[must_use]
    pub fn scaled(reference_id: ArtifactId, tile: (u32, u32), offset: (u32, u32)) -> Self {
        Self {
            reference_id,
            tile_width: tile.0,
            tile_height: tile.1,
            scale_mode: ScaleMode::Scale,
            anchor: Anchor::TopLeft,
            x: offset.0,
            y: offset.1,
        }
    }

    /// Right edge of the drawn tile
    #[inline]
    #[must_use]
    pub fn right(&self) -> u32 {
        self.x + self.tile_width
    }

    /// Bottom edge of the drawn tile
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.y + self.tile_height
    }
}
