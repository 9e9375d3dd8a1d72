pub mod client;
pub mod credential;

pub use client::{AssetFileEntry, AssetManifest, BricksClient, BricksError, LocalAsset};
