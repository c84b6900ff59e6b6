#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod derive;
pub mod graph;
pub mod host;
pub mod interaction;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod normalize;
pub mod render;
pub mod stages;
pub mod text_metrics;
pub mod theme;
pub mod vis;

#[cfg(feature = "cli")]
pub use cli::run;
pub use host::{HostBridge, MessageChannel, MessageSink, VisMessage};
pub use interaction::{ConfigPatch, Gesture, VisConfig};
pub use vis::{RenderRequest, SankeyVis, Surface};
