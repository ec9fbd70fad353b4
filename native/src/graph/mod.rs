pub mod builder;
pub mod components;
pub mod params;

pub use builder::ComponentGraphBuilder;
pub use components::{connect_command, ComponentKind, CreateCommand, PlotKind, Role};
