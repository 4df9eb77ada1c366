//! Irrigation Panel - terminal front-end for the irrigation controller
//!
//! Wires a [`serial_session::SerialSession`] to the
//! [`irrigation_protocol`] router and keeps a presentation model
//! ([`PanelState`]) plus a bounded log that a front-end draws.

pub mod config;
pub mod input;
pub mod panel;
pub mod render;
pub mod state;

pub use config::{FileConfig, PanelFileConfig, PanelOptions};
pub use input::{InputError, UserAction, parse_input};
pub use panel::Panel;
pub use render::Renderer;
pub use state::{ConfigFields, PanelState, SensorCard};
