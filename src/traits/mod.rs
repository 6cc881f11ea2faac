//! Traits del pipeline: destino de eventos, backend, traducción de teclas y estado.

pub mod backend;
pub mod keys;
pub mod sink;
pub mod state;

pub use backend::InputBackend;
pub use keys::{KeyNames, KeyStateExt};
pub use sink::{EventSink, FnSink, sink_fn};
pub use state::{InputEvent, InputStateExt};
