//! # Crate `orbit_input_capture`
//!
//! **Captura de teclado de bajo nivel** para herramientas de diagnóstico y para el
//! ecosistema de Orbit Engine: lee el input crudo del SO, lo normaliza a una
//! representación independiente de la plataforma y lo transporta al hilo consumidor
//! sin bloquear a ninguno de los dos lados.
//!
//! ---
//!
//! ## Flujo de datos
//!
//! ```text
//! SO → InputBackend → Keymap (traducción) → NormalizedEvent
//!    → EventProducer (try_push, hilo del SO)
//!    → EventConsumer (try_pop, hilo consumidor, a su propio ritmo)
//! ```
//!
//! - El **productor nunca espera**: con la cola llena el evento se descarta y se cuenta.
//! - El **consumidor nunca espera**: `try_pop` devuelve `None` si no hay nada listo.
//! - El **keymap** se construye una vez y se comparte por `Arc` sin sincronización.
//!
//! ---
//!
//! ## Ejemplo
//!
//! ```rust,ignore
//! use orbit_input_capture::platform::{BackendConfig, create_input_backend};
//! use orbit_input_capture::tracker::KeyTracker;
//! use orbit_input_capture::event_queue;
//!
//! let (producer, mut consumer) = event_queue();
//! let mut backend = create_input_backend(BackendConfig::default());
//! backend.set_sink(Some(Box::new(producer)));
//! backend.start(Some(host))?;
//!
//! let mut tracker = KeyTracker::new();
//! // cada 16 ms:
//! consumer.drain(|event| tracker.handle_event(&event));
//! println!("{}", tracker.stats_line());
//! ```
//!
//! ---
//!
//! ## Contenido del crate
//!
//! ### Modelo y transporte
//! - [`NormalizedEvent`]: una transición de tecla (o un carácter) ya normalizada.
//! - [`ring::RingBuffer`]: buffer circular SPSC de capacidad fija, sin locks.
//! - [`event_queue`]: extremos [`EventProducer`] / [`EventConsumer`] listos para moverse a hilos.
//!
//! ### Traducción
//! - [`Keymap`]: `(tecla, keypad) → virtual key` y `scan code → (scan code, extendido)`.
//! - [`KeymapSource`]: de dónde sale la tabla (incluida, JSON, fichero, ya construida).
//!
//! ### Traits
//! - [`EventSink`]: destino de eventos que usan los backends.
//! - [`InputBackend`]: ciclo de vida `start`/`stop`/`set_sink` de un backend nativo.
//! - [`KeyStateExt<I, O>`]: transición nativa → [`EventKind`].
//! - [`KeyNames`]: nombres simbólicos de tecla (`"Key_A"`).
//! - [`InputEvent`] / [`InputStateExt<K>`]: vista del consumidor.
//!
//! ### Plataformas
//! - [`platform::create_input_backend`]: backend del target actual.
//! - [`tracker::KeyTracker`]: estado de teclas, NKRO, frecuencia y texto tecleado.
//!
//! ---
//!
//! ## Features
//!
//! - `std_lock` (por defecto): `std::sync::Mutex` para el estado compartido de los backends.
//! - `parking_lot`: usa `parking_lot::Mutex` en su lugar. Si ambos están activos,
//!   gana `parking_lot`.
//!
//! La cola de eventos no usa locks con ninguno de los dos.
//!
//! ## Logging
//!
//! El crate emite eventos de [`tracing`]; instalar un subscriber es cosa de la
//! aplicación.

pub mod error;
pub mod event;
pub mod keymap;
pub mod platform;
pub mod queue;
pub mod ring;
pub mod tracker;
pub mod traits;

mod sync;

pub use error::{BackendError, KeymapError, KeymapIssue};
pub use event::{DeviceType, EventKind, KeyIdentity, NormalizedEvent, now_timestamp_ns};
pub use keymap::{Keymap, KeymapBuilder, KeymapSource, ScanTranslation};
pub use queue::{DEFAULT_QUEUE_CAPACITY, EventConsumer, EventProducer, bounded_event_queue, event_queue};
pub use traits::*;
