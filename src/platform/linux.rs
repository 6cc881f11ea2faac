//! Backend de Linux basado en un filtro de eventos del anfitrión.
//!
//! El toolkit del anfitrión (X11/Wayland a través de su bucle de eventos) entrega
//! pulsaciones con su propia numeración: identificador de tecla del toolkit, flag de
//! keypad y el keycode nativo (`evdev + 8` en X11). El backend instala un
//! [`NativeEventFilter`] en la [`FilterChain`] del anfitrión y traduce cada
//! pulsación con el [`Keymap`] a la numeración canónica.
//!
//! El anfitrión llama a [`FilterChain::dispatch`] desde su hilo de eventos, que pasa a
//! ser el hilo productor de la cola.
//!
//! ```rust
//! use std::sync::Arc;
//! use orbit_input_capture::platform::FilterChain;
//! use orbit_input_capture::platform::linux::{
//!     KeyTransition, LinuxHost, LinuxInputBackend, NativeEvent, NativeKeyEvent,
//! };
//! use orbit_input_capture::{InputBackend, KeymapSource, event_queue};
//!
//! let host: LinuxHost = Arc::new(FilterChain::new());
//! let (producer, mut consumer) = event_queue();
//!
//! let mut backend = LinuxInputBackend::new(KeymapSource::Bundled);
//! backend.set_sink(Some(Box::new(producer)));
//! backend.start(Some(Arc::clone(&host))).unwrap();
//!
//! host.dispatch(&NativeEvent::Key(NativeKeyEvent {
//!     transition: KeyTransition::Press,
//!     key: 0x41,
//!     native_scan_code: 38,
//!     text: "a",
//!     ..NativeKeyEvent::default()
//! }));
//!
//! let event = consumer.try_pop().unwrap();
//! assert_eq!((event.virtual_key, event.scan_code, event.text), (0x41, 0x1E, Some('a')));
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::BackendError;
use crate::event::{DeviceType, EventKind, NormalizedEvent, now_timestamp_ns};
use crate::keymap::names::{KEY_BACKSPACE, KEY_ENTER, KEY_RETURN};
use crate::keymap::{Keymap, KeymapSource};
use crate::sync::Mutex;
use crate::traits::backend::InputBackend;
use crate::traits::keys::KeyStateExt;
use crate::traits::sink::EventSink;

use super::{Delivery, DeviceIdTable, FilterChain, FilterId};

const BACKEND: &str = "linux";

/// Fuente de eventos del anfitrión sobre la que se instala el filtro.
pub type LinuxHost = Arc<FilterChain<dyn NativeEventFilter>>;

/// Transición reportada por el toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyTransition {
    #[default]
    Press,
    Release,
}

impl KeyStateExt<KeyTransition, EventKind> for KeyTransition {
    fn from_external_state(state: KeyTransition) -> EventKind {
        match state {
            KeyTransition::Press => EventKind::KeyDown,
            KeyTransition::Release => EventKind::KeyUp,
        }
    }
}

/// Pulsación tal como la entrega el toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeKeyEvent<'a> {
    pub transition: KeyTransition,
    /// Identificador de tecla del toolkit (ver [`keymap::names`](crate::keymap::names)).
    pub key: u32,
    /// La pulsación viene del teclado numérico.
    pub keypad: bool,
    /// Keycode crudo de la plataforma, antes de restar el offset del keymap.
    pub native_scan_code: u32,
    pub auto_repeat: bool,
    /// Texto que el toolkit asoció a la tecla (puede estar vacío).
    pub text: &'a str,
    /// Handle del dispositivo físico, si el toolkit lo conoce.
    pub device: Option<u64>,
}

/// Notificación nativa que el anfitrión hace pasar por sus filtros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent<'a> {
    Key(NativeKeyEvent<'a>),
    /// Texto confirmado por el método de entrada, sin tecla física asociada.
    Commit(&'a str),
}

/// Observador de las notificaciones nativas del anfitrión.
pub trait NativeEventFilter: Send + Sync {
    fn native_event(&self, event: &NativeEvent<'_>);
}

impl FilterChain<dyn NativeEventFilter> {
    /// Hace pasar una notificación por todos los filtros instalados.
    pub fn dispatch(&self, event: &NativeEvent<'_>) {
        self.for_each(|filter| filter.native_event(event));
    }
}

/// Traduce una pulsación del toolkit con `keymap`.
///
/// Solo las pulsaciones (`KeyDown`) llevan texto: retroceso y Enter se normalizan a
/// `'\b'` y `'\n'`; el resto toma el primer code point del texto del toolkit.
pub fn normalize_key_event(keymap: &Keymap, event: &NativeKeyEvent<'_>, device_id: u32) -> NormalizedEvent {
    let kind = KeyTransition::from_external_state(event.transition);
    let translated = keymap.translate_scan_code(event.native_scan_code);
    let text = match (kind, event.key) {
        (EventKind::KeyDown, KEY_BACKSPACE) => Some('\u{8}'),
        (EventKind::KeyDown, KEY_RETURN | KEY_ENTER) => Some('\n'),
        (EventKind::KeyDown, _) => event.text.chars().next(),
        _ => None,
    };
    NormalizedEvent {
        timestamp_ns: now_timestamp_ns(),
        device_id,
        device: DeviceType::Keyboard,
        kind,
        virtual_key: keymap.lookup_virtual_key(event.key, event.keypad),
        scan_code: translated.scan_code,
        repeat_count: u16::from(event.auto_repeat),
        is_extended: translated.is_extended,
        is_text_event: false,
        text,
    }
}

struct Shared {
    delivery: Delivery,
    devices: Mutex<DeviceIdTable<u64>>,
}

struct KeymapFilter {
    keymap: Arc<Keymap>,
    shared: Arc<Shared>,
}

impl NativeEventFilter for KeymapFilter {
    fn native_event(&self, event: &NativeEvent<'_>) {
        match event {
            NativeEvent::Key(key) => {
                let device_id = key
                    .device
                    .map_or(0, |handle| self.shared.devices.lock().id_for(handle));
                let normalized = normalize_key_event(&self.keymap, key, device_id);
                self.shared.delivery.deliver(normalized);
            }
            NativeEvent::Commit(text) => {
                for ch in text.chars() {
                    self.shared.delivery.deliver(NormalizedEvent::text_input(ch));
                }
            }
        }
    }
}

struct Installed {
    host: LinuxHost,
    filter: FilterId,
}

/// Backend de captura para Linux. Ver la documentación del módulo.
pub struct LinuxInputBackend {
    keymap: KeymapSource,
    shared: Arc<Shared>,
    installed: Option<Installed>,
}

impl LinuxInputBackend {
    /// El keymap se resuelve en cada `start`; con [`KeymapSource::Table`] todas las
    /// instancias comparten la misma tabla.
    pub fn new(keymap: KeymapSource) -> Self {
        Self {
            keymap,
            shared: Arc::new(Shared {
                delivery: Delivery::new(),
                devices: Mutex::new(DeviceIdTable::new()),
            }),
            installed: None,
        }
    }

    /// Dispositivos distintos vistos desde la creación del backend.
    pub fn devices_seen(&self) -> usize {
        self.shared.devices.lock().len()
    }
}

impl Default for LinuxInputBackend {
    fn default() -> Self {
        Self::new(KeymapSource::Bundled)
    }
}

impl InputBackend for LinuxInputBackend {
    type Host = LinuxHost;

    fn start(&mut self, host: Option<LinuxHost>) -> Result<(), BackendError> {
        self.stop();
        let Some(host) = host else {
            warn!("{BACKEND} backend: start without an event source");
            return Err(BackendError::MissingHost { backend: BACKEND });
        };
        let keymap = self.keymap.resolve().map_err(|error| {
            warn!("{BACKEND} backend: keymap rejected:\n{error}");
            BackendError::from(error)
        })?;

        info!(
            "{BACKEND} backend started ({} keys, {} scan codes, offset {})",
            keymap.virtual_key_count(),
            keymap.scan_code_count(),
            keymap.native_scan_code_offset()
        );
        let filter = host.install(Arc::new(KeymapFilter {
            keymap,
            shared: Arc::clone(&self.shared),
        }));
        self.installed = Some(Installed { host, filter });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(installed) = self.installed.take() {
            installed.host.remove(installed.filter);
            info!("{BACKEND} backend stopped");
        }
    }

    fn set_sink(&mut self, sink: Option<Box<dyn EventSink>>) {
        self.shared.delivery.set_sink(sink);
    }

    fn is_running(&self) -> bool {
        self.installed.is_some()
    }

    fn events_delivered(&self) -> u64 {
        self.shared.delivery.delivered()
    }

    fn backend_name(&self) -> &'static str {
        "linux (event filter)"
    }
}

impl Drop for LinuxInputBackend {
    fn drop(&mut self) {
        self.stop();
    }
}
