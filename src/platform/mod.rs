//! Backends de plataforma y piezas compartidas entre ellos.
//!
//! - [`DeviceIdTable`]: ids pequeños y estables por handle de dispositivo del SO.
//! - [`FilterChain`]: lista de filtros que el anfitrión recorre por cada notificación
//!   nativa. Es el "hook" que instalan los backends.
//! - [`create_input_backend`]: elige la implementación según el target.
//!
//! | Target    | Backend                                        | `Host`                     |
//! |-----------|------------------------------------------------|----------------------------|
//! | `unix`    | [`LinuxInputBackend`](linux::LinuxInputBackend) (keymap) | [`LinuxHost`](linux::LinuxHost) |
//! | `windows` | `WindowsInputBackend` (Raw Input)              | `WindowsHost`              |
//! | otros     | [`UnsupportedBackend`]                         | `()`                       |

pub mod raw_input;

#[cfg(unix)]
pub mod linux;

#[cfg(windows)]
pub mod windows;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::BackendError;
use crate::event::NormalizedEvent;
use crate::keymap::KeymapSource;
use crate::sync::Mutex;
use crate::traits::backend::InputBackend;
use crate::traits::sink::EventSink;

/// Configuración de un backend creado con [`create_input_backend`].
///
/// ```rust
/// use orbit_input_capture::platform::BackendConfig;
/// use orbit_input_capture::KeymapSource;
///
/// let config: BackendConfig = serde_json::from_str(r#"{ "keymap": { "file": "/etc/keymap.json" } }"#).unwrap();
/// assert!(matches!(config.keymap, KeymapSource::File(_)));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Tabla usada por los backends que traducen códigos (Linux). Windows la ignora
    /// porque el SO ya reporta la numeración canónica.
    pub keymap: KeymapSource,
}

/// Asigna a cada handle de dispositivo un id secuencial a partir de `1`.
///
/// Un handle ya visto conserva su id durante toda la vida de la tabla; un handle
/// nuevo recibe siempre un id mayor que todos los anteriores.
#[derive(Debug, Clone)]
pub struct DeviceIdTable<H> {
    ids: HashMap<H, u32>,
    next_id: u32,
}

impl<H: Eq + Hash> DeviceIdTable<H> {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn id_for(&mut self, handle: H) -> u32 {
        if let Some(&id) = self.ids.get(&handle) {
            return id;
        }
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.ids.insert(handle, id);
        debug!("input device #{id} seen for the first time");
        id
    }

    pub fn get(&self, handle: &H) -> Option<u32> {
        self.ids.get(handle).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<H: Eq + Hash> Default for DeviceIdTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Identificador de un filtro instalado en una [`FilterChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u64);

/// Lista de filtros que el anfitrión recorre con cada notificación nativa.
///
/// El recorrido ([`for_each`](Self::for_each)) mantiene el lock de la lista, así que
/// [`remove`](Self::remove) no retorna mientras haya una notificación en curso: al
/// volver, el filtro retirado no vuelve a ejecutarse. Por lo mismo, un filtro no debe
/// instalar ni retirar filtros desde su propio callback.
pub struct FilterChain<F: ?Sized> {
    filters: Mutex<Vec<(FilterId, Arc<F>)>>,
    next_id: AtomicU64,
}

impl<F: ?Sized> FilterChain<F> {
    pub fn new() -> Self {
        Self {
            filters: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn install(&self, filter: Arc<F>) -> FilterId {
        let id = FilterId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.filters.lock().push((id, filter));
        id
    }

    /// Retira un filtro. `false` si no estaba instalado.
    pub fn remove(&self, id: FilterId) -> bool {
        let mut filters = self.filters.lock();
        let before = filters.len();
        filters.retain(|(installed, _)| *installed != id);
        filters.len() != before
    }

    pub fn len(&self) -> usize {
        self.filters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.lock().is_empty()
    }

    /// Visita los filtros en orden de instalación.
    pub fn for_each(&self, mut visit: impl FnMut(&F)) {
        let filters = self.filters.lock();
        for (_, filter) in filters.iter() {
            visit(filter);
        }
    }
}

impl<F: ?Sized> Default for FilterChain<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for FilterChain<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.len())
            .finish()
    }
}

/// Destino compartido entre un backend y su filtro: el sink actual y el contador
/// de eventos entregados.
pub(crate) struct Delivery {
    sink: Mutex<Option<Box<dyn EventSink>>>,
    delivered: AtomicU64,
}

impl Delivery {
    pub(crate) fn new() -> Self {
        Self {
            sink: Mutex::new(None),
            delivered: AtomicU64::new(0),
        }
    }

    pub(crate) fn set_sink(&self, sink: Option<Box<dyn EventSink>>) {
        *self.sink.lock() = sink;
    }

    /// Entrega el evento si hay sink; sin sink se descarta.
    pub(crate) fn deliver(&self, event: NormalizedEvent) -> bool {
        let mut sink = self.sink.lock();
        let Some(sink) = sink.as_mut() else {
            return false;
        };
        trace!("{event}");
        sink.on_input_event(event);
        self.delivered.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub(crate) fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

/// Backend de los targets sin captura nativa: `start` siempre falla.
#[derive(Debug, Default)]
pub struct UnsupportedBackend;

impl InputBackend for UnsupportedBackend {
    type Host = ();

    fn start(&mut self, _host: Option<()>) -> Result<(), BackendError> {
        Err(BackendError::Unsupported)
    }

    fn stop(&mut self) {}

    fn set_sink(&mut self, _sink: Option<Box<dyn EventSink>>) {}

    fn is_running(&self) -> bool {
        false
    }

    fn events_delivered(&self) -> u64 {
        0
    }

    fn backend_name(&self) -> &'static str {
        "unsupported"
    }
}

#[cfg(unix)]
pub type PlatformHost = linux::LinuxHost;

#[cfg(windows)]
pub type PlatformHost = windows::WindowsHost;

#[cfg(not(any(unix, windows)))]
pub type PlatformHost = ();

/// Crea el backend nativo del target actual.
#[cfg(unix)]
pub fn create_input_backend(config: BackendConfig) -> Box<dyn InputBackend<Host = PlatformHost>> {
    Box::new(linux::LinuxInputBackend::new(config.keymap))
}

/// Crea el backend nativo del target actual.
#[cfg(windows)]
pub fn create_input_backend(config: BackendConfig) -> Box<dyn InputBackend<Host = PlatformHost>> {
    let _ = config;
    Box::new(windows::WindowsInputBackend::new())
}

/// Crea el backend nativo del target actual.
#[cfg(not(any(unix, windows)))]
pub fn create_input_backend(config: BackendConfig) -> Box<dyn InputBackend<Host = PlatformHost>> {
    let _ = config;
    Box::new(UnsupportedBackend)
}
