//! Backend de Windows sobre Raw Input.
//!
//! `start` registra el teclado (página de uso `0x01`, uso `0x06`) con
//! `RegisterRawInputDevices` e instala un [`MessageFilter`] en la cadena del
//! anfitrión. El bucle de mensajes del anfitrión hace pasar cada `MSG` por
//! [`FilterChain::dispatch`]:
//!
//! - `WM_INPUT`: se copia el `RAWINPUT` con `GetRawInputData` y se normaliza con
//!   [`normalize_raw_keyboard`]. Windows ya usa la numeración canónica.
//! - `WM_CHAR`: se decodifica la unidad UTF-16 y se entrega como evento de texto.
//!
//! `stop` retira el filtro y el registro (`RIDEV_REMOVE`).

use std::mem::size_of;
use std::ptr;
use std::sync::Arc;

use tracing::{info, warn};
use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::UI::Input::{
    GetRawInputData, HRAWINPUT, RAWINPUTDEVICE, RAWINPUTHEADER, RAWKEYBOARD, RID_INPUT, RIDEV_REMOVE,
    RIM_TYPEKEYBOARD, RegisterRawInputDevices,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{MSG, WM_CHAR, WM_INPUT};

use crate::error::BackendError;
use crate::event::NormalizedEvent;
use crate::sync::Mutex;
use crate::traits::backend::InputBackend;
use crate::traits::sink::EventSink;

use super::raw_input::{RawKeyFlags, RawKeyboard, Utf16Decoder, normalize_raw_keyboard};
use super::{Delivery, DeviceIdTable, FilterChain, FilterId};

const BACKEND: &str = "windows";

const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const HID_USAGE_GENERIC_KEYBOARD: u16 = 0x06;

/// Cadena de filtros del bucle de mensajes del anfitrión.
pub type WindowsHost = Arc<FilterChain<dyn MessageFilter>>;

/// Observador de los mensajes que recibe el bucle del anfitrión.
pub trait MessageFilter: Send + Sync {
    fn message(&self, msg: &MSG);
}

impl FilterChain<dyn MessageFilter> {
    /// Hace pasar un mensaje por todos los filtros instalados.
    pub fn dispatch(&self, msg: &MSG) {
        self.for_each(|filter| filter.message(msg));
    }
}

struct Shared {
    delivery: Delivery,
    devices: Mutex<DeviceIdTable<usize>>,
}

struct RawInputFilter {
    shared: Arc<Shared>,
    buffer: Mutex<Vec<u8>>,
    decoder: Mutex<Utf16Decoder>,
}

impl RawInputFilter {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            buffer: Mutex::new(Vec::new()),
            decoder: Mutex::new(Utf16Decoder::new()),
        }
    }

    /// Copia el paquete de `WM_INPUT`. `None` si no es de teclado o el SO no lo entrega.
    fn read_keyboard(&self, handle: HRAWINPUT) -> Option<(usize, RawKeyboard)> {
        let header_size = size_of::<RAWINPUTHEADER>() as u32;
        let mut size = 0u32;
        // SAFETY: con un buffer nulo la llamada solo escribe el tamaño requerido en `size`.
        let status = unsafe { GetRawInputData(handle, RID_INPUT, ptr::null_mut(), &mut size, header_size) };
        if status != 0 || size == 0 {
            return None;
        }

        let mut buffer = self.buffer.lock();
        buffer.resize(size as usize, 0);
        // SAFETY: `buffer` tiene exactamente `size` bytes escribibles.
        let copied = unsafe { GetRawInputData(handle, RID_INPUT, buffer.as_mut_ptr().cast(), &mut size, header_size) };
        if copied != size {
            return None;
        }

        let needed = size_of::<RAWINPUTHEADER>() + size_of::<RAWKEYBOARD>();
        if buffer.len() < needed {
            return None;
        }
        // SAFETY: el buffer contiene al menos una cabecera y un `RAWKEYBOARD`; se leen
        // sin alinear porque `Vec<u8>` no garantiza la alineación de las estructuras.
        let (header, keyboard) = unsafe {
            let header = ptr::read_unaligned(buffer.as_ptr().cast::<RAWINPUTHEADER>());
            let keyboard = ptr::read_unaligned(
                buffer
                    .as_ptr()
                    .add(size_of::<RAWINPUTHEADER>())
                    .cast::<RAWKEYBOARD>(),
            );
            (header, keyboard)
        };
        if header.dwType != RIM_TYPEKEYBOARD {
            return None;
        }

        Some((
            header.hDevice as usize,
            RawKeyboard {
                make_code: keyboard.MakeCode,
                flags: RawKeyFlags(keyboard.Flags),
                vkey: keyboard.VKey,
            },
        ))
    }
}

impl MessageFilter for RawInputFilter {
    fn message(&self, msg: &MSG) {
        match msg.message {
            WM_INPUT => {
                let Some((device, raw)) = self.read_keyboard(msg.lParam as HRAWINPUT) else {
                    return;
                };
                let device_id = self.shared.devices.lock().id_for(device);
                self.shared
                    .delivery
                    .deliver(normalize_raw_keyboard(raw, device_id));
            }
            WM_CHAR => {
                let unit = msg.wParam as u16;
                if let Some(ch) = self.decoder.lock().push(unit) {
                    self.shared.delivery.deliver(NormalizedEvent::text_input(ch));
                }
            }
            _ => {}
        }
    }
}

fn register_keyboard(flags: u32) -> Result<(), BackendError> {
    let device = RAWINPUTDEVICE {
        usUsagePage: HID_USAGE_PAGE_GENERIC,
        usUsage: HID_USAGE_GENERIC_KEYBOARD,
        dwFlags: flags,
        hwndTarget: ptr::null_mut(),
    };
    // SAFETY: `device` vive durante toda la llamada y el tamaño declarado es el suyo.
    let ok = unsafe { RegisterRawInputDevices(&device, 1, size_of::<RAWINPUTDEVICE>() as u32) };
    if ok == 0 {
        // SAFETY: sin precondiciones.
        let code = unsafe { GetLastError() };
        return Err(BackendError::Registration {
            backend: BACKEND,
            message: format!("RegisterRawInputDevices failed (error {code})"),
        });
    }
    Ok(())
}

struct Installed {
    host: WindowsHost,
    filter: FilterId,
}

/// Backend de captura para Windows. Ver la documentación del módulo.
pub struct WindowsInputBackend {
    shared: Arc<Shared>,
    installed: Option<Installed>,
}

impl WindowsInputBackend {
    pub fn new() -> Self {
        Self {
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

impl Default for WindowsInputBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBackend for WindowsInputBackend {
    type Host = WindowsHost;

    fn start(&mut self, host: Option<WindowsHost>) -> Result<(), BackendError> {
        self.stop();
        let Some(host) = host else {
            warn!("{BACKEND} backend: start without a message source");
            return Err(BackendError::MissingHost { backend: BACKEND });
        };
        register_keyboard(0).inspect_err(|error| warn!("{error}"))?;

        let filter = host.install(Arc::new(RawInputFilter::new(Arc::clone(&self.shared))));
        self.installed = Some(Installed { host, filter });
        info!("{BACKEND} backend started (raw input keyboard registered)");
        Ok(())
    }

    fn stop(&mut self) {
        let Some(installed) = self.installed.take() else {
            return;
        };
        installed.host.remove(installed.filter);
        if let Err(error) = register_keyboard(RIDEV_REMOVE) {
            warn!("{error}");
        }
        info!("{BACKEND} backend stopped");
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
        "windows (raw input)"
    }
}

impl Drop for WindowsInputBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::sink::sink_fn;
    use std::sync::mpsc;

    fn message(message: u32, w_param: usize) -> MSG {
        // SAFETY: `MSG` es una estructura C plana; todo ceros es un valor válido.
        let mut msg: MSG = unsafe { std::mem::zeroed() };
        msg.message = message;
        msg.wParam = w_param;
        msg
    }

    #[test]
    fn wm_char_becomes_text_event() {
        let backend = WindowsInputBackend::new();
        let (tx, rx) = mpsc::channel();
        backend
            .shared
            .delivery
            .set_sink(Some(Box::new(sink_fn(move |event| {
                let _ = tx.send(event);
            }))));

        let host: WindowsHost = Arc::new(FilterChain::new());
        host.install(Arc::new(RawInputFilter::new(Arc::clone(&backend.shared))));
        host.dispatch(&message(WM_CHAR, usize::from(b'\r')));
        host.dispatch(&message(WM_CHAR, usize::from(b'q')));

        let texts: Vec<Option<char>> = rx.try_iter().map(|event| event.text).collect();
        assert_eq!(texts, vec![Some('\n'), Some('q')]);
        assert_eq!(backend.events_delivered(), 2);
    }

    #[test]
    fn start_without_host_fails() {
        let mut backend = WindowsInputBackend::new();
        let error = backend.start(None).unwrap_err();
        assert_eq!(error.to_string(), "windows backend: event source is null");
        assert!(!backend.is_running());
    }
}
