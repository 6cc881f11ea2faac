//! Modelo de evento normalizado.
//!
//! Un [`NormalizedEvent`] describe **una transición de hardware observada** (o un
//! carácter ya decodificado) con independencia de la plataforma que la produjo.
//! Es un valor plano, `Copy` y sin memoria dinámica, de modo que puede escribirse
//! directamente sobre los slots del [`RingBuffer`](crate::ring::RingBuffer).
//!
//! # Numeración canónica
//! - `virtual_key` usa la numeración de *virtual keys* de Windows (`0x41` = `A`).
//! - `scan_code` usa la numeración de scan codes del set 1 de Windows.
//! - Un valor `0` significa "sin identidad física" (tecla no mapeada).

use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

use crate::traits::state::InputEvent;

/// Desplazamiento que se suma a un scan code extendido para derivar una identidad
/// única (`0x1D` = Ctrl izquierdo, `0x1D + 256` = Ctrl derecho).
pub const EXTENDED_SCAN_OFFSET: u32 = 256;

/// Tipo de dispositivo que originó el evento.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceType {
    #[default]
    Unknown = 0,
    Keyboard,
    Mouse,
}

/// Tipo de transición.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventKind {
    #[default]
    Unknown = 0,
    KeyDown,
    KeyUp,
}

/// Una ocurrencia de input ya normalizada.
///
/// Se crea dentro del callback del backend, se copia una única vez en la cola y
/// el consumidor la descarta tras leerla. No hay aliasing ni propiedad compartida.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NormalizedEvent {
    /// Instante monotónico (ns) capturado al normalizar, nunca al consumir.
    pub timestamp_ns: u64,
    /// Identificador pequeño y estable del dispositivo físico (`0` = desconocido).
    pub device_id: u32,
    pub device: DeviceType,
    pub kind: EventKind,
    /// Virtual key canónica, `0` si no hay mapeo.
    pub virtual_key: u32,
    /// Scan code canónico, `0` si no hay mapeo.
    pub scan_code: u32,
    /// `0` o `1`: el conteo exacto de repeticiones no está disponible en todas las plataformas.
    pub repeat_count: u16,
    pub is_extended: bool,
    /// `true` si el evento transporta texto decodificado en lugar de una transición física.
    pub is_text_event: bool,
    /// Code point decodificado, válido para eventos de texto o `KeyDown` imprimibles.
    pub text: Option<char>,
}

impl NormalizedEvent {
    /// Crea un evento de texto (composición / `WM_CHAR`) sin identidad de tecla.
    pub fn text_input(ch: char) -> Self {
        Self {
            timestamp_ns: now_timestamp_ns(),
            device: DeviceType::Keyboard,
            kind: EventKind::KeyDown,
            is_text_event: true,
            text: Some(ch),
            ..Self::default()
        }
    }

    /// `true` si el evento identifica una tecla física (virtual key o scan code distinto de `0`).
    pub fn has_key_identity(&self) -> bool {
        self.virtual_key != 0 || self.scan_code != 0
    }

    /// Los eventos sin identidad física y sin texto deben ignorarse.
    pub fn is_meaningful(&self) -> bool {
        self.has_key_identity() || self.text.is_some()
    }

    /// Scan code combinado: suma [`EXTENDED_SCAN_OFFSET`] si la tecla es extendida.
    pub fn combined_scan_code(&self) -> u32 {
        combined_scan_code(self.scan_code, self.is_extended)
    }

    pub fn identity(&self) -> KeyIdentity {
        KeyIdentity {
            virtual_key: self.virtual_key,
            scan_code: self.combined_scan_code(),
        }
    }
}

/// Identidad física de una tecla tal como la ve un consumidor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyIdentity {
    pub virtual_key: u32,
    /// Scan code combinado (ya incluye el desplazamiento de tecla extendida).
    pub scan_code: u32,
}

/// Satura en `u32::MAX` en lugar de desbordar.
pub fn combined_scan_code(scan_code: u32, is_extended: bool) -> u32 {
    if is_extended {
        scan_code.saturating_add(EXTENDED_SCAN_OFFSET)
    } else {
        scan_code
    }
}

impl InputEvent for NormalizedEvent {
    type Key = KeyIdentity;
    type State = EventKind;

    fn key(&self) -> Self::Key {
        self.identity()
    }

    fn state(&self) -> Self::State {
        self.kind
    }

    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }
}

/// Línea de diagnóstico, p. ej. `state=down dev=1 vKey=65 scan=30 repeat=0 ext=0`.
impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_text_event {
            return match self.text {
                Some(ch) => write!(f, "text={:?}", ch),
                None => f.write_str("text=none"),
            };
        }
        let state = match self.kind {
            EventKind::KeyDown => "down",
            EventKind::KeyUp => "up",
            EventKind::Unknown => "none",
        };
        write!(
            f,
            "state={} dev={} vKey={} scan={} repeat={} ext={}",
            state,
            self.device_id,
            self.virtual_key,
            self.scan_code,
            self.repeat_count,
            u8::from(self.is_extended)
        )
    }
}

static CLOCK_EPOCH: OnceLock<Instant> = OnceLock::new();

/// Reloj monotónico en nanosegundos, relativo al primer uso dentro del proceso.
///
/// Nunca decrece entre llamadas sucesivas, lo que garantiza timestamps no
/// decrecientes para los eventos de un mismo backend.
pub fn now_timestamp_ns() -> u64 {
    let epoch = CLOCK_EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_event_is_unmapped() {
        let event = NormalizedEvent::default();
        assert_eq!(event.kind, EventKind::Unknown);
        assert_eq!(event.device, DeviceType::Unknown);
        assert!(!event.has_key_identity());
        assert!(!event.is_meaningful());
    }

    #[test]
    fn extended_scan_codes_get_distinct_identity() {
        let left_ctrl = NormalizedEvent {
            scan_code: 0x1D,
            ..NormalizedEvent::default()
        };
        let right_ctrl = NormalizedEvent {
            scan_code: 0x1D,
            is_extended: true,
            ..NormalizedEvent::default()
        };
        assert_eq!(left_ctrl.combined_scan_code(), 0x1D);
        assert_eq!(right_ctrl.combined_scan_code(), 0x1D + 256);
        assert_ne!(left_ctrl.identity(), right_ctrl.identity());
    }

    #[test]
    fn combined_scan_code_saturates() {
        assert_eq!(combined_scan_code(u32::MAX, true), u32::MAX);
        assert_eq!(combined_scan_code(u32::MAX - 10, true), u32::MAX);
        assert_eq!(combined_scan_code(u32::MAX, false), u32::MAX);

        let event = NormalizedEvent {
            scan_code: u32::MAX,
            is_extended: true,
            ..NormalizedEvent::default()
        };
        assert_eq!(event.identity().scan_code, u32::MAX);
    }

    #[test]
    fn text_events_carry_no_key_identity() {
        let event = NormalizedEvent::text_input('é');
        assert!(event.is_text_event);
        assert!(!event.has_key_identity());
        assert!(event.is_meaningful());
        assert_eq!(event.to_string(), "text='é'");
    }

    #[test]
    fn display_matches_info_line() {
        let event = NormalizedEvent {
            device_id: 1,
            kind: EventKind::KeyDown,
            virtual_key: 65,
            scan_code: 30,
            ..NormalizedEvent::default()
        };
        assert_eq!(
            event.to_string(),
            "state=down dev=1 vKey=65 scan=30 repeat=0 ext=0"
        );
    }

    #[test]
    fn clock_is_monotonic() {
        let first = now_timestamp_ns();
        let second = now_timestamp_ns();
        assert!(second >= first);
    }

    #[test]
    fn event_is_plain_copy_data() {
        fn assert_copy<T: Copy + Send + 'static>() {}
        assert_copy::<NormalizedEvent>();
        assert!(!std::mem::needs_drop::<NormalizedEvent>());
    }
}
