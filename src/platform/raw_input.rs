//! Normalización de paquetes de teclado de Raw Input (`WM_INPUT`) y de caracteres
//! `WM_CHAR`.
//!
//! Solo depende de valores ya copiados del mensaje, así que compila y se prueba en
//! cualquier target; el backend de Windows se limita a extraerlos del SO.

use crate::event::{DeviceType, EventKind, NormalizedEvent, now_timestamp_ns};
use crate::traits::keys::KeyStateExt;

pub const RI_KEY_BREAK: u16 = 0x0001;
pub const RI_KEY_E0: u16 = 0x0002;
pub const RI_KEY_E1: u16 = 0x0004;

/// Campo `Flags` de `RAWKEYBOARD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawKeyFlags(pub u16);

impl RawKeyFlags {
    pub fn is_break(self) -> bool {
        self.0 & RI_KEY_BREAK != 0
    }

    /// Prefijo `E0` o `E1`: la tecla pertenece al conjunto extendido.
    pub fn is_extended(self) -> bool {
        self.0 & (RI_KEY_E0 | RI_KEY_E1) != 0
    }
}

impl KeyStateExt<RawKeyFlags, EventKind> for RawKeyFlags {
    fn from_external_state(state: RawKeyFlags) -> EventKind {
        if state.is_break() {
            EventKind::KeyUp
        } else {
            EventKind::KeyDown
        }
    }
}

/// Campos de `RAWKEYBOARD` que intervienen en la normalización.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawKeyboard {
    pub make_code: u16,
    pub flags: RawKeyFlags,
    pub vkey: u16,
}

/// Traduce un paquete de teclado. Windows ya reporta la numeración canónica, por lo
/// que no interviene ningún keymap.
///
/// Raw Input no distingue la repetición automática: toda pulsación lleva
/// `repeat_count = 1`.
pub fn normalize_raw_keyboard(raw: RawKeyboard, device_id: u32) -> NormalizedEvent {
    let kind = RawKeyFlags::from_external_state(raw.flags);
    NormalizedEvent {
        timestamp_ns: now_timestamp_ns(),
        device_id,
        device: DeviceType::Keyboard,
        kind,
        virtual_key: u32::from(raw.vkey),
        scan_code: u32::from(raw.make_code),
        repeat_count: u16::from(kind == EventKind::KeyDown),
        is_extended: raw.flags.is_extended(),
        ..NormalizedEvent::default()
    }
}

const HIGH_SURROGATES: std::ops::RangeInclusive<u16> = 0xD800..=0xDBFF;
const LOW_SURROGATES: std::ops::RangeInclusive<u16> = 0xDC00..=0xDFFF;

/// Decodifica las unidades UTF-16 que llegan, una por mensaje, en `WM_CHAR`.
///
/// Un par sustituto llega en dos mensajes: la primera mitad se retiene hasta
/// recibir la segunda. Las mitades huérfanas se descartan. El retorno de carro se
/// normaliza a `'\n'`.
#[derive(Debug, Clone, Default)]
pub struct Utf16Decoder {
    pending_high: Option<u16>,
}

impl Utf16Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: u16) -> Option<char> {
        if HIGH_SURROGATES.contains(&unit) {
            self.pending_high = Some(unit);
            return None;
        }
        if LOW_SURROGATES.contains(&unit) {
            let high = self.pending_high.take()?;
            return char::decode_utf16([high, unit]).next()?.ok();
        }
        self.pending_high = None;
        let ch = char::from_u32(u32::from(unit))?;
        Some(if ch == '\r' { '\n' } else { ch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_flag_maps_to_key_up() {
        assert_eq!(RawKeyFlags::from_external_state(RawKeyFlags(0)), EventKind::KeyDown);
        assert_eq!(
            RawKeyFlags::from_external_state(RawKeyFlags(RI_KEY_BREAK | RI_KEY_E0)),
            EventKind::KeyUp
        );
    }

    #[test]
    fn key_down_reports_repeat_one() {
        let event = normalize_raw_keyboard(
            RawKeyboard {
                make_code: 0x1E,
                flags: RawKeyFlags(0),
                vkey: 0x41,
            },
            3,
        );
        assert_eq!(event.kind, EventKind::KeyDown);
        assert_eq!(event.device, DeviceType::Keyboard);
        assert_eq!(event.device_id, 3);
        assert_eq!(event.virtual_key, 0x41);
        assert_eq!(event.scan_code, 0x1E);
        assert_eq!(event.repeat_count, 1);
        assert!(!event.is_extended);
        assert!(!event.is_text_event);
        assert_eq!(event.text, None);
    }

    #[test]
    fn key_up_is_extended_with_either_prefix() {
        for prefix in [RI_KEY_E0, RI_KEY_E1] {
            let event = normalize_raw_keyboard(
                RawKeyboard {
                    make_code: 0x1D,
                    flags: RawKeyFlags(RI_KEY_BREAK | prefix),
                    vkey: 0x11,
                },
                1,
            );
            assert_eq!(event.kind, EventKind::KeyUp);
            assert_eq!(event.repeat_count, 0);
            assert!(event.is_extended);
            assert_eq!(event.combined_scan_code(), 0x1D + 256);
        }
    }

    #[test]
    fn decoder_normalizes_carriage_return() {
        let mut decoder = Utf16Decoder::new();
        assert_eq!(decoder.push(u16::from(b'\r')), Some('\n'));
        assert_eq!(decoder.push(u16::from(b'a')), Some('a'));
        assert_eq!(decoder.push(0x00E9), Some('é'));
    }

    #[test]
    fn decoder_joins_surrogate_pairs() {
        let mut decoder = Utf16Decoder::new();
        let mut units = [0u16; 2];
        '😀'.encode_utf16(&mut units);
        assert_eq!(decoder.push(units[0]), None);
        assert_eq!(decoder.push(units[1]), Some('😀'));
    }

    #[test]
    fn decoder_drops_orphan_halves() {
        let mut decoder = Utf16Decoder::new();
        assert_eq!(decoder.push(0xDC00), None);
        assert_eq!(decoder.push(0xD800), None);
        assert_eq!(decoder.push(u16::from(b'x')), Some('x'));
        assert_eq!(decoder.push(0xDC00), None);
    }
}
