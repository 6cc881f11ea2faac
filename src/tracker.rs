//! Estado del teclado del lado del consumidor.
//!
//! [`KeyTracker`] se alimenta con los eventos que el hilo consumidor extrae de la
//! cola (por ejemplo cada 16 ms) y mantiene:
//!
//! - el conjunto de teclas pulsadas, identificadas por virtual key o por scan code
//!   combinado según [`KeyIdMode`];
//! - el máximo de teclas mantenidas a la vez (NKRO);
//! - la frecuencia de eventos de teclado sobre los últimos [`RATE_WINDOW`] timestamps;
//! - un buffer de texto tecleado de como mucho [`TEXT_BUFFER_LIMIT`] caracteres;
//! - la última línea de diagnóstico (`state=down dev=1 vKey=65 ...`).
//!
//! ```rust
//! use orbit_input_capture::tracker::KeyTracker;
//! use orbit_input_capture::{EventKind, InputStateExt, NormalizedEvent};
//!
//! let mut tracker = KeyTracker::new();
//! tracker.handle_event(&NormalizedEvent {
//!     device: orbit_input_capture::DeviceType::Keyboard,
//!     kind: EventKind::KeyDown,
//!     virtual_key: 0x41,
//!     text: Some('a'),
//!     ..Default::default()
//! });
//! assert!(tracker.is_pressed(0x41));
//! assert_eq!(tracker.text(), "a");
//! ```

use std::collections::{BTreeSet, VecDeque};

use crate::event::{DeviceType, EventKind, NormalizedEvent, combined_scan_code};
use crate::traits::state::InputStateExt;

/// Caracteres conservados en el buffer de texto; los más antiguos se descartan.
pub const TEXT_BUFFER_LIMIT: usize = 100;

/// Timestamps de teclado usados para calcular la frecuencia.
pub const RATE_WINDOW: usize = 32;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Identidad con la que se registran las teclas pulsadas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyIdMode {
    #[default]
    VirtualKey,
    /// Scan code combinado: las teclas extendidas suman `256`.
    ScanCode,
}

#[derive(Debug, Clone, Default)]
pub struct KeyTracker {
    mode: KeyIdMode,
    pressed: BTreeSet<u32>,
    last_pressed: Option<u32>,
    max_pressed: usize,
    timestamps: VecDeque<u64>,
    text: String,
    info: Option<String>,
}

impl KeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: KeyIdMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> KeyIdMode {
        self.mode
    }

    /// Cambiar de modo olvida las teclas pulsadas, que estaban en la otra numeración.
    pub fn set_mode(&mut self, mode: KeyIdMode) {
        if self.mode != mode {
            self.mode = mode;
            self.reset();
        }
    }

    /// Identidad de `event` en el modo actual (`0` = sin identidad).
    pub fn key_id(&self, event: &NormalizedEvent) -> u32 {
        match self.mode {
            KeyIdMode::VirtualKey => event.virtual_key,
            KeyIdMode::ScanCode => combined_scan_code(event.scan_code, event.is_extended),
        }
    }

    /// Procesa un evento extraído de la cola.
    pub fn handle_event(&mut self, event: &NormalizedEvent) {
        if !event.is_text_event {
            self.info = Some(event.to_string());
        }
        if event.kind == EventKind::KeyDown {
            if let Some(ch) = event.text {
                self.push_text(ch);
            }
        }
        if event.device == DeviceType::Keyboard {
            self.timestamps.push_back(event.timestamp_ns);
            if self.timestamps.len() > RATE_WINDOW {
                self.timestamps.pop_front();
            }
        }
        if event.device == DeviceType::Keyboard && !event.is_text_event {
            let key = self.key_id(event);
            if key != 0 {
                match event.kind {
                    EventKind::KeyDown => self.set_key(key, true),
                    EventKind::KeyUp => self.set_key(key, false),
                    EventKind::Unknown => {}
                }
            }
        }
        self.max_pressed = self.max_pressed.max(self.pressed.len());
    }

    fn push_text(&mut self, ch: char) {
        if ch == '\u{8}' {
            self.text.pop();
            return;
        }
        self.text.push(ch);
        let excess = self.text.chars().count().saturating_sub(TEXT_BUFFER_LIMIT);
        if excess > 0 {
            let cut = self
                .text
                .char_indices()
                .nth(excess)
                .map_or(self.text.len(), |(index, _)| index);
            self.text.drain(..cut);
        }
    }

    /// Número de teclas pulsadas ahora mismo.
    pub fn pressed_count(&self) -> usize {
        self.pressed.len()
    }

    /// Máximo de teclas mantenidas a la vez desde la creación o el último
    /// [`clear_statistics`](Self::clear_statistics).
    pub fn max_pressed(&self) -> usize {
        self.max_pressed
    }

    /// Eventos de teclado por segundo en la ventana reciente (`0` con menos de dos).
    pub fn rate_hz(&self) -> u32 {
        let (Some(&first), Some(&last)) = (self.timestamps.front(), self.timestamps.back()) else {
            return 0;
        };
        let duration = last.saturating_sub(first);
        if self.timestamps.len() < 2 || duration == 0 {
            return 0;
        }
        let count = (self.timestamps.len() - 1) as f64;
        (NANOS_PER_SECOND * count / duration as f64) as u32
    }

    /// Texto tecleado, con el retroceso ya aplicado.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Línea de diagnóstico del último evento de tecla.
    pub fn info_line(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// `NKRO: 3 (Max) | Rate: 42 Hz`.
    pub fn stats_line(&self) -> String {
        format!("NKRO: {} (Max) | Rate: {} Hz", self.max_pressed, self.rate_hz())
    }

    /// Borra el máximo NKRO, la ventana de frecuencia y el texto.
    pub fn clear_statistics(&mut self) {
        self.max_pressed = self.pressed.len();
        self.timestamps.clear();
        self.text.clear();
    }
}

impl InputStateExt<u32> for KeyTracker {
    fn set_key(&mut self, key: u32, pressed: bool) {
        if pressed {
            self.pressed.insert(key);
            self.last_pressed = Some(key);
        } else {
            self.pressed.remove(&key);
        }
    }

    fn is_pressed(&self, key: u32) -> bool {
        self.pressed.contains(&key)
    }

    fn any_pressed(&self) -> bool {
        !self.pressed.is_empty()
    }

    fn last_pressed(&self) -> Option<u32> {
        self.last_pressed
    }

    fn keys_pressed(&self) -> Vec<u32> {
        self.pressed.iter().copied().collect()
    }

    fn reset(&mut self) {
        self.pressed.clear();
        self.last_pressed = None;
    }
}
