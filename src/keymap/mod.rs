//! Tabla de traducción de teclas (keymap).
//!
//! Estructura inmutable que traduce los identificadores del host a la numeración
//! canónica (la de Windows):
//!
//! - `(identificador de tecla, flag de keypad)` → virtual key
//! - `scan code de la plataforma` → `(scan code canónico, flag extendido)`
//!
//! más un único escalar, `native_scan_code_offset`, que alinea la numeración cruda
//! de la plataforma con la de la tabla antes de buscar (X11 reporta `evdev + 8`).
//!
//! El keymap se construye **una vez** ([`Keymap::from_json`], [`KeymapBuilder`] o
//! [`KeymapSource::resolve`]) y después se comparte por `Arc` entre hilos sin
//! sincronización. Un intento de carga fallido nunca produce una tabla parcial.
//!
//! ```rust
//! use orbit_input_capture::Keymap;
//!
//! let keymap = Keymap::from_json(r#"{
//!     "nativeScanCodeOffset": 8,
//!     "qtKeyToVirtualKey": [{ "qtKey": "Key_A", "virtualKey": 65 }],
//!     "linuxScanToWinScan": [{ "linuxScanCode": 1, "winScanCode": 1 }]
//! }"#).unwrap();
//!
//! assert_eq!(keymap.lookup_virtual_key_by_name("Key_A", false), 65);
//! assert_eq!(keymap.lookup_virtual_key_by_name("Key_A", true), 65);
//! assert_eq!(keymap.translate_scan_code(9).scan_code, 1);
//! ```

pub mod names;
mod parser;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{KeymapError, KeymapIssue};
use crate::traits::keys::KeyNames;

use self::names::StandardKeyNames;

pub use self::parser::parse_keymap;

/// Keymap incluido en el crate (Linux/X11 → Windows).
pub const BUNDLED_LINUX_KEYMAP: &str = include_str!("../../resources/linux_keymap.json");

/// Resultado de traducir un scan code de la plataforma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScanTranslation {
    pub scan_code: u32,
    pub is_extended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KeyBinding {
    key: u32,
    keypad: bool,
}

/// Tabla inmutable de traducción. Ver la documentación del módulo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    virtual_keys: HashMap<KeyBinding, u32>,
    scan_codes: HashMap<u32, ScanTranslation>,
    native_scan_code_offset: u32,
}

impl Keymap {
    pub fn builder(native_scan_code_offset: u32) -> KeymapBuilder {
        KeymapBuilder {
            map: Keymap {
                virtual_keys: HashMap::new(),
                scan_codes: HashMap::new(),
                native_scan_code_offset,
            },
        }
    }

    /// Carga un keymap JSON resolviendo nombres con [`StandardKeyNames`].
    pub fn from_json(text: &str) -> Result<Self, KeymapError> {
        parse_keymap(text, &StandardKeyNames)
    }

    /// Carga el keymap incluido en el crate.
    pub fn bundled() -> Result<Self, KeymapError> {
        Self::from_json(BUNDLED_LINUX_KEYMAP)
    }

    /// Virtual key de `(key, keypad)`.
    ///
    /// Si no hay entrada exacta y `keypad` es `true`, reintenta con `keypad = false`:
    /// las teclas del teclado numérico solo necesitan entrada propia cuando difieren.
    /// Devuelve `0` si la tecla no está mapeada.
    pub fn lookup_virtual_key(&self, key: u32, keypad: bool) -> u32 {
        if let Some(&virtual_key) = self.virtual_keys.get(&KeyBinding { key, keypad }) {
            return virtual_key;
        }
        if keypad {
            if let Some(&virtual_key) = self.virtual_keys.get(&KeyBinding { key, keypad: false }) {
                return virtual_key;
            }
        }
        0
    }

    /// Igual que [`lookup_virtual_key`](Self::lookup_virtual_key) pero con un nombre
    /// simbólico (`"Key_A"`). Un nombre desconocido devuelve `0`.
    pub fn lookup_virtual_key_by_name(&self, name: &str, keypad: bool) -> u32 {
        StandardKeyNames
            .key_from_name(name)
            .map_or(0, |key| self.lookup_virtual_key(key, keypad))
    }

    /// Traduce un scan code crudo de la plataforma.
    ///
    /// Primero resta `native_scan_code_offset` (salvo que el resultado fuese negativo) y
    /// busca en la tabla. Si no hay entrada, devuelve el código ajustado sin extender.
    pub fn translate_scan_code(&self, native_scan_code: u32) -> ScanTranslation {
        let offset = self.native_scan_code_offset;
        let adjusted = if offset != 0 && native_scan_code >= offset {
            native_scan_code - offset
        } else {
            native_scan_code
        };
        self.scan_codes
            .get(&adjusted)
            .copied()
            .unwrap_or(ScanTranslation {
                scan_code: adjusted,
                is_extended: false,
            })
    }

    pub fn native_scan_code_offset(&self) -> u32 {
        self.native_scan_code_offset
    }

    pub fn virtual_key_count(&self) -> usize {
        self.virtual_keys.len()
    }

    pub fn scan_code_count(&self) -> usize {
        self.scan_codes.len()
    }
}

/// La clave ya existía en la tabla. Ver [`KeymapBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateEntry;

/// Constructor incremental de un [`Keymap`].
///
/// Rechaza claves duplicadas en lugar de sobrescribir, y [`build`](Self::build)
/// falla si alguna de las dos tablas queda vacía.
#[derive(Debug, Clone)]
pub struct KeymapBuilder {
    map: Keymap,
}

impl KeymapBuilder {
    pub fn insert_virtual_key(
        &mut self,
        key: u32,
        keypad: bool,
        virtual_key: u32,
    ) -> Result<&mut Self, DuplicateEntry> {
        let binding = KeyBinding { key, keypad };
        if self.map.virtual_keys.contains_key(&binding) {
            return Err(DuplicateEntry);
        }
        self.map.virtual_keys.insert(binding, virtual_key);
        Ok(self)
    }

    pub fn insert_scan_code(
        &mut self,
        native_scan_code: u32,
        scan_code: u32,
        is_extended: bool,
    ) -> Result<&mut Self, DuplicateEntry> {
        if self.map.scan_codes.contains_key(&native_scan_code) {
            return Err(DuplicateEntry);
        }
        self.map.scan_codes.insert(
            native_scan_code,
            ScanTranslation {
                scan_code,
                is_extended,
            },
        );
        Ok(self)
    }

    pub fn set_native_scan_code_offset(&mut self, offset: u32) -> &mut Self {
        self.map.native_scan_code_offset = offset;
        self
    }

    /// Incidencias que impedirían construir la tabla (listas vacías).
    pub(crate) fn emptiness_issues(&self) -> Vec<KeymapIssue> {
        let mut issues = Vec::new();
        if self.map.virtual_keys.is_empty() {
            issues.push(KeymapIssue::new(parser::VIRTUAL_KEY_LIST, "empty mapping"));
        }
        if self.map.scan_codes.is_empty() {
            issues.push(KeymapIssue::new(parser::SCAN_CODE_LIST, "empty mapping"));
        }
        issues
    }

    pub fn build(self) -> Result<Keymap, KeymapError> {
        let issues = self.emptiness_issues();
        if issues.is_empty() {
            Ok(self.map)
        } else {
            Err(KeymapError::Invalid(issues))
        }
    }
}

/// De dónde obtiene un backend su keymap.
///
/// `Table` permite inyectar una tabla ya construida y compartida; el resto se
/// cargan en cada `start`.
///
/// En configuración (`serde`) se escribe como `"bundled"`, `{"json": "..."}` o
/// `{"file": "/ruta/keymap.json"}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeymapSource {
    #[default]
    Bundled,
    Json(String),
    File(PathBuf),
    #[serde(skip)]
    Table(Arc<Keymap>),
}

impl KeymapSource {
    pub fn resolve(&self) -> Result<Arc<Keymap>, KeymapError> {
        match self {
            Self::Bundled => Keymap::bundled().map(Arc::new),
            Self::Json(text) => Keymap::from_json(text).map(Arc::new),
            Self::File(path) => {
                let text = fs::read_to_string(path).map_err(|source| KeymapError::Io {
                    path: path.clone(),
                    source,
                })?;
                Keymap::from_json(&text).map(Arc::new)
            }
            Self::Table(keymap) => Ok(Arc::clone(keymap)),
        }
    }
}

impl From<Keymap> for KeymapSource {
    fn from(keymap: Keymap) -> Self {
        Self::Table(Arc::new(keymap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Keymap {
        let mut builder = Keymap::builder(8);
        builder
            .insert_virtual_key(0x41, false, 0x41)
            .unwrap()
            .insert_virtual_key(0x30, false, 0x30)
            .unwrap()
            .insert_virtual_key(0x30, true, 0x60)
            .unwrap();
        builder
            .insert_scan_code(1, 1, false)
            .unwrap()
            .insert_scan_code(97, 0x1D, true)
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn keypad_entry_wins_over_plain_entry() {
        let keymap = sample();
        assert_eq!(keymap.lookup_virtual_key(0x30, false), 0x30);
        assert_eq!(keymap.lookup_virtual_key(0x30, true), 0x60);
    }

    #[test]
    fn keypad_lookup_falls_back_to_plain_entry() {
        let keymap = sample();
        assert_eq!(keymap.lookup_virtual_key(0x41, true), 0x41);
    }

    #[test]
    fn unmapped_virtual_key_is_zero() {
        let keymap = sample();
        assert_eq!(keymap.lookup_virtual_key(0x42, false), 0);
        assert_eq!(keymap.lookup_virtual_key(0x42, true), 0);
        assert_eq!(keymap.lookup_virtual_key_by_name("Key_NotAKey", false), 0);
    }

    #[test]
    fn scan_codes_subtract_offset_before_lookup() {
        let keymap = sample();
        assert_eq!(
            keymap.translate_scan_code(9),
            ScanTranslation {
                scan_code: 1,
                is_extended: false
            }
        );
        assert_eq!(
            keymap.translate_scan_code(105),
            ScanTranslation {
                scan_code: 0x1D,
                is_extended: true
            }
        );
    }

    #[test]
    fn unmapped_scan_code_passes_through_adjusted() {
        let keymap = sample();
        assert_eq!(
            keymap.translate_scan_code(200),
            ScanTranslation {
                scan_code: 192,
                is_extended: false
            }
        );
    }

    #[test]
    fn offset_is_skipped_when_it_would_underflow() {
        let keymap = sample();
        assert_eq!(keymap.translate_scan_code(1).scan_code, 1);
        assert_eq!(keymap.translate_scan_code(5).scan_code, 5);
    }

    #[test]
    fn builder_rejects_duplicates() {
        let mut builder = Keymap::builder(0);
        builder.insert_virtual_key(1, false, 2).unwrap();
        assert_eq!(builder.insert_virtual_key(1, false, 3).err(), Some(DuplicateEntry));
        assert!(builder.insert_virtual_key(1, true, 3).is_ok());
        builder.insert_scan_code(4, 5, false).unwrap();
        assert_eq!(builder.insert_scan_code(4, 6, true).err(), Some(DuplicateEntry));
    }

    #[test]
    fn builder_refuses_empty_tables() {
        let error = Keymap::builder(0).build().unwrap_err();
        assert!(error.mentions("qtKeyToVirtualKey"));
        assert!(error.mentions("linuxScanToWinScan"));
    }

    #[test]
    fn source_shares_injected_table() {
        let table = Arc::new(sample());
        let source = KeymapSource::Table(Arc::clone(&table));
        let resolved = source.resolve().unwrap();
        assert!(Arc::ptr_eq(&table, &resolved));
    }

    #[test]
    fn source_deserializes_from_config() {
        let source: KeymapSource = serde_json::from_str(r#"{"file": "/etc/keymap.json"}"#).unwrap();
        assert!(matches!(source, KeymapSource::File(path) if path == PathBuf::from("/etc/keymap.json")));
        let source: KeymapSource = serde_json::from_str(r#""bundled""#).unwrap();
        assert!(matches!(source, KeymapSource::Bundled));
    }

    #[test]
    fn bundled_keymap_loads() {
        let keymap = Keymap::bundled().unwrap();
        assert_eq!(keymap.native_scan_code_offset(), 8);
        assert_eq!(keymap.lookup_virtual_key_by_name("Key_A", false), 0x41);
        assert_eq!(keymap.lookup_virtual_key_by_name("Key_Escape", false), 0x1B);
        assert_eq!(keymap.lookup_virtual_key_by_name("Key_5", true), 0x65);
        assert_eq!(keymap.lookup_virtual_key_by_name("Key_Home", true), 0x24);
        // X11 keycode 105 = evdev 97 = Ctrl derecho
        assert_eq!(
            keymap.translate_scan_code(105),
            ScanTranslation {
                scan_code: 0x1D,
                is_extended: true
            }
        );
    }

    proptest! {
        #[test]
        fn every_inserted_entry_reads_back(entries in prop::collection::hash_map((any::<u32>(), any::<bool>()), any::<u32>(), 1..64),
                                           scans in prop::collection::hash_map(any::<u32>(), (any::<u32>(), any::<bool>()), 1..64)) {
            let mut builder = Keymap::builder(0);
            for (&(key, keypad), &virtual_key) in &entries {
                builder.insert_virtual_key(key, keypad, virtual_key).unwrap();
            }
            for (&native, &(scan_code, is_extended)) in &scans {
                builder.insert_scan_code(native, scan_code, is_extended).unwrap();
            }
            let keymap = builder.build().unwrap();
            for (&(key, keypad), &virtual_key) in &entries {
                prop_assert_eq!(keymap.lookup_virtual_key(key, keypad), virtual_key);
            }
            for (&native, &(scan_code, is_extended)) in &scans {
                prop_assert_eq!(keymap.translate_scan_code(native), ScanTranslation { scan_code, is_extended });
            }
        }
    }
}
