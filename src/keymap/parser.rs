//! Cargador JSON del keymap.
//!
//! Formato:
//!
//! ```json
//! {
//!   "nativeScanCodeOffset": 8,
//!   "qtKeyToVirtualKey": [
//!     { "qtKey": "Key_A", "virtualKey": "0x41" },
//!     { "qtKey": "Key_0", "virtualKey": 96, "keypad": true }
//!   ],
//!   "linuxScanToWinScan": [
//!     { "linuxScanCode": 97, "winScanCode": "0x1D", "extended": true }
//!   ]
//! }
//! ```
//!
//! `qtKey` también se acepta como `platformKeyId`; `linuxScanCode`/`winScanCode`
//! como `platformScanCode`/`canonicalScanCode`. Una lista envuelta en un array
//! extra (`[[...]]`) se desenvuelve.
//!
//! Cada entrada inválida se reporta con su ruta (`qtKeyToVirtualKey[3].virtualKey`) y
//! el resto del documento se sigue analizando: un solo intento devuelve todas las
//! incidencias.

use serde_json::{Map, Value};

use crate::error::{KeymapError, KeymapIssue};
use crate::traits::keys::KeyNames;

use super::{Keymap, KeymapBuilder};

pub(crate) const OFFSET_FIELD: &str = "nativeScanCodeOffset";
pub(crate) const VIRTUAL_KEY_LIST: &str = "qtKeyToVirtualKey";
pub(crate) const SCAN_CODE_LIST: &str = "linuxScanToWinScan";

const KEY_ID_FIELDS: &[&str] = &["qtKey", "platformKeyId"];
const VIRTUAL_KEY_FIELD: &str = "virtualKey";
const KEYPAD_FIELD: &str = "keypad";
const NATIVE_SCAN_FIELDS: &[&str] = &["linuxScanCode", "platformScanCode"];
const CANONICAL_SCAN_FIELDS: &[&str] = &["winScanCode", "canonicalScanCode"];
const EXTENDED_FIELD: &str = "extended";

/// Los scan codes canónicos caben en 16 bits (`0xE0xx` incluido).
const MAX_CANONICAL_SCAN_CODE: u32 = 0xFFFF;

/// Analiza un documento de keymap resolviendo nombres de tecla con `names`.
///
/// Devuelve la tabla completa o **todas** las incidencias; nunca una tabla parcial.
pub fn parse_keymap(text: &str, names: &dyn KeyNames) -> Result<Keymap, KeymapError> {
    let root = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(root)) => root,
        Ok(other) => {
            return Err(KeymapError::Invalid(vec![KeymapIssue::new(
                "json",
                format!("expected object (got {})", type_name(&other)),
            )]));
        }
        Err(error) => {
            return Err(KeymapError::Invalid(vec![KeymapIssue::new(
                "json",
                format!("invalid json ({error})"),
            )]));
        }
    };

    let mut parser = Parser {
        builder: Keymap::builder(0),
        issues: Vec::new(),
    };
    parser.parse_offset(&root);
    parser.parse_virtual_keys(&root, names);
    parser.parse_scan_codes(&root);
    parser.finish()
}

struct Parser {
    builder: KeymapBuilder,
    issues: Vec<KeymapIssue>,
}

impl Parser {
    fn report(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(KeymapIssue::new(path, message));
    }

    fn parse_offset(&mut self, root: &Map<String, Value>) {
        let Some(value) = root.get(OFFSET_FIELD) else {
            self.report(OFFSET_FIELD, "missing entry");
            return;
        };
        match parse_unsigned(value) {
            Some(offset) => {
                self.builder.set_native_scan_code_offset(offset);
            }
            None => self.report(OFFSET_FIELD, "expected unsigned integer"),
        }
    }

    fn parse_virtual_keys(&mut self, root: &Map<String, Value>, names: &dyn KeyNames) {
        let Some(items) = self.entry_list(root, VIRTUAL_KEY_LIST) else {
            return;
        };
        for (index, item) in items.iter().enumerate() {
            let path = format!("{VIRTUAL_KEY_LIST}[{index}]");
            let Some(entry) = self.expect_object(&path, item) else {
                continue;
            };

            let (key_field, key_value) = field(entry, KEY_ID_FIELDS);
            let Some(key) = parse_key_id(key_value, names) else {
                self.report(format!("{path}.{key_field}"), "expected key identifier");
                continue;
            };
            let Some(virtual_key) = entry.get(VIRTUAL_KEY_FIELD).and_then(parse_unsigned) else {
                self.report(format!("{path}.{VIRTUAL_KEY_FIELD}"), "expected unsigned integer");
                continue;
            };
            let keypad = self.optional_flag(&path, entry, KEYPAD_FIELD);

            if self.builder.insert_virtual_key(key, keypad, virtual_key).is_err() {
                self.report(path, "duplicate entry");
            }
        }
    }

    fn parse_scan_codes(&mut self, root: &Map<String, Value>) {
        let Some(items) = self.entry_list(root, SCAN_CODE_LIST) else {
            return;
        };
        for (index, item) in items.iter().enumerate() {
            let path = format!("{SCAN_CODE_LIST}[{index}]");
            let Some(entry) = self.expect_object(&path, item) else {
                continue;
            };

            let (native_field, native_value) = field(entry, NATIVE_SCAN_FIELDS);
            let Some(native) = native_value.and_then(parse_unsigned) else {
                self.report(format!("{path}.{native_field}"), "expected unsigned integer");
                continue;
            };
            let (canonical_field, canonical_value) = field(entry, CANONICAL_SCAN_FIELDS);
            let Some(canonical) = canonical_value.and_then(parse_unsigned) else {
                self.report(format!("{path}.{canonical_field}"), "expected unsigned integer");
                continue;
            };
            if canonical > MAX_CANONICAL_SCAN_CODE {
                self.report(format!("{path}.{canonical_field}"), "expected scan code");
                continue;
            }
            let extended = self.optional_flag(&path, entry, EXTENDED_FIELD);

            if self.builder.insert_scan_code(native, canonical, extended).is_err() {
                self.report(path, "duplicate entry");
            }
        }
    }

    /// Lista de entradas de `name`, desenvolviendo un nivel extra de array.
    fn entry_list<'a>(&mut self, root: &'a Map<String, Value>, name: &str) -> Option<&'a [Value]> {
        let value = root.get(name);
        let Some(Value::Array(items)) = value else {
            let got = value.map_or("undefined", type_name);
            self.report(name, format!("missing array (got {got})"));
            return None;
        };
        match items.as_slice() {
            [Value::Array(inner)] => Some(inner.as_slice()),
            items => Some(items),
        }
    }

    fn expect_object<'a>(&mut self, path: &str, item: &'a Value) -> Option<&'a Map<String, Value>> {
        match item {
            Value::Object(entry) => Some(entry),
            other => {
                self.report(path, format!("expected object (got {})", type_name(other)));
                None
            }
        }
    }

    /// Un flag opcional que no es booleano se reporta, pero la entrada sigue valiendo `false`.
    fn optional_flag(&mut self, path: &str, entry: &Map<String, Value>, name: &str) -> bool {
        match entry.get(name) {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                self.report(format!("{path}.{name}"), "expected boolean");
                false
            }
        }
    }

    fn finish(mut self) -> Result<Keymap, KeymapError> {
        self.issues.extend(self.builder.emptiness_issues());
        if self.issues.is_empty() {
            self.builder.build()
        } else {
            Err(KeymapError::Invalid(self.issues))
        }
    }
}

/// Primer campo presente entre `aliases`; si ninguno lo está, el nombre principal.
fn field<'a>(entry: &'a Map<String, Value>, aliases: &[&'static str]) -> (&'static str, Option<&'a Value>) {
    aliases
        .iter()
        .find_map(|&alias| entry.get(alias).map(|value| (alias, Some(value))))
        .unwrap_or((aliases[0], None))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "bool",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
    }
}

/// Entero sin signo de 32 bits: número entero no negativo, o cadena decimal,
/// hexadecimal (`0x`) u octal (`0` inicial).
fn parse_unsigned(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => {
            if let Some(integer) = number.as_u64() {
                return u32::try_from(integer).ok();
            }
            let float = number.as_f64()?;
            if float >= 0.0 && float.fract() == 0.0 && float <= f64::from(u32::MAX) {
                Some(float as u32)
            } else {
                None
            }
        }
        Value::String(text) => parse_unsigned_text(text),
        _ => None,
    }
}

fn parse_unsigned_text(text: &str) -> Option<u32> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(octal) = text.strip_prefix('0').filter(|rest| !rest.is_empty()) {
        (octal, 8)
    } else {
        (text, 10)
    };
    // `from_str_radix` acepta un `+` inicial.
    if digits.starts_with('+') {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

/// Identificador de tecla: número, nombre simbólico o cadena numérica.
fn parse_key_id(value: Option<&Value>, names: &dyn KeyNames) -> Option<u32> {
    match value? {
        Value::String(text) => names
            .key_from_name(text)
            .or_else(|| parse_unsigned_text(text)),
        other => parse_unsigned(other),
    }
}
