//! Traits de traducción entre los identificadores nativos de un backend y el
//! modelo normalizado.
//!
//! # Convenciones de tipos genéricos
//!
//! - **`KeyStateExt<I, O>`**: Conversión de estados
//!   - `I` = **I**nput (transición nativa: flags de Raw Input, press/release del host)
//!   - `O` = **O**utput (estado normalizado, normalmente [`EventKind`](crate::EventKind))
//!
//! - **`KeyNames`**: resolución de nombres simbólicos (`"Key_A"`) a identificadores
//!   de tecla de la plataforma y viceversa.

use std::borrow::Cow;

/// El trait [`KeyStateExt`] define la interfaz para **traducir la transición nativa**
/// de un backend (pulsación, liberación, flags de Raw Input...) a un estado normalizado.
///
/// # Parámetros genéricos
/// - `I`: transición nativa (por ejemplo [`RawKeyFlags`](crate::platform::raw_input::RawKeyFlags)).
/// - `O`: estado normalizado (por ejemplo [`EventKind`](crate::EventKind)).
///
/// # Ejemplo
/// ```rust
/// use orbit_input_capture::{EventKind, KeyStateExt};
/// use orbit_input_capture::platform::raw_input::RawKeyFlags;
///
/// let kind = RawKeyFlags::from_external_state(RawKeyFlags(0x0001));
/// assert_eq!(kind, EventKind::KeyUp);
/// ```
///
/// # Reglas de implementación
/// - La conversión debe ser **determinista** y barata: se ejecuta en el callback del SO.
/// - No debe realizar asignaciones dinámicas.
pub trait KeyStateExt<I, O>
where
    I: Copy,
    O: Copy + PartialEq,
{
    /// Convierte una transición nativa (`I`) a su representación normalizada (`O`).
    fn from_external_state(state: I) -> O;
}

/// Enumeración de identificadores de tecla de una plataforma, consultable por nombre.
///
/// El cargador del keymap la usa para aceptar `"Key_Escape"` además de `16777216`.
pub trait KeyNames {
    /// Resuelve un nombre simbólico. `None` si el nombre no pertenece a la enumeración.
    fn key_from_name(&self, name: &str) -> Option<u32>;

    /// Nombre simbólico de un identificador, si lo tiene.
    fn name_of_key(&self, key: u32) -> Option<Cow<'static, str>>;
}
