//! Errores del crate.
//!
//! - [`KeymapError`]: fallos de carga del keymap, con **todas** las incidencias
//!   encontradas en un único intento.
//! - [`BackendError`]: motivo por el que un backend no pudo arrancar.
//!
//! La pérdida de eventos por cola llena no es un error (ver
//! [`EventConsumer::dropped`](crate::queue::EventConsumer::dropped)), y una tecla sin
//! mapeo degrada a `0`.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Una incidencia localizada dentro del documento del keymap.
///
/// Se muestra como `"<ruta>: <mensaje>"`, p. ej. `qtKeyToVirtualKey[3].virtualKey: expected unsigned integer`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct KeymapIssue {
    pub path: String,
    pub message: String,
}

impl KeymapIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeymapError {
    /// El documento no es válido; contiene cada incidencia encontrada.
    #[error("{}", IssueList(.0))]
    Invalid(Vec<KeymapIssue>),

    #[error("keymap: failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl KeymapError {
    /// Incidencias del documento (vacío para errores de E/S).
    pub fn issues(&self) -> &[KeymapIssue] {
        match self {
            Self::Invalid(issues) => issues,
            Self::Io { .. } => &[],
        }
    }

    /// `true` si alguna incidencia menciona `needle` en su ruta o mensaje.
    pub fn mentions(&self, needle: &str) -> bool {
        self.issues()
            .iter()
            .any(|issue| issue.path.contains(needle) || issue.message.contains(needle))
    }
}

/// Une las incidencias con saltos de línea, una por línea.
struct IssueList<'a>(&'a [KeymapIssue]);

impl fmt::Display for IssueList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, issue) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No se proporcionó el recurso del anfitrión (ventana, fuente de eventos).
    #[error("{backend} backend: event source is null")]
    MissingHost { backend: &'static str },

    /// El keymap no pudo cargarse; el mensaje combina todas las incidencias.
    #[error(transparent)]
    Keymap(#[from] KeymapError),

    /// El SO rechazó la suscripción (registro de dispositivos, filtro).
    #[error("{backend} backend: {message}")]
    Registration {
        backend: &'static str,
        message: String,
    },

    #[error("input capture is not supported on this platform")]
    Unsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_keymap_lists_one_issue_per_line() {
        let error = KeymapError::Invalid(vec![
            KeymapIssue::new("qtKeyToVirtualKey", "empty mapping"),
            KeymapIssue::new("linuxScanToWinScan", "empty mapping"),
        ]);
        assert_eq!(
            error.to_string(),
            "qtKeyToVirtualKey: empty mapping\nlinuxScanToWinScan: empty mapping"
        );
        assert!(error.mentions("linuxScanToWinScan"));
        assert!(!error.mentions("nativeScanCodeOffset"));
    }

    #[test]
    fn backend_error_forwards_keymap_message() {
        let error = BackendError::from(KeymapError::Invalid(vec![KeymapIssue::new(
            "json",
            "invalid json",
        )]));
        assert_eq!(error.to_string(), "json: invalid json");
    }

    #[test]
    fn missing_host_names_the_backend() {
        let error = BackendError::MissingHost { backend: "linux" };
        assert_eq!(error.to_string(), "linux backend: event source is null");
    }
}
