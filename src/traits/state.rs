use std::hash::Hash;

/// # Trait `InputEvent`
///
/// Vista mínima de un **evento de entrada** para el consumidor: la tecla involucrada,
/// su estado y el instante (ns monotónicos) en que se normalizó.
///
/// [`NormalizedEvent`](crate::NormalizedEvent) lo implementa con
/// `Key = KeyIdentity` y `State = EventKind`.
///
/// ## Ejemplo
/// ```rust
/// use orbit_input_capture::{EventKind, InputEvent, NormalizedEvent};
///
/// let event = NormalizedEvent { kind: EventKind::KeyUp, virtual_key: 0x41, ..Default::default() };
/// assert_eq!(event.state(), EventKind::KeyUp);
/// assert_eq!(event.key().virtual_key, 0x41);
/// ```
pub trait InputEvent: Hash + PartialEq + Clone {
    /// Tipo de tecla usado por este evento.
    type Key: Copy + PartialEq + Hash;

    /// Tipo de estado usado por este evento.
    type State: Copy + PartialEq;

    /// Retorna la tecla asociada a este evento.
    fn key(&self) -> Self::Key;

    /// Retorna el estado de la tecla en este evento.
    fn state(&self) -> Self::State;

    /// Instante monotónico en nanosegundos.
    fn timestamp_ns(&self) -> u64;
}

/// # Trait `InputStateExt`
///
/// Interfaz del **estado vivo** del teclado del lado del consumidor: qué teclas siguen
/// pulsadas tras drenar la cola.
///
/// Lo implementa [`KeyTracker`](crate::tracker::KeyTracker), que se alimenta con los
/// eventos extraídos por el hilo consumidor.
///
/// ## Parámetros genéricos
/// - `K`: tipo de tecla (por ejemplo, un `u32` de virtual key o scan code combinado).
///
/// ## Ejemplo de uso
/// ```rust,ignore
/// fn any_modifier<I: InputStateExt<u32>>(input: &I) -> bool {
///     input.is_pressed(0x10) || input.is_pressed(0x11)
/// }
/// ```
pub trait InputStateExt<K>
where
    K: Copy + PartialEq + Hash,
{
    /// Marca la tecla como pulsada (`true`) o liberada (`false`).
    fn set_key(&mut self, key: K, pressed: bool);

    /// Retorna `true` si la tecla está actualmente **presionada o mantenida**.
    fn is_pressed(&self, key: K) -> bool;

    /// Retorna `true` si **cualquier tecla** se encuentra actualmente presionada.
    fn any_pressed(&self) -> bool;

    /// Devuelve la última tecla presionada (si existe).
    fn last_pressed(&self) -> Option<K>;

    /// Retorna todas las teclas actualmente presionadas, en orden ascendente.
    fn keys_pressed(&self) -> Vec<K>;

    /// Resetea el estado actual (por ejemplo, al perder el foco).
    fn reset(&mut self);
}
