use crate::event::NormalizedEvent;

/// # Trait `EventSink`
///
/// Capacidad mínima de **destino de eventos**: aceptar un [`NormalizedEvent`] por valor.
///
/// Los backends solo conocen este trait, nunca el tipo concreto de la cola, por lo que
/// productor y consumidor quedan desacoplados. La operación es *fire-and-forget*:
/// no devuelve nada y no debe bloquear, porque se invoca desde el callback del SO.
///
/// ## Implementaciones
/// - [`EventProducer`](crate::queue::EventProducer): intenta insertar en la cola SPSC y
///   descarta el evento si está llena.
/// - [`FnSink`]: adapta cualquier closure (útil en tests y herramientas).
///
/// ## Ejemplo
/// ```rust
/// use orbit_input_capture::{EventSink, NormalizedEvent, sink_fn};
///
/// let mut seen = 0;
/// let mut sink = sink_fn(|_event: NormalizedEvent| seen += 1);
/// sink.on_input_event(NormalizedEvent::text_input('a'));
/// drop(sink);
/// assert_eq!(seen, 1);
/// ```
pub trait EventSink: Send {
    /// Acepta un evento. Nunca bloquea ni informa de errores.
    fn on_input_event(&mut self, event: NormalizedEvent);
}

/// Sink construido a partir de una closure. Ver [`sink_fn`].
#[derive(Debug, Clone, Copy)]
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: FnMut(NormalizedEvent) + Send,
{
    fn on_input_event(&mut self, event: NormalizedEvent) {
        (self.0)(event)
    }
}

pub fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(NormalizedEvent) + Send,
{
    FnSink(f)
}
