use crate::error::BackendError;
use crate::traits::sink::EventSink;

/// # Trait `InputBackend`
///
/// Define el **ciclo de vida** de un backend de captura nativo.
///
/// Un backend se suscribe a las notificaciones de input del SO entre un `start` y un
/// `stop`, traduce cada notificación cruda en cero o un
/// [`NormalizedEvent`](crate::NormalizedEvent) y lo entrega al [`EventSink`] configurado.
///
/// ## Diagrama conceptual
///
/// ```text
/// ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
/// │ SO / host    │ → │ InputBackend │ → │  EventSink   │ → │ hilo         │
/// │ (RawInput,   │   │ + Keymap     │   │ (cola SPSC)  │   │ consumidor   │
/// │  filtro)     │   │              │   │              │   │ (try_pop)    │
/// └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
/// ```
///
/// ## Máquina de estados
///
/// ```text
/// {detenido} --start(ok)--> {activo} --stop--> {detenido}
/// {detenido} --start(err)--> {detenido}   (sin estado parcial)
/// ```
///
/// ## Parámetros
///
/// - `Host`: lo que el backend necesita del anfitrión para instalar su hook
///   (ventana destino en Windows, fuente de eventos en Linux).
///
/// ## Ejemplo
///
/// ```rust,ignore
/// let (producer, mut consumer) = orbit_input_capture::event_queue();
/// let mut backend = create_input_backend(BackendConfig::default());
/// backend.set_sink(Some(Box::new(producer)));
/// backend.start(Some(host))?;
///
/// // cada 16 ms, en el hilo de la UI:
/// consumer.drain(|event| tracker.handle_event(&event));
/// ```
pub trait InputBackend: Send {
    /// Recurso del anfitrión sobre el que se instala el hook.
    type Host;

    /// Instala el hook del SO.
    ///
    /// Es idempotente respecto a un `start` previo (primero detiene). Ante cualquier
    /// fallo (host ausente, keymap inválido, registro rechazado) devuelve el error con
    /// un mensaje legible y deja el backend detenido.
    fn start(&mut self, host: Option<Self::Host>) -> Result<(), BackendError>;

    /// Retira el hook del SO. Cuando retorna, ningún callback nuevo puede entrar.
    ///
    /// Puede llamarse varias veces o sin haber llamado a `start`.
    fn stop(&mut self);

    /// Asigna (o retira con `None`) el destino de los eventos.
    ///
    /// Los eventos observados sin sink se descartan, no se encolan.
    fn set_sink(&mut self, sink: Option<Box<dyn EventSink>>);

    // ==================== MONITOREO ====================

    /// Retorna `true` entre un `start` exitoso y el siguiente `stop`.
    fn is_running(&self) -> bool;

    /// Eventos entregados al sink desde la creación del backend.
    fn events_delivered(&self) -> u64;

    /// Descripción del backend, p. ej. `"windows (raw input)"`.
    fn backend_name(&self) -> &'static str;
}
