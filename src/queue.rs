//! Cola de eventos entre el hilo del SO (productor) y el hilo consumidor.
//!
//! [`event_queue`] crea una [`RingBuffer`] compartida por `Arc` y devuelve sus dos
//! extremos con propiedad (`'static`), listos para moverse a hilos distintos:
//!
//! - [`EventProducer`] implementa [`EventSink`]: inserta con `try_push` y, si la cola
//!   está llena, **descarta** el evento. El productor nunca espera.
//! - [`EventConsumer`] extrae con `try_pop` al ritmo que decida el consumidor
//!   (p. ej. cada 16 ms) y expone el contador de eventos descartados.
//!
//! ```rust
//! use orbit_input_capture::{EventSink, NormalizedEvent, event_queue};
//!
//! let (mut producer, mut consumer) = event_queue();
//! producer.on_input_event(NormalizedEvent::text_input('x'));
//! let drained = consumer.drain(|event| assert_eq!(event.text, Some('x')));
//! assert_eq!(drained, 1);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::event::NormalizedEvent;
use crate::ring::RingBuffer;
use crate::traits::sink::EventSink;

/// Capacidad usada por [`event_queue`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

struct Shared<const N: usize> {
    ring: RingBuffer<NormalizedEvent, N>,
    pushed: AtomicU64,
    dropped: AtomicU64,
}

/// Crea una cola de [`DEFAULT_QUEUE_CAPACITY`] eventos.
pub fn event_queue() -> (EventProducer, EventConsumer) {
    bounded_event_queue::<DEFAULT_QUEUE_CAPACITY>()
}

/// Crea una cola de `N` eventos (`N` potencia de dos, `N >= 2`).
pub fn bounded_event_queue<const N: usize>() -> (EventProducer<N>, EventConsumer<N>) {
    let shared = Arc::new(Shared {
        ring: RingBuffer::new(),
        pushed: AtomicU64::new(0),
        dropped: AtomicU64::new(0),
    });
    (
        EventProducer {
            shared: Arc::clone(&shared),
            dropping: false,
        },
        EventConsumer { shared },
    )
}

/// Extremo productor. Único: no implementa `Clone`.
pub struct EventProducer<const N: usize = DEFAULT_QUEUE_CAPACITY> {
    shared: Arc<Shared<N>>,
    dropping: bool,
}

impl<const N: usize> EventProducer<N> {
    /// Intenta encolar. `false` significa que el evento se perdió (cola llena).
    pub fn try_push(&mut self, event: NormalizedEvent) -> bool {
        // SAFETY: este es el único `EventProducer` de la cola y `&mut self` serializa sus llamadas.
        let accepted = unsafe { self.shared.ring.push_shared(event) };
        if accepted {
            self.shared.pushed.fetch_add(1, Ordering::Relaxed);
            if self.dropping {
                self.dropping = false;
                debug!(
                    "input queue accepting events again ({} dropped so far)",
                    self.shared.dropped.load(Ordering::Relaxed)
                );
            }
        } else {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            if !self.dropping {
                self.dropping = true;
                warn!("input queue full ({} events); dropping new events", N);
            }
        }
        accepted
    }

    /// Eventos descartados por cola llena.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl<const N: usize> EventSink for EventProducer<N> {
    fn on_input_event(&mut self, event: NormalizedEvent) {
        self.try_push(event);
    }
}

impl<const N: usize> fmt::Debug for EventProducer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProducer")
            .field("capacity", &N)
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// Extremo consumidor. Único: no implementa `Clone`.
pub struct EventConsumer<const N: usize = DEFAULT_QUEUE_CAPACITY> {
    shared: Arc<Shared<N>>,
}

impl<const N: usize> EventConsumer<N> {
    /// Extrae el evento más antiguo sin bloquear.
    pub fn try_pop(&mut self) -> Option<NormalizedEvent> {
        // SAFETY: este es el único `EventConsumer` de la cola y `&mut self` serializa sus llamadas.
        unsafe { self.shared.ring.pop_shared() }
    }

    /// Extrae todo lo pendiente, en orden FIFO, y devuelve cuántos eventos se procesaron.
    pub fn drain<F>(&mut self, mut handle: F) -> usize
    where
        F: FnMut(NormalizedEvent),
    {
        let mut count = 0;
        while let Some(event) = self.try_pop() {
            handle(event);
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.shared.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.ring.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Eventos aceptados por la cola desde su creación.
    pub fn pushed(&self) -> u64 {
        self.shared.pushed.load(Ordering::Relaxed)
    }

    /// Eventos descartados por cola llena desde su creación.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Iterator for EventConsumer<N> {
    type Item = NormalizedEvent;

    /// Equivale a `try_pop`: termina en cuanto la cola está vacía, aunque más tarde
    /// lleguen eventos nuevos.
    fn next(&mut self) -> Option<Self::Item> {
        self.try_pop()
    }
}

impl<const N: usize> fmt::Debug for EventConsumer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventConsumer")
            .field("capacity", &N)
            .field("len", &self.len())
            .field("pushed", &self.pushed())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DeviceType, EventKind};
    use std::thread;

    fn key_event(scan_code: u32) -> NormalizedEvent {
        NormalizedEvent {
            device: DeviceType::Keyboard,
            kind: EventKind::KeyDown,
            scan_code,
            ..NormalizedEvent::default()
        }
    }

    #[test]
    fn sink_drops_when_full_and_counts_it() {
        let (mut producer, mut consumer) = bounded_event_queue::<4>();
        for scan in 1..=6 {
            producer.on_input_event(key_event(scan));
        }
        assert_eq!(consumer.pushed(), 4);
        assert_eq!(consumer.dropped(), 2);
        assert_eq!(producer.dropped(), 2);

        let scans: Vec<u32> = std::iter::from_fn(|| consumer.try_pop())
            .map(|event| event.scan_code)
            .collect();
        assert_eq!(scans, vec![1, 2, 3, 4]);
    }

    #[test]
    fn producer_recovers_after_drain() {
        let (mut producer, mut consumer) = bounded_event_queue::<2>();
        assert!(producer.try_push(key_event(1)));
        assert!(producer.try_push(key_event(2)));
        assert!(!producer.try_push(key_event(3)));
        assert_eq!(consumer.drain(|_| {}), 2);
        assert!(producer.try_push(key_event(4)));
        assert_eq!(consumer.try_pop().map(|e| e.scan_code), Some(4));
    }

    #[test]
    fn events_cross_threads_byte_for_byte() {
        let (mut producer, mut consumer) = event_queue();
        let sent: Vec<NormalizedEvent> = (0..1_000u32)
            .map(|index| NormalizedEvent {
                timestamp_ns: u64::from(index) * 10,
                device_id: index % 3,
                virtual_key: index,
                text: char::from_u32(0x61 + index % 26),
                ..key_event(index)
            })
            .collect();
        let expected = sent.clone();

        let worker = thread::spawn(move || {
            for event in sent {
                while !producer.try_push(event) {
                    thread::yield_now();
                }
            }
        });

        let mut received = Vec::with_capacity(expected.len());
        while received.len() < expected.len() {
            if consumer.drain(|event| received.push(event)) == 0 {
                thread::yield_now();
            }
        }
        worker.join().unwrap();

        assert_eq!(received, expected);
        assert_eq!(consumer.dropped(), 0);
        assert!(consumer.is_empty());
    }

    #[test]
    fn iterator_stops_at_empty() {
        let (mut producer, consumer) = event_queue();
        producer.on_input_event(key_event(7));
        producer.on_input_event(key_event(8));
        let drained: Vec<u32> = consumer.map(|event| event.scan_code).collect();
        assert_eq!(drained, vec![7, 8]);
    }
}
