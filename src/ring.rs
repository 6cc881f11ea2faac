//! Cola circular SPSC (*single-producer / single-consumer*) sin bloqueo.
//!
//! ## Algoritmo
//! Dos cursores monotónicos: `head` (próxima escritura) y `tail` (próxima lectura).
//! El índice real es `cursor & (N - 1)`. La cola está llena cuando
//! `head - tail == N` y vacía cuando `head == tail`.
//!
//! - El productor es el único que escribe `head`; el consumidor el único que escribe `tail`.
//! - Cada hilo lee su propio cursor con `Relaxed`, el ajeno con `Acquire` y publica
//!   el suyo con `Release`. Así el payload de un slot es visible antes que el cursor
//!   que lo expone, y un slot no se sobrescribe hasta que el consumidor lo ha leído.
//!
//! ## Garantía SPSC por tipos
//! La API pública de [`RingBuffer`] exige `&mut self`, y [`RingBuffer::split`] entrega
//! un único [`Producer`] y un único [`Consumer`], ninguno de ellos `Clone`.
//! No es posible construir un segundo productor mientras existan los extremos.
//!
//! ```rust
//! use orbit_input_capture::ring::RingBuffer;
//!
//! let mut ring = RingBuffer::<u32, 4>::new();
//! let (mut tx, mut rx) = ring.split();
//! assert!(tx.try_push(7));
//! assert_eq!(rx.try_pop(), Some(7));
//! assert_eq!(rx.try_pop(), None);
//! ```

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Evita que ambos cursores compartan línea de caché.
#[repr(align(64))]
struct CacheAligned<T>(T);

/// Buffer circular de capacidad fija `N` (potencia de dos, `N >= 2`).
///
/// `T: Copy` garantiza que sobrescribir un slot no ejecuta destructores.
pub struct RingBuffer<T: Copy, const N: usize> {
    head: CacheAligned<AtomicUsize>,
    tail: CacheAligned<AtomicUsize>,
    slots: [UnsafeCell<MaybeUninit<T>>; N],
}

// SAFETY: los slots solo se tocan a través de `push_shared`/`pop_shared`, cuyo
// contrato restringe el acceso a un productor y un consumidor; los extremos
// públicos (`Producer`/`Consumer`, `&mut self`) hacen cumplir ese contrato.
unsafe impl<T: Copy + Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    const VALID_CAPACITY: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "ring buffer capacity must be a power of two >= 2"
    );
    const MASK: usize = N - 1;

    pub fn new() -> Self {
        let () = Self::VALID_CAPACITY;
        Self {
            head: CacheAligned(AtomicUsize::new(0)),
            tail: CacheAligned(AtomicUsize::new(0)),
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Número de elementos pendientes. Con extremos activos en otros hilos es
    /// solo una instantánea.
    pub fn len(&self) -> usize {
        let tail = self.tail.0.load(Ordering::Acquire);
        let head = self.head.0.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Inserta `item` si hay espacio. Devuelve `false` (y descarta el elemento) si está lleno.
    pub fn try_push(&mut self, item: T) -> bool {
        // SAFETY: `&mut self` excluye cualquier otro productor o consumidor.
        unsafe { self.push_shared(item) }
    }

    /// Extrae el elemento más antiguo, o `None` si está vacío.
    pub fn try_pop(&mut self) -> Option<T> {
        // SAFETY: `&mut self` excluye cualquier otro productor o consumidor.
        unsafe { self.pop_shared() }
    }

    /// Vacía la cola. Requiere `&mut self`: no puede haber push/pop en vuelo.
    pub fn reset(&mut self) {
        *self.head.0.get_mut() = 0;
        *self.tail.0.get_mut() = 0;
    }

    /// Divide la cola en sus dos extremos, válidos mientras dure el préstamo.
    pub fn split(&mut self) -> (Producer<'_, T, N>, Consumer<'_, T, N>) {
        let ring = &*self;
        (Producer { ring }, Consumer { ring })
    }

    /// # Safety
    /// Como mucho un hilo puede estar ejecutando `push_shared` en cada instante.
    pub(crate) unsafe fn push_shared(&self, item: T) -> bool {
        let head = self.head.0.load(Ordering::Relaxed);
        let tail = self.tail.0.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == N {
            return false;
        }
        // SAFETY: el slot `head` no es visible para el consumidor hasta el store de abajo,
        // y el `Acquire` sobre `tail` prueba que ya fue leído en la vuelta anterior.
        unsafe { (*self.slots[head & Self::MASK].get()).write(item) };
        self.head.0.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// # Safety
    /// Como mucho un hilo puede estar ejecutando `pop_shared` en cada instante.
    pub(crate) unsafe fn pop_shared(&self) -> Option<T> {
        let tail = self.tail.0.load(Ordering::Relaxed);
        let head = self.head.0.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        // SAFETY: `tail != head` y el `Acquire` sobre `head` garantizan que el slot fue
        // escrito por completo; el productor no lo toca hasta que publiquemos `tail`.
        let item = unsafe { (*self.slots[tail & Self::MASK].get()).assume_init_read() };
        self.tail.0.store(tail.wrapping_add(1), Ordering::Release);
        Some(item)
    }
}

impl<T: Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> fmt::Debug for RingBuffer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &N)
            .field("len", &self.len())
            .finish()
    }
}

/// Extremo de escritura. Único por préstamo; puede moverse a otro hilo.
pub struct Producer<'a, T: Copy, const N: usize> {
    ring: &'a RingBuffer<T, N>,
}

impl<T: Copy, const N: usize> Producer<'_, T, N> {
    pub fn try_push(&mut self, item: T) -> bool {
        // SAFETY: `Producer` no es `Clone` y `split` requiere `&mut RingBuffer`.
        unsafe { self.ring.push_shared(item) }
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }
}

/// Extremo de lectura. Único por préstamo; puede moverse a otro hilo.
pub struct Consumer<'a, T: Copy, const N: usize> {
    ring: &'a RingBuffer<T, N>,
}

impl<T: Copy, const N: usize> Consumer<'_, T, N> {
    pub fn try_pop(&mut self) -> Option<T> {
        // SAFETY: `Consumer` no es `Clone` y `split` requiere `&mut RingBuffer`.
        unsafe { self.ring.pop_shared() }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn rejects_push_when_full_until_a_pop() {
        let mut ring = RingBuffer::<u8, 4>::new();
        for value in 0..4 {
            assert!(ring.try_push(value));
        }
        assert!(ring.is_full());
        assert!(!ring.try_push(99));

        assert_eq!(ring.try_pop(), Some(0));
        assert!(ring.try_push(4));
        assert!(!ring.try_push(5));
    }

    #[test]
    fn pop_on_empty_returns_none() {
        let mut ring = RingBuffer::<u64, 2>::new();
        assert!(ring.is_empty());
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn reset_clears_pending_items() {
        let mut ring = RingBuffer::<u32, 8>::new();
        ring.try_push(1);
        ring.try_push(2);
        ring.reset();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.try_pop(), None);
        assert!(ring.try_push(3));
        assert_eq!(ring.try_pop(), Some(3));
    }

    #[test]
    fn wraps_around_many_times() {
        let mut ring = RingBuffer::<u32, 2>::new();
        for value in 0..1_000 {
            assert!(ring.try_push(value));
            assert_eq!(ring.try_pop(), Some(value));
        }
    }

    #[test]
    fn cross_thread_values_arrive_in_order_without_loss() {
        let mut ring = RingBuffer::<u32, 1024>::new();
        let (mut tx, mut rx) = ring.split();

        thread::scope(|scope| {
            scope.spawn(move || {
                for value in 0..1_000u32 {
                    while !tx.try_push(value) {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut expected = 0u32;
            while expected < 1_000 {
                match rx.try_pop() {
                    Some(value) => {
                        assert_eq!(value, expected);
                        expected += 1;
                    }
                    None => std::hint::spin_loop(),
                }
            }
            assert!(rx.is_empty());
        });
    }

    #[test]
    fn small_ring_under_contention_keeps_fifo() {
        let mut ring = RingBuffer::<u64, 4>::new();
        let (mut tx, mut rx) = ring.split();

        thread::scope(|scope| {
            scope.spawn(move || {
                for value in 0..50_000u64 {
                    while !tx.try_push(value) {
                        thread::yield_now();
                    }
                }
            });

            let mut expected = 0u64;
            while expected < 50_000 {
                if let Some(value) = rx.try_pop() {
                    assert_eq!(value, expected);
                    expected += 1;
                }
            }
        });
    }

    proptest! {
        #[test]
        fn accepted_items_pop_exactly_once_in_order(ops in prop::collection::vec(any::<Option<u16>>(), 1..400)) {
            let mut ring = RingBuffer::<u16, 8>::new();
            let mut model = std::collections::VecDeque::new();
            for op in ops {
                match op {
                    Some(value) => {
                        let accepted = ring.try_push(value);
                        prop_assert_eq!(accepted, model.len() < 8);
                        if accepted {
                            model.push_back(value);
                        }
                    }
                    None => prop_assert_eq!(ring.try_pop(), model.pop_front()),
                }
                prop_assert_eq!(ring.len(), model.len());
            }
        }
    }
}
