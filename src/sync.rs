//! Mutex usado por el estado compartido de los backends.
//!
//! Con el feature `parking_lot` se usa `parking_lot::Mutex`; en otro caso
//! (`std_lock`, por defecto) un envoltorio de `std::sync::Mutex` que recupera el
//! guard si el lock quedó envenenado. Ambos exponen `lock()` sin `Result`.
//!
//! `parking_lot` tiene precedencia: como `std_lock` está en `default`, activar
//! `parking_lot` sin `default-features = false` deja los dos features activos y
//! se usa `parking_lot::Mutex`.
//!
//! La cola SPSC no usa locks: este mutex solo protege el sink, la tabla de
//! dispositivos y la lista de filtros, que apenas tienen contención.

#[cfg(feature = "parking_lot")]
pub(crate) use parking_lot::Mutex;

#[cfg(not(feature = "parking_lot"))]
pub(crate) use self::std_lock::Mutex;

#[cfg(not(feature = "parking_lot"))]
mod std_lock {
    use std::sync::{MutexGuard, PoisonError};

    #[derive(Debug, Default)]
    pub(crate) struct Mutex<T>(std::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub(crate) const fn new(value: T) -> Self {
            Self(std::sync::Mutex::new(value))
        }

        pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Mutex;
    use std::sync::Arc;

    #[cfg(feature = "parking_lot")]
    #[test]
    fn parking_lot_wins_over_std_lock() {
        use std::any::TypeId;
        assert_eq!(TypeId::of::<Mutex<u8>>(), TypeId::of::<parking_lot::Mutex<u8>>());
    }

    #[cfg(not(feature = "parking_lot"))]
    #[test]
    fn std_lock_recovers_poisoned_guard() {
        let shared = Arc::new(Mutex::new(1u32));
        let poisoner = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the lock");
        })
        .join();

        *shared.lock() += 1;
        assert_eq!(*shared.lock(), 2);
    }

    #[test]
    fn lock_is_shared_across_threads() {
        let shared = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || shared.lock().push(n))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let mut seen = shared.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
