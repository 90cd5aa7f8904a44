use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Locks `mutex`, recovering the inner value if a previous holder panicked.
/// Logs once per `warned` flag.
pub(crate) fn lock_recovering<'a, T>(
    mutex: &'a Mutex<T>,
    lock: &'static str,
    warned: &AtomicBool,
) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            if warned
                .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                warn!(lock, "lock poisoned; recovered inner value");
            }
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn poisoned_lock_keeps_its_value() {
        static WARNED: AtomicBool = AtomicBool::new(false);
        let mutex = Arc::new(Mutex::new(5));
        let cloned = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = cloned.lock().expect("first lock");
            panic!("poison test lock");
        })
        .join();

        assert!(mutex.is_poisoned());
        assert_eq!(*lock_recovering(&mutex, "test", &WARNED), 5);
        assert!(WARNED.load(Ordering::Relaxed));
    }
}
