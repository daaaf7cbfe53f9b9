//! `critical-section` 1.x implementation for ESP-IDF.
//!
//! The [`Inbox`](crate::inbox::Inbox) channel is guarded by
//! `CriticalSectionRawMutex`.  Its two users are the MQTT event task and
//! the control thread, so a process-wide `std` mutex is enough; nothing
//! here runs in interrupt context.  Nesting on one thread is counted so
//! only the outermost acquire takes the lock.

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(target_os = "espidf")]
static CS_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static CS_DEPTH: Cell<u8> = const { Cell::new(0) };
    static CS_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CS_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            let lock = CS_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
            CS_GUARD.with(|guard| *guard.borrow_mut() = Some(lock));
        }
        let next = d.saturating_add(1);
        depth.set(next);
        next
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    CS_DEPTH.with(|depth| match depth.get() {
        0 => {}
        1 => {
            depth.set(0);
            CS_GUARD.with(|guard| *guard.borrow_mut() = None);
        }
        d => depth.set(d - 1),
    })
}
