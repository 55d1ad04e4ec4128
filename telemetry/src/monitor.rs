//! Single-slot packet monitor
//!
//! Hands each published packet to two independent consumers: the logger and
//! the radio. One lock guards the slot and one condition variable wakes every
//! waiter; each waiter re-checks its own flag.
//!
//! ```text
//!                    publish(P)                 guard drop
//!  assembler ──────────────────► ┌──────────┐ ◄───────────── logger
//!                                │ packet   │
//!                                │ logged   │ ◄───────────── radio
//!                                │ transmit │
//!                                └──────────┘
//! ```
//!
//! # Consume guards
//!
//! `await_unlogged` / `await_untransmitted` return a [`ConsumeGuard`] that
//! holds a reference-counted handle to the packet. The slot lock is released
//! before the guard is handed out, so a consumer blocked in I/O never holds
//! up `publish`. Dropping the guard marks the role consumed, on every exit
//! path including `?` and unwinding.
//!
//! A guard only marks the generation it was taken from. If a newer packet was
//! published while the consumer worked, its flag stays clear and the next
//! await returns the newer packet immediately.
//!
//! # Startup
//!
//! Before the first publish the slot is empty with both flags clear, so each
//! consumer's first await returns a guard with no packet.

use parking_lot::{Condvar, Mutex};
use pygmy_packets::Packet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Consumer role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Power-safe log writer
    Logger,
    /// Radio transmitter
    Radio,
}

#[derive(Debug, Default)]
struct Slot {
    packet: Option<Arc<Packet>>,
    generation: u64,
    logged: bool,
    transmitted: bool,
    closed: bool,
}

impl Slot {
    fn consumed(&self, role: Role) -> bool {
        match role {
            Role::Logger => self.logged,
            Role::Radio => self.transmitted,
        }
    }

    fn mark(&mut self, role: Role) {
        match role {
            Role::Logger => self.logged = true,
            Role::Radio => self.transmitted = true,
        }
    }
}

/// Single-slot mailbox shared by the assembler and both consumers
#[derive(Debug, Default)]
pub struct Monitor {
    slot: Mutex<Slot>,
    wake: Condvar,
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents and wake both consumers.
    ///
    /// Never waits on a consumer.
    pub fn publish(&self, packet: Arc<Packet>) {
        {
            let mut slot = self.slot.lock();
            slot.packet = Some(packet);
            slot.generation = slot.generation.wrapping_add(1);
            slot.logged = false;
            slot.transmitted = false;
        }
        self.wake.notify_all();
    }

    /// Block until the current packet has not been logged.
    ///
    /// Returns `None` once the monitor is shut down.
    pub fn await_unlogged(&self) -> Option<ConsumeGuard<'_>> {
        self.await_role(Role::Logger)
    }

    /// Block until the current packet has not been transmitted.
    ///
    /// Returns `None` once the monitor is shut down.
    pub fn await_untransmitted(&self) -> Option<ConsumeGuard<'_>> {
        self.await_role(Role::Radio)
    }

    /// Block until `role` has work
    pub fn await_role(&self, role: Role) -> Option<ConsumeGuard<'_>> {
        let mut slot = self.slot.lock();
        while slot.consumed(role) && !slot.closed {
            self.wake.wait(&mut slot);
        }
        if slot.closed {
            return None;
        }
        Some(ConsumeGuard {
            monitor: self,
            role,
            generation: slot.generation,
            packet: slot.packet.clone(),
        })
    }

    fn mark(&self, role: Role, generation: u64) {
        {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                log::trace!(
                    "{:?} finished generation {} after {} was published",
                    role,
                    generation,
                    slot.generation
                );
                return;
            }
            slot.mark(role);
        }
        self.wake.notify_all();
    }

    /// Whether `role` has consumed the current slot contents
    pub fn is_consumed(&self, role: Role) -> bool {
        self.slot.lock().consumed(role)
    }

    /// Number of publishes so far
    pub fn generation(&self) -> u64 {
        self.slot.lock().generation
    }

    /// Wait until both consumers have finished with the current packet.
    ///
    /// Returns `false` on timeout or shutdown.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while !(slot.logged && slot.transmitted) {
            if slot.closed || self.wake.wait_until(&mut slot, deadline).timed_out() {
                return slot.logged && slot.transmitted;
            }
        }
        true
    }

    /// Wake every waiter and make further awaits return `None`
    pub fn shutdown(&self) {
        self.slot.lock().closed = true;
        self.wake.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.slot.lock().closed
    }
}

/// Scoped claim on the current packet for one role.
///
/// Dropping the guard marks the role consumed.
#[must_use = "dropping the guard immediately marks the packet consumed"]
pub struct ConsumeGuard<'a> {
    monitor: &'a Monitor,
    role: Role,
    generation: u64,
    packet: Option<Arc<Packet>>,
}

impl ConsumeGuard<'_> {
    /// The packet to consume, `None` for an empty slot
    pub fn packet(&self) -> Option<&Packet> {
        self.packet.as_deref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Publish count at the time the guard was taken
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ConsumeGuard<'_> {
    fn drop(&mut self) {
        // Release our handle before marking so the assembler can reuse the buffer
        self.packet = None;
        self.monitor.mark(self.role, self.generation);
    }
}
