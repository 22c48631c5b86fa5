/*!
 * Blocking Substrate
 *
 * The park/unpark layer the primitives are built on:
 * - Parked waiters on parking_lot_core (one address per waiter)
 * - Address-keyed semaphores with FIFO/LIFO queueing and direct handoff
 * - Ticket-based notify lists for condition variables
 * - Bounded active spinning
 */

mod notify;
mod park;
mod sema;
mod spinwait;

pub use notify::NotifyList;
pub use park::{Wake, Waiter};
pub use sema::{QueueOrder, Sema};
pub use spinwait::{can_spin, do_spin};
