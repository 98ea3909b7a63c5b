/*!
 * Pass orchestration.
 *
 * - `worker`: runs one pass on a background thread with its own runtime
 * - `events`: the messages a worker sends back
 * - `controller`: starts passes in order and applies their results
 */

pub mod controller;
pub mod events;
pub mod worker;

pub use crate::analysis::CancellationFlag;
pub use controller::{Controller, EventObserver};
pub use events::{EventSender, PassEvent};
pub use worker::PassWorker;
