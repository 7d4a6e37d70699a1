//! In-process typed event bus for the Katalyst runtime.
//!
//! Routes a published event to every handler registered for its concrete
//! type. The transactional deferral decorator described in the runtime lives
//! in `katalyst-tx` (it needs the transaction context this crate has no
//! knowledge of) and wraps any [`EventBus`] implementation here, including
//! [`LocalEventBus`].

mod bus;
mod envelope;

pub use bus::{Dispatcher, ErrorSink, EventBus, HandlerError, LocalEventBus, TracingErrorSink};
pub use envelope::EventEnvelope;
