pub mod cancellation;
pub mod controller;
pub mod executor;
pub mod transport;

pub use cancellation::{CancellationHandle, CancellationSignal};
pub use controller::{ExecutionController, ExecutionReport};
pub use executor::{BatchExecutor, BatchReport, SendOptions};
pub use transport::{BatchRequest, BatchTransport, EncodedOperation, TransportError, WriteConcern};
