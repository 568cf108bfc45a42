//! Transaction execution pipeline.
//!
//! Every state-changing invocation flows through the same stages: argument
//! preparation and network detection, gas estimation, submission over one of
//! two paths, receipt polling, and classification of the mined receipt.
//! Progress is observable per invocation through a replaying handle; fatal
//! errors surface exactly once through its terminal channel.

pub mod classify;
pub mod error;
pub mod gas;
pub mod prepare;
pub mod progress;
pub mod submit;
pub mod trace;

pub use classify::{classify, decode_revert_reason};
pub use error::ExecutionError;
pub use gas::estimate_gas;
pub use prepare::{CallPreparer, NameResolver, NetworkDetector, PreparedCall};
pub use progress::{ProgressEmitter, ProgressEvent, ProgressHandle};
pub use submit::{LocalSigning, NodeManaged, SubmissionStrategy, TransactionSubmitter};
pub use trace::{DebuggerSession, Instruction, SourceFragment, StackFrame, TracePosition};
