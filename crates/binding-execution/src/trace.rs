//! Debugger collaborator seam.
//!
//! When an invocation fails on the manual path with a known transaction
//! hash, the core opens a session on that hash if a debugger is attached.
//! Stepping semantics and instruction-level interpretation live entirely
//! behind this trait; no implementation ships in this workspace.

use crate::error::ExecutionError;
use alloy_primitives::{Address, B256};
use async_trait::async_trait;

/// A single machine instruction at the current trace position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
	pub pc: u64,
	pub opcode: String,
}

/// The source text the current instruction maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFragment {
	pub path: Option<String>,
	pub line: u64,
	pub text: String,
}

/// One frame of the call stack at the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
	pub name: String,
	pub address: Option<Address>,
}

/// Position within the recorded execution trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracePosition {
	pub index: u64,
	pub total: u64,
}

/// An interactive session over one transaction's execution trace.
#[async_trait]
pub trait DebuggerSession: Send + Sync {
	/// Loads the trace of a mined transaction and positions at its start.
	async fn begin_session(&self, transaction_hash: B256) -> Result<(), ExecutionError>;

	/// Advances to the next source mapping.
	async fn step(&self) -> Result<(), ExecutionError>;
	/// Advances past the current line, skipping into calls.
	async fn step_over(&self) -> Result<(), ExecutionError>;
	/// Descends into the call at the current position.
	async fn step_into(&self) -> Result<(), ExecutionError>;
	/// Runs until the current frame returns.
	async fn step_out(&self) -> Result<(), ExecutionError>;
	/// Advances exactly one instruction.
	async fn step_instruction(&self) -> Result<(), ExecutionError>;

	/// True once the trace is exhausted.
	async fn is_stopped(&self) -> bool;
	async fn current_instruction(&self) -> Option<Instruction>;
	async fn current_stack_frame(&self) -> Option<StackFrame>;
	async fn current_source(&self) -> Option<SourceFragment>;
	async fn current_trace_position(&self) -> Option<TracePosition>;
}
