//! # Core Teppan Framework
//!
//! The core module holds the moving parts between a caller submitting tokens and a
//! batch reaching the model.
//!
//! ## Module Structure
//!
//! * [`queue`] - The [`RequestQueue`](queue::RequestQueue) shared by all callers and
//!   drained by the scheduler. Enforces the high-water mark and the `max_wait` policy.
//!
//! * [`scheduler`] - The [`BatchScheduler`](scheduler::BatchScheduler) control loop:
//!   drain, pad, infer, demux, deliver.
//!
//! * [`client`] - The [`InferenceClient`](client::InferenceClient) trait, the seam to the
//!   sequence-to-sequence model.
//!
//! * [`worker`] - Background task management. The `BatchWorkerHandle` spawns the
//!   scheduler and shuts it down.
//!
pub mod client;
pub mod queue;
pub mod scheduler;
pub mod worker;
