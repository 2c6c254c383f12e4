pub mod admission;
pub mod buffer_pool;
pub mod cache;
pub mod error;
pub mod executor;
pub mod http;
pub mod rate_gate;
pub mod worker;

pub use admission::{Admission, AdmissionQueue, AdmissionSlot};
pub use buffer_pool::BufferPool;
pub use cache::{CacheStats, ContentCache};
pub use error::{FetchError, TransportError};
pub use executor::{FetchExecutor, FetchPolicy};
pub use http::{AttemptOutcome, HttpGet, HttpResponse, ReqwestGet};
pub use rate_gate::RateGate;
pub use worker::{parallel_op, ParallelSummary, ShutdownFlag};
