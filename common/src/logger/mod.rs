pub mod init;
pub mod trace_id;

pub use init::init_logger;
pub use trace_id::TraceId;
