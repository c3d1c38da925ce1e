pub mod init_tracer;

pub use init_tracer::{
    init_global_filter_layer, init_panic_tracing_hook, init_stderr_layer,
    init_stderr_tracing, init_tracing, LogFilter, LogFilterLevel,
};
