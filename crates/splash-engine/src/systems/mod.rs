pub mod dirty;
pub mod emitter;
pub mod perf;
pub mod pool;
pub mod quality;
pub mod spatial;
