pub mod emitter;
pub mod particle;
