//! Back end writers: debug dump, public interface file and C source.

mod c_emitter;
mod dump;
mod import_emitter;

pub use c_emitter::CEmitter;
pub use dump::DumpWriter;
pub use import_emitter::ImportEmitter;
