//! IO modules - side effects (processes, filesystem)

pub mod copy;
pub mod process;
