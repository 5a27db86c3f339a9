pub mod archive;
pub mod assemble;
pub mod chainload;
pub mod classify;
pub mod compile;
pub mod error;
pub mod freeze;
pub mod inject;
pub mod io;
pub mod layout;
pub mod manifest;
pub mod packager;
pub mod synth;

pub mod reporter;

pub use archive::{ArchiveEntry, ArchiveReader, ArchiveWriter};
pub use chainload::{ChainloadPlan, ChainloadPolicy, Chainloader};
pub use classify::{Classifier, RuntimeProfile};
pub use compile::{CommandCompiler, CompileError, Compiler};
pub use error::{PackagingError, Result};
pub use freeze::{CommandFreezer, FreezeOutput, FreezeRequest, Freezer};
pub use inject::{EntryPoint, LoaderMode, NoTransplant, ResourceTransplanter};
pub use layout::DistLayout;
pub use manifest::BootstrapManifest;
pub use packager::{Packager, PackagingReport};
pub use reporter::{NullReporter, Reporter};
pub use synth::{BootstrapLogic, synthesize};
