//! Directory packaging.
//!
//! [`PackagingDriver`] walks a source tree depth-first, classifies every file
//! once into an [`AssetKind`] and routes it to an [`EmbedSink`]: an archive
//! (through the splitter) or a mirrored directory.
//!
//! Script compile failures are local to the file: the file is skipped, the
//! diagnostics are logged and its siblings are still processed. Any I/O
//! failure aborts the walk.

mod asset_kind;
mod driver;
mod sink;

pub use asset_kind::AssetKind;
pub use driver::{PackagingDriver, SourceFile, WalkStats, collect_files, locator_for};
pub use sink::EmbedSink;
