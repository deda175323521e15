//! Version height: how many commits separate HEAD from the most recent
//! commit where the tracked `version.json` value changed.
//!
//! ```no_run
//! use git_height::{HeightResolver, ResolverOptions};
//! use git_repository::Repository;
//!
//! let repo = Repository::discover(".")?;
//! let resolution = HeightResolver::new(&repo, ResolverOptions::default())?.resolve()?;
//! println!("{}", resolution.formatted);
//! # Ok::<(), git_height::HeightError>(())
//! ```

mod error;
pub mod format;
mod resolver;
pub mod version_file;

pub use error::HeightError;
pub use format::format_version;
pub use resolver::{
    HeightResolver, Resolution, ResolverOptions, TreeMemo, DEFAULT_VERSION_FILE,
};
