//! Alternates file parsing and recursive loading.
//!
//! The file `objects/info/alternates` contains one path per line,
//! pointing to other object directories. Each alternate is itself an
//! object store that may have its own alternates file (forming a chain).
//! Circular chains are detected and rejected. A directory reachable along
//! several chains is loaded once, under the first chain that reaches it.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{ObjectDatabase, OdbError, OdbOptions};

/// Maximum depth for recursive alternates loading (matches C git).
const MAX_ALTERNATES_DEPTH: usize = 5;

/// Load alternates for the given objects directory.
pub fn load_alternates(
    objects_dir: &Path,
    options: &OdbOptions,
) -> Result<Vec<ObjectDatabase>, OdbError> {
    let root = canonical(objects_dir);
    let mut walk = Walk {
        chain: vec![root.clone()],
        loaded: HashSet::from([root]),
    };
    load_recursive(objects_dir, options, &mut walk, 0)
}

struct Walk {
    /// Directories from the root down to the one being loaded.
    chain: Vec<PathBuf>,
    loaded: HashSet<PathBuf>,
}

fn load_recursive(
    objects_dir: &Path,
    options: &OdbOptions,
    walk: &mut Walk,
    depth: usize,
) -> Result<Vec<ObjectDatabase>, OdbError> {
    let paths = parse_alternates_file(objects_dir)?;
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    if depth >= MAX_ALTERNATES_DEPTH {
        return Err(OdbError::Alternates(format!(
            "alternates chain too deep (>{MAX_ALTERNATES_DEPTH} levels)"
        )));
    }

    let mut result = Vec::with_capacity(paths.len());
    for alt_path in paths {
        if !alt_path.is_dir() {
            warn!(path = %alt_path.display(), "ignoring missing alternate object directory");
            continue;
        }
        let key = canonical(&alt_path);
        if walk.chain.contains(&key) {
            return Err(OdbError::CircularAlternates(alt_path));
        }
        if !walk.loaded.insert(key.clone()) {
            debug!(path = %alt_path.display(), "alternate already loaded");
            continue;
        }
        debug!(path = %alt_path.display(), depth, "using alternate object directory");
        walk.chain.push(key);
        let nested = load_recursive(&alt_path, options, walk, depth + 1);
        walk.chain.pop();
        result.push(ObjectDatabase::with_alternates(alt_path, options.clone(), nested?));
    }
    Ok(result)
}

/// Read `<objects_dir>/info/alternates`.
///
/// Blank lines and `#` comments are skipped; relative paths are resolved
/// against `objects_dir`. A missing file yields no alternates.
pub fn parse_alternates_file(objects_dir: &Path) -> Result<Vec<PathBuf>, OdbError> {
    let path = objects_dir.join("info").join("alternates");
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(OdbError::Alternates(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| {
            if Path::new(l).is_absolute() {
                PathBuf::from(l)
            } else {
                objects_dir.join(l)
            }
        })
        .collect())
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
