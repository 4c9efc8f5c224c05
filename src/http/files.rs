//! Maps request paths onto files under the serving root.

use std::path::{Component, Path, PathBuf};

use tokio::fs::File;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    /// The path would leave the serving root
    #[error("path escapes the serving root")]
    Escapes,
}

/// Joins a request path onto `root`.
///
/// One leading `/` is stripped and the rest is used verbatim, except that
/// `..`, root and prefix components are refused.
pub fn resolve(root: &Path, request_path: &str) -> Result<PathBuf, PathError> {
    let relative = request_path.strip_prefix('/').unwrap_or(request_path);
    let relative = Path::new(relative);

    let escapes = relative.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(PathError::Escapes);
    }

    Ok(root.join(relative))
}

/// Outcome of looking up a request path.
#[derive(Debug)]
pub enum Lookup {
    Found { file: File, len: u64 },
    Missing,
    Forbidden,
}

/// Opens the regular file a request path names.
///
/// Directories and anything that cannot be opened count as missing.
pub async fn open(root: &Path, request_path: &str) -> Lookup {
    let path = match resolve(root, request_path) {
        Ok(path) => path,
        Err(PathError::Escapes) => return Lookup::Forbidden,
    };

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Cannot open file");
            return Lookup::Missing;
        }
    };

    match file.metadata().await {
        Ok(meta) if meta.is_file() => Lookup::Found {
            file,
            len: meta.len(),
        },
        _ => Lookup::Missing,
    }
}
