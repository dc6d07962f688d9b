use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub(crate) fn find_executable(binary_name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if binary_name.trim().is_empty() {
        return None;
    }

    if binary_name.contains(std::path::MAIN_SEPARATOR) || binary_name.contains('/') {
        let absolute = PathBuf::from(binary_name);
        return absolute.is_file().then_some(absolute);
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    if let Some(path_var) = search_path {
        for dir in std::env::split_paths(path_var) {
            for name in executable_names(binary_name) {
                push_candidate_path(dir.join(&name), &mut candidates, &mut seen);
            }
        }
    }

    candidates
        .into_iter()
        .find(|candidate| is_executable_file(candidate))
}

fn executable_names(binary_name: &str) -> Vec<String> {
    if cfg!(windows) && Path::new(binary_name).extension().is_none() {
        vec![format!("{binary_name}.exe"), binary_name.to_string()]
    } else {
        vec![binary_name.to_string()]
    }
}

fn push_candidate_path(
    candidate: PathBuf,
    candidates: &mut Vec<PathBuf>,
    seen: &mut HashSet<String>,
) {
    let rendered = candidate.to_string_lossy().to_string();
    if rendered.is_empty() {
        return;
    }

    if seen.insert(rendered) {
        candidates.push(candidate);
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
