//! Interpreter selection per language.

use std::path::{Path, PathBuf};

use super::Language;
use crate::{config::Settings, error::ExecError};

const PYTHON_CANDIDATES: &[&str] = &["python3", "python"];

/// Resolve the interpreter binary for `language`.
///
/// Python honours `PYTHON_INTERPRETER` and otherwise searches `PATH`; the
/// shell interpreter must exist at its configured path (default `/bin/bash`).
pub fn resolve(language: Language, settings: &Settings) -> Result<PathBuf, ExecError> {
    let found = match language {
        Language::Python => match &settings.python_interpreter {
            Some(explicit) => lookup(explicit),
            None => PYTHON_CANDIDATES
                .iter()
                .find_map(|name| lookup(Path::new(name))),
        },
        Language::Shell => lookup(&settings.shell_interpreter),
    };

    match found {
        Some(path) => {
            tracing::debug!(%language, interpreter = %path.display(), "resolved interpreter");
            Ok(path)
        }
        None => Err(ExecError::NoInterpreter {
            language: language.to_string(),
        }),
    }
}

/// Paths with a separator are checked as-is; bare names are searched on `PATH`.
fn lookup(program: &Path) -> Option<PathBuf> {
    which::which(program).ok()
}
