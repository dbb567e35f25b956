//! Script module loading.
//!
//! The main script compiles as a module; its engine-assigned script id maps
//! to the script's directory. The import resolver joins relative specifiers
//! to the referrer's recorded directory, reads and compiles the dependency,
//! registers it, and hands it back to the engine. Compile and read failures
//! inside the resolver surface as script exceptions; instantiation or
//! evaluation failure yields the captured stack trace string.

use core_types::{ExceptionKind, JsException, LoadError, ScriptId};
use script_engine::Engine;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Per-module metadata.
pub struct ModuleInfo {
    /// Base directory for relative import resolution.
    pub dir: PathBuf,
}

/// Registry of loaded modules keyed by engine script id.
#[derive(Default)]
pub struct ModuleLoader {
    modules: HashMap<ScriptId, ModuleInfo>,
}

impl ModuleLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded directory for a loaded module.
    pub fn dir_of(&self, id: ScriptId) -> Option<&Path> {
        self.modules.get(&id).map(|m| m.dir.as_path())
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module has been loaded.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Loads the main script: compile as module, register its directory,
    /// instantiate with the import resolver, evaluate.
    pub fn load_main(
        &mut self,
        engine: &mut dyn Engine,
        path: &Path,
    ) -> Result<ScriptId, LoadError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| LoadError::MainScript(format!("cannot read {}: {}", path.display(), e)))?;
        let origin = path.to_string_lossy().into_owned();
        let id = engine
            .compile_module(&origin, &source)
            .map_err(classify_compile_error)?;
        let dir = parent_dir(path);
        self.modules.insert(id, ModuleInfo { dir });
        info!(script = %origin, id, "main module compiled");

        let modules = &mut self.modules;
        let mut resolver = |engine: &mut dyn Engine, referrer: ScriptId, specifier: &str| {
            resolve_import(modules, engine, referrer, specifier)
        };
        engine
            .instantiate_module(id, &mut resolver)
            .map_err(LoadError::MainScript)?;
        engine.evaluate_module(id).map_err(LoadError::MainScript)?;
        Ok(id)
    }
}

/// Resolver callback: absolute specifiers load directly, relative ones join
/// the referrer's directory.
fn resolve_import(
    modules: &mut HashMap<ScriptId, ModuleInfo>,
    engine: &mut dyn Engine,
    referrer: ScriptId,
    specifier: &str,
) -> Result<ScriptId, JsException> {
    let path = if Path::new(specifier).is_absolute() {
        PathBuf::from(specifier)
    } else {
        let base = modules
            .get(&referrer)
            .map(|m| m.dir.clone())
            .unwrap_or_default();
        base.join(specifier)
    };

    let source = std::fs::read_to_string(&path).map_err(|e| {
        JsException::new(
            ExceptionKind::ReferenceError,
            format!("cannot load module '{}': {}", path.display(), e),
        )
    })?;
    let id = engine.compile_module(&path.to_string_lossy(), &source)?;
    modules.insert(
        id,
        ModuleInfo {
            dir: parent_dir(&path),
        },
    );
    debug!(specifier, referrer, id, "import resolved");
    Ok(id)
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn classify_compile_error(exception: JsException) -> LoadError {
    if exception.kind == ExceptionKind::SyntaxError {
        LoadError::Parse(exception)
    } else {
        LoadError::Compile(exception)
    }
}
