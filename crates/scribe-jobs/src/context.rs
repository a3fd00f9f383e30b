use std::path::{Path, PathBuf};

/// Declared artifacts and priority of one job.
///
/// Input and output lists are ordered sets: adding a path twice keeps the
/// first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    input_paths: Vec<PathBuf>,
    output_paths: Vec<PathBuf>,
    priority: i32,
}

impl Context {
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn with_input(mut self, path: impl AsRef<Path>) -> Self {
        push_unique(&mut self.input_paths, path.as_ref());
        self
    }

    pub fn with_inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            push_unique(&mut self.input_paths, path.as_ref());
        }
        self
    }

    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        push_unique(&mut self.output_paths, path.as_ref());
        self
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.input_paths
    }

    pub fn outputs(&self) -> &[PathBuf] {
        &self.output_paths
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Declared inputs that are not on disk right now.
    pub fn missing_inputs(&self) -> Vec<PathBuf> {
        self.input_paths
            .iter()
            .filter(|p| !p.exists())
            .cloned()
            .collect()
    }
}

fn push_unique(paths: &mut Vec<PathBuf>, path: &Path) {
    if !paths.iter().any(|p| p == path) {
        paths.push(path.to_path_buf());
    }
}
