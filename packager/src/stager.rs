//! Module staging.
//!
//! Copies each configured module's compiled class from the Manager build
//! output into the staging directory. Every source is located before the
//! first copy, so a missing module aborts the run with nothing staged.

use crate::error::{PackagerError, Result};
use crate::module_name::ModuleName;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// A module whose compiled class has been located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    /// The module this class belongs to.
    pub module: ModuleName,
    /// Location of the compiled class file.
    pub class_path: Utf8PathBuf,
}

/// Handles staging of compiled module classes.
pub struct Stager {
    project_root: Utf8PathBuf,
    staging_dir: Utf8PathBuf,
}

impl Stager {
    /// Create a stager copying from `project_root` into `staging_dir`.
    #[must_use]
    pub fn new(project_root: &Utf8Path, staging_dir: &Utf8Path) -> Self {
        Self {
            project_root: project_root.to_owned(),
            staging_dir: staging_dir.to_owned(),
        }
    }

    /// Locate the compiled class of `module`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::MissingArtifact`] if the class file does not
    /// exist.
    pub fn locate(&self, module: &ModuleName) -> Result<ModuleSource> {
        let class_path = module.source_path(&self.project_root);
        if !class_path.is_file() {
            return Err(PackagerError::MissingArtifact {
                module: module.clone(),
                path: class_path,
            });
        }
        Ok(ModuleSource {
            module: module.clone(),
            class_path,
        })
    }

    /// Copy one located class into the staging directory.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::MissingArtifact`] if the class disappeared
    /// since it was located, or [`PackagerError::Stage`] if the copy fails.
    pub fn stage(&self, source: &ModuleSource) -> Result<Utf8PathBuf> {
        let dest_path = self.staging_dir.join(source.module.class_file_name());

        fs::copy(&source.class_path, &dest_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound if !source.class_path.exists() => {
                PackagerError::MissingArtifact {
                    module: source.module.clone(),
                    path: source.class_path.clone(),
                }
            }
            _ => PackagerError::Stage {
                module: source.module.clone(),
                reason: format!("cannot copy {} to {dest_path}: {e}", source.class_path),
            },
        })?;

        log::debug!("staged {} -> {dest_path}", source.class_path);
        Ok(dest_path)
    }

    /// Stage every module, in order.
    ///
    /// All sources are located first; the first missing one fails the whole
    /// batch before anything is copied.
    ///
    /// # Errors
    ///
    /// Returns an error if any module is missing or any copy fails.
    pub fn stage_all(&self, modules: &[ModuleName]) -> Result<Vec<Utf8PathBuf>> {
        let sources = modules
            .iter()
            .map(|m| self.locate(m))
            .collect::<Result<Vec<_>>>()?;
        sources.iter().map(|s| self.stage(s)).collect()
    }

    /// Return the staging directory.
    #[must_use]
    pub fn staging_dir(&self) -> &Utf8Path {
        &self.staging_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Layout {
        _temp: TempDir,
        root: Utf8PathBuf,
        staging: Utf8PathBuf,
    }

    impl Layout {
        fn compile(&self, module: &str) {
            let path = ModuleName::from(module).source_path(&self.root);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(&path, format!("class {module}")).expect("write class");
        }
    }

    #[fixture]
    fn layout() -> Layout {
        let temp = TempDir::new().expect("temp dir");
        let base = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf8");
        let root = base.join("backend");
        let staging = base.join("staging");
        fs::create_dir_all(&root).expect("root");
        fs::create_dir_all(&staging).expect("staging");
        Layout {
            _temp: temp,
            root,
            staging,
        }
    }

    #[rstest]
    fn stage_all_copies_classes_in_order(layout: Layout) {
        layout.compile("PinModule");
        layout.compile("ExampleModule");
        let stager = Stager::new(&layout.root, &layout.staging);

        let staged = stager
            .stage_all(&[ModuleName::from("PinModule"), ModuleName::from("ExampleModule")])
            .expect("stage");

        assert_eq!(
            staged,
            vec![
                layout.staging.join("PinModule.class"),
                layout.staging.join("ExampleModule.class"),
            ]
        );
        let contents = fs::read_to_string(&staged[0]).expect("read staged");
        assert_eq!(contents, "class PinModule");
    }

    #[rstest]
    fn missing_module_aborts_before_any_copy(layout: Layout) {
        layout.compile("PinModule");
        let stager = Stager::new(&layout.root, &layout.staging);

        let err = stager
            .stage_all(&[ModuleName::from("PinModule"), ModuleName::from("ExampleModule")])
            .expect_err("ExampleModule is missing");

        match err {
            PackagerError::MissingArtifact { module, path } => {
                assert_eq!(module, ModuleName::from("ExampleModule"));
                assert!(path.ends_with("example/ExampleModule.class"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!layout.staging.join("PinModule.class").exists());
    }

    #[rstest]
    fn blocked_destination_names_the_module(layout: Layout) {
        layout.compile("PinModule");
        fs::create_dir(layout.staging.join("PinModule.class")).expect("blocking dir");
        let stager = Stager::new(&layout.root, &layout.staging);

        let err = stager
            .stage_all(&[ModuleName::from("PinModule")])
            .expect_err("destination is a directory");

        assert_eq!(err.stage(), "stage");
        assert!(matches!(
            err,
            PackagerError::Stage { ref module, .. } if module.as_str() == "PinModule"
        ));
        assert!(err.to_string().contains("PinModule"));
    }

    #[rstest]
    fn locate_reports_expected_path(layout: Layout) {
        let stager = Stager::new(&layout.root, &layout.staging);
        let err = stager
            .locate(&ModuleName::from("AuthorizationServerModule"))
            .expect_err("not compiled");
        assert!(err.to_string().contains("authorizationserver"));
    }
}
