use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use crate::error::RendererError;

const BUILTIN: &str = include_str!("../pipelines/entity.wgsl");

/// WGSL source of the entity pipeline. Both stages live in one module and
/// must be called `vs_main` and `fs_main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    label: String,
    source: Cow<'static, str>,
}

impl Shader {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RendererError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| RendererError::Shader {
            path: PathBuf::from(path),
            source,
        })?;
        log::info!("loaded shader {}", path.display());
        Ok(Self {
            label: path.display().to_string(),
            source: Cow::Owned(source),
        })
    }

    /// The file at `path` if there is one, the built-in shader otherwise.
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self, RendererError> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn descriptor(&self) -> wgpu::ShaderModuleDescriptor<'_> {
        wgpu::ShaderModuleDescriptor {
            label: Some(&self.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&self.source)),
        }
    }
}

impl Default for Shader {
    fn default() -> Self {
        Self {
            label: String::from("entity.wgsl"),
            source: Cow::Borrowed(BUILTIN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shader_has_both_entry_points() {
        let shader = Shader::default();
        assert!(shader.source().contains("fn vs_main"));
        assert!(shader.source().contains("fn fs_main"));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = Shader::from_file("does/not/exist.wgsl").unwrap_err();
        match err {
            RendererError::Shader { path, .. } => {
                assert_eq!(path, PathBuf::from("does/not/exist.wgsl"))
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn no_path_falls_back_to_the_builtin() {
        let shader = Shader::from_optional_file(None).unwrap();
        assert_eq!(shader, Shader::default());
    }
}
