// codegen/mod.rs — Script generation for satellite-processing requests

mod template;

use chrono::{Local, Utc};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("Failed to create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write script file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Inputs substituted into the generated script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRequest {
    pub input_folder: String,
    pub output_folder: String,
    pub shapefile_path: String,
    pub region: String,
}

impl Default for ScriptRequest {
    fn default() -> Self {
        Self {
            input_folder: "/path/to/satellite/images".to_string(),
            output_folder: "/path/to/output".to_string(),
            shapefile_path: "/path/to/region_boundaries.shp".to_string(),
            region: "Region boundaries".to_string(),
        }
    }
}

impl ScriptRequest {
    /// Default paths, labelled with the region the user mentioned.
    pub fn for_region(region: Option<&str>) -> Self {
        match region.map(str::trim).filter(|r| !r.is_empty()) {
            Some(region) => Self {
                region: format!("{} boundaries", region),
                ..Self::default()
            },
            None => Self::default(),
        }
    }
}

pub trait ScriptGenerator: Send + Sync {
    /// Render and save a script, returning where it was written.
    fn generate(&self, request: &ScriptRequest, output_dir: &Path) -> Result<PathBuf, CodegenError>;
}

/// Writes a PyQGIS NDVI + clip script from a fixed template.
#[derive(Debug, Default, Clone, Copy)]
pub struct PyqgisTemplateWriter;

impl PyqgisTemplateWriter {
    pub fn render(&self, request: &ScriptRequest) -> String {
        template::PYQGIS_NDVI
            .replace("@DATE@", &Local::now().format("%Y-%m-%d").to_string())
            .replace("@INPUT_FOLDER@", &request.input_folder)
            .replace("@OUTPUT_FOLDER@", &request.output_folder)
            .replace("@SHAPEFILE_PATH@", &request.shapefile_path)
            .replace("@REGION@", &request.region)
    }
}

impl ScriptGenerator for PyqgisTemplateWriter {
    fn generate(
        &self,
        request: &ScriptRequest,
        output_dir: &Path,
    ) -> Result<PathBuf, CodegenError> {
        fs::create_dir_all(output_dir).map_err(|source| CodegenError::CreateDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let filename = format!(
            "pyqgis_satellite_processing_{}.py",
            Utc::now().timestamp_millis()
        );
        let path = output_dir.join(filename);

        fs::write(&path, self.render(request)).map_err(|source| CodegenError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::info!("Codegen: wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_script_into_created_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("nested").join("scripts");

        let path = PyqgisTemplateWriter
            .generate(&ScriptRequest::for_region(Some("Amhara")), &output_dir)
            .unwrap();

        assert!(path.starts_with(&output_dir));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("pyqgis_satellite_processing_"));
        assert!(name.ends_with(".py"));

        let script = fs::read_to_string(&path).unwrap();
        assert!(script.contains("Amhara boundaries"));
        assert!(script.contains("/path/to/satellite/images"));
        assert!(script.contains("(nir@1 - red@1) / (nir@1 + red@1)"));
    }

    #[test]
    fn render_replaces_every_placeholder() {
        let request = ScriptRequest {
            input_folder: "/data/in".into(),
            output_folder: "/data/out".into(),
            shapefile_path: "/data/zones.shp".into(),
            region: "Rift Valley".into(),
        };
        let script = PyqgisTemplateWriter.render(&request);

        let markers = [
            "@DATE@",
            "@INPUT_FOLDER@",
            "@OUTPUT_FOLDER@",
            "@SHAPEFILE_PATH@",
            "@REGION@",
        ];
        for marker in markers {
            assert!(!script.contains(marker), "{} left in script", marker);
        }
        assert!(script.contains(r#"INPUT_FOLDER = r"/data/in""#));
    }

    #[test]
    fn blank_region_uses_defaults() {
        assert_eq!(ScriptRequest::for_region(Some("  ")), ScriptRequest::default());
        assert_eq!(ScriptRequest::for_region(None).region, "Region boundaries");
    }

    #[test]
    fn unwritable_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let err = PyqgisTemplateWriter
            .generate(&ScriptRequest::default(), &blocker.join("sub"))
            .unwrap_err();
        assert!(matches!(err, CodegenError::CreateDir { .. }));
    }
}
