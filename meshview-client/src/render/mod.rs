//! Scene rendering: the shader sources shipped with the viewer, the GPU
//! scene and the textured-quad presenter.

use std::path::Path;

use meshview_core::scene::{inject_defines, shader_defines};

pub mod quad;
pub mod scene;

pub const MESH_VERT: &str = include_str!("shaders/mesh/vert.glsl");
pub const MESH_FRAG: &str = include_str!("shaders/mesh/frag.glsl");
pub const NORMALS_FRAG: &str = include_str!("shaders/normals/frag.glsl");
pub const QUAD_VERT: &str = include_str!("shaders/quad/vert.glsl");
pub const QUAD_FRAG: &str = include_str!("shaders/quad/frag.glsl");

/// Reads the shader at `path`, or returns `embedded` when there is none.
pub fn read_source(path: Option<&Path>, embedded: &str) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => Ok(embedded.to_string()),
    }
}

/// Adds the host-side material and light constants to a shader source.
pub fn prepare_source(source: &str) -> String {
    inject_defines(source, &shader_defines())
}

/// Vertex and fragment sources of the scene programs, defines injected.
#[derive(Clone, Debug)]
pub struct SceneSources {
    pub vertex: String,
    pub fragment: String,
    /// Fragment stage of the normal-shading program.
    pub normals: String,
}

impl SceneSources {
    /// Embedded sources, overridden by whichever paths are given.
    pub fn load(vertex: Option<&Path>, fragment: Option<&Path>) -> std::io::Result<Self> {
        Ok(Self {
            vertex: prepare_source(&read_source(vertex, MESH_VERT)?),
            fragment: prepare_source(&read_source(fragment, MESH_FRAG)?),
            normals: prepare_source(NORMALS_FRAG),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn embedded_sources_get_defines_after_version() {
        let sources = SceneSources::load(None, None).unwrap();
        assert!(sources.fragment.starts_with("#version 330 core\n#define"));
        assert!(sources.fragment.contains("#define MAX_LIGHTS 16"));
        assert!(sources.vertex.contains("gl_PointSize = 10.0"));
    }

    #[test]
    fn paths_override_embedded_sources() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#version 330 core\nvoid main() {{}}").unwrap();
        let sources = SceneSources::load(None, Some(file.path())).unwrap();
        assert!(sources.fragment.contains("void main() {}"));
        assert!(!sources.fragment.contains("eval_brdfcos"));
        assert!(SceneSources::load(Some(Path::new("/nonexistent/mesh.vert")), None).is_err());
    }
}
