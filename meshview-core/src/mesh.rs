//! Mesh data as handed over to the renderer.
//!
//! Meshes are plain triangle lists with per-vertex attributes. Loading is
//! delegated to [`tobj`]; this module only converts its output and fills in
//! missing normals.

use std::path::{Path, PathBuf};

use glam::{UVec3, Vec2, Vec3};

/// Errors that can occur while loading a mesh.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("{0} contains no triangles")]
    Empty(PathBuf),
    #[error("triangle {triangle} references vertex {index} but only {count} exist")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        count: usize,
    },
}

/// A triangle mesh with optional attributes.
///
/// `normals` and `texcoords` are either empty or have one entry per position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub triangles: Vec<UVec3>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub material: Option<usize>,
}

/// Surface description read alongside a mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshMaterial {
    pub name: String,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub opacity: f32,
    pub diffuse_texture: Option<PathBuf>,
    pub normal_texture: Option<PathBuf>,
}

impl Default for MeshMaterial {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::splat(0.04),
            shininess: 32.0,
            opacity: 1.0,
            diffuse_texture: None,
            normal_texture: None,
        }
    }
}

impl MeshMaterial {
    /// Converts the Phong shininess exponent into a roughness value.
    pub fn roughness(&self) -> f32 {
        (2.0 / (self.shininess.max(0.0) + 2.0)).sqrt()
    }
}

/// Everything read from a single mesh file.
#[derive(Clone, Debug, Default)]
pub struct MeshFile {
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MeshMaterial>,
}

impl MeshData {
    /// Makes sure the mesh has per-vertex normals, computing them if absent.
    pub fn ensure_normals(&mut self) {
        if self.normals.len() != self.positions.len() {
            self.normals = compute_normals(&self.triangles, &self.positions);
        }
    }

    /// Checks that every triangle references existing vertices.
    pub fn validate(&self) -> Result<(), MeshError> {
        let count = self.positions.len();
        for (triangle, t) in self.triangles.iter().enumerate() {
            for index in t.to_array() {
                if index as usize >= count {
                    return Err(MeshError::IndexOutOfRange {
                        triangle,
                        index,
                        count,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Computes per-vertex normals by accumulating area-weighted face normals.
///
/// Vertices whose incident triangles all have zero area end up with a NaN
/// normal. Triangles referencing missing vertices are ignored; see
/// [`MeshData::validate`].
pub fn compute_normals(triangles: &[UVec3], positions: &[Vec3]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for t in triangles {
        let (a, b, c) = (t.x as usize, t.y as usize, t.z as usize);
        let (Some(pa), Some(pb), Some(pc)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        // The cross product length is twice the area, which gives the weighting.
        let normal = (*pb - *pa).cross(*pc - *pa);
        normals[a] += normal;
        normals[b] += normal;
        normals[c] += normal;
    }
    for normal in &mut normals {
        *normal /= normal.length();
    }
    normals
}

/// Loads all models of an OBJ file, triangulated and with a single index
/// buffer per model.
pub fn load_obj(path: impl AsRef<Path>) -> Result<MeshFile, MeshError> {
    let path = path.as_ref();
    let (models, materials) =
        tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|source| MeshError::Load {
            path: path.to_path_buf(),
            source,
        })?;

    let base = path.parent().unwrap_or(Path::new("."));
    let materials = match materials {
        Ok(materials) => materials
            .into_iter()
            .map(|m| MeshMaterial {
                name: m.name,
                diffuse: m.diffuse.map(Vec3::from).unwrap_or(Vec3::splat(0.8)),
                specular: m.specular.map(Vec3::from).unwrap_or(Vec3::splat(0.04)),
                shininess: m.shininess.unwrap_or(32.0),
                opacity: m.dissolve.unwrap_or(1.0),
                diffuse_texture: m.diffuse_texture.map(|t| base.join(t)),
                normal_texture: m.normal_texture.map(|t| base.join(t)),
            })
            .collect(),
        Err(err) => {
            log::warn!("ignoring materials of {}: {}", path.display(), err);
            Vec::new()
        }
    };

    let mut meshes = Vec::with_capacity(models.len());
    for model in models {
        let mesh = model.mesh;
        let mut data = MeshData {
            name: model.name,
            triangles: mesh
                .indices
                .chunks_exact(3)
                .map(|t| UVec3::new(t[0], t[1], t[2]))
                .collect(),
            positions: mesh
                .positions
                .chunks_exact(3)
                .map(Vec3::from_slice)
                .collect(),
            normals: mesh.normals.chunks_exact(3).map(Vec3::from_slice).collect(),
            texcoords: mesh
                .texcoords
                .chunks_exact(2)
                .map(Vec2::from_slice)
                .collect(),
            material: mesh.material_id.filter(|id| *id < materials.len()),
        };
        if data.triangles.is_empty() {
            continue;
        }
        data.validate()?;
        data.ensure_normals();
        if data.texcoords.len() != data.positions.len() {
            data.texcoords.clear();
        }
        meshes.push(data);
    }

    if meshes.is_empty() {
        return Err(MeshError::Empty(path.to_path_buf()));
    }

    log::info!(
        "loaded {} ({} meshes, {} materials)",
        path.display(),
        meshes.len(),
        materials.len()
    );
    Ok(MeshFile { meshes, materials })
}

/// Axis aligned bounds of a point set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Returns `None` for an empty point set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(
            Self {
                min: first,
                max: first,
            },
            |b, p| Self {
                min: b.min.min(*p),
                max: b.max.max(*p),
            },
        ))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn single_triangle_normals_match_face_normal() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 3.0, 1.0),
        ];
        let triangles = vec![UVec3::new(0, 1, 2)];
        let normals = compute_normals(&triangles, &positions);

        let expected = (positions[1] - positions[0])
            .cross(positions[2] - positions[0])
            .normalize();
        assert_eq!(normals.len(), 3);
        for normal in normals {
            assert!((normal - expected).length() < 1e-6);
        }
    }

    #[test]
    fn larger_faces_weigh_more() {
        // Two triangles sharing vertex 0, one much larger and tilted.
        let positions = vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, 0.0),
        ];
        let triangles = vec![UVec3::new(0, 1, 2), UVec3::new(0, 3, 4)];
        let normals = compute_normals(&triangles, &positions);
        assert!(normals[0].y > 0.99);
    }

    #[test]
    fn degenerate_star_yields_nan() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0];
        let normals = compute_normals(&[UVec3::new(0, 1, 2)], &positions);
        assert!(normals[0].is_nan());
    }

    #[test]
    fn normals_ignore_dangling_triangles() {
        let mut mesh = MeshData {
            triangles: vec![UVec3::new(0, 1, 2), UVec3::new(0, 1, 7)],
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            ..Default::default()
        };
        mesh.ensure_normals();
        assert_eq!(mesh.normals, vec![Vec3::Z; 3]);
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_indices() {
        let mesh = MeshData {
            triangles: vec![UVec3::new(0, 1, 5)],
            positions: vec![Vec3::ZERO; 3],
            ..Default::default()
        };
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn load_obj_computes_missing_normals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4").unwrap();
        drop(file);

        let loaded = load_obj(&path).unwrap();
        assert_eq!(loaded.meshes.len(), 1);
        let mesh = &loaded.meshes[0];
        assert_eq!(mesh.triangles.len(), 2);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        for normal in &mesh.normals {
            assert!((*normal - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn bounds_of_points() {
        let points = [Vec3::new(-1.0, 2.0, 0.0), Vec3::new(3.0, -2.0, 1.0)];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.center(), Vec3::new(1.0, 0.0, 0.5));
        assert_eq!(bounds.size(), Vec3::new(4.0, 4.0, 1.0));
        assert!(Bounds::from_points(&[] as &[Vec3]).is_none());
    }
}
