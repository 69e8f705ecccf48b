//! Scene descriptors shared by the renderer and the widget layer.
//!
//! These types carry no GPU state. Shapes and textures are referenced by
//! index into the renderer's own collections.

use glam::{Mat4, Vec3, Vec4};

use crate::mesh::MeshMaterial;

/// Maximum number of lights the scene shader accepts.
pub const MAX_LIGHTS: usize = 16;

/// Shading model selected per material.
///
/// The discriminant is the integer tag the fragment shader dispatches on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MaterialKind {
    /// Emission only, no lighting.
    Emission = 0,
    /// Lambertian diffuse.
    Diffuse = 1,
    /// Diffuse plus a GGX microfacet lobe, metallic/roughness textures.
    #[default]
    MetallicRoughness = 2,
    /// Diffuse plus a Blinn-Phong microfacet lobe, specular/glossiness textures.
    SpecularGlossiness = 3,
}

impl MaterialKind {
    pub const ALL: [Self; 4] = [
        Self::Emission,
        Self::Diffuse,
        Self::MetallicRoughness,
        Self::SpecularGlossiness,
    ];

    /// Integer tag passed as the `mat_type` uniform.
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Name of the preprocessor constant for this kind.
    pub fn define_name(self) -> &'static str {
        match self {
            Self::Emission => "MATERIAL_EMISSION",
            Self::Diffuse => "MATERIAL_DIFFUSE",
            Self::MetallicRoughness => "MATERIAL_METALLIC_ROUGHNESS",
            Self::SpecularGlossiness => "MATERIAL_SPECULAR_GLOSSINESS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Emission => "emission",
            Self::Diffuse => "diffuse",
            Self::MetallicRoughness => "metallic/roughness",
            Self::SpecularGlossiness => "specular/glossiness",
        }
    }
}

/// Light type tag passed in the `ltype` uniform array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LightKind {
    #[default]
    Point = 0,
    Directional = 1,
}

impl LightKind {
    pub const ALL: [Self; 2] = [Self::Point, Self::Directional];

    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn define_name(self) -> &'static str {
        match self {
            Self::Point => "LIGHT_POINT",
            Self::Directional => "LIGHT_DIRECTIONAL",
        }
    }
}

/// `#define` block matching the host-side tags, for injection into shader
/// sources right after the `#version` line.
pub fn shader_defines() -> String {
    let mut defines = String::new();
    for kind in MaterialKind::ALL {
        defines.push_str(&format!("#define {} {}\n", kind.define_name(), kind.tag()));
    }
    for kind in LightKind::ALL {
        defines.push_str(&format!("#define {} {}\n", kind.define_name(), kind.tag()));
    }
    defines.push_str(&format!("#define MAX_LIGHTS {}\n", MAX_LIGHTS));
    defines
}

/// Inserts `defines` after the `#version` directive of `source`, or at the
/// top if there is none.
pub fn inject_defines(source: &str, defines: &str) -> String {
    let mut out = String::with_capacity(source.len() + defines.len());
    match source.find("#version") {
        Some(start) => {
            let line_end = source[start..]
                .find('\n')
                .map(|i| start + i + 1)
                .unwrap_or(source.len());
            out.push_str(&source[..line_end]);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(defines);
            out.push_str(&source[line_end..]);
        }
        None => {
            out.push_str(defines);
            out.push_str(source);
        }
    }
    out
}

/// Material texture slots and their fixed texture units.
///
/// Unit 4 is reserved and never bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Emission,
    Diffuse,
    Metallic,
    Roughness,
    Normal,
}

impl TextureSlot {
    pub const ALL: [Self; 5] = [
        Self::Emission,
        Self::Diffuse,
        Self::Metallic,
        Self::Roughness,
        Self::Normal,
    ];

    pub fn unit(self) -> u32 {
        match self {
            Self::Emission => 0,
            Self::Diffuse => 1,
            Self::Metallic => 2,
            Self::Roughness => 3,
            Self::Normal => 5,
        }
    }

    /// Sampler uniform name.
    pub fn sampler(self) -> &'static str {
        match self {
            Self::Emission => "mat_ke_txt",
            Self::Diffuse => "mat_kd_txt",
            Self::Metallic => "mat_ks_txt",
            Self::Roughness => "mat_rs_txt",
            Self::Normal => "mat_norm_txt",
        }
    }

    /// Uniform flag telling the shader whether the sampler is bound.
    pub fn enabled_flag(self) -> &'static str {
        match self {
            Self::Emission => "mat_ke_txt_on",
            Self::Diffuse => "mat_kd_txt_on",
            Self::Metallic => "mat_ks_txt_on",
            Self::Roughness => "mat_rs_txt_on",
            Self::Normal => "mat_norm_txt_on",
        }
    }
}

/// Surface parameters of an instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub emission: Vec3,
    pub diffuse: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub emission_map: Option<usize>,
    pub diffuse_map: Option<usize>,
    pub metallic_map: Option<usize>,
    pub roughness_map: Option<usize>,
    pub normal_map: Option<usize>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kind: MaterialKind::default(),
            emission: Vec3::ZERO,
            diffuse: Vec3::splat(0.8),
            metallic: 0.0,
            roughness: 0.5,
            opacity: 1.0,
            emission_map: None,
            diffuse_map: None,
            metallic_map: None,
            roughness_map: None,
            normal_map: None,
        }
    }
}

impl Material {
    /// Texture index bound to `slot`, if any.
    pub fn map(&self, slot: TextureSlot) -> Option<usize> {
        match slot {
            TextureSlot::Emission => self.emission_map,
            TextureSlot::Diffuse => self.diffuse_map,
            TextureSlot::Metallic => self.metallic_map,
            TextureSlot::Roughness => self.roughness_map,
            TextureSlot::Normal => self.normal_map,
        }
    }

    /// Builds a material from an OBJ material. Texture indices are assigned
    /// by the caller once the images are uploaded.
    pub fn from_mesh_material(material: &MeshMaterial) -> Self {
        Self {
            kind: MaterialKind::MetallicRoughness,
            diffuse: material.diffuse,
            metallic: material.specular.max_element().clamp(0.0, 1.0),
            roughness: material.roughness(),
            opacity: material.opacity,
            ..Default::default()
        }
    }
}

/// A light source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// Position for point lights, direction towards the light otherwise.
    pub position: Vec3,
    pub emission: Vec3,
}

impl Light {
    /// A pair of directional lights used when the scene provides none.
    pub fn default_rig() -> Vec<Self> {
        vec![
            Self {
                kind: LightKind::Directional,
                position: Vec3::new(1.0, 1.0, 1.0),
                emission: Vec3::splat(0.8),
            },
            Self {
                kind: LightKind::Directional,
                position: Vec3::new(-1.0, 0.5, -0.5),
                emission: Vec3::splat(0.3),
            },
        ]
    }
}

/// A shape placed in the world with a material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub frame: Mat4,
    pub shape: usize,
    pub material: usize,
    pub highlighted: bool,
}

impl Instance {
    pub fn new(shape: usize, material: usize) -> Self {
        Self {
            frame: Mat4::IDENTITY,
            shape,
            material,
            highlighted: false,
        }
    }
}

/// Per-frame scene drawing options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawParams {
    pub camera: usize,
    pub background: Vec4,
    pub exposure: f32,
    pub gamma: f32,
    pub eyelight: bool,
    pub wireframe: bool,
    /// Edge overlay. Not supported by the current renderer.
    pub edges: bool,
    pub double_sided: bool,
    /// Whether instance frames may contain scale or shear.
    pub non_rigid_frames: bool,
    pub near: f32,
    pub far: f32,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            camera: 0,
            background: Vec4::new(0.15, 0.15, 0.15, 1.0),
            exposure: 0.0,
            gamma: 2.2,
            eyelight: false,
            wireframe: false,
            edges: false,
            double_sided: true,
            non_rigid_frames: true,
            near: 0.01,
            far: 10000.0,
        }
    }
}

impl DrawParams {
    /// Normal transform for an instance frame.
    pub fn normal_matrix(&self, frame: Mat4) -> Mat4 {
        if self.non_rigid_frames {
            frame.inverse().transpose()
        } else {
            frame
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_units_skip_four() {
        let units: Vec<u32> = TextureSlot::ALL.iter().map(|s| s.unit()).collect();
        assert_eq!(units, vec![0, 1, 2, 3, 5]);
    }

    #[test]
    fn defines_follow_version_line() {
        let source = "#version 330\nvoid main() {}\n";
        let out = inject_defines(source, &shader_defines());
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("#version 330"));
        assert_eq!(lines.next(), Some("#define MATERIAL_EMISSION 0"));
        assert!(out.contains("#define MATERIAL_SPECULAR_GLOSSINESS 3"));
        assert!(out.contains("#define LIGHT_DIRECTIONAL 1"));
        assert!(out.ends_with("void main() {}\n"));
    }

    #[test]
    fn defines_without_version_go_first() {
        let out = inject_defines("void main() {}", "#define A 1\n");
        assert_eq!(out, "#define A 1\nvoid main() {}");
    }

    #[test]
    fn material_map_lookup() {
        let material = Material {
            normal_map: Some(3),
            ..Default::default()
        };
        assert_eq!(material.map(TextureSlot::Normal), Some(3));
        assert_eq!(material.map(TextureSlot::Diffuse), None);
    }

    #[test]
    fn rigid_frames_skip_inverse() {
        let frame = Mat4::from_scale(Vec3::splat(2.0));
        let params = DrawParams {
            non_rigid_frames: false,
            ..Default::default()
        };
        assert_eq!(params.normal_matrix(frame), frame);
        let params = DrawParams::default();
        assert!(params
            .normal_matrix(frame)
            .abs_diff_eq(Mat4::from_scale(Vec3::splat(0.5)), 1e-6));
    }
}
