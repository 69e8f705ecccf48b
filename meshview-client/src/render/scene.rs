//! The GPU side of a scene and the forward pass that draws it.

use std::rc::Rc;

use glam::{UVec2, Vec3, Vec4};
use meshview_core::scene::{DrawParams, Instance, Light, MAX_LIGHTS, Material, TextureSlot};
use meshview_core::{Camera, MeshData};

use crate::abs::device::Capability;
use crate::abs::shape::{COLOR, NORMAL, POSITION, TANGENT, TEXCOORD};
use crate::abs::{
    AttributeSource, GlContext, GlError, GpuResource, Primitive, Program, Shape, ShapeData,
    Texture, UniformValue,
};

/// Flattened vertex arrays of a mesh, ready for upload.
#[derive(Clone, Debug, Default)]
pub struct MeshArrays {
    positions: Vec<f32>,
    normals: Vec<f32>,
    texcoords: Vec<f32>,
    elements: Vec<u32>,
}

impl MeshArrays {
    pub fn from_mesh(mesh: &MeshData) -> Self {
        let flatten3 = |v: &[Vec3]| v.iter().flat_map(|p| p.to_array()).collect::<Vec<_>>();
        let count = mesh.positions.len();
        Self {
            positions: flatten3(&mesh.positions),
            normals: if mesh.normals.len() == count {
                flatten3(&mesh.normals)
            } else {
                Vec::new()
            },
            texcoords: if mesh.texcoords.len() == count {
                mesh.texcoords.iter().flat_map(|t| t.to_array()).collect()
            } else {
                Vec::new()
            },
            elements: mesh.triangles.iter().flat_map(|t| t.to_array()).collect(),
        }
    }

    /// Triangles when the mesh has faces, a point cloud otherwise. Missing
    /// attributes become constants.
    pub fn shape_data(&self) -> ShapeData<'_> {
        let normal = if self.normals.is_empty() {
            AttributeSource::Constant(Vec4::new(0.0, 0.0, 1.0, 0.0))
        } else {
            values(&self.normals, 3)
        };
        let texcoord = if self.texcoords.is_empty() {
            AttributeSource::Constant(Vec4::ZERO)
        } else {
            values(&self.texcoords, 2)
        };
        ShapeData {
            primitive: if self.elements.is_empty() {
                Primitive::Points
            } else {
                Primitive::Triangles
            },
            attributes: vec![
                (POSITION, values(&self.positions, 3)),
                (NORMAL, normal),
                (TEXCOORD, texcoord),
                (COLOR, AttributeSource::Constant(Vec4::ONE)),
                (TANGENT, AttributeSource::Constant(Vec4::new(1.0, 0.0, 0.0, 1.0))),
            ],
            elements: &self.elements,
            ..Default::default()
        }
    }
}

fn values(values: &[f32], components: u32) -> AttributeSource<'_> {
    AttributeSource::Values { values, components }
}

/// Counts from one scene draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub drawn: usize,
    /// Instances with a dangling shape or material index, or an empty shape.
    pub skipped: usize,
}

/// Shapes, textures, materials, instances, cameras and lights. Instances
/// reference shapes and materials by index; materials reference textures by
/// index.
#[derive(Default)]
pub struct GpuScene {
    pub shapes: Vec<Shape>,
    pub textures: Vec<Texture>,
    pub materials: Vec<Material>,
    pub instances: Vec<Instance>,
    pub cameras: Vec<Camera>,
    pub lights: Vec<Light>,
}

impl GpuScene {
    pub fn add_shape(&mut self, gl: &Rc<GlContext>, data: ShapeData<'_>) -> Result<usize, GlError> {
        let mut shape = Shape::default();
        shape.init(gl, data)?;
        self.shapes.push(shape);
        Ok(self.shapes.len() - 1)
    }

    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_instance(&mut self, instance: Instance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    /// Adds a light unless the shader's light arrays are full.
    pub fn add_light(&mut self, light: Light) -> Option<usize> {
        if self.lights.len() >= MAX_LIGHTS {
            log::warn!("ignoring light past the first {}", MAX_LIGHTS);
            return None;
        }
        self.lights.push(light);
        Some(self.lights.len() - 1)
    }

    /// Clears the bound framebuffer and draws every instance with `program`.
    ///
    /// Instances referencing missing shapes or materials are skipped. A
    /// missing camera skips the whole scene.
    pub fn draw(
        &self,
        gl: &GlContext,
        program: &Program,
        viewport: UVec2,
        params: &DrawParams,
    ) -> Result<DrawStats, GlError> {
        if params.edges {
            return Err(GlError::Unsupported("edge rendering"));
        }
        gl.device().viewport(viewport);
        gl.device().clear(params.background);

        let mut stats = DrawStats::default();
        let Some(camera) = self.cameras.get(params.camera) else {
            log::warn!("scene has no camera {}", params.camera);
            stats.skipped = self.instances.len();
            return Ok(stats);
        };

        program.set_uniforms(&[
            ("cam_pos", camera.frame.o.into()),
            ("cam_xform_inv", camera.view_matrix().into()),
            (
                "cam_proj",
                camera
                    .projection_matrix(viewport, params.near, params.far)
                    .into(),
            ),
            ("eyelight", params.eyelight.into()),
            ("exposure", params.exposure.into()),
            ("gamma", params.gamma.into()),
        ])?;
        if !params.eyelight {
            self.set_lights(program)?;
        }

        if params.wireframe {
            gl.device().set_wireframe(true);
        }
        gl.device().set_capability(Capability::CullFace, !params.double_sided);
        let drawn = self.draw_instances(program, params, &mut stats);
        if params.wireframe {
            gl.device().set_wireframe(false);
        }
        gl.use_program(None);
        drawn.map(|_| stats)
    }

    fn set_lights(&self, program: &Program) -> Result<(), GlError> {
        let count = self.lights.len().min(MAX_LIGHTS);
        let mut uniforms = vec![
            ("lamb".to_string(), UniformValue::Vec3(Vec3::ZERO)),
            ("lnum".to_string(), UniformValue::Int(count as i32)),
        ];
        for (i, light) in self.lights.iter().take(count).enumerate() {
            uniforms.push((format!("lpos[{}]", i), light.position.into()));
            uniforms.push((format!("lke[{}]", i), light.emission.into()));
            uniforms.push((format!("ltype[{}]", i), light.kind.tag().into()));
        }
        let uniforms: Vec<(&str, UniformValue)> = uniforms
            .iter()
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect();
        program.set_uniforms(&uniforms)
    }

    fn draw_instances(
        &self,
        program: &Program,
        params: &DrawParams,
        stats: &mut DrawStats,
    ) -> Result<(), GlError> {
        for instance in &self.instances {
            let shape = self
                .shapes
                .get(instance.shape)
                .filter(|shape| shape.is_allocated());
            let material = self.materials.get(instance.material);
            let (Some(shape), Some(material)) = (shape, material) else {
                stats.skipped += 1;
                continue;
            };

            let highlight = if instance.highlighted {
                Vec4::new(1.0, 1.0, 0.0, 1.0)
            } else {
                Vec4::ZERO
            };
            let faceted = shape.primitive() == Primitive::Triangles && !shape.has_buffer(NORMAL);
            program.set_uniforms(&[
                ("shape_xform", instance.frame.into()),
                (
                    "shape_xform_invtranspose",
                    params.normal_matrix(instance.frame).into(),
                ),
                ("shape_normal_offset", 0.0f32.into()),
                ("highlight", highlight.into()),
                ("elem_faceted", faceted.into()),
                ("mat_type", material.kind.tag().into()),
                ("mat_ke", material.emission.into()),
                ("mat_kd", material.diffuse.into()),
                ("mat_ks", Vec3::splat(material.metallic).into()),
                ("mat_rs", material.roughness.into()),
                ("mat_op", material.opacity.into()),
                ("mat_double_sided", params.double_sided.into()),
            ])?;
            for slot in TextureSlot::ALL {
                let texture = material.map(slot).and_then(|i| self.textures.get(i));
                program.set_texture(slot.sampler(), slot.enabled_flag(), texture, slot.unit())?;
            }
            shape.draw()?;
            stats.drawn += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{UVec3, Vec2};

    use super::*;
    use crate::abs::device::{DrawMode, TextureDesc, TextureFormat};
    use crate::abs::testing::{Call, RecordingDevice};
    use crate::abs::{ErrorPolicy, ProgramSource, TextureImage};

    const VERT: &str = "#version 330 core\nvoid main() {}\n";
    const FRAG: &str = "#version 330 core\nout vec4 c; void main() { c = vec4(1.0); }\n";

    fn triangle() -> MeshData {
        MeshData {
            triangles: vec![UVec3::new(0, 1, 2)],
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            ..Default::default()
        }
    }

    fn setup() -> (Arc<RecordingDevice>, Rc<GlContext>, Program, GpuScene) {
        let device = RecordingDevice::new();
        let gl = Rc::new(GlContext::new(device.clone()));
        let mut program = Program::default();
        program
            .load(
                &gl,
                ProgramSource {
                    vertex: VERT,
                    fragment: FRAG,
                },
                ErrorPolicy::Strict,
            )
            .unwrap();
        let mut scene = GpuScene::default();
        let arrays = MeshArrays::from_mesh(&triangle());
        scene.add_shape(&gl, arrays.shape_data()).unwrap();
        scene.add_material(Material::default());
        scene.add_camera(Camera::default());
        (device, gl, program, scene)
    }

    #[test]
    fn out_of_range_instances_are_skipped() {
        let (device, gl, program, mut scene) = setup();
        scene.add_instance(Instance::new(0, 0));
        scene.add_instance(Instance::new(7, 0));
        scene.add_instance(Instance::new(0, 3));
        scene.add_instance(Instance::new(0, 0));

        let stats = scene
            .draw(&gl, &program, UVec2::new(100, 100), &DrawParams::default())
            .unwrap();
        assert_eq!(stats, DrawStats { drawn: 2, skipped: 2 });
        assert_eq!(
            device.draws(),
            vec![
                Call::DrawElements {
                    mode: DrawMode::Triangles,
                    count: 3
                };
                2
            ]
        );
    }

    #[test]
    fn index_equal_to_length_is_out_of_range() {
        let (device, gl, program, mut scene) = setup();
        scene.add_instance(Instance::new(1, 0));
        scene.add_instance(Instance::new(0, 1));
        let stats = scene
            .draw(&gl, &program, UVec2::new(10, 10), &DrawParams::default())
            .unwrap();
        assert_eq!(stats.skipped, 2);
        assert!(device.draws().is_empty());
    }

    #[test]
    fn deleted_shapes_are_skipped() {
        let (device, gl, program, mut scene) = setup();
        scene.add_instance(Instance::new(0, 0));
        scene.shapes[0].delete();
        let stats = scene
            .draw(&gl, &program, UVec2::new(10, 10), &DrawParams::default())
            .unwrap();
        assert_eq!(stats, DrawStats { drawn: 0, skipped: 1 });
        assert!(device.draws().is_empty());
    }

    #[test]
    fn lights_fill_uniform_arrays() {
        let (device, gl, program, mut scene) = setup();
        for light in Light::default_rig() {
            scene.add_light(light);
        }
        scene.add_instance(Instance::new(0, 0));
        scene
            .draw(&gl, &program, UVec2::new(10, 10), &DrawParams::default())
            .unwrap();
        assert_eq!(device.uniform("lnum"), Some(UniformValue::Int(2)));
        assert_eq!(
            device.uniform("lpos[1]"),
            Some(UniformValue::Vec3(scene.lights[1].position))
        );
        assert_eq!(device.uniform("ltype[0]"), Some(UniformValue::Int(1)));
    }

    #[test]
    fn eyelight_skips_light_uniforms() {
        let (device, gl, program, mut scene) = setup();
        scene.add_light(Light::default_rig()[0]);
        let params = DrawParams {
            eyelight: true,
            ..Default::default()
        };
        scene.draw(&gl, &program, UVec2::new(10, 10), &params).unwrap();
        assert_eq!(device.uniform("lnum"), None);
        assert_eq!(device.uniform("eyelight"), Some(UniformValue::Bool(true)));
    }

    #[test]
    fn material_textures_use_fixed_units() {
        let (device, gl, program, mut scene) = setup();
        let mut texture = Texture::default();
        texture
            .init(
                &gl,
                TextureImage {
                    desc: TextureDesc::new(UVec2::new(2, 2), TextureFormat::Rgba8),
                    pixels: None,
                },
            )
            .unwrap();
        let index = scene.add_texture(texture);
        scene.materials[0].diffuse_map = Some(index);
        // A dangling texture index draws untextured.
        scene.materials[0].normal_map = Some(9);
        scene.add_instance(Instance::new(0, 0));
        device.clear_calls();

        scene
            .draw(&gl, &program, UVec2::new(10, 10), &DrawParams::default())
            .unwrap();
        assert!(device.calls().contains(&Call::ActiveTexture(1)));
        assert_eq!(device.uniform("mat_kd_txt"), Some(UniformValue::Int(1)));
        assert_eq!(device.uniform("mat_kd_txt_on"), Some(UniformValue::Bool(true)));
        assert_eq!(device.uniform("mat_norm_txt_on"), Some(UniformValue::Bool(false)));
        assert_eq!(device.draws().len(), 1);
    }

    #[test]
    fn wireframe_is_restored_after_drawing() {
        let (device, gl, program, mut scene) = setup();
        scene.add_instance(Instance::new(0, 0));
        let params = DrawParams {
            wireframe: true,
            ..Default::default()
        };
        scene.draw(&gl, &program, UVec2::new(10, 10), &params).unwrap();
        let toggles: Vec<Call> = device
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Wireframe(_)))
            .collect();
        assert_eq!(toggles, vec![Call::Wireframe(true), Call::Wireframe(false)]);
        assert_eq!(device.calls().last(), Some(&Call::UseProgram(None)));
    }

    #[test]
    fn edges_are_unsupported() {
        let (_device, gl, program, scene) = setup();
        let params = DrawParams {
            edges: true,
            ..Default::default()
        };
        assert!(matches!(
            scene.draw(&gl, &program, UVec2::new(10, 10), &params),
            Err(GlError::Unsupported(_))
        ));
    }

    #[test]
    fn missing_camera_skips_the_scene() {
        let (device, gl, program, mut scene) = setup();
        scene.add_instance(Instance::new(0, 0));
        let params = DrawParams {
            camera: 4,
            ..Default::default()
        };
        let stats = scene.draw(&gl, &program, UVec2::new(10, 10), &params).unwrap();
        assert_eq!(stats.skipped, 1);
        assert!(device.calls().contains(&Call::Clear(params.background)));
        assert!(device.draws().is_empty());
    }

    #[test]
    fn meshes_without_faces_draw_points() {
        let mesh = MeshData {
            positions: vec![Vec3::ZERO, Vec3::X],
            texcoords: vec![Vec2::ZERO, Vec2::ONE],
            ..Default::default()
        };
        let arrays = MeshArrays::from_mesh(&mesh);
        let data = arrays.shape_data();
        assert_eq!(data.primitive, Primitive::Points);
        assert!(data.elements.is_empty());
        assert!(matches!(
            data.attributes[2].1,
            AttributeSource::Values { components: 2, .. }
        ));
        assert!(matches!(data.attributes[1].1, AttributeSource::Constant(_)));
    }
}
