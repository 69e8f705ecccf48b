//! The viewer: owns the window, the scene and the widgets, and runs the
//! frame loop.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use anyhow::Context;
use glam::UVec2;
use meshview_core::dialog::{DialogId, DialogManager, FileDialogState, LogBuffer, MessageQueue};
use meshview_core::mesh::{MeshFile, load_obj};
use meshview_core::scene::{DrawParams, Instance, Light, Material};
use meshview_core::{Camera, FlyController, MoveKeys, ViewerConfig};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use crate::abs::{
    Callbacks, Capability, ErrorPolicy, GlContext, GpuResource, Program, ProgramSource,
    RenderTarget, Texture, Window,
};
use crate::other::UpdateContext;
use crate::render::SceneSources;
use crate::render::quad::ImageDrawer;
use crate::render::scene::{DrawStats, GpuScene, MeshArrays};
use crate::ui::Gui;
use crate::ui::panels::{self, PanelAction, ViewSettings};

const MESH_FILTER: &str = "*.obj";
const SHADER_FILTER: &str = "*.glsl;*.vert;*.frag";

/// Uploads an image file as a texture. Unreadable images are logged and
/// left out.
fn load_texture(gl: &Rc<GlContext>, scene: &mut GpuScene, path: &Path, srgb: bool) -> Option<usize> {
    let image = match image::open(path) {
        Ok(image) => image,
        Err(err) => {
            log::warn!("cannot read texture {}: {}", path.display(), err);
            return None;
        }
    };
    match Texture::from_image(gl, &image, srgb) {
        Ok(texture) => Some(scene.add_texture(texture)),
        Err(err) => {
            log::warn!("cannot upload texture {}: {}", path.display(), err);
            None
        }
    }
}

/// Builds a GPU scene from a loaded OBJ file: one instance per mesh, a
/// camera framing all of them and the default light rig.
pub fn build_scene(gl: &Rc<GlContext>, file: MeshFile) -> anyhow::Result<GpuScene> {
    let mut scene = GpuScene::default();
    for material in &file.materials {
        let mut converted = Material::from_mesh_material(material);
        converted.diffuse_map = material
            .diffuse_texture
            .as_deref()
            .and_then(|path| load_texture(gl, &mut scene, path, true));
        converted.normal_map = material
            .normal_texture
            .as_deref()
            .and_then(|path| load_texture(gl, &mut scene, path, false));
        scene.add_material(converted);
    }
    let fallback = scene.add_material(Material::default());

    scene.add_camera(Camera::framing(
        file.meshes.iter().flat_map(|mesh| mesh.positions.iter()),
    ));
    for light in Light::default_rig() {
        scene.add_light(light);
    }

    for mut mesh in file.meshes {
        mesh.validate()?;
        mesh.ensure_normals();
        let arrays = MeshArrays::from_mesh(&mesh);
        let shape = scene
            .add_shape(gl, arrays.shape_data())
            .with_context(|| format!("cannot upload mesh {}", mesh.name))?;
        scene.add_instance(Instance::new(shape, mesh.material.unwrap_or(fallback)));
    }
    Ok(scene)
}

/// Everything the callbacks and widgets act on.
pub struct ViewerState {
    gl: Rc<GlContext>,
    config: ViewerConfig,
    scene: GpuScene,
    mesh_program: Program,
    normals_program: Program,
    target: RenderTarget,
    presenter: ImageDrawer,
    fly: FlyController,
    settings: ViewSettings,
    stats: DrawStats,
    dialogs: DialogManager,
    messages: MessageQueue,
    log: LogBuffer,
    vertex_shader: Option<PathBuf>,
    fragment_shader: Option<PathBuf>,
    /// New window title, applied by the viewer at the end of the frame.
    title: Option<String>,
    quit: bool,
}

impl ViewerState {
    fn new(gl: &Rc<GlContext>, config: ViewerConfig, log: LogBuffer) -> anyhow::Result<Self> {
        let params = DrawParams {
            background: config.background_color(),
            exposure: config.exposure,
            gamma: config.gamma,
            eyelight: config.eyelight,
            double_sided: config.double_sided,
            near: config.near,
            far: config.far,
            ..Default::default()
        };
        let mut state = Self {
            gl: Rc::clone(gl),
            scene: GpuScene::default(),
            mesh_program: Program::default(),
            normals_program: Program::default(),
            target: RenderTarget::default(),
            presenter: ImageDrawer::new(gl).context("cannot build the image program")?,
            fly: FlyController::default(),
            settings: ViewSettings::new(params, config.offscreen),
            stats: DrawStats::default(),
            dialogs: DialogManager::new(),
            messages: MessageQueue::new(),
            log,
            vertex_shader: config.vertex_shader.clone(),
            fragment_shader: config.fragment_shader.clone(),
            title: None,
            quit: false,
            config,
        };
        state.load_programs(ErrorPolicy::Strict)?;
        Ok(state)
    }

    /// Rebuilds both scene programs from the current shader paths.
    ///
    /// Returns whether both programs were replaced.
    fn load_programs(&mut self, policy: ErrorPolicy) -> anyhow::Result<bool> {
        let sources = SceneSources::load(
            self.vertex_shader.as_deref(),
            self.fragment_shader.as_deref(),
        )
        .context("cannot read shader sources")?;
        let mesh = self.mesh_program.load(
            &self.gl,
            ProgramSource {
                vertex: &sources.vertex,
                fragment: &sources.fragment,
            },
            policy,
        )?;
        let normals = self.normals_program.load(
            &self.gl,
            ProgramSource {
                vertex: &sources.vertex,
                fragment: &sources.normals,
            },
            policy,
        )?;
        Ok(mesh && normals)
    }

    fn reload_shaders(&mut self) {
        match self.load_programs(ErrorPolicy::Soft) {
            Ok(true) => log::info!("reloaded shaders"),
            Ok(false) => self.messages.push("shader reload failed, see the log"),
            Err(err) => {
                log::error!("{:#}", err);
                self.messages.push(format!("{:#}", err));
            }
        }
    }

    fn load_mesh(&mut self, path: &Path) {
        let loaded = load_obj(path)
            .map_err(anyhow::Error::from)
            .and_then(|file| build_scene(&self.gl, file));
        match loaded {
            Ok(scene) => {
                log::info!(
                    "loaded {} ({} shapes, {} materials)",
                    path.display(),
                    scene.shapes.len(),
                    scene.materials.len()
                );
                self.scene = scene;
                self.settings.params.camera = 0;
                self.fly.stop();
                let name = path.file_name().unwrap_or(path.as_os_str());
                self.title = Some(format!("{} - {}", self.config.title, name.to_string_lossy()));
            }
            Err(err) => {
                log::error!("cannot open {}: {:#}", path.display(), err);
                self.messages
                    .push(format!("cannot open {}: {:#}", path.display(), err));
            }
        }
    }

    fn browse(&mut self, id: DialogId) {
        let filter = match id {
            DialogId::OpenMesh => MESH_FILTER,
            _ => SHADER_FILTER,
        };
        let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        self.dialogs
            .open_file(id, FileDialogState::new(dir, "", false, filter));
    }

    fn on_key(&mut self, keycode: Keycode) {
        if keycode == Keycode::Escape {
            self.quit = true;
        } else if keycode == Keycode::R {
            self.reload_shaders();
        } else if keycode == Keycode::F {
            self.settings.params.wireframe = !self.settings.params.wireframe;
        }
    }

    /// Orbit from the mouse, then the fly step from the held keys.
    fn update_camera(&mut self, ctx: &UpdateContext<'_>, pointer: bool, keyboard: bool) {
        let Some(camera) = self.scene.cameras.get_mut(self.settings.params.camera) else {
            return;
        };
        if pointer {
            let input = ctx.orbit_input(camera.focus);
            if !input.is_zero() {
                camera.orbit(input);
            }
        }
        let keys = if keyboard {
            ctx.keyboard.move_keys()
        } else {
            MoveKeys::default()
        };
        self.fly.step(&mut camera.frame, keys, ctx.delta_time);
    }

    fn draw(&mut self, size: UVec2) -> anyhow::Result<()> {
        let device = self.gl.device();
        // The widget painter changes these behind our back.
        device.set_capability(Capability::DepthTest, true);
        device.set_capability(Capability::Blend, true);
        device.set_capability(Capability::ProgramPointSize, true);

        let program = if self.settings.normals {
            &self.normals_program
        } else {
            &self.mesh_program
        };
        let params = &self.settings.params;
        if !self.settings.offscreen {
            self.stats = self.scene.draw(&self.gl, program, size, params)?;
            return Ok(());
        }

        self.target.resize(&self.gl, size)?;
        self.target.bind(())?;
        self.stats = self.scene.draw(&self.gl, program, size, params)?;
        self.target.unbind();

        device.viewport(size);
        device.clear(params.background);
        device.set_capability(Capability::CullFace, false);
        self.presenter.draw_fullscreen(self.target.color(), size)?;
        Ok(())
    }

    fn widgets(&mut self, ctx: &egui::Context, actions: &mut Vec<PanelAction>) {
        panels::parameter_panel(
            ctx,
            self.config.widgets_width,
            &mut self.settings,
            self.stats,
            actions,
        );
        let pickers: [(DialogId, fn(PathBuf) -> PanelAction); 3] = [
            (DialogId::OpenMesh, PanelAction::OpenMesh),
            (DialogId::OpenVertexShader, PanelAction::LoadVertexShader),
            (DialogId::OpenFragmentShader, PanelAction::LoadFragmentShader),
        ];
        for (id, action) in pickers {
            if let Some(path) = panels::file_dialog(ctx, &mut self.dialogs, id) {
                actions.push(action(path));
            }
        }
        panels::log_window(ctx, &mut self.settings, &self.log, actions);
        panels::message_modal(ctx, &mut self.dialogs, &self.messages);
    }

    fn apply(&mut self, action: PanelAction, window: &Window) {
        match action {
            PanelAction::Browse(id) => self.browse(id),
            PanelAction::OpenMesh(path) => self.load_mesh(&path),
            PanelAction::LoadVertexShader(path) => {
                self.vertex_shader = Some(path);
                self.reload_shaders();
            }
            PanelAction::LoadFragmentShader(path) => {
                self.fragment_shader = Some(path);
                self.reload_shaders();
            }
            PanelAction::ReloadShaders => self.reload_shaders(),
            PanelAction::CopyText(text) => window.set_clipboard(&text),
        }
    }
}

/// The interactive viewer.
pub struct Viewer {
    gui: Gui,
    state: ViewerState,
    callbacks: Callbacks<ViewerState>,
    // Dropped last so GPU resources above are released with a live context.
    window: Window,
}

impl Viewer {
    pub fn new(config: ViewerConfig, log: LogBuffer) -> anyhow::Result<Self> {
        let window = Window::new(&config.title, config.viewport_size())?;
        let gui = Gui::new(&window)?;
        let state = ViewerState::new(window.gl(), config, log)?;

        let mut callbacks = Callbacks::default();
        callbacks.on_drop = Some(Box::new(|state: &mut ViewerState, path: &Path| {
            state.load_mesh(path)
        }));
        callbacks.on_key = Some(Box::new(|state: &mut ViewerState, keycode, down| {
            if down {
                state.on_key(keycode);
            }
        }));

        Ok(Self {
            gui,
            state,
            callbacks,
            window,
        })
    }

    pub fn open(&mut self, path: &Path) {
        self.state.load_mesh(path);
    }

    /// Runs frames until the window is closed or Escape is pressed.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut last_frame_time = Instant::now();
        while !self.window.should_close() && !self.state.quit {
            let now = Instant::now();
            let delta_time = now.duration_since(last_frame_time).as_secs_f32();
            last_frame_time = now;
            self.frame(delta_time)?;
        }
        log::info!("closing viewer");
        Ok(())
    }

    fn frame(&mut self, delta_time: f32) -> anyhow::Result<()> {
        let events = self.window.poll_events(self.state.config.wait_events);
        let keyboard_to_gui = self.gui.wants_keyboard();
        for event in &events {
            self.gui.handle_event(event);
            let is_key = matches!(event, Event::KeyDown { .. } | Event::KeyUp { .. });
            if !(is_key && keyboard_to_gui) {
                self.callbacks.dispatch(&mut self.state, event);
            }
        }

        let ctx = UpdateContext::new(self.window.input(), delta_time);
        self.state
            .update_camera(&ctx, !self.gui.wants_pointer(), !keyboard_to_gui);

        self.state.draw(self.window.framebuffer_size().max(UVec2::ONE))?;

        let mut actions = Vec::new();
        let state = &mut self.state;
        self.gui
            .frame(&self.window, |ctx| state.widgets(ctx, &mut actions));
        for action in actions {
            self.state.apply(action, &self.window);
        }
        if let Some(title) = self.state.title.take() {
            self.window.set_title(&title);
        }
        self.window.set_text_input(self.gui.wants_keyboard());
        self.window.swap();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use glam::{UVec3, Vec3};
    use meshview_core::MeshData;
    use meshview_core::mesh::MeshError;

    use super::*;
    use crate::abs::testing::RecordingDevice;

    const TRIANGLES: &str = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o second
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";

    #[test]
    fn obj_file_becomes_instances_with_a_camera_and_lights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.obj");
        fs::write(&path, TRIANGLES).unwrap();

        let device = RecordingDevice::new();
        let gl = Rc::new(GlContext::new(device.clone()));
        let scene = build_scene(&gl, load_obj(&path).unwrap()).unwrap();

        assert_eq!(scene.shapes.len(), 2);
        assert_eq!(scene.instances.len(), 2);
        assert_eq!(scene.cameras.len(), 1);
        assert_eq!(scene.lights.len(), Light::default_rig().len());
        // No materials in the file, so both instances use the fallback.
        assert_eq!(scene.materials.len(), 1);
        assert!(scene.instances.iter().all(|instance| instance.material == 0));
        assert!(scene.shapes.iter().all(|shape| shape.is_allocated()));
    }

    #[test]
    fn dangling_indices_are_rejected() {
        let mesh = MeshData {
            name: "broken".to_string(),
            triangles: vec![UVec3::new(0, 1, 7)],
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            ..Default::default()
        };
        let file = MeshFile {
            meshes: vec![mesh],
            materials: Vec::new(),
        };

        let device = RecordingDevice::new();
        let gl = Rc::new(GlContext::new(device.clone()));
        let err = build_scene(&gl, file).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<MeshError>(),
            Some(MeshError::IndexOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn missing_textures_are_left_out() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tri.mtl"),
            "newmtl red\nKd 1 0 0\nmap_Kd missing.png\n",
        )
        .unwrap();
        let path = dir.path().join("tri.obj");
        fs::write(
            &path,
            "mtllib tri.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\n",
        )
        .unwrap();

        let device = RecordingDevice::new();
        let gl = Rc::new(GlContext::new(device.clone()));
        let scene = build_scene(&gl, load_obj(&path).unwrap()).unwrap();

        assert!(scene.textures.is_empty());
        assert_eq!(scene.materials.len(), 2);
        assert_eq!(scene.materials[0].diffuse_map, None);
        assert_eq!(scene.instances[0].material, 0);
    }
}
