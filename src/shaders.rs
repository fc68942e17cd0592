//! GLSL sources, variant keys and program compilation.
//!
//! Every program is built from the same five stage sources. What differs
//! between variants is a block of `#define`s inserted right after the
//! `#version` line:
//!
//! | Define                    | Effect                                        |
//! |---------------------------|-----------------------------------------------|
//! | *(none)*                  | one view per draw, picked by `fallbackViewId` |
//! | `STEREO_SPS`              | second position via `gl_SecondaryPositionNV`  |
//! | `STEREO_MVR`, `MVR_VIEWS` | view picked by `gl_ViewID_OVR`                |
//! | `USE_GEOMETRY_SHADER`     | geometry stage is the last pre-raster stage   |
//! | `USE_TESSELLATION_SHADER` | tessellation stages are present               |
//!
//! All shaders target GLSL 4.50 core.

use std::collections::HashMap;
use std::fmt;

use glow::HasContext;

use crate::capabilities::Capabilities;
use crate::error::{Error, Result};
use crate::settings::{MultiViewSettings, RenderMode, ViewCount};
use crate::torus::{ATTRIB_NORMAL, ATTRIB_POSITION};
use crate::uniforms::{MAX_VIEWS, OBJECT_BINDING, SCENE_BINDING};

/// Explicit uniform location of `fallbackViewId`.
pub const FALLBACK_VIEW_LOCATION: u32 = 2;

/// Vertices per patch when the tessellation stages are active.
pub const PATCH_VERTICES: i32 = 3;

/// Uniform blocks, view selection and noise, shared by every stage.
///
/// # Uniform blocks
///
/// | Block          | Binding | Rust type                                             |
/// |----------------|---------|-------------------------------------------------------|
/// | `sceneBuffer`  | 1       | [`SceneUniformBlock`](crate::SceneUniformBlock)       |
/// | `objectBuffer` | 2       | [`ObjectUniformBlock`](crate::ObjectUniformBlock)     |
pub const COMMON_SRC: &str = r"
struct SceneData {
    mat4 viewMatrix[MAX_VIEWS];
    mat4 projMatrix[MAX_VIEWS];
    mat4 viewProjMatrix[MAX_VIEWS];
    vec4 eyePosWorld[MAX_VIEWS];
    vec4 lightPosWorld;
    float objectScale;
    float projNear;
    float projFar;
    int fragmentLoad;
};

struct ObjectData {
    mat4 model;
    mat4 modelView;
    mat4 modelViewIT;
    mat4 modelViewProj;
    vec3 color;
};

layout(std140, binding = UBO_SCENE) uniform sceneBuffer {
    SceneData scene;
};

layout(std140, binding = UBO_OBJECT) uniform objectBuffer {
    ObjectData object;
};

#if defined(STEREO_MVR)
#define VIEW_ID int(gl_ViewID_OVR)
#elif defined(STEREO_SPS)
#define VIEW_ID 0
#else
layout(location = OFFSET_FALLBACK_ID) uniform int fallbackViewId;
#define VIEW_ID fallbackViewId
#endif

// Writes the clip position(s) of a world-space point. Only valid in the
// last stage before rasterization.
#if defined(STEREO_SPS)
#define EMIT_POSITION(world)                                      \
    gl_Position = scene.viewProjMatrix[0] * (world);              \
    gl_SecondaryPositionNV = scene.viewProjMatrix[1] * (world);   \
    gl_Layer = 0
#else
#define EMIT_POSITION(world) gl_Position = scene.viewProjMatrix[VIEW_ID] * (world)
#endif

float hash13(vec3 p) {
    p = fract(p * 0.1031);
    p += dot(p, p.zyx + 31.32);
    return fract((p.x + p.y) * p.z);
}

float valueNoise(vec3 p) {
    vec3 i = floor(p);
    vec3 f = fract(p);
    f = f * f * (3.0 - 2.0 * f);
    return mix(
        mix(mix(hash13(i), hash13(i + vec3(1, 0, 0)), f.x),
            mix(hash13(i + vec3(0, 1, 0)), hash13(i + vec3(1, 1, 0)), f.x), f.y),
        mix(mix(hash13(i + vec3(0, 0, 1)), hash13(i + vec3(1, 0, 1)), f.x),
            mix(hash13(i + vec3(0, 1, 1)), hash13(i + vec3(1, 1, 1)), f.x), f.y),
        f.z);
}
";

/// Vertex stage: object to world space. Emits the clip position itself when
/// no later pre-raster stage is present.
pub const VERTEX_SRC: &str = r"
layout(location = VERTEX_POS) in vec3 inPosition;
layout(location = VERTEX_NORMAL) in vec3 inNormal;

#if defined(STEREO_MVR)
layout(num_views = MVR_VIEWS) in;
#endif

#if !defined(USE_GEOMETRY_SHADER) && !defined(USE_TESSELLATION_SHADER)
#define LAST_PRE_RASTER_STAGE
#endif

#if defined(STEREO_SPS) && defined(LAST_PRE_RASTER_STAGE)
layout(secondary_view_offset = 1) out highp int gl_Layer;
#endif

layout(location = 0) out vec3 outWorldPos;
layout(location = 1) out vec3 outWorldNormal;

void main() {
    vec4 world = object.model * vec4(inPosition, 1.0);
    outWorldPos = world.xyz;
    outWorldNormal = normalize(mat3(object.model) * inNormal);
#if defined(LAST_PRE_RASTER_STAGE)
    EMIT_POSITION(world);
#endif
}
";

/// Tessellation control stage: pass-through with a fixed subdivision level.
pub const TESS_CONTROL_SRC: &str = r"
layout(vertices = 3) out;

layout(location = 0) in vec3 inWorldPos[];
layout(location = 1) in vec3 inWorldNormal[];
layout(location = 0) out vec3 outWorldPos[];
layout(location = 1) out vec3 outWorldNormal[];

const float TESS_LEVEL = 4.0;

void main() {
    outWorldPos[gl_InvocationID] = inWorldPos[gl_InvocationID];
    outWorldNormal[gl_InvocationID] = inWorldNormal[gl_InvocationID];
    if (gl_InvocationID == 0) {
        gl_TessLevelInner[0] = TESS_LEVEL;
        gl_TessLevelOuter[0] = TESS_LEVEL;
        gl_TessLevelOuter[1] = TESS_LEVEL;
        gl_TessLevelOuter[2] = TESS_LEVEL;
    }
}
";

/// Tessellation evaluation stage: displaces the subdivided surface along its
/// normal by 3D noise.
pub const TESS_EVALUATION_SRC: &str = r"
layout(triangles, equal_spacing, ccw) in;

layout(location = 0) in vec3 inWorldPos[];
layout(location = 1) in vec3 inWorldNormal[];
layout(location = 0) out vec3 outWorldPos;
layout(location = 1) out vec3 outWorldNormal;

#if defined(STEREO_SPS) && !defined(USE_GEOMETRY_SHADER)
layout(secondary_view_offset = 1) out highp int gl_Layer;
#endif

void main() {
    vec3 pos = gl_TessCoord.x * inWorldPos[0]
             + gl_TessCoord.y * inWorldPos[1]
             + gl_TessCoord.z * inWorldPos[2];
    vec3 normal = normalize(gl_TessCoord.x * inWorldNormal[0]
                          + gl_TessCoord.y * inWorldNormal[1]
                          + gl_TessCoord.z * inWorldNormal[2]);

    float bump = valueNoise(pos * 8.0 / max(scene.objectScale, 1e-4)) - 0.5;
    pos += normal * bump * 0.08 * scene.objectScale;

    outWorldPos = pos;
    outWorldNormal = normal;
#if !defined(USE_GEOMETRY_SHADER)
    EMIT_POSITION(vec4(pos, 1.0));
#endif
}
";

/// Geometry stage: re-emits each triangle and adds a spike along its
/// geometric normal.
pub const GEOMETRY_SRC: &str = r"
layout(triangles) in;
layout(triangle_strip, max_vertices = 6) out;

layout(location = 0) in vec3 inWorldPos[];
layout(location = 1) in vec3 inWorldNormal[];
layout(location = 0) out vec3 outWorldPos;
layout(location = 1) out vec3 outWorldNormal;

#if defined(STEREO_SPS)
layout(secondary_view_offset = 1) out highp int gl_Layer;
#endif

void emitWorld(vec3 pos, vec3 normal) {
    outWorldPos = pos;
    outWorldNormal = normal;
    EMIT_POSITION(vec4(pos, 1.0));
    EmitVertex();
}

void main() {
    for (int i = 0; i < 3; ++i) {
        emitWorld(inWorldPos[i], inWorldNormal[i]);
    }
    EndPrimitive();

    vec3 a = inWorldPos[0];
    vec3 b = inWorldPos[1];
    vec3 c = inWorldPos[2];
    vec3 n = normalize(cross(b - a, c - a));
    vec3 center = (a + b + c) / 3.0;
    float len = 0.15 * scene.objectScale;

    emitWorld(mix(center, a, 0.2), n);
    emitWorld(mix(center, b, 0.2), n);
    emitWorld(center + n * len, n);
    EndPrimitive();
}
";

/// Fragment stage: Blinn-Phong plus a noise loop whose trip count is the
/// fragment workload factor.
pub const FRAGMENT_SRC: &str = r"
layout(location = 0) in vec3 inWorldPos;
layout(location = 1) in vec3 inWorldNormal;
layout(location = 0) out vec4 outColor;

#if defined(STEREO_SPS)
#define FRAG_VIEW_ID gl_Layer
#else
#define FRAG_VIEW_ID VIEW_ID
#endif

void main() {
    int view = FRAG_VIEW_ID;

    vec3 n = normalize(inWorldNormal);
    if (!gl_FrontFacing) {
        n = -n;
    }
    vec3 l = normalize(scene.lightPosWorld.xyz - inWorldPos);
    vec3 v = normalize(scene.eyePosWorld[view].xyz - inWorldPos);
    vec3 h = normalize(l + v);

    float diffuse = max(dot(n, l), 0.0);
    float specular = pow(max(dot(n, h), 0.0), 32.0);

    int load = max(scene.fragmentLoad, 1);
    float grain = 0.0;
    for (int i = 0; i < load; ++i) {
        grain += valueNoise(inWorldPos * (40.0 + float(i)) / max(scene.objectScale, 1e-4));
    }
    grain /= float(load);

    vec3 color = object.color * (0.2 + 0.8 * diffuse) * (0.9 + 0.1 * grain);
    outColor = vec4(color + vec3(0.5 * specular), 1.0);
}
";

/// Which define set a program is compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderVariant {
    /// One view per draw.
    Fallback,
    /// `GL_NV_stereo_view_rendering`, two views.
    SinglePassStereo,
    /// `GL_OVR_multiview2`, two views.
    MultiviewTwo,
    /// `GL_OVR_multiview2`, four views.
    MultiviewQuad,
}

impl ShaderVariant {
    /// Every variant.
    pub const ALL: [Self; 4] = [
        Self::Fallback,
        Self::SinglePassStereo,
        Self::MultiviewTwo,
        Self::MultiviewQuad,
    ];

    fn defines(self) -> &'static str {
        match self {
            Self::Fallback => "",
            Self::SinglePassStereo => "#define STEREO_SPS\n",
            Self::MultiviewTwo => "#define STEREO_MVR\n#define MVR_VIEWS 2\n",
            Self::MultiviewQuad => "#define STEREO_MVR\n#define MVR_VIEWS 4\n",
        }
    }

    /// Whether this variant renders through `GL_OVR_multiview2`.
    pub fn is_multiview(self) -> bool {
        matches!(self, Self::MultiviewTwo | Self::MultiviewQuad)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Fallback => "fallback",
            Self::SinglePassStereo => "single-pass-stereo",
            Self::MultiviewTwo => "multiview-2",
            Self::MultiviewQuad => "multiview-4",
        }
    }
}

/// Identifies one of the sixteen program slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    /// Render path defines.
    pub variant: ShaderVariant,
    /// Geometry stage present.
    pub geometry: bool,
    /// Tessellation stages present.
    pub tessellation: bool,
}

impl ProgramKey {
    /// The program the given (validated) settings draw with.
    pub fn for_settings(settings: &MultiViewSettings) -> Self {
        let variant = match (settings.render_mode, settings.view_count) {
            (RenderMode::SoftwareFallback, _) => ShaderVariant::Fallback,
            (RenderMode::SinglePassStereo, _) => ShaderVariant::SinglePassStereo,
            (RenderMode::MultiViewRendering, ViewCount::Two) => ShaderVariant::MultiviewTwo,
            (RenderMode::MultiViewRendering, ViewCount::Quad) => ShaderVariant::MultiviewQuad,
        };
        Self {
            variant,
            geometry: settings.use_geometry_shader,
            tessellation: settings.use_tessellation_shader,
        }
    }

    /// The keys worth compiling on hardware with `caps`.
    pub fn supported(caps: &Capabilities) -> Vec<Self> {
        let mut keys = Vec::with_capacity(16);
        for variant in ShaderVariant::ALL {
            let (available, stages) = match variant {
                ShaderVariant::Fallback => (true, true),
                ShaderVariant::SinglePassStereo => (caps.single_pass_stereo, true),
                ShaderVariant::MultiviewTwo | ShaderVariant::MultiviewQuad => {
                    (caps.multiview, caps.multiview_tessellation_geometry)
                }
            };
            if !available {
                continue;
            }
            for (geometry, tessellation) in
                [(false, false), (true, false), (false, true), (true, true)]
            {
                if (geometry || tessellation) && !stages {
                    continue;
                }
                keys.push(Self {
                    variant,
                    geometry,
                    tessellation,
                });
            }
        }
        keys
    }

    /// Full source of one stage of this program.
    pub fn stage_source(&self, stage: u32) -> String {
        let stage_src = match stage {
            glow::VERTEX_SHADER => VERTEX_SRC,
            glow::TESS_CONTROL_SHADER => TESS_CONTROL_SRC,
            glow::TESS_EVALUATION_SHADER => TESS_EVALUATION_SRC,
            glow::GEOMETRY_SHADER => GEOMETRY_SRC,
            _ => FRAGMENT_SRC,
        };

        let mut defines = String::from(self.variant.defines());
        if self.geometry {
            defines.push_str("#define USE_GEOMETRY_SHADER\n");
        }
        if self.tessellation {
            defines.push_str("#define USE_TESSELLATION_SHADER\n");
        }

        // Multi-view outside the vertex stage needs its own extension.
        let multiview_stages =
            if self.variant.is_multiview() && (self.geometry || self.tessellation) {
                "#extension GL_EXT_multiview_tessellation_geometry_shader : require\n"
            } else {
                ""
            };

        format!(
            "#version 450 core\n\
             {defines}\
             #if defined(STEREO_MVR)\n\
             #extension GL_OVR_multiview2 : require\n\
             {multiview_stages}\
             #endif\n\
             #if defined(STEREO_SPS)\n\
             #extension GL_NV_viewport_array2 : require\n\
             #extension GL_NV_stereo_view_rendering : require\n\
             #endif\n\
             #define MAX_VIEWS {MAX_VIEWS}\n\
             #define VERTEX_POS {ATTRIB_POSITION}\n\
             #define VERTEX_NORMAL {ATTRIB_NORMAL}\n\
             #define UBO_SCENE {SCENE_BINDING}\n\
             #define UBO_OBJECT {OBJECT_BINDING}\n\
             #define OFFSET_FALLBACK_ID {FALLBACK_VIEW_LOCATION}\n\
             {COMMON_SRC}\n{stage_src}"
        )
    }

    /// Shader stages linked into this program, in pipeline order.
    pub fn stages(&self) -> Vec<u32> {
        let mut stages = vec![glow::VERTEX_SHADER];
        if self.tessellation {
            stages.push(glow::TESS_CONTROL_SHADER);
            stages.push(glow::TESS_EVALUATION_SHADER);
        }
        if self.geometry {
            stages.push(glow::GEOMETRY_SHADER);
        }
        stages.push(glow::FRAGMENT_SHADER);
        stages
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variant.name())?;
        if self.tessellation {
            f.write_str("+ts")?;
        }
        if self.geometry {
            f.write_str("+gs")?;
        }
        Ok(())
    }
}

/// A linked program and its cached uniform locations.
pub struct CompiledProgram {
    /// Program handle.
    pub program: glow::Program,
    /// `fallbackViewId`, present only in fallback programs.
    pub fallback_view: Option<glow::UniformLocation>,
}

/// Every program the current hardware can run, keyed by [`ProgramKey`].
pub struct ProgramTable {
    programs: HashMap<ProgramKey, CompiledProgram>,
}

impl ProgramTable {
    /// Compile every variant in [`ProgramKey::supported`].
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns the first compile or link failure. Programs built before the
    /// failure are deleted.
    pub unsafe fn compile_all(gl: &glow::Context, caps: &Capabilities) -> Result<Self> {
        let mut table = Self {
            programs: HashMap::new(),
        };
        for key in ProgramKey::supported(caps) {
            match unsafe { compile_program(gl, key) } {
                Ok(program) => {
                    let fallback_view = if key.variant == ShaderVariant::Fallback {
                        unsafe { gl.get_uniform_location(program, "fallbackViewId") }
                    } else {
                        None
                    };
                    table.programs.insert(
                        key,
                        CompiledProgram {
                            program,
                            fallback_view,
                        },
                    );
                }
                Err(err) => {
                    unsafe { table.destroy(gl) };
                    return Err(err);
                }
            }
        }
        tracing::info!(programs = table.programs.len(), "shader programs compiled");
        Ok(table)
    }

    /// Look up a program. `None` for variants the hardware cannot run.
    pub fn get(&self, key: &ProgramKey) -> Option<&CompiledProgram> {
        self.programs.get(key)
    }

    /// Number of compiled programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether nothing was compiled.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Delete every program.
    ///
    /// # Safety
    ///
    /// Requires the creating context to be current. The table must not be
    /// used afterwards.
    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        for (_, compiled) in self.programs.drain() {
            unsafe { gl.delete_program(compiled.program) };
        }
    }
}

/// Compile and link the program identified by `key`.
///
/// The compiled shader objects are detached and deleted after successful
/// linking, so only the program handle needs to be cleaned up by the caller.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns [`Error::Shader`] with the driver log if any stage fails to
/// compile or the program fails to link.
pub unsafe fn compile_program(gl: &glow::Context, key: ProgramKey) -> Result<glow::Program> {
    let program = unsafe { gl.create_program() }.map_err(|e| Error::gl_object("program", e))?;

    let mut shaders = Vec::new();
    for stage in key.stages() {
        match unsafe { compile_shader(gl, stage, &key.stage_source(stage)) } {
            Ok(shader) => shaders.push(shader),
            Err(log) => unsafe {
                for shader in shaders {
                    gl.delete_shader(shader);
                }
                gl.delete_program(program);
                return Err(Error::Shader { key, log });
            },
        }
    }

    unsafe {
        for &shader in &shaders {
            gl.attach_shader(program, shader);
        }
        gl.link_program(program);

        let linked = gl.get_program_link_status(program);
        let log = if linked {
            String::new()
        } else {
            gl.get_program_info_log(program)
        };

        // Shaders can be detached and deleted once linking is done.
        for shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        if !linked {
            gl.delete_program(program);
            return Err(Error::Shader {
                key,
                log: format!("link error: {log}"),
            });
        }
    }

    tracing::debug!(%key, "program linked");
    Ok(program)
}

/// Compile a single shader stage from source.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> std::result::Result<glow::Shader, String> {
    unsafe {
        let shader = gl.create_shader(shader_type)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(format!("{} compile error: {log}", stage_name(shader_type)));
        }

        Ok(shader)
    }
}

fn stage_name(stage: u32) -> &'static str {
    match stage {
        glow::VERTEX_SHADER => "vertex",
        glow::TESS_CONTROL_SHADER => "tessellation control",
        glow::TESS_EVALUATION_SHADER => "tessellation evaluation",
        glow::GEOMETRY_SHADER => "geometry",
        _ => "fragment",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_caps() -> Capabilities {
        Capabilities {
            single_pass_stereo: true,
            multiview: true,
            multiview_multisample: true,
            multiview_tessellation_geometry: true,
            multiview_timer_query: true,
        }
    }

    #[test]
    fn full_hardware_compiles_all_sixteen_slots() {
        let keys = ProgramKey::supported(&all_caps());
        assert_eq!(keys.len(), 16);
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 16);
    }

    #[test]
    fn plain_multiview_skips_extra_stages() {
        let caps = Capabilities {
            single_pass_stereo: false,
            multiview_tessellation_geometry: false,
            ..all_caps()
        };
        let keys = ProgramKey::supported(&caps);
        // 4 fallback + 1 per multiview variant.
        assert_eq!(keys.len(), 6);
        assert!(keys
            .iter()
            .filter(|k| k.variant != ShaderVariant::Fallback)
            .all(|k| !k.geometry && !k.tessellation));
    }

    #[test]
    fn validated_settings_always_have_a_program() {
        use crate::settings::{RenderMode, ViewCount};

        let caps = Capabilities {
            single_pass_stereo: true,
            multiview: true,
            multiview_tessellation_geometry: false,
            ..Default::default()
        };
        let keys = ProgramKey::supported(&caps);
        for render_mode in RenderMode::ALL {
            for view_count in [ViewCount::Two, ViewCount::Quad] {
                for (g, t) in [(false, false), (true, false), (false, true), (true, true)] {
                    let settings = MultiViewSettings {
                        use_geometry_shader: g,
                        use_tessellation_shader: t,
                        view_count,
                        render_mode,
                        multisample: false,
                    }
                    .validated(&caps);
                    assert!(keys.contains(&ProgramKey::for_settings(&settings)), "{settings:?}");
                }
            }
        }
    }

    #[test]
    fn multiview_key_tracks_view_count() {
        let settings = MultiViewSettings {
            render_mode: RenderMode::MultiViewRendering,
            view_count: ViewCount::Quad,
            use_tessellation_shader: true,
            ..Default::default()
        };
        let key = ProgramKey::for_settings(&settings);
        assert_eq!(key.variant, ShaderVariant::MultiviewQuad);
        assert!(key.tessellation && !key.geometry);
        assert_eq!(key.to_string(), "multiview-4+ts");
    }

    #[test]
    fn stages_are_in_pipeline_order() {
        let key = ProgramKey {
            variant: ShaderVariant::Fallback,
            geometry: true,
            tessellation: true,
        };
        assert_eq!(
            key.stages(),
            vec![
                glow::VERTEX_SHADER,
                glow::TESS_CONTROL_SHADER,
                glow::TESS_EVALUATION_SHADER,
                glow::GEOMETRY_SHADER,
                glow::FRAGMENT_SHADER,
            ]
        );
    }

    #[test]
    fn sources_start_with_version_and_carry_defines() {
        let key = ProgramKey {
            variant: ShaderVariant::MultiviewQuad,
            geometry: true,
            tessellation: false,
        };
        let src = key.stage_source(glow::VERTEX_SHADER);
        assert!(src.starts_with("#version 450 core\n"));
        assert!(src.contains("#define MVR_VIEWS 4\n"));
        assert!(src.contains("#define USE_GEOMETRY_SHADER\n"));
        assert!(!src.contains("#define USE_TESSELLATION_SHADER"));
        assert!(src.contains("#define OFFSET_FALLBACK_ID 2\n"));
        assert!(src.contains("layout(num_views = MVR_VIEWS) in;"));
    }

    #[test]
    fn multiview_extra_stages_enable_their_extension() {
        const DIRECTIVE: &str =
            "#extension GL_EXT_multiview_tessellation_geometry_shader : require\n";
        let with_geometry = ProgramKey {
            variant: ShaderVariant::MultiviewQuad,
            geometry: true,
            tessellation: false,
        };
        let with_tessellation = ProgramKey {
            variant: ShaderVariant::MultiviewTwo,
            geometry: false,
            tessellation: true,
        };
        for stage in with_geometry.stages() {
            assert!(with_geometry.stage_source(stage).contains(DIRECTIVE));
        }
        assert!(with_tessellation
            .stage_source(glow::TESS_EVALUATION_SHADER)
            .contains(DIRECTIVE));

        let plain = ProgramKey {
            geometry: false,
            ..with_geometry
        };
        assert!(!plain.stage_source(glow::VERTEX_SHADER).contains(DIRECTIVE));
        let fallback = ProgramKey {
            variant: ShaderVariant::Fallback,
            ..with_geometry
        };
        assert!(!fallback.stage_source(glow::GEOMETRY_SHADER).contains(DIRECTIVE));
    }

    #[test]
    fn fallback_source_has_no_extension_defines() {
        let key = ProgramKey {
            variant: ShaderVariant::Fallback,
            geometry: false,
            tessellation: false,
        };
        let src = key.stage_source(glow::FRAGMENT_SHADER);
        assert!(!src.contains("#define STEREO_"));
    }
}
