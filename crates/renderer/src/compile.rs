use std::borrow::Cow;

use tracing::{debug, warn};
use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::ShaderStage;

/// Uniform names the header provides; user declarations of these are dropped.
const PROVIDED_UNIFORMS: &[&str] = &["iResolution", "iGlobalTime", "iTime", "iMouse", "iChannel0"];

/// Parses and validates GLSL with naga, returning a rendered diagnostic on failure.
pub fn validate_glsl(source: &str, stage: ShaderStage) -> Result<(), String> {
    let module = Frontend::default()
        .parse(&Options::from(stage), source)
        .map_err(|errors| errors.emit_to_string(source))?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| error.emit_to_string(source))?;
    Ok(())
}

/// Wraps a user fragment shader and validates the result.
///
/// On failure the wrapped source is written next to the system temp files so
/// the diagnostic's line numbers can be matched against what naga saw.
pub fn prepare_fragment(source: &str) -> Result<String, String> {
    let wrapped = wrap_fragment(source);
    if let Err(diagnostic) = validate_glsl(&wrapped, ShaderStage::Fragment) {
        let dump = std::env::temp_dir().join("fragtoy_wrapped.frag");
        match std::fs::write(&dump, &wrapped) {
            Ok(()) => debug!(path = %dump.display(), "dumped wrapped fragment shader"),
            Err(err) => warn!(error = %err, "failed to dump wrapped fragment shader"),
        }
        return Err(diagnostic);
    }
    Ok(wrapped)
}

pub(crate) fn create_shader_module(
    device: &wgpu::Device,
    label: &str,
    source: String,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage,
            defines: &[],
        },
    })
}

/// Produces a self-contained GLSL 450 fragment shader from user code.
///
/// Two flavours are accepted. ShaderToy sources define `mainImage` and get a
/// generated `main` that calls it. Sources with their own `void main()` have it
/// renamed, their `out vec4` declaration aliased to our colour output, and any
/// `in vec2` varying aliased to the interpolated texture coordinate.
///
/// `#version` directives and declarations of [`PROVIDED_UNIFORMS`] are removed
/// so the header can supply its own.
pub fn wrap_fragment(source: &str) -> String {
    let mut aliases = Vec::new();
    let mut body = String::with_capacity(source.len());
    let mut skipped_version = false;

    for line in source.lines() {
        let trimmed = strip_line_comment(line).trim();
        if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            body.push('\n');
            continue;
        }
        if uniform_name(trimmed).is_some_and(|name| PROVIDED_UNIFORMS.contains(&name)) {
            body.push('\n');
            continue;
        }
        if let Some(name) = interface_name(trimmed, "out", "vec4") {
            aliases.push(format!("#define {name} fragtoy_out_color\n"));
            body.push('\n');
            continue;
        }
        if let Some(name) = interface_name(trimmed, "in", "vec2") {
            aliases.push(format!("#define {name} fragtoy_uv\n"));
            body.push('\n');
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }

    let footer = if defines_main_image(source) {
        SHADERTOY_FOOTER
    } else {
        MAIN_FOOTER
    };
    let aliases = aliases.concat();
    format!("{HEADER}{aliases}#line 1\n{body}{footer}")
}

/// Drops a trailing `//` comment.
fn strip_line_comment(line: &str) -> &str {
    line.split_once("//").map_or(line, |(code, _)| code)
}

/// True when some line defines `void mainImage(...)`; mentions in comments
/// or calls do not count.
fn defines_main_image(source: &str) -> bool {
    source.lines().any(|line| {
        let code = strip_line_comment(line);
        code.split_once("void")
            .and_then(|(_, rest)| rest.trim_start().strip_prefix("mainImage"))
            .is_some_and(|rest| rest.trim_start().starts_with('('))
    })
}

/// Returns the declared name for `uniform <type> <name>;` lines.
fn uniform_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("uniform ")?;
    let declaration = rest.strip_suffix(';')?.trim();
    let name = declaration.split_whitespace().last()?;
    Some(name.split('[').next().unwrap_or(name))
}

/// Returns the name for `[layout(...)] <qualifier> <ty> <name>;` lines.
fn interface_name<'a>(line: &'a str, qualifier: &str, ty: &str) -> Option<&'a str> {
    let line = match line.strip_prefix("layout") {
        Some(rest) => rest[rest.find(')')? + 1..].trim_start(),
        None => line,
    };
    let rest = line.strip_prefix(qualifier)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix(ty)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest.trim().strip_suffix(';')?.trim_end();
    let is_identifier = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_identifier.then_some(name)
}

/// GLSL prologue injected ahead of every fragment shader.
///
/// The uniform block layout must match `FragtoyUniforms` in `gpu/uniforms.rs`.
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 fragtoy_uv;
layout(location = 0) out vec4 fragtoy_out_color;

layout(std140, set = 0, binding = 0) uniform FragtoyParams {
    vec3 _iResolution;
    float _iGlobalTime;
    vec4 _iMouse;
} ubo;

#define iResolution ubo._iResolution
#define iGlobalTime ubo._iGlobalTime
#define iTime ubo._iGlobalTime
#define iMouse ubo._iMouse

layout(set = 1, binding = 0) uniform texture2D fragtoy_channel0_texture;
layout(set = 1, binding = 1) uniform sampler fragtoy_channel0_sampler;
#define iChannel0 sampler2D(fragtoy_channel0_texture, fragtoy_channel0_sampler)

#define gl_FragColor fragtoy_out_color

vec4 fragtoy_gl_FragCoord;
#define gl_FragCoord fragtoy_gl_FragCoord
#define main fragtoy_user_main
";

const SHADERTOY_FOOTER: &str = r"#undef main
void main() {
    #undef gl_FragCoord
    vec2 builtin_coord = vec2(gl_FragCoord.x, gl_FragCoord.y);
    #define gl_FragCoord fragtoy_gl_FragCoord

    vec2 fragCoord = vec2(builtin_coord.x, iResolution.y - builtin_coord.y);
    fragtoy_gl_FragCoord = vec4(fragCoord, 0.0, 1.0);

    vec4 color = vec4(0.0);
    mainImage(color, fragCoord);
    fragtoy_out_color = color;
}
";

const MAIN_FOOTER: &str = r"#undef main
void main() {
    #undef gl_FragCoord
    vec2 builtin_coord = vec2(gl_FragCoord.x, gl_FragCoord.y);
    #define gl_FragCoord fragtoy_gl_FragCoord

    fragtoy_gl_FragCoord = vec4(builtin_coord.x, iResolution.y - builtin_coord.y, 0.0, 1.0);
    fragtoy_out_color = vec4(0.0);
    fragtoy_user_main();
}
";

/// Full-screen rectangle drawn as two triangles, six vertices, no buffers.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[6] = vec2[6](
    vec2(-1.0, -1.0),
    vec2(1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Vertex count of [`VERTEX_SHADER_GLSL`].
pub const RECTANGLE_VERTICES: u32 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    const SHADERTOY: &str = r#"
        #version 300 es
        uniform float iGlobalTime;
        uniform vec3 iResolution;
        uniform float iTimeDelta;
        void mainImage(out vec4 fragColor, in vec2 fragCoord) {
            vec2 uv = fragCoord / iResolution.xy;
            fragColor = vec4(uv, 0.5 + 0.5 * sin(iGlobalTime), 1.0);
        }
    "#;

    const WITH_MAIN: &str = r#"#version 150
uniform vec3 iResolution;
uniform float iGlobalTime;
uniform vec4 iMouse;
uniform sampler2D iChannel0;
in vec2 vTexCoord0;
out vec4 oColor;

void main() {
    vec4 tex = texture(iChannel0, vTexCoord0);
    float pulse = 0.5 + 0.5 * sin(iGlobalTime);
    oColor = vec4(tex.rgb * pulse + iMouse.xyx / iResolution.xyx * 0.1, 1.0);
}
"#;

    #[test]
    fn wrap_strips_provided_uniforms_only() {
        let wrapped = wrap_fragment(SHADERTOY);
        assert!(!wrapped.contains("uniform float iGlobalTime"));
        assert!(!wrapped.contains("uniform vec3 iResolution"));
        assert!(!wrapped.contains("#version 300 es"));
        assert!(wrapped.contains("uniform float iTimeDelta;"));
        assert!(wrapped.contains("fragColor = vec4(uv, 0.5 + 0.5 * sin(iGlobalTime), 1.0);"));
        assert!(wrapped.contains("mainImage(color, fragCoord);"));
    }

    #[test]
    fn wrap_aliases_interface_of_main_flavour() {
        let wrapped = wrap_fragment(WITH_MAIN);
        assert!(wrapped.contains("#define oColor fragtoy_out_color"));
        assert!(wrapped.contains("#define vTexCoord0 fragtoy_uv"));
        assert!(!wrapped.contains("out vec4 oColor;"));
        assert!(!wrapped.contains("uniform sampler2D iChannel0;"));
        assert!(wrapped.contains("fragtoy_user_main();"));
    }

    #[test]
    fn wrap_keeps_user_line_numbers() {
        let wrapped = wrap_fragment(WITH_MAIN);
        let body = wrapped.split("#line 1\n").nth(1).unwrap();
        let user_lines: Vec<&str> = body.lines().take(WITH_MAIN.lines().count()).collect();
        assert_eq!(user_lines[8], "void main() {");
    }

    #[test]
    fn interface_names_are_parsed() {
        assert_eq!(interface_name("out vec4 oColor;", "out", "vec4"), Some("oColor"));
        assert_eq!(
            interface_name("layout(location = 0) out vec4 color ;", "out", "vec4"),
            Some("color")
        );
        assert_eq!(interface_name("outer vec4 x;", "out", "vec4"), None);
        assert_eq!(interface_name("out vec4 a, b;", "out", "vec4"), None);
        assert_eq!(interface_name("in vec2 uv;", "in", "vec2"), Some("uv"));
    }

    #[test]
    fn uniform_names_are_parsed() {
        assert_eq!(uniform_name("uniform vec3 iResolution;"), Some("iResolution"));
        assert_eq!(uniform_name("uniform float iChannelTime[4];"), Some("iChannelTime"));
        assert_eq!(uniform_name("uniform float iTimeDelta;"), Some("iTimeDelta"));
        assert_eq!(uniform_name("vec3 iResolution;"), None);
    }

    #[test]
    fn commented_declarations_are_still_recognised() {
        let source = "uniform vec3      iResolution;           // viewport resolution (in pixels)\n\
                      uniform float     iGlobalTime;           // shader playback time (in seconds)\n\
                      void mainImage(out vec4 c, in vec2 p) { c = vec4(p / iResolution.xy, 0.0, 1.0); }\n";
        let wrapped = prepare_fragment(source).unwrap();
        assert!(!wrapped.contains("uniform vec3      iResolution;"));

        let with_main = "#version 150\n\
                         uniform vec3 iResolution;\n\
                         out vec4 oColor; // final colour\n\
                         void main() { oColor = vec4(gl_FragCoord.xy / iResolution.xy, 0.0, 1.0); }\n";
        let wrapped = prepare_fragment(with_main).unwrap();
        assert!(wrapped.contains("#define oColor fragtoy_out_color"));
    }

    #[test]
    fn comment_lines_are_kept_for_line_numbers() {
        let wrapped = wrap_fragment("out vec4 oColor; // final colour\nvoid main() {}\n");
        let body = wrapped.split("#line 1\n").nth(1).unwrap();
        assert_eq!(body.lines().nth(1), Some("void main() {}"));
    }

    #[test]
    fn main_image_is_detected_by_definition() {
        assert!(defines_main_image("void mainImage(out vec4 c, in vec2 p) {}"));
        assert!(defines_main_image("void  mainImage (out vec4 c, in vec2 p)\n{}"));
        assert!(!defines_main_image("// port of a mainImage shader\nvoid main() {}"));
        assert!(!defines_main_image("void main() { /* */ }"));

        let source = "// ported from a mainImage shader\n\
                      out vec4 oColor;\n\
                      void main() { oColor = vec4(1.0); }\n";
        let wrapped = prepare_fragment(source).unwrap();
        assert!(wrapped.contains("fragtoy_user_main();"));
    }

    #[test]
    fn vertex_shader_validates() {
        validate_glsl(VERTEX_SHADER_GLSL, ShaderStage::Vertex).unwrap();
    }

    #[test]
    fn shadertoy_flavour_validates() {
        let source = "void mainImage(out vec4 c, in vec2 p) {\n    c = vec4(p / iResolution.xy, 0.0, 1.0);\n}\n";
        prepare_fragment(source).unwrap();
    }

    #[test]
    fn main_flavour_validates() {
        prepare_fragment(WITH_MAIN).unwrap();
    }

    #[test]
    fn bundled_shaders_validate() {
        prepare_fragment(include_str!("../../../assets/default.fs")).unwrap();
        prepare_fragment(include_str!("../../../assets/ripple.fs")).unwrap();
    }

    #[test]
    fn broken_source_reports_diagnostic() {
        let err = prepare_fragment("void mainImage(out vec4 c, in vec2 p) { c = ; }").unwrap_err();
        assert!(!err.trim().is_empty());
    }
}
