use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::reflect::{self, BlockLayout, StageInterface};
use super::{CompileMode, ProgramOptions, ShaderError, Stage};

/// One successfully compiled stage.
#[derive(Debug, Clone)]
pub(crate) struct CompiledStage {
    pub source: String,
    pub iface: StageInterface,
}

/// A vertex + fragment pair compiled from WGSL and checked against each other.
///
/// Compilation runs on the CPU (naga); GPU shader modules are created from
/// the same sources the first time a pipeline is needed.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) vertex: Option<CompiledStage>,
    pub(crate) fragment: Option<CompiledStage>,
    linked: bool,
    uniforms: Option<BlockLayout>,
}

impl Program {
    /// Compiles and links a program.
    ///
    /// In [`CompileMode::Permissive`] failures are logged and an unusable
    /// program is returned; in [`CompileMode::Strict`] the first failure is
    /// returned.
    pub fn build(
        vertex_src: &str,
        fragment_src: &str,
        options: &ProgramOptions,
    ) -> Result<Self, ShaderError> {
        let vertex = settle(compile(Stage::Vertex, vertex_src), options)?;
        let fragment = settle(compile(Stage::Fragment, fragment_src), options)?;

        let mut linked = false;
        if let (Some(vs), Some(fs)) = (&vertex, &fragment) {
            match link(&vs.iface, &fs.iface) {
                Ok(()) => linked = true,
                Err(diagnostic) => {
                    settle::<()>(Err(ShaderError::ProgramLinkFailure { diagnostic }), options)?;
                }
            }
        }

        // The fragment block wins when the stages disagree; the program is
        // unlinked in that case anyway.
        let uniforms = fragment
            .as_ref()
            .and_then(|s| s.iface.uniforms.clone())
            .or_else(|| vertex.as_ref().and_then(|s| s.iface.uniforms.clone()));

        let program = Self { vertex, fragment, linked, uniforms };

        if options.debug {
            for finding in program.validate() {
                log::warn!("program validation: {finding}");
            }
            log::debug!("program interface: {:?}", program.uniforms);
        }

        Ok(program)
    }

    /// True when both stages compiled and the program linked.
    pub fn is_usable(&self) -> bool {
        self.linked
    }

    pub fn uniform_layout(&self) -> Option<&BlockLayout> {
        self.uniforms.as_ref()
    }

    /// Resolves a vertex input name to its `@location`.
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.vertex.as_ref()?.iface.input(name).map(|v| v.location)
    }

    /// Checks that go beyond linking: things that compile and link but will
    /// not behave the way a harness user expects.
    pub(crate) fn validate(&self) -> Vec<String> {
        let mut findings = Vec::new();

        if !self.linked {
            findings.push("program is not linked; draws will be skipped".to_string());
        }

        for stage in [&self.vertex, &self.fragment].into_iter().flatten() {
            for name in &stage.iface.unsettable {
                findings.push(format!("uniform `{name}` has a type no setter can write"));
            }
            if stage.iface.uniforms.as_ref().is_some_and(|b| b.slots.is_empty()) {
                findings.push("uniform block declares nothing a setter can write".to_string());
            }
        }

        findings
    }
}

/// Applies the compile-mode policy to a stage result.
fn settle<T>(result: Result<T, ShaderError>, options: &ProgramOptions) -> Result<Option<T>, ShaderError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if options.compile_mode == CompileMode::Strict => Err(e),
        Err(e) => {
            log::error!("{e}");
            Ok(None)
        }
    }
}

fn compile(stage: Stage, source: &str) -> Result<CompiledStage, ShaderError> {
    let fail = |diagnostic: String| ShaderError::ShaderCompileFailure { stage, diagnostic };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| fail(e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| fail(e.emit_to_string(source)))?;

    let iface = reflect::reflect(&module, stage.naga()).map_err(fail)?;

    Ok(CompiledStage {
        source: source.to_string(),
        iface,
    })
}

fn link(vs: &StageInterface, fs: &StageInterface) -> Result<(), String> {
    let mut problems = Vec::new();

    for input in &fs.inputs {
        match vs.outputs.iter().find(|o| o.location == input.location) {
            None => problems.push(format!(
                "fragment input `{}` at @location({}) is not written by the vertex shader",
                input.name, input.location
            )),
            Some(out) if out.components != input.components || out.float != input.float => {
                problems.push(format!(
                    "fragment input `{}` at @location({}) does not match the vertex output type",
                    input.name, input.location
                ))
            }
            Some(_) => {}
        }
    }

    match fs.outputs.iter().find(|o| o.location == 0) {
        None => problems.push("fragment shader does not write @location(0)".to_string()),
        Some(o) if !o.float => {
            problems.push("fragment output @location(0) is not a float vector".to_string())
        }
        // Every color target has four channels.
        Some(o) if o.components != 4 => problems.push(format!(
            "fragment output @location(0) has {} components; color targets need vec4<f32>",
            o.components
        )),
        Some(_) => {}
    }

    for input in vs.inputs.iter().filter(|v| !v.float) {
        problems.push(format!(
            "vertex input `{}` is not a float type; attributes are uploaded as f32",
            input.name
        ));
    }

    if let (Some(a), Some(b)) = (&vs.uniforms, &fs.uniforms) {
        if a != b {
            problems.push("vertex and fragment uniform blocks differ".to_string());
        }
    }

    for binding in vs.unsupported_bindings.iter().chain(&fs.unsupported_bindings) {
        problems.push(format!("unsupported resource binding {binding}"));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::fullscreen::DEFAULT_VERTEX;

    const SOLID: &str = r#"
        struct Uniforms { vRes: vec2<f32>, vRatio: vec2<f32>, color: vec3<f32> }
        @group(0) @binding(0) var<uniform> u: Uniforms;
        @fragment
        fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(u.color, 1.0); }
    "#;

    #[test]
    fn valid_pair_links() {
        let p = Program::build(DEFAULT_VERTEX, SOLID, &ProgramOptions::default()).unwrap();
        assert!(p.is_usable());
        assert_eq!(p.attribute_location("vPos"), Some(0));
        assert_eq!(p.uniform_layout().map(|b| b.slots.len()), Some(3));
        assert!(p.validate().is_empty());
    }

    #[test]
    fn compile_failure_is_permissive_by_default() {
        let broken = "@fragment fn fs_main() -> @location(0) vec4<f32> { return nope; }";
        let p = Program::build(DEFAULT_VERTEX, broken, &ProgramOptions::default()).unwrap();
        assert!(!p.is_usable());
        // The vertex stage still compiled and can resolve attributes.
        assert_eq!(p.attribute_location("vPos"), Some(0));
    }

    #[test]
    fn compile_failure_is_fatal_in_strict_mode() {
        let broken = "@fragment fn fs_main() -> @location(0) vec4<f32> { return nope; }";
        let err = Program::build(DEFAULT_VERTEX, broken, &ProgramOptions::strict()).unwrap_err();
        let ShaderError::ShaderCompileFailure { stage, diagnostic } = err else {
            panic!("expected a compile failure");
        };
        assert_eq!(stage, Stage::Fragment);
        assert!(diagnostic.contains("nope"));
    }

    #[test]
    fn validation_errors_count_as_compile_failures() {
        // Parses, but returns the wrong type.
        let invalid = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }";
        let err = Program::build(DEFAULT_VERTEX, invalid, &ProgramOptions::strict()).unwrap_err();
        assert!(matches!(err, ShaderError::ShaderCompileFailure { stage: Stage::Fragment, .. }));
    }

    #[test]
    fn missing_varying_fails_to_link() {
        let fs = r#"
            @fragment
            fn fs_main(@location(1) uv: vec2<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(uv, 0.0, 1.0);
            }
        "#;
        let p = Program::build(DEFAULT_VERTEX, fs, &ProgramOptions::default()).unwrap();
        assert!(!p.is_usable());

        let err = Program::build(DEFAULT_VERTEX, fs, &ProgramOptions::strict()).unwrap_err();
        let ShaderError::ProgramLinkFailure { diagnostic } = err else {
            panic!("expected a link failure");
        };
        assert!(diagnostic.contains("@location(1)"));
    }

    #[test]
    fn narrow_color_output_fails_to_link() {
        let fs = r#"
            @fragment
            fn fs_main() -> @location(0) vec3<f32> { return vec3<f32>(1.0, 0.0, 1.0); }
        "#;
        let p = Program::build(DEFAULT_VERTEX, fs, &ProgramOptions::default()).unwrap();
        assert!(!p.is_usable());

        let err = Program::build(DEFAULT_VERTEX, fs, &ProgramOptions::strict()).unwrap_err();
        let ShaderError::ProgramLinkFailure { diagnostic } = err else {
            panic!("expected a link failure");
        };
        assert!(diagnostic.contains("3 components"));

        let scalar = "@fragment fn fs_main() -> @location(0) f32 { return 1.0; }";
        assert!(Program::build(DEFAULT_VERTEX, scalar, &ProgramOptions::strict()).is_err());
    }

    #[test]
    fn disagreeing_uniform_blocks_fail_to_link() {
        let vs = r#"
            @group(0) @binding(0) var<uniform> scale: f32;
            @vertex
            fn vs_main(@location(0) vPos: vec2<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(vPos * scale, 0.0, 1.0);
            }
        "#;
        let p = Program::build(vs, SOLID, &ProgramOptions::default()).unwrap();
        assert!(!p.is_usable());
        // Fragment declarations are kept for the uniform storage.
        assert!(p.uniform_layout().is_some_and(|b| b.slots.iter().any(|s| s.name == "color")));
    }

    #[test]
    fn textures_are_not_supported() {
        let fs = r#"
            @group(0) @binding(1) var tex: texture_2d<f32>;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return textureLoad(tex, vec2<i32>(0, 0), 0); }
        "#;
        let p = Program::build(DEFAULT_VERTEX, fs, &ProgramOptions::default()).unwrap();
        assert!(!p.is_usable());
    }

    #[test]
    fn debug_validation_reports_unsettable_uniforms() {
        let fs = r#"
            struct Uniforms { time: f32, frame: u32 }
            @group(0) @binding(0) var<uniform> u: Uniforms;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(u.time, f32(u.frame), 0.0, 1.0); }
        "#;
        let p = Program::build(DEFAULT_VERTEX, fs, &ProgramOptions::debug()).unwrap();
        assert!(p.is_usable());
        assert_eq!(p.validate(), vec!["uniform `frame` has a type no setter can write".to_string()]);
    }
}
