//! Interface reflection over naga modules.
//!
//! The harness needs three things from a compiled stage: the entry point, the
//! `@location` inputs/outputs by name, and the layout of the uniform block at
//! `@group(0) @binding(0)`.

use naga::{AddressSpace, Binding, Handle, Module, ShaderStage, Type, TypeInner, VectorSize};

use super::uniforms::{UniformKind, UniformSlot};

/// Layout of the single uniform block a program may declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub group: u32,
    pub binding: u32,
    /// Size of the declared type in bytes.
    pub size: u32,
    pub slots: Vec<UniformSlot>,
}

impl BlockLayout {
    /// Size of the buffer that backs the block (rounded up to 16 bytes).
    pub fn buffer_size(&self) -> u64 {
        u64::from(self.size).max(16).next_multiple_of(16)
    }
}

/// A `@location(n)` input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IoVar {
    pub name: String,
    pub location: u32,
    pub components: u32,
    pub float: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StageInterface {
    pub entry_point: String,
    pub inputs: Vec<IoVar>,
    pub outputs: Vec<IoVar>,
    pub uniforms: Option<BlockLayout>,
    /// Uniform members whose type has no setter.
    pub unsettable: Vec<String>,
    /// Resource bindings other than the uniform block.
    pub unsupported_bindings: Vec<String>,
}

impl StageInterface {
    pub(crate) fn input(&self, name: &str) -> Option<&IoVar> {
        self.inputs.iter().find(|v| v.name == name)
    }
}

/// Reflects the first entry point of `stage` in `module`.
pub(crate) fn reflect(module: &Module, stage: ShaderStage) -> Result<StageInterface, String> {
    let Some(entry) = module.entry_points.iter().find(|ep| ep.stage == stage) else {
        return Err(format!("no {} entry point", stage_attr(stage)));
    };

    let mut iface = StageInterface {
        entry_point: entry.name.clone(),
        ..Default::default()
    };

    for arg in &entry.function.arguments {
        collect_io(module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut iface.inputs);
    }
    if let Some(result) = &entry.function.result {
        collect_io(module, None, result.ty, result.binding.as_ref(), &mut iface.outputs);
    }

    for (_, var) in module.global_variables.iter() {
        let Some(rb) = &var.binding else { continue };
        let name = var.name.as_deref().unwrap_or("<unnamed>");

        if var.space == AddressSpace::Uniform && rb.group == 0 && rb.binding == 0 {
            let (layout, unsettable) = block_layout(module, name, var.ty);
            iface.uniforms = Some(layout);
            iface.unsettable = unsettable;
        } else {
            iface
                .unsupported_bindings
                .push(format!("`{name}` at @group({}) @binding({})", rb.group, rb.binding));
        }
    }

    Ok(iface)
}

fn stage_attr(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "@vertex",
        ShaderStage::Fragment => "@fragment",
        _ => "matching",
    }
}

fn collect_io(
    module: &Module,
    name: Option<&str>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<IoVar>,
) {
    let inner = &module.types[ty].inner;
    match binding {
        Some(Binding::Location { location, .. }) => {
            let (components, float) = io_shape(inner);
            out.push(IoVar {
                name: name.unwrap_or_default().to_string(),
                location: *location,
                components,
                float,
            });
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = inner {
                for m in members {
                    collect_io(module, m.name.as_deref(), m.ty, m.binding.as_ref(), out);
                }
            }
        }
    }
}

fn io_shape(inner: &TypeInner) -> (u32, bool) {
    match inner {
        TypeInner::Scalar(s) => (1, s.kind == naga::ScalarKind::Float),
        TypeInner::Vector { size, scalar } => (*size as u32, scalar.kind == naga::ScalarKind::Float),
        _ => (0, false),
    }
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match *inner {
        TypeInner::Scalar(s) if s == naga::Scalar::F32 => Some(UniformKind::Float),
        TypeInner::Vector { size: VectorSize::Bi, scalar } if scalar == naga::Scalar::F32 => {
            Some(UniformKind::Vec2)
        }
        TypeInner::Vector { size: VectorSize::Tri, scalar } if scalar == naga::Scalar::F32 => {
            Some(UniformKind::Vec3)
        }
        TypeInner::Matrix { columns: VectorSize::Quad, rows: VectorSize::Quad, scalar }
            if scalar == naga::Scalar::F32 =>
        {
            Some(UniformKind::Mat4)
        }
        _ => None,
    }
}

/// A struct block exposes its members; a bare `var<uniform>` exposes itself.
fn block_layout(module: &Module, var_name: &str, ty: Handle<Type>) -> (BlockLayout, Vec<String>) {
    let inner = &module.types[ty].inner;
    let size = inner.size(module.to_ctx());
    let mut slots = Vec::new();
    let mut unsettable = Vec::new();

    match inner {
        TypeInner::Struct { members, .. } => {
            for m in members {
                let name = m.name.clone().unwrap_or_default();
                match uniform_kind(&module.types[m.ty].inner) {
                    Some(kind) => slots.push(UniformSlot { name, kind, offset: m.offset }),
                    None => unsettable.push(name),
                }
            }
        }
        other => match uniform_kind(other) {
            Some(kind) => slots.push(UniformSlot { name: var_name.to_string(), kind, offset: 0 }),
            None => unsettable.push(var_name.to_string()),
        },
    }

    (BlockLayout { group: 0, binding: 0, size, slots }, unsettable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Module {
        naga::front::wgsl::parse_str(src).expect("test shader parses")
    }

    const FRAGMENT: &str = r#"
        struct Uniforms {
            vRes: vec2<f32>,
            vRatio: vec2<f32>,
            time: f32,
            tint: vec3<f32>,
            view: mat4x4<f32>,
            mode: i32,
        }
        @group(0) @binding(0) var<uniform> u: Uniforms;

        @fragment
        fn fs_main(@builtin(position) p: vec4<f32>, @location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
            return vec4<f32>(uv, u.time, 1.0);
        }
    "#;

    #[test]
    fn struct_members_become_slots_with_offsets() {
        let iface = reflect(&parse(FRAGMENT), ShaderStage::Fragment).unwrap();
        let block = iface.uniforms.expect("uniform block");

        let offsets: Vec<(&str, u32)> =
            block.slots.iter().map(|s| (s.name.as_str(), s.offset)).collect();
        assert_eq!(
            offsets,
            vec![("vRes", 0), ("vRatio", 8), ("time", 16), ("tint", 32), ("view", 48)]
        );
        assert_eq!(block.slots[3].kind, UniformKind::Vec3);
        assert_eq!(block.slots[4].kind, UniformKind::Mat4);
        assert_eq!(iface.unsettable, vec!["mode".to_string()]);
        assert_eq!(block.buffer_size() % 16, 0);
        assert!(block.buffer_size() >= u64::from(block.size));
    }

    #[test]
    fn fragment_inputs_skip_builtins() {
        let iface = reflect(&parse(FRAGMENT), ShaderStage::Fragment).unwrap();
        assert_eq!(iface.entry_point, "fs_main");
        assert_eq!(
            iface.inputs,
            vec![IoVar { name: "uv".into(), location: 0, components: 2, float: true }]
        );
        assert_eq!(iface.outputs.len(), 1);
        assert_eq!(iface.outputs[0].location, 0);
        assert_eq!(iface.outputs[0].components, 4);
    }

    #[test]
    fn vertex_inputs_by_name_including_struct_members() {
        let src = r#"
            struct In {
                @location(0) pos: vec3<f32>,
                @location(2) weight: f32,
            }
            @vertex
            fn main(v: In, @location(1) color: vec4<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(v.pos * v.weight, 1.0) + color * 0.0;
            }
        "#;
        let iface = reflect(&parse(src), ShaderStage::Vertex).unwrap();
        assert_eq!(iface.input("pos").map(|v| v.location), Some(0));
        assert_eq!(iface.input("weight").map(|v| v.components), Some(1));
        assert_eq!(iface.input("color").map(|v| v.location), Some(1));
        assert!(iface.input("missing").is_none());
        assert!(iface.uniforms.is_none());
    }

    #[test]
    fn bare_uniform_is_its_own_slot() {
        let src = r#"
            @group(0) @binding(0) var<uniform> time: f32;
            @fragment
            fn fs() -> @location(0) vec4<f32> { return vec4<f32>(time); }
        "#;
        let iface = reflect(&parse(src), ShaderStage::Fragment).unwrap();
        let block = iface.uniforms.unwrap();
        assert_eq!(block.slots, vec![UniformSlot { name: "time".into(), kind: UniformKind::Float, offset: 0 }]);
        assert_eq!(block.buffer_size(), 16);
    }

    #[test]
    fn other_bindings_are_reported() {
        let src = r#"
            @group(0) @binding(1) var tex: texture_2d<f32>;
            @fragment
            fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
        "#;
        let iface = reflect(&parse(src), ShaderStage::Fragment).unwrap();
        assert_eq!(iface.unsupported_bindings, vec!["`tex` at @group(0) @binding(1)".to_string()]);
    }

    #[test]
    fn missing_entry_point_is_an_error() {
        let src = "@fragment fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let err = reflect(&parse(src), ShaderStage::Vertex).unwrap_err();
        assert_eq!(err, "no @vertex entry point");
    }
}
