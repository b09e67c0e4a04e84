use std::fmt;

use super::reflect::BlockLayout;
use super::ShaderError;

/// Uniform types the harness can set.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Mat4,
}

impl UniformKind {
    /// Number of `f32` components a value of this kind carries.
    pub const fn components(self) -> usize {
        match self {
            UniformKind::Float => 1,
            UniformKind::Vec2 => 2,
            UniformKind::Vec3 => 3,
            UniformKind::Mat4 => 16,
        }
    }

    pub const fn byte_size(self) -> usize {
        self.components() * std::mem::size_of::<f32>()
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UniformKind::Float => "f32",
            UniformKind::Vec2 => "vec2<f32>",
            UniformKind::Vec3 => "vec3<f32>",
            UniformKind::Mat4 => "mat4x4<f32>",
        })
    }
}

/// A value read back from the uniform storage.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    /// Column-major.
    Mat4([f32; 16]),
}

/// A named member of the program's uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub kind: UniformKind,
    /// Byte offset inside the block.
    pub offset: u32,
}

/// CPU shadow of the uniform buffer.
///
/// Setters write here; the context uploads the bytes once per flush when
/// anything changed. Every set re-resolves the name against the reflected
/// layout.
#[derive(Debug, Clone, Default)]
pub(crate) struct UniformBlock {
    layout: Option<BlockLayout>,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub(crate) fn new(layout: Option<BlockLayout>) -> Self {
        let size = layout.as_ref().map_or(0, |l| l.buffer_size() as usize);
        Self {
            layout,
            data: vec![0; size],
            dirty: size > 0,
        }
    }

    pub(crate) fn layout(&self) -> Option<&BlockLayout> {
        self.layout.as_ref()
    }

    pub(crate) fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.layout.as_ref()?.slots.iter().find(|s| s.name == name)
    }

    /// Writes `values` to the uniform `name` as a `kind`.
    ///
    /// Returns `Ok(false)` when the name does not resolve; the caller decides
    /// whether that is worth reporting. On error nothing is written.
    pub(crate) fn set(
        &mut self,
        name: &str,
        kind: UniformKind,
        values: &[f32],
    ) -> Result<bool, ShaderError> {
        if values.len() != kind.components() {
            return Err(ShaderError::UniformSizeMismatch {
                name: name.to_string(),
                expected: kind.components(),
                actual: values.len(),
            });
        }

        let Some(slot) = self.slot(name) else {
            return Ok(false);
        };

        if slot.kind != kind {
            return Err(ShaderError::UniformSizeMismatch {
                name: name.to_string(),
                expected: slot.kind.components(),
                actual: values.len(),
            });
        }

        let start = slot.offset as usize;
        let end = start + kind.byte_size();
        self.data[start..end].copy_from_slice(bytemuck::cast_slice(values));
        self.dirty = true;
        Ok(true)
    }

    pub(crate) fn value(&self, name: &str) -> Option<UniformValue> {
        let slot = self.slot(name)?;
        let start = slot.offset as usize;
        let mut floats = [0.0f32; 16];
        for (i, f) in floats.iter_mut().take(slot.kind.components()).enumerate() {
            let at = start + i * 4;
            *f = bytemuck::pod_read_unaligned(&self.data[at..at + 4]);
        }

        Some(match slot.kind {
            UniformKind::Float => UniformValue::Float(floats[0]),
            UniformKind::Vec2 => UniformValue::Vec2([floats[0], floats[1]]),
            UniformKind::Vec3 => UniformValue::Vec3([floats[0], floats[1], floats[2]]),
            UniformKind::Mat4 => UniformValue::Mat4(floats),
        })
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns whether the storage changed since the last call.
    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
