use std::fmt;

/// Primitive assembly for a draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl DrawMode {
    pub fn topology(self) -> wgpu::PrimitiveTopology {
        match self {
            DrawMode::Points => wgpu::PrimitiveTopology::PointList,
            DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
            DrawMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
            DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }

    /// Strip topologies need the index format up front for indexed draws.
    pub fn strip_index_format(self) -> Option<wgpu::IndexFormat> {
        match self {
            DrawMode::LineStrip | DrawMode::TriangleStrip => Some(wgpu::IndexFormat::Uint16),
            _ => None,
        }
    }
}

/// One registered vertex attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDesc {
    pub name: String,
    /// `None` when the name did not resolve to a vertex input.
    pub location: Option<u32>,
    pub components: u32,
    /// Offset in floats from the start of a vertex.
    pub offset: u32,
}

impl AttributeDesc {
    pub fn format(&self) -> wgpu::VertexFormat {
        match self.components {
            1 => wgpu::VertexFormat::Float32,
            2 => wgpu::VertexFormat::Float32x2,
            3 => wgpu::VertexFormat::Float32x3,
            _ => wgpu::VertexFormat::Float32x4,
        }
    }

    pub fn byte_offset(&self) -> u64 {
        u64::from(self.offset) * 4
    }
}

/// Interleaved vertex layout built by `set_vertex_stride` + `add_attribute`.
///
/// Offsets accumulate in registration order: the n-th attribute starts where
/// the previous ones end, whatever the shader declares. Registering out of
/// buffer order yields a layout that is consistent but wrong for the data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    stride: u32,
    cursor: u32,
    attributes: Vec<AttributeDesc>,
}

impl VertexLayout {
    /// Floats per vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn stride_bytes(&self) -> u64 {
        u64::from(self.stride) * 4
    }

    pub fn set_stride(&mut self, floats: u32) {
        self.stride = floats;
    }

    /// Records an attribute at the running offset and advances the offset.
    pub fn push(&mut self, name: &str, location: Option<u32>, components: u32) -> &AttributeDesc {
        let offset = self.cursor;
        self.cursor += components;
        self.attributes.push(AttributeDesc {
            name: name.to_string(),
            location,
            components,
            offset,
        });
        &self.attributes[self.attributes.len() - 1]
    }

    pub fn attributes(&self) -> &[AttributeDesc] {
        &self.attributes
    }

    /// Number of whole vertices in a buffer of `elements` floats.
    pub fn vertex_count(&self, elements: usize) -> u32 {
        if self.stride == 0 {
            return 0;
        }
        (elements / self.stride as usize) as u32
    }

    /// wgpu attribute descriptors for the attributes that resolved.
    pub(crate) fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.attributes
            .iter()
            .filter_map(|a| {
                Some(wgpu::VertexAttribute {
                    format: a.format(),
                    offset: a.byte_offset(),
                    shader_location: a.location?,
                })
            })
            .collect()
    }

    /// Problems that would make pipeline creation fail on a device with
    /// `limits`.
    pub(crate) fn check(
        &self,
        required_locations: &[u32],
        limits: &wgpu::Limits,
    ) -> Result<(), LayoutError> {
        let resolved: Vec<&AttributeDesc> =
            self.attributes.iter().filter(|a| a.location.is_some()).collect();

        if !resolved.is_empty() && self.stride == 0 {
            return Err(LayoutError::StrideNotSet);
        }

        let max = u64::from(limits.max_vertex_buffer_array_stride);
        if !resolved.is_empty() && self.stride_bytes() > max {
            return Err(LayoutError::StrideTooLarge {
                bytes: self.stride_bytes(),
                max,
            });
        }

        for a in &resolved {
            if a.offset + a.components > self.stride {
                return Err(LayoutError::Overflow {
                    name: a.name.clone(),
                    end: a.offset + a.components,
                    stride: self.stride,
                });
            }
        }

        for (i, a) in resolved.iter().enumerate() {
            if resolved[..i].iter().any(|b| b.location == a.location) {
                return Err(LayoutError::DuplicateLocation { name: a.name.clone() });
            }
        }

        for loc in required_locations {
            if !resolved.iter().any(|a| a.location == Some(*loc)) {
                return Err(LayoutError::MissingLocation(*loc));
            }
        }

        Ok(())
    }
}

/// Why a vertex layout cannot back a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LayoutError {
    StrideNotSet,
    StrideTooLarge { bytes: u64, max: u64 },
    Overflow { name: String, end: u32, stride: u32 },
    DuplicateLocation { name: String },
    MissingLocation(u32),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::StrideNotSet => f.write_str("attributes registered but vertex stride is 0"),
            LayoutError::StrideTooLarge { bytes, max } => write!(
                f,
                "vertex stride of {bytes} bytes exceeds the device limit of {max}"
            ),
            LayoutError::Overflow { name, end, stride } => write!(
                f,
                "attribute `{name}` ends at float {end}, past the vertex stride of {stride}"
            ),
            LayoutError::DuplicateLocation { name } => {
                write!(f, "attribute `{name}` reuses an already registered location")
            }
            LayoutError::MissingLocation(loc) => {
                write!(f, "vertex input @location({loc}) has no registered attribute")
            }
        }
    }
}
