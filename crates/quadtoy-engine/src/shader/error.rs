use std::fmt;

/// Shader stage of a [`Program`](super::Program).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    pub(crate) fn naga(self) -> naga::ShaderStage {
        match self {
            Stage::Vertex => naga::ShaderStage::Vertex,
            Stage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex shader"),
            Stage::Fragment => f.write_str("fragment shader"),
        }
    }
}

/// Errors reported by the shader harness.
///
/// Compile and link failures are only returned in strict mode; in permissive
/// mode they are logged and the context stays alive with an unusable program.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    ShaderCompileFailure { stage: Stage, diagnostic: String },
    ProgramLinkFailure { diagnostic: String },
    /// Setter arity differs from the value or from the uniform's declared type.
    UniformSizeMismatch { name: String, expected: usize, actual: usize },
    /// Only returned when `ProgramOptions::strict_names` is set.
    UnknownUniform { name: String },
    /// Only returned when `ProgramOptions::strict_names` is set.
    UnknownAttribute { name: String },
    /// Attribute component count outside `1..=4`.
    InvalidAttribute { name: String, components: u32 },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::ShaderCompileFailure { stage, diagnostic } => {
                write!(f, "{stage} failed to compile: {diagnostic}")
            }
            ShaderError::ProgramLinkFailure { diagnostic } => {
                write!(f, "program failed to link: {diagnostic}")
            }
            ShaderError::UniformSizeMismatch { name, expected, actual } => write!(
                f,
                "uniform `{name}` expects {expected} component(s), got {actual}"
            ),
            ShaderError::UnknownUniform { name } => {
                write!(f, "no uniform named `{name}` in the active program")
            }
            ShaderError::UnknownAttribute { name } => {
                write!(f, "no vertex input named `{name}` in the active program")
            }
            ShaderError::InvalidAttribute { name, components } => write!(
                f,
                "attribute `{name}` has {components} components; expected 1 to 4"
            ),
        }
    }
}

impl std::error::Error for ShaderError {}
