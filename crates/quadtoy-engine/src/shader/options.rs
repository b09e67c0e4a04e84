/// What happens when a shader stage fails to compile or the program fails to link.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum CompileMode {
    /// Log the diagnostic and keep going with an unusable program. Draws are
    /// skipped until a context is built from sources that compile.
    #[default]
    Permissive,
    /// Return the failure from `ShaderContext::new`.
    Strict,
}

/// Options for compiling a program.
#[derive(Debug, Clone, Default)]
pub struct ProgramOptions {
    /// Validate the linked program and log everything suspicious.
    pub debug: bool,

    pub compile_mode: CompileMode,

    /// Treat unresolved uniform/attribute names as errors instead of no-ops.
    pub strict_names: bool,
}

impl ProgramOptions {
    pub fn debug() -> Self {
        Self {
            debug: true,
            ..Self::default()
        }
    }

    pub fn strict() -> Self {
        Self {
            compile_mode: CompileMode::Strict,
            strict_names: true,
            ..Self::default()
        }
    }
}
