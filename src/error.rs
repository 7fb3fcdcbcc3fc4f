use std::path::PathBuf;

use crate::pool::BufferId;
use crate::pool::ShaderId;
use crate::shader::parser::Diagnostic;

pub type NanoResult<T> = Result<T, NanoError>;

/// Every failure the framework reports back to application code.
#[derive(Debug, thiserror::Error)]
pub enum NanoError
{
        #[error("{pool} pool is full ({limit} slots probed)")]
        PoolFull
        {
                pool: &'static str,
                limit: usize,
        },

        #[error("shader {0} not found")]
        ShaderNotFound(ShaderId),

        #[error("buffer {0} not found")]
        BufferNotFound(BufferId),

        #[error("binding @group({group}) @binding({binding}) not found in shader {shader}")]
        BindingNotFound
        {
                shader: ShaderId,
                group: u32,
                binding: u32,
        },

        #[error("binding named '{name}' not found in shader {shader}")]
        BindingNameNotFound
        {
                shader: ShaderId,
                name: String,
        },

        #[error("@group({group}) @binding({binding}) is outside the supported range")]
        IndexOutOfRange
        {
                group: u32,
                binding: u32,
        },

        #[error("shader {0} is active, deactivate it before changing its bindings")]
        ShaderActive(ShaderId),

        #[error("shader {0} has not been built")]
        ShaderNotBuilt(ShaderId),

        #[error("shader {0} declares no entry points")]
        NoEntryPoints(ShaderId),

        #[error("shader {shader} failed to parse with {} error(s)", .diagnostics.len())]
        Parse
        {
                shader: ShaderId,
                diagnostics: Vec<Diagnostic>,
        },

        #[error("shader {0} has a vertex or fragment entry point without its counterpart")]
        IncompleteRenderStages(ShaderId),

        #[error("shader {0} has neither a compute entry point nor a vertex/fragment pair")]
        NoPipeline(ShaderId),

        #[error("shader {shader} skips an index before @group({group}) @binding({binding}), bindings must be contiguous from 0")]
        NonContiguousBindings
        {
                shader: ShaderId,
                group: u32,
                binding: u32,
        },

        #[error("shader {shader} has no buffer bound at @group({group}) @binding({binding})")]
        UnboundBinding
        {
                shader: ShaderId,
                group: u32,
                binding: u32,
        },

        #[error("shader {shader} binding '{name}' is not a buffer binding")]
        UnsupportedBinding
        {
                shader: ShaderId,
                name: String,
        },

        #[error("shader {0} already uses the maximum of {1} vertex buffers")]
        VertexBufferLimit(ShaderId, usize),

        #[error("shader {0} has no output buffer or element count to size its dispatch")]
        MissingElementCount(ShaderId),

        #[error("buffer {0} already exists")]
        AlreadyExists(BufferId),

        #[error("{len} bytes do not fit buffer {buffer} ({capacity} bytes)")]
        DataTooLarge
        {
                buffer: BufferId,
                len: usize,
                capacity: u64,
        },

        #[error("buffer offset {offset} is not a multiple of {alignment}")]
        MisalignedOffset
        {
                offset: u64,
                alignment: u64,
        },

        #[error("no frame is being recorded")]
        NoFrame,

        #[error("a readback is already in flight or waiting to be released")]
        ReadbackBusy,

        #[error("readback failed: {0}")]
        ReadbackFailed(String),

        #[error("sample count {0} is not supported by the surface format")]
        UnsupportedSampleCount(u32),

        #[error("font index {index} is out of range ({count} fonts loaded)")]
        FontIndex
        {
                index: usize,
                count: usize,
        },

        #[error("gpu error: {0}")]
        Gpu(String),

        #[error("surface error: {0}")]
        Surface(String),

        #[error("failed to read '{}'", .path.display())]
        Io
        {
                path: PathBuf,
                #[source]
                source: std::io::Error,
        },
}
