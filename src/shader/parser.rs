//! Single-pass scanner for the binding and entry-point attributes of a WGSL
//! module.
//!
//! Only the attribute syntax is understood: `@group`/`@binding` resource
//! declarations and `@compute`/`@vertex`/`@fragment` entry points with an
//! optional `@workgroup_size`. Everything else in the source is skipped.
//! Attributes the scanner does not know about (`@location`, `@builtin`, ...)
//! are ignored silently. A known attribute that does not have the expected
//! shape is dropped and reported as a [`Diagnostic`].

use std::fmt;

use crate::pool::ShaderId;
use crate::shader::info::BindingDetails;
use crate::shader::info::BindingInfo;
use crate::shader::info::BindingKind;
use crate::shader::info::EntryKind;
use crate::shader::info::EntryPoint;
use crate::shader::info::MAX_BINDINGS;
use crate::shader::info::MAX_GROUPS;
use crate::shader::info::MAX_IDENT_LENGTH;
use crate::shader::info::ShaderInfo;
use crate::shader::info::TextureInfo;
use crate::shader::info::WorkgroupSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity
{
        /// A value was defaulted, the declaration was kept.
        Warning,
        /// The declaration was dropped.
        Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic
{
        pub severity: Severity,
        /// Byte offset into the source where the declaration started.
        pub position: usize,
        pub message: String,
}

impl fmt::Display for Diagnostic
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                write!(f, "{:?} at byte {}: {}", self.severity, self.position, self.message)
        }
}

#[derive(Debug, Clone)]
pub struct ParseOutput
{
        pub info: ShaderInfo,
        pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput
{
        pub fn has_errors(&self) -> bool
        {
                self.diagnostics.iter().any(|d| d.severity == Severity::Error)
        }
}

/// Parses `source` into the reflection data for `shader`.
pub fn parse_shader(
        source: &str,
        shader: ShaderId,
) -> ParseOutput
{
        Parser::new(source).parse(shader)
}

#[derive(Debug)]
pub struct Parser<'a>
{
        input: &'a [u8],

        position: usize,

        diagnostics: Vec<Diagnostic>,

        /// `@workgroup_size` seen before its `@compute` attribute.
        pending_workgroup_size: Option<WorkgroupSize>,
}

impl<'a> Parser<'a>
{
        pub fn new(source: &'a str) -> Self
        {
                Self {
                        input: source.as_bytes(),
                        position: 0,
                        diagnostics: Vec::new(),
                        pending_workgroup_size: None,
                }
        }

        pub fn position(&self) -> usize
        {
                self.position
        }

        pub fn peek(&self) -> Option<u8>
        {
                self.input.get(self.position).copied()
        }

        fn peek_at(
                &self,
                offset: usize,
        ) -> Option<u8>
        {
                self.input.get(self.position + offset).copied()
        }

        pub fn advance(&mut self) -> Option<u8>
        {
                let c = self.peek()?;

                self.position += 1;

                Some(c)
        }

        pub fn at_end(&self) -> bool
        {
                self.position >= self.input.len()
        }

        pub fn skip_whitespace(&mut self)
        {
                while self.peek().is_some_and(|c| c.is_ascii_whitespace())
                {
                        self.position += 1;
                }
        }

        /// Unsigned decimal literal. `None` when no digit is present.
        pub fn parse_number(&mut self) -> Option<u32>
        {
                self.skip_whitespace();

                let start = self.position;

                let mut value: u32 = 0;

                while let Some(c) = self.peek().filter(u8::is_ascii_digit)
                {
                        value = value.saturating_mul(10).saturating_add(u32::from(c - b'0'));
                        self.position += 1;
                }

                // WGSL allows a `u`/`i` suffix on integer literals.
                if self.position > start && matches!(self.peek(), Some(b'u' | b'i'))
                {
                        self.position += 1;
                }

                (self.position > start).then_some(value)
        }

        /// Letters, digits and `_`. Type tokens also take `<`, `>` and, inside
        /// angle brackets, `,` and spaces. Anything past
        /// [`MAX_IDENT_LENGTH`] - 1 characters is consumed but not kept.
        pub fn parse_identifier(
                &mut self,
                is_type: bool,
        ) -> String
        {
                self.skip_whitespace();

                let mut ident = String::new();

                let mut depth = 0usize;

                while let Some(c) = self.peek()
                {
                        let accepted = match c
                        {
                                b'_' => true,
                                c if c.is_ascii_alphanumeric() => true,
                                b'<' if is_type =>
                                {
                                        depth += 1;
                                        true
                                }
                                b'>' if is_type && depth > 0 =>
                                {
                                        depth -= 1;
                                        true
                                }
                                b',' | b' ' if is_type && depth > 0 => true,
                                _ => false,
                        };

                        if !accepted
                        {
                                break;
                        }

                        if ident.len() < MAX_IDENT_LENGTH - 1
                        {
                                ident.push(char::from(c));
                        }

                        self.position += 1;
                }

                ident
        }

        /// Reads `uniform|storage [, read|write|read_write]` between the angle
        /// brackets of a `var<...>`. The cursor is left on the closing `>`.
        pub fn parse_storage_class_and_access(&mut self) -> wgpu::BufferUsages
        {
                let start = self.position;

                let mut usage = match self.parse_identifier(false).as_str()
                {
                        "uniform" => wgpu::BufferUsages::UNIFORM,
                        "storage" => wgpu::BufferUsages::STORAGE,
                        other =>
                        {
                                self.warning(start, format!("unknown address space '{other}'"));
                                wgpu::BufferUsages::empty()
                        }
                };

                self.skip_whitespace();

                if self.peek() == Some(b',')
                {
                        self.advance();

                        let access_start = self.position;

                        match self.parse_identifier(false).as_str()
                        {
                                "read" => usage |= wgpu::BufferUsages::COPY_SRC,
                                "write" => usage |= wgpu::BufferUsages::COPY_DST,
                                "read_write" =>
                                {
                                        usage |= wgpu::BufferUsages::COPY_SRC
                                                | wgpu::BufferUsages::COPY_DST
                                }
                                other => self.warning(
                                        access_start,
                                        format!("unknown access mode '{other}'"),
                                ),
                        }

                        self.skip_whitespace();
                }

                usage
        }

        /// Classifies a declared type. Anything that is not a texture is
        /// treated as a buffer.
        pub fn parse_binding_type(type_name: &str) -> BindingKind
        {
                if type_name == "storage_texture" || type_name.starts_with("texture_storage")
                {
                        BindingKind::StorageTexture
                }
                else if type_name == "texture"
                        || type_name.starts_with("texture_")
                        || type_name.starts_with("sampler")
                {
                        BindingKind::Texture
                }
                else
                {
                        BindingKind::Buffer
                }
        }

        /// Parses one `(N)` attribute argument.
        fn parse_attribute_argument(&mut self) -> Option<u32>
        {
                if !self.expect(b'(')
                {
                        return None;
                }

                let value = self.parse_number()?;

                self.expect(b')').then_some(value)
        }

        /// `@group(N) @binding(M) var<...> name : type`, attributes in either
        /// order. The cursor must be on the first `@`.
        pub fn parse_binding(
                &mut self,
                shader: ShaderId,
                info: &mut ShaderInfo,
        )
        {
                let start = self.position;

                let mut group = None;

                let mut binding = None;

                for _ in 0..2
                {
                        self.skip_whitespace();

                        if !self.expect(b'@')
                        {
                                break;
                        }

                        let attribute = self.parse_identifier(false);

                        let value = self.parse_attribute_argument();

                        match (attribute.as_str(), value)
                        {
                                ("group", Some(v)) if group.is_none() => group = Some(v),
                                ("binding", Some(v)) if binding.is_none() => binding = Some(v),
                                (name, _) =>
                                {
                                        return self.error(
                                                start,
                                                format!("malformed or repeated @{name} attribute"),
                                        );
                                }
                        }
                }

                let (Some(group), Some(binding)) = (group, binding)
                else
                {
                        return self.error(start, "@group and @binding must appear together");
                };

                if !self.expect_keyword("var")
                {
                        return self.error(start, "expected 'var' after @group/@binding");
                }

                self.skip_whitespace();

                let usage = if self.peek() == Some(b'<')
                {
                        self.advance();

                        let usage = self.parse_storage_class_and_access();

                        if !self.expect(b'>')
                        {
                                return self.error(start, "unterminated 'var<...>' qualifier");
                        }

                        usage
                }
                else
                {
                        wgpu::BufferUsages::empty()
                };

                let name = self.parse_identifier(false);

                if name.is_empty()
                {
                        return self.error(start, "missing binding name");
                }

                if !self.expect(b':')
                {
                        return self.error(start, format!("expected ':' after binding '{name}'"));
                }

                let data_type = self.parse_identifier(true);

                if data_type.is_empty()
                {
                        return self.error(start, format!("missing type for binding '{name}'"));
                }

                if group as usize >= MAX_GROUPS || binding as usize >= MAX_BINDINGS
                {
                        return self.error(
                                start,
                                format!(
                                        "@group({group}) @binding({binding}) exceeds {MAX_GROUPS} groups x {MAX_BINDINGS} bindings"
                                ),
                        );
                }

                if info.bindings
                        .iter()
                        .any(|b| b.group == group && b.binding == binding)
                {
                        return self.error(
                                start,
                                format!("@group({group}) @binding({binding}) declared twice"),
                        );
                }

                let kind = Self::parse_binding_type(&data_type);

                let details = match kind
                {
                        BindingKind::Buffer => BindingDetails::Buffer { usage },
                        BindingKind::Texture => BindingDetails::Texture(TextureInfo::default()),
                        BindingKind::StorageTexture => BindingDetails::Texture(TextureInfo {
                                usage: wgpu::TextureUsages::STORAGE_BINDING,
                                ..TextureInfo::default()
                        }),
                };

                info.bindings.push(BindingInfo {
                        group,
                        binding,
                        shader,
                        kind,
                        details,
                        size: 0,
                        name,
                        data_type,
                });
        }

        /// `(x[, y[, z]])` after `@workgroup_size`.
        fn parse_workgroup_size(
                &mut self,
                start: usize,
        ) -> Option<WorkgroupSize>
        {
                if !self.expect(b'(')
                {
                        self.error(start, "expected '(' after @workgroup_size");
                        return None;
                }

                let mut axes = [1u32; 3];

                for (i, axis) in axes.iter_mut().enumerate()
                {
                        if i > 0 && !self.expect(b',')
                        {
                                break;
                        }

                        match self.parse_number()
                        {
                                Some(v) => *axis = v,
                                None =>
                                {
                                        let token = self.parse_identifier(false);

                                        self.warning(
                                                start,
                                                format!("non-literal workgroup size '{token}' treated as 1"),
                                        );
                                }
                        }
                }

                if !self.expect(b')')
                {
                        self.error(start, "unterminated @workgroup_size");
                        return None;
                }

                Some(WorkgroupSize::new(axes[0], axes[1], axes[2]))
        }

        /// `@compute|@vertex|@fragment [@workgroup_size(...)] fn name`. The
        /// cursor must be on the `@`.
        pub fn parse_entry_point(
                &mut self,
                info: &mut ShaderInfo,
        )
        {
                let start = self.position;

                self.advance();

                let kind = match self.parse_identifier(false).as_str()
                {
                        "compute" => EntryKind::Compute,
                        "vertex" => EntryKind::Vertex,
                        "fragment" => EntryKind::Fragment,
                        _ =>
                        {
                                self.position = start;
                                return;
                        }
                };

                let mut workgroup_size = self.pending_workgroup_size.take();

                loop
                {
                        self.skip_whitespace();

                        if self.peek() != Some(b'@')
                        {
                                break;
                        }

                        let attribute_start = self.position;

                        self.advance();

                        if self.parse_identifier(false) != "workgroup_size"
                        {
                                self.position = attribute_start;
                                return self.error(
                                        start,
                                        "unexpected attribute between entry point and 'fn'",
                                );
                        }

                        match self.parse_workgroup_size(attribute_start)
                        {
                                Some(size) => workgroup_size = Some(size),
                                None => return,
                        }
                }

                if !self.expect_keyword("fn")
                {
                        return self.error(start, "expected 'fn' after entry-point attribute");
                }

                let name = self.parse_identifier(false);

                if name.is_empty()
                {
                        return self.error(start, "missing entry-point name");
                }

                let workgroup_size = match kind
                {
                        EntryKind::Compute => workgroup_size.unwrap_or_default(),
                        _ => WorkgroupSize::default(),
                };

                info.entry_points.push(EntryPoint {
                        kind,
                        name,
                        workgroup_size,
                });
        }

        pub fn parse(
                mut self,
                shader: ShaderId,
        ) -> ParseOutput
        {
                let mut info = ShaderInfo::default();

                while let Some(c) = self.peek()
                {
                        match c
                        {
                                b'/' if self.skip_comment() =>
                                {}
                                b'@' =>
                                {
                                        let start = self.position;

                                        self.advance();

                                        let attribute = self.parse_identifier(false);

                                        match attribute.as_str()
                                        {
                                                "group" | "binding" =>
                                                {
                                                        self.position = start;
                                                        self.parse_binding(shader, &mut info);
                                                }
                                                "compute" | "vertex" | "fragment" =>
                                                {
                                                        self.position = start;
                                                        self.parse_entry_point(&mut info);
                                                }
                                                "workgroup_size" =>
                                                {
                                                        self.pending_workgroup_size =
                                                                self.parse_workgroup_size(start);
                                                }
                                                // Unknown attributes are not our business.
                                                _ =>
                                                {}
                                        }
                                }
                                _ =>
                                {
                                        self.advance();
                                }
                        }
                }

                info.index();

                ParseOutput {
                        info,
                        diagnostics: self.diagnostics,
                }
        }

        fn skip_comment(&mut self) -> bool
        {
                match self.peek_at(1)
                {
                        Some(b'/') =>
                        {
                                while self.advance().is_some_and(|c| c != b'\n')
                                {}
                                true
                        }
                        Some(b'*') =>
                        {
                                self.position += 2;

                                while !self.at_end()
                                {
                                        if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/')
                                        {
                                                self.position += 2;
                                                break;
                                        }

                                        self.position += 1;
                                }
                                true
                        }
                        _ => false,
                }
        }

        fn expect(
                &mut self,
                c: u8,
        ) -> bool
        {
                self.skip_whitespace();

                if self.peek() == Some(c)
                {
                        self.position += 1;
                        true
                }
                else
                {
                        false
                }
        }

        fn expect_keyword(
                &mut self,
                keyword: &str,
        ) -> bool
        {
                let save = self.position;

                if self.parse_identifier(false) == keyword
                {
                        true
                }
                else
                {
                        self.position = save;
                        false
                }
        }

        fn error(
                &mut self,
                position: usize,
                message: impl Into<String>,
        )
        {
                self.push(Severity::Error, position, message.into());
        }

        fn warning(
                &mut self,
                position: usize,
                message: impl Into<String>,
        )
        {
                self.push(Severity::Warning, position, message.into());
        }

        fn push(
                &mut self,
                severity: Severity,
                position: usize,
                message: String,
        )
        {
                log::debug!("wgsl scan {:?} at {}: {}", severity, position, message);

                self.diagnostics.push(Diagnostic {
                        severity,
                        position,
                        message,
                });
        }
}

#[cfg(test)]
mod tests
{
        use super::*;

        const COMPUTE: &str = r#"
struct Params {
    scale: f32,
}

@group(0) @binding(0) var<storage, read> input: array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(0) @binding(2) var<uniform> params: Params;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    output[id.x] = input[id.x] * params.scale;
}
"#;

        fn id() -> ShaderId
        {
                ShaderId::from_raw(7)
        }

        #[test]
        fn bindings_come_out_in_declaration_order()
        {
                let out = parse_shader(COMPUTE, id());

                assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);

                let names: Vec<_> = out.info.bindings.iter().map(|b| b.name.as_str()).collect();
                assert_eq!(names, ["input", "output", "params"]);

                let input = &out.info.bindings[0];
                assert_eq!((input.group, input.binding), (0, 0));
                assert_eq!(input.data_type, "array<f32>");
                assert_eq!(input.kind, BindingKind::Buffer);
                assert_eq!(input.shader, id());
                assert_eq!(
                        input.buffer_usage(),
                        Some(wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC)
                );
                assert!(input.is_read_only_storage());

                let output = &out.info.bindings[1];
                assert_eq!(
                        output.buffer_usage(),
                        Some(wgpu::BufferUsages::STORAGE
                                | wgpu::BufferUsages::COPY_SRC
                                | wgpu::BufferUsages::COPY_DST)
                );
                assert!(!output.is_read_only_storage());

                let params = &out.info.bindings[2];
                assert!(params.is_uniform());
                assert_eq!(params.data_type, "Params");
        }

        #[test]
        fn compute_entry_point_with_workgroup_size()
        {
                let out = parse_shader(COMPUTE, id());

                let entry = out.info.compute_entry().unwrap();

                assert_eq!(entry.name, "main");
                assert_eq!(entry.workgroup_size, WorkgroupSize { x: 64, y: 1, z: 1 });
                assert_eq!(out.info.stages(), wgpu::ShaderStages::COMPUTE);
        }

        #[test]
        fn zero_and_missing_workgroup_axes_become_one()
        {
                let out = parse_shader("@compute @workgroup_size(8, 0) fn a() {}", id());
                assert_eq!(
                        out.info.entry_points[0].workgroup_size,
                        WorkgroupSize { x: 8, y: 1, z: 1 }
                );

                let out = parse_shader("@compute @workgroup_size(0,0,0) fn a() {}", id());
                assert_eq!(out.info.entry_points[0].workgroup_size, WorkgroupSize::default());

                let out = parse_shader("@compute fn a() {}", id());
                assert_eq!(out.info.entry_points[0].workgroup_size, WorkgroupSize::default());

                let out = parse_shader("@compute @workgroup_size( 4 , 2 , 3 ) fn a() {}", id());
                assert_eq!(
                        out.info.entry_points[0].workgroup_size,
                        WorkgroupSize { x: 4, y: 2, z: 3 }
                );
        }

        #[test]
        fn workgroup_size_before_compute_attribute()
        {
                let out = parse_shader("@workgroup_size(16, 16) @compute fn a() {}", id());

                assert_eq!(
                        out.info.compute_entry().unwrap().workgroup_size,
                        WorkgroupSize { x: 16, y: 16, z: 1 }
                );
        }

        #[test]
        fn render_entry_points_and_unknown_attributes()
        {
                let src = r#"
@group(0) @binding(0) var<uniform> mvp: mat4x4<f32>;

struct VertexOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOut {
    var out: VertexOut;
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

                let out = parse_shader(src, id());

                assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
                assert_eq!(out.info.bindings.len(), 1);
                assert_eq!(out.info.bindings[0].data_type, "mat4x4<f32>");
                assert_eq!(out.info.vertex_entry().unwrap().name, "vs_main");
                assert_eq!(out.info.fragment_entry().unwrap().name, "fs_main");
                assert!(out.info.compute_entry().is_none());
                assert_eq!(
                        out.info.stages(),
                        wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT
                );
        }

        #[test]
        fn textures_and_samplers_are_classified()
        {
                let src = r#"
@group(0) @binding(0) var tex: texture_2d<f32>;
@group(0) @binding(1) var samp: sampler;
@group(0) @binding(2) var img: texture_storage_2d<rgba8unorm, write>;
"#;

                let out = parse_shader(src, id());

                let kinds: Vec<_> = out.info.bindings.iter().map(|b| b.kind).collect();
                assert_eq!(
                        kinds,
                        [BindingKind::Texture, BindingKind::Texture, BindingKind::StorageTexture]
                );
                assert_eq!(out.info.bindings[2].data_type, "texture_storage_2d<rgba8unorm, write>");
        }

        #[test]
        fn missing_binding_is_not_found()
        {
                let out = parse_shader(COMPUTE, id());

                assert!(out.info.binding(0, 5).is_none());
                assert!(out.info.binding(3, 0).is_none());
                assert!(out.info.binding(99, 0).is_none());
                assert_eq!(out.info.binding(0, 2).unwrap().name, "params");
                assert_eq!(out.info.binding_by_name("output").unwrap().binding, 1);
        }

        #[test]
        fn malformed_binding_is_reported_not_appended()
        {
                let src = r#"
@group(0) var<storage> broken: array<f32>;
@group(0) @binding(0) var<storage> ok: array<f32>;
@group(0) @binding(1) var<storage> : array<f32>;
@compute @workgroup_size(1) fn main() {}
"#;

                let out = parse_shader(src, id());

                assert_eq!(out.info.bindings.len(), 1);
                assert_eq!(out.info.bindings[0].name, "ok");
                assert!(out.has_errors());
                assert_eq!(
                        out.diagnostics
                                .iter()
                                .filter(|d| d.severity == Severity::Error)
                                .count(),
                        2
                );
        }

        #[test]
        fn duplicate_and_out_of_range_bindings_are_errors()
        {
                let src = r#"
@group(0) @binding(0) var<storage> a: array<f32>;
@group(0) @binding(0) var<storage> b: array<f32>;
@group(4) @binding(0) var<storage> c: array<f32>;
@group(0) @binding(16) var<storage> d: array<f32>;
"#;

                let out = parse_shader(src, id());

                assert_eq!(out.info.bindings.len(), 1);
                assert_eq!(out.diagnostics.len(), 3);
        }

        #[test]
        fn binding_before_group_is_accepted()
        {
                let out = parse_shader("@binding(3) @group(1) var<uniform> u: f32;", id());

                let b = out.info.binding(1, 3).unwrap();
                assert_eq!(b.name, "u");
        }

        #[test]
        fn commented_declarations_are_ignored()
        {
                let src = r#"
// @group(0) @binding(0) var<storage> a: array<f32>;
/* @compute fn nope() {} */
@compute fn yes() {}
"#;

                let out = parse_shader(src, id());

                assert!(out.info.bindings.is_empty());
                assert_eq!(out.info.entry_points.len(), 1);
                assert_eq!(out.info.entry_points[0].name, "yes");
        }

        #[test]
        fn long_identifiers_are_truncated()
        {
                let long = "x".repeat(300);

                let src = format!("@group(0) @binding(0) var<storage> {long}: array<f32>;");

                let out = parse_shader(&src, id());

                assert_eq!(out.info.bindings[0].name.len(), MAX_IDENT_LENGTH - 1);
                assert_eq!(out.info.bindings[0].data_type, "array<f32>");
        }

        #[test]
        fn truncated_source_does_not_read_past_the_end()
        {
                for src in ["@", "@group(", "@group(0) @binding(1) var<stor", "@compute @workgroup_size(4", "@vertex fn"]
                {
                        let out = parse_shader(src, id());
                        assert!(out.info.bindings.is_empty());
                        assert!(out.info.entry_points.is_empty());
                }
        }

        #[test]
        fn cursor_primitives()
        {
                let mut p = Parser::new("  42u abc_1<x> ");

                assert_eq!(p.parse_number(), Some(42));
                assert_eq!(p.parse_identifier(true), "abc_1<x>");
                p.skip_whitespace();
                assert!(p.at_end());
                assert_eq!(p.advance(), None);
        }
}
