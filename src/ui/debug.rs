//! The F1 debug overlay: frame timing, pool usage, the shader list and a
//! few runtime settings.

use crate::pool::ShaderId;

/// One row of the shader list.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderRow
{
        pub id: ShaderId,
        pub label: String,
        pub compute: bool,
        pub render: bool,
        pub active: bool,
}

/// Snapshot the overlay displays.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugInfo
{
        pub fps: f32,
        pub frame_ms: f32,
        pub frame_count: u64,
        pub surface_size: (u32, u32),
        pub shaders: usize,
        pub shader_limit: usize,
        pub buffers: usize,
        pub buffer_limit: usize,
        pub gpu_objects: usize,
        /// Active shaders in execution order, then the inactive ones.
        pub rows: Vec<ShaderRow>,
        pub sample_count: u32,
        pub fonts: Vec<String>,
        pub current_font: Option<usize>,
        pub font_size: f32,
        pub clear_color: [f32; 4],
}

/// Settings changed through the overlay, applied by the frame driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugRequests
{
        pub sample_count: Option<u32>,
        pub font: Option<usize>,
        pub font_size: Option<f32>,
        pub clear_color: Option<[f32; 4]>,
        /// Flip this shader between active and inactive.
        pub toggle_shader: Option<ShaderId>,
}

impl DebugRequests
{
        pub fn is_empty(&self) -> bool
        {
                *self == Self::default()
        }
}

const SAMPLE_COUNTS: [u32; 2] = [1, 4];

#[derive(Debug, Default)]
pub struct DebugOverlay
{
        pub visible: bool,
}

impl DebugOverlay
{
        pub fn new(visible: bool) -> Self
        {
                Self { visible }
        }

        pub fn toggle(&mut self)
        {
                self.visible = !self.visible;
        }

        pub fn show(
                &self,
                ctx: &egui::Context,
                info: &DebugInfo,
        ) -> DebugRequests
        {
                let mut requests = DebugRequests::default();

                if !self.visible
                {
                        return requests;
                }

                egui::Window::new("nano")
                        .default_pos(egui::pos2(10.0, 10.0))
                        .resizable(false)
                        .show(ctx, |ui| {
                                ui.label(format!("{:.1} fps ({:.2} ms)", info.fps, info.frame_ms));
                                ui.label(format!(
                                        "frame {}, surface {}x{}",
                                        info.frame_count, info.surface_size.0, info.surface_size.1
                                ));

                                ui.separator();

                                ui.label(format!("shaders: {} / {}", info.shaders, info.shader_limit));
                                ui.label(format!("buffers: {} / {}", info.buffers, info.buffer_limit));
                                ui.label(format!("gpu objects: {}", info.gpu_objects));

                                let active = info.rows.iter().filter(|r| r.active).count();

                                egui::CollapsingHeader::new(format!("Shaders ({active} active)"))
                                        .default_open(true)
                                        .show(ui, |ui| {
                                                for row in &info.rows
                                                {
                                                        let kind = match (row.compute, row.render)
                                                        {
                                                                (true, true) => "compute+render",
                                                                (true, false) => "compute",
                                                                (false, true) => "render",
                                                                (false, false) => "unbuilt",
                                                        };

                                                        let mut enabled = row.active;

                                                        ui.checkbox(&mut enabled, format!("{} [{kind}]", row.label));

                                                        if enabled != row.active
                                                        {
                                                                requests.toggle_shader = Some(row.id);
                                                        }
                                                }
                                        });

                                ui.separator();

                                let mut samples = info.sample_count;

                                egui::ComboBox::from_label("MSAA")
                                        .selected_text(format!("{samples}x"))
                                        .show_ui(ui, |ui| {
                                                for count in SAMPLE_COUNTS
                                                {
                                                        ui.selectable_value(&mut samples, count, format!("{count}x"));
                                                }
                                        });

                                if samples != info.sample_count
                                {
                                        requests.sample_count = Some(samples);
                                }

                                let mut color = info.clear_color;

                                ui.horizontal(|ui| {
                                        ui.label("Clear color");
                                        ui.color_edit_button_rgba_unmultiplied(&mut color);
                                });

                                if color != info.clear_color
                                {
                                        requests.clear_color = Some(color);
                                }

                                let mut size = info.font_size;

                                ui.add(egui::Slider::new(&mut size, 8.0..=32.0).text("Font size"));

                                if size != info.font_size
                                {
                                        requests.font_size = Some(size);
                                }

                                if !info.fonts.is_empty()
                                {
                                        let mut font = info.current_font.unwrap_or(0);

                                        let selected = info.fonts.get(font).cloned().unwrap_or_default();

                                        egui::ComboBox::from_label("Font")
                                                .selected_text(selected)
                                                .show_ui(ui, |ui| {
                                                        for (i, name) in info.fonts.iter().enumerate()
                                                        {
                                                                ui.selectable_value(&mut font, i, name);
                                                        }
                                                });

                                        if Some(font) != info.current_font
                                        {
                                                requests.font = Some(font);
                                        }
                                }

                                ui.small("[F1] hide");
                        });

                requests
        }
}
