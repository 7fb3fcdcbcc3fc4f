//! Fonts for the overlay.
//!
//! Fonts are handed over once, before startup. Afterwards only the selected
//! font and the text size change, and those changes are applied between
//! frames since egui rebuilds its atlas when fonts change.

use std::path::Path;
use std::sync::Arc;

use egui::FontData;
use egui::FontDefinitions;
use egui::FontFamily;
use egui::FontId;
use egui::TextStyle;

use crate::error::NanoError;
use crate::error::NanoResult;

#[derive(Debug, Clone, PartialEq)]
pub struct FontSource
{
        pub name: String,
        pub bytes: Vec<u8>,
}

impl FontSource
{
        pub fn new(
                name: impl Into<String>,
                bytes: Vec<u8>,
        ) -> Self
        {
                Self {
                        name: name.into(),
                        bytes,
                }
        }

        /// Reads a TTF/OTF file, named after its file stem.
        pub fn from_file(path: impl AsRef<Path>) -> NanoResult<Self>
        {
                let path = path.as_ref();

                let bytes = std::fs::read(path).map_err(|source| NanoError::Io {
                        path: path.to_path_buf(),
                        source,
                })?;

                let name = path
                        .file_stem()
                        .map_or_else(|| "font".to_owned(), |s| s.to_string_lossy().into_owned());

                Ok(Self::new(name, bytes))
        }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FontChange
{
        Font(usize),
        Size(f32),
}

#[derive(Debug)]
pub struct FontBook
{
        fonts: Vec<FontSource>,
        /// `None` keeps egui's built-in fonts.
        current: Option<usize>,
        size: f32,
        pending: Vec<FontChange>,
        /// Atlas not yet built for the loaded fonts.
        fonts_dirty: bool,
}

impl FontBook
{
        pub fn new(
                fonts: Vec<FontSource>,
                size: f32,
        ) -> Self
        {
                let current = if fonts.is_empty() { None } else { Some(0) };

                Self {
                        fonts,
                        current,
                        size,
                        pending: Vec::new(),
                        fonts_dirty: true,
                }
        }

        pub fn len(&self) -> usize
        {
                self.fonts.len()
        }

        pub fn is_empty(&self) -> bool
        {
                self.fonts.is_empty()
        }

        pub fn names(&self) -> impl Iterator<Item = &str>
        {
                self.fonts.iter().map(|f| f.name.as_str())
        }

        pub fn current(&self) -> Option<usize>
        {
                self.current
        }

        pub fn size(&self) -> f32
        {
                self.size
        }

        /// Queues a switch to the font at `index`.
        pub fn set_font(
                &mut self,
                index: usize,
        ) -> NanoResult<()>
        {
                if index >= self.fonts.len()
                {
                        return Err(NanoError::FontIndex {
                                index,
                                count: self.fonts.len(),
                        });
                }

                self.pending.push(FontChange::Font(index));

                Ok(())
        }

        pub fn set_font_size(
                &mut self,
                size: f32,
        )
        {
                self.pending.push(FontChange::Size(size.clamp(6.0, 96.0)));
        }

        pub fn has_pending(&self) -> bool
        {
                self.fonts_dirty || !self.pending.is_empty()
        }

        /// Folds queued changes into the current selection. Returns whether
        /// the font atlas must be rebuilt and whether text sizes changed.
        fn take_pending(&mut self) -> (bool, bool)
        {
                let mut rebuild = std::mem::take(&mut self.fonts_dirty);

                let mut resize = rebuild;

                for change in self.pending.drain(..)
                {
                        match change
                        {
                                FontChange::Font(index) if self.current != Some(index) =>
                                {
                                        self.current = Some(index);
                                        rebuild = true;
                                }
                                FontChange::Font(_) => {}
                                FontChange::Size(size) =>
                                {
                                        self.size = size;
                                        resize = true;
                                }
                        }
                }

                (rebuild, resize)
        }

        /// Every loaded font registered, the selected one first in both
        /// families.
        pub fn definitions(&self) -> FontDefinitions
        {
                let mut definitions = FontDefinitions::default();

                for font in &self.fonts
                {
                        definitions
                                .font_data
                                .insert(font.name.clone(), Arc::new(FontData::from_owned(font.bytes.clone())));
                }

                if let Some(selected) = self.current.and_then(|i| self.fonts.get(i))
                {
                        for family in [FontFamily::Proportional, FontFamily::Monospace]
                        {
                                definitions
                                        .families
                                        .entry(family)
                                        .or_default()
                                        .insert(0, selected.name.clone());
                        }
                }

                definitions
        }

        pub fn text_styles(&self) -> Vec<(TextStyle, FontId)>
        {
                let size = self.size;

                vec![
                        (TextStyle::Small, FontId::proportional(size * 0.75)),
                        (TextStyle::Body, FontId::proportional(size)),
                        (TextStyle::Button, FontId::proportional(size)),
                        (TextStyle::Monospace, FontId::monospace(size)),
                        (TextStyle::Heading, FontId::proportional(size * 1.4)),
                ]
        }

        /// Applies queued changes to `ctx`. Call between frames.
        pub fn apply(
                &mut self,
                ctx: &egui::Context,
        )
        {
                let (rebuild, resize) = self.take_pending();

                if rebuild && !self.fonts.is_empty()
                {
                        ctx.set_fonts(self.definitions());

                        log::info!("Font atlas rebuilt with {} font(s)", self.fonts.len());
                }

                if resize
                {
                        let styles = self.text_styles();

                        ctx.style_mut(|style| {
                                style.text_styles = styles.into_iter().collect();
                        });
                }
        }
}
