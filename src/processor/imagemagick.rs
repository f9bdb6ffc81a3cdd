//! Image Conversion Processor
//!
//! Claims `<name>.{png,jpeg,svg}.pdf` inside the cache directory and emits
//! the convert, optional crop, and cache-copy rules for it.
//!
//! ```text
//! foo/.tek_cache/bar.png.pdf        target (convert)
//! foo/.tek_cache/bar.png            cached copy of the source
//! foo/bar.png                       original source
//! ```
//!
//! A `.uncrop.` segment before the format requests a `pdfcrop` pass, and
//! `.inkscape.svg.pdf` selects inkscape instead of ImageMagick.

use std::sync::Arc;

use tracing::debug;

use super::{ProcessError, Processor, ProcessorFamily};
use crate::makefile::Makefile;
use crate::paths;
use crate::stack::DependencyStack;
use crate::CACHE_MARKER;

const FORMATS: [&str; 3] = ["png", "jpeg", "svg"];

pub struct ImageMagick {
    name: Arc<str>,
}

impl ImageMagick {
    /// Allocate the shared display name once at startup
    pub fn boot() -> Self {
        Self {
            name: Arc::from("CONVERT"),
        }
    }

    /// The concrete claim behind `search`
    pub fn claim(&self, filename: &str) -> Option<ImageClaim> {
        let format = FORMATS
            .iter()
            .copied()
            .find(|f| paths::ends_with(filename, &format!(".{}.pdf", f)))?;

        let crop = paths::ends_with(filename, &format!(".uncrop.{}.pdf", format));
        let inkscape = paths::ends_with(filename, ".inkscape.svg.pdf");

        Some(ImageClaim {
            name: Arc::clone(&self.name),
            format,
            crop,
            inkscape,
        })
    }
}

impl ProcessorFamily for ImageMagick {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&self, filename: &str) -> Option<Box<dyn Processor>> {
        self.claim(filename).map(|c| Box::new(c) as Box<dyn Processor>)
    }
}

/// Per-file configuration decided at claim time
#[derive(Debug, Clone)]
pub struct ImageClaim {
    name: Arc<str>,
    format: &'static str,
    pub crop: bool,
    pub inkscape: bool,
}

impl ImageClaim {
    /// Raster or vector format named by the suffix
    pub fn format(&self) -> &'static str {
        self.format
    }

    /// Work out every path this claim needs before anything is emitted
    pub fn derive(&self, filename: &str) -> Result<ImagePaths, ProcessError> {
        let missing = || ProcessError::MissingCacheMarker {
            filename: filename.to_string(),
        };

        let marker_at = paths::find(filename, CACHE_MARKER).ok_or_else(missing)?;
        let marker = marker_at..marker_at + CACHE_MARKER.len();

        let spliced = paths::splice_out(filename, marker);
        let infile = paths::strip_suffix_n(&spliced, ".pdf".len())
            .ok_or_else(missing)?
            .to_string();

        // The directory of the claimed file is what gets created, not the
        // marker-terminated prefix located above.
        let cache_dir = paths::dirname(filename).to_string();

        let cache_name = paths::strip_suffix_n(filename, ".pdf".len())
            .ok_or_else(missing)?
            .to_string();

        // `x.uncrop.png.pdf` and `x.uncrop.jpeg.pdf` in one directory share
        // the same intermediate `x-tocrop.pdf` target.
        let out_name = if self.crop {
            let suffix = format!(".uncrop.{}.pdf", self.format);
            let stem = paths::strip_suffix_n(filename, suffix.len()).ok_or_else(missing)?;
            format!("{}-tocrop.pdf", stem)
        } else {
            filename.to_string()
        };

        Ok(ImagePaths {
            infile,
            cache_dir,
            cache_name,
            out_name,
        })
    }
}

/// Paths derived from one claimed filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePaths {
    /// Original source file
    pub infile: String,
    /// Directory created before each command runs
    pub cache_dir: String,
    /// Cached copy of the source
    pub cache_name: String,
    /// Converter output; differs from the filename only when cropping
    pub out_name: String,
}

fn mkdir(makefile: &mut Makefile, dir: &str) -> Result<(), ProcessError> {
    makefile.add_cmd(format_args!("mkdir -p \"{}\" >& /dev/null || true", dir))?;
    Ok(())
}

impl Processor for ImageClaim {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &self,
        filename: &str,
        _stack: &mut DependencyStack,
        m: &mut Makefile,
    ) -> Result<(), ProcessError> {
        let p = self.derive(filename)?;
        debug!(filename, infile = %p.infile, crop = self.crop, inkscape = self.inkscape, "image rules");

        m.create_target(&p.out_name)?;
        m.start_deps()?;
        m.add_dep(&p.cache_name)?;
        m.end_deps()?;

        m.start_cmds()?;
        if self.inkscape {
            m.add_nam_cmd(format_args!("echo -e \"INKCONV\\t{}\"", p.infile))?;
            mkdir(m, &p.cache_dir)?;
            m.add_cmd(format_args!(
                "inkscape \"{}\" --export-pdf=\"{}\" -D",
                p.infile, p.out_name
            ))?;
        } else {
            m.add_nam_cmd(format_args!("echo -e \"CONVERT\\t{}\"", p.infile))?;
            mkdir(m, &p.cache_dir)?;
            m.add_cmd(format_args!("convert \"{}\" \"{}\"", p.infile, p.out_name))?;
        }
        m.end_cmds()?;

        if self.crop {
            m.create_target(filename)?;
            m.start_deps()?;
            m.add_dep(&p.out_name)?;
            m.end_deps()?;

            m.start_cmds()?;
            m.add_nam_cmd(format_args!("echo -e \"CROP\\t{}\"", p.infile))?;
            mkdir(m, &p.cache_dir)?;
            m.add_cmd(format_args!(
                "pdfcrop \"{}\" \"{}\" >& /dev/null",
                p.out_name, filename
            ))?;
            m.end_cmds()?;
        }

        // Later stages depend on the cached source rather than the original.
        m.create_target(&p.cache_name)?;
        m.start_deps()?;
        m.add_dep(&p.infile)?;
        m.end_deps()?;

        m.start_cmds()?;
        m.add_nam_cmd(format_args!("echo -e \"IMGCP\\t{}\"", p.infile))?;
        mkdir(m, &p.cache_dir)?;
        m.add_cmd(format_args!("cp \"{}\" \"{}\"", p.infile, p.cache_name))?;
        m.end_cmds()?;

        Ok(())
    }
}
