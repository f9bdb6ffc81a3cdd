//! Contract Invariant Tests
//!
//! Dispatch order, fragment shape and all-or-nothing emission.

use std::sync::Arc;

use tek_rules::{
    description_digest,
    makefile::Command,
    MakefileError,
    Config, DependencyStack, ImageMagick, Makefile, Outcome, PipelineError, ProcessError,
    Processor, ProcessorFamily, ProcessorRegistry, RulePipeline,
};

/// Claims everything ending in `.pdf` and emits a single tagged target
struct Catchall {
    tag: Arc<str>,
}

impl ProcessorFamily for Catchall {
    fn name(&self) -> &str {
        &self.tag
    }

    fn search(&self, filename: &str) -> Option<Box<dyn Processor>> {
        filename.ends_with(".pdf").then(|| {
            Box::new(CatchallClaim { tag: Arc::clone(&self.tag) }) as Box<dyn Processor>
        })
    }
}

struct CatchallClaim {
    tag: Arc<str>,
}

impl Processor for CatchallClaim {
    fn name(&self) -> &str {
        &self.tag
    }

    fn process(
        &self,
        filename: &str,
        _stack: &mut DependencyStack,
        m: &mut Makefile,
    ) -> Result<(), ProcessError> {
        m.create_target(filename)?;
        m.start_deps()?;
        m.end_deps()?;
        m.start_cmds()?;
        m.add_nam_cmd(format_args!("echo -e \"{}\\t{}\"", self.tag, filename))?;
        m.end_cmds()?;
        Ok(())
    }
}

/// Emits one good target then breaks the ordering contract
struct Broken;

impl ProcessorFamily for Broken {
    fn name(&self) -> &str {
        "BROKEN"
    }

    fn search(&self, filename: &str) -> Option<Box<dyn Processor>> {
        filename.ends_with(".broken").then(|| Box::new(BrokenClaim) as Box<dyn Processor>)
    }
}

struct BrokenClaim;

impl Processor for BrokenClaim {
    fn name(&self) -> &str {
        "BROKEN"
    }

    fn process(
        &self,
        filename: &str,
        _stack: &mut DependencyStack,
        m: &mut Makefile,
    ) -> Result<(), ProcessError> {
        m.create_target(filename)?;
        m.start_deps()?;
        m.end_deps()?;
        m.start_cmds()?;
        m.end_cmds()?;
        m.create_target("second")?;
        m.add_cmd(format_args!("true"))?;
        Ok(())
    }
}

/// Pushes a frame and never pops it
struct Leaky;

impl ProcessorFamily for Leaky {
    fn name(&self) -> &str {
        "LEAKY"
    }

    fn search(&self, filename: &str) -> Option<Box<dyn Processor>> {
        filename.ends_with(".leak").then(|| Box::new(LeakyClaim) as Box<dyn Processor>)
    }
}

struct LeakyClaim;

impl Processor for LeakyClaim {
    fn name(&self) -> &str {
        "LEAKY"
    }

    fn process(
        &self,
        filename: &str,
        stack: &mut DependencyStack,
        m: &mut Makefile,
    ) -> Result<(), ProcessError> {
        stack.push(filename);
        m.create_target(filename)?;
        m.start_deps()?;
        m.end_deps()?;
        m.start_cmds()?;
        m.end_cmds()?;
        Ok(())
    }
}

fn catchall() -> Box<dyn ProcessorFamily> {
    Box::new(Catchall { tag: Arc::from("CATCHALL") })
}

fn run(filename: &str) -> Makefile {
    let pipeline = RulePipeline::default();
    let mut m = pipeline.makefile();
    let outcome = pipeline
        .generate(filename, &mut DependencyStack::new(), &mut m)
        .unwrap();
    assert!(matches!(outcome, Outcome::Emitted { .. }));
    m
}

fn label(cmds: &[Command]) -> &str {
    match &cmds[0] {
        Command::Named(text) => text.as_str(),
        other => panic!("expected a label first, got {:?}", other),
    }
}

#[test]
fn invariant_raster_conversion_fragment() {
    let m = run("foo/.tek_cache/bar.png.pdf");
    let t = m.targets();
    assert_eq!(t.len(), 2);

    assert_eq!(t[0].name, "foo/.tek_cache/bar.png.pdf");
    assert_eq!(t[0].deps, vec!["foo/.tek_cache/bar.png"]);
    assert_eq!(label(&t[0].cmds), "echo -e \"CONVERT\\tfoo/bar.png\"");
    assert_eq!(
        t[0].cmds[2],
        Command::Shell("convert \"foo/bar.png\" \"foo/.tek_cache/bar.png.pdf\"".into())
    );

    assert_eq!(t[1].name, "foo/.tek_cache/bar.png");
    assert_eq!(t[1].deps, vec!["foo/bar.png"]);
    assert_eq!(label(&t[1].cmds), "echo -e \"IMGCP\\tfoo/bar.png\"");
    assert_eq!(
        t[1].cmds[2],
        Command::Shell("cp \"foo/bar.png\" \"foo/.tek_cache/bar.png\"".into())
    );
}

#[test]
fn invariant_marker_inside_segment() {
    let m = run("foo/bar.tek_cache/baz.png.pdf");
    let t = m.targets();
    assert_eq!(t[0].name, "foo/bar.tek_cache/baz.png.pdf");
    assert_eq!(t[0].deps, vec!["foo/bar.tek_cache/baz.png"]);
    assert!(label(&t[0].cmds).starts_with("echo -e \"CONVERT"));
    assert_eq!(t[1].name, "foo/bar.tek_cache/baz.png");
    assert_eq!(t[1].deps, vec!["foo/barbaz.png"]);
}

#[test]
fn invariant_crop_fragment() {
    let m = run("d/.tek_cache/x.uncrop.jpeg.pdf");
    let t = m.targets();
    assert_eq!(t.len(), 3);

    assert_eq!(t[0].name, "d/.tek_cache/x-tocrop.pdf");
    assert_eq!(t[0].deps, vec!["d/.tek_cache/x.uncrop.jpeg"]);

    assert_eq!(t[1].name, "d/.tek_cache/x.uncrop.jpeg.pdf");
    assert_eq!(t[1].deps, vec!["d/.tek_cache/x-tocrop.pdf"]);
    assert_eq!(label(&t[1].cmds), "echo -e \"CROP\\td/x.uncrop.jpeg\"");
    assert_eq!(
        t[1].cmds[2],
        Command::Shell(
            "pdfcrop \"d/.tek_cache/x-tocrop.pdf\" \"d/.tek_cache/x.uncrop.jpeg.pdf\" >& /dev/null"
                .into()
        )
    );

    assert_eq!(t[2].name, "d/.tek_cache/x.uncrop.jpeg");
}

#[test]
fn invariant_inkscape_fragment() {
    let m = run("d/.tek_cache/y.inkscape.svg.pdf");
    let t = m.targets();
    assert_eq!(t.len(), 2);
    assert_eq!(label(&t[0].cmds), "echo -e \"INKCONV\\td/y.inkscape.svg\"");
    assert_eq!(
        t[0].cmds[2],
        Command::Shell(
            "inkscape \"d/y.inkscape.svg\" --export-pdf=\"d/.tek_cache/y.inkscape.svg.pdf\" -D"
                .into()
        )
    );
    assert!(t[0].cmds.iter().all(|c| !c.text().starts_with("convert ")));
}

#[test]
fn invariant_every_target_is_closed() {
    for f in [
        "a/.tek_cache/p.png.pdf",
        "a/.tek_cache/p.uncrop.svg.pdf",
        "a/.tek_cache/p.inkscape.svg.pdf",
    ] {
        let m = run(f);
        assert!(m.is_idle());
        assert!(m.finish().is_ok());
        for t in m.targets() {
            assert_eq!(t.deps.len(), 1);
            assert_eq!(t.cmds.len(), 3);
        }
    }
}

#[test]
fn invariant_idempotent_fragments() {
    let f = "a/.tek_cache/p.uncrop.png.pdf";
    let first = run(f);
    let second = run(f);
    assert_eq!(first.targets(), second.targets());
    assert_eq!(first.render(), second.render());
    assert_eq!(
        description_digest(&first).unwrap(),
        description_digest(&second).unwrap()
    );
}

#[test]
fn invariant_missing_marker_leaves_sink_untouched() {
    let pipeline = RulePipeline::default();
    let mut m = pipeline.makefile();
    pipeline
        .generate("a/.tek_cache/ok.png.pdf", &mut DependencyStack::new(), &mut m)
        .unwrap();
    let before = m.targets().to_vec();

    let err = pipeline
        .generate("x.uncrop.jpeg.pdf", &mut DependencyStack::new(), &mut m)
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Process { source: ProcessError::MissingCacheMarker { .. }, .. }
    ));
    assert_eq!(m.targets(), &before[..]);
}

#[test]
fn invariant_partial_fragment_rolled_back() {
    let mut registry = ProcessorRegistry::new();
    registry.register(Box::new(Broken));
    let pipeline = RulePipeline::new(registry, Config::default());
    let mut m = pipeline.makefile();

    let err = pipeline
        .generate("a.broken", &mut DependencyStack::new(), &mut m)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Process { source: ProcessError::Sink(_), .. }));
    assert!(m.targets().is_empty());
    assert!(m.is_idle());
}

#[test]
fn invariant_unclaimed_is_not_an_error() {
    let pipeline = RulePipeline::default();
    let mut m = pipeline.makefile();
    let outcome = pipeline
        .generate("chapter.tex", &mut DependencyStack::new(), &mut m)
        .unwrap();
    assert_eq!(outcome, Outcome::Unclaimed);
    assert!(m.targets().is_empty());
}

#[test]
fn invariant_registration_order_decides_claim() {
    let f = "d/.tek_cache/a.png.pdf";

    let mut image_first = ProcessorRegistry::new();
    image_first.register(Box::new(ImageMagick::boot()));
    image_first.register(catchall());
    assert_eq!(image_first.dispatch(f).unwrap().name(), "CONVERT");

    let mut catchall_first = ProcessorRegistry::new();
    catchall_first.register(catchall());
    catchall_first.register(Box::new(ImageMagick::boot()));
    assert_eq!(catchall_first.dispatch(f).unwrap().name(), "CATCHALL");
    assert_eq!(catchall_first.names(), vec!["CATCHALL", "CONVERT"]);

    let pipeline = RulePipeline::new(catchall_first, Config::default());
    let mut m = pipeline.makefile();
    pipeline.generate(f, &mut DependencyStack::new(), &mut m).unwrap();
    assert_eq!(m.targets().len(), 1);
    assert_eq!(label(&m.targets()[0].cmds), "echo -e \"CATCHALL\\td/.tek_cache/a.png.pdf\"");
}

#[test]
fn invariant_generate_all_degrades_per_file() {
    let pipeline = RulePipeline::default();
    let mut m = pipeline.makefile();
    let report = pipeline.generate_all(
        ["a/.tek_cache/one.png.pdf", "bad.png.pdf", "notes.txt", "a/.tek_cache/two.svg.pdf"],
        &mut m,
    );

    assert_eq!(report.emitted, vec!["a/.tek_cache/one.png.pdf", "a/.tek_cache/two.svg.pdf"]);
    assert_eq!(report.unclaimed, vec!["notes.txt"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].filename, "bad.png.pdf");
    assert!(report.has_failures());
    assert_eq!(m.targets().len(), 4);
}

#[test]
fn invariant_strict_mode_fails_unclaimed() {
    let config = Config { strict: true, ..Config::default() };
    let pipeline = RulePipeline::new(ProcessorRegistry::boot(), config);
    let mut m = pipeline.makefile();
    let report = pipeline.generate_all(["notes.txt"], &mut m);
    assert!(report.unclaimed.is_empty());
    assert_eq!(report.failed[0].error, "unclaimed");
}

#[test]
fn invariant_rendered_makefile() {
    let m = run("foo/.tek_cache/bar.png.pdf");
    let expected = "\
foo/.tek_cache/bar.png.pdf: foo/.tek_cache/bar.png
\t@echo -e \"CONVERT\\tfoo/bar.png\"
\t@mkdir -p \"foo/.tek_cache\" >& /dev/null || true
\t@convert \"foo/bar.png\" \"foo/.tek_cache/bar.png.pdf\"

foo/.tek_cache/bar.png: foo/bar.png
\t@echo -e \"IMGCP\\tfoo/bar.png\"
\t@mkdir -p \"foo/.tek_cache\" >& /dev/null || true
\t@cp \"foo/bar.png\" \"foo/.tek_cache/bar.png\"
";
    assert_eq!(m.render(), expected);
}

#[test]
fn invariant_line_break_in_filename_emits_nothing() {
    let pipeline = RulePipeline::default();
    let mut m = pipeline.makefile();
    pipeline
        .generate("a/.tek_cache/ok.png.pdf", &mut DependencyStack::new(), &mut m)
        .unwrap();
    let before = m.render();

    let err = pipeline
        .generate("d/.tek_cache/x\ny.png.pdf", &mut DependencyStack::new(), &mut m)
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Process {
            source: ProcessError::Sink(MakefileError::UnrepresentableName(_)),
            ..
        }
    ));
    assert_eq!(m.render(), before);
    assert!(m.targets().iter().all(|t| !t.name.contains('\n')));
}

#[test]
fn invariant_crop_intermediate_shared_across_formats() {
    let pipeline = RulePipeline::default();
    let mut m = pipeline.makefile();
    let report = pipeline.generate_all(
        ["d/.tek_cache/x.uncrop.png.pdf", "d/.tek_cache/x.uncrop.jpeg.pdf"],
        &mut m,
    );
    assert!(!report.has_failures());

    let tocrop: Vec<_> = m
        .targets()
        .iter()
        .filter(|t| t.name == "d/.tek_cache/x-tocrop.pdf")
        .collect();
    assert_eq!(tocrop.len(), 2);
    assert_eq!(tocrop[0].deps, vec!["d/.tek_cache/x.uncrop.png"]);
    assert_eq!(tocrop[1].deps, vec!["d/.tek_cache/x.uncrop.jpeg"]);
}

#[test]
fn invariant_unbalanced_stack_rolled_back() {
    let mut registry = ProcessorRegistry::new();
    registry.register(Box::new(Leaky));
    let pipeline = RulePipeline::new(registry, Config::default());
    let mut m = pipeline.makefile();
    let mut stack = DependencyStack::new();
    stack.push("doc.pdf");

    let err = pipeline.generate("a.leak", &mut stack, &mut m).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::UnbalancedStack { expected: 1, found: 2, .. }
    ));
    assert!(m.targets().is_empty());
    assert!(m.is_idle());

    let report = pipeline.generate_all(["b.leak"], &mut m);
    assert_eq!(report.failed[0].filename, "b.leak");
}
