use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use mu_epub_css::css::DefaultHandler;
use mu_epub_css::{
    validate_stylesheet, validate_xhtml_styles, CssException, CssParser, CssSource,
    ValidationOptions,
};

#[derive(Clone, Copy)]
struct Fixture {
    key: &'static str,
    rules: usize,
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        key: "small",
        rules: 50,
    },
    Fixture {
        key: "medium",
        rules: 500,
    },
    Fixture {
        key: "large",
        rules: 5000,
    },
];

const WARMUP_ITERS: usize = 2;
const MEASURE_ITERS: usize = 10;

struct TrackingAllocator;

static CURRENT_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL_ALLOCATOR: TrackingAllocator = TrackingAllocator;

fn current_alloc_bytes() -> usize {
    CURRENT_ALLOC_BYTES.load(Ordering::Relaxed)
}

fn peak_alloc_bytes() -> usize {
    PEAK_ALLOC_BYTES.load(Ordering::Relaxed)
}

fn reset_peak_alloc_bytes() {
    let current = current_alloc_bytes();
    PEAK_ALLOC_BYTES.store(current, Ordering::Relaxed);
}

fn update_peak_alloc_bytes(current: usize) {
    let mut peak = PEAK_ALLOC_BYTES.load(Ordering::Relaxed);
    while current > peak {
        match PEAK_ALLOC_BYTES.compare_exchange_weak(
            peak,
            current,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(next) => peak = next,
        }
    }
}

fn add_current_alloc_bytes(delta: usize) {
    let current = CURRENT_ALLOC_BYTES.fetch_add(delta, Ordering::Relaxed) + delta;
    update_peak_alloc_bytes(current);
}

fn sub_current_alloc_bytes(delta: usize) {
    let mut current = CURRENT_ALLOC_BYTES.load(Ordering::Relaxed);
    loop {
        let next = current.saturating_sub(delta);
        match CURRENT_ALLOC_BYTES.compare_exchange_weak(
            current,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(observed) => current = observed,
        }
    }
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            add_current_alloc_bytes(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        sub_current_alloc_bytes(layout.size());
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            add_current_alloc_bytes(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                add_current_alloc_bytes(new_size - layout.size());
            } else {
                sub_current_alloc_bytes(layout.size() - new_size);
            }
        }
        new_ptr
    }
}

#[derive(Clone, Debug)]
struct CaseResult {
    fixture: String,
    case: String,
    iterations: usize,
    min: u128,
    median: u128,
    p90: u128,
    mean: u128,
    max: u128,
    median_peak_heap_bytes: usize,
    max_peak_heap_bytes: usize,
}

/// A style sheet mixing the constructs EPUB content typically carries.
fn synthetic_stylesheet(rules: usize) -> String {
    let mut css = String::from("@charset \"utf-8\";\n@import url(base.css);\n");
    css.push_str(
        "@font-face {\n  font-family: \"Body Serif\";\n  src: url(../fonts/body.otf);\n}\n",
    );
    for i in 0..rules {
        match i % 5 {
            0 => css.push_str(&format!(
                "div.chapter-{i} > p:first-child, h{} + p {{ margin: 0 0 1em; text-indent: {}.5em }}\n",
                i % 6 + 1,
                i % 3
            )),
            1 => css.push_str(&format!(
                "a[href^=\"#note-{i}\"]::after {{ content: \"\\2020\"; color: #a0{:02x}ff }}\n",
                i % 256
            )),
            2 => css.push_str(&format!(
                "@media screen and (min-width: {}px) {{ .col-{i} {{ width: {}% !important }} }}\n",
                320 + i,
                i % 100
            )),
            3 => css.push_str(&format!(
                "/* section {i} */ ul li:not(.skip):nth-child(2n+1) {{ background: url(img/b{i}.png) no-repeat }}\n"
            )),
            _ => css.push_str(&format!(
                "#fn{i} {{ font: italic bold 12px/30px Georgia, serif; border: 1px solid rgb(0, {}, 0) }}\n",
                i % 256
            )),
        }
    }
    css
}

fn synthetic_xhtml(css: &str, paragraphs: usize) -> String {
    let mut doc = String::from("<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><style>");
    doc.push_str(&css.replace('&', "&amp;").replace('<', "&lt;"));
    doc.push_str("</style></head><body>\n");
    for i in 0..paragraphs {
        doc.push_str(&format!(
            "<p style=\"margin-left: {}em; color: red\">Paragraph {}</p>\n",
            i % 4,
            i
        ));
    }
    doc.push_str("</body></html>");
    doc
}

fn percentile(sorted: &[u128], percentile: f64) -> u128 {
    let idx = ((sorted.len().saturating_sub(1) as f64) * percentile).round() as usize;
    sorted[idx]
}

fn run_case<F>(fixture: &str, case: &str, mut op: F) -> CaseResult
where
    F: FnMut() -> usize,
{
    for _ in 0..WARMUP_ITERS {
        black_box(op());
    }

    let mut samples = Vec::with_capacity(MEASURE_ITERS);
    let mut mem_samples = Vec::with_capacity(MEASURE_ITERS);
    for _ in 0..MEASURE_ITERS {
        let baseline_alloc = current_alloc_bytes();
        reset_peak_alloc_bytes();
        let start = Instant::now();
        black_box(op());
        samples.push(start.elapsed().as_nanos());
        let peak_extra = peak_alloc_bytes().saturating_sub(baseline_alloc);
        mem_samples.push(peak_extra);
    }

    samples.sort_unstable();
    mem_samples.sort_unstable();
    let sum: u128 = samples.iter().copied().sum();
    let mean = sum / samples.len() as u128;
    let mem_median =
        mem_samples[((mem_samples.len().saturating_sub(1) as f64) * 0.5).round() as usize];

    CaseResult {
        fixture: fixture.to_string(),
        case: case.to_string(),
        iterations: MEASURE_ITERS,
        min: samples[0],
        median: percentile(&samples, 0.5),
        p90: percentile(&samples, 0.9),
        mean,
        max: samples[samples.len() - 1],
        median_peak_heap_bytes: mem_median,
        max_peak_heap_bytes: mem_samples[mem_samples.len() - 1],
    }
}

fn main() {
    println!("# mu-epub-css benchmark");
    println!(
        "# warmup_iters={}, measure_iters={}",
        WARMUP_ITERS, MEASURE_ITERS
    );
    println!(
        "fixture,case,iterations,min_ns,median_ns,p90_ns,mean_ns,max_ns,median_peak_heap_bytes,max_peak_heap_bytes"
    );

    let parser = CssParser::new();
    let options = ValidationOptions::default();
    let mut results: Vec<CaseResult> = Vec::new();
    let mut sizes: Vec<(&'static str, usize)> = Vec::new();

    for fixture in FIXTURES {
        let css = synthetic_stylesheet(fixture.rules);
        let xhtml = synthetic_xhtml(&css, fixture.rules / 10 + 1);
        sizes.push((fixture.key, css.len()));

        results.push(run_case(fixture.key, "source/detect", || {
            let source = CssSource::from_bytes("bench.css", css.as_bytes());
            black_box(source.len())
        }));

        results.push(run_case(fixture.key, "scan", || {
            let mut errors: Vec<CssException> = Vec::new();
            let tokens = parser
                .scan(&css, "bench.css", &mut errors)
                .expect("scan failed");
            black_box(tokens.len() + errors.len())
        }));

        results.push(run_case(fixture.key, "parse", || {
            let mut errors: Vec<CssException> = Vec::new();
            parser
                .parse_str(&css, "bench.css", &mut errors, &mut DefaultHandler)
                .expect("parse failed");
            black_box(errors.len())
        }));

        results.push(run_case(fixture.key, "validate/stylesheet", || {
            let report = validate_stylesheet("OEBPS/css/bench.css", css.as_bytes(), &options)
                .expect("validate failed");
            black_box(report.diagnostics().len())
        }));

        results.push(run_case(fixture.key, "validate/xhtml_styles", || {
            let report = validate_xhtml_styles("OEBPS/bench.xhtml", xhtml.as_bytes(), &options)
                .expect("validate failed");
            black_box(report.diagnostics().len())
        }));
    }

    for result in &results {
        println!(
            "{},{},{},{},{},{},{},{},{},{}",
            result.fixture,
            result.case,
            result.iterations,
            result.min,
            result.median,
            result.p90,
            result.mean,
            result.max,
            result.median_peak_heap_bytes,
            result.max_peak_heap_bytes
        );
    }

    println!("# fixtures");
    println!("key,size_bytes");
    for (key, size) in sizes {
        println!("{},{}", key, size);
    }
}
