use std::env;
use std::process::ExitCode;

use mu_epub_css::css::{AtRule, Declaration, Selector};
use mu_epub_css::validate::{
    validate_stylesheet, validate_xhtml_styles, CssReference, EpubVersion, FontFace,
    ValidationDiagnostic, ValidationOptions, ValidationReport,
};
use mu_epub_css::{
    ContentHandler, CssError, CssException, CssParser, CssSource, Locale, ParserOptions, Token,
};

#[derive(Clone, Debug)]
enum Json {
    Null,
    Bool(bool),
    Num(usize),
    Str(String),
    Arr(Vec<Json>),
    Obj(Vec<(String, Json)>),
}

impl Json {
    fn render(&self, pretty: bool) -> String {
        let mut out = String::new();
        self.write_into(&mut out, pretty, 0);
        out
    }

    fn write_into(&self, out: &mut String, pretty: bool, depth: usize) {
        match self {
            Json::Null => out.push_str("null"),
            Json::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
            Json::Num(v) => out.push_str(&v.to_string()),
            Json::Str(v) => write_json_string(out, v),
            Json::Arr(items) => {
                out.push('[');
                if !items.is_empty() && pretty {
                    out.push('\n');
                }
                for (idx, item) in items.iter().enumerate() {
                    if pretty {
                        write_indent(out, depth + 1);
                    }
                    item.write_into(out, pretty, depth + 1);
                    if idx + 1 != items.len() {
                        out.push(',');
                    }
                    if pretty {
                        out.push('\n');
                    }
                }
                if !items.is_empty() && pretty {
                    write_indent(out, depth);
                }
                out.push(']');
            }
            Json::Obj(fields) => {
                out.push('{');
                if !fields.is_empty() && pretty {
                    out.push('\n');
                }
                for (idx, (key, value)) in fields.iter().enumerate() {
                    if pretty {
                        write_indent(out, depth + 1);
                    }
                    write_json_string(out, key);
                    out.push(':');
                    if pretty {
                        out.push(' ');
                    }
                    value.write_into(out, pretty, depth + 1);
                    if idx + 1 != fields.len() {
                        out.push(',');
                    }
                    if pretty {
                        out.push('\n');
                    }
                }
                if !fields.is_empty() && pretty {
                    write_indent(out, depth);
                }
                out.push('}');
            }
        }
    }
}

fn write_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_json_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c <= '\u{1f}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn main() -> ExitCode {
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let mut rest = args.into_iter().skip(1).collect::<Vec<_>>();
    let pretty = pop_flag(&mut rest, "--pretty");
    let locale = pop_value(&mut rest, "--locale")?
        .map(|tag| Locale::from_tag(&tag))
        .unwrap_or_default();
    let parser_options = ParserOptions::default().with_locale(locale);

    if rest.is_empty() || rest[0] == "--help" || rest[0] == "-h" {
        print_help();
        return Ok(());
    }

    let cmd = rest.remove(0);
    match cmd.as_str() {
        "tokens" => {
            let path = first_arg(&rest, "tokens requires <css_path>")?;
            let text = read_source(&path)?.decode();
            let mut errors: Vec<CssException> = Vec::new();
            let tokens = CssParser::with_options(parser_options)
                .scan(&text, &path, &mut errors)
                .map_err(display_err)?;
            let output = Json::Obj(vec![
                ("css".to_string(), Json::Str(path)),
                (
                    "tokens".to_string(),
                    Json::Arr(tokens.iter().map(token_json).collect()),
                ),
                (
                    "errors".to_string(),
                    Json::Arr(errors.iter().map(exception_json).collect()),
                ),
            ]);
            println!("{}", output.render(pretty));
        }
        "parse" => {
            let path = first_arg(&rest, "parse requires <css_path>")?;
            let source = read_source(&path)?;
            let mut errors: Vec<CssException> = Vec::new();
            let mut events = EventRecorder::default();
            CssParser::with_options(parser_options)
                .parse(&source, &mut errors, &mut events)
                .map_err(display_err)?;
            let output = Json::Obj(vec![
                ("css".to_string(), Json::Str(path)),
                (
                    "encoding".to_string(),
                    Json::Str(source.encoding().name().to_string()),
                ),
                ("events".to_string(), Json::Arr(events.events)),
                (
                    "errors".to_string(),
                    Json::Arr(errors.iter().map(exception_json).collect()),
                ),
            ]);
            println!("{}", output.render(pretty));
        }
        "check" => {
            let mut args = rest;
            let strict = pop_flag(&mut args, "--strict");
            let epub2 = pop_flag(&mut args, "--epub2");
            let path = first_arg(&args, "check requires <css_or_xhtml_path>")?;
            let options = ValidationOptions {
                epub_version: if epub2 {
                    EpubVersion::Epub2
                } else {
                    EpubVersion::Epub3
                },
                parser: parser_options,
                ..ValidationOptions::default()
            };
            let bytes = std::fs::read(&path).map_err(|e| format!("{}: {}", path, e))?;
            let report = if is_xhtml(&path) {
                validate_xhtml_styles(&path, &bytes, &options)
            } else {
                validate_stylesheet(&path, &bytes, &options)
            }
            .map_err(display_err)?;

            println!("{}", report_json(&path, &report).render(pretty));

            let has_failures = if strict {
                report.error_count() > 0 || report.warning_count() > 0
            } else {
                report.error_count() > 0
            };
            if has_failures {
                return Err(if strict {
                    "validation failed (strict mode)".to_string()
                } else {
                    "validation failed".to_string()
                });
            }
        }
        _ => {
            return Err(format!(
                "unknown command '{}'; run `mu-epub-css --help` for usage",
                cmd
            ));
        }
    }

    Ok(())
}

/// Turns parser events into JSON objects, in order.
#[derive(Default)]
struct EventRecorder {
    events: Vec<Json>,
}

impl EventRecorder {
    fn event(&mut self, name: &str, mut fields: Vec<(String, Json)>) {
        fields.insert(0, ("event".to_string(), Json::Str(name.to_string())));
        self.events.push(Json::Obj(fields));
    }
}

impl ContentHandler for EventRecorder {
    fn start_document(&mut self) {
        self.event("start_document", Vec::new());
    }

    fn end_document(&mut self) {
        self.event("end_document", Vec::new());
    }

    fn start_at_rule(&mut self, at_rule: AtRule) {
        let params = at_rule
            .components
            .iter()
            .map(|c| Json::Str(c.to_css_string()))
            .collect();
        self.event(
            "start_at_rule",
            vec![
                ("name".to_string(), Json::Str(at_rule.name.clone())),
                ("params".to_string(), Json::Arr(params)),
                ("block".to_string(), Json::Bool(at_rule.has_block)),
                ("line".to_string(), Json::Num(at_rule.location.line)),
            ],
        );
    }

    fn end_at_rule(&mut self, name: &str) {
        self.event(
            "end_at_rule",
            vec![("name".to_string(), Json::Str(name.to_string()))],
        );
    }

    fn selectors(&mut self, selectors: &[Selector]) {
        self.event(
            "selectors",
            vec![("selectors".to_string(), selectors_json(selectors))],
        );
    }

    fn end_selectors(&mut self, selectors: Vec<Selector>) {
        self.event(
            "end_selectors",
            vec![("selectors".to_string(), selectors_json(&selectors))],
        );
    }

    fn declaration(&mut self, declaration: Declaration) {
        let value = declaration
            .components
            .iter()
            .map(|c| c.to_css_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.event(
            "declaration",
            vec![
                ("name".to_string(), Json::Str(declaration.name.clone())),
                ("value".to_string(), Json::Str(value)),
                ("important".to_string(), Json::Bool(declaration.important)),
                ("line".to_string(), Json::Num(declaration.location.line)),
            ],
        );
    }
}

fn read_source(path: &str) -> Result<CssSource, String> {
    let file = std::fs::File::open(path).map_err(|e| format!("{}: {}", path, e))?;
    CssSource::from_reader(path, file).map_err(|e| format!("{}: {}", path, e))
}

fn is_xhtml(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".xhtml") || lower.ends_with(".html") || lower.ends_with(".htm")
}

fn first_arg(args: &[String], msg: &str) -> Result<String, String> {
    args.first().cloned().ok_or_else(|| msg.to_string())
}

fn pop_flag(args: &mut Vec<String>, flag: &str) -> bool {
    if let Some(pos) = args.iter().position(|a| a == flag) {
        args.remove(pos);
        true
    } else {
        false
    }
}

fn pop_value(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, String> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        return Err(format!("{} requires a value", flag));
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn selectors_json(selectors: &[Selector]) -> Json {
    Json::Arr(
        selectors
            .iter()
            .map(|s| Json::Str(s.to_string()))
            .collect(),
    )
}

fn token_json(token: &Token) -> Json {
    Json::Obj(vec![
        ("type".to_string(), Json::Str(token.kind.name().to_string())),
        ("text".to_string(), Json::Str(token.text.clone())),
        ("line".to_string(), Json::Num(token.location.line)),
        ("column".to_string(), Json::Num(token.location.column)),
        ("errors".to_string(), Json::Num(token.errors.len())),
    ])
}

fn exception_json(err: &CssException) -> Json {
    Json::Obj(vec![
        ("code".to_string(), Json::Str(err.code.key().to_string())),
        ("message".to_string(), Json::Str(err.message().to_string())),
        ("line".to_string(), Json::Num(err.location.line)),
        ("column".to_string(), Json::Num(err.location.column)),
    ])
}

fn report_json(path: &str, report: &ValidationReport) -> Json {
    Json::Obj(vec![
        ("file".to_string(), Json::Str(path.to_string())),
        ("valid".to_string(), Json::Bool(report.is_valid())),
        ("error_count".to_string(), Json::Num(report.error_count())),
        (
            "warning_count".to_string(),
            Json::Num(report.warning_count()),
        ),
        ("info_count".to_string(), Json::Num(report.info_count())),
        (
            "diagnostics".to_string(),
            Json::Arr(report.diagnostics().iter().map(diagnostic_json).collect()),
        ),
        (
            "references".to_string(),
            Json::Arr(report.references().iter().map(reference_json).collect()),
        ),
        (
            "font_faces".to_string(),
            Json::Arr(report.font_faces().iter().map(font_face_json).collect()),
        ),
    ])
}

fn diagnostic_json(diag: &ValidationDiagnostic) -> Json {
    Json::Obj(vec![
        ("code".to_string(), Json::Str(diag.code.to_string())),
        (
            "severity".to_string(),
            Json::Str(diag.severity.as_str().to_string()),
        ),
        ("message".to_string(), Json::Str(diag.message.clone())),
        (
            "path".to_string(),
            diag.path.clone().map_or(Json::Null, Json::Str),
        ),
        ("line".to_string(), diag.line.map_or(Json::Null, Json::Num)),
        (
            "column".to_string(),
            diag.column.map_or(Json::Null, Json::Num),
        ),
        (
            "spec_ref".to_string(),
            diag.spec_ref
                .map(|v| Json::Str(v.to_string()))
                .unwrap_or(Json::Null),
        ),
        (
            "hint".to_string(),
            diag.hint.clone().map_or(Json::Null, Json::Str),
        ),
    ])
}

fn reference_json(reference: &CssReference) -> Json {
    Json::Obj(vec![
        ("href".to_string(), Json::Str(reference.href.clone())),
        ("resolved".to_string(), Json::Str(reference.resolved.clone())),
        (
            "kind".to_string(),
            Json::Str(reference.kind.as_str().to_string()),
        ),
        ("line".to_string(), Json::Num(reference.location.line)),
    ])
}

fn font_face_json(face: &FontFace) -> Json {
    let opt = |v: &Option<String>| v.clone().map_or(Json::Null, Json::Str);
    Json::Obj(vec![
        ("family".to_string(), opt(&face.family)),
        ("style".to_string(), opt(&face.style)),
        ("weight".to_string(), opt(&face.weight)),
        (
            "src".to_string(),
            Json::Arr(face.src.iter().cloned().map(Json::Str).collect()),
        ),
        ("line".to_string(), Json::Num(face.location.line)),
    ])
}

fn display_err(err: CssError) -> String {
    err.to_string()
}

fn print_help() {
    let help = r#"mu-epub-css - scan, parse and check EPUB style sheets

USAGE:
  mu-epub-css [--pretty] [--locale <tag>] <command> [args...]

COMMANDS:
  tokens <css_path>
  parse <css_path>
  check <css_or_xhtml_path> [--strict] [--epub2]

NOTES:
  - Output is JSON.
  - `check` reads embedded <style> elements and style attributes when the
    path ends in .xhtml, .html or .htm.
  - The exit code is non-zero when `check` finds errors (or warnings with
    --strict).
"#;
    println!("{}", help);
}
