// Command-line interface for mdb
//
// mdb turns a Markdown file into themed HTML: a preview page, a clipboard payload ready to paste
// into a rich-text editor, or a standalone export (HTML or PDF). The heavy lifting lives in
// mdb-core; this binary only reads files, loads configuration and reports outcomes.
//
// Usage:
//  mdb preview <input> [-o <file>]                 - Standalone preview page (vector diagrams)
//  mdb copy <input> [--stdout]                     - Clipboard payload (inlined styles, PNG diagrams)
//  mdb export <input> --to html|pdf [-o <file>]    - Standalone export
//  mdb upload <input> [--in-place]                 - Upload local images, rewrite references
//  mdb themes                                      - List theme keys
//  mdb generate-css [--theme K] [--dark] [--media] [--scoped]
//
// Extra Parameters:
//
// Configuration overrides can be passed using --extra-<parameter-name> <value>.
// Known keys: theme, mode, pdf-size.
// Example:
//  mdb export notes.md --to pdf -o notes.pdf --extra-pdf-size mobile

mod notify;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::{info, warn};
use mdb_config::{Loader, MdbConfig};
use mdb_core::clipboard::SystemClipboard;
use mdb_core::css::scope::{scope_css, NAMESPACE};
use mdb_core::diagram::MermaidCliEngine;
use mdb_core::notice::run_reported;
use mdb_core::upload::{upload_all_images, FsImageLoader};
use mdb_core::{
    publish, Beautifier, ClipboardPayload, ClipboardSink, ComrakParser, ExportFormat,
    MdbError, MemoryClipboard, PublishArtifact, PublishSpec,
};
use notify::TerminalNotifier;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

type CliBeautifier = Beautifier<ComrakParser, MermaidCliEngine>;

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        if let Some(key) = arg.strip_prefix("--extra-") {
            let has_value = args.get(i + 1).is_some_and(|next| !next.starts_with('-'));
            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Markdown file")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .help("Output file path (defaults to stdout)")
        .value_hint(ValueHint::FilePath)
}

fn build_cli() -> Command {
    Command::new("mdb")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Themed Markdown to HTML for previews, pasting and export")
        .long_about(
            "mdb renders Markdown with a theme and hands it over in the shape the\n\
            destination needs.\n\n\
            Extra Parameters:\n  \
            --extra-theme <key>       Theme key (see `mdb themes`)\n  \
            --extra-mode <mode>       auto | light | dark\n  \
            --extra-pdf-size <size>   a4 | mobile\n\n\
            Examples:\n  \
            mdb preview notes.md -o preview.html\n  \
            mdb copy notes.md                       # HTML + Markdown to the clipboard\n  \
            mdb export notes.md --to pdf -o notes.pdf",
        )
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a settings file (TOML or JSON)")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log debug output to stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("preview")
                .about("Render a standalone preview page")
                .arg(input_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("copy")
                .about("Copy the themed document to the clipboard")
                .long_about(
                    "Builds the paste-ready HTML (styles inlined, diagrams as PNG, task\n\
                    list checkboxes as glyphs) and writes it to the clipboard together\n\
                    with the raw Markdown as plain text.",
                )
                .arg(input_arg())
                .arg(
                    Arg::new("stdout")
                        .long("stdout")
                        .help("Print the HTML flavour instead of touching the clipboard")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export a standalone HTML or PDF document")
                .arg(input_arg())
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format")
                        .value_parser(["html", "pdf"])
                        .default_value("html"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("upload")
                .about("Upload local images and rewrite their references")
                .arg(input_arg())
                .arg(
                    Arg::new("in-place")
                        .long("in-place")
                        .help("Rewrite the input file instead of printing the result")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("themes").about("List available theme keys"))
        .subcommand(
            Command::new("generate-css")
                .about("Print the resolved stylesheet of a theme")
                .arg(
                    Arg::new("theme")
                        .long("theme")
                        .help("Theme key (defaults to the configured theme)"),
                )
                .arg(
                    Arg::new("dark")
                        .long("dark")
                        .help("Resolve the dark variant")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("media")
                        .long("media")
                        .help("Wrap the dark variant in a prefers-color-scheme media query")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("scoped")
                        .long("scoped")
                        .help("Scope every selector under #mdb")
                        .action(ArgAction::SetTrue),
                ),
        )
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, extra_params) = parse_extra_args(&args);
    let matches = build_cli().get_matches_from(&cleaned_args);

    init_logging(matches.get_flag("verbose"));

    let config = load_cli_config(
        matches.get_one::<String>("config").map(|s| s.as_str()),
        &extra_params,
    );

    let notifier = TerminalNotifier::new();
    match matches.subcommand() {
        Some(("preview", sub)) => handle_preview_command(sub, &config, &notifier).await,
        Some(("copy", sub)) => handle_copy_command(sub, &config, &notifier).await,
        Some(("export", sub)) => handle_export_command(sub, &config, &notifier).await,
        Some(("upload", sub)) => handle_upload_command(sub, &config, &notifier).await,
        Some(("themes", _)) => handle_themes_command(&config),
        Some(("generate-css", sub)) => handle_generate_css_command(sub, &config),
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }

    if notifier.failed() {
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.format_timestamp_millis();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn beautifier_from_config(config: &MdbConfig) -> CliBeautifier {
    Beautifier::new(
        ComrakParser::new(),
        MermaidCliEngine::new(config.mmdc_bin()),
        config.theme_resolver(),
    )
    .with_theme(config.general.default_theme.clone())
    .with_raster_options(config.raster_options())
}

fn read_input(sub: &ArgMatches) -> (String, String) {
    let path = sub
        .get_one::<String>("input")
        .expect("input is required");
    let source = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    });
    (path.clone(), source)
}

fn document_title(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Document")
        .to_string()
}

fn diagram_progress(done: usize, total: usize) {
    info!("diagram {done}/{total}");
}

fn write_or_print(output: Option<&String>, content: &str) {
    match output {
        Some(path) => fs::write(path, content).unwrap_or_else(|e| {
            eprintln!("Error writing file '{path}': {e}");
            std::process::exit(1);
        }),
        None => print!("{content}"),
    }
}

async fn handle_preview_command(sub: &ArgMatches, config: &MdbConfig, notifier: &TerminalNotifier) {
    let (path, source) = read_input(sub);
    let beautifier = beautifier_from_config(config);
    let dark = config.general.theme_mode.is_dark(false);
    let page = run_reported(
        notifier,
        "Preview",
        beautifier.preview_page(&source, &document_title(&path), dark),
    )
    .await;
    if let Some(page) = page {
        write_or_print(sub.get_one::<String>("output"), &page);
    }
}

async fn handle_copy_command(sub: &ArgMatches, config: &MdbConfig, notifier: &TerminalNotifier) {
    let (_, source) = read_input(sub);
    let beautifier = beautifier_from_config(config);
    let to_stdout = sub.get_flag("stdout");

    let payload = run_reported(notifier, "Copy", async {
        let payload = if config.general.copy_as_html {
            beautifier.copy(&source, diagram_progress).await?
        } else {
            ClipboardPayload::text_only(source.as_str())
        };
        if to_stdout {
            let mut sink = MemoryClipboard::default();
            sink.write(&payload)?;
            Ok::<_, MdbError>(sink.last.unwrap_or(payload))
        } else {
            SystemClipboard::new().write(&payload)?;
            Ok(payload)
        }
    })
    .await;

    if let (Some(payload), true) = (payload, to_stdout) {
        if payload.is_text_only() {
            print!("{}", payload.text);
        } else {
            print!("{}", payload.html);
        }
    }
}

async fn handle_export_command(sub: &ArgMatches, config: &MdbConfig, notifier: &TerminalNotifier) {
    let (path, source) = read_input(sub);
    let to = sub.get_one::<String>("to").expect("to has a default");
    let format = ExportFormat::parse(to).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let mut spec = PublishSpec::new(&source, format)
        .with_title(document_title(&path))
        .with_pdf_size(config.export.pdf.size);
    if let Some(output) = sub.get_one::<String>("output") {
        spec = spec.with_output_path(output);
    }

    let beautifier = beautifier_from_config(config);
    let label = format!("Export {}", format.extension().to_uppercase());
    let result = run_reported(
        notifier,
        &label,
        publish(&beautifier, spec, diagram_progress),
    )
    .await;

    match result.map(|r| r.artifact) {
        Some(PublishArtifact::InMemory(text)) => print!("{text}"),
        Some(PublishArtifact::File(file)) => eprintln!("Wrote {}", file.display()),
        None => {}
    }
}

async fn handle_upload_command(sub: &ArgMatches, config: &MdbConfig, notifier: &TerminalNotifier) {
    let (path, source) = read_input(sub);
    let base_dir = Path::new(&path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let report = run_reported(notifier, "Upload", async {
        let uploader = config.uploader()?;
        let loader = FsImageLoader::new(base_dir);
        Ok::<_, MdbError>(upload_all_images(&source, &loader, &uploader).await)
    })
    .await;

    let Some(report) = report else {
        return;
    };
    eprintln!(
        "{} image(s) uploaded, {} failed",
        report.uploaded, report.failed
    );
    if sub.get_flag("in-place") {
        if report.uploaded > 0 {
            write_or_print(Some(&path), &report.content);
        }
    } else {
        print!("{}", report.content);
    }
}

fn handle_themes_command(config: &MdbConfig) {
    let resolver = config.theme_resolver();
    for key in resolver.keys() {
        if key == resolver.default_theme() {
            println!("{key} (default)");
        } else {
            println!("{key}");
        }
    }
}

fn handle_generate_css_command(sub: &ArgMatches, config: &MdbConfig) {
    let resolver = config.theme_resolver();
    let theme = sub.get_one::<String>("theme").map(|s| s.as_str());
    let css = resolver.resolve(theme, sub.get_flag("dark"), sub.get_flag("media"));
    if sub.get_flag("scoped") {
        print!("{}", scope_css(&css, NAMESPACE));
    } else {
        print!("{css}");
    }
}

/// `--extra-*` key to configuration path.
const EXTRA_OVERRIDES: &[(&str, &str)] = &[
    ("theme", "general.default_theme"),
    ("mode", "general.theme_mode"),
    ("pdf-size", "export.pdf.size"),
];

fn config_overrides(extra_params: &HashMap<String, String>) -> Vec<(&'static str, String)> {
    let mut overrides = Vec::new();
    for (key, value) in extra_params {
        match EXTRA_OVERRIDES.iter().find(|(extra, _)| extra == key) {
            Some((_, path)) => overrides.push((*path, value.to_ascii_lowercase())),
            None => warn!("ignoring unknown option --extra-{key}"),
        }
    }
    overrides.sort();
    overrides
}

fn load_cli_config(explicit_path: Option<&str>, extra_params: &HashMap<String, String>) -> MdbConfig {
    let loader = Loader::new().with_optional_file("mdb.toml");
    let mut loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    for (key, value) in config_overrides(extra_params) {
        loader = loader.set_override(key, value).unwrap_or_else(|err| {
            eprintln!("Invalid override for {key}: {err}");
            std::process::exit(1);
        });
    }

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdb_core::pdf::PdfPageSize;
    use mdb_core::theme::ThemeMode;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_extra_args_empty() {
        let input = args(&["mdb", "copy", "doc.md"]);
        let (cleaned, extra) = parse_extra_args(&input);
        assert_eq!(cleaned, input);
        assert!(extra.is_empty());
    }

    #[test]
    fn test_parse_extra_args_mixed_with_regular_args() {
        let (cleaned, extra) = parse_extra_args(&args(&[
            "mdb",
            "export",
            "doc.md",
            "--extra-pdf-size",
            "mobile",
            "--to",
            "pdf",
        ]));
        assert_eq!(cleaned, args(&["mdb", "export", "doc.md", "--to", "pdf"]));
        assert_eq!(extra.get("pdf-size"), Some(&"mobile".to_string()));
    }

    #[test]
    fn test_parse_extra_args_boolean_flag_at_end() {
        let (cleaned, extra) = parse_extra_args(&args(&["mdb", "themes", "--extra-verbose"]));
        assert_eq!(cleaned, args(&["mdb", "themes"]));
        assert_eq!(extra.get("verbose"), Some(&"true".to_string()));
    }

    #[test]
    fn extra_params_map_to_config_paths() {
        let mut extras = HashMap::new();
        extras.insert("mode".to_string(), "Dark".to_string());
        extras.insert("pdf-size".to_string(), "mobile".to_string());
        extras.insert("bogus".to_string(), "1".to_string());

        let overrides = config_overrides(&extras);
        assert_eq!(
            overrides,
            vec![
                ("export.pdf.size", "mobile".to_string()),
                ("general.theme_mode", "dark".to_string()),
            ]
        );

        let config = load_cli_config(None, &extras);
        assert_eq!(config.general.theme_mode, ThemeMode::Dark);
        assert_eq!(config.export.pdf.size, PdfPageSize::Mobile);
    }

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn titles_come_from_the_file_stem() {
        assert_eq!(document_title("dir/notes.md"), "notes");
        assert_eq!(document_title(""), "Document");
    }
}
