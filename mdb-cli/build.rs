use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of build_cli() from src/main.rs, trimmed to what completions need.
// Build scripts can't access src/ modules.
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
        .help("Output file path")
        .value_hint(ValueHint::FilePath)
}

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help).action(ArgAction::SetTrue)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("mdb")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Themed Markdown to HTML for previews, pasting and export")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a settings file (TOML or JSON)")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(flag("verbose", "Log debug output to stderr").short('v').global(true))
        .subcommand(
            Command::new("preview")
                .about("Render a standalone preview page")
                .arg(input_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("copy")
                .about("Copy the themed document to the clipboard")
                .arg(input_arg())
                .arg(flag("stdout", "Print the HTML flavour instead")),
        )
        .subcommand(
            Command::new("export")
                .about("Export a standalone HTML or PDF document")
                .arg(input_arg())
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format")
                        .value_parser(clap::builder::PossibleValuesParser::new(["html", "pdf"])),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("upload")
                .about("Upload local images and rewrite their references")
                .arg(input_arg())
                .arg(flag("in-place", "Rewrite the input file")),
        )
        .subcommand(Command::new("themes").about("List available theme keys"))
        .subcommand(
            Command::new("generate-css")
                .about("Print the resolved stylesheet of a theme")
                .arg(Arg::new("theme").long("theme").help("Theme key"))
                .arg(flag("dark", "Resolve the dark variant"))
                .arg(flag("media", "Wrap the dark variant in a media query"))
                .arg(flag("scoped", "Scope every selector under #mdb")),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "mdb", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "mdb", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "mdb", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
