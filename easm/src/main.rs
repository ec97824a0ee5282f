#[macro_use]
extern crate clap;

use clap::Arg;
use easm::{assemble, expand, Diagnostic};
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
enum IoContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Io(io::Error, IoContext, PathBuf),
    Preprocess(Diagnostic),
    Assemble(Vec<Diagnostic>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => writeln!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IoContext::ReadInput => "Reading input",
                    IoContext::WriteOutput => "Writing output",
                },
                path.display(),
                err
            ),
            Error::Preprocess(diagnostic) => writeln!(f, "{}", diagnostic),
            Error::Assemble(diagnostics) => {
                for diagnostic in diagnostics {
                    writeln!(f, "{}", diagnostic)?;
                }
                Ok(())
            }
        }
    }
}

fn main() {
    // Parse command line arguments
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Input file basenames, without the .as extension")
                .required(true)
                .multiple(true)
                .index(1),
        )
        .get_matches();

    let mut failed = false;

    for base in matches.values_of("INPUT").unwrap() {
        if let Err(err) = process_file(base) {
            eprint!("{}", err);
            eprintln!("(ERROR) [assembler] assembly failed for '{}.as'", base);
            failed = true;
        }
    }

    if failed {
        std::process::exit(1);
    }
}

/// Run one file through the whole pipeline: read `B.as`, expand macros into
/// `B.am`, assemble, and write the outputs. Any failure leaves no
/// `.ob`/`.ent`/`.ext` behind for this file.
fn process_file(base: &str) -> Result<(), Error> {
    let source_path = with_extension(base, "as");
    let source = fs::read_to_string(&source_path)
        .map_err(|err| Error::Io(err, IoContext::ReadInput, source_path))?;

    let expanded = match expand(&source) {
        Ok(expanded) => expanded,
        Err(diagnostic) => {
            let _ = fs::remove_file(with_extension(base, "am"));
            remove_outputs(base);
            return Err(Error::Preprocess(diagnostic));
        }
    };

    let am_path = with_extension(base, "am");
    fs::write(&am_path, &expanded).map_err(|err| Error::Io(err, IoContext::WriteOutput, am_path))?;

    let assembly = match assemble(&expanded) {
        Ok(assembly) => assembly,
        Err(diagnostics) => {
            remove_outputs(base);
            return Err(Error::Assemble(diagnostics));
        }
    };

    for warning in &assembly.warnings {
        eprintln!("{}", warning);
    }

    match write_outputs(base, &assembly) {
        Ok(written) => {
            println!("assembled '{}.as': wrote {}", base, written.join(", "));
            Ok(())
        }
        Err(err) => {
            // never leave a half-written output set behind
            remove_outputs(base);
            Err(err)
        }
    }
}

fn write_outputs(base: &str, assembly: &easm::Assembly) -> Result<Vec<String>, Error> {
    let mut written = Vec::new();

    let ob_path = with_extension(base, "ob");
    obfile::write_file(&ob_path, &assembly.object)
        .map_err(|err| Error::Io(err, IoContext::WriteOutput, ob_path))?;
    written.push(format!("{}.ob", base));

    if assembly.entries.is_empty() {
        let _ = fs::remove_file(with_extension(base, "ent"));
    } else {
        let ent_path = with_extension(base, "ent");
        obfile::write_refs_file(&ent_path, &assembly.entries)
            .map_err(|err| Error::Io(err, IoContext::WriteOutput, ent_path))?;
        written.push(format!("{}.ent", base));
    }

    if assembly.externals.is_empty() {
        let _ = fs::remove_file(with_extension(base, "ext"));
    } else {
        let ext_path = with_extension(base, "ext");
        obfile::write_refs_file(&ext_path, &assembly.externals)
            .map_err(|err| Error::Io(err, IoContext::WriteOutput, ext_path))?;
        written.push(format!("{}.ext", base));
    }

    Ok(written)
}

fn remove_outputs(base: &str) {
    for extension in &["ob", "ent", "ext"] {
        let _ = fs::remove_file(with_extension(base, extension));
    }
}

fn with_extension(base: &str, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", base, extension))
}
