#[macro_use]
extern crate clap;

use byteorder::WriteBytesExt;
use clap::Arg;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use util::Endian;

#[derive(Debug)]
enum IOErrorContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Assemble(dasm::AssembleError),
    Io(std::io::Error, IOErrorContext, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => write!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IOErrorContext::ReadInput => "reading input",
                    IOErrorContext::WriteOutput => "writing output",
                },
                path.display(),
                err
            ),
            Error::Assemble(err) => write!(f, "{}", err),
        }
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the assembly source file to assemble")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the artifact file to write to (default: INPUT with a .dvm extension)"),
        )
        .arg(
            Arg::with_name("source_map")
                .short("m")
                .long("source-map")
                .takes_value(true)
                .value_name("SOURCE_MAP")
                .help("Also write a line-oriented source map to this file"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");
    let map = matches.value_of("source_map");

    if let Err(err) = dasm(input, output, map) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

fn dasm(input: &str, output: Option<&str>, map: Option<&str>) -> Result<(), Error> {
    let input_path = Path::new(input);

    let input_file = File::open(input_path)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, input_path.to_owned()))?;
    let mut source = String::new();
    BufReader::new(input_file)
        .read_to_string(&mut source)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, input_path.to_owned()))?;

    let (artifact, source_map) = dasm::assemble(&source).map_err(Error::Assemble)?;

    let output_path: PathBuf = output
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.with_extension("dvm"));

    dvmfile::write_file(&output_path, &artifact)
        .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, output_path))?;

    if let Some(map_path_str) = map {
        let map_path = PathBuf::from(map_path_str);
        write_source_map(&source_map[..], &map_path)
            .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, map_path))?;
    }

    Ok(())
}

fn write_source_map(source_map: &[dasm::SourceMapItem], path: &PathBuf) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in source_map {
        writer.write_u32::<Endian>(item.start_line)?;
        writer.write_u32::<Endian>(item.line_count)?;
    }
    Ok(())
}
