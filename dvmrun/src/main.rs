#[macro_use]
extern crate clap;

use clap::{Arg, ArgGroup};
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

use dvm::interpreter::Outcome;
use dvm::{Image, Thread};

#[derive(Debug)]
enum Error {
    Assemble(dasm::AssembleError),
    Load(dvm::error::LoadError),
    Run(dvm::RuntimeError),
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Assemble(err) => write!(f, "{}", err),
            Error::Load(err) => write!(f, "{}", err),
            Error::Run(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "{}", err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("PROGRAM")
                .help("Sets the pre-assembled .dvm artifact to run")
                .index(1),
        )
        .arg(
            Arg::with_name("assembly")
                .short("a")
                .long("assembly")
                .takes_value(true)
                .value_name("ASSEMBLY")
                .help("Sets an assembly source file to assemble and run"),
        )
        .group(
            ArgGroup::with_name("input")
                .args(&["PROGRAM", "assembly"])
                .required(true),
        )
        .get_matches();

    let result = match matches.value_of("PROGRAM") {
        Some(path) => run_artifact(path),
        None => run_assembly(matches.value_of("assembly").unwrap()),
    };

    match result {
        Ok(Outcome::Exited) => std::process::exit(0),
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
    }
}

fn run_artifact(path: &str) -> Result<Outcome, Error> {
    let image = Image::load_file(path).map_err(Error::Load)?;
    run_image(&image)
}

fn run_assembly(path: &str) -> Result<Outcome, Error> {
    let mut source = String::new();
    BufReader::new(File::open(Path::new(path))?).read_to_string(&mut source)?;

    let (artifact, _source_map) = dasm::assemble(&source).map_err(Error::Assemble)?;
    let image = Image::from_artifact(artifact);
    run_image(&image)
}

fn run_image(image: &Image) -> Result<Outcome, Error> {
    let mut thread = Thread::new();
    dvm::interpreter::run(&mut thread, image).map_err(Error::Run)
}
