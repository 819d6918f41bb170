//! Reads and writes the binary artifact produced by the assembler and
//! consumed by the virtual machine: a fixed header, a number pool, a
//! string pool, and a trailing code section (see `SPEC_FULL.md` §6.1).

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::error::Error as StdError;
use std::fmt;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::string::FromUtf8Error;
use util::Endian;

/// The artifact's magic number. Chosen by the original author as a
/// birthdate; kept verbatim since it is part of the wire format.
pub const MAGIC: i32 = 0x2009_0307;

#[derive(Debug, PartialEq)]
pub struct Artifact {
    numbers: Vec<f64>,
    strings: Vec<String>,
    code: Vec<u8>,
}

impl Artifact {
    pub fn new(numbers: Vec<f64>, strings: Vec<String>, code: Vec<u8>) -> Artifact {
        Artifact {
            numbers,
            strings,
            code,
        }
    }

    pub fn numbers(&self) -> &[f64] {
        &self.numbers[..]
    }

    pub fn strings(&self) -> &[String] {
        &self.strings[..]
    }

    pub fn code(&self) -> &[u8] {
        &self.code[..]
    }

    /// The absolute file offset of the first code byte: header size plus
    /// both pools' sizes. Label references in the code section are
    /// expressed relative to this base (see `SPEC_FULL.md` §4.3).
    pub fn code_base(&self) -> u64 {
        Artifact::code_base_for(&self.numbers, &self.strings)
    }

    /// Same computation as `code_base`, usable before an `Artifact` exists
    /// (the assembler's packer knows its pools before it has assembled the
    /// code that goes with them).
    pub fn code_base_for(numbers: &[f64], strings: &[String]) -> u64 {
        let header = 4 + 8 + 8;
        let number_pool = numbers.len() as u64 * 8;
        let string_pool: u64 = strings.iter().map(|s| 4 + s.len() as u64).sum();
        header + number_pool + string_pool
    }
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    BadMagic,
    InvalidUtf8(FromUtf8Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "{}", err),
            Error::BadMagic => write!(f, "file corruption"),
            Error::InvalidUtf8(err) => write!(f, "string pool entry is not valid UTF-8: {}", err),
        }
    }
}

impl StdError for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Error {
        Error::InvalidUtf8(err)
    }
}

pub fn read<R: Read>(reader: &mut R) -> Result<Artifact, Error> {
    let magic = reader.read_i32::<Endian>()?;
    if magic != MAGIC {
        return Err(Error::BadMagic);
    }

    let num_num = reader.read_u64::<Endian>()?;
    let str_num = reader.read_u64::<Endian>()?;

    let mut numbers = Vec::with_capacity(num_num as usize);
    for _ in 0..num_num {
        numbers.push(reader.read_f64::<Endian>()?);
    }

    let mut strings = Vec::with_capacity(str_num as usize);
    for _ in 0..str_num {
        let length = reader.read_i32::<Endian>()?;
        let mut bytes = vec![0u8; length as usize];
        reader.read_exact(&mut bytes)?;
        strings.push(String::from_utf8(bytes)?);
    }

    let mut code = Vec::new();
    reader.read_to_end(&mut code)?;

    Ok(Artifact::new(numbers, strings, code))
}

pub fn write<W: Write>(writer: &mut W, artifact: &Artifact) -> Result<(), Error> {
    writer.write_i32::<Endian>(MAGIC)?;
    writer.write_u64::<Endian>(artifact.numbers.len() as u64)?;
    writer.write_u64::<Endian>(artifact.strings.len() as u64)?;

    for num in &artifact.numbers {
        writer.write_f64::<Endian>(*num)?;
    }

    for s in &artifact.strings {
        writer.write_i32::<Endian>(s.len() as i32)?;
        writer.write_all(s.as_bytes())?;
    }

    writer.write_all(&artifact.code[..])?;
    Ok(())
}

pub trait ReadArtifactExt: Read + Sized {
    fn read_artifact(&mut self) -> Result<Artifact, Error> {
        read(self)
    }
}

impl<R: Read + Sized> ReadArtifactExt for R {}

pub trait WriteArtifactExt: Write + Sized {
    fn write_artifact(&mut self, artifact: &Artifact) -> Result<(), Error> {
        write(self, artifact)
    }
}

impl<W: Write + Sized> WriteArtifactExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Artifact, Error> {
    BufReader::new(File::open(path)?).read_artifact()
}

pub fn write_file<P: AsRef<Path>>(path: P, artifact: &Artifact) -> Result<(), Error> {
    BufWriter::new(File::create(path)?).write_artifact(artifact)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_pools_and_code() {
        let artifact = Artifact::new(
            vec![1.0, 2.5, -3.0],
            vec!["r".to_owned(), "hello".to_owned()],
            vec![27, 26],
        );

        let mut buf = Vec::new();
        write(&mut buf, &artifact).unwrap();

        let read_back = read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(artifact, read_back);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = vec![0u8; 20];
        match read(&mut Cursor::new(buf)) {
            Err(Error::BadMagic) => {}
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn truncation_is_distinct_from_bad_magic() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        // numNum/strNum fields are cut short.
        buf.extend_from_slice(&[0u8, 0u8]);

        match read(&mut Cursor::new(buf)) {
            Err(Error::Io(_)) => {}
            other => panic!("expected Io, got {:?}", other),
        }
    }

    #[test]
    fn code_base_accounts_for_both_pools() {
        let artifact = Artifact::new(vec![1.0, 2.0], vec!["ab".to_owned()], vec![]);
        // header(20) + numbers(2*8=16) + string(4 + 2)
        assert_eq!(artifact.code_base(), 20 + 16 + 6);
    }
}
