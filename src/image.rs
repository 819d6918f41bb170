//! The VM's in-memory view of a loaded artifact: the interned number and
//! string pools plus the code section, with the absolute file offset of the
//! code section's first byte precomputed once so the interpreter never has
//! to recompute it per jump or call.

use std::path::Path;
use std::rc::Rc;

use crate::error::LoadError;

#[derive(Debug)]
pub struct Image {
    numbers: Vec<f64>,
    // Shared so LOAD_STRING hands the interpreter a reference-counted
    // clone of the loader-owned string rather than copying it.
    strings: Vec<Rc<String>>,
    code: Vec<u8>,
    code_base: u64,
}

impl Image {
    pub fn from_artifact(artifact: dvmfile::Artifact) -> Image {
        let code_base = artifact.code_base();
        let numbers = artifact.numbers().to_vec();
        let strings = artifact
            .strings()
            .iter()
            .map(|s| Rc::new(s.clone()))
            .collect();
        let code = artifact.code().to_vec();
        Image {
            numbers,
            strings,
            code,
            code_base,
        }
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Image, LoadError> {
        let artifact = dvmfile::read_file(path)?;
        Ok(Image::from_artifact(artifact))
    }

    pub fn number(&self, id: u64) -> Option<f64> {
        self.numbers.get(id as usize).copied()
    }

    pub fn string(&self, id: u64) -> Option<Rc<String>> {
        self.strings.get(id as usize).cloned()
    }

    pub fn code(&self) -> &[u8] {
        &self.code[..]
    }

    /// Absolute file offset of the first code byte. JMP/JMPC targets and
    /// CALL's stack-borne address are expressed in this absolute space, so
    /// the interpreter subtracts this to get a cursor position and adds it
    /// back to produce a return address.
    pub fn code_base(&self) -> u64 {
        self.code_base
    }

    pub fn code_end(&self) -> u64 {
        self.code_base + self.code.len() as u64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn code_base_matches_artifact() {
        let artifact = dvmfile::Artifact::new(vec![1.0], vec!["x".to_owned()], vec![26]);
        let expected = artifact.code_base();
        let image = Image::from_artifact(artifact);
        assert_eq!(image.code_base(), expected);
        assert_eq!(image.code_end(), expected + 1);
    }

    #[test]
    fn pool_lookups_are_bounds_checked() {
        let artifact = dvmfile::Artifact::new(vec![4.0], vec!["hi".to_owned()], vec![]);
        let image = Image::from_artifact(artifact);
        assert_eq!(image.number(0), Some(4.0));
        assert_eq!(image.number(1), None);
        assert_eq!(image.string(0).as_deref().map(String::as_str), Some("hi"));
        assert_eq!(image.string(1), None);
    }
}
