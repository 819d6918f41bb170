extern crate num;
#[macro_use]
extern crate num_derive;

pub mod error;
pub mod extension;
pub mod frame;
pub mod image;
pub mod interpreter;
pub mod opcode;
pub mod thread;
pub mod value;

pub use error::RuntimeError;
pub use image::Image;
pub use interpreter::Outcome;
pub use thread::Thread;
pub use value::Value;

/// Machine word width used by the binary artifact format and the interpreter's
/// address arithmetic: every id and absolute offset in the code stream is
/// encoded as a W-byte (64-bit) field.
pub type Word = u64;
