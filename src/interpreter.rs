//! The dispatch loop: reads one opcode byte at a time off the code section
//! and executes it against a thread's call stack, globals, and extension
//! table. One big match, the same shape the instruction set itself uses
//! (fixed wire order, fixed operand widths).

use std::io::Cursor;

use byteorder::ReadBytesExt;
use num::FromPrimitive;

use crate::error::RuntimeError;
use crate::extension;
use crate::frame::Frame;
use crate::image::Image;
use crate::opcode::Opcode;
use crate::thread::Thread;
use crate::value::{Pointer, Value};
use util::Endian;

/// How a run ended. EXIT and falling off the end of the code section both
/// land here — the original treats both as a clean process exit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Exited,
}

/// Prototype-chain walks in ACTION_MAP's GET have no bound in the original;
/// this caps one so a cyclic `__proto__` chain fails instead of looping
/// forever.
const MAX_PROTO_CHAIN: usize = 1024;

pub fn run(thread: &mut Thread, image: &Image) -> Result<Outcome, RuntimeError> {
    let mut cursor = Cursor::new(image.code());

    loop {
        if cursor.position() >= image.code().len() as u64 {
            return Ok(Outcome::Exited);
        }

        let opcode_byte = cursor.read_u8()?;
        let opcode =
            Opcode::from_u8(opcode_byte).ok_or(RuntimeError::InvalidOpcode(opcode_byte))?;

        match opcode {
            Opcode::LoadLocal => {
                let id = cursor.read_u64::<Endian>()?;
                let value = thread
                    .current()
                    .locals
                    .get(&id)
                    .cloned()
                    .ok_or(RuntimeError::UndefinedLocal(id))?;
                thread.current_mut().operand_stack.push(value);
            }

            Opcode::LoadGlobal => {
                let id = cursor.read_u64::<Endian>()?;
                let value = thread
                    .globals
                    .get(&id)
                    .cloned()
                    .ok_or(RuntimeError::UndefinedGlobal(id))?;
                thread.current_mut().operand_stack.push(value);
            }

            Opcode::LoadNum => {
                let id = cursor.read_u64::<Endian>()?;
                let num = image.number(id).ok_or(RuntimeError::PoolIndexOutOfRange(id))?;
                thread.current_mut().operand_stack.push(Value::Number(num));
            }

            Opcode::LoadString => {
                let id = cursor.read_u64::<Endian>()?;
                let s = image.string(id).ok_or(RuntimeError::PoolIndexOutOfRange(id))?;
                thread.current_mut().operand_stack.push(Value::String(s));
            }

            Opcode::LoadAddr => {
                let offset = cursor.read_u64::<Endian>()?;
                thread
                    .current_mut()
                    .operand_stack
                    .push(Value::Pointer(Pointer::addr(offset)));
            }

            Opcode::StoreLocal => {
                let id = cursor.read_u64::<Endian>()?;
                let value = thread
                    .current_mut()
                    .operand_stack
                    .pop()
                    .ok_or(RuntimeError::StackUnderflow("STORE_LOCAL"))?;
                thread.current_mut().locals.insert(id, value);
            }

            Opcode::StoreGlobal => {
                let id = cursor.read_u64::<Endian>()?;
                let value = thread
                    .current_mut()
                    .operand_stack
                    .pop()
                    .ok_or(RuntimeError::StackUnderflow("STORE_GLOBAL"))?;
                thread.globals.insert(id, value);
            }

            Opcode::Add => {
                binary_number_op(thread.current_mut(), "ADD", |top, second| Ok(top + second))?
            }
            Opcode::Sub => {
                binary_number_op(thread.current_mut(), "SUB", |top, second| Ok(top - second))?
            }
            Opcode::Mul => {
                binary_number_op(thread.current_mut(), "MUL", |top, second| Ok(top * second))?
            }
            Opcode::Div => binary_number_op(thread.current_mut(), "DIV", |top, second| {
                if second == 0.0 {
                    Err(RuntimeError::DivideByZero)
                } else {
                    Ok(top / second)
                }
            })?,
            Opcode::Mod => {
                binary_number_op(thread.current_mut(), "MOD", |top, second| Ok(top % second))?
            }
            Opcode::Pow => binary_number_op(thread.current_mut(), "POW", |top, second| {
                Ok(top.powf(second))
            })?,

            Opcode::Not => op_not(thread.current_mut())?,

            Opcode::Compare => op_compare(thread.current_mut())?,

            Opcode::Jmp => {
                let target = cursor.read_u64::<Endian>()?;
                seek_absolute(&mut cursor, image, target)?;
            }

            Opcode::Jmpc => {
                let condition = thread
                    .current()
                    .operand_stack
                    .last()
                    .ok_or(RuntimeError::StackUnderflow("JMPC"))?
                    .truthy();
                // The offset is always present in the instruction stream;
                // it must be consumed whether or not the jump is taken.
                let target = cursor.read_u64::<Endian>()?;
                if condition {
                    seek_absolute(&mut cursor, image, target)?;
                }
            }

            Opcode::Call => {
                let (target, args) = {
                    let stack = &mut thread.current_mut().operand_stack;
                    if stack.len() < 2 {
                        return Err(RuntimeError::StackUnderflow("CALL"));
                    }
                    let addr_ptr = match &stack[stack.len() - 1] {
                        Value::Pointer(p) => p.clone(),
                        _ => return Err(RuntimeError::TypeMismatch("CALL")),
                    };
                    let args_ptr = match &stack[stack.len() - 2] {
                        Value::Pointer(p) => p.clone(),
                        _ => return Err(RuntimeError::TypeMismatch("CALL")),
                    };
                    let target = addr_ptr.as_addr().ok_or(RuntimeError::TypeMismatch("CALL"))?;
                    stack.pop();
                    stack.pop();
                    (target, args_ptr)
                };

                let return_address = image.code_base() + cursor.position();
                seek_absolute(&mut cursor, image, target)?;

                let mut frame = Frame::new();
                frame.return_address = return_address;
                frame.operand_stack.push(Value::Pointer(args));
                thread.call_stack.push(frame);
            }

            Opcode::Calle => {
                let (name, args_ptr) = {
                    let stack = &mut thread.current_mut().operand_stack;
                    if stack.len() < 2 {
                        return Err(RuntimeError::StackUnderflow("CALLE"));
                    }
                    let name = match stack.pop().unwrap() {
                        Value::String(s) => s,
                        _ => return Err(RuntimeError::TypeMismatch("CALLE")),
                    };
                    let args_ptr = match stack.last() {
                        Some(Value::Pointer(p)) => p.clone(),
                        _ => return Err(RuntimeError::TypeMismatch("CALLE")),
                    };
                    (name, args_ptr)
                };

                let func = *thread
                    .extensions
                    .get(name.as_str())
                    .ok_or_else(|| RuntimeError::UnknownExtension((*name).clone()))?;

                let list = args_ptr
                    .as_list()
                    .ok_or(RuntimeError::TypeMismatch("CALLE"))?;
                let result = {
                    let args = list.borrow();
                    unsafe { func(thread as *mut Thread, args.as_ptr(), args.len()) }
                };

                *thread.current_mut().operand_stack.last_mut().unwrap() = result;
            }

            Opcode::Ret => {
                if thread.call_stack.len() <= 1 {
                    return Err(RuntimeError::RetAtBaseFrame);
                }
                let value = thread
                    .current_mut()
                    .operand_stack
                    .pop()
                    .ok_or(RuntimeError::StackUnderflow("RET"))?;
                let frame = thread.call_stack.pop().expect("checked above");
                seek_absolute(&mut cursor, image, frame.return_address)?;
                thread.current_mut().operand_stack.push(value);
            }

            Opcode::MakeList => {
                thread
                    .current_mut()
                    .operand_stack
                    .push(Value::Pointer(Pointer::list()));
            }

            Opcode::MakeMap => {
                thread
                    .current_mut()
                    .operand_stack
                    .push(Value::Pointer(Pointer::map()));
            }

            Opcode::ActionList => {
                let action = {
                    let stack = &mut thread.current_mut().operand_stack;
                    match stack.pop() {
                        Some(Value::String(s)) => s.to_uppercase(),
                        Some(_) => return Err(RuntimeError::TypeMismatch("ACTION_LIST")),
                        None => return Err(RuntimeError::StackUnderflow("ACTION_LIST")),
                    }
                };
                action_list(thread.current_mut(), &action)?;
            }

            Opcode::ActionMap => {
                let action = {
                    let stack = &mut thread.current_mut().operand_stack;
                    match stack.pop() {
                        Some(Value::String(s)) => s.to_uppercase(),
                        Some(_) => return Err(RuntimeError::TypeMismatch("ACTION_MAP")),
                        None => return Err(RuntimeError::StackUnderflow("ACTION_MAP")),
                    }
                };
                action_map(thread.current_mut(), &action)?;
            }

            Opcode::PopTop => {
                thread
                    .current_mut()
                    .operand_stack
                    .pop()
                    .ok_or(RuntimeError::StackUnderflow("POP_TOP"))?;
            }

            Opcode::Import => {
                let name = {
                    let stack = &mut thread.current_mut().operand_stack;
                    match stack.pop() {
                        Some(Value::String(s)) => s,
                        Some(_) => return Err(RuntimeError::TypeMismatch("IMPORT")),
                        None => return Err(RuntimeError::StackUnderflow("IMPORT")),
                    }
                };
                extension::import(thread, &name)?;
            }

            Opcode::Exit => return Ok(Outcome::Exited),

            Opcode::Nop => {}
        }
    }
}

fn seek_absolute(
    cursor: &mut Cursor<&[u8]>,
    image: &Image,
    target: u64,
) -> Result<(), RuntimeError> {
    if target < image.code_base() || target > image.code_end() {
        return Err(RuntimeError::BadJumpTarget(target));
    }
    cursor.set_position(target - image.code_base());
    Ok(())
}

fn binary_number_op<F>(frame: &mut Frame, op: &'static str, f: F) -> Result<(), RuntimeError>
where
    F: FnOnce(f64, f64) -> Result<f64, RuntimeError>,
{
    let stack = &mut frame.operand_stack;
    if stack.len() < 2 {
        return Err(RuntimeError::StackUnderflow(op));
    }
    let top = match stack[stack.len() - 1] {
        Value::Number(n) => n,
        _ => return Err(RuntimeError::TypeMismatch(op)),
    };
    let second = match stack[stack.len() - 2] {
        Value::Number(n) => n,
        _ => return Err(RuntimeError::TypeMismatch(op)),
    };
    let result = f(top, second)?;
    stack.pop();
    *stack.last_mut().expect("checked above") = Value::Number(result);
    Ok(())
}

fn op_not(frame: &mut Frame) -> Result<(), RuntimeError> {
    let stack = &mut frame.operand_stack;
    let truthy = stack
        .last()
        .ok_or(RuntimeError::StackUnderflow("NOT"))?
        .truthy();
    *stack.last_mut().expect("checked above") = Value::Number(if truthy { 0.0 } else { 1.0 });
    Ok(())
}

fn op_compare(frame: &mut Frame) -> Result<(), RuntimeError> {
    let stack = &mut frame.operand_stack;
    if stack.len() < 3 {
        return Err(RuntimeError::StackUnderflow("COMPARE"));
    }
    let action = match &stack[stack.len() - 1] {
        Value::String(s) => s.to_uppercase(),
        _ => return Err(RuntimeError::TypeMismatch("COMPARE")),
    };
    let op2 = stack[stack.len() - 2].clone();
    let op1 = stack[stack.len() - 3].clone();
    let result = compare(&action, &op1, &op2)?;
    stack.pop();
    stack.pop();
    *stack.last_mut().expect("checked above") = Value::Number(if result { 1.0 } else { 0.0 });
    Ok(())
}

fn compare(action: &str, op1: &Value, op2: &Value) -> Result<bool, RuntimeError> {
    match action {
        "AND" => return Ok(op1.truthy() && op2.truthy()),
        "OR" => return Ok(op1.truthy() || op2.truthy()),
        _ => {}
    }

    match (op1, op2) {
        (Value::Number(a), Value::Number(b)) => relational(action, a, b),
        (Value::String(a), Value::String(b)) => relational(action, a, b),
        (Value::Pointer(a), Value::Pointer(b)) => {
            if action == "EQU" {
                Ok(a.ptr_eq(b))
            } else if action == "NE" {
                Ok(!a.ptr_eq(b))
            } else {
                relational(action, &a.identity(), &b.identity())
            }
        }
        _ => Err(RuntimeError::CompareTypeMismatch),
    }
}

fn relational<T: PartialOrd>(action: &str, a: &T, b: &T) -> Result<bool, RuntimeError> {
    match action {
        "EQU" => Ok(a == b),
        "NE" => Ok(a != b),
        "GRE" => Ok(a > b),
        "LES" => Ok(a < b),
        "GE" => Ok(a >= b),
        "LE" => Ok(a <= b),
        _ => Err(RuntimeError::UnknownCompareAction(action.to_owned())),
    }
}

fn list_index(index: f64, len: usize, action: &'static str) -> Result<usize, RuntimeError> {
    if index < 0.0 || index >= len as f64 {
        return Err(RuntimeError::IndexOutOfRange { action, index, len });
    }
    Ok(index as usize)
}

fn action_list(frame: &mut Frame, action: &str) -> Result<(), RuntimeError> {
    let stack = &mut frame.operand_stack;
    match action {
        "PUSH" => {
            if stack.len() < 2 {
                return Err(RuntimeError::StackUnderflow("ACTION_LIST(PUSH)"));
            }
            let list_ptr = match &stack[stack.len() - 2] {
                Value::Pointer(p) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_LIST(PUSH)")),
            };
            let list = list_ptr
                .as_list()
                .ok_or(RuntimeError::TypeMismatch("ACTION_LIST(PUSH)"))?;
            let value = stack.pop().expect("checked above");
            list.borrow_mut().push(value);
        }
        "POP" => {
            let list_ptr = match stack.last() {
                Some(Value::Pointer(p)) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_LIST(POP)")),
            };
            let list = list_ptr
                .as_list()
                .ok_or(RuntimeError::TypeMismatch("ACTION_LIST(POP)"))?;
            let value = {
                let mut list_mut = list.borrow_mut();
                if list_mut.is_empty() {
                    return Err(RuntimeError::ListEmpty);
                }
                list_mut.pop().expect("checked above")
            };
            stack.push(value);
        }
        "ASSIGN" => {
            if stack.len() < 3 {
                return Err(RuntimeError::StackUnderflow("ACTION_LIST(ASSIGN)"));
            }
            let list_ptr = match &stack[stack.len() - 3] {
                Value::Pointer(p) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_LIST(ASSIGN)")),
            };
            let list = list_ptr
                .as_list()
                .ok_or(RuntimeError::TypeMismatch("ACTION_LIST(ASSIGN)"))?;
            let index = match &stack[stack.len() - 2] {
                Value::Number(n) => *n,
                _ => return Err(RuntimeError::TypeMismatch("ACTION_LIST(ASSIGN)")),
            };
            let idx = list_index(index, list.borrow().len(), "ACTION_LIST(ASSIGN)")?;
            let value = stack.pop().expect("checked above");
            stack.pop();
            list.borrow_mut()[idx] = value;
        }
        "GET" => {
            if stack.len() < 2 {
                return Err(RuntimeError::StackUnderflow("ACTION_LIST(GET)"));
            }
            let index = match &stack[stack.len() - 1] {
                Value::Number(n) => *n,
                _ => return Err(RuntimeError::TypeMismatch("ACTION_LIST(GET)")),
            };
            let list_ptr = match &stack[stack.len() - 2] {
                Value::Pointer(p) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_LIST(GET)")),
            };
            let list = list_ptr
                .as_list()
                .ok_or(RuntimeError::TypeMismatch("ACTION_LIST(GET)"))?;
            let value = {
                let list_ref = list.borrow();
                let idx = list_index(index, list_ref.len(), "ACTION_LIST(GET)")?;
                list_ref[idx].clone()
            };
            *stack.last_mut().expect("checked above") = value;
        }
        "DEL" => {
            if stack.len() < 2 {
                return Err(RuntimeError::StackUnderflow("ACTION_LIST(DEL)"));
            }
            let index = match &stack[stack.len() - 1] {
                Value::Number(n) => *n,
                _ => return Err(RuntimeError::TypeMismatch("ACTION_LIST(DEL)")),
            };
            let list_ptr = match &stack[stack.len() - 2] {
                Value::Pointer(p) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_LIST(DEL)")),
            };
            let list = list_ptr
                .as_list()
                .ok_or(RuntimeError::TypeMismatch("ACTION_LIST(DEL)"))?;
            {
                let mut list_mut = list.borrow_mut();
                let idx = list_index(index, list_mut.len(), "ACTION_LIST(DEL)")?;
                list_mut.remove(idx);
            }
            stack.pop();
        }
        "LEN" => {
            let list_ptr = match stack.last() {
                Some(Value::Pointer(p)) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_LIST(LEN)")),
            };
            let list = list_ptr
                .as_list()
                .ok_or(RuntimeError::TypeMismatch("ACTION_LIST(LEN)"))?;
            let len = list.borrow().len();
            stack.push(Value::Number(len as f64));
        }
        _ => return Err(RuntimeError::UnknownListAction(action.to_owned())),
    }
    Ok(())
}

fn action_map(frame: &mut Frame, action: &str) -> Result<(), RuntimeError> {
    let stack = &mut frame.operand_stack;
    match action {
        "ASSIGN" => {
            if stack.len() < 3 {
                return Err(RuntimeError::StackUnderflow("ACTION_MAP(ASSIGN)"));
            }
            let map_ptr = match &stack[stack.len() - 3] {
                Value::Pointer(p) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_MAP(ASSIGN)")),
            };
            let map = map_ptr
                .as_map()
                .ok_or(RuntimeError::TypeMismatch("ACTION_MAP(ASSIGN)"))?;
            let key = match &stack[stack.len() - 2] {
                Value::String(s) => (**s).clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_MAP(ASSIGN)")),
            };
            let value = stack.pop().expect("checked above");
            stack.pop();
            map.borrow_mut().insert(key, value);
        }
        "DEL" => {
            if stack.len() < 2 {
                return Err(RuntimeError::StackUnderflow("ACTION_MAP(DEL)"));
            }
            let key = match &stack[stack.len() - 1] {
                Value::String(s) => (**s).clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_MAP(DEL)")),
            };
            let map_ptr = match &stack[stack.len() - 2] {
                Value::Pointer(p) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_MAP(DEL)")),
            };
            let map = map_ptr
                .as_map()
                .ok_or(RuntimeError::TypeMismatch("ACTION_MAP(DEL)"))?;
            {
                let mut map_mut = map.borrow_mut();
                if map_mut.remove(&key).is_none() {
                    return Err(RuntimeError::MapKeyNotFound(key));
                }
            }
            stack.pop();
        }
        "GET" => {
            if stack.len() < 2 {
                return Err(RuntimeError::StackUnderflow("ACTION_MAP(GET)"));
            }
            let key = match &stack[stack.len() - 1] {
                Value::String(s) => (**s).clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_MAP(GET)")),
            };
            let map_ptr = match &stack[stack.len() - 2] {
                Value::Pointer(p) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_MAP(GET)")),
            };
            let value = map_get(&map_ptr, &key)?;
            *stack.last_mut().expect("checked above") = value;
        }
        "LEN" => {
            let map_ptr = match stack.last() {
                Some(Value::Pointer(p)) => p.clone(),
                _ => return Err(RuntimeError::TypeMismatch("ACTION_MAP(LEN)")),
            };
            let map = map_ptr
                .as_map()
                .ok_or(RuntimeError::TypeMismatch("ACTION_MAP(LEN)"))?;
            let len = map.borrow().len();
            stack.push(Value::Number(len as f64));
        }
        _ => return Err(RuntimeError::UnknownMapAction(action.to_owned())),
    }
    Ok(())
}

fn map_get(map_ptr: &Pointer, key: &str) -> Result<Value, RuntimeError> {
    let mut current = map_ptr.clone();
    for _ in 0..MAX_PROTO_CHAIN {
        let map = current
            .as_map()
            .ok_or(RuntimeError::TypeMismatch("ACTION_MAP(GET)"))?;
        if let Some(value) = map.borrow().get(key) {
            return Ok(value.clone());
        }
        let proto = match map.borrow().get("__proto__") {
            Some(Value::Pointer(p)) => p.clone(),
            Some(_) => return Err(RuntimeError::ProtoNotPointer),
            None => return Err(RuntimeError::MapKeyNotFound(key.to_owned())),
        };
        current = proto;
    }
    Err(RuntimeError::ProtoChainTooLong)
}

#[cfg(test)]
mod test {
    use super::*;

    fn image_with_code(code: Vec<u8>) -> Image {
        let artifact = dvmfile::Artifact::new(vec![], vec![], code);
        Image::from_artifact(artifact)
    }

    fn image_with(numbers: Vec<f64>, strings: Vec<String>, code: Vec<u8>) -> Image {
        Image::from_artifact(dvmfile::Artifact::new(numbers, strings, code))
    }

    #[test]
    fn nop_then_exit_is_a_clean_outcome() {
        let mut thread = Thread::new();
        let image = image_with_code(vec![Opcode::Nop as u8, Opcode::Exit as u8]);
        assert_eq!(run(&mut thread, &image).unwrap(), Outcome::Exited);
    }

    #[test]
    fn falling_off_the_end_exits_cleanly() {
        let mut thread = Thread::new();
        let image = image_with_code(vec![Opcode::Nop as u8]);
        assert_eq!(run(&mut thread, &image).unwrap(), Outcome::Exited);
    }

    #[test]
    fn add_combines_top_and_second_from_top() {
        let mut frame = Frame::new();
        frame.operand_stack.push(Value::Number(2.0));
        frame.operand_stack.push(Value::Number(5.0));
        binary_number_op(&mut frame, "ADD", |top, second| Ok(top + second)).unwrap();
        assert_eq!(frame.operand_stack.len(), 1);
        assert!(matches!(frame.operand_stack[0], Value::Number(n) if n == 7.0));
    }

    #[test]
    fn div_checks_the_second_from_top_operand_for_zero() {
        let mut frame = Frame::new();
        frame.operand_stack.push(Value::Number(0.0));
        frame.operand_stack.push(Value::Number(10.0));
        let err = binary_number_op(&mut frame, "DIV", |top, second| {
            if second == 0.0 {
                Err(RuntimeError::DivideByZero)
            } else {
                Ok(top / second)
            }
        })
        .unwrap_err();
        assert!(matches!(err, RuntimeError::DivideByZero));
    }

    #[test]
    fn mod_has_no_zero_guard() {
        let mut frame = Frame::new();
        frame.operand_stack.push(Value::Number(0.0));
        frame.operand_stack.push(Value::Number(10.0));
        binary_number_op(&mut frame, "MOD", |top, second| Ok(top % second)).unwrap();
        assert!(matches!(frame.operand_stack[0], Value::Number(n) if n.is_nan()));
    }

    #[test]
    fn compare_pointer_uses_real_identity_not_self_comparison() {
        let a = Value::Pointer(Pointer::list());
        let b = Value::Pointer(Pointer::list());
        assert!(!compare("EQU", &a, &b).unwrap());
        assert!(compare("EQU", &a, &a.clone()).unwrap());
        assert!(compare("NE", &a, &b).unwrap());
    }

    #[test]
    fn compare_rejects_mismatched_types_outside_and_or() {
        let a = Value::Number(1.0);
        let b = Value::string("1");
        assert!(matches!(
            compare("EQU", &a, &b),
            Err(RuntimeError::CompareTypeMismatch)
        ));
        assert!(compare("AND", &a, &b).unwrap());
    }

    #[test]
    fn action_list_push_pop_round_trip() {
        let mut frame = Frame::new();
        let list = Pointer::list();
        frame.operand_stack.push(Value::Pointer(list.clone()));
        frame.operand_stack.push(Value::Number(42.0));
        action_list(&mut frame, "PUSH").unwrap();
        assert_eq!(frame.operand_stack.len(), 1);

        action_list(&mut frame, "LEN").unwrap();
        assert!(matches!(frame.operand_stack[1], Value::Number(n) if n == 1.0));
        frame.operand_stack.pop();

        action_list(&mut frame, "POP").unwrap();
        assert!(matches!(frame.operand_stack[1], Value::Number(n) if n == 42.0));
    }

    #[test]
    fn action_list_pop_on_empty_list_is_fatal() {
        let mut frame = Frame::new();
        frame.operand_stack.push(Value::Pointer(Pointer::list()));
        assert!(matches!(
            action_list(&mut frame, "POP"),
            Err(RuntimeError::ListEmpty)
        ));
    }

    #[test]
    fn action_map_get_walks_the_prototype_chain() {
        let proto = Pointer::map();
        proto
            .as_map()
            .unwrap()
            .borrow_mut()
            .insert("greeting".to_owned(), Value::string("hi"));

        let child = Pointer::map();
        child
            .as_map()
            .unwrap()
            .borrow_mut()
            .insert("__proto__".to_owned(), Value::Pointer(proto));

        let value = map_get(&child, "greeting").unwrap();
        assert!(matches!(value, Value::String(s) if &*s == "hi"));
    }

    #[test]
    fn action_map_get_reports_missing_key_at_chain_end() {
        let map = Pointer::map();
        assert!(matches!(
            map_get(&map, "missing"),
            Err(RuntimeError::MapKeyNotFound(_))
        ));
    }

    #[test]
    fn jmpc_consumes_its_operand_even_when_not_taken() {
        let mut thread = Thread::new();
        thread.current_mut().operand_stack.push(Value::Number(0.0));
        // JMPC to an address that would be invalid if actually taken,
        // followed by EXIT: the run must reach EXIT, proving the 8-byte
        // offset was consumed rather than reinterpreted as an opcode.
        let mut code = vec![Opcode::Jmpc as u8];
        code.extend_from_slice(&999u64.to_le_bytes());
        code.push(Opcode::Exit as u8);
        let image = image_with_code(code);
        assert_eq!(run(&mut thread, &image).unwrap(), Outcome::Exited);
    }

    #[test]
    fn load_num_and_store_global_round_trip() {
        let mut thread = Thread::new();
        let mut code = vec![Opcode::LoadNum as u8];
        code.extend_from_slice(&0u64.to_le_bytes());
        code.push(Opcode::StoreGlobal as u8);
        code.extend_from_slice(&0u64.to_le_bytes());
        code.push(Opcode::Exit as u8);
        let image = image_with(vec![3.5], vec![], code);
        run(&mut thread, &image).unwrap();
        assert!(matches!(thread.globals.get(&0), Some(Value::Number(n)) if *n == 3.5));
    }
}
