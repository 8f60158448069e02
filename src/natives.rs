//! Host functions available to every program.

use std::rc::Rc;

use chrono::Utc;
use log::debug;
use rand::Rng;

use crate::callable::NativeFunction;
use crate::environment::Environment;
use crate::value::Value;

/// The full native table, in definition order.
pub fn all() -> Vec<NativeFunction> {
    vec![
        NativeFunction::new("clock", 0, clock),
        NativeFunction::new("rand", 0, random),
        NativeFunction::new("round", 1, round),
        NativeFunction::new("abs", 1, abs),
        NativeFunction::new("lowercase", 1, lowercase),
        NativeFunction::new("uppercase", 1, uppercase),
        NativeFunction::new("isNumber", 1, is_number),
        NativeFunction::new("isString", 1, is_string),
        NativeFunction::new("stringify", 1, stringify),
    ]
}

/// Bind every native in `globals`.  Native bindings cannot be reassigned.
pub fn define_all(globals: &mut Environment) {
    for native in all() {
        debug!("Registering native '{}'", native.name);
        globals.define(native.name, Value::Native(Rc::new(native)), false);
    }
}

fn clock(_: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(Utc::now().timestamp_millis() as f64 / 1000.0))
}

fn random(_: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(rand::thread_rng().gen::<f64>()))
}

fn round(args: &[Value]) -> Result<Value, String> {
    let n = number(args, "round")?;
    Ok(Value::Number((n + 0.5).floor()))
}

fn abs(args: &[Value]) -> Result<Value, String> {
    let n = number(args, "abs")?;
    Ok(Value::Number(n.abs()))
}

fn lowercase(args: &[Value]) -> Result<Value, String> {
    let s = string(args, "lowercase")?;
    Ok(Value::String(s.to_lowercase()))
}

fn uppercase(args: &[Value]) -> Result<Value, String> {
    let s = string(args, "uppercase")?;
    Ok(Value::String(s.to_uppercase()))
}

fn is_number(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(matches!(args.first(), Some(Value::Number(_)))))
}

fn is_string(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(matches!(args.first(), Some(Value::String(_)))))
}

fn stringify(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(
        args.first().map(Value::to_string).unwrap_or_default(),
    ))
}

fn number(args: &[Value], name: &str) -> Result<f64, String> {
    match args.first() {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(format!(
            "{}() expects a number but got {}.",
            name,
            other.type_name()
        )),
        None => Err(format!("{}() expects a number.", name)),
    }
}

fn string<'v>(args: &'v [Value], name: &str) -> Result<&'v str, String> {
    match args.first() {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!(
            "{}() expects a string but got {}.",
            name,
            other.type_name()
        )),
        None => Err(format!("{}() expects a string.", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_is_half_up() {
        assert_eq!(round(&[Value::Number(2.5)]), Ok(Value::Number(3.0)));
        assert_eq!(round(&[Value::Number(-2.5)]), Ok(Value::Number(-2.0)));
        assert_eq!(round(&[Value::Number(1.2)]), Ok(Value::Number(1.0)));
    }

    #[test]
    fn wrong_kinds_are_errors() {
        assert_eq!(
            abs(&[Value::from("x")]),
            Err("abs() expects a number but got string.".to_string())
        );
        assert!(uppercase(&[Value::Number(1.0)]).is_err());
    }

    #[test]
    fn case_and_type_predicates() {
        assert_eq!(lowercase(&[Value::from("MiXeD")]), Ok(Value::from("mixed")));
        assert_eq!(uppercase(&[Value::from("MiXeD")]), Ok(Value::from("MIXED")));
        assert_eq!(is_number(&[Value::Number(0.0)]), Ok(Value::Bool(true)));
        assert_eq!(is_string(&[Value::Number(0.0)]), Ok(Value::Bool(false)));
        assert_eq!(stringify(&[Value::Number(4.0)]), Ok(Value::from("4")));
        assert_eq!(stringify(&[Value::Nil]), Ok(Value::from("nil")));
    }

    #[test]
    fn clock_and_rand_return_numbers() {
        match clock(&[]) {
            Ok(Value::Number(secs)) => assert!(secs > 1_000_000_000.0),
            other => panic!("unexpected {:?}", other),
        }

        match random(&[]) {
            Ok(Value::Number(r)) => assert!((0.0..1.0).contains(&r)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn natives_are_bound_immutably() {
        use crate::token::{Token, TokenType};

        let mut globals = Environment::new();
        define_all(&mut globals);

        let name = Token::new(TokenType::IDENTIFIER, "clock", 1);
        assert_eq!(globals.get(&name).unwrap().to_string(), "<native fn clock>");
        assert!(globals.assign(&name, Value::Nil).is_err());
    }
}
