// ABOUTME: Tree-walking evaluator: statements produce control signals, expressions produce values

use std::sync::Arc;

use crate::ast::{BinaryOp, Expr, IncDecOp, Program, Stmt};
use crate::env::Env;
use crate::error::RuntimeError;
use crate::value::{UserFunc, Value};

/// What a statement did, propagated up through nested blocks without
/// exceptions: a loop sees `Break`/`Continue`, a function body sees `Return`.
/// `Normal` carries the value the statement evaluated to (`Nil` for
/// statements with no meaningful value) so a block's, loop's, or program's
/// trailing statement can surface a value regardless of its kind.
pub enum Signal {
    Normal(Value),
    Break,
    Continue,
    Return(Value),
}

fn check_interrupt(env: &Env) -> Result<(), RuntimeError> {
    if env.is_interrupted() {
        return Err(RuntimeError::Interrupted);
    }
    Ok(())
}

/// Evaluates every statement in a program sequentially, returning the value
/// of the final statement (used by the host's `run` convenience entry
/// point). A `break`/`continue` reaching the top level is an error, matching
/// a loop-free function body.
pub fn eval_program(program: &Program, env: &Env) -> Result<Value, RuntimeError> {
    let mut last = Value::Nil;
    for stmt in program.iter() {
        match exec_stmt(stmt, env)? {
            Signal::Normal(v) => last = v,
            Signal::Return(v) => return Ok(v),
            Signal::Break => return Err(RuntimeError::BreakOutsideLoop),
            Signal::Continue => return Err(RuntimeError::ContinueOutsideLoop),
        }
    }
    Ok(last)
}

pub fn exec_block(stmts: &[Stmt], env: &Env) -> Result<Signal, RuntimeError> {
    let mut last = Signal::Normal(Value::Nil);
    for stmt in stmts {
        last = exec_stmt(stmt, env)?;
        if !matches!(last, Signal::Normal(_)) {
            return Ok(last);
        }
    }
    Ok(last)
}

pub fn exec_stmt(stmt: &Stmt, env: &Env) -> Result<Signal, RuntimeError> {
    check_interrupt(env)?;
    let signal = exec_stmt_inner(stmt, env)?;
    crate::debug_trace!("{:?} -> {}", stmt, signal_name(&signal));
    Ok(signal)
}

fn signal_name(signal: &Signal) -> &'static str {
    match signal {
        Signal::Normal(_) => "normal",
        Signal::Break => "break",
        Signal::Continue => "continue",
        Signal::Return(_) => "return",
    }
}

fn exec_stmt_inner(stmt: &Stmt, env: &Env) -> Result<Signal, RuntimeError> {
    match stmt {
        Stmt::Expr(expr) => {
            let value = eval_expr(expr, env)?;
            Ok(Signal::Normal(value))
        }
        Stmt::VarDecl { names, inits } => {
            if !inits.is_empty() && inits.len() != names.len() {
                return Err(RuntimeError::InvalidOperation(format!(
                    "var declares {} name(s) but {} initializer(s)",
                    names.len(),
                    inits.len()
                )));
            }
            let mut last = Value::Nil;
            for (i, name) in names.iter().enumerate() {
                let value = match inits.get(i) {
                    Some(expr) => eval_expr(expr, env)?,
                    None => Value::Nil,
                };
                env.bind(name.clone(), value.clone());
                last = value;
            }
            Ok(Signal::Normal(last))
        }
        Stmt::Assign { target, value, pos: _ } => {
            let value = eval_expr(value, env)?;
            assign_to(target, value.clone(), env)?;
            Ok(Signal::Normal(value))
        }
        Stmt::CompoundAssign {
            op,
            target,
            value,
            pos: _,
        } => {
            let current = eval_expr(target, env)?;
            let rhs = eval_expr(value, env)?;
            let result = eval_binary(*op, current, rhs)?;
            assign_to(target, result.clone(), env)?;
            Ok(Signal::Normal(result))
        }
        Stmt::IncDec { op, target, pos: _ } => {
            let current = eval_expr(target, env)?;
            let delta = match op {
                IncDecOp::Inc => BinaryOp::Add,
                IncDecOp::Dec => BinaryOp::Sub,
            };
            let result = eval_binary(delta, current, Value::Int32(1))?;
            assign_to(target, result.clone(), env)?;
            Ok(Signal::Normal(result))
        }
        Stmt::FuncDecl { name, params, body } => {
            let func = Value::Func(Arc::new(UserFunc {
                name: Some(name.clone()),
                params: params.clone(),
                body: body.clone(),
                closure: env.clone(),
            }));
            env.bind(name.clone(), func);
            Ok(Signal::Normal(Value::Nil))
        }
        Stmt::Return(expr, _pos) => {
            let value = match expr {
                Some(expr) => eval_expr(expr, env)?,
                None => Value::Nil,
            };
            Ok(Signal::Return(value))
        }
        Stmt::Break(_) => Ok(Signal::Break),
        Stmt::Continue(_) => Ok(Signal::Continue),
        Stmt::Block(stmts) => {
            let block_env = env.child();
            exec_block(stmts, &block_env)
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval_expr(cond, env)?.is_truthy() {
                exec_block(then_branch, &env.child())
            } else if let Some(else_branch) = else_branch {
                exec_block(else_branch, &env.child())
            } else {
                Ok(Signal::Normal(Value::Nil))
            }
        }
        Stmt::ForC {
            init,
            cond,
            post,
            body,
        } => {
            let loop_env = env.child();
            if let Some(init) = init {
                exec_stmt(init, &loop_env)?;
            }
            let mut result = Value::Nil;
            loop {
                check_interrupt(&loop_env)?;
                if let Some(cond) = cond {
                    if !eval_expr(cond, &loop_env)?.is_truthy() {
                        break;
                    }
                }
                match exec_block(body, &loop_env.child())? {
                    Signal::Break => break,
                    Signal::Return(v) => return Ok(Signal::Return(v)),
                    Signal::Normal(v) => result = v,
                    Signal::Continue => {}
                }
                if let Some(post) = post {
                    exec_stmt(post, &loop_env)?;
                }
            }
            Ok(Signal::Normal(result))
        }
        Stmt::ForIn {
            var_name,
            iterable,
            body,
        } => {
            let value = eval_expr(iterable, env)?;
            let items = iterable_items(&value)?;
            let loop_env = env.child();
            let mut result = Value::Nil;
            for item in items {
                check_interrupt(&loop_env)?;
                let iter_env = loop_env.child();
                iter_env.bind(var_name.clone(), item);
                match exec_block(body, &iter_env)? {
                    Signal::Break => break,
                    Signal::Return(v) => return Ok(Signal::Return(v)),
                    Signal::Normal(v) => result = v,
                    Signal::Continue => {}
                }
            }
            Ok(Signal::Normal(result))
        }
    }
}

fn iterable_items(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::Seq(items) => Ok(items.read().unwrap().clone()),
        other => Err(RuntimeError::ForLoopUnsupportedType(other.type_name().to_string())),
    }
}

pub fn eval_expr(expr: &Expr, env: &Env) -> Result<Value, RuntimeError> {
    check_interrupt(env)?;
    match expr {
        Expr::Nil => Ok(Value::Nil),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(lit) => parse_number_literal(lit),
        Expr::Str(s) => Ok(Value::str(s.clone())),
        Expr::Ident(name) => env
            .get(name)
            .ok_or_else(|| RuntimeError::undefined_symbol(name.clone())),
        Expr::Array(items) => {
            let values = items
                .iter()
                .map(|e| eval_expr(e, env))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::seq(values))
        }
        Expr::MapLit(pairs) => {
            let mut values: Vec<(Value, Value)> = Vec::new();
            for (k, v) in pairs {
                let key = eval_expr(k, env)?;
                if !matches!(key, Value::Str(_)) {
                    return Err(RuntimeError::InvalidOperation(
                        "map keys must be strings".to_string(),
                    ));
                }
                let value = eval_expr(v, env)?;
                if let Some(entry) = values.iter_mut().find(|(k, _)| *k == key) {
                    entry.1 = value;
                } else {
                    values.push((key, value));
                }
            }
            Ok(Value::map(values))
        }
        Expr::UnaryMinus { rhs, pos: _ } => {
            let value = eval_expr(rhs, env)?;
            match value {
                Value::Int32(n) => Ok(Value::Int32(n.wrapping_neg())),
                Value::Int64(n) => Ok(Value::Int64(n.wrapping_neg())),
                Value::Float32(n) => Ok(Value::Float32(-n)),
                Value::Float64(n) => Ok(Value::Float64(-n)),
                other => Err(RuntimeError::InvalidOperation(format!(
                    "cannot negate a {}",
                    other.type_name()
                ))),
            }
        }
        Expr::BinOp { op, lhs, rhs, pos: _ } => {
            let lhs_value = eval_expr(lhs, env)?;
            match op {
                BinaryOp::And => {
                    if !lhs_value.is_truthy() {
                        Ok(lhs_value)
                    } else {
                        eval_expr(rhs, env)
                    }
                }
                BinaryOp::Or => {
                    if lhs_value.is_truthy() {
                        Ok(lhs_value)
                    } else {
                        eval_expr(rhs, env)
                    }
                }
                _ => {
                    let rhs_value = eval_expr(rhs, env)?;
                    eval_binary(*op, lhs_value, rhs_value)
                }
            }
        }
        Expr::Index { base, index, pos: _ } => {
            let base_value = eval_expr(base, env)?;
            let index_value = eval_expr(index, env)?;
            index_get(&base_value, &index_value)
        }
        Expr::Slice { base, from, to, pos: _ } => {
            let base_value = eval_expr(base, env)?;
            let from_value = eval_expr(from, env)?;
            let to_value = eval_expr(to, env)?;
            slice_get(&base_value, &from_value, &to_value)
        }
        Expr::Member { base, name, pos: _ } => {
            let base_value = eval_expr(base, env)?;
            member_get(&base_value, name)
        }
        Expr::Call { callee, args, pos: _ } => {
            let callee_value = eval_expr(callee, env)?;
            let arg_values = args
                .iter()
                .map(|a| eval_expr(a, env))
                .collect::<Result<Vec<_>, _>>()?;
            call_value(&callee_value, &arg_values, env)
        }
        Expr::FuncLit { params, body } => Ok(Value::Func(Arc::new(UserFunc {
            name: None,
            params: params.clone(),
            body: body.clone(),
            closure: env.clone(),
        }))),
        Expr::Make { type_name, pos: _ } => {
            if !env.is_type_defined(type_name) {
                return Err(RuntimeError::InvalidMake);
            }
            Ok(Value::Host(Arc::new(crate::value::HostValue {
                type_name: type_name.clone(),
                payload: Box::new(()),
            })))
        }
    }
}

fn parse_number_literal(lit: &str) -> Result<Value, RuntimeError> {
    if lit.contains('.') {
        lit.parse::<f64>()
            .map(Value::Float64)
            .map_err(|_| RuntimeError::Custom(format!("invalid number literal '{}'", lit)))
    } else {
        lit.parse::<i64>()
            .map(Value::Int64)
            .map_err(|_| RuntimeError::Custom(format!("invalid number literal '{}'", lit)))
    }
}

/// Promotes both operands to the wider of the two numeric ranks
/// (int32 < int64 < float32 < float64) before applying an arithmetic op.
fn promote_numeric(lhs: Value, rhs: Value) -> Option<(Value, Value)> {
    let (lr, rr) = (lhs.numeric_rank()?, rhs.numeric_rank()?);
    let rank = lr.max(rr);
    let cast = |v: Value, rank: u8| -> Value {
        let f = v.as_f64().unwrap();
        match rank {
            0 => Value::Int32(f as i32),
            1 => Value::Int64(f as i64),
            2 => Value::Float32(f as f32),
            _ => Value::Float64(f),
        }
    };
    Some((cast(lhs, rank), cast(rhs, rank)))
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    use BinaryOp::*;

    if op == Add {
        if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
            return Ok(Value::str(format!("{}{}", a, b)));
        }
        if let Value::Seq(a) = &lhs {
            let mut items = a.read().unwrap().clone();
            match &rhs {
                Value::Seq(b) => items.extend(b.read().unwrap().iter().cloned()),
                other => items.push(other.clone()),
            }
            return Ok(Value::seq(items));
        }
        if let Value::Seq(b) = &rhs {
            let mut items = vec![lhs.clone()];
            items.extend(b.read().unwrap().iter().cloned());
            return Ok(Value::seq(items));
        }
    }

    if matches!(op, Eq | Ne) {
        let numeric_both = lhs.numeric_rank().is_some() && rhs.numeric_rank().is_some();
        if !numeric_both {
            let eq = lhs == rhs;
            return Ok(Value::Bool(if op == Eq { eq } else { !eq }));
        }
    }

    if matches!(op, Lt | Le | Gt | Ge) {
        if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
            let ord = a.as_ref().cmp(b.as_ref());
            use std::cmp::Ordering::*;
            return Ok(Value::Bool(match (op, ord) {
                (Lt, Less) | (Le, Less) | (Le, Equal) => true,
                (Gt, Greater) | (Ge, Greater) | (Ge, Equal) => true,
                _ => false,
            }));
        }
    }

    let (lhs, rhs) = promote_numeric(lhs, rhs).ok_or_else(|| {
        RuntimeError::InvalidOperation(format!("cannot apply {:?} to non-numeric operands", op))
    })?;

    // Integer arithmetic wraps at its width (two's-complement) rather than
    // panicking on overflow; float arithmetic follows IEEE 754 as usual.
    macro_rules! arith {
        ($iop:ident, $fop:tt) => {
            match (&lhs, &rhs) {
                (Value::Int32(a), Value::Int32(b)) => Value::Int32(a.$iop(*b)),
                (Value::Int64(a), Value::Int64(b)) => Value::Int64(a.$iop(*b)),
                (Value::Float32(a), Value::Float32(b)) => Value::Float32(a $fop b),
                (Value::Float64(a), Value::Float64(b)) => Value::Float64(a $fop b),
                _ => unreachable!("promote_numeric guarantees matching ranks"),
            }
        };
    }

    Ok(match op {
        Add => arith!(wrapping_add, +),
        Sub => arith!(wrapping_sub, -),
        Mul => arith!(wrapping_mul, *),
        Div => {
            let is_integral = matches!(lhs, Value::Int32(_) | Value::Int64(_));
            if is_integral && rhs.as_f64() == Some(0.0) {
                return Err(RuntimeError::DivisionByZero);
            }
            arith!(wrapping_div, /)
        }
        Rem => {
            let is_integral = matches!(lhs, Value::Int32(_) | Value::Int64(_));
            if is_integral && rhs.as_f64() == Some(0.0) {
                return Err(RuntimeError::DivisionByZero);
            }
            arith!(wrapping_rem, %)
        }
        Eq => Value::Bool(lhs.as_f64() == rhs.as_f64()),
        Ne => Value::Bool(lhs.as_f64() != rhs.as_f64()),
        Lt => Value::Bool(lhs.as_f64() < rhs.as_f64()),
        Le => Value::Bool(lhs.as_f64() <= rhs.as_f64()),
        Gt => Value::Bool(lhs.as_f64() > rhs.as_f64()),
        Ge => Value::Bool(lhs.as_f64() >= rhs.as_f64()),
        And | Or => unreachable!("short-circuited before reaching eval_binary"),
    })
}

fn assign_to(target: &Expr, value: Value, env: &Env) -> Result<(), RuntimeError> {
    match target {
        Expr::Ident(name) => {
            // Bare `x = e` binds `x` in the current scope if it isn't
            // visible anywhere yet; otherwise it updates the nearest binding.
            match env.set(name, value.clone()) {
                Ok(()) => Ok(()),
                Err(crate::error::HostError::NotFound(_)) => {
                    env.bind(name.clone(), value);
                    Ok(())
                }
                Err(other) => Err(RuntimeError::Custom(other.to_string())),
            }
        }
        Expr::Index { base, index, pos: _ } => {
            let base_value = eval_expr(base, env)?;
            let index_value = eval_expr(index, env)?;
            index_set(&base_value, &index_value, value)
        }
        Expr::Slice { base, from, to, pos: _ } => {
            let base_value = eval_expr(base, env)?;
            let from_value = eval_expr(from, env)?;
            let to_value = eval_expr(to, env)?;
            slice_set(&base_value, &from_value, &to_value, value)
        }
        Expr::Member { base, name, pos: _ } => {
            let base_value = eval_expr(base, env)?;
            member_set(&base_value, name, value)
        }
        other => Err(RuntimeError::InvalidOperation(format!(
            "cannot assign to {:?}",
            other
        ))),
    }
}

fn as_index(index: &Value) -> Result<i64, RuntimeError> {
    match index {
        Value::Int32(n) => Ok(*n as i64),
        Value::Int64(n) => Ok(*n),
        _ => Err(RuntimeError::IndexOutOfRange),
    }
}

/// Sequence/string indices never wrap negative values; a negative index is
/// simply out of range.
fn as_seq_index(index: &Value, len: usize) -> Result<usize, RuntimeError> {
    let i = as_index(index)?;
    if i < 0 || i as usize >= len {
        return Err(RuntimeError::IndexOutOfRange);
    }
    Ok(i as usize)
}

fn index_get(base: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match base {
        Value::Seq(items) => {
            let items = items.read().unwrap();
            let i = as_seq_index(index, items.len())?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = as_seq_index(index, chars.len())?;
            Ok(Value::str(chars[i].to_string()))
        }
        Value::Map(pairs) => {
            if !matches!(index, Value::Str(_)) {
                return Err(RuntimeError::no_index_operation(base.type_name()));
            }
            let pairs = pairs.read().unwrap();
            Ok(pairs
                .iter()
                .find(|(k, _)| k == index)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Nil))
        }
        other => Err(RuntimeError::no_index_operation(other.type_name())),
    }
}

fn index_set(base: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match base {
        Value::Seq(items) => {
            let mut items = items.write().unwrap();
            let i = as_seq_index(index, items.len())?;
            items[i] = value;
            Ok(())
        }
        Value::Map(pairs) => {
            if !matches!(index, Value::Str(_)) {
                return Err(RuntimeError::no_index_assign_operation(base.type_name()));
            }
            let mut pairs = pairs.write().unwrap();
            if let Some(entry) = pairs.iter_mut().find(|(k, _)| k == index) {
                entry.1 = value;
            } else {
                pairs.push((index.clone(), value));
            }
            Ok(())
        }
        other => Err(RuntimeError::no_index_assign_operation(other.type_name())),
    }
}

fn resolve_slice_bounds(from: &Value, to: &Value, len: usize) -> Result<(usize, usize), RuntimeError> {
    let from = as_index(from)?;
    let to = as_index(to)?;
    if from > to {
        return Err(RuntimeError::InvalidSliceIndex);
    }
    if from < 0 || to < 0 || from as usize > len || to as usize > len {
        return Err(RuntimeError::IndexOutOfRange);
    }
    Ok((from as usize, to as usize))
}

fn slice_get(base: &Value, from: &Value, to: &Value) -> Result<Value, RuntimeError> {
    match base {
        Value::Seq(items) => {
            let items = items.read().unwrap();
            let (from, to) = resolve_slice_bounds(from, to, items.len())?;
            Ok(Value::seq(items[from..to].to_vec()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (from, to) = resolve_slice_bounds(from, to, chars.len())?;
            Ok(Value::str(chars[from..to].iter().collect::<String>()))
        }
        other => Err(RuntimeError::no_slice_operation(other.type_name())),
    }
}

fn slice_set(base: &Value, from: &Value, to: &Value, value: Value) -> Result<(), RuntimeError> {
    match base {
        Value::Str(_) => Err(RuntimeError::no_slice_assign_operation("string")),
        Value::Seq(items) => {
            let replacement = match value {
                Value::Seq(v) => v.read().unwrap().clone(),
                other => vec![other],
            };
            let mut items = items.write().unwrap();
            let (from, to) = resolve_slice_bounds(from, to, items.len())?;
            items.splice(from..to, replacement);
            Ok(())
        }
        other => Err(RuntimeError::no_slice_assign_operation(other.type_name())),
    }
}

fn member_get(base: &Value, name: &str) -> Result<Value, RuntimeError> {
    match base {
        Value::Map(pairs) => Ok(pairs
            .read()
            .unwrap()
            .iter()
            .find(|(k, _)| matches!(k, Value::Str(s) if s.as_ref() == name))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Nil)),
        other => Err(RuntimeError::no_member_operation(other.type_name())),
    }
}

fn member_set(base: &Value, name: &str, value: Value) -> Result<(), RuntimeError> {
    match base {
        Value::Map(pairs) => {
            let key = Value::str(name.to_string());
            let mut pairs = pairs.write().unwrap();
            if let Some(entry) = pairs.iter_mut().find(|(k, _)| *k == key) {
                entry.1 = value;
            } else {
                pairs.push((key, value));
            }
            Ok(())
        }
        other => Err(RuntimeError::no_member_operation(other.type_name())),
    }
}

pub fn call_value(callee: &Value, args: &[Value], env: &Env) -> Result<Value, RuntimeError> {
    match callee {
        Value::Func(func) => call_user_func(func, args, env),
        Value::HostFunc(func) => {
            if let Some(arity) = func.arity {
                if arity != args.len() {
                    return Err(RuntimeError::arity_mismatch(
                        func.name.clone(),
                        arity.to_string(),
                        args.len(),
                    ));
                }
            }
            (func.func)(args)
        }
        other => Err(RuntimeError::not_callable(format!("{}", other))),
    }
}

fn call_user_func(func: &Arc<UserFunc>, args: &[Value], env: &Env) -> Result<Value, RuntimeError> {
    if args.len() != func.params.len() {
        return Err(RuntimeError::arity_mismatch(
            func.name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
            func.params.len().to_string(),
            args.len(),
        ));
    }
    check_interrupt(env)?;
    let call_env = func.closure.child();
    for (param, arg) in func.params.iter().zip(args.iter()) {
        call_env.bind(param.clone(), arg.clone());
    }
    match exec_block(&func.body, &call_env)? {
        Signal::Return(v) => Ok(v),
        Signal::Normal(_) => Ok(Value::Nil),
        Signal::Break => Err(RuntimeError::BreakOutsideLoop),
        Signal::Continue => Err(RuntimeError::ContinueOutsideLoop),
    }
}
