//! Expression-to-register lowering (component C7, spec §4.3
//! "Expression-to-register protocol")
//!
//! [`generate_expr_to_reg`] emits code that leaves an expression's
//! value in the requested register. Internally every expression is
//! first computed into `%rax`; composite operations use the scratch
//! registers `%rbx, %rcx, %r8, %r9, %r10, %r11` freely, and callers
//! must not assume anything beyond the destination register survives
//! a call into this module (spec §4.3).
//!
//! Aggregate instances (struct/class) in this language are always
//! accessed through a pointer obtained from `new` — there is no inline
//! stack storage for them, only for fixed-size arrays of scalars. That
//! keeps lvalue addressing uniform: `.`  and `->` both compute
//! `pointer_value + field_offset`, and array indexing distinguishes
//! only between an inline array's own stack slot and a heap pointer's
//! value (see [`generate_array_base_and_elem`]).

use crate::ast::{BinOp, Expr, LogicalOp, TypeAnnotation, UnaryOp};
use crate::codegen::state::CodeGen;
use crate::diagnostics::LotusError;
use crate::stdlib::IntrinsicKind;

pub fn generate_expr_to_reg(cg: &mut CodeGen, expr: &Expr, reg: &str) -> Result<(), LotusError> {
    generate_expr(cg, expr)?;
    if reg != "%rax" {
        cg.emit(format!("movq %rax, {}", reg));
    }
    Ok(())
}

/// Computes `expr`'s value into `%rax`.
pub fn generate_expr(cg: &mut CodeGen, expr: &Expr) -> Result<(), LotusError> {
    match expr {
        Expr::IntLiteral(n) => {
            cg.emit(format!("movq ${}, %rax", n));
            Ok(())
        }
        Expr::FloatLiteral(_) => {
            // Non-goal: no floating-point codegen beyond type tracking.
            Err(LotusError::codegen("floating-point arithmetic is not code-generated"))
        }
        Expr::BoolLiteral(b) => {
            cg.emit(format!("movq ${}, %rax", if *b { 1 } else { 0 }));
            Ok(())
        }
        Expr::NullLiteral => {
            cg.emit("movq $0, %rax");
            Ok(())
        }
        Expr::StringLiteral(s) => {
            emit_string_literal(cg, s);
            Ok(())
        }
        Expr::Identifier(name) => generate_identifier(cg, name),
        Expr::FunctionCall { name, args } => generate_call(cg, name, args),
        Expr::MethodCall { receiver, method, args } => generate_method_call(cg, receiver, method, args),
        Expr::FieldAccess { .. } => {
            let ty = generate_lvalue_addr(cg, expr)?;
            emit_sized_load(cg, &ty);
            Ok(())
        }
        Expr::ArrayIndex { .. } => {
            let ty = generate_lvalue_addr(cg, expr)?;
            emit_sized_load(cg, &ty);
            Ok(())
        }
        Expr::EnumVariant { enum_name, variant } => {
            let value = cg.types.enum_variant_value(enum_name, variant).ok_or_else(|| {
                LotusError::codegen(format!("unknown enum variant {}::{}", enum_name, variant))
            })?;
            cg.emit(format!("movq ${}, %rax", value));
            Ok(())
        }
        Expr::New { type_name, args } => generate_new(cg, type_name, args),
        Expr::BinaryOp { op, lhs, rhs } => generate_binary_op(cg, *op, lhs, rhs),
        Expr::UnaryOp { op, operand } => generate_unary_op(cg, *op, operand),
        Expr::LogicalOp { op, lhs, rhs } => generate_logical_op(cg, *op, lhs, rhs),
    }
}

fn emit_string_literal(cg: &mut CodeGen, s: &str) {
    let label = cg.labels.fresh_string();
    cg.emit_data_line(format!("{}:", label));
    cg.emit_data_line(format!("    .asciz \"{}\"", crate::codegen::printf::escape_for_data(s)));
    cg.emit(format!("leaq {}(%rip), %rax", label));
}

fn generate_identifier(cg: &mut CodeGen, name: &str) -> Result<(), LotusError> {
    if let Some(var) = cg.frame.lookup(name) {
        let offset = var.offset;
        if matches!(var.ty, TypeAnnotation::Array(_, _)) {
            cg.emit(format!("leaq -{}(%rbp), %rax", offset));
        } else {
            cg.emit(format!("movq -{}(%rbp), %rax", offset));
        }
        return Ok(());
    }
    if let Some(constant) = cg.constants.get(name) {
        let label = constant.data_label.clone();
        match constant.ty {
            TypeAnnotation::String => cg.emit(format!("leaq {}(%rip), %rax", label)),
            _ => cg.emit(format!("movq {}(%rip), %rax", label)),
        }
        return Ok(());
    }
    Err(LotusError::name(crate::diagnostics::SourcePos::start(), format!("undefined name '{}'", name)))
}

// ---- calls ----------------------------------------------------------------

pub(crate) const ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

fn generate_call(cg: &mut CodeGen, name: &str, args: &[Expr]) -> Result<(), LotusError> {
    if name == "printf" {
        let pos = crate::diagnostics::SourcePos::start();
        return crate::codegen::printf::generate_printf_call(cg, args, pos);
    }
    if let Some(intrinsic) = cg.active_modules.resolve(name) {
        return generate_intrinsic_call(cg, intrinsic, args);
    }
    if !cg.functions.contains_key(name) {
        return Err(LotusError::name(crate::diagnostics::SourcePos::start(), format!("call to undefined function '{}'", name)));
    }
    if args.len() > ARG_REGS.len() {
        return Err(LotusError::codegen(format!(
            "call to '{}' has {} arguments; more than {} is not supported",
            name,
            args.len(),
            ARG_REGS.len()
        )));
    }
    evaluate_args_into_registers(cg, args)?;
    cg.emit(format!("call {}", name));
    Ok(())
}

fn generate_intrinsic_call(
    cg: &mut CodeGen,
    intrinsic: &crate::stdlib::Intrinsic,
    args: &[Expr],
) -> Result<(), LotusError> {
    if intrinsic.kind != IntrinsicKind::FormatPrint && args.len() != intrinsic.arity {
        return Err(LotusError::codegen(format!(
            "call to '{}' has {} arguments; expected {}",
            intrinsic.name,
            args.len(),
            intrinsic.arity
        )));
    }
    if intrinsic.name == "pow" {
        crate::stdlib::validate_pow_exponent(&args[1])?;
    }
    match intrinsic.kind {
        IntrinsicKind::InlineCompute => {
            if intrinsic.arity >= 1 {
                generate_expr(cg, &args[0])?;
            }
            if intrinsic.arity >= 2 {
                cg.emit("pushq %rax");
                generate_expr(cg, &args[1])?;
                cg.emit("movq %rax, %rbx");
                cg.emit("popq %rax");
            }
            crate::stdlib::emit_inline(intrinsic.name, &mut cg.text, &mut cg.labels)
        }
        IntrinsicKind::LibcCall => {
            generate_expr(cg, &args[0])?;
            crate::stdlib::emit_libc_call(intrinsic.name, &mut cg.text)
        }
        IntrinsicKind::FormatPrint => {
            crate::codegen::printf::generate_printf_call(cg, args, crate::diagnostics::SourcePos::start())
        }
    }
}

/// Evaluates each argument left-to-right and moves it into its SysV
/// register. Each argument is computed into `%rax` then spilled to the
/// stack before the next is evaluated, so later evaluations can't
/// clobber an earlier argument's register.
fn evaluate_args_into_registers(cg: &mut CodeGen, args: &[Expr]) -> Result<(), LotusError> {
    for arg in args {
        generate_expr(cg, arg)?;
        cg.emit("pushq %rax");
    }
    for (i, _) in args.iter().enumerate().rev() {
        cg.emit(format!("popq {}", ARG_REGS[i]));
    }
    Ok(())
}

fn generate_method_call(
    cg: &mut CodeGen,
    receiver: &Expr,
    method: &str,
    args: &[Expr],
) -> Result<(), LotusError> {
    let class_name = match infer_type(cg, receiver) {
        Some(TypeAnnotation::Pointer(inner)) => match *inner {
            TypeAnnotation::Named(n) => n,
            _ => return Err(LotusError::codegen(format!("'{}' is not a class pointer", method))),
        },
        Some(TypeAnnotation::Named(n)) => n,
        _ => return Err(LotusError::codegen(format!("cannot resolve receiver type for .{}()", method))),
    };
    let symbol = {
        let class = cg
            .types
            .get_class(&class_name)
            .ok_or_else(|| LotusError::codegen(format!("unknown class '{}'", class_name)))?;
        let m = class
            .methods
            .get(method)
            .ok_or_else(|| LotusError::codegen(format!("{} has no method '{}'", class_name, method)))?;
        m.symbol.clone()
    };
    if args.len() + 1 > ARG_REGS.len() {
        return Err(LotusError::codegen("method call argument count exceeds the supported limit"));
    }
    generate_expr(cg, receiver)?;
    cg.emit("pushq %rax");
    for arg in args {
        generate_expr(cg, arg)?;
        cg.emit("pushq %rax");
    }
    for i in (0..=args.len()).rev() {
        cg.emit(format!("popq {}", ARG_REGS[i]));
    }
    cg.emit(format!("call {}", symbol));
    Ok(())
}

fn generate_new(cg: &mut CodeGen, type_name: &str, args: &[Expr]) -> Result<(), LotusError> {
    let size = cg
        .types
        .size_of(&TypeAnnotation::Named(type_name.to_string()))
        .ok_or_else(|| LotusError::codegen(format!("unknown type '{}'", type_name)))?;
    cg.emit(format!("movq ${}, %rax", size));
    crate::stdlib::emit_libc_call("malloc", &mut cg.text)?;
    // `%rax` now holds the fresh pointer. If the type has an `init`-named
    // constructor method, call it with the new pointer as `this`.
    let init_symbol = cg
        .types
        .get_class(type_name)
        .and_then(|c| c.methods.get("init"))
        .map(|m| m.symbol.clone());
    if let Some(symbol) = init_symbol {
        if args.len() + 1 > ARG_REGS.len() {
            return Err(LotusError::codegen("constructor argument count exceeds the supported limit"));
        }
        cg.emit("pushq %rax"); // save the new pointer across arg evaluation
        for arg in args {
            generate_expr(cg, arg)?;
            cg.emit("pushq %rax");
        }
        for i in (1..=args.len()).rev() {
            cg.emit(format!("popq {}", ARG_REGS[i]));
        }
        cg.emit("popq %rdi");
        cg.emit("pushq %rdi"); // keep a copy to return after the call
        cg.emit(format!("call {}", symbol));
        cg.emit("popq %rax");
    }
    Ok(())
}

// ---- lvalues: field access, array indexing --------------------------------

/// Computes the address of an lvalue expression into `%r10` and
/// returns the type stored there (used to pick a sized load/store).
pub fn generate_lvalue_addr(cg: &mut CodeGen, expr: &Expr) -> Result<TypeAnnotation, LotusError> {
    match expr {
        Expr::Identifier(name) => {
            let var = cg
                .frame
                .lookup(name)
                .ok_or_else(|| LotusError::name(crate::diagnostics::SourcePos::start(), format!("undefined name '{}'", name)))?;
            let offset = var.offset;
            let ty = var.ty.clone();
            cg.emit(format!("leaq -{}(%rbp), %r10", offset));
            Ok(ty)
        }
        Expr::FieldAccess { object, field, .. } => {
            let object_ty = infer_type(cg, object)
                .ok_or_else(|| LotusError::codegen(format!("cannot resolve type of field '{}'", field)))?;
            let class_name = match object_ty {
                TypeAnnotation::Named(n) => n,
                TypeAnnotation::Pointer(inner) => match *inner {
                    TypeAnnotation::Named(n) => n,
                    _ => return Err(LotusError::codegen(format!("'{}' is not an aggregate field", field))),
                },
                _ => return Err(LotusError::codegen(format!("'{}' is not an aggregate field", field))),
            };
            let (offset, field_ty) = lookup_field(cg, &class_name, field)?;
            generate_expr(cg, object)?; // pointer value
            cg.emit("movq %rax, %r10");
            if offset != 0 {
                cg.emit(format!("addq ${}, %r10", offset));
            }
            Ok(field_ty)
        }
        Expr::ArrayIndex { array, index } => {
            let elem_ty = generate_array_base_and_elem(cg, array)?; // base -> %r10
            cg.emit("pushq %r10");
            generate_expr(cg, index)?;
            cg.emit("movq %rax, %r11");
            cg.emit("popq %r10");
            let size = cg.types.size_of(&elem_ty).unwrap_or(8);
            match size {
                1 | 2 | 4 | 8 => cg.emit(format!("leaq (%r10,%r11,{}), %r10", size)),
                other => {
                    cg.emit(format!("imulq ${}, %r11", other));
                    cg.emit("addq %r11, %r10");
                }
            }
            Ok(elem_ty)
        }
        Expr::UnaryOp { op: UnaryOp::Deref, operand } => {
            let ty = infer_type(cg, operand);
            generate_expr(cg, operand)?;
            cg.emit("movq %rax, %r10");
            match ty {
                Some(TypeAnnotation::Pointer(inner)) => Ok(*inner),
                _ => Ok(TypeAnnotation::Int),
            }
        }
        other => Err(LotusError::codegen(format!("{:?} is not assignable", other))),
    }
}

fn lookup_field(cg: &CodeGen, class_name: &str, field: &str) -> Result<(usize, TypeAnnotation), LotusError> {
    if let Some(s) = cg.types.get_struct(class_name) {
        if let Some(f) = s.fields.iter().find(|f| f.name == field) {
            return Ok((f.offset, f.ty.clone()));
        }
    }
    if let Some(c) = cg.types.get_class(class_name) {
        if let Some(f) = c.fields.iter().find(|f| f.name == field) {
            return Ok((f.offset, f.ty.clone()));
        }
    }
    Err(LotusError::codegen(format!("{} has no field '{}'", class_name, field)))
}

/// Leaves the base address of an array access in `%r10` (the stack
/// slot's own address for an inline `T[N]` local, or the pointer's
/// value for a heap-allocated buffer) and returns the element type.
fn generate_array_base_and_elem(cg: &mut CodeGen, array: &Expr) -> Result<TypeAnnotation, LotusError> {
    match infer_type(cg, array) {
        Some(TypeAnnotation::Array(elem, _)) => {
            if let Expr::Identifier(name) = array {
                let var = cg
                    .frame
                    .lookup(name)
                    .ok_or_else(|| LotusError::name(crate::diagnostics::SourcePos::start(), format!("undefined name '{}'", name)))?;
                cg.emit(format!("leaq -{}(%rbp), %r10", var.offset));
            } else {
                generate_expr(cg, array)?;
                cg.emit("movq %rax, %r10");
            }
            Ok(*elem)
        }
        Some(TypeAnnotation::Pointer(elem)) => {
            generate_expr(cg, array)?;
            cg.emit("movq %rax, %r10");
            Ok(*elem)
        }
        _ => Err(LotusError::codegen("indexing requires an array or pointer type")),
    }
}

fn emit_sized_load(cg: &mut CodeGen, ty: &TypeAnnotation) {
    let size = cg.types.size_of(ty).unwrap_or(8);
    let unsigned = matches!(
        ty,
        TypeAnnotation::Uint8 | TypeAnnotation::Uint16 | TypeAnnotation::Uint32 | TypeAnnotation::Uint64 | TypeAnnotation::Bool
    );
    match size {
        1 if unsigned => cg.emit("movzbq (%r10), %rax"),
        1 => cg.emit("movsbq (%r10), %rax"),
        2 if unsigned => cg.emit("movzwq (%r10), %rax"),
        2 => cg.emit("movswq (%r10), %rax"),
        4 if unsigned => cg.emit("movl (%r10), %eax"),
        4 => cg.emit("movslq (%r10), %rax"),
        _ => cg.emit("movq (%r10), %rax"),
    }
}

pub fn emit_sized_store(cg: &mut CodeGen, ty: &TypeAnnotation) {
    let size = cg.types.size_of(ty).unwrap_or(8);
    match size {
        1 => cg.emit("movb %al, (%r10)"),
        2 => cg.emit("movw %ax, (%r10)"),
        4 => cg.emit("movl %eax, (%r10)"),
        _ => cg.emit("movq %rax, (%r10)"),
    }
}

/// Assigns `value` into the lvalue `target`, sized to the target's
/// type.
pub fn generate_assignment(cg: &mut CodeGen, target: &Expr, value: &Expr) -> Result<(), LotusError> {
    if let Expr::Identifier(name) = target {
        if cg.frame.lookup(name).is_none() {
            return Err(LotusError::name(crate::diagnostics::SourcePos::start(), format!("assignment to undefined name '{}'", name)));
        }
    }
    let ty = generate_lvalue_addr(cg, target)?;
    cg.emit("pushq %r10");
    generate_expr(cg, value)?;
    cg.emit("popq %r10");
    if let Expr::Identifier(name) = target {
        if let Some(literal_len) = string_literal_len(value) {
            if let Some(var) = cg.frame.lookup_mut(name) {
                var.known_string_len = Some(literal_len);
            }
        }
    }
    emit_sized_store(cg, &ty);
    Ok(())
}

fn string_literal_len(expr: &Expr) -> Option<usize> {
    match expr {
        Expr::StringLiteral(s) => Some(s.as_bytes().len()),
        _ => None,
    }
}

// ---- static type inference (syntax-directed, no separate pass) -----------

/// Infers an expression's static type from the frame, constants table
/// and type registry already populated by the time it's generated.
/// Returns `None` when the type can't be determined (e.g. `null`),
/// which callers treat as "caller must already know the type".
pub fn infer_type(cg: &CodeGen, expr: &Expr) -> Option<TypeAnnotation> {
    match expr {
        Expr::IntLiteral(_) => Some(TypeAnnotation::Int),
        Expr::FloatLiteral(_) => Some(TypeAnnotation::Float),
        Expr::StringLiteral(_) => Some(TypeAnnotation::String),
        Expr::BoolLiteral(_) => Some(TypeAnnotation::Bool),
        Expr::NullLiteral => None,
        Expr::Identifier(name) => cg
            .frame
            .lookup(name)
            .map(|v| v.ty.clone())
            .or_else(|| cg.constants.get(name).map(|c| c.ty.clone())),
        Expr::FieldAccess { object, field, .. } => {
            let object_ty = infer_type(cg, object)?;
            let class_name = match object_ty {
                TypeAnnotation::Named(n) => n,
                TypeAnnotation::Pointer(inner) => match *inner {
                    TypeAnnotation::Named(n) => n,
                    _ => return None,
                },
                _ => return None,
            };
            lookup_field(cg, &class_name, field).ok().map(|(_, ty)| ty)
        }
        Expr::ArrayIndex { array, .. } => match infer_type(cg, array)? {
            TypeAnnotation::Array(elem, _) | TypeAnnotation::Pointer(elem) => Some(*elem),
            _ => None,
        },
        Expr::EnumVariant { .. } => Some(TypeAnnotation::Int),
        Expr::New { type_name, .. } => Some(TypeAnnotation::Pointer(Box::new(TypeAnnotation::Named(type_name.clone())))),
        Expr::FunctionCall { name, .. } => cg.functions.get(name).cloned(),
        Expr::MethodCall { receiver, method, .. } => {
            let class_name = match infer_type(cg, receiver)? {
                TypeAnnotation::Named(n) => n,
                TypeAnnotation::Pointer(inner) => match *inner {
                    TypeAnnotation::Named(n) => n,
                    _ => return None,
                },
                _ => return None,
            };
            cg.types.get_class(&class_name)?.methods.get(method).map(|m| m.ret_ty.clone())
        }
        Expr::UnaryOp { op: UnaryOp::Deref, operand } => match infer_type(cg, operand)? {
            TypeAnnotation::Pointer(inner) => Some(*inner),
            _ => None,
        },
        Expr::UnaryOp { op: UnaryOp::AddrOf, operand } => {
            infer_type(cg, operand).map(|ty| TypeAnnotation::Pointer(Box::new(ty)))
        }
        Expr::UnaryOp { .. } | Expr::BinaryOp { .. } | Expr::LogicalOp { .. } => Some(TypeAnnotation::Int),
    }
}

// ---- operators --------------------------------------------------------------

fn generate_binary_op(cg: &mut CodeGen, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<(), LotusError> {
    generate_expr(cg, lhs)?;
    cg.emit("pushq %rax");
    generate_expr(cg, rhs)?;
    cg.emit("movq %rax, %rbx");
    cg.emit("popq %rax");
    match op {
        BinOp::Add => cg.emit("addq %rbx, %rax"),
        BinOp::Sub => cg.emit("subq %rbx, %rax"),
        BinOp::Mul => cg.emit("imulq %rbx, %rax"),
        BinOp::Div => {
            cg.emit("cqto");
            cg.emit("idivq %rbx");
        }
        BinOp::Mod => {
            cg.emit("cqto");
            cg.emit("idivq %rbx");
            cg.emit("movq %rdx, %rax");
        }
        BinOp::Shl => {
            cg.emit("movq %rbx, %rcx");
            cg.emit("salq %cl, %rax");
        }
        BinOp::Shr => {
            cg.emit("movq %rbx, %rcx");
            cg.emit("sarq %cl, %rax");
        }
        BinOp::BitAnd => cg.emit("andq %rbx, %rax"),
        BinOp::BitOr => cg.emit("orq %rbx, %rax"),
        BinOp::BitXor => cg.emit("xorq %rbx, %rax"),
        BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => {
            cg.emit("cmpq %rbx, %rax");
            let setcc = match op {
                BinOp::Eq => "sete",
                BinOp::NotEq => "setne",
                BinOp::Lt => "setl",
                BinOp::Gt => "setg",
                BinOp::LtEq => "setle",
                BinOp::GtEq => "setge",
                _ => unreachable!(),
            };
            cg.emit(format!("{} %al", setcc));
            cg.emit("movzbq %al, %rax");
        }
    }
    Ok(())
}

fn generate_unary_op(cg: &mut CodeGen, op: UnaryOp, operand: &Expr) -> Result<(), LotusError> {
    match op {
        UnaryOp::AddrOf => {
            generate_lvalue_addr(cg, operand)?;
            cg.emit("movq %r10, %rax");
            Ok(())
        }
        UnaryOp::Deref => {
            let pointee = infer_type(cg, operand).and_then(|t| match t {
                TypeAnnotation::Pointer(inner) => Some(*inner),
                _ => None,
            });
            generate_expr(cg, operand)?;
            cg.emit("movq %rax, %r10");
            emit_sized_load(cg, &pointee.unwrap_or(TypeAnnotation::Int));
            Ok(())
        }
        UnaryOp::Neg => {
            generate_expr(cg, operand)?;
            cg.emit("negq %rax");
            Ok(())
        }
        UnaryOp::Not => {
            generate_expr(cg, operand)?;
            cg.emit("testq %rax, %rax");
            cg.emit("sete %al");
            cg.emit("movzbq %al, %rax");
            Ok(())
        }
        UnaryOp::BitNot => {
            generate_expr(cg, operand)?;
            cg.emit("notq %rax");
            Ok(())
        }
    }
}

fn generate_logical_op(cg: &mut CodeGen, op: LogicalOp, lhs: &Expr, rhs: &Expr) -> Result<(), LotusError> {
    let rhs_label = cg.labels.fresh_local("logic_rhs");
    let end_label = cg.labels.fresh_local("logic_end");
    generate_expr(cg, lhs)?;
    cg.emit("testq %rax, %rax");
    // Canonicalize to 0/1 before branching: `setne`/`movzbq` don't touch
    // the flags `testq` just set, so the jump below still sees the same
    // zero/non-zero outcome, but a short-circuit fallthrough now carries
    // a proper boolean instead of the LHS's raw truthy value.
    cg.emit("setne %al");
    cg.emit("movzbq %al, %rax");
    match op {
        LogicalOp::And => cg.emit(format!("jnz {}", rhs_label)),
        LogicalOp::Or => cg.emit(format!("jz {}", rhs_label)),
    }
    cg.emit(format!("jmp {}", end_label));
    cg.emit_label(&rhs_label);
    generate_expr(cg, rhs)?;
    cg.emit("testq %rax, %rax");
    cg.emit("setne %al");
    cg.emit("movzbq %al, %rax");
    cg.emit_label(&end_label);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;

    fn fresh_cg() -> CodeGen {
        CodeGen::new(&Program::new()).unwrap()
    }

    #[test]
    fn int_literal_emits_immediate_move() {
        let mut cg = fresh_cg();
        generate_expr(&mut cg, &Expr::IntLiteral(42)).unwrap();
        assert!(cg.text.contains("movq $42, %rax"));
    }

    #[test]
    fn addition_uses_push_pop_scratch_protocol() {
        let mut cg = fresh_cg();
        let expr = Expr::BinaryOp {
            op: BinOp::Add,
            lhs: Box::new(Expr::IntLiteral(1)),
            rhs: Box::new(Expr::IntLiteral(2)),
        };
        generate_expr(&mut cg, &expr).unwrap();
        assert!(cg.text.contains("pushq %rax"));
        assert!(cg.text.contains("addq %rbx, %rax"));
    }

    #[test]
    fn division_sign_extends_with_cqto() {
        let mut cg = fresh_cg();
        let expr = Expr::BinaryOp {
            op: BinOp::Div,
            lhs: Box::new(Expr::IntLiteral(10)),
            rhs: Box::new(Expr::IntLiteral(3)),
        };
        generate_expr(&mut cg, &expr).unwrap();
        assert!(cg.text.contains("cqto"));
        assert!(cg.text.contains("idivq %rbx"));
    }

    #[test]
    fn float_literal_arithmetic_is_rejected() {
        let mut cg = fresh_cg();
        let err = generate_expr(&mut cg, &Expr::FloatLiteral(1.5)).unwrap_err();
        assert!(matches!(err, LotusError::Codegen { .. }));
    }

    #[test]
    fn logical_or_canonicalizes_truthy_lhs_before_short_circuiting() {
        let mut cg = fresh_cg();
        let expr = Expr::LogicalOp {
            op: LogicalOp::Or,
            lhs: Box::new(Expr::IntLiteral(5)),
            rhs: Box::new(Expr::IntLiteral(0)),
        };
        generate_expr(&mut cg, &expr).unwrap();
        // The LHS's raw value (5) must be squashed to 0/1 before the
        // short-circuit jump, or `a||b` with a truthy non-1 `a` would
        // evaluate to `a` instead of `1`.
        let testq_idx = cg.text.find("testq %rax, %rax").unwrap();
        let after = &cg.text[testq_idx..];
        let jump_idx = after.find("jz").unwrap();
        let between = &after[..jump_idx];
        assert!(between.contains("setne %al"));
        assert!(between.contains("movzbq %al, %rax"));
    }

    #[test]
    fn undefined_identifier_is_a_name_error() {
        let mut cg = fresh_cg();
        let err = generate_expr(&mut cg, &Expr::Identifier("nope".to_string())).unwrap_err();
        assert!(matches!(err, LotusError::Name { .. }));
    }
}
