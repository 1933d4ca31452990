//! Statement dispatch and control flow (component C7, spec §4.3
//! "Control flow")
//!
//! Lowers `if`/`while`/`for` to the exact label/jump shapes spec §4.3
//! specifies, threads `break`/`continue` through a stack of loop
//! labels for nesting, and dispatches every other statement kind.
//!
//! `try`/`catch`/`finally`/`throw` are parsed (spec §3) but spec §4.3
//! never specifies their lowering — this compiler does not implement
//! stack unwinding (consistent with having no runtime beyond the
//! emitted assembly itself), so `throw` terminates the process
//! immediately with the thrown value as its exit code, `try`'s body
//! and `finally` run unconditionally in sequence, and `catch` is
//! generated but jumped over — present so it still has to compile
//! cleanly, never reached at run time. See `DESIGN.md`.

use crate::ast::Stmt;
use crate::codegen::expr::{generate_assignment, generate_expr};
use crate::codegen::state::{CodeGen, LoopLabels};
use crate::diagnostics::LotusError;

pub fn generate_block(cg: &mut CodeGen, stmts: &[Stmt]) -> Result<(), LotusError> {
    cg.frame.push_scope();
    for stmt in stmts {
        generate_stmt(cg, stmt)?;
    }
    cg.frame.pop_scope();
    Ok(())
}

pub fn generate_stmt(cg: &mut CodeGen, stmt: &Stmt) -> Result<(), LotusError> {
    match stmt {
        Stmt::VariableDeclaration { ty, name, init, .. } => generate_var_decl(cg, ty, name, init),
        Stmt::ConstantDeclaration { ty, name, value, pos } => {
            crate::codegen::aggregates::generate_const_decl(cg, ty, name, value, *pos)
        }
        Stmt::Assignment { target, value, .. } => generate_assignment(cg, target, value),
        Stmt::ExprStatement { expr, .. } => generate_expr(cg, expr).map(|_| ()),
        Stmt::Block(stmts) => generate_block(cg, stmts),
        Stmt::ReturnStatement { value, .. } => generate_return(cg, value.as_ref()),
        Stmt::IfStatement { cond, then_branch, else_branch, .. } => {
            generate_if(cg, cond, then_branch, else_branch.as_deref())
        }
        Stmt::WhileStatement { cond, body, .. } => generate_while(cg, cond, body),
        Stmt::ForStatement { init, cond, update, body, .. } => {
            generate_for(cg, init.as_deref(), cond.as_ref(), update.as_deref(), body)
        }
        Stmt::BreakStatement { pos } => {
            let label = cg
                .active_loop()
                .map(|l| l.break_label.clone())
                .ok_or_else(|| LotusError::codegen_at(*pos, "'break' outside a loop"))?;
            cg.emit(format!("jmp {}", label));
            Ok(())
        }
        Stmt::ContinueStatement { pos } => {
            let label = cg
                .active_loop()
                .map(|l| l.continue_label.clone())
                .ok_or_else(|| LotusError::codegen_at(*pos, "'continue' outside a loop"))?;
            cg.emit(format!("jmp {}", label));
            Ok(())
        }
        Stmt::TryStatement { body, catch, finally, .. } => generate_try(cg, body, catch, finally.as_deref()),
        Stmt::ThrowStatement { value, .. } => generate_throw(cg, value),
        Stmt::FunctionDeclaration(_)
        | Stmt::StructDeclaration(_)
        | Stmt::EnumDeclaration(_)
        | Stmt::ClassDeclaration(_)
        | Stmt::ImportDeclaration { .. } => {
            Err(LotusError::codegen("declarations are only valid at the top level"))
        }
    }
}

fn generate_var_decl(
    cg: &mut CodeGen,
    ty: &crate::ast::TypeAnnotation,
    name: &str,
    init: &Option<crate::ast::Expr>,
) -> Result<(), LotusError> {
    let offset = cg.frame.declare(name, ty.clone());
    if let Some(init_expr) = init {
        generate_expr(cg, init_expr)?;
        cg.emit(format!("movq %rax, -{}(%rbp)", offset));
        if let crate::ast::Expr::StringLiteral(s) = init_expr {
            if let Some(var) = cg.frame.lookup_mut(name) {
                var.known_string_len = Some(s.as_bytes().len());
            }
        }
    }
    Ok(())
}

fn generate_return(cg: &mut CodeGen, value: Option<&crate::ast::Expr>) -> Result<(), LotusError> {
    match value {
        Some(expr) => generate_expr(cg, expr)?,
        None => cg.emit("movq $0, %rax"),
    }
    let epilogue = cg
        .current_epilogue
        .clone()
        .ok_or_else(|| LotusError::codegen("'ret' outside a function"))?;
    cg.emit(format!("jmp {}", epilogue));
    Ok(())
}

fn generate_if(
    cg: &mut CodeGen,
    cond: &crate::ast::Expr,
    then_branch: &[Stmt],
    else_branch: Option<&[Stmt]>,
) -> Result<(), LotusError> {
    let else_label = cg.labels.fresh_local("if_else");
    let end_label = cg.labels.fresh_local("if_end");
    generate_expr(cg, cond)?;
    cg.emit("testq %rax, %rax");
    cg.emit(format!("jz {}", else_label));
    generate_block(cg, then_branch)?;
    cg.emit(format!("jmp {}", end_label));
    cg.emit_label(&else_label);
    if let Some(else_stmts) = else_branch {
        generate_block(cg, else_stmts)?;
    }
    cg.emit_label(&end_label);
    Ok(())
}

fn generate_while(cg: &mut CodeGen, cond: &crate::ast::Expr, body: &[Stmt]) -> Result<(), LotusError> {
    let top = cg.labels.fresh_local("while_top");
    let end = cg.labels.fresh_local("while_end");
    cg.loop_stack.push(LoopLabels { continue_label: top.clone(), break_label: end.clone() });
    cg.emit_label(&top);
    generate_expr(cg, cond)?;
    cg.emit("testq %rax, %rax");
    cg.emit(format!("jz {}", end));
    generate_block(cg, body)?;
    cg.emit(format!("jmp {}", top));
    cg.emit_label(&end);
    cg.loop_stack.pop();
    Ok(())
}

fn generate_for(
    cg: &mut CodeGen,
    init: Option<&Stmt>,
    cond: Option<&crate::ast::Expr>,
    update: Option<&Stmt>,
    body: &[Stmt],
) -> Result<(), LotusError> {
    cg.frame.push_scope();
    if let Some(init_stmt) = init {
        generate_stmt(cg, init_stmt)?;
    }
    let top = cg.labels.fresh_local("for_top");
    let cont = cg.labels.fresh_local("for_cont");
    let end = cg.labels.fresh_local("for_end");
    cg.loop_stack.push(LoopLabels { continue_label: cont.clone(), break_label: end.clone() });
    cg.emit_label(&top);
    if let Some(cond_expr) = cond {
        generate_expr(cg, cond_expr)?;
        cg.emit("testq %rax, %rax");
        cg.emit(format!("jz {}", end));
    }
    generate_block(cg, body)?;
    cg.emit_label(&cont);
    if let Some(update_stmt) = update {
        generate_stmt(cg, update_stmt)?;
    }
    cg.emit(format!("jmp {}", top));
    cg.emit_label(&end);
    cg.loop_stack.pop();
    cg.frame.pop_scope();
    Ok(())
}

fn generate_try(
    cg: &mut CodeGen,
    body: &[Stmt],
    catch: &Option<(Option<String>, Vec<Stmt>)>,
    finally: Option<&[Stmt]>,
) -> Result<(), LotusError> {
    generate_block(cg, body)?;
    if let Some((_binding, catch_body)) = catch {
        let skip = cg.labels.fresh_local("catch_skip");
        cg.emit(format!("jmp {}", skip));
        let catch_label = cg.labels.fresh_local("catch");
        cg.emit_label(&catch_label);
        generate_block(cg, catch_body)?;
        cg.emit_label(&skip);
    }
    if let Some(finally_body) = finally {
        generate_block(cg, finally_body)?;
    }
    Ok(())
}

fn generate_throw(cg: &mut CodeGen, value: &crate::ast::Expr) -> Result<(), LotusError> {
    generate_expr(cg, value)?;
    cg.emit("movq %rax, %rdi");
    cg.emit("movq $60, %rax");
    cg.emit("syscall");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Program};
    use crate::diagnostics::SourcePos;

    fn fresh_cg() -> CodeGen {
        CodeGen::new(&Program::new()).unwrap()
    }

    #[test]
    fn break_outside_loop_is_a_codegen_error() {
        let mut cg = fresh_cg();
        let err = generate_stmt(&mut cg, &Stmt::BreakStatement { pos: SourcePos::start() }).unwrap_err();
        assert!(matches!(err, LotusError::Codegen { .. }));
    }

    #[test]
    fn while_loop_emits_top_and_end_labels_with_matching_jumps() {
        let mut cg = fresh_cg();
        generate_while(&mut cg, &Expr::BoolLiteral(true), &[]).unwrap();
        assert!(cg.text.contains("while_top"));
        assert!(cg.text.contains("while_end"));
    }

    #[test]
    fn for_loop_continue_jumps_to_update_not_condition() {
        let mut cg = fresh_cg();
        generate_for(&mut cg, None, None, None, &[Stmt::ContinueStatement { pos: SourcePos::start() }]).unwrap();
        assert!(cg.text.contains("for_cont"));
    }

    #[test]
    fn return_without_function_context_is_an_error() {
        let mut cg = fresh_cg();
        let err = generate_return(&mut cg, None).unwrap_err();
        assert!(matches!(err, LotusError::Codegen { .. }));
    }

    #[test]
    fn throw_emits_exit_syscall() {
        let mut cg = fresh_cg();
        generate_throw(&mut cg, &Expr::IntLiteral(7)).unwrap();
        assert!(cg.text.contains("movq $60, %rax"));
        assert!(cg.text.contains("syscall"));
    }
}
