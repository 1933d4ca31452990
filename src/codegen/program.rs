//! Top-level compilation driver (spec §4.3 "Program assembly")
//!
//! Builds a [`CodeGen`], walks top-level declarations emitting each
//! function body and top-level constant, then assembles the final
//! `.s` text: a `.section .data`, a `.section .text` with `_start`
//! calling `main` and exiting via `syscall 60` with its return value,
//! followed by every generated function (spec §4.3 "Entry point").

use crate::ast::{Program, Stmt};
use crate::codegen::aggregates::generate_const_decl;
use crate::codegen::functions::generate_function;
use crate::codegen::state::CodeGen;
use crate::diagnostics::LotusError;

pub fn generate_program(program: &Program) -> Result<String, LotusError> {
    let mut cg = CodeGen::new(program)?;

    if program.find_function("main").is_none() {
        return Err(LotusError::codegen("program has no 'main' function"));
    }

    for stmt in &program.top_level {
        match stmt {
            Stmt::ImportDeclaration { .. } => {}
            Stmt::StructDeclaration(_) | Stmt::EnumDeclaration(_) | Stmt::ClassDeclaration(_) => {}
            Stmt::ConstantDeclaration { ty, name, value, pos } => {
                generate_const_decl(&mut cg, ty, name, value, *pos)?;
            }
            Stmt::FunctionDeclaration(f) => {
                generate_function(&mut cg, f)?;
            }
            other => {
                return Err(LotusError::codegen(format!(
                    "'{:?}' is not allowed at the top level",
                    other
                )));
            }
        }
    }

    let mut out = String::new();
    out.push_str(".section .data\n");
    out.push_str(&cg.data);
    out.push_str(".section .text\n");
    out.push_str(".global _start\n");
    out.push_str("_start:\n");
    out.push_str("    call main\n");
    out.push_str("    movq %rax, %rdi\n");
    out.push_str("    movq $60, %rax\n");
    out.push_str("    syscall\n");
    out.push_str(&cg.text);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunctionDecl, TypeAnnotation};
    use crate::diagnostics::SourcePos;

    fn program_with_main(body: Vec<Stmt>) -> Program {
        Program {
            top_level: vec![Stmt::FunctionDeclaration(FunctionDecl {
                ret_ty: TypeAnnotation::Int,
                name: "main".to_string(),
                params: vec![],
                body,
                pos: SourcePos::start(),
            })],
        }
    }

    #[test]
    fn missing_main_is_a_codegen_error() {
        let program = Program::new();
        let err = generate_program(&program).unwrap_err();
        assert!(matches!(err, LotusError::Codegen { .. }));
    }

    #[test]
    fn assembles_data_and_text_sections_with_start_entry() {
        let program = program_with_main(vec![Stmt::ReturnStatement {
            value: Some(crate::ast::Expr::IntLiteral(0)),
            pos: SourcePos::start(),
        }]);
        let asm = generate_program(&program).unwrap();
        assert!(asm.starts_with(".section .data\n"));
        assert!(asm.contains(".section .text"));
        assert!(asm.contains("_start:"));
        assert!(asm.contains("call main"));
        assert!(asm.contains("main:"));
    }
}
