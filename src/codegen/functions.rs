//! Function prologue/epilogue and body generation (spec §4.3
//! "Function prologue/epilogue")
//!
//! Every function gets the same fixed frame shape: `pushq %rbp;
//! movq %rsp, %rbp; subq $N, %rsp` sized to its own [`Frame`], SysV
//! argument registers spilled into stack slots in declaration order,
//! a single epilogue label every `ret` jumps to, and `leave; ret` at
//! the end (spec §3 invariants 2-4). At most six parameters are
//! supported, matching the call-site cap in
//! [`crate::codegen::expr`] — a seventh parameter would need a
//! stack-passed argument, out of scope here.

use crate::ast::FunctionDecl;
use crate::codegen::control_flow::generate_block;
use crate::codegen::expr::ARG_REGS;
use crate::codegen::state::CodeGen;
use crate::diagnostics::LotusError;

pub fn generate_function(cg: &mut CodeGen, func: &FunctionDecl) -> Result<(), LotusError> {
    if func.params.len() > ARG_REGS.len() {
        return Err(LotusError::codegen_at(
            func.pos,
            format!(
                "function '{}' takes {} parameters, but at most {} are supported",
                func.name,
                func.params.len(),
                ARG_REGS.len()
            ),
        ));
    }

    cg.frame = crate::frame::Frame::new();
    let epilogue = cg.labels.fresh_local(&format!("{}_epilogue", func.name));
    cg.current_epilogue = Some(epilogue.clone());

    let label = if func.name == "main" { "main".to_string() } else { func.name.clone() };
    cg.emit_label(&label);
    cg.emit("pushq %rbp");
    cg.emit("movq %rsp, %rbp");

    let mut offsets = Vec::with_capacity(func.params.len());
    for param in &func.params {
        let offset = cg.frame.declare(&param.name, param.ty.clone());
        offsets.push(offset);
    }

    let frame_size = cg.frame.frame_size();
    if frame_size > 0 {
        cg.emit(format!("subq ${}, %rsp", frame_size));
    }

    for (i, offset) in offsets.iter().enumerate() {
        cg.emit(format!("movq {}, -{}(%rbp)", ARG_REGS[i], offset));
    }

    generate_block(cg, &func.body)?;

    cg.emit_label(&epilogue);
    cg.emit("leave");
    cg.emit("ret");

    cg.current_epilogue = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Param, Program, TypeAnnotation};
    use crate::diagnostics::SourcePos;

    fn simple_fn(name: &str, params: Vec<Param>) -> FunctionDecl {
        FunctionDecl { ret_ty: TypeAnnotation::Int, name: name.to_string(), params, body: vec![], pos: SourcePos::start() }
    }

    #[test]
    fn emits_prologue_and_matching_epilogue() {
        let mut cg = CodeGen::new(&Program::new()).unwrap();
        generate_function(&mut cg, &simple_fn("f", vec![])).unwrap();
        assert!(cg.text.contains("pushq %rbp"));
        assert!(cg.text.contains("leave"));
        assert!(cg.text.contains("ret"));
    }

    #[test]
    fn spills_parameters_into_stack_slots() {
        let mut cg = CodeGen::new(&Program::new()).unwrap();
        let params = vec![Param { ty: TypeAnnotation::Int, name: "a".to_string() }];
        generate_function(&mut cg, &simple_fn("f", params)).unwrap();
        assert!(cg.text.contains("movq %rdi, -8(%rbp)"));
    }

    #[test]
    fn more_than_six_parameters_is_a_codegen_error() {
        let mut cg = CodeGen::new(&Program::new()).unwrap();
        let params: Vec<Param> =
            (0..7).map(|i| Param { ty: TypeAnnotation::Int, name: format!("p{}", i) }).collect();
        let err = generate_function(&mut cg, &simple_fn("f", params)).unwrap_err();
        assert!(matches!(err, LotusError::Codegen { .. }));
    }
}
