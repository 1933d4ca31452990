//! Constant emission (spec §3 "ConstantDeclaration", §4.3 "Constants")
//!
//! A `const` binds a name to a literal value placed in the data
//! section once, under a fresh label. Constants are looked up through
//! [`crate::frame::ConstantsTable`] regardless of whether the
//! declaration appeared at the top level or inside a function body —
//! this compiler gives every `const` process-wide visibility rather
//! than honoring block scope for it, since the data section has no
//! notion of scope to begin with. Declaring two different constants
//! with the same name in different functions will collide; this is a
//! deliberate simplification, not an oversight (see `DESIGN.md`).

use crate::ast::{Expr, TypeAnnotation};
use crate::codegen::state::CodeGen;
use crate::diagnostics::{LotusError, SourcePos};

pub fn generate_const_decl(
    cg: &mut CodeGen,
    ty: &TypeAnnotation,
    name: &str,
    value: &Expr,
    pos: SourcePos,
) -> Result<(), LotusError> {
    let label = cg.labels.fresh_const();
    match (ty, value) {
        (TypeAnnotation::String, Expr::StringLiteral(s)) => {
            cg.emit_data_line(format!("{}:", label));
            cg.emit_data_line(format!("    .asciz \"{}\"", crate::codegen::printf::escape_for_data(s)));
        }
        (TypeAnnotation::Bool, Expr::BoolLiteral(b)) => {
            cg.emit_data_line(format!("{}:", label));
            cg.emit_data_line(format!("    .quad {}", if *b { 1 } else { 0 }));
        }
        (_, Expr::IntLiteral(n)) => {
            cg.emit_data_line(format!("{}:", label));
            cg.emit_data_line(format!("    .quad {}", n));
        }
        _ => {
            return Err(LotusError::codegen_at(
                pos,
                format!("const '{}' requires a literal value matching its declared type", name),
            ));
        }
    }
    cg.constants.define(name, ty.clone(), label);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;
    use crate::diagnostics::SourcePos;

    #[test]
    fn int_constant_is_placed_in_data_as_a_quad() {
        let mut cg = CodeGen::new(&Program::new()).unwrap();
        generate_const_decl(&mut cg, &TypeAnnotation::Int, "N", &Expr::IntLiteral(5), SourcePos::start()).unwrap();
        assert!(cg.data.contains(".quad 5"));
        assert!(cg.constants.get("N").is_some());
    }

    #[test]
    fn non_literal_value_is_rejected() {
        let mut cg = CodeGen::new(&Program::new()).unwrap();
        let err = generate_const_decl(
            &mut cg,
            &TypeAnnotation::Int,
            "N",
            &Expr::Identifier("x".to_string()),
            SourcePos::start(),
        )
        .unwrap_err();
        assert!(matches!(err, LotusError::Codegen { .. }));
    }
}
