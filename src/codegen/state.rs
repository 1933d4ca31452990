//! Code generator state (component C7)
//!
//! [`CodeGen`] owns the two output buffers (`data`, `text`), the
//! current function's [`Frame`], the process-wide [`ConstantsTable`],
//! [`TypeRegistry`], [`ActiveModules`], and [`LabelCounter`]. It is
//! constructed once per compilation and threaded mutably through every
//! lowering function in this module (spec §4.3, §9 "Global label
//! counter" redesign note).

use crate::ast::{Program, Stmt, TypeAnnotation};
use crate::diagnostics::LotusError;
use crate::frame::{ConstantsTable, Frame, LabelCounter};
use crate::stdlib::ActiveModules;
use crate::types::TypeRegistry;

/// The pair of labels a nested loop needs for `break`/`continue`,
/// pushed and popped as a stack to support nesting (spec §4.3 "Control
/// flow").
#[derive(Debug, Clone)]
pub struct LoopLabels {
    pub continue_label: String,
    pub break_label: String,
}

#[derive(Debug)]
pub struct CodeGen {
    pub data: String,
    pub text: String,
    pub frame: Frame,
    pub constants: ConstantsTable,
    pub labels: LabelCounter,
    pub types: TypeRegistry,
    pub active_modules: ActiveModules,
    /// Return type of every top-level function, consulted when a call
    /// expression's result feeds into further field/array access.
    pub functions: std::collections::HashMap<String, TypeAnnotation>,
    pub loop_stack: Vec<LoopLabels>,
    /// Label the current function's `ret` statements jump to, so every
    /// exit path runs the same epilogue.
    pub current_epilogue: Option<String>,
    /// Lazily-emitted 32-byte scratch buffer reused by every `itoa`/`%c`
    /// formatting verb (spec §5: compiler is single-threaded and
    /// synchronous, so one reused buffer is safe).
    itoa_buffer_label: Option<String>,
}

impl CodeGen {
    pub fn new(program: &Program) -> Result<Self, LotusError> {
        let mut cg = CodeGen {
            data: String::new(),
            text: String::new(),
            frame: Frame::new(),
            constants: ConstantsTable::new(),
            labels: LabelCounter::new(),
            types: TypeRegistry::new(),
            active_modules: ActiveModules::from_program(program),
            functions: std::collections::HashMap::new(),
            loop_stack: Vec::new(),
            current_epilogue: None,
            itoa_buffer_label: None,
        };
        cg.register_aggregates(program)?;
        Ok(cg)
    }

    /// First pass over top-level declarations: structs, enums and
    /// classes must be known before any function body that references
    /// them is generated (spec §4.3 "Aggregates").
    fn register_aggregates(&mut self, program: &Program) -> Result<(), LotusError> {
        let mut seen = std::collections::HashSet::new();
        for stmt in &program.top_level {
            let name = match stmt {
                Stmt::FunctionDeclaration(f) => Some(f.name.as_str()),
                Stmt::StructDeclaration(s) => Some(s.name.as_str()),
                Stmt::EnumDeclaration(e) => Some(e.name.as_str()),
                Stmt::ClassDeclaration(c) => Some(c.name.as_str()),
                _ => None,
            };
            if let Some(name) = name {
                if !seen.insert(name.to_string()) {
                    return Err(LotusError::name(
                        crate::diagnostics::SourcePos::start(),
                        format!("'{}' is declared more than once", name),
                    ));
                }
            }
            match stmt {
                Stmt::FunctionDeclaration(f) => {
                    self.functions.insert(f.name.clone(), f.ret_ty.clone());
                }
                Stmt::StructDeclaration(s) => {
                    let fields: Vec<(String, TypeAnnotation)> =
                        s.fields.iter().map(|f| (f.name.clone(), f.ty.clone())).collect();
                    self.types.define_struct(&s.name, &fields);
                }
                Stmt::EnumDeclaration(e) => {
                    self.types.define_enum(&e.name, &e.variants);
                }
                Stmt::ClassDeclaration(c) => {
                    let fields: Vec<(String, TypeAnnotation)> =
                        c.fields.iter().map(|f| (f.name.clone(), f.ty.clone())).collect();
                    let methods = c
                        .methods
                        .iter()
                        .map(|m| crate::types::ClassMethod {
                            name: m.name.clone(),
                            symbol: format!("{}__{}", c.name, m.name),
                            ret_ty: m.ret_ty.clone(),
                        })
                        .collect();
                    self.types.define_class(&c.name, &fields, methods);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Appends a line to the text section with the standard 4-space
    /// instruction indent.
    pub fn emit(&mut self, line: impl AsRef<str>) {
        self.text.push_str("    ");
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    pub fn emit_label(&mut self, label: impl AsRef<str>) {
        self.text.push_str(label.as_ref());
        self.text.push_str(":\n");
    }

    pub fn emit_data_line(&mut self, line: impl AsRef<str>) {
        self.data.push_str(line.as_ref());
        self.data.push('\n');
    }

    pub fn active_loop(&self) -> Option<&LoopLabels> {
        self.loop_stack.last()
    }

    /// Returns the label of the shared 32-byte `itoa`/`%c` scratch
    /// buffer, emitting its `.skip 32` data directive the first time
    /// it's needed.
    pub fn ensure_itoa_buffer(&mut self) -> String {
        if let Some(label) = &self.itoa_buffer_label {
            return label.clone();
        }
        let label = ".itoa_buf".to_string();
        self.emit_data_line(format!("{}:", label));
        self.emit_data_line("    .skip 32");
        self.itoa_buffer_label = Some(label.clone());
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunctionDecl, Param};
    use crate::diagnostics::SourcePos;

    fn func(name: &str) -> Stmt {
        Stmt::FunctionDeclaration(FunctionDecl {
            ret_ty: TypeAnnotation::Int,
            name: name.to_string(),
            params: Vec::<Param>::new(),
            body: vec![Stmt::ReturnStatement { value: None, pos: SourcePos::start() }],
            pos: SourcePos::start(),
        })
    }

    #[test]
    fn two_distinct_top_level_functions_register_cleanly() {
        let mut program = Program::new();
        program.top_level.push(func("main"));
        program.top_level.push(func("helper"));
        let cg = CodeGen::new(&program).unwrap();
        assert!(cg.functions.contains_key("main"));
        assert!(cg.functions.contains_key("helper"));
    }

    #[test]
    fn duplicate_top_level_function_name_is_a_name_error() {
        let mut program = Program::new();
        program.top_level.push(func("main"));
        program.top_level.push(func("main"));
        let err = CodeGen::new(&program).unwrap_err();
        assert!(matches!(err, LotusError::Name { .. }));
    }
}
