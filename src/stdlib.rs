//! Embedded standard-library intrinsics (component C8)
//!
//! `use "module";` activates one of the four named modules below.
//! Calls to an active module's intrinsics are lowered inline by the
//! code generator rather than through the SysV call ABI (spec §4.3
//! "Stdlib intrinsics") — `printf` is the one exception, decomposed
//! separately by `crate::codegen::printf` because it needs the literal
//! format string, not just argument registers.
//!
//! Each entry here only knows its *calling convention*: how many
//! arguments it takes and whether it computes inline or calls out to
//! libc. The actual register-placement and branching is emitted by
//! [`emit_inline`], which assumes the code generator has already
//! evaluated argument 1 into `%rax` and argument 2 (if any) into
//! `%rbx` — the same convention binary operators use (spec §4.3
//! "Binary op lowering").

use crate::ast::Expr;
use crate::diagnostics::LotusError;
use crate::frame::LabelCounter;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::LazyLock;

/// The four modules a `use` statement may activate.
pub const MODULE_NAMES: [&str; 4] = ["io", "mem", "math", "str"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicKind {
    /// Computed in place from argument registers; result left in `%rax`.
    InlineCompute,
    /// A real SysV call into the external libc (args/return follow the
    /// normal calling convention, not the `%rax`/`%rbx` scratch pair).
    LibcCall,
    /// Handled entirely by `codegen::printf`; present here only so
    /// module-activation and arity checks see a uniform table.
    FormatPrint,
}

#[derive(Debug, Clone, Copy)]
pub struct Intrinsic {
    pub module: &'static str,
    pub name: &'static str,
    pub arity: usize,
    pub kind: IntrinsicKind,
}

static REGISTRY: LazyLock<HashMap<&'static str, Intrinsic>> = LazyLock::new(|| {
    use IntrinsicKind::*;
    [
        Intrinsic { module: "io", name: "printf", arity: usize::MAX, kind: FormatPrint },
        Intrinsic { module: "mem", name: "malloc", arity: 1, kind: LibcCall },
        Intrinsic { module: "mem", name: "free", arity: 1, kind: LibcCall },
        Intrinsic { module: "math", name: "sqrt", arity: 1, kind: InlineCompute },
        Intrinsic { module: "math", name: "pow", arity: 2, kind: InlineCompute },
        Intrinsic { module: "math", name: "gcd", arity: 2, kind: InlineCompute },
        Intrinsic { module: "math", name: "max", arity: 2, kind: InlineCompute },
        Intrinsic { module: "math", name: "min", arity: 2, kind: InlineCompute },
        Intrinsic { module: "math", name: "abs", arity: 1, kind: InlineCompute },
        Intrinsic { module: "str", name: "len", arity: 1, kind: InlineCompute },
        Intrinsic { module: "str", name: "eq", arity: 2, kind: InlineCompute },
    ]
    .into_iter()
    .map(|i| (i.name, i))
    .collect()
});

pub fn lookup(name: &str) -> Option<&'static Intrinsic> {
    REGISTRY.get(name)
}

/// Tracks which `use "module";` statements a program contains. Calls to
/// a name that collides with an intrinsic but whose module was never
/// activated are treated as ordinary user functions (spec §4.3: "marks
/// the module's intrinsics active").
#[derive(Debug, Default)]
pub struct ActiveModules {
    modules: HashSet<String>,
}

impl ActiveModules {
    pub fn from_program(program: &crate::ast::Program) -> Self {
        let mut modules = HashSet::new();
        for stmt in &program.top_level {
            if let crate::ast::Stmt::ImportDeclaration { module, .. } = stmt {
                modules.insert(module.clone());
            }
        }
        ActiveModules { modules }
    }

    pub fn is_active(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    /// Resolves a call name to an active intrinsic, or `None` if the
    /// name is unregistered or its module was never imported.
    pub fn resolve(&self, name: &str) -> Option<&'static Intrinsic> {
        let intrinsic = lookup(name)?;
        self.is_active(intrinsic.module).then_some(intrinsic)
    }
}

/// `pow`'s exponent must be a non-negative integer when it is a literal
/// (spec §9 open-question resolution). A non-literal exponent cannot be
/// checked at compile time; at run time an exponent `<= 0` simply skips
/// the squaring loop and yields `1`, which is documented behavior, not
/// a trap.
pub fn validate_pow_exponent(exponent: &Expr) -> Result<(), LotusError> {
    if let Expr::IntLiteral(n) = exponent {
        if *n < 0 {
            return Err(LotusError::codegen(format!(
                "pow: exponent must be non-negative, got {}",
                n
            )));
        }
    }
    Ok(())
}

/// Emits the inline body of an `InlineCompute` intrinsic. Assumes arg 1
/// is in `%rax` and, for two-argument intrinsics, arg 2 is in `%rbx`.
/// Leaves the result in `%rax`. Clobbers `%rcx`, `%rdx` freely, per the
/// scratch-register convention (spec §4.3).
pub fn emit_inline(name: &str, out: &mut String, labels: &mut LabelCounter) -> Result<(), LotusError> {
    match name {
        "sqrt" => emit_sqrt(out, labels),
        "pow" => emit_pow(out, labels),
        "gcd" => emit_gcd(out, labels),
        "max" => emit_max(out),
        "min" => emit_min(out),
        "abs" => emit_abs(out, labels),
        "len" => emit_strlen(out, labels),
        "eq" => emit_streq(out, labels),
        other => Err(LotusError::codegen(format!("'{}' has no inline emitter", other))),
    }
}

/// Emits a call-through to the named libc function. Assumes arg 1 is in
/// `%rax`; moves it into `%rdi` per the SysV convention and leaves the
/// callee's return value in `%rax`.
pub fn emit_libc_call(name: &str, out: &mut String) -> Result<(), LotusError> {
    match name {
        "malloc" | "free" => {
            let _ = writeln!(out, "    movq %rax, %rdi");
            let _ = writeln!(out, "    call {}", name);
            Ok(())
        }
        other => Err(LotusError::codegen(format!("'{}' is not a libc intrinsic", other))),
    }
}

/// Integer floor of the square root via Newton's method, starting from
/// the input itself (safe for all non-negative `n`; converges in
/// O(log n) iterations). Negative input produces 0 — documented, not a
/// trap, per spec §9.
fn emit_sqrt(out: &mut String, labels: &mut LabelCounter) -> Result<(), LotusError> {
    let positive = labels.fresh_local("sqrt_pos");
    let top = labels.fresh_local("sqrt");
    let done = labels.fresh_local("sqrt_done");
    let end = labels.fresh_local("sqrt_end");
    let _ = writeln!(out, "    # math.sqrt: integer Newton iteration, x_{{n+1}} = (x_n + n/x_n)/2");
    let _ = writeln!(out, "    testq %rax, %rax");
    let _ = writeln!(out, "    jg {}", positive);
    let _ = writeln!(out, "    movq $0, %rax");
    let _ = writeln!(out, "    jmp {}", end);
    let _ = writeln!(out, "{}:", positive);
    let _ = writeln!(out, "    movq %rax, %rcx");   // n, held constant
    let _ = writeln!(out, "    movq %rax, %r8");    // x, current guess (outlives cqto)
    let _ = writeln!(out, "{}:", top);
    let _ = writeln!(out, "    movq %rcx, %rax");
    let _ = writeln!(out, "    cqto");
    let _ = writeln!(out, "    idivq %r8");
    let _ = writeln!(out, "    addq %r8, %rax");
    let _ = writeln!(out, "    sarq $1, %rax");
    let _ = writeln!(out, "    cmpq %r8, %rax");
    let _ = writeln!(out, "    je {}", done);
    let _ = writeln!(out, "    movq %rax, %r8");
    let _ = writeln!(out, "    jmp {}", top);
    let _ = writeln!(out, "{}:", done);
    let _ = writeln!(out, "    movq %r8, %rax");
    let _ = writeln!(out, "{}:", end);
    Ok(())
}

/// Repeated squaring for a non-negative integer exponent; `e <= 0`
/// skips the loop and leaves `1` in `%rax` (spec §9).
fn emit_pow(out: &mut String, labels: &mut LabelCounter) -> Result<(), LotusError> {
    let top = labels.fresh_local("pow");
    let shift = labels.fresh_local("pow_shift");
    let done = labels.fresh_local("pow_done");
    let _ = writeln!(out, "    # math.pow: repeated squaring, base %rax, exponent %rbx");
    let _ = writeln!(out, "    movq %rax, %r8");   // base
    let _ = writeln!(out, "    movq %rbx, %r9");   // exponent
    let _ = writeln!(out, "    movq $1, %rax");    // accumulator
    let _ = writeln!(out, "{}:", top);
    let _ = writeln!(out, "    testq %r9, %r9");
    let _ = writeln!(out, "    jle {}", done);
    let _ = writeln!(out, "    movq %r9, %rcx");
    let _ = writeln!(out, "    andq $1, %rcx");
    let _ = writeln!(out, "    jz {}", shift);
    let _ = writeln!(out, "    imulq %r8, %rax");
    let _ = writeln!(out, "{}:", shift);
    let _ = writeln!(out, "    imulq %r8, %r8");
    let _ = writeln!(out, "    sarq $1, %r9");
    let _ = writeln!(out, "    jmp {}", top);
    let _ = writeln!(out, "{}:", done);
    Ok(())
}

/// Euclidean algorithm via `idivq`.
fn emit_gcd(out: &mut String, labels: &mut LabelCounter) -> Result<(), LotusError> {
    let top = labels.fresh_local("gcd");
    let done = labels.fresh_local("gcd_done");
    let _ = writeln!(out, "    # math.gcd: Euclidean algorithm");
    let _ = writeln!(out, "{}:", top);
    let _ = writeln!(out, "    testq %rbx, %rbx");
    let _ = writeln!(out, "    jz {}", done);
    let _ = writeln!(out, "    cqto");
    let _ = writeln!(out, "    idivq %rbx");
    let _ = writeln!(out, "    movq %rbx, %rax");
    let _ = writeln!(out, "    movq %rdx, %rbx");
    let _ = writeln!(out, "    jmp {}", top);
    let _ = writeln!(out, "{}:", done);
    Ok(())
}

fn emit_max(out: &mut String) -> Result<(), LotusError> {
    let _ = writeln!(out, "    # math.max");
    let _ = writeln!(out, "    cmpq %rbx, %rax");
    let _ = writeln!(out, "    cmovlq %rbx, %rax");
    Ok(())
}

fn emit_min(out: &mut String) -> Result<(), LotusError> {
    let _ = writeln!(out, "    # math.min");
    let _ = writeln!(out, "    cmpq %rbx, %rax");
    let _ = writeln!(out, "    cmovgq %rbx, %rax");
    Ok(())
}

fn emit_abs(out: &mut String, labels: &mut LabelCounter) -> Result<(), LotusError> {
    let done = labels.fresh_local("abs_done");
    let _ = writeln!(out, "    # math.abs");
    let _ = writeln!(out, "    testq %rax, %rax");
    let _ = writeln!(out, "    jns {}", done);
    let _ = writeln!(out, "    negq %rax");
    let _ = writeln!(out, "{}:", done);
    Ok(())
}

/// Scans for a NUL terminator starting at the pointer in `%rax`,
/// leaving the byte count in `%rax`.
fn emit_strlen(out: &mut String, labels: &mut LabelCounter) -> Result<(), LotusError> {
    let top = labels.fresh_local("strlen");
    let done = labels.fresh_local("strlen_done");
    let _ = writeln!(out, "    # str.len");
    let _ = writeln!(out, "    movq %rax, %rcx");
    let _ = writeln!(out, "    movq $0, %rax");
    let _ = writeln!(out, "{}:", top);
    let _ = writeln!(out, "    cmpb $0, (%rcx,%rax)");
    let _ = writeln!(out, "    je {}", done);
    let _ = writeln!(out, "    incq %rax");
    let _ = writeln!(out, "    jmp {}", top);
    let _ = writeln!(out, "{}:", done);
    Ok(())
}

/// Byte-for-byte comparison of the NUL-terminated strings pointed to by
/// `%rax` and `%rbx`; leaves `1` (equal) or `0` (not equal) in `%rax`.
fn emit_streq(out: &mut String, labels: &mut LabelCounter) -> Result<(), LotusError> {
    let top = labels.fresh_local("streq");
    let neq = labels.fresh_local("streq_neq");
    let eq = labels.fresh_local("streq_eq");
    let done = labels.fresh_local("streq_done");
    let _ = writeln!(out, "    # str.eq");
    let _ = writeln!(out, "    movq %rax, %r8");
    let _ = writeln!(out, "    movq %rbx, %r9");
    let _ = writeln!(out, "{}:", top);
    let _ = writeln!(out, "    movb (%r8), %cl");
    let _ = writeln!(out, "    cmpb (%r9), %cl");
    let _ = writeln!(out, "    jne {}", neq);
    let _ = writeln!(out, "    cmpb $0, %cl");
    let _ = writeln!(out, "    je {}", eq);
    let _ = writeln!(out, "    incq %r8");
    let _ = writeln!(out, "    incq %r9");
    let _ = writeln!(out, "    jmp {}", top);
    let _ = writeln!(out, "{}:", neq);
    let _ = writeln!(out, "    movq $0, %rax");
    let _ = writeln!(out, "    jmp {}", done);
    let _ = writeln!(out, "{}:", eq);
    let _ = writeln!(out, "    movq $1, %rax");
    let _ = writeln!(out, "{}:", done);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Program, Stmt};

    #[test]
    fn registry_contains_all_four_modules() {
        for name in ["printf", "malloc", "free", "sqrt", "pow", "gcd", "max", "min", "abs", "len", "eq"] {
            assert!(lookup(name).is_some(), "{} should be registered", name);
        }
    }

    #[test]
    fn unresolved_without_use_statement() {
        let program = Program::new();
        let active = ActiveModules::from_program(&program);
        assert!(active.resolve("sqrt").is_none());
    }

    #[test]
    fn resolved_after_use_statement() {
        let mut program = Program::new();
        program.top_level.push(Stmt::ImportDeclaration { module: "math".to_string(), alias: None });
        let active = ActiveModules::from_program(&program);
        assert!(active.resolve("sqrt").is_some());
        assert!(active.resolve("malloc").is_none());
    }

    #[test]
    fn pow_rejects_negative_literal_exponent() {
        assert!(validate_pow_exponent(&Expr::IntLiteral(-1)).is_err());
        assert!(validate_pow_exponent(&Expr::IntLiteral(2)).is_ok());
        assert!(validate_pow_exponent(&Expr::Identifier("e".to_string())).is_ok());
    }

    #[test]
    fn sqrt_emits_newton_loop() {
        let mut out = String::new();
        let mut labels = LabelCounter::new();
        emit_inline("sqrt", &mut out, &mut labels).unwrap();
        assert!(out.contains("idivq"));
    }

    #[test]
    fn sqrt_divisor_register_survives_cqto() {
        // cqto sign-extends %rax into %rdx, so the divisor driving idivq
        // must live somewhere other than %rdx or every iteration divides
        // by the sign-extension of the dividend instead of the guess.
        let mut out = String::new();
        let mut labels = LabelCounter::new();
        emit_inline("sqrt", &mut out, &mut labels).unwrap();
        assert!(!out.contains("idivq %rdx"));
        let cqto_idx = out.find("cqto").unwrap();
        let after_cqto = &out[cqto_idx..];
        let idiv_line = after_cqto.lines().find(|l| l.contains("idivq")).unwrap();
        assert!(!idiv_line.contains("%rdx"));
    }
}
