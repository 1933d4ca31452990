//! `printf` lowering (component C7, spec §4.3 "printf lowering")
//!
//! A literal format string is decomposed at compile time into
//! alternating text segments and verb characters drawn from
//! `{%, d, b, o, x, X, c, s, q, v}`. Each text segment becomes a
//! labelled byte string emitted once into the data section and written
//! via `syscall 1` (`write`) to fd 1; each verb consumes the next call
//! argument and emits inline formatting code. A non-literal format
//! string falls back to printing its pointer as a length-bounded write
//! (spec-mandated default length 100).

use crate::ast::Expr;
use crate::codegen::expr::generate_expr_to_reg;
use crate::codegen::state::CodeGen;
use crate::diagnostics::{LotusError, SourcePos};

enum Segment {
    Text(String),
    Verb(char),
}

/// Splits a literal format string into text/verb segments. `%%` is
/// folded into a literal `%` text segment rather than a verb.
fn decompose(fmt: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('%') => text.push('%'),
                Some(v) => {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Verb(v));
                }
                None => text.push('%'),
            }
        } else {
            text.push(c);
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

/// Escapes a Rust string into GNU `as` string-directive syntax, usable
/// for both `.ascii` and `.asciz`.
pub(crate) fn escape_for_data(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out
}

pub fn generate_printf_call(
    cg: &mut CodeGen,
    args: &[Expr],
    pos: SourcePos,
) -> Result<(), LotusError> {
    let Some(first) = args.first() else {
        return Err(LotusError::codegen_at(pos, "printf requires at least a format argument"));
    };
    match first {
        Expr::StringLiteral(fmt) => generate_literal_format(cg, fmt, &args[1..], pos),
        other => generate_fallback_format(cg, other),
    }
}

fn generate_literal_format(
    cg: &mut CodeGen,
    fmt: &str,
    rest: &[Expr],
    pos: SourcePos,
) -> Result<(), LotusError> {
    let segments = decompose(fmt);
    let mut arg_iter = rest.iter();
    for segment in segments {
        match segment {
            Segment::Text(text) => emit_text_write(cg, &text),
            Segment::Verb(v) => {
                let arg = arg_iter.next().ok_or_else(|| {
                    LotusError::codegen_at(pos, format!("printf: missing argument for '%{}'", v))
                })?;
                emit_verb(cg, v, arg, pos)?;
            }
        }
    }
    Ok(())
}

/// Non-literal format strings can't be decomposed at compile time;
/// print the pointer's contents as a fixed-length, length-bounded write
/// (spec default: 100 bytes).
fn generate_fallback_format(cg: &mut CodeGen, fmt_expr: &Expr) -> Result<(), LotusError> {
    generate_expr_to_reg(cg, fmt_expr, "%rsi")?;
    cg.emit("movq $100, %rdx");
    cg.emit("movq $1, %rdi");
    cg.emit("movq $1, %rax");
    cg.emit("syscall");
    Ok(())
}

fn emit_text_write(cg: &mut CodeGen, text: &str) {
    let label = cg.labels.fresh_string();
    cg.emit_data_line(format!("{}:", label));
    cg.emit_data_line(format!("    .ascii \"{}\"", escape_for_data(text)));
    cg.emit(format!("leaq {}(%rip), %rsi", label));
    cg.emit(format!("movq ${}, %rdx", text.as_bytes().len()));
    cg.emit("movq $1, %rdi");
    cg.emit("movq $1, %rax");
    cg.emit("syscall");
}

fn emit_verb(cg: &mut CodeGen, verb: char, arg: &Expr, pos: SourcePos) -> Result<(), LotusError> {
    match verb {
        'd' => emit_integer_verb(cg, arg, 10, false, true),
        'b' => emit_integer_verb(cg, arg, 2, false, false),
        'o' => emit_integer_verb(cg, arg, 8, false, false),
        'x' => emit_integer_verb(cg, arg, 16, false, false),
        'X' => emit_integer_verb(cg, arg, 16, true, false),
        'c' => emit_char_verb(cg, arg),
        's' => emit_string_verb(cg, arg, false),
        'q' => emit_string_verb(cg, arg, true),
        'v' => {
            if is_string_like(arg) {
                emit_string_verb(cg, arg, false)
            } else {
                emit_integer_verb(cg, arg, 10, false, true)
            }
        }
        other => Err(LotusError::codegen_at(pos, format!("printf: unknown verb '%{}'", other))),
    }
}

fn is_string_like(expr: &Expr) -> bool {
    matches!(expr, Expr::StringLiteral(_) | Expr::Identifier(_))
}

/// Converts the argument's value to ASCII digits in a reusable
/// 32-byte scratch buffer and writes the resulting slice.
fn emit_integer_verb(
    cg: &mut CodeGen,
    arg: &Expr,
    base: u32,
    uppercase: bool,
    signed: bool,
) -> Result<(), LotusError> {
    generate_expr_to_reg(cg, arg, "%rax")?;
    let buf = cg.ensure_itoa_buffer();
    let neg_label = cg.labels.fresh_local("itoa_neg");
    let loop_label = cg.labels.fresh_local("itoa_loop");
    let done_label = cg.labels.fresh_local("itoa_done");

    cg.emit(format!("leaq {}+31(%rip), %rdi", buf)); // write cursor, grows backward
    cg.emit("movb $0, (%rdi)"); // NUL not needed but keeps buffer well-formed
    cg.emit("movq %rax, %r10"); // stash original value for the sign check
    if signed {
        cg.emit("testq %rax, %rax");
        cg.emit(format!("jns {}", neg_label));
        cg.emit("negq %rax");
        cg.emit_label(&neg_label);
    }
    cg.emit(format!("movq ${}, %r11", base));
    cg.emit_label(&loop_label);
    cg.emit("cqto");
    cg.emit("idivq %r11");
    cg.emit("movq %rdx, %r9");
    cg.emit("cmpq $9, %r9");
    let alpha_label = cg.labels.fresh_local("itoa_alpha");
    let digit_done_label = cg.labels.fresh_local("itoa_digit_done");
    cg.emit(format!("jg {}", alpha_label));
    cg.emit("addq $48, %r9"); // '0'
    cg.emit(format!("jmp {}", digit_done_label));
    cg.emit_label(&alpha_label);
    cg.emit(format!("addq ${}, %r9", if uppercase { 55 } else { 87 })); // 'A'-10 / 'a'-10
    cg.emit_label(&digit_done_label);
    cg.emit("decq %rdi");
    cg.emit("movb %r9b, (%rdi)");
    cg.emit("testq %rax, %rax");
    cg.emit(format!("jnz {}", loop_label));
    cg.emit(format!("jmp {}", done_label));
    cg.emit_label(&done_label);

    if signed {
        cg.emit("testq %r10, %r10");
        let skip_sign = cg.labels.fresh_local("itoa_no_sign");
        cg.emit(format!("jns {}", skip_sign));
        cg.emit("decq %rdi");
        cg.emit("movb $45, (%rdi)"); // '-'
        cg.emit_label(&skip_sign);
    }

    cg.emit(format!("leaq {}+31(%rip), %rcx", buf));
    cg.emit("movq %rcx, %rdx");
    cg.emit("subq %rdi, %rdx"); // length = end - cursor
    cg.emit("movq %rdi, %rsi");
    cg.emit("movq $1, %rdi");
    cg.emit("movq $1, %rax");
    cg.emit("syscall");
    Ok(())
}

fn emit_char_verb(cg: &mut CodeGen, arg: &Expr) -> Result<(), LotusError> {
    generate_expr_to_reg(cg, arg, "%rax")?;
    let buf = cg.ensure_itoa_buffer();
    cg.emit(format!("leaq {}(%rip), %rsi", buf));
    cg.emit("movb %al, (%rsi)");
    cg.emit("movq $1, %rdx");
    cg.emit("movq $1, %rdi");
    cg.emit("movq $1, %rax");
    cg.emit("syscall");
    Ok(())
}

/// Writes a NUL-terminated string. When the argument is a bare
/// identifier whose length was recorded at its last assignment (spec
/// §9 string-length shadow table, folded into [`crate::frame::Variable`]),
/// the known length is used directly; otherwise the length is computed
/// by scanning for the NUL terminator (`str.len`'s emitter, reused here).
fn emit_string_verb(cg: &mut CodeGen, arg: &Expr, quoted: bool) -> Result<(), LotusError> {
    generate_expr_to_reg(cg, arg, "%rax")?;
    cg.emit("movq %rax, %rsi");

    let known_len = match arg {
        Expr::Identifier(name) => cg.frame.lookup(name).and_then(|v| v.known_string_len),
        Expr::StringLiteral(s) => Some(s.as_bytes().len()),
        _ => None,
    };

    if quoted {
        emit_quote_byte(cg);
    }

    if let Some(len) = known_len {
        cg.emit(format!("movq ${}, %rdx", len));
    } else {
        cg.emit("movq %rsi, %rax");
        crate::stdlib::emit_inline("len", &mut cg.text, &mut cg.labels)?;
        cg.emit("movq %rax, %rdx");
    }
    cg.emit("movq $1, %rdi");
    cg.emit("movq $1, %rax");
    cg.emit("syscall");

    if quoted {
        emit_quote_byte(cg);
    }
    Ok(())
}

fn emit_quote_byte(cg: &mut CodeGen) {
    let label = cg.labels.fresh_string();
    cg.emit_data_line(format!("{}:", label));
    cg.emit_data_line("    .ascii \"\\\"\"");
    cg.emit(format!("leaq {}(%rip), %rsi", label));
    cg.emit("movq $1, %rdx");
    cg.emit("movq $1, %rdi");
    cg.emit("movq $1, %rax");
    cg.emit("syscall");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_text_and_verbs() {
        let segs = decompose("a=%d, b=%s!");
        let kinds: Vec<&str> = segs
            .iter()
            .map(|s| match s {
                Segment::Text(_) => "text",
                Segment::Verb(_) => "verb",
            })
            .collect();
        assert_eq!(kinds, vec!["text", "verb", "text", "verb", "text"]);
    }

    #[test]
    fn double_percent_folds_into_literal_text() {
        let segs = decompose("100%%");
        assert_eq!(segs.len(), 1);
        match &segs[0] {
            Segment::Text(t) => assert_eq!(t, "100%"),
            _ => panic!("expected a single text segment"),
        }
    }

    #[test]
    fn escapes_newline_and_quote() {
        assert_eq!(escape_for_data("a\"b\nc"), "a\\\"b\\nc");
    }
}
