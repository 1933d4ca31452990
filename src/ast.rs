//! Abstract syntax tree (component C3)
//!
//! Tagged node variants for expressions, statements, and declarations,
//! matching the canonical variant list in spec §3 exactly. Dispatch is
//! exhaustive pattern matching rather than the teacher's runtime type
//! assertions (spec §9 "Variant dispatch").

use crate::diagnostics::SourcePos;

/// A parsed type annotation, e.g. `int`, `string`, `int8`, `Point*`,
/// `int[4]`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Bool,
    Float,
    String,
    Named(String),
    Pointer(Box<TypeAnnotation>),
    Array(Box<TypeAnnotation>, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    Deref,
    AddrOf,
}

/// Expression nodes, grouped as spec §3 lists them.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    BoolLiteral(bool),
    NullLiteral,

    // Names
    Identifier(String),
    FunctionCall { name: String, args: Vec<Expr> },
    MethodCall { receiver: Box<Expr>, method: String, args: Vec<Expr> },
    FieldAccess { object: Box<Expr>, field: String, arrow: bool },
    ArrayIndex { array: Box<Expr>, index: Box<Expr> },
    EnumVariant { enum_name: String, variant: String },
    New { type_name: String, args: Vec<Expr> },

    // Operators
    BinaryOp { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    LogicalOp { op: LogicalOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    /// Pretty-print with explicit parentheses around every binary/unary
    /// operation, making operator-precedence grouping directly
    /// inspectable. This is the test oracle spec §8 invariant 2 calls
    /// for, exposed to users via `--dump-ast`.
    pub fn to_parenthesized_string(&self) -> String {
        match self {
            Expr::IntLiteral(n) => n.to_string(),
            Expr::FloatLiteral(n) => n.to_string(),
            Expr::StringLiteral(s) => format!("{:?}", s),
            Expr::BoolLiteral(b) => b.to_string(),
            Expr::NullLiteral => "null".to_string(),
            Expr::Identifier(name) => name.clone(),
            Expr::FunctionCall { name, args } => format!(
                "{}({})",
                name,
                args.iter().map(Expr::to_parenthesized_string).collect::<Vec<_>>().join(", ")
            ),
            Expr::MethodCall { receiver, method, args } => format!(
                "{}.{}({})",
                receiver.to_parenthesized_string(),
                method,
                args.iter().map(Expr::to_parenthesized_string).collect::<Vec<_>>().join(", ")
            ),
            Expr::FieldAccess { object, field, arrow } => format!(
                "{}{}{}",
                object.to_parenthesized_string(),
                if *arrow { "->" } else { "." },
                field
            ),
            Expr::ArrayIndex { array, index } => {
                format!("{}[{}]", array.to_parenthesized_string(), index.to_parenthesized_string())
            }
            Expr::EnumVariant { enum_name, variant } => format!("{}::{}", enum_name, variant),
            Expr::New { type_name, args } => format!(
                "new {}({})",
                type_name,
                args.iter().map(Expr::to_parenthesized_string).collect::<Vec<_>>().join(", ")
            ),
            Expr::BinaryOp { op, lhs, rhs } => format!(
                "({} {} {})",
                lhs.to_parenthesized_string(),
                bin_op_symbol(*op),
                rhs.to_parenthesized_string()
            ),
            Expr::LogicalOp { op, lhs, rhs } => format!(
                "({} {} {})",
                lhs.to_parenthesized_string(),
                if *op == LogicalOp::And { "&&" } else { "||" },
                rhs.to_parenthesized_string()
            ),
            Expr::UnaryOp { op, operand } => {
                format!("({}{})", unary_op_symbol(*op), operand.to_parenthesized_string())
            }
        }
    }
}

fn bin_op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::NotEq => "!=",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::LtEq => "<=",
        BinOp::GtEq => ">=",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
    }
}

fn unary_op_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
        UnaryOp::Deref => "*",
        UnaryOp::AddrOf => "&",
    }
}

/// Statement and declaration nodes, grouped as spec §3 lists them.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VariableDeclaration { ty: TypeAnnotation, name: String, init: Option<Expr>, pos: SourcePos },
    ConstantDeclaration { ty: TypeAnnotation, name: String, value: Expr, pos: SourcePos },
    FunctionDeclaration(FunctionDecl),
    StructDeclaration(StructDecl),
    EnumDeclaration(EnumDecl),
    ClassDeclaration(ClassDecl),
    ImportDeclaration { module: String, alias: Option<String> },

    ReturnStatement { value: Option<Expr>, pos: SourcePos },
    IfStatement { cond: Expr, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>>, pos: SourcePos },
    WhileStatement { cond: Expr, body: Vec<Stmt>, pos: SourcePos },
    ForStatement {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Vec<Stmt>,
        pos: SourcePos,
    },
    Assignment { target: Expr, value: Expr, pos: SourcePos },
    ExprStatement { expr: Expr, pos: SourcePos },
    Block(Vec<Stmt>),
    BreakStatement { pos: SourcePos },
    ContinueStatement { pos: SourcePos },
    TryStatement {
        body: Vec<Stmt>,
        catch: Option<(Option<String>, Vec<Stmt>)>,
        finally: Option<Vec<Stmt>>,
        pos: SourcePos,
    },
    ThrowStatement { value: Expr, pos: SourcePos },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeAnnotation,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub ret_ty: TypeAnnotation,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub ty: TypeAnnotation,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    /// Variant name -> explicit or auto-incremented integer value.
    pub variants: Vec<(String, i64)>,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunctionDecl>,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub top_level: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.top_level.iter().filter_map(|s| match s {
            Stmt::FunctionDeclaration(f) => Some(f),
            _ => None,
        })
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parenthesizes_shift_and_or_per_precedence() {
        // (1 << 3) | 1, the same grouping spec scenario 6 exercises.
        let expr = Expr::BinaryOp {
            op: BinOp::BitOr,
            lhs: Box::new(Expr::BinaryOp {
                op: BinOp::Shl,
                lhs: Box::new(Expr::IntLiteral(1)),
                rhs: Box::new(Expr::IntLiteral(3)),
            }),
            rhs: Box::new(Expr::IntLiteral(1)),
        };
        assert_eq!(expr.to_parenthesized_string(), "((1 << 3) | 1)");
    }
}
