/// The kind tag of a literal. The value itself is carried around as an
/// opaque string; nothing in this crate interprets it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LiteralKind {
    Number,
    String,
    Boolean,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Expression {
    Literal {
        kind: LiteralKind,
        value: String,
        /// Opaque type tag; empty means untyped.
        ty: String,
    },
    Identifier {
        name: String,
    },
    /// A call of a user-defined function.
    Call {
        function: String,
        arguments: Vec<Expression>,
    },
    /// A primitive machine instruction. Its operands are traversed exactly
    /// like call arguments, but an instruction itself is never inlined.
    Instruction {
        opcode: String,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    pub fn number(value: impl Into<String>) -> Self {
        Self::Literal {
            kind: LiteralKind::Number,
            value: value.into(),
            ty: String::new(),
        }
    }
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier { name: name.into() }
    }
    pub fn call(function: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Self::Call {
            function: function.into(),
            arguments,
        }
    }
    pub fn instruction(opcode: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Self::Instruction {
            opcode: opcode.into(),
            arguments,
        }
    }
}
