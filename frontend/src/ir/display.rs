use super::{Block, Expression, FunctionDefinition, LiteralKind, Program, Statement, TypedName};
use itertools::Itertools;
use std::fmt::{self, Display, Formatter};

impl Display for Program {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.body.write_indented(f, 0)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
impl Block {
    fn write_indented(&self, f: &mut Formatter, indent: usize) -> fmt::Result {
        if self.statements.is_empty() {
            return write!(f, "{{ }}");
        }
        writeln!(f, "{{")?;
        for statement in &self.statements {
            statement.write_indented(f, indent + 1)?;
            writeln!(f)?;
        }
        write!(f, "{:width$}}}", "", width = indent * 4)
    }
}

impl Statement {
    fn write_indented(&self, f: &mut Formatter, indent: usize) -> fmt::Result {
        write!(f, "{:width$}", "", width = indent * 4)?;
        match self {
            Self::Expression(expression) => write!(f, "{expression}"),
            Self::VariableDeclaration { variables, value } => {
                write!(f, "let {}", variables.iter().join(", "))?;
                if let Some(value) = value {
                    write!(f, " := {value}")?;
                }
                Ok(())
            }
            Self::Assignment { targets, value } => {
                write!(f, "{} := {value}", targets.iter().join(", "))
            }
            Self::Block(block) => block.write_indented(f, indent),
            Self::ForLoop {
                pre,
                condition,
                post,
                body,
            } => {
                write!(f, "for ")?;
                pre.write_indented(f, indent)?;
                write!(f, " {condition} ")?;
                post.write_indented(f, indent)?;
                write!(f, " ")?;
                body.write_indented(f, indent)
            }
            Self::FunctionDefinition(function) => function.write_indented(f, indent),
        }
    }
}

impl FunctionDefinition {
    fn write_indented(&self, f: &mut Formatter, indent: usize) -> fmt::Result {
        write!(
            f,
            "function {}({})",
            self.name,
            self.parameters.iter().join(", "),
        )?;
        if !self.return_variables.is_empty() {
            write!(f, " -> {}", self.return_variables.iter().join(", "))?;
        }
        write!(f, " ")?;
        self.body.write_indented(f, indent)
    }
}

impl Display for TypedName {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.ty.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.ty)
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Literal { kind, value, .. } => match kind {
                LiteralKind::String => write!(f, "\"{value}\""),
                LiteralKind::Number | LiteralKind::Boolean => write!(f, "{value}"),
            },
            Self::Identifier { name } => write!(f, "{name}"),
            Self::Call {
                function,
                arguments,
            } => write!(f, "{function}({})", arguments.iter().join(", ")),
            Self::Instruction { opcode, arguments } => {
                write!(f, "{opcode}({})", arguments.iter().join(", "))
            }
        }
    }
}

#[test]
fn test_programs_render_like_source() {
    let program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("x", Expression::number("1"));
            block.push_expression(Expression::instruction(
                "mstore",
                vec![Expression::number("0"), Expression::identifier("x")],
            ));
        });
        body.push_function("double", |function| {
            function.parameter("a");
            function.return_variable("r");
            function.push_assignment(
                &["r"],
                Expression::instruction(
                    "add",
                    vec![Expression::identifier("a"), Expression::identifier("a")],
                ),
            );
        });
    });
    assert_eq!(
        program.to_string(),
        "{\n    {\n        let x := 1\n        mstore(0, x)\n    }\n    function double(a) -> r {\n        r := add(a, a)\n    }\n}",
    );
}
