use crate::ir::{Block, Expression, FunctionDefinition, Program, Statement};
use rustc_hash::FxHashSet;

impl Program {
    /// Every name occurring anywhere in the program: declared variables,
    /// identifier references, function names, parameters, and return
    /// variables. Instruction opcodes are not names.
    pub fn all_names(&self) -> FxHashSet<String> {
        self.body.all_names()
    }
}
impl Block {
    pub fn all_names(&self) -> FxHashSet<String> {
        let mut names = FxHashSet::default();
        self.collect_names(&mut names);
        names
    }
    fn collect_names(&self, names: &mut FxHashSet<String>) {
        for statement in &self.statements {
            statement.collect_names(names);
        }
    }
}
impl Statement {
    fn collect_names(&self, names: &mut FxHashSet<String>) {
        match self {
            Self::Expression(expression) => expression.collect_names(names),
            Self::VariableDeclaration { variables, value } => {
                names.extend(variables.iter().map(|variable| variable.name.clone()));
                if let Some(value) = value {
                    value.collect_names(names);
                }
            }
            Self::Assignment { targets, value } => {
                names.extend(targets.iter().cloned());
                value.collect_names(names);
            }
            Self::Block(block) => block.collect_names(names),
            Self::ForLoop {
                pre,
                condition,
                post,
                body,
            } => {
                pre.collect_names(names);
                condition.collect_names(names);
                post.collect_names(names);
                body.collect_names(names);
            }
            Self::FunctionDefinition(function) => function.collect_names(names),
        }
    }
}
impl FunctionDefinition {
    fn collect_names(&self, names: &mut FxHashSet<String>) {
        names.insert(self.name.clone());
        names.extend(
            self.parameters
                .iter()
                .chain(&self.return_variables)
                .map(|variable| variable.name.clone()),
        );
        self.body.collect_names(names);
    }
}
impl Expression {
    fn collect_names(&self, names: &mut FxHashSet<String>) {
        match self {
            Self::Literal { .. } => {}
            Self::Identifier { name } => {
                names.insert(name.clone());
            }
            Self::Call {
                function,
                arguments,
            } => {
                names.insert(function.clone());
                for argument in arguments {
                    argument.collect_names(names);
                }
            }
            Self::Instruction { arguments, .. } => {
                for argument in arguments {
                    argument.collect_names(names);
                }
            }
        }
    }
}

impl Block {
    /// The number of statements in this block, including statements of
    /// nested blocks and function bodies.
    pub fn statement_count(&self) -> usize {
        self.statements.iter().map(Statement::statement_count).sum()
    }
}
impl Statement {
    fn statement_count(&self) -> usize {
        1 + match self {
            Self::Block(block) => block.statement_count(),
            Self::ForLoop {
                pre, post, body, ..
            } => pre.statement_count() + post.statement_count() + body.statement_count(),
            Self::FunctionDefinition(function) => function.body.statement_count(),
            _ => 0,
        }
    }
}

#[test]
fn test_all_names_spans_the_whole_program() {
    let program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("x", Expression::call("pick", vec![Expression::number("1")]));
        });
        body.push_function("pick", |function| {
            function.parameter("a");
            function.return_variable("r");
            function.push_assignment(&["r"], Expression::identifier("a"));
        });
    });

    let expected: FxHashSet<String> = ["x", "pick", "a", "r"]
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(program.all_names(), expected);
}
