use crate::ir::{Block, Program, Statement};
use rustc_hash::FxHashSet;
use tracing::error;

impl Program {
    /// Checks the structural contract established by the function hoister
    /// and grouper: the top-level block consists of plain blocks followed by
    /// function definitions only, function names are unique, and no function
    /// definition is nested anywhere below the top level.
    ///
    /// A violation is a bug in an earlier pass, so this panics.
    pub fn validate(&self) {
        let mut function_names: FxHashSet<String> = FxHashSet::default();
        let mut seen_function = false;
        for statement in &self.body.statements {
            match statement {
                Statement::Block(block) => {
                    if seen_function {
                        error!("A block follows a function definition at the top level.");
                        self.panic_invalid();
                    }
                    self.validate_no_definitions(block);
                }
                Statement::FunctionDefinition(function) => {
                    seen_function = true;
                    if !function_names.insert(function.name.clone()) {
                        error!("Function `{}` is defined twice.", function.name);
                        self.panic_invalid();
                    }
                    self.validate_no_definitions(&function.body);
                }
                _ => {
                    error!("A top-level statement is neither a block nor a function definition.");
                    self.panic_invalid();
                }
            }
        }
    }

    fn validate_no_definitions(&self, block: &Block) {
        for statement in &block.statements {
            match statement {
                Statement::FunctionDefinition(function) => {
                    error!(
                        "Function `{}` is defined below the top level.",
                        function.name,
                    );
                    self.panic_invalid();
                }
                Statement::Block(block) => self.validate_no_definitions(block),
                Statement::ForLoop {
                    pre, post, body, ..
                } => {
                    self.validate_no_definitions(pre);
                    self.validate_no_definitions(post);
                    self.validate_no_definitions(body);
                }
                _ => {}
            }
        }
    }

    fn panic_invalid(&self) -> ! {
        error!("This is the program:\n{self}");
        panic!("The program is invalid!");
    }
}

#[test]
fn test_grouped_programs_validate() {
    use crate::ir::Expression;

    let program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("x", Expression::number("1"));
        });
        body.push_function("noop", |_| {});
    });
    program.validate();
}

#[test]
#[should_panic(expected = "The program is invalid!")]
fn test_nested_function_definitions_do_not_validate() {
    let program = Program::build(|body| {
        body.push_function("outer", |function| {
            function.push_function("inner", |_| {});
        });
    });
    program.validate();
}

#[test]
#[should_panic(expected = "The program is invalid!")]
fn test_ungrouped_top_levels_do_not_validate() {
    use crate::ir::Expression;

    let program = Program::build(|body| {
        body.push_declaration("x", Expression::number("1"));
    });
    program.validate();
}
